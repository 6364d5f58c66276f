use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: Uuid,                              // store-assigned user ID
    pub email: String,                         // normalized (trimmed, lower-case) email
    #[serde(skip_serializing)]
    pub password_hash: String,                 // Argon2 hash, not exposed in JSON
    pub registered_at: OffsetDateTime,         // creation timestamp
    pub last_login_at: Option<OffsetDateTime>, // NULL until first login
}
