use std::sync::Arc;

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::JwtKeys,
        password::{hash_password, verify_against_dummy, verify_password},
        repo::{CredentialStore, StoreError},
    },
    error::AppError,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims and lower-cases an email; blank or absent input yields `None`.
pub(crate) fn normalize_email(raw: Option<&str>) -> Option<String> {
    raw.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty())
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user_id: Uuid,
    pub token: String,
}

/// Orchestrates registration and login over a credential store and token keys.
#[derive(Clone)]
pub struct AuthGateway {
    store: Arc<dyn CredentialStore>,
    keys: JwtKeys,
}

impl FromRef<AppState> for AuthGateway {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.store.clone(), state.keys.clone())
    }
}

impl AuthGateway {
    pub fn new(store: Arc<dyn CredentialStore>, keys: JwtKeys) -> Self {
        Self { store, keys }
    }

    #[instrument(skip_all)]
    pub async fn register(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<Uuid, AppError> {
        let email = normalize_email(email).ok_or(AppError::Validation("Email is required"))?;
        if !is_valid_email(&email) {
            debug!(email = %email, "invalid email");
            return Err(AppError::Validation("Invalid email"));
        }
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or(AppError::Validation("Password is required"))?;

        let hash = hash_password(password)?;

        match self.store.create_user(&email, &hash).await {
            Ok(user_id) => {
                info!(user_id = %user_id, "user registered");
                Ok(user_id)
            }
            Err(StoreError::DuplicateEmail) => {
                debug!(email = %email, "email already registered");
                warn!("registration rejected: duplicate email");
                Err(AppError::Conflict)
            }
            Err(e) => Err(AppError::Internal(
                anyhow::Error::new(e).context("create user failed"),
            )),
        }
    }

    #[instrument(skip_all)]
    pub async fn login(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<LoginOutcome, AppError> {
        let email = normalize_email(email).ok_or(AppError::Validation("Email is required"))?;
        let password = password.unwrap_or_default();

        let user = match self.store.find_by_email(&email).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                verify_against_dummy(password);
                debug!(email = %email, "login unknown email");
                warn!("login rejected");
                return Err(AppError::Unauthorized);
            }
            Err(e) => {
                return Err(AppError::Internal(
                    anyhow::Error::new(e).context("find_by_email failed"),
                ))
            }
        };

        if !verify_password(password, &user.password_hash)? {
            warn!("login rejected");
            return Err(AppError::Unauthorized);
        }

        // The token is still valid if this write is lost.
        if let Err(e) = self
            .store
            .update_last_login(user.id, OffsetDateTime::now_utc())
            .await
        {
            warn!(error = %e, user_id = %user.id, "update_last_login failed");
        }

        let token = self.keys.issue(user.id)?;

        info!(user_id = %user.id, "user logged in");
        Ok(LoginOutcome {
            user_id: user.id,
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{memory::MemoryCredentialStore, repo_types::UserRecord},
        config::JwtConfig,
    };
    use async_trait::async_trait;

    fn keys() -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: "test-secret".into(),
            issuer: "test".into(),
            audience: "test".into(),
            ttl_minutes: 60,
        })
    }

    fn gateway() -> (AuthGateway, Arc<MemoryCredentialStore>) {
        let store = Arc::new(MemoryCredentialStore::new());
        (AuthGateway::new(store.clone(), keys()), store)
    }

    /// Delegates to memory but loses every last-login write.
    struct FlakyLastLogin(MemoryCredentialStore);

    #[async_trait]
    impl CredentialStore for FlakyLastLogin {
        async fn create_user(&self, email: &str, hash: &str) -> Result<Uuid, StoreError> {
            self.0.create_user(email, hash).await
        }
        async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
            self.0.find_by_email(email).await
        }
        async fn update_last_login(&self, _: Uuid, _: OffsetDateTime) -> Result<(), StoreError> {
            Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut))
        }
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_email(Some("  A@X.com ")), Some("a@x.com".into()));
        assert_eq!(normalize_email(Some("   ")), None);
        assert_eq!(normalize_email(None), None);
    }

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("no-at-sign.com"));
    }

    #[tokio::test]
    async fn register_requires_email() {
        let (gw, _) = gateway();
        let err = gw.register(None, Some("p1")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation("Email is required")));
        let err = gw.register(Some(""), Some("p1")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation("Email is required")));
    }

    #[tokio::test]
    async fn register_requires_password() {
        let (gw, store) = gateway();
        let err = gw.register(Some("a@x.com"), Some("")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.user_count().await, 0);
    }

    #[tokio::test]
    async fn register_stores_hash_not_password() {
        let (gw, store) = gateway();
        gw.register(Some("a@x.com"), Some("p1")).await.unwrap();
        let user = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_ne!(user.password_hash, "p1");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts_case_insensitively() {
        let (gw, _) = gateway();
        gw.register(Some("a@x.com"), Some("p1")).await.unwrap();
        let err = gw.register(Some("A@X.COM"), Some("p2")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict));
    }

    #[tokio::test]
    async fn concurrent_registrations_one_wins() {
        let (gw, _) = gateway();
        let (a, b) = tokio::join!(
            gw.register(Some("a@x.com"), Some("p1")),
            gw.register(Some("a@x.com"), Some("p2")),
        );
        assert!(a.is_ok() ^ b.is_ok());
        let loser = if a.is_err() { a } else { b };
        assert!(matches!(loser, Err(AppError::Conflict)));
    }

    #[tokio::test]
    async fn login_issues_token_for_registered_user() {
        let (gw, store) = gateway();
        let id = gw.register(Some("a@x.com"), Some("p1")).await.unwrap();

        let out = gw.login(Some("a@x.com"), Some("p1")).await.unwrap();
        assert_eq!(out.user_id, id);
        assert_eq!(keys().verify(&out.token), Ok(id));

        let user = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert!(user.last_login_at.is_some());
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_the_same() {
        let (gw, _) = gateway();
        gw.register(Some("a@x.com"), Some("p1")).await.unwrap();

        let wrong = gw.login(Some("a@x.com"), Some("wrong")).await.unwrap_err();
        let unknown = gw.login(Some("b@x.com"), Some("p1")).await.unwrap_err();
        assert!(matches!(wrong, AppError::Unauthorized));
        assert!(matches!(unknown, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn login_requires_email() {
        let (gw, _) = gateway();
        let err = gw.login(None, Some("p1")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn lost_last_login_write_does_not_fail_login() {
        let store = Arc::new(FlakyLastLogin(MemoryCredentialStore::new()));
        let gw = AuthGateway::new(store, keys());
        let id = gw.register(Some("a@x.com"), Some("p1")).await.unwrap();

        let out = gw.login(Some("a@x.com"), Some("p1")).await.unwrap();
        assert_eq!(out.user_id, id);
    }
}
