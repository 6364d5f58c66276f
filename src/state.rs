use crate::auth::{
    jwt::JwtKeys,
    password,
    memory::MemoryCredentialStore,
    repo::{CredentialStore, PgCredentialStore},
};
use crate::config::{AppConfig, DbConfig, JwtConfig};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub keys: JwtKeys,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Loads config, opens the pool and applies migrations. Run once at startup.
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = PgCredentialStore::connect(&config.db).await?;

        if let Err(e) = sqlx::migrate!("./migrations").run(store.pool()).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        Ok(Self::from_parts(Arc::new(store), config))
    }

    pub fn from_parts(store: Arc<dyn CredentialStore>, config: Arc<AppConfig>) -> Self {
        let keys = JwtKeys::new(&config.jwt);
        password::warm_up();
        Self {
            store,
            keys,
            config,
        }
    }

    /// State backed by [`MemoryCredentialStore`] with a fixed signing secret.
    pub fn in_memory() -> Self {
        let config = Arc::new(AppConfig {
            db: DbConfig {
                url: "memory://".into(),
                max_connections: 1,
                acquire_timeout_secs: 1,
            },
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: 5,
            },
            host: "127.0.0.1".into(),
            port: 0,
        });
        Self::from_parts(Arc::new(MemoryCredentialStore::new()), config)
    }

    pub async fn close(&self) {
        self.store.close().await;
    }
}
