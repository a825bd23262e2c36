use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use sqlx::PgPool;
use tracing::info;

use crate::{
    config::AppConfig,
    db::{
        self,
        users::{self, NewUser},
    },
    roles::Role,
};

#[derive(Clone)]
pub struct AppState {
    pool: PgPool,
    config: Arc<AppConfig>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let pool = db::connect(&config.database_url).await?;
        db::migrate(&pool).await?;

        Ok(Self::from_parts(pool, config))
    }

    /// Wraps an existing pool without touching the schema.
    pub fn from_parts(pool: PgPool, config: AppConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }

    pub async fn ensure_seed_admin(&self) -> Result<()> {
        let has_admin = users::admin_exists(&self.pool)
            .await
            .context("failed to verify admin presence")?;

        if has_admin {
            return Ok(());
        }

        let bootstrap = &self.config.bootstrap_admin;
        let password_hash = crate::web::auth::hash_password(&bootstrap.password)
            .map_err(|err| anyhow!("failed to hash seed admin password: {err}"))?;

        users::create_user(
            &self.pool,
            &NewUser {
                fio: "Администратор",
                email: &bootstrap.email,
                password_hash: &password_hash,
                role: Role::Admin,
                lecturer_id: None,
            },
        )
        .await
        .context("failed to insert seed admin user")?;

        info!(
            email = %bootstrap.email,
            "Seeded bootstrap admin account. Change its password promptly."
        );
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn pool_ref(&self) -> &PgPool {
        &self.pool
    }
}
