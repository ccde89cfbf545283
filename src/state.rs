use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;
use crate::images::probe::{HttpSizeProbe, SizeProbe};
use crate::users::repo::{PgUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub probe: Arc<dyn SizeProbe>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;

        let users = Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>;
        let probe = Arc::new(HttpSizeProbe::new(std::time::Duration::from_secs(
            config.size_probe_timeout_secs,
        ))?) as Arc<dyn SizeProbe>;

        if config.providers.is_empty() {
            tracing::warn!("no OAuth providers configured; sign-in is disabled");
        }

        Ok(Self::from_parts(config, users, probe))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        probe: Arc<dyn SizeProbe>,
    ) -> Self {
        Self {
            config,
            users,
            probe,
        }
    }
}
