use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::users::repo_types::{InsertOutcome, User, DEFAULT_CONVERT_CREDITS, DEFAULT_CREDITS};

/// Access to the `users` table. Lookups are exact-match on email.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Insert a row with default counters unless one already exists for `email`.
    async fn insert_if_absent(&self, email: &str, name: &str) -> anyhow::Result<InsertOutcome>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, credits, convert_credits
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("select user by email")?;
        Ok(user)
    }

    async fn insert_if_absent(&self, email: &str, name: &str) -> anyhow::Result<InsertOutcome> {
        let res = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (name, email, credits, convert_credits)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(DEFAULT_CREDITS)
        .bind(DEFAULT_CONVERT_CREDITS)
        .fetch_optional(&self.db)
        .await;

        match res {
            Ok(Some(id)) => {
                debug!(user_id = id, "user row inserted");
                Ok(InsertOutcome::Inserted)
            }
            Ok(None) => Ok(InsertOutcome::AlreadyExists),
            // ON CONFLICT covers the common race; a unique violation can still
            // surface if the constraint is ever declared differently.
            Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(e) => Err(e).context("insert user"),
        }
    }
}
