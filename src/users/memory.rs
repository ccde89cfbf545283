use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;

use super::repo::UserStore;
use super::repo_types::{InsertOutcome, User, DEFAULT_CONVERT_CREDITS, DEFAULT_CREDITS};

/// In-memory `UserStore` for tests. Counts reads and can be switched to fail.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
    reads: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<User> {
        self.rows.lock().unwrap().clone()
    }

    pub fn seed(&self, name: &str, email: &str, credits: i32, convert_credits: i32) {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.len() as i64 + 1;
        rows.push(User {
            id,
            name: name.into(),
            email: email.into(),
            credits,
            convert_credits,
        });
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_if_absent(&self, email: &str, name: &str) -> anyhow::Result<InsertOutcome> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.email == email) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        let id = rows.len() as i64 + 1;
        rows.push(User {
            id,
            name: name.into(),
            email: email.into(),
            credits: DEFAULT_CREDITS,
            convert_credits: DEFAULT_CONVERT_CREDITS,
        });
        Ok(InsertOutcome::Inserted)
    }
}
