use sqlx::FromRow;

pub const DEFAULT_CREDITS: i32 = 5;
pub const DEFAULT_CONVERT_CREDITS: i32 = 20;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,             // unique identity key
    pub credits: i32,
    pub convert_credits: i32,
}

/// Result of a conditional insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}
