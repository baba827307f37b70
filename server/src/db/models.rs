/// Database row types for all tables.
/// These correspond 1:1 to the SQLite schema defined in migrations.rs.

/// User record in the users table
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub fullname: String,
    pub email: String,
    pub password_hash: String,
    pub gender: String,
    pub avatar_url: String,
    pub created_at: String,
}

/// Sidebar listing entry: everything a client needs to start a chat.
#[derive(Debug, Clone)]
pub struct UserSummary {
    pub id: String,
    pub fullname: String,
    pub avatar_url: String,
}

/// One-to-one conversation between two users
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub participant_a: String,
    pub participant_b: String,
    pub created_at: String,
    pub last_message_at: Option<String>,
}

/// Persisted chat message
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub body: String,
    pub created_at: String,
}
