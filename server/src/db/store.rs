//! Query layer over the SQLite schema.
//!
//! All functions are synchronous and take `&Connection`; callers hold the
//! pool mutex inside `tokio::task::spawn_blocking`. Message durability is
//! entirely independent of delivery: a row committed here exists whether or
//! not the recipient is online.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use super::models::{Conversation, Message, User, UserSummary};

/// Input for creating a user account. The password arrives already hashed.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub fullname: String,
    pub email: String,
    pub password_hash: String,
    pub gender: String,
    pub avatar_url: String,
}

/// Insert a new user and return the stored row.
pub fn create_user(conn: &Connection, new_user: &NewUser) -> rusqlite::Result<User> {
    let id = Uuid::now_v7().to_string();
    let created_at = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO users (id, username, fullname, email, password_hash, gender, avatar_url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            id,
            new_user.username,
            new_user.fullname,
            new_user.email,
            new_user.password_hash,
            new_user.gender,
            new_user.avatar_url,
            created_at,
        ],
    )?;

    Ok(User {
        id,
        username: new_user.username.clone(),
        fullname: new_user.fullname.clone(),
        email: new_user.email.clone(),
        password_hash: new_user.password_hash.clone(),
        gender: new_user.gender.clone(),
        avatar_url: new_user.avatar_url.clone(),
        created_at,
    })
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        fullname: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        gender: row.get(5)?,
        avatar_url: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const USER_COLUMNS: &str =
    "id, username, fullname, email, password_hash, gender, avatar_url, created_at";

pub fn find_user_by_id(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        rusqlite::params![user_id],
        user_from_row,
    )
    .optional()
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        rusqlite::params![email],
        user_from_row,
    )
    .optional()
}

/// True if another account already holds this email or username.
pub fn identity_taken(conn: &Connection, email: &str, username: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1 OR username = ?2",
        rusqlite::params![email, username],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// All users except the caller, for the chat sidebar.
pub fn list_users_except(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<UserSummary>> {
    let mut stmt = conn.prepare(
        "SELECT id, fullname, avatar_url FROM users WHERE id != ?1 ORDER BY fullname",
    )?;

    let users = stmt
        .query_map(rusqlite::params![user_id], |row| {
            Ok(UserSummary {
                id: row.get(0)?,
                fullname: row.get(1)?,
                avatar_url: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(users)
}

/// Normalize participant order so each pair maps to exactly one row.
fn normalize_pair<'a>(user_a: &'a str, user_b: &'a str) -> (&'a str, &'a str) {
    if user_a < user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    }
}

/// Look up the conversation between two users without creating it.
pub fn find_conversation(
    conn: &Connection,
    user_a: &str,
    user_b: &str,
) -> rusqlite::Result<Option<Conversation>> {
    let (participant_a, participant_b) = normalize_pair(user_a, user_b);

    conn.query_row(
        "SELECT id, participant_a, participant_b, created_at, last_message_at
         FROM conversations WHERE participant_a = ?1 AND participant_b = ?2",
        rusqlite::params![participant_a, participant_b],
        |row| {
            Ok(Conversation {
                id: row.get(0)?,
                participant_a: row.get(1)?,
                participant_b: row.get(2)?,
                created_at: row.get(3)?,
                last_message_at: row.get(4)?,
            })
        },
    )
    .optional()
}

/// Return the conversation between the two users, creating it if missing.
pub fn create_or_find_conversation(
    conn: &Connection,
    user_a: &str,
    user_b: &str,
) -> rusqlite::Result<Conversation> {
    let (participant_a, participant_b) = normalize_pair(user_a, user_b);

    if let Some(conversation) = find_conversation(conn, user_a, user_b)? {
        return Ok(conversation);
    }

    let id = Uuid::now_v7().to_string();
    let created_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO conversations (id, participant_a, participant_b, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![id, participant_a, participant_b, created_at],
    )?;

    Ok(Conversation {
        id,
        participant_a: participant_a.to_string(),
        participant_b: participant_b.to_string(),
        created_at,
        last_message_at: None,
    })
}

/// Durably append a message to a conversation and bump its activity marker.
pub fn append_message(
    conn: &Connection,
    conversation_id: &str,
    sender_id: &str,
    body: &str,
) -> rusqlite::Result<Message> {
    let id = Uuid::now_v7().to_string();
    let created_at = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO messages (id, conversation_id, sender_id, body, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id, conversation_id, sender_id, body, created_at],
    )?;
    conn.execute(
        "UPDATE conversations SET last_message_at = ?1 WHERE id = ?2",
        rusqlite::params![created_at, conversation_id],
    )?;

    Ok(Message {
        id,
        conversation_id: conversation_id.to_string(),
        sender_id: sender_id.to_string(),
        body: body.to_string(),
        created_at,
    })
}

/// Full message history of a conversation, oldest first.
/// UUIDv7 ids break created_at ties in insert order.
pub fn list_messages(conn: &Connection, conversation_id: &str) -> rusqlite::Result<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, sender_id, body, created_at
         FROM messages WHERE conversation_id = ?1
         ORDER BY created_at ASC, id ASC",
    )?;

    let messages = stmt
        .query_map(rusqlite::params![conversation_id], |row| {
            Ok(Message {
                id: row.get(0)?,
                conversation_id: row.get(1)?,
                sender_id: row.get(2)?,
                body: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(messages)
}
