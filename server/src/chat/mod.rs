pub mod messages;
pub mod router;
pub mod users;
