/// Database connection pooling and migration runner
pub mod connection;
/// Entity models for posts, media attachments and buttons
pub mod models;
