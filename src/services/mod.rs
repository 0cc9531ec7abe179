/// Health check HTTP endpoints
pub mod health;
/// Media group (album) collection with a debounce window
pub mod media_group;
/// Channel membership and permission probes
pub mod permissions;
/// Preview rendering to the author's own chat
pub mod preview;
/// Rendering and delivery of posts to the channel
pub mod publishing;
/// Durable one-shot timers for scheduled posts
pub mod scheduler;
