//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the host is up.
//!
//! # Tasks
//! - Room TTL sweep: extends every live room's base keys at a fixed interval

mod sweep;

pub use sweep::spawn_sweep_task;
