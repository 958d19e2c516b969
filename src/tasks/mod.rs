//! Background Tasks Module
//!
//! Contains background tasks that run alongside the cache.
//!
//! # Tasks
//! - Sweeper: Removes expired cache entries at configured intervals

mod sweeper;

pub use sweeper::SweeperHandle;
pub(crate) use sweeper::spawn_sweeper;
