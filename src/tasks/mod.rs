//! Background Tasks Module
//!
//! Houses the periodic expiry sweeper that runs alongside the cache.

pub(crate) mod sweeper;

pub(crate) use sweeper::{spawn_sweeper, SweeperGuard};
