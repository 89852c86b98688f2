//! Elevated-access sessions
//!
//! Time-boxed "recently re-verified" state per subject. The store only
//! records that a verification happened; checking credentials is the
//! caller's job.

pub mod store;
pub mod sweep;
pub mod ttl;

pub use store::{ElevatedAccessStore, SessionStats, SessionStoreConfig};
pub use ttl::ElevatedTtl;
