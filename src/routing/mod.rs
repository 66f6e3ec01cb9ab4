//! Worker routing: consistent hashing and membership-aware resolution.
//!
//! A path key is deterministically mapped to one of N workers so that
//! repeated operations on the same path hit the same worker cache, and so
//! that a single membership change remaps only the keys owned by the
//! affected worker.

mod hashring;
mod router;

pub use hashring::HashRing;
pub use router::{MembershipSource, WorkerRouter};
