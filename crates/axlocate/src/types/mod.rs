/*! Core value types shared across the crate.

Regenerate TypeScript types: `cargo test -p axlocate export_bindings`
*/

#![allow(missing_docs)]

mod error;
mod event;
mod geometry;
mod ids;
mod recency;

pub use error::{LocateError, LocateResult};
pub use event::{CacheEvent, EvictionReason};
pub use geometry::Frame;
pub use ids::{NativeRef, NodeIdentity, ProcessId};
pub use recency::Recency;
