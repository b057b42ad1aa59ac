//! ROR registry lookups and feedback submission: the async collaborators of
//! the correction engine.

mod error;
mod resolver;

pub use error::RorError;
pub use resolver::{Resolution, RorRecord, RorResolver, resolve_all, resolved_refs, stage_resolutions};

#[cfg(feature = "http")]
pub mod client;
#[cfg(feature = "http")]
pub mod feedback;

#[cfg(feature = "http")]
pub use client::{DEFAULT_ROR_API, RorClient};
#[cfg(feature = "http")]
pub use feedback::{FeedbackClient, FeedbackError};
