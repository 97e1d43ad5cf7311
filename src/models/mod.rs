//! Data models for the grant backend.
//!
//! Entities serialize to the JSON shapes served by the API; request types carry
//! the presence-aware update semantics.

mod grant;
mod patch;
mod tag;

pub use grant::*;
pub use patch::*;
pub use tag::*;
