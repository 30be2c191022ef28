//! Core types, schemas, and validation for the session tracker.

pub mod analytics;
pub mod error;
pub mod events;
pub mod limits;
pub mod schema;
pub mod session;

pub use analytics::*;
pub use error::{Error, Result};
pub use events::*;
pub use session::*;
