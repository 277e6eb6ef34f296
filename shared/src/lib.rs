//! Shared types and models for the Aira irrigation advisory service
//!
//! Holds the domain models, the pure performance aggregation and access
//! rules, and validation helpers used by the backend.

pub mod access;
pub mod models;
pub mod types;
pub mod validation;

pub use access::*;
pub use models::*;
pub use types::*;
pub use validation::*;
