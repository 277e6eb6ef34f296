//! Domain models for the Aira irrigation advisory service

mod agrifield;
mod irrigation_log;
mod performance;
mod profile;
mod timeseries;
mod user;

pub use agrifield::*;
pub use irrigation_log::*;
pub use performance::*;
pub use profile::*;
pub use timeseries::*;
pub use user::*;
