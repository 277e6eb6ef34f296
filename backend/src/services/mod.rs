//! Business logic services for the Aira irrigation advisory backend

pub mod access;
pub mod agrifield;
pub mod auth;
pub mod home;
pub mod irrigation_log;
pub mod model_runs;
pub mod performance;
pub mod profile;
pub mod timeseries;

#[cfg(test)]
mod testing;

pub use access::AccessService;
pub use agrifield::AgrifieldService;
pub use auth::AuthService;
pub use home::HomeService;
pub use irrigation_log::IrrigationLogService;
pub use model_runs::{recalculate_all, RecalculationSummary};
pub use performance::PerformanceService;
pub use profile::ProfileService;
pub use timeseries::TimeseriesCache;
