//! External service integrations

pub mod model_engine;
pub mod raster;

pub use model_engine::{ModelEngine, ModelEngineClient, ModelResults};
pub use raster::{RasterSampler, TimeseriesPoint};
