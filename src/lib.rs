// Shutterline image transformation library

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod optimizer;
pub mod params;
pub mod pipeline;
pub mod storage;
