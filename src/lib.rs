pub mod backend;
pub mod config;
pub mod error;
pub mod formats;
pub mod manifest;
pub mod registry;
pub mod storage;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use registry::{LoadReport, TrackRegistry};
