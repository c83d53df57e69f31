pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;

pub use config::SyncConfig;
pub use error::SyncError;
pub use telemetry::init_tracing;
pub use types::{JobStatus, Platform};
