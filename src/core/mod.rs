pub mod config;
pub mod errors;

pub use config::{AppSettings, Config, ErrorSettings, MaintenanceConfig, ServiceSection};
pub use errors::{AppError, AppResult};
