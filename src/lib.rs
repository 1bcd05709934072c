pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::{CsvRoster, FixedDelayPacer, NoPacer, ReqwestTransport, TokenBucketPacer};
pub use crate::app::sweep::{SweepOptions, TamperSweep};
pub use crate::config::{credentials::Credentials, toml_config::AppConfig, CliConfig};
pub use crate::core::{bootstrap::bootstrap, bootstrap::ApiHosts, queries::CentralApi};
pub use crate::domain::model::{Session, SweepReport};
pub use crate::utils::error::{CentralError, Result};
