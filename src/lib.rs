pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{CsvWorkbook, LogOnlyTransport, SmtpMailTransport};
pub use crate::core::{directory::CampusDirectory, engine::NotificationEngine, template::TemplateRenderer};
pub use domain::model::RunSummary;
pub use utils::error::{NotifyError, Result};
