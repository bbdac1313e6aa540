use crate::config::TomlConfig;
use crate::utils::logger::LogFormat;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "campus-notify")]
#[command(about = "Email campuses about students returning from placement and stamp the sheet")]
pub struct CliConfig {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "campus-notify.toml")]
    pub config: String,

    /// Directory holding one CSV file per sheet (overrides source.workbook)
    #[arg(long)]
    pub workbook: Option<String>,

    /// Sheet to process (overrides source.sheet)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Render and log messages without sending or stamping
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

impl CliConfig {
    /// Applies command-line overrides on top of the file configuration.
    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(workbook) = &self.workbook {
            config.source.workbook = workbook.clone();
        }
        if let Some(sheet) = &self.sheet {
            config.source.sheet = sheet.clone();
        }
    }

    pub fn log_format(&self) -> LogFormat {
        if self.log_json {
            LogFormat::Json
        } else {
            LogFormat::Compact
        }
    }
}
