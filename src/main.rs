use anyhow::Context;
use campus_notify::core::MailTransport;
use campus_notify::utils::{logger, validation::Validate};
use campus_notify::{
    CliConfig, CsvWorkbook, LogOnlyTransport, NotificationEngine, RunSummary, SmtpMailTransport,
    TomlConfig,
};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_logger(cli.verbose, cli.log_format());

    tracing::info!("Starting campus-notify");
    tracing::info!("Loading configuration from: {}", cli.config);

    let mut config = match TomlConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };
    cli.apply_overrides(&mut config);

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let result = if cli.dry_run {
        tracing::info!("DRY RUN - messages are logged, nothing is sent or stamped");
        run(&config, LogOnlyTransport, false).await?
    } else {
        let (smtp, from) = config.smtp_settings()?;
        let transport = SmtpMailTransport::new(&smtp, &from)
            .with_context(|| format!("failed to set up SMTP transport for {}", smtp.host))?;
        run(&config, transport, true).await?
    };

    match result {
        Ok(summary) => {
            println!("{}", summary);
            if summary.has_errors() {
                std::process::exit(2);
            }
        }
        Err(e) => {
            tracing::error!(
                "Run aborted: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Setup failures surface through anyhow; run failures are returned for reporting.
async fn run<M: MailTransport>(
    config: &TomlConfig,
    transport: M,
    stamp_rows: bool,
) -> anyhow::Result<campus_notify::Result<RunSummary>> {
    let directory = config.directory().context("failed to load campus directory")?;
    tracing::debug!("Campus directory has {} entries", directory.len());

    let store = CsvWorkbook::new(&config.source.workbook);
    let engine = NotificationEngine::new(store, transport, config.notify_settings(stamp_rows), directory)
        .with_template(config.message_template(), config.renderer());

    Ok(engine.run().await)
}
