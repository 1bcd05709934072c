use clap::Parser;
use tamper_toggle::config::toml_config::ConfiguredPacer;
use tamper_toggle::config::Command;
use tamper_toggle::domain::ports::Pacer;
use tamper_toggle::utils::{logger, validation::Validate};
use tamper_toggle::{
    bootstrap, AppConfig, CentralApi, CentralError, CliConfig, Credentials, CsvRoster,
    ReqwestTransport, Session, SweepOptions, TamperSweep,
};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting tamper-toggle");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }
}

fn load_config(cli: &CliConfig) -> tamper_toggle::Result<AppConfig> {
    tracing::info!("📁 Loading configuration from: {}", cli.config);
    let mut config = AppConfig::from_file_or_default(&cli.config)?;

    // 命令列覆蓋設定
    if let Some(credentials) = &cli.credentials {
        config.credentials.path = credentials.clone();
    }
    if let Some(tenant) = &cli.tenant {
        config.api.tenant_name = tenant.clone();
    }
    if let Command::Sweep {
        roster: Some(roster),
        ..
    } = &cli.command
    {
        config.sweep.roster_path = roster.clone();
    }

    config.validate()?;
    tracing::info!("✅ Configuration loaded and validated successfully");
    Ok(config)
}

async fn run(cli: CliConfig) -> tamper_toggle::Result<()> {
    let config = load_config(&cli)?;
    let credentials = Credentials::from_file(&config.credentials.path)?;

    let transport = ReqwestTransport::new().with_timeout(config.request_timeout());
    let session = bootstrap(
        &transport,
        &config.api_hosts(),
        &credentials,
        &config.api.tenant_name,
    )
    .await?;

    let api = CentralApi::new(transport, config.pacing.build()?);

    match cli.command {
        Command::Sweep { dry_run, .. } => sweep(&api, &session, &config, dry_run).await,
        Command::User { username } => show_user(&api, &session, &username).await,
        Command::Status { endpoint_id } => {
            let status = api.get_tamper_status(&session, &endpoint_id).await?;
            println!("{}: enabled = {}", endpoint_id, status.enabled);
            if !status.details.is_empty() {
                println!("{}", serde_json::to_string_pretty(&status.details)?);
            }
            Ok(())
        }
        Command::Set {
            endpoint_id,
            enabled,
        } => {
            let response = api.set_tamper_status(&session, &endpoint_id, enabled).await?;
            println!("{}: tamper protection set to {}", endpoint_id, enabled);
            tracing::debug!("Response: {}", response);
            Ok(())
        }
    }
}

async fn sweep(
    api: &CentralApi<ReqwestTransport, ConfiguredPacer>,
    session: &Session,
    config: &AppConfig,
    dry_run: bool,
) -> tamper_toggle::Result<()> {
    if config.sweep.groups.is_empty() {
        return Err(CentralError::MissingConfigError {
            field: "sweep.groups".to_string(),
        });
    }

    let roster = CsvRoster::new(
        &config.sweep.roster_path,
        &config.sweep.group_column,
        &config.sweep.name_column,
    )?;
    let options = SweepOptions {
        groups: config.sweep.groups.iter().cloned().collect(),
        page_size: config.api.page_size,
        enable: config.sweep.enable,
        dry_run,
    };

    if dry_run {
        tracing::info!("🔍 DRY RUN MODE - tamper protection will not be changed");
    }

    let report = TamperSweep::new(api, roster, options).run(session).await?;

    println!(
        "✅ {} roster rows matched, {} endpoints found, {} updated",
        report.rows_matched, report.endpoints_matched, report.endpoints_updated
    );
    for failure in &report.failures {
        println!(
            "❌ {} ({}): {}",
            failure.hostname, failure.endpoint_id, failure.message
        );
    }

    if session.token_expired_at(chrono::Utc::now()) {
        tracing::warn!("⚠️ Access token expired during the run; later requests may have been rejected");
    }

    report.ensure_clean()
}

async fn show_user(
    api: &CentralApi<ReqwestTransport, ConfiguredPacer>,
    session: &Session,
    username: &str,
) -> tamper_toggle::Result<()> {
    let endpoints = api.endpoints_for_user(session, username).await?;

    for endpoint in &endpoints {
        let tamper = match api.get_tamper_status(session, &endpoint.id).await {
            Ok(status) => format!("enabled = {}", status.enabled),
            Err(e) => {
                tracing::warn!("⚠️ {}", e);
                "unknown".to_string()
            }
        };
        println!(
            "{}   {}   {}   {}",
            endpoint.hostname_or_id(),
            endpoint.id,
            endpoint.via_login().unwrap_or("-"),
            tamper
        );
        api.pacer().pace().await;
    }

    Ok(())
}
