use clap::Parser;
use maltrieve::config::{Cli, Config, FileConfig};
use maltrieve::limits::raise_open_file_limit;
use maltrieve::{Harvester, OPEN_FILE_LIMIT};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let fd_limit = raise_open_file_limit(OPEN_FILE_LIMIT);

    let cli = Cli::parse();
    let file_config = FileConfig::load(&cli.config);
    let config = Config::resolve(&cli, file_config.as_ref().cloned().unwrap_or_default());

    init_tracing(config.log_file.as_deref());

    if let Err(e) = &file_config {
        warn!("{:#}; using defaults", e);
    }
    match fd_limit {
        Ok(limit) => info!("Open file limit is {}", limit),
        Err(e) => warn!("Could not raise open file limit: {}", e),
    }
    if cli.crits && config.services.crits.is_none() {
        warn!("CRITs requested but no [crits] section is configured; skipping it");
    }

    let config = config.with_usable_dump_dir();
    let harvester = Harvester::new(&config)?;

    if let Some(proxy) = &config.fetch.proxy {
        info!("Using proxy {}", proxy);
        harvester.report_external_ip().await;
    }

    tokio::select! {
        result = harvester.run() => match result {
            Ok(summary) => info!("{:?}", summary),
            Err(e) => {
                error!("Run failed: {}", e);
                return Err(e.into());
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; discoveries from this run were not saved");
        }
    }

    Ok(())
}

fn init_tracing(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,maltrieve=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let Some(path) = log_file else {
        builder.init();
        return;
    };

    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        Err(e) => {
            builder.init();
            warn!("Could not open log file {}: {}; logging to stdout", path.display(), e);
        }
    }
}
