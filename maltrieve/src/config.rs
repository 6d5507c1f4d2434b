use crate::classifier::MimeFilter;
use crate::types::{FetchConfig, DEFAULT_USER_AGENT};
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "maltrieve.toml";
pub const FALLBACK_DUMP_DIR: &str = "/tmp/malware";

const DEFAULT_VXCAGE_URL: &str = "http://localhost:8080";
const DEFAULT_CUCKOO_URL: &str = "http://localhost:8090";
const DEFAULT_VIPER_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Parser)]
#[command(name = "maltrieve", version, about = "Retrieve malware samples from public feeds")]
pub struct Cli {
    /// Define HTTP proxy as address:port
    #[arg(short = 'p', long)]
    pub proxy: Option<String>,

    /// Define dump directory for retrieved files
    #[arg(short = 'd', long)]
    pub dumpdir: Option<PathBuf>,

    /// Define file for logging progress
    #[arg(short = 'l', long)]
    pub logfile: Option<PathBuf>,

    /// Dump the files to a CRITs instance
    #[arg(short = 'r', long)]
    pub crits: bool,

    /// Dump the files to a Viper instance
    #[arg(short = 'v', long)]
    pub viper: bool,

    /// Dump the files to a VxCage instance
    #[arg(short = 'x', long)]
    pub vxcage: bool,

    /// Enable Cuckoo analysis
    #[arg(short = 'c', long)]
    pub cuckoo: bool,

    /// Sort files by MIME type
    #[arg(short = 's', long = "sort-mime", alias = "sort_mime")]
    pub sort_mime: bool,

    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// On-disk configuration. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub proxy: Option<String>,
    pub dumpdir: Option<PathBuf>,
    pub logfile: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub state_dir: Option<PathBuf>,
    pub black_list: Option<Vec<String>>,
    pub white_list: Option<Vec<String>>,
    pub sort_mime: bool,
    pub log_headers: bool,
    pub vxcage: Option<EndpointConfig>,
    pub cuckoo: Option<EndpointConfig>,
    pub viper: Option<EndpointConfig>,
    pub crits: Option<CritsConfig>,
}

/// A sandbox reachable at one base URL. A section in the file enables it
/// unless `enabled = false`.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CritsConfig {
    pub url: String,
    pub username: String,
    pub api_key: String,
    #[serde(default = "default_crits_source")]
    pub source: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// CRITs deployments commonly run with self-signed certificates.
    #[serde(default)]
    pub verify_tls: bool,
}

fn default_true() -> bool {
    true
}

fn default_crits_source() -> String {
    "maltrieve".to_string()
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}

/// Base URLs of the enabled submission services.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServicesConfig {
    pub vxcage: Option<String>,
    pub cuckoo: Option<String>,
    pub viper: Option<String>,
    pub crits: Option<CritsConfig>,
}

impl ServicesConfig {
    pub fn any_enabled(&self) -> bool {
        self.vxcage.is_some() || self.cuckoo.is_some() || self.viper.is_some() || self.crits.is_some()
    }
}

/// Settings for one run, built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    pub fetch: FetchConfig,
    pub dump_dir: PathBuf,
    pub log_file: Option<PathBuf>,
    pub state_dir: PathBuf,
    pub mime_filter: MimeFilter,
    pub sort_mime: bool,
    pub services: ServicesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            dump_dir: PathBuf::from(FALLBACK_DUMP_DIR),
            log_file: None,
            state_dir: PathBuf::from("."),
            mime_filter: MimeFilter::default(),
            sort_mime: false,
            services: ServicesConfig::default(),
        }
    }
}

impl Config {
    /// Merge the file with the command line; command-line values win.
    pub fn resolve(cli: &Cli, file: FileConfig) -> Self {
        let fetch = FetchConfig {
            user_agent: file
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            proxy: cli.proxy.clone().or(file.proxy),
            log_headers: file.log_headers,
            ..FetchConfig::default()
        };

        let services = ServicesConfig {
            vxcage: endpoint(file.vxcage, cli.vxcage, DEFAULT_VXCAGE_URL),
            cuckoo: endpoint(file.cuckoo, cli.cuckoo, DEFAULT_CUCKOO_URL),
            viper: endpoint(file.viper, cli.viper, DEFAULT_VIPER_URL),
            crits: file.crits.filter(|crits| crits.enabled || cli.crits),
        };

        Self {
            fetch,
            dump_dir: cli
                .dumpdir
                .clone()
                .or(file.dumpdir)
                .unwrap_or_else(|| PathBuf::from(FALLBACK_DUMP_DIR)),
            log_file: cli.logfile.clone().or(file.logfile),
            state_dir: file.state_dir.unwrap_or_else(|| PathBuf::from(".")),
            mime_filter: MimeFilter::new(file.black_list, file.white_list),
            sort_mime: cli.sort_mime || file.sort_mime,
            services,
        }
    }

    /// Swap in the fallback dump directory if the configured one is unusable.
    pub fn with_usable_dump_dir(mut self) -> Self {
        self.dump_dir = ensure_dump_dir(&self.dump_dir);
        self
    }
}

// An explicit command-line flag turns a service on even if the file disables it
fn endpoint(section: Option<EndpointConfig>, flag: bool, default_url: &str) -> Option<String> {
    match section {
        Some(section) if section.enabled || flag => Some(section.url),
        Some(_) => None,
        None if flag => Some(default_url.to_string()),
        None => None,
    }
}

/// Create `dir` and prove it is writable, falling back to
/// [`FALLBACK_DUMP_DIR`] otherwise.
pub fn ensure_dump_dir(dir: &Path) -> PathBuf {
    match probe_writable(dir) {
        Ok(()) => {
            info!("Using {} as dump directory", dir.display());
            dir.to_path_buf()
        }
        Err(e) => {
            error!(
                "Could not open {} for writing ({}), using default {}",
                dir.display(),
                e,
                FALLBACK_DUMP_DIR
            );
            let fallback = PathBuf::from(FALLBACK_DUMP_DIR);
            if let Err(e) = std::fs::create_dir_all(&fallback) {
                warn!("Could not create {}: {}", fallback.display(), e);
            }
            fallback
        }
    }
}

fn probe_writable(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    tempfile::NamedTempFile::new_in(dir)?;
    Ok(())
}
