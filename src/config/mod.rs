//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;


const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "stillpoint";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_SITE_URL: &str = "http://127.0.0.1:3000/";
const DEFAULT_SWEEP_SCHEDULE: &str = "0 * * * * *";
const DEFAULT_DATA_DIR: &str = ".stillpoint";
const DEFAULT_EMAIL_SENDER: &str = "hello@stillpoint.example";

/// Command-line arguments for the Stillpoint binary.
#[derive(Debug, Parser)]
#[command(name = "stillpoint", version, about = "Stillpoint content and automation backend")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "STILLPOINT_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service and the publish-sweep worker.
    Serve(Box<ServeArgs>),
    /// Local practice log: toggle completion and show progress.
    Practice(PracticeArgs),
    /// Local dream journal: add and list entries.
    Journal(JournalArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct PracticeArgs {
    #[command(subcommand)]
    pub command: PracticeCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum PracticeCommand {
    /// Toggle completion for a practice on a day (defaults to today).
    Toggle {
        /// Practice grouping tag, e.g. `breathwork`.
        practice_id: String,
        /// Day in YYYY-MM-DD form; today when omitted.
        #[arg(long)]
        date: Option<String>,
    },
    /// Print progress stats over the whole log.
    Stats,
}

#[derive(Debug, Args, Clone)]
pub struct JournalArgs {
    #[command(subcommand)]
    pub command: JournalCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum JournalCommand {
    /// Record a new entry.
    Add {
        /// Entry body text.
        body: String,
        #[arg(long)]
        title: Option<String>,
        /// Repeatable tag flag.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// List entries, optionally filtered by substring.
    List {
        #[arg(long)]
        filter: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read configuration: {0}")]
    Read(#[from] config::ConfigError),
    #[error("invalid setting `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

impl SettingsError {
    fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn addr(&self) -> Result<SocketAddr, SettingsError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|err| SettingsError::invalid("server.host", format!("{err}")))
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct AdminSettings {
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub public_url: Url,
}

#[derive(Debug, Clone)]
pub struct NotifySettings {
    pub email_api_url: Option<Url>,
    pub email_sender: String,
    pub email_api_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SweepSettings {
    pub schedule: String,
}

#[derive(Debug, Clone)]
pub struct LocalSettings {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    pub admin: AdminSettings,
    pub site: SiteSettings,
    pub notify: NotifySettings,
    pub sweep: SweepSettings,
    pub local: LocalSettings,
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    database: RawDatabase,
    #[serde(default)]
    logging: RawLogging,
    #[serde(default)]
    admin: RawAdmin,
    #[serde(default)]
    site: RawSite,
    #[serde(default)]
    notify: RawNotify,
    #[serde(default)]
    sweep: RawSweep,
    #[serde(default)]
    local: RawLocal,
}

#[derive(Debug, Default, Deserialize)]
struct RawServer {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDatabase {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLogging {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAdmin {
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSite {
    public_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawNotify {
    email_api_url: Option<String>,
    email_sender: Option<String>,
    email_api_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSweep {
    schedule: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLocal {
    data_dir: Option<PathBuf>,
}

/// Parse CLI arguments and load settings with CLI overrides applied.
pub fn load_with_cli() -> Result<(CliArgs, Settings), SettingsError> {
    let cli_args = CliArgs::parse();
    let mut settings = load(cli_args.config_file.as_deref())?;

    if let Some(Command::Serve(serve)) = &cli_args.command {
        apply_serve_overrides(&mut settings, serve)?;
    }

    Ok((cli_args, settings))
}

/// Load settings from the layered sources: bundled defaults file (when
/// present), a local `stillpoint.toml`, an explicit `--config-file`, and
/// `STILLPOINT_*` environment variables, in ascending precedence.
pub fn load(config_file: Option<&std::path::Path>) -> Result<Settings, SettingsError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path.to_path_buf()));
    }

    let config = builder
        .add_source(Environment::with_prefix("STILLPOINT").separator("__"))
        .build()?;

    let raw: RawSettings = config.try_deserialize()?;
    finalize(raw)
}

fn finalize(raw: RawSettings) -> Result<Settings, SettingsError> {
    let level = match raw.logging.level.as_deref() {
        None => LevelFilter::INFO,
        Some(value) => LevelFilter::from_str(value)
            .map_err(|_| SettingsError::invalid("logging.level", format!("`{value}`")))?,
    };

    let format = if raw.logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    let public_url = {
        let value = raw
            .site
            .public_url
            .unwrap_or_else(|| DEFAULT_SITE_URL.to_string());
        Url::parse(&value)
            .map_err(|err| SettingsError::invalid("site.public_url", err.to_string()))?
    };

    let email_api_url = raw
        .notify
        .email_api_url
        .map(|value| {
            Url::parse(&value)
                .map_err(|err| SettingsError::invalid("notify.email_api_url", err.to_string()))
        })
        .transpose()?;

    let max_connections = raw
        .database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = NonZeroU32::new(max_connections)
        .ok_or_else(|| SettingsError::invalid("database.max_connections", "must be nonzero"))?;

    Ok(Settings {
        server: ServerSettings {
            host: raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: raw.server.port.unwrap_or(DEFAULT_PORT),
        },
        database: DatabaseSettings {
            url: raw.database.url,
            max_connections,
        },
        logging: LoggingSettings { level, format },
        admin: AdminSettings {
            password: raw.admin.password.unwrap_or_default(),
        },
        site: SiteSettings { public_url },
        notify: NotifySettings {
            email_api_url,
            email_sender: raw
                .notify
                .email_sender
                .unwrap_or_else(|| DEFAULT_EMAIL_SENDER.to_string()),
            email_api_token: raw.notify.email_api_token,
        },
        sweep: SweepSettings {
            schedule: raw
                .sweep
                .schedule
                .unwrap_or_else(|| DEFAULT_SWEEP_SCHEDULE.to_string()),
        },
        local: LocalSettings {
            data_dir: raw
                .local
                .data_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        },
    })
}

fn apply_serve_overrides(settings: &mut Settings, serve: &ServeArgs) -> Result<(), SettingsError> {
    if let Some(host) = &serve.server_host {
        settings.server.host = host.clone();
    }
    if let Some(port) = serve.server_port {
        settings.server.port = port;
    }
    if let Some(url) = &serve.database_url {
        settings.database.url = Some(url.clone());
    }
    if let Some(level) = &serve.log_level {
        settings.logging.level = LevelFilter::from_str(level)
            .map_err(|_| SettingsError::invalid("logging.level", format!("`{level}`")))?;
    }
    if let Some(json) = serve.log_json {
        settings.logging.format = if json {
            LogFormat::Json
        } else {
            LogFormat::Compact
        };
    }
    Ok(())
}
