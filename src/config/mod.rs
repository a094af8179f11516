//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{CliArgs, Command, DatabaseOverride, MigrateArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "lyrics-library";
const ENV_PREFIX: &str = "LYRICS";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 15;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 4;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_CACHE_TRACK_LIMIT: usize = 1000;
const DEFAULT_CACHE_ARTIST_LIMIT: usize = 200;
const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60;
const DEFAULT_WARMUP_QUEUE_CAPACITY: usize = 256;
const DEFAULT_WARMUP_CONCURRENCY: usize = 4;
const DEFAULT_WARMUP_TASK_TIMEOUT_MS: u64 = 2000;
const DEFAULT_LYRICS_BASE_URL: &str = "https://api.lyrics.ovh";
const DEFAULT_LYRICS_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TRANSLATOR_BASE_URL: &str = "https://translate.api.cloud.yandex.net";
const DEFAULT_TRANSLATOR_TARGET_LANGUAGE: &str = "ru";
const DEFAULT_TRANSLATOR_TIMEOUT_SECS: u64 = 10;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub warmup: WarmupSettings,
    pub lyrics: LyricsSettings,
    pub translator: TranslatorSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub track_limit: usize,
    pub artist_limit: usize,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct WarmupSettings {
    pub queue_capacity: NonZeroUsize,
    pub concurrency: NonZeroUsize,
    pub task_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LyricsSettings {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct TranslatorSettings {
    pub base_url: Url,
    /// Required to serve; `migrate` runs without it.
    pub api_key: Option<String>,
    pub folder_id: Option<String>,
    pub target_language: String,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Migrate(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    warmup: RawWarmupSettings,
    lyrics: RawLyricsSettings,
    translator: RawTranslatorSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.server_request_timeout_seconds {
            self.server.request_timeout_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(limit) = overrides.cache_track_limit {
            self.cache.track_limit = Some(limit);
        }
        if let Some(limit) = overrides.cache_artist_limit {
            self.cache.artist_limit = Some(limit);
        }
        if let Some(seconds) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(seconds);
        }
        if let Some(capacity) = overrides.warmup_queue_capacity {
            self.warmup.queue_capacity = Some(capacity);
        }
        if let Some(concurrency) = overrides.warmup_concurrency {
            self.warmup.concurrency = Some(concurrency);
        }
        if let Some(millis) = overrides.warmup_task_timeout_ms {
            self.warmup.task_timeout_ms = Some(millis);
        }
        if let Some(url) = overrides.lyrics_base_url.as_ref() {
            self.lyrics.base_url = Some(url.clone());
        }
        if let Some(url) = overrides.translator_base_url.as_ref() {
            self.translator.base_url = Some(url.clone());
        }
        if let Some(folder) = overrides.translator_folder_id.as_ref() {
            self.translator.folder_id = Some(folder.clone());
        }
        if let Some(language) = overrides.translator_target_language.as_ref() {
            self.translator.target_language = Some(language.clone());
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cache,
            warmup,
            lyrics,
            translator,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            warmup: build_warmup_settings(warmup)?,
            lyrics: build_lyrics_settings(lyrics)?,
            translator: build_translator_settings(translator)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_shutdown = positive_secs(
        server
            .graceful_shutdown_seconds
            .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS),
        "server.graceful_shutdown_seconds",
    )?;
    let request_timeout = positive_secs(
        server
            .request_timeout_seconds
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        "server.request_timeout_seconds",
    )?;

    Ok(ServerSettings {
        addr,
        graceful_shutdown,
        request_timeout,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = non_blank(database.url);

    let max_connections = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = NonZeroU32::new(max_connections).ok_or_else(|| {
        LoadError::invalid("database.max_connections", "must be greater than zero")
    })?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl = positive_secs(
        cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS),
        "cache.ttl_seconds",
    )?;

    Ok(CacheSettings {
        track_limit: cache.track_limit.unwrap_or(DEFAULT_CACHE_TRACK_LIMIT),
        artist_limit: cache.artist_limit.unwrap_or(DEFAULT_CACHE_ARTIST_LIMIT),
        ttl,
    })
}

fn build_warmup_settings(warmup: RawWarmupSettings) -> Result<WarmupSettings, LoadError> {
    let queue_capacity = non_zero_usize(
        warmup
            .queue_capacity
            .unwrap_or(DEFAULT_WARMUP_QUEUE_CAPACITY),
        "warmup.queue_capacity",
    )?;
    let concurrency = non_zero_usize(
        warmup.concurrency.unwrap_or(DEFAULT_WARMUP_CONCURRENCY),
        "warmup.concurrency",
    )?;

    let task_timeout_ms = warmup
        .task_timeout_ms
        .unwrap_or(DEFAULT_WARMUP_TASK_TIMEOUT_MS);
    if task_timeout_ms == 0 {
        return Err(LoadError::invalid(
            "warmup.task_timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(WarmupSettings {
        queue_capacity,
        concurrency,
        task_timeout: Duration::from_millis(task_timeout_ms),
    })
}

fn build_lyrics_settings(lyrics: RawLyricsSettings) -> Result<LyricsSettings, LoadError> {
    let base_url = parse_base_url(
        lyrics.base_url.as_deref().unwrap_or(DEFAULT_LYRICS_BASE_URL),
        "lyrics.base_url",
    )?;
    let timeout = positive_secs(
        lyrics.timeout_seconds.unwrap_or(DEFAULT_LYRICS_TIMEOUT_SECS),
        "lyrics.timeout_seconds",
    )?;

    Ok(LyricsSettings { base_url, timeout })
}

fn build_translator_settings(
    translator: RawTranslatorSettings,
) -> Result<TranslatorSettings, LoadError> {
    let base_url = parse_base_url(
        translator
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_TRANSLATOR_BASE_URL),
        "translator.base_url",
    )?;

    let target_language = non_blank(translator.target_language)
        .unwrap_or_else(|| DEFAULT_TRANSLATOR_TARGET_LANGUAGE.to_string());

    let timeout = positive_secs(
        translator
            .timeout_seconds
            .unwrap_or(DEFAULT_TRANSLATOR_TIMEOUT_SECS),
        "translator.timeout_seconds",
    )?;

    Ok(TranslatorSettings {
        base_url,
        api_key: non_blank(translator.api_key),
        folder_id: non_blank(translator.folder_id),
        target_language,
        timeout,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    track_limit: Option<usize>,
    artist_limit: Option<usize>,
    ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawWarmupSettings {
    queue_capacity: Option<usize>,
    concurrency: Option<usize>,
    task_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLyricsSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTranslatorSettings {
    base_url: Option<String>,
    api_key: Option<String>,
    folder_id: Option<String>,
    target_language: Option<String>,
    timeout_seconds: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_base_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    let url = Url::parse(value.trim())
        .map_err(|err| LoadError::invalid(key, format!("invalid url `{value}`: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(key, "scheme must be http or https"));
    }
    if url.cannot_be_a_base() {
        return Err(LoadError::invalid(key, "url cannot be used as a base"));
    }
    Ok(url)
}

fn positive_secs(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

fn non_zero_usize(value: usize, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
