use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the lyrics-library binary.
#[derive(Debug, Parser)]
#[command(
    name = "lyrics-library",
    version,
    about = "Lyrics and translation library service"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "LYRICS_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Apply pending database migrations and exit.
    Migrate(MigrateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the per-request deadline.
    #[arg(long = "server-request-timeout-seconds", value_name = "SECONDS")]
    pub server_request_timeout_seconds: Option<u64>,

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

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the single-track cache capacity.
    #[arg(long = "cache-track-limit", value_name = "COUNT")]
    pub cache_track_limit: Option<usize>,

    /// Override the artist listing cache capacity.
    #[arg(long = "cache-artist-limit", value_name = "COUNT")]
    pub cache_artist_limit: Option<usize>,

    /// Override the cache entry lifetime.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the cache warm-up queue capacity.
    #[arg(long = "warmup-queue-capacity", value_name = "COUNT")]
    pub warmup_queue_capacity: Option<usize>,

    /// Override the number of concurrent cache warm-up writes.
    #[arg(long = "warmup-concurrency", value_name = "COUNT")]
    pub warmup_concurrency: Option<usize>,

    /// Override the timeout applied to each cache warm-up write.
    #[arg(long = "warmup-task-timeout-ms", value_name = "MILLIS")]
    pub warmup_task_timeout_ms: Option<u64>,

    /// Override the lyrics provider base URL.
    #[arg(long = "lyrics-base-url", value_name = "URL")]
    pub lyrics_base_url: Option<String>,

    /// Override the translator base URL.
    #[arg(long = "translator-base-url", value_name = "URL")]
    pub translator_base_url: Option<String>,

    /// Override the translator folder identifier.
    #[arg(long = "translator-folder-id", value_name = "ID")]
    pub translator_folder_id: Option<String>,

    /// Override the translation target language.
    #[arg(long = "translator-target-language", value_name = "CODE")]
    pub translator_target_language: Option<String>,
}
