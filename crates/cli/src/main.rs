mod auth_commands;
mod config_commands;

use {
    botdeck_gateway::{LogBuffer, LogCaptureLayer},
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "botdeck", about = "botdeck, a dashboard for running a Discord bot")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Custom config directory (overrides default ~/.config/botdeck/).
    #[arg(long, global = true, env = "BOTDECK_CONFIG_DIR")]
    config_dir: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dashboard server (default when no subcommand is provided).
    Gateway,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
    /// Print the Discord sign-in URL for the configured application.
    AuthUrl {
        /// Origin the dashboard is served from, used for the callback.
        #[arg(long)]
        origin: Option<String>,
    },
}

/// Initialise tracing and optionally attach a [`LogCaptureLayer`] that
/// records events for the dashboard log view.
fn init_telemetry(cli: &Cli, log_buffer: Option<LogBuffer>) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    let capture = log_buffer.map(LogCaptureLayer::new);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .with(capture)
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .with(capture)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let is_gateway = matches!(cli.command, None | Some(Commands::Gateway));
    let mut config = botdeck_config::discover_and_load(cli.config_dir.as_deref());

    // Only the server keeps captured logs around for the dashboard.
    let log_buffer = is_gateway.then(|| LogBuffer::new(config.logs.capacity));
    init_telemetry(&cli, log_buffer.clone());

    match cli.command {
        None | Some(Commands::Gateway) => {
            // Discord gateway and REST traffic go over rustls.
            let _ = rustls::crypto::ring::default_provider().install_default();

            if let Some(bind) = cli.bind {
                config.server.bind = bind;
            }
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            info!(version = env!("CARGO_PKG_VERSION"), "botdeck starting");
            botdeck_gateway::start_gateway(config, log_buffer.unwrap_or_default()).await
        },
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config_dir.as_deref())
        },
        Some(Commands::AuthUrl { origin }) => auth_commands::print_auth_url(config, origin),
    }
}
