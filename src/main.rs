use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use lazysusan_bot::application::messaging::EventDispatcher;
use lazysusan_bot::domain::traits::RoomClient;
use lazysusan_bot::infrastructure::adapters::ConsoleAdapter;
use lazysusan_bot::infrastructure::config::{Config, CONFIG_FILE, DEFAULT_SECTION};
use lazysusan_bot::plugins::PluginRegistry;

#[derive(Parser)]
#[command(name = "lazysusan")]
#[command(about = "A turntable room bot with pluggable commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config section to load the settings from
    #[arg(short, long, default_value = DEFAULT_SECTION, global = true)]
    config: String,

    /// Read this file instead of searching for lazysusan.yaml
    #[arg(long, global = true)]
    config_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Print a starter config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run_bot(&cli.config, cli.config_file),
        Commands::Version => {
            println!("lazysusan v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => init_config(),
    }
}

fn run_bot(section: &str, config_file: Option<PathBuf>) {
    let loaded = match config_file {
        Some(path) => Config::load_from(&[path], section),
        None => Config::load(section),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let (bot_id, room_id) = match (config.user_id(), config.room_id()) {
        (Ok(user), Ok(room)) => (user.to_string(), room.to_string()),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    tracing::info!("Starting lazysusan with section {}", config.section());

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            process::exit(1);
        }
    };

    rt.block_on(async move {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = Arc::new(ConsoleAdapter::new(bot_id, room_id, tx));

        let mut dispatcher = EventDispatcher::new(config, client.clone(), PluginRegistry::with_bundled());
        let loaded = dispatcher.load_plugins();
        tracing::info!("{} plugin(s) loaded", loaded);
        for plugin in dispatcher.plugins().list() {
            tracing::debug!("{}: {} ({})", plugin.name, plugin.description, plugin.commands.join(", "));
        }

        if let Err(e) = client.start().await {
            tracing::error!("Failed to start room client: {}", e);
            return;
        }

        loop {
            tokio::select! {
                inbound = rx.recv() => match inbound {
                    Some(inbound) => dispatcher.dispatch(inbound),
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutting down");
                    break;
                }
            }
        }
    });
}

fn init_config() {
    print!("{}", Config::sample());
    println!("\nSave this as {} in the current directory and adjust as needed.", CONFIG_FILE);
}
