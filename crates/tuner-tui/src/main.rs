mod action;
mod app;
mod app_state;
mod component;
mod components;
mod core;
mod focus;
mod theme;
mod widgets;

use std::path::PathBuf;

use clap::Parser;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tuner_core::config::Config;
use tuner_core::media::ClockBackend;
use tuner_core::protocol::Broadcast;
use tuner_core::station::Content;
use tuner_core::TunerEngine;

#[derive(Parser, Debug)]
#[command(name = "tuner", about = "Terminal FM tuner widget")]
struct Args {
    /// Config file (default: ~/.config/tuner/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stations/stories/cards table, overriding the config
    #[arg(long)]
    stations: Option<PathBuf>,

    /// Only sources that exist under this directory can be opened
    #[arg(long)]
    media_root: Option<PathBuf>,

    /// Print the station registry as JSON and exit
    #[arg(long)]
    dump_stations: bool,

    /// Allow playback before the first key press
    #[arg(long)]
    no_gesture_gate: bool,
}

/// Forwards WARN and ERROR events to the front-end as log broadcasts.
struct BroadcastLayer {
    sender: broadcast::Sender<Broadcast>,
}

impl BroadcastLayer {
    fn new(sender: broadcast::Sender<Broadcast>) -> Self {
        Self { sender }
    }
}

impl<S> tracing_subscriber::Layer<S> for BroadcastLayer
where
    S: tracing::Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let level = *event.metadata().level();
        if !matches!(level, tracing::Level::WARN | tracing::Level::ERROR) {
            return;
        }

        let mut message = format!("{} [{}] ", chrono::Local::now().format("%H:%M:%S"), level);
        let mut visitor = MessageVisitor(&mut message);
        event.record(&mut visitor);

        // No receivers yet is fine.
        let _ = self.sender.send(Broadcast::Log { message });
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0.push_str(&format!("{:?}", value));
        } else {
            self.0.push_str(&format!(" {}={:?}", field.name(), value));
        }
    }
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_default(),
    };
    if let Some(path) = &args.stations {
        config.stations.stations_toml = path.clone();
    }
    if let Some(root) = &args.media_root {
        config.playback.media_root = Some(root.clone());
    }
    if args.no_gesture_gate {
        config.playback.require_gesture = false;
    }
    Ok(config)
}

fn build_backend(config: &Config) -> ClockBackend {
    let mut backend = ClockBackend::new(config.playback.default_duration_secs);
    if !config.playback.require_gesture {
        backend = backend.without_gesture_gate();
    }
    if let Some(root) = &config.playback.media_root {
        backend = backend.with_media_root(root.clone());
    }
    backend
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    let content = Content::load_or_builtin(&config.stations.stations_toml)?;

    if args.dump_stations {
        println!("{}", content.stations.to_json_pretty()?);
        return Ok(());
    }

    let data_dir = tuner_core::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = tuner_core::platform::log_path();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // ── Broadcast channel (TunerCore → TUI) ──────────────────────────────────
    let (broadcast_tx, broadcast_rx) = broadcast::channel::<Broadcast>(1024);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(BroadcastLayer::new(broadcast_tx.clone()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    eprintln!("tuner log: {}", log_path.display());
    info!("tuner starting…");

    // ── CoreEvent channel (TUI → TunerCore) ──────────────────────────────────
    let (event_tx, event_rx) = mpsc::channel::<core::CoreEvent>(1024);

    let spectrum_interval = config.spectrum.frame_interval();
    let engine = TunerEngine::new(content, &config, build_backend(&config));
    let tuner_core = core::TunerCore::new(engine, &config, broadcast_tx, event_tx.clone());

    tokio::spawn(async move {
        if let Err(e) = tuner_core.run(event_rx).await {
            error!("TunerCore exited with error: {}", e);
        }
    });

    let app = app::App::new(event_tx, spectrum_interval);
    app.run(broadcast_rx).await?;

    Ok(())
}
