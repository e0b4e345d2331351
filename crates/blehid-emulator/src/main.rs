//! BLE HID Emulator entry point.
//!
//! Wires together the configuration, the GATT transport, the keyboard and
//! mouse sessions, and the command server, then runs until Ctrl+C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config_from() + CLI overrides + validate()
//!  └─ SimulatedGattTransport::spawn()     -- in-process GATT stack
//!  └─ KeyboardSession / MouseSession
//!       ├─ initialize()                   -- build HID services (fatal on error)
//!       └─ enable()                       -- start advertising
//!  └─ CommandProtocolServer::run()        -- one controller at a time
//!       └─ CommandDispatcher              -- AT+ command -> session call
//! ```
//!
//! # Usage
//!
//! ```text
//! blehid-emulator [OPTIONS]
//!
//! Options:
//!   --config <PATH>            Config file [default: platform config dir]
//!   --port <PORT>              Command port            [env: BLEHID_PORT]
//!   --bind <ADDR>              Command bind address    [env: BLEHID_BIND]
//!   --device-name <NAME>       Advertised device name  [env: BLEHID_DEVICE_NAME]
//!   --pointer-profile <KIND>   basic | wheel
//!   --write-default-config     Write a default config file and exit
//! ```
//!
//! CLI values win over the config file, which wins over built-in defaults.
//! `RUST_LOG` wins over the config file's `log_level`.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use blehid_core::PointerProfile;
use blehid_emulator::application::dispatch::CommandDispatcher;
use blehid_emulator::application::gatt::{GattTransport, SubscriberId};
use blehid_emulator::application::session::{KeyboardSession, MouseSession};
use blehid_emulator::infrastructure::gatt::simulated::SimulatedGattTransport;
use blehid_emulator::infrastructure::network::CommandProtocolServer;
use blehid_emulator::infrastructure::storage::config::{
    config_file_path, load_config_from, save_config_to, EmulatorConfig,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// BLE HID keyboard and mouse emulator.
///
/// Exposes a virtual keyboard and mouse over Bluetooth LE and drives them
/// from framed `AT+` commands on a local TCP port.
#[derive(Debug, Parser)]
#[command(name = "blehid-emulator", version)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// TCP port for the command channel.
    #[arg(long, env = "BLEHID_PORT")]
    port: Option<u16>,

    /// Address to bind the command channel to.
    ///
    /// The channel is unauthenticated; keep it on loopback unless the
    /// network is trusted.
    #[arg(long, env = "BLEHID_BIND")]
    bind: Option<String>,

    /// Device name returned by `AT+BLECURRENTDEVICENAME`.
    #[arg(long, env = "BLEHID_DEVICE_NAME")]
    device_name: Option<String>,

    /// Pointer report layout.
    #[arg(long, value_enum)]
    pointer_profile: Option<PointerProfileArg>,

    /// Write a default config file to the config path and exit.
    #[arg(long)]
    write_default_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PointerProfileArg {
    /// Buttons, X, Y (3 bytes).
    Basic,
    /// Buttons, X, Y, wheel (4 bytes).
    Wheel,
}

impl From<PointerProfileArg> for PointerProfile {
    fn from(arg: PointerProfileArg) -> Self {
        match arg {
            PointerProfileArg::Basic => PointerProfile::Basic,
            PointerProfileArg::Wheel => PointerProfile::Wheel,
        }
    }
}

impl Cli {
    /// Overlays the CLI values that were given onto `config`.
    fn apply_to(&self, config: &mut EmulatorConfig) {
        if let Some(port) = self.port {
            config.control.port = port;
        }
        if let Some(bind) = &self.bind {
            config.control.bind_address = bind.clone();
        }
        if let Some(name) = &self.device_name {
            config.emulator.device_name = name.clone();
        }
        if let Some(profile) = self.pointer_profile {
            config.devices.pointer_profile = profile.into();
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Logs every change to a session's subscriber set until the session drops.
fn spawn_subscriber_logger(device: &'static str, mut rx: watch::Receiver<Vec<SubscriberId>>) {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let ids: Vec<String> = rx.borrow_and_update().iter().map(ToString::to_string).collect();
            if ids.is_empty() {
                info!("{device}: no subscribed centrals");
            } else {
                info!("{device}: subscribed centrals [{}]", ids.join(", "));
            }
        }
    });
}

/// Resolves once `signal` reports Ctrl+C.
///
/// If the signal handler cannot be installed the error is logged and this
/// never resolves, so the server keeps running.
async fn shutdown_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!("could not listen for Ctrl+C, running until killed: {e}");
            std::future::pending::<()>().await;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => config_file_path().ok(),
    };

    if cli.write_default_config {
        let path = config_path.context("no config path given and no platform config directory")?;
        save_config_to(&path, &EmulatorConfig::default())
            .with_context(|| format!("writing default config to {}", path.display()))?;
        println!("wrote default config to {}", path.display());
        return Ok(());
    }

    let mut config = match &config_path {
        Some(path) => load_config_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EmulatorConfig::default(),
    };
    cli.apply_to(&mut config);
    config.validate().context("invalid configuration")?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.emulator.log_level)),
        )
        .init();

    info!("BLE HID Emulator starting as {:?}", config.emulator.device_name);

    // ── Transport and sessions ────────────────────────────────────────────────
    let transport: Arc<dyn GattTransport> =
        SimulatedGattTransport::spawn(config.emulator.device_name.clone(), &config.transport);

    let keyboard = if config.devices.keyboard {
        let session = Arc::new(KeyboardSession::keyboard(Arc::clone(&transport)));
        session.initialize().await.context("initializing keyboard")?;
        spawn_subscriber_logger("keyboard", session.watch_subscribers());
        session.enable().context("enabling keyboard")?;
        Some(session)
    } else {
        info!("keyboard disabled by configuration");
        None
    };

    let mouse = if config.devices.mouse {
        let session = Arc::new(MouseSession::mouse(
            Arc::clone(&transport),
            config.devices.pointer_profile,
            config.devices.click_gap(),
        ));
        session.initialize().await.context("initializing mouse")?;
        spawn_subscriber_logger("mouse", session.watch_subscribers());
        session.enable().context("enabling mouse")?;
        Some(session)
    } else {
        info!("mouse disabled by configuration");
        None
    };

    // ── Command server ────────────────────────────────────────────────────────
    let dispatcher = Arc::new(CommandDispatcher::new(
        config.emulator.device_name.clone(),
        keyboard.clone(),
        mouse.clone(),
    ));
    let server = CommandProtocolServer::bind(
        &config.control.listen_addr(),
        dispatcher,
        config.control.max_frame_len,
    )
    .await
    .context("starting command server")?;

    tokio::select! {
        _ = server.run() => {}
        _ = shutdown_signal(tokio::signal::ctrl_c()) => {}
    }

    // ── Shutdown ──────────────────────────────────────────────────────────────
    if let Some(session) = &keyboard {
        if let Err(e) = session.disable() {
            warn!("{e}");
        }
    }
    if let Some(session) = &mouse {
        if let Err(e) = session.disable() {
            warn!("{e}");
        }
    }

    info!("BLE HID Emulator stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
