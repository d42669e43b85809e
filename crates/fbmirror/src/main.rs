//! fbmirror daemon entry point
//!
//! No CLI flags, no config files: the framebuffer path, panel selection,
//! and cadence are compile-time constants. Signals are the only control
//! surface — SIGINT/SIGTERM trigger a graceful shutdown into deep sleep.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use epd::{EmulatedPanel, PanelColor, PanelConfig, PanelModel, Rotation};
use fbmirror::{FramebufferDevice, LumaPolicy, MirrorDaemon, ShutdownFlag};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const FB_DEVICE: &str = "/dev/fb0";
const UPDATE_INTERVAL: Duration = Duration::from_secs(2);

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => {
            info!("done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(1)
        }
    }
}

fn run() -> anyhow::Result<()> {
    let config = PanelConfig::new(PanelModel::Epd420, Rotation::Degrees270, PanelColor::White);

    info!("=== e-ink framebuffer mirror (INVERTED + FAST) ===");
    info!(source = FB_DEVICE, "framebuffer source");
    info!(interval_s = UPDATE_INTERVAL.as_secs(), "update interval");
    info!("color mode: INVERTED (bright source renders black)");
    info!("update mode: FAST partial refresh");

    // Opened once for the process lifetime; mappings are per-cycle.
    // Failure here exits with status 1 before any panel I/O happens.
    let source = FramebufferDevice::open(FB_DEVICE)
        .with_context(|| format!("opening framebuffer device {FB_DEVICE}"))?;

    // Default backend. Hardware deployments swap in a vendor-driver
    // implementation of epd::PanelDriver here.
    let panel = EmulatedPanel::new();

    let mut daemon = MirrorDaemon::new(
        source,
        panel,
        config,
        LumaPolicy::WEIGHTED,
        UPDATE_INTERVAL,
    );
    daemon.init_panel().context("initializing display")?;

    let shutdown = ShutdownFlag::install_for_signals().context("installing signal handlers")?;

    info!("started; send SIGINT or SIGTERM to exit");
    daemon.run(&shutdown).context("mirror loop")?;
    Ok(())
}
