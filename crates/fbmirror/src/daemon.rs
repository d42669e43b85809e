//! Mirror update loop and lifecycle
//!
//! A single thread of control runs the pipeline: acquire frame → convert →
//! push, once per fixed interval, until a termination request is observed.
//! The only asynchrony is signal delivery, which does nothing beyond
//! setting a process-wide flag; the loop notices it at cycle boundaries and
//! during the (sliced, therefore interruptible) inter-cycle sleep.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use epd::{DeepSleepMode, MonoCanvas, PanelConfig, PanelDriver, PanelError};
use tracing::{info, warn};

use crate::convert::{convert, LumaPolicy};
use crate::framesource::FrameSource;

/// Sleep slice granularity; bounds shutdown latency during the
/// inter-cycle wait.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Flag set by the process signal handlers.
///
/// Signal handlers cannot capture state, so the process-backed flavor of
/// [`ShutdownFlag`] reads this static.
static SIGNAL_STOP: AtomicBool = AtomicBool::new(false);

/// SIGINT/SIGTERM handler: one atomic store, nothing else.
extern "C" fn handle_termination_signal(_signum: libc::c_int) {
    SIGNAL_STOP.store(true, Ordering::SeqCst);
}

#[derive(Clone)]
enum FlagBacking {
    /// Backed by the signal-handler static; one per process
    Process,
    /// Backed by a shared atomic; used by tests and embedders
    Local(Arc<AtomicBool>),
}

/// Process-wide cancellation state
///
/// Set exactly once (idempotently) by the signal path or by
/// [`request_stop`](Self::request_stop); read at every cycle boundary and
/// every sleep slice. Clones observe the same flag.
#[derive(Clone)]
pub struct ShutdownFlag {
    backing: FlagBacking,
}

impl ShutdownFlag {
    /// A flag not wired to any signal, for tests and embedders
    pub fn new() -> Self {
        Self {
            backing: FlagBacking::Local(Arc::new(AtomicBool::new(false))),
        }
    }

    /// Install SIGINT/SIGTERM handlers and return the flag they set
    ///
    /// Must be called before the loop starts so no delivery window exists
    /// in which the flag is not yet observable.
    pub fn install_for_signals() -> io::Result<Self> {
        // SAFETY: sa_handler is a plain extern "C" fn performing only an
        // atomic store, which is async-signal-safe; the sigaction struct is
        // zero-initialized plain data.
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = handle_termination_signal as libc::sighandler_t;
            libc::sigemptyset(&mut action.sa_mask);
            for signum in [libc::SIGINT, libc::SIGTERM] {
                if libc::sigaction(signum, &action, std::ptr::null_mut()) != 0 {
                    return Err(io::Error::last_os_error());
                }
            }
        }
        Ok(Self {
            backing: FlagBacking::Process,
        })
    }

    /// Request termination (idempotent)
    pub fn request_stop(&self) {
        match &self.backing {
            FlagBacking::Process => SIGNAL_STOP.store(true, Ordering::SeqCst),
            FlagBacking::Local(flag) => flag.store(true, Ordering::SeqCst),
        }
    }

    /// Has termination been requested?
    pub fn is_stop_requested(&self) -> bool {
        match &self.backing {
            FlagBacking::Process => SIGNAL_STOP.load(Ordering::SeqCst),
            FlagBacking::Local(flag) => flag.load(Ordering::SeqCst),
        }
    }
}

impl Default for ShutdownFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// The framebuffer → panel mirror
///
/// Owns the canvas and both pipeline ends. Lifecycle:
/// [`init_panel`](Self::init_panel) once (fatal on failure), then
/// [`run`](Self::run) until the shutdown flag trips, which parks the panel
/// in deep sleep.
pub struct MirrorDaemon<S, P> {
    source: S,
    panel: P,
    config: PanelConfig,
    policy: LumaPolicy,
    interval: Duration,
    canvas: MonoCanvas,
    cycles: u64,
    panel_ready: bool,
}

impl<S: FrameSource, P: PanelDriver> MirrorDaemon<S, P> {
    /// Assemble the pipeline; allocates the canvas from the panel config
    pub fn new(
        source: S,
        panel: P,
        config: PanelConfig,
        policy: LumaPolicy,
        interval: Duration,
    ) -> Self {
        let canvas = MonoCanvas::for_panel(&config);
        Self {
            source,
            panel,
            config,
            policy,
            interval,
            canvas,
            cycles: 0,
            panel_ready: false,
        }
    }

    /// Number of update cycles attempted so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The panel backend (test inspection)
    pub fn panel(&self) -> &P {
        &self.panel
    }

    /// Bring the panel from uninitialized to ready
    ///
    /// I/O bus up, geometry programmed, fast-refresh waveform loaded,
    /// paint target bound. Failure here is fatal: the process cannot
    /// proceed without a display.
    pub fn init_panel(&mut self) -> Result<(), PanelError> {
        info!(model = self.config.model.name(), "initializing e-paper panel");
        self.panel.io_init()?;
        self.panel.configure(&self.config)?;
        info!("enabling fast refresh mode");
        self.panel.enter_fast_mode()?;
        self.panel.bind_canvas(
            self.config.width,
            self.config.height,
            self.config.rotation,
            self.config.background,
        )?;
        self.panel_ready = true;
        info!(
            width = self.config.width,
            height = self.config.height,
            "panel initialized, fast mode enabled"
        );
        Ok(())
    }

    /// Run update cycles until the shutdown flag trips, then park the panel
    ///
    /// Transient acquisition failures abandon the cycle and wait for the
    /// next tick — the interval itself is the backoff. Returns once the
    /// panel is in deep sleep with its I/O released.
    pub fn run(&mut self, shutdown: &ShutdownFlag) -> Result<(), PanelError> {
        debug_assert!(self.panel_ready, "init_panel must precede run");

        while !shutdown.is_stop_requested() {
            self.cycles = self.cycles.saturating_add(1);
            self.run_cycle();
            self.sleep_interruptibly(shutdown);
        }

        info!(cycles = self.cycles, "shutting down, parking panel");
        self.panel.enter_deep_sleep(DeepSleepMode::Mode1)?;
        self.panel.io_deinit()?;
        Ok(())
    }

    /// One acquire → convert → push pass
    ///
    /// The snapshot (and its memory mapping) lives exactly as long as this
    /// call; failures leave the canvas and panel untouched.
    fn run_cycle(&mut self) {
        let snapshot = match self.source.snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(cycle = self.cycles, error = %err, "skipping cycle");
                return;
            }
        };

        convert(&snapshot, &mut self.canvas, self.policy);

        match self.panel.push_partial_update(&self.canvas) {
            Ok(()) => info!(
                cycle = self.cycles,
                source_width = snapshot.geometry().width,
                source_height = snapshot.geometry().height,
                "update pushed"
            ),
            Err(err) => warn!(cycle = self.cycles, error = %err, "panel push failed"),
        }
    }

    /// Sleep for the update interval, waking early on a shutdown request
    ///
    /// Sliced so a termination signal arriving mid-wait is observed within
    /// one slice rather than after the full interval.
    fn sleep_interruptibly(&self, shutdown: &ShutdownFlag) {
        let mut remaining = self.interval;
        while !remaining.is_zero() {
            if shutdown.is_stop_requested() {
                return;
            }
            let slice = remaining.min(SLEEP_SLICE);
            std::thread::sleep(slice);
            remaining = remaining.saturating_sub(slice);
        }
    }
}
