//! In-memory emulated panel backend
//!
//! Stands in for controller hardware during development and in tests: it
//! enforces the `PanelDriver` lifecycle ordering, validates push geometry
//! against the bound canvas, and keeps a copy of the last pushed frame so
//! callers can assert on what the panel would actually show.
//!
//! No timing or ghosting simulation — the mirror daemon only needs the
//! contract, not the physics.

use crate::canvas::MonoCanvas;
use crate::config::{PanelColor, PanelConfig, Rotation};
use crate::driver::{DeepSleepMode, PanelDriver, PanelError, RefreshStats};
use tracing::debug;

/// Lifecycle of the emulated controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelLifecycle {
    /// No I/O bus, no configuration
    PoweredOff,
    /// Bus is up, geometry not yet programmed
    IoReady,
    /// Geometry programmed, normal waveform
    Configured,
    /// Fast-refresh waveform loaded
    FastMode,
    /// Paint target declared; pushes are accepted
    Bound,
    /// Deep sleep; only `io_deinit` is meaningful
    Asleep,
}

impl PanelLifecycle {
    fn name(&self) -> &'static str {
        match self {
            PanelLifecycle::PoweredOff => "powered-off",
            PanelLifecycle::IoReady => "io-ready",
            PanelLifecycle::Configured => "configured",
            PanelLifecycle::FastMode => "fast-mode",
            PanelLifecycle::Bound => "bound",
            PanelLifecycle::Asleep => "asleep",
        }
    }
}

/// Emulated monochrome panel
///
/// The default backend of the shipped binary (hardware drivers implement
/// [`PanelDriver`] out of tree) and the spy used by daemon-loop tests.
#[derive(Debug)]
pub struct EmulatedPanel {
    lifecycle: PanelLifecycle,
    config: Option<PanelConfig>,
    bound_bytes: Option<usize>,
    bound_rotation: Option<Rotation>,
    stats: RefreshStats,
    last_frame: Option<Vec<u8>>,
    sleep_mode: Option<DeepSleepMode>,
}

impl EmulatedPanel {
    /// Create a powered-off panel
    pub fn new() -> Self {
        Self {
            lifecycle: PanelLifecycle::PoweredOff,
            config: None,
            bound_bytes: None,
            bound_rotation: None,
            stats: RefreshStats::default(),
            last_frame: None,
            sleep_mode: None,
        }
    }

    /// Current lifecycle state
    pub fn lifecycle(&self) -> PanelLifecycle {
        self.lifecycle
    }

    /// Refresh counters since the last `configure`
    pub fn stats(&self) -> RefreshStats {
        self.stats
    }

    /// Packed bytes of the most recent accepted push
    pub fn last_frame(&self) -> Option<&[u8]> {
        self.last_frame.as_deref()
    }

    /// The configuration programmed by `configure`, if any
    pub fn config(&self) -> Option<&PanelConfig> {
        self.config.as_ref()
    }

    /// Deep-sleep mode of the last `enter_deep_sleep`, if any
    pub fn sleep_mode(&self) -> Option<DeepSleepMode> {
        self.sleep_mode
    }

    /// Rotation declared by `bind_canvas`, if any
    pub fn bound_rotation(&self) -> Option<Rotation> {
        self.bound_rotation
    }

    fn reject(&self, operation: &'static str) -> PanelError {
        PanelError::NotReady {
            operation,
            state: self.lifecycle.name(),
        }
    }
}

impl Default for EmulatedPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelDriver for EmulatedPanel {
    fn io_init(&mut self) -> Result<(), PanelError> {
        if self.lifecycle != PanelLifecycle::PoweredOff {
            return Err(self.reject("io_init"));
        }
        self.lifecycle = PanelLifecycle::IoReady;
        debug!("emulated panel: io up");
        Ok(())
    }

    fn configure(&mut self, config: &PanelConfig) -> Result<(), PanelError> {
        if self.lifecycle != PanelLifecycle::IoReady {
            return Err(self.reject("configure"));
        }
        self.config = Some(*config);
        self.stats = RefreshStats::default();
        self.lifecycle = PanelLifecycle::Configured;
        debug!(
            model = config.model.name(),
            width = config.width,
            height = config.height,
            "emulated panel: configured"
        );
        Ok(())
    }

    fn enter_fast_mode(&mut self) -> Result<(), PanelError> {
        if self.lifecycle != PanelLifecycle::Configured {
            return Err(self.reject("enter_fast_mode"));
        }
        self.lifecycle = PanelLifecycle::FastMode;
        debug!("emulated panel: fast waveform loaded");
        Ok(())
    }

    // SAFETY: width and height are panel dimensions; the packed size
    // (width+7)/8 * height fits in usize.
    #[allow(clippy::arithmetic_side_effects)]
    fn bind_canvas(
        &mut self,
        width: u32,
        height: u32,
        rotation: Rotation,
        background: PanelColor,
    ) -> Result<(), PanelError> {
        if self.lifecycle != PanelLifecycle::FastMode {
            return Err(self.reject("bind_canvas"));
        }
        let packed = ((width as usize + 7) / 8) * height as usize;
        self.bound_bytes = Some(packed);
        self.bound_rotation = Some(rotation);
        // The physical panel starts out showing the background color.
        let fill = match background {
            PanelColor::White => 0xFF,
            PanelColor::Black => 0x00,
        };
        self.last_frame = Some(vec![fill; packed]);
        self.lifecycle = PanelLifecycle::Bound;
        debug!(width, height, packed, "emulated panel: canvas bound");
        Ok(())
    }

    fn push_partial_update(&mut self, canvas: &MonoCanvas) -> Result<(), PanelError> {
        if self.lifecycle != PanelLifecycle::Bound {
            return Err(self.reject("push_partial_update"));
        }
        let expected = self.bound_bytes.unwrap_or(0);
        let got = canvas.data().len();
        if got != expected {
            return Err(PanelError::GeometryMismatch { expected, got });
        }
        self.last_frame = Some(canvas.data().to_vec());
        self.stats.partial_push_count = self.stats.partial_push_count.saturating_add(1);
        self.stats.bytes_pushed = self.stats.bytes_pushed.saturating_add(got as u64);
        debug!(
            push = self.stats.partial_push_count,
            bytes = got,
            "emulated panel: partial update"
        );
        Ok(())
    }

    fn enter_deep_sleep(&mut self, mode: DeepSleepMode) -> Result<(), PanelError> {
        if matches!(
            self.lifecycle,
            PanelLifecycle::PoweredOff | PanelLifecycle::Asleep
        ) {
            return Err(self.reject("enter_deep_sleep"));
        }
        self.sleep_mode = Some(mode);
        self.lifecycle = PanelLifecycle::Asleep;
        debug!(?mode, "emulated panel: deep sleep");
        Ok(())
    }

    fn io_deinit(&mut self) -> Result<(), PanelError> {
        if self.lifecycle == PanelLifecycle::PoweredOff {
            return Err(self.reject("io_deinit"));
        }
        self.lifecycle = PanelLifecycle::PoweredOff;
        self.bound_bytes = None;
        self.bound_rotation = None;
        debug!("emulated panel: io released");
        Ok(())
    }
}
