//! Panel driver contract
//!
//! Mirrors the lifecycle real black/white EPD controllers expose through
//! their vendor libraries: bring up the I/O bus, program panel geometry,
//! switch to the fast-refresh waveform, declare the paint target, then push
//! partial updates until shutdown puts the controller into deep sleep.
//!
//! The daemon owns the canvas; `bind_canvas` only declares its geometry and
//! each push hands the packed buffer by reference. Backends never retain a
//! pointer into caller memory the way the C vendor libraries do.

use crate::canvas::MonoCanvas;
use crate::config::{PanelColor, PanelConfig, Rotation};

/// Deep-sleep modes of EPD controllers
///
/// Both stop all charge pumps; they differ in whether controller SRAM is
/// retained (Mode1) or dropped (Mode2). Either preserves the physical image
/// on the panel without power draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeepSleepMode {
    /// Retain controller SRAM (wake does not require a re-push)
    Mode1,
    /// Drop controller SRAM (lowest power, wake requires full re-init)
    Mode2,
}

/// Errors surfaced by panel backends
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// An operation was invoked out of lifecycle order
    #[error("panel not ready for {operation} (lifecycle: {state})")]
    NotReady {
        /// The operation that was rejected
        operation: &'static str,
        /// Human-readable lifecycle state at the time of the call
        state: &'static str,
    },

    /// A pushed buffer does not match the bound canvas geometry
    #[error("pushed buffer is {got} bytes, bound canvas expects {expected}")]
    GeometryMismatch {
        /// Byte length the bound geometry requires
        expected: usize,
        /// Byte length actually pushed
        got: usize,
    },

    /// Transport failure between host and controller
    #[error("panel bus error: {0}")]
    Bus(String),
}

/// Counters for refresh activity, kept by backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Number of partial pushes accepted since configure
    pub partial_push_count: u64,
    /// Total packed bytes transferred by accepted pushes
    pub bytes_pushed: u64,
}

/// Driver surface for a monochrome e-paper panel
///
/// Call order is a hard contract, enforced by conforming backends:
/// `io_init` → `configure` → `enter_fast_mode` → `bind_canvas` →
/// `push_partial_update`* → `enter_deep_sleep` → `io_deinit`.
pub trait PanelDriver {
    /// Bring up the I/O bus to the controller
    fn io_init(&mut self) -> Result<(), PanelError>;

    /// Program panel model and geometry into the controller
    fn configure(&mut self, config: &PanelConfig) -> Result<(), PanelError>;

    /// Load the fast-refresh waveform
    ///
    /// Fast mode trades grayscale depth for speed: two levels, single
    /// flash, suitable for the 2-second mirror cadence.
    fn enter_fast_mode(&mut self) -> Result<(), PanelError>;

    /// Declare the geometry, rotation and background of the paint target
    ///
    /// Subsequent pushes must carry exactly the packed size this geometry
    /// implies.
    fn bind_canvas(
        &mut self,
        width: u32,
        height: u32,
        rotation: Rotation,
        background: PanelColor,
    ) -> Result<(), PanelError>;

    /// Push a freshly painted canvas with a fast/partial refresh
    fn push_partial_update(&mut self, canvas: &MonoCanvas) -> Result<(), PanelError>;

    /// Put the controller into low-power deep sleep
    ///
    /// The last pushed image remains visible on the panel.
    fn enter_deep_sleep(&mut self, mode: DeepSleepMode) -> Result<(), PanelError>;

    /// Release the I/O bus
    fn io_deinit(&mut self) -> Result<(), PanelError>;
}
