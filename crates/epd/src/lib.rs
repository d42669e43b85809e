//! Monochrome e-paper panel surface
//!
//! Everything the mirror daemon needs to talk to a black/white e-paper
//! panel without knowing which controller sits behind it:
//!
//! - Panel configuration (`PanelModel`, `Rotation`, `PanelColor`, `PanelConfig`)
//! - A packed 1-bit canvas matching the controller SRAM layout (`MonoCanvas`)
//! - The driver contract (`PanelDriver`) mirroring the lifecycle of real
//!   EPD controllers: I/O init → geometry setup → fast mode → canvas bind →
//!   partial pushes → deep sleep
//! - An in-memory emulated backend (`EmulatedPanel`) that enforces the
//!   lifecycle ordering and records pushes, used as the default backend and
//!   as the test spy
//!
//! Hardware backends (SSD16xx/UC81xx vendor drivers) implement `PanelDriver`
//! out of tree; this crate deliberately contains no bus code.

mod canvas;
mod config;
mod driver;
mod emulator;

pub use canvas::MonoCanvas;
pub use config::{PanelColor, PanelConfig, PanelModel, Rotation};
pub use driver::{DeepSleepMode, PanelDriver, PanelError, RefreshStats};
pub use emulator::{EmulatedPanel, PanelLifecycle};
