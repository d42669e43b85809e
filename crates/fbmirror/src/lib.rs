//! Framebuffer → e-paper mirror daemon
//!
//! Periodically snapshots a Linux framebuffer device, binarizes it into a
//! packed monochrome canvas, and pushes the result to an e-paper panel via
//! fast partial refreshes. Three parts form a straight pipeline:
//!
//! - [`framesource`] — fbdev geometry queries and a per-cycle read-only
//!   memory mapping over the pixel bytes
//! - [`convert`] — pixel decoding (32/24/16-bit and grayscale fallback),
//!   integer luminance, and thresholding onto the canvas
//! - [`daemon`] — the timed update loop, signal-driven shutdown, and the
//!   panel lifecycle
//!
//! The output is deliberately tone-inverted: bright framebuffer pixels
//! render black on the panel. See [`convert::LumaPolicy`].

pub mod convert;
pub mod daemon;
pub mod framesource;

pub use convert::{LumaPolicy, PixelFormat, Rgb};
pub use daemon::{MirrorDaemon, ShutdownFlag};
pub use framesource::{FrameError, FrameGeometry, FrameSnapshot, FrameSource, FramebufferDevice};
