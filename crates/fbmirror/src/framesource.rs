//! Framebuffer frame source
//!
//! Talks to the Linux fbdev interface: `FBIOGET_FSCREENINFO` for the row
//! stride, `FBIOGET_VSCREENINFO` for resolution and pixel depth, and a
//! read-only shared `mmap` over `virtual_height × stride` bytes of pixel
//! data.
//!
//! The device file is opened once for the process lifetime. The memory
//! mapping is established fresh each cycle and released when the returned
//! [`FrameSnapshot`] drops — framebuffer geometry can change between
//! cycles, so nothing is cached.

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};

const FBIOGET_VSCREENINFO: libc::c_ulong = 0x4600;
const FBIOGET_FSCREENINFO: libc::c_ulong = 0x4602;

/// `struct fb_bitfield` from `<linux/fb.h>`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct FbBitfield {
    offset: u32,
    length: u32,
    msb_right: u32,
}

/// `struct fb_var_screeninfo` from `<linux/fb.h>`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct FbVarScreeninfo {
    xres: u32,
    yres: u32,
    xres_virtual: u32,
    yres_virtual: u32,
    xoffset: u32,
    yoffset: u32,
    bits_per_pixel: u32,
    grayscale: u32,
    red: FbBitfield,
    green: FbBitfield,
    blue: FbBitfield,
    transp: FbBitfield,
    nonstd: u32,
    activate: u32,
    height: u32,
    width: u32,
    accel_flags: u32,
    pixclock: u32,
    left_margin: u32,
    right_margin: u32,
    upper_margin: u32,
    lower_margin: u32,
    hsync_len: u32,
    vsync_len: u32,
    sync: u32,
    vmode: u32,
    rotate: u32,
    colorspace: u32,
    reserved: [u32; 4],
}

/// `struct fb_fix_screeninfo` from `<linux/fb.h>`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct FbFixScreeninfo {
    id: [u8; 16],
    smem_start: libc::c_ulong,
    smem_len: u32,
    type_: u32,
    type_aux: u32,
    visual: u32,
    xpanstep: u16,
    ypanstep: u16,
    ywrapstep: u16,
    line_length: u32,
    mmio_start: libc::c_ulong,
    mmio_len: u32,
    accel: u32,
    capabilities: u16,
    reserved: [u16; 2],
}

impl Default for FbFixScreeninfo {
    fn default() -> Self {
        // SAFETY: all-zero bytes are a valid bit pattern for this plain-data
        // C struct.
        unsafe { std::mem::zeroed() }
    }
}

/// Errors raised while acquiring one frame
///
/// All of these are transient: the daemon logs them, abandons the cycle,
/// and tries again at the next tick.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A screen-info ioctl failed
    #[error("framebuffer geometry query failed: {0}")]
    Geometry(#[source] io::Error),

    /// The queried geometry cannot describe a readable frame
    #[error("implausible framebuffer geometry: {reason}")]
    Implausible {
        /// What made the geometry unusable
        reason: &'static str,
    },

    /// The read-only mapping could not be established
    #[error("framebuffer mapping failed: {0}")]
    Mapping(#[source] io::Error),

    /// A caller-supplied buffer is smaller than the geometry requires
    #[error("frame buffer is {got} bytes, geometry requires {needed}")]
    ShortBuffer {
        /// Bytes the geometry requires
        needed: usize,
        /// Bytes actually supplied
        got: usize,
    },
}

/// Source geometry for one update cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    /// Visible width in pixels
    pub width: u32,
    /// Visible height in pixels
    pub height: u32,
    /// Virtual height in pixels (the mapping covers this, not `height`)
    pub virtual_height: u32,
    /// Pixel depth in bits
    pub bits_per_pixel: u32,
    /// Row stride in bytes
    pub stride: usize,
}

impl FrameGeometry {
    /// Bytes advanced per pixel within a row
    ///
    /// Truncating division, as in the fbdev offset formula
    /// `y * stride + x * bpp / 8`; depths below 8 advance zero bytes and
    /// decode as grayscale from the row start.
    pub fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_pixel / 8) as usize
    }

    /// Total bytes the mapping must cover
    // SAFETY: virtual_height and stride come from the kernel for a real
    // device and are validated in `validate`; the product fits in usize on
    // 64-bit and on any 32-bit system with a mappable framebuffer.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn mapped_len(&self) -> usize {
        self.virtual_height as usize * self.stride
    }

    fn validate(&self) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::Implausible {
                reason: "zero visible resolution",
            });
        }
        if self.virtual_height < self.height {
            return Err(FrameError::Implausible {
                reason: "virtual height below visible height",
            });
        }
        if self.stride == 0 {
            return Err(FrameError::Implausible {
                reason: "zero row stride",
            });
        }
        // Rows must fit inside the stride or pixel reads could cross rows.
        let row_bytes = (self.width as usize).saturating_mul(self.bytes_per_pixel());
        if row_bytes > self.stride {
            return Err(FrameError::Implausible {
                reason: "row stride smaller than visible row",
            });
        }
        Ok(())
    }
}

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl std::fmt::Debug for Backing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backing::Mapped(m) => write!(f, "Mapped({} bytes)", m.len()),
            Backing::Owned(v) => write!(f, "Owned({} bytes)", v.len()),
        }
    }
}

/// One cycle's view of the framebuffer: geometry plus pixel bytes
///
/// Valid for the duration of a single update cycle. Dropping the snapshot
/// releases the underlying mapping (when device-backed).
#[derive(Debug)]
pub struct FrameSnapshot {
    geometry: FrameGeometry,
    backing: Backing,
}

impl FrameSnapshot {
    fn mapped(geometry: FrameGeometry, mmap: Mmap) -> Self {
        Self {
            geometry,
            backing: Backing::Mapped(mmap),
        }
    }

    /// Build a snapshot over an owned buffer (mock sources and tests)
    pub fn from_bytes(geometry: FrameGeometry, bytes: Vec<u8>) -> Result<Self, FrameError> {
        geometry.validate()?;
        let needed = geometry.mapped_len();
        if bytes.len() < needed {
            return Err(FrameError::ShortBuffer {
                needed,
                got: bytes.len(),
            });
        }
        Ok(Self {
            geometry,
            backing: Backing::Owned(bytes),
        })
    }

    /// Source geometry for this cycle
    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    /// Raw pixel bytes, `virtual_height × stride` of them
    pub fn data(&self) -> &[u8] {
        match &self.backing {
            Backing::Mapped(mmap) => mmap,
            Backing::Owned(bytes) => bytes,
        }
    }
}

/// Anything that can produce one frame per cycle
///
/// Implemented by [`FramebufferDevice`] for real hardware and by scripted
/// mocks in the daemon-loop tests.
pub trait FrameSource {
    /// Acquire this cycle's frame
    fn snapshot(&mut self) -> Result<FrameSnapshot, FrameError>;
}

/// Handle to an fbdev device file
///
/// Holds the file descriptor for the process lifetime; mappings are
/// per-cycle.
#[derive(Debug)]
pub struct FramebufferDevice {
    file: File,
    path: PathBuf,
}

impl FramebufferDevice {
    /// Open the framebuffer device read-only
    ///
    /// Failure here is fatal to startup; the caller exits nonzero.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self { file, path })
    }

    /// Device path this handle was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn query_geometry(&self) -> Result<FrameGeometry, FrameError> {
        let fd = self.file.as_raw_fd();

        let mut fix = FbFixScreeninfo::default();
        // SAFETY: fd is a valid open framebuffer descriptor and `fix` is a
        // properly sized, writable fb_fix_screeninfo for this request.
        let rc = unsafe { libc::ioctl(fd, FBIOGET_FSCREENINFO as _, &mut fix) };
        if rc != 0 {
            return Err(FrameError::Geometry(io::Error::last_os_error()));
        }

        let mut var = FbVarScreeninfo::default();
        // SAFETY: as above, with a properly sized fb_var_screeninfo.
        let rc = unsafe { libc::ioctl(fd, FBIOGET_VSCREENINFO as _, &mut var) };
        if rc != 0 {
            return Err(FrameError::Geometry(io::Error::last_os_error()));
        }

        let geometry = FrameGeometry {
            width: var.xres,
            height: var.yres,
            virtual_height: var.yres_virtual,
            bits_per_pixel: var.bits_per_pixel,
            stride: fix.line_length as usize,
        };
        geometry.validate()?;
        Ok(geometry)
    }
}

impl FrameSource for FramebufferDevice {
    fn snapshot(&mut self) -> Result<FrameSnapshot, FrameError> {
        let geometry = self.query_geometry()?;

        // SAFETY: the mapping is PROT_READ/MAP_SHARED over a device the
        // kernel sized at mapped_len bytes; the Mmap's lifetime is tied to
        // the snapshot, which outlives every read taken from it.
        let mmap = unsafe {
            MmapOptions::new()
                .len(geometry.mapped_len())
                .map(&self.file)
                .map_err(FrameError::Mapping)?
        };
        Ok(FrameSnapshot::mapped(geometry, mmap))
    }
}
