//! Panel configuration
//!
//! Static, set once at startup. The daemon never reconfigures a running
//! panel; dynamic resizing is explicitly unsupported.

/// Supported panel models
///
/// Each model carries its native geometry. The list mirrors common
/// Waveshare/GoodDisplay black-white modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelModel {
    /// 2.13" 250×122 (SSD1680 class)
    Epd213,
    /// 2.9" 296×128 (IL0373 class)
    Epd290,
    /// 4.2" 400×300 (SSD1619 class)
    Epd420,
    /// 7.5" 800×480 (ED075TC1 class)
    Epd750,
}

impl PanelModel {
    /// Native panel size in pixels, (width, height), before rotation
    pub fn native_size(&self) -> (u32, u32) {
        match self {
            PanelModel::Epd213 => (250, 122),
            PanelModel::Epd290 => (296, 128),
            PanelModel::Epd420 => (400, 300),
            PanelModel::Epd750 => (800, 480),
        }
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            PanelModel::Epd213 => "EPD213",
            PanelModel::Epd290 => "EPD290",
            PanelModel::Epd420 => "EPD420",
            PanelModel::Epd750 => "EPD750",
        }
    }
}

/// Panel rotation modes
///
/// Rotation is applied by the controller when painting; canvas coordinates
/// stay logical (width × height as configured).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// No rotation (landscape: width × height)
    Degrees0,
    /// Rotate 90° clockwise (portrait: height × width)
    Degrees90,
    /// Rotate 180° (upside-down landscape: width × height)
    Degrees180,
    /// Rotate 270° clockwise / 90° counter-clockwise (portrait: height × width)
    Degrees270,
}

impl Rotation {
    /// Check if rotation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Rotation::Degrees90 | Rotation::Degrees270)
    }

    /// Calculate physical dimensions after rotation
    pub fn apply_to_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_dimensions() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

/// Binary panel color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelColor {
    /// Bleached pigment state (the idle background of a fresh panel)
    White,
    /// Driven pigment state
    Black,
}

impl PanelColor {
    /// The opposite color
    pub fn inverted(&self) -> Self {
        match self {
            PanelColor::White => PanelColor::Black,
            PanelColor::Black => PanelColor::White,
        }
    }
}

/// Complete static panel configuration
///
/// Immutable after initialization; the canvas is allocated from these
/// dimensions exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelConfig {
    /// Panel model identifier
    pub model: PanelModel,
    /// Addressable width in pixels
    pub width: u32,
    /// Addressable height in pixels
    pub height: u32,
    /// Rotation applied by the controller when painting
    pub rotation: Rotation,
    /// Background color the canvas is cleared to each cycle
    pub background: PanelColor,
}

impl PanelConfig {
    /// Configuration for a model at its native size
    pub fn new(model: PanelModel, rotation: Rotation, background: PanelColor) -> Self {
        let (width, height) = model.native_size();
        Self {
            model,
            width,
            height,
            rotation,
            background,
        }
    }

    /// Addressable dimensions, (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
