//! Placement of a video rectangle on a slide
//!
//! Converts intrinsic pixel dimensions to the slide's length unit, caps the
//! width, shrinks oversized rectangles uniformly with a margin, and anchors
//! the result to a corner or edge of the slide. Everything here is pure:
//! identical inputs always produce bit-identical rectangles.

use crate::media::IntrinsicSize;
use serde::{Deserialize, Serialize};

/// English Metric Units per inch, the native length unit of OOXML documents
pub const EMU_PER_INCH: i64 = 914_400;

/// Assumed pixel density when converting video pixels to inches
pub const DEFAULT_PIXEL_DENSITY: f64 = 96.0;

/// Share of the slide an oversized video may occupy after shrinking
pub const DEFAULT_MARGIN_FACTOR: f64 = 0.9;

/// Width cap applied to placed videos
pub const DEFAULT_MAX_WIDTH_INCHES: f64 = 2.0;

/// Width over height, 1:1 when the height is zero
pub fn aspect_ratio(width: f64, height: f64) -> f64 {
    if height == 0.0 || !width.is_finite() || !height.is_finite() {
        return 1.0;
    }
    width / height
}

/// Where the rectangle sits on the slide once sized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    /// Flush with the bottom-right corner (default)
    #[default]
    BottomRight,
}

impl Anchor {
    /// Get horizontal offset factor (0.0 = left, 0.5 = center, 1.0 = right)
    pub fn horizontal_factor(&self) -> f64 {
        match self {
            Anchor::Left | Anchor::TopLeft | Anchor::BottomLeft => 0.0,
            Anchor::Center | Anchor::Top | Anchor::Bottom => 0.5,
            Anchor::Right | Anchor::TopRight | Anchor::BottomRight => 1.0,
        }
    }

    /// Get vertical offset factor (0.0 = top, 0.5 = center, 1.0 = bottom)
    pub fn vertical_factor(&self) -> f64 {
        match self {
            Anchor::Top | Anchor::TopLeft | Anchor::TopRight => 0.0,
            Anchor::Center | Anchor::Left | Anchor::Right => 0.5,
            Anchor::Bottom | Anchor::BottomLeft | Anchor::BottomRight => 1.0,
        }
    }
}

/// Slide dimensions in a single length unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlideGeometry {
    pub width: f64,
    pub height: f64,
    /// How many of this geometry's units make one inch
    pub units_per_inch: f64,
}

impl SlideGeometry {
    pub fn new(width: f64, height: f64, units_per_inch: f64) -> Self {
        Self {
            width,
            height,
            units_per_inch,
        }
    }

    /// Geometry as stored in a document (`p:sldSz`)
    pub fn from_emu(cx: i64, cy: i64) -> Self {
        Self::new(cx as f64, cy as f64, EMU_PER_INCH as f64)
    }

    pub fn inches(width: f64, height: f64) -> Self {
        Self::new(width, height, 1.0)
    }

    pub fn width_inches(&self) -> f64 {
        self.width / self.units_per_inch
    }

    pub fn height_inches(&self) -> f64 {
        self.height / self.units_per_inch
    }

    fn is_usable(&self) -> bool {
        self.width.is_finite()
            && self.height.is_finite()
            && self.units_per_inch.is_finite()
            && self.width > 0.0
            && self.height > 0.0
            && self.units_per_inch > 0.0
    }
}

/// Final position and size of the video, in the slide's unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PlacementRect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn aspect_ratio(&self) -> f64 {
        aspect_ratio(self.width, self.height)
    }

    /// Integral EMU rectangle for `a:xfrm`.
    ///
    /// Rounding never moves the rectangle past the slide's EMU extents.
    pub fn to_emu(&self, slide: &SlideGeometry) -> EmuRect {
        let scale = EMU_PER_INCH as f64 / slide.units_per_inch;
        let to_emu = |v: f64| -> i64 {
            let emu = (v * scale).round();
            if emu.is_finite() && emu > 0.0 {
                emu as i64
            } else {
                0
            }
        };

        let slide_cx = to_emu(slide.width);
        let slide_cy = to_emu(slide.height);
        let cx = to_emu(self.width).min(slide_cx);
        let cy = to_emu(self.height).min(slide_cy);
        let x = to_emu(self.left).min(slide_cx - cx).max(0);
        let y = to_emu(self.top).min(slide_cy - cy).max(0);

        EmuRect { x, y, cx, cy }
    }
}

/// Rectangle in whole EMU
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmuRect {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

/// Tunables for [`place`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementPolicy {
    /// Video pixels per inch
    pub pixel_density: f64,
    /// Width cap in inches, `None` to place at natural size
    pub max_width_inches: Option<f64>,
    /// Applied when shrinking an oversized rectangle, in (0, 1)
    pub margin_factor: f64,
    pub anchor: Anchor,
}

impl Default for PlacementPolicy {
    fn default() -> Self {
        Self {
            pixel_density: DEFAULT_PIXEL_DENSITY,
            max_width_inches: Some(DEFAULT_MAX_WIDTH_INCHES),
            margin_factor: DEFAULT_MARGIN_FACTOR,
            anchor: Anchor::BottomRight,
        }
    }
}

impl PlacementPolicy {
    /// Natural size only, no cap
    pub fn uncapped() -> Self {
        Self {
            max_width_inches: None,
            ..Default::default()
        }
    }

    fn density(&self) -> f64 {
        if self.pixel_density.is_finite() && self.pixel_density > 0.0 {
            self.pixel_density
        } else {
            DEFAULT_PIXEL_DENSITY
        }
    }

    fn margin(&self) -> f64 {
        if self.margin_factor > 0.0 && self.margin_factor < 1.0 {
            self.margin_factor
        } else {
            DEFAULT_MARGIN_FACTOR
        }
    }
}

/// Compute where a video of `intrinsic` pixels goes on `slide`.
///
/// The returned rectangle keeps the intrinsic aspect ratio, never exceeds the
/// slide, and never has negative coordinates.
///
/// # Examples
/// ```
/// use deckcast_core::media::IntrinsicSize;
/// use deckcast_core::placement::{place, PlacementPolicy, SlideGeometry};
///
/// let slide = SlideGeometry::inches(13.333, 7.5);
/// let video = IntrinsicSize::new(1920, 1080).unwrap();
/// let rect = place(video, slide, &PlacementPolicy::default());
/// assert_eq!(rect.width, 2.0);
/// assert_eq!(rect.height, 1.125);
/// assert_eq!(rect.top, 6.375);
/// ```
pub fn place(intrinsic: IntrinsicSize, slide: SlideGeometry, policy: &PlacementPolicy) -> PlacementRect {
    if !slide.is_usable() {
        return PlacementRect::default();
    }

    let mut width = intrinsic.width_px() as f64 / policy.density() * slide.units_per_inch;
    if let Some(max_inches) = policy.max_width_inches {
        let cap = max_inches * slide.units_per_inch;
        if cap.is_finite() && cap >= 0.0 && width > cap {
            width = cap;
        }
    }
    let mut height = width * intrinsic.height_px() as f64 / intrinsic.width_px() as f64;

    // Shrink uniformly, leaving a margin instead of touching the edges
    if width > slide.width || height > slide.height {
        let scale = (slide.width / width).min(slide.height / height) * policy.margin();
        width *= scale;
        height *= scale;
    }

    // Anchor after scaling so the rectangle stays on the same corner
    let left = ((slide.width - width) * policy.anchor.horizontal_factor()).max(0.0);
    let top = ((slide.height - height) * policy.anchor.vertical_factor()).max(0.0);

    PlacementRect {
        left,
        top,
        width,
        height,
    }
}

/// Fit an aspect ratio into a pixel box.
///
/// Used for poster sizing. Each side is at least one pixel.
pub fn fit_to_container(aspect: f64, container_width: u32, container_height: u32) -> (u32, u32) {
    if container_width == 0 || container_height == 0 {
        return (0, 0);
    }
    let aspect = if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    };

    let container_ratio = container_width as f64 / container_height as f64;

    if aspect > container_ratio {
        // Content is wider - scale to fit container width
        let height = (container_width as f64 / aspect).round() as u32;
        (container_width, height.clamp(1, container_height))
    } else {
        // Content is taller or equal - scale to fit container height
        let width = (container_height as f64 * aspect).round() as u32;
        (width.clamp(1, container_width), container_height)
    }
}
