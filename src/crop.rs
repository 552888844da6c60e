//! Crop geometry for avatar and banner uploads.
//!
//! The user positions a fixed-aspect crop box over a scaled-down preview of
//! the image; the upload needs the same box in the image's own pixels. All
//! functions here are pure.

use crate::error::{AnoniumError, Result};

/// Smallest crop edge, in the coordinate space of the image it lives in.
pub const MIN_CROP_EDGE: f64 = 1.0;

/// Width and height of an image or a displayed preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Size {
    /// Creates a size, rejecting non-positive or non-finite edges.
    pub fn new(width: f64, height: f64) -> Result<Self> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(AnoniumError::invalid_input(format!(
                "Invalid image size {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    /// Width divided by height.
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }
}

fn check_aspect(aspect: f64) -> Result<()> {
    if aspect.is_finite() && aspect > 0.0 {
        Ok(())
    } else {
        Err(AnoniumError::invalid_input(format!(
            "Invalid aspect ratio {}",
            aspect
        )))
    }
}

/// A crop rectangle; `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// Largest crop of the given aspect ratio, centered in the image.
pub fn centered_crop(image: Size, aspect: f64) -> Result<CropRect> {
    check_aspect(aspect)?;

    let (width, height) = if image.aspect() > aspect {
        (image.height * aspect, image.height)
    } else {
        (image.width, image.width / aspect)
    };

    Ok(CropRect {
        x: (image.width - width) / 2.0,
        y: (image.height - height) / 2.0,
        width,
        height,
    })
}

impl CropRect {
    /// Center point.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Returns true if the rectangle lies inside the image.
    pub fn fits(&self, image: Size) -> bool {
        const EPS: f64 = 1e-9;
        self.x >= -EPS
            && self.y >= -EPS
            && self.x + self.width <= image.width + EPS
            && self.y + self.height <= image.height + EPS
    }

    fn clamped_to(mut self, image: Size) -> Self {
        self.x = self.x.clamp(0.0, (image.width - self.width).max(0.0));
        self.y = self.y.clamp(0.0, (image.height - self.height).max(0.0));
        self
    }

    /// Moves the crop by a drag offset, stopping at the image edges.
    pub fn moved(self, dx: f64, dy: f64, image: Size) -> Self {
        CropRect {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
        .clamped_to(image)
    }

    /// Resizes the crop around its center to `width`, keeping `aspect`.
    ///
    /// The width is limited to what fits in the image; the result is then
    /// shifted back inside if the center was near an edge.
    pub fn resized(self, width: f64, aspect: f64, image: Size) -> Result<Self> {
        check_aspect(aspect)?;
        if !width.is_finite() {
            return Err(AnoniumError::invalid_input("Crop width must be finite"));
        }

        let max_width = image.width.min(image.height * aspect);
        let min_width = MIN_CROP_EDGE.max(MIN_CROP_EDGE * aspect).min(max_width);
        let width = width.clamp(min_width, max_width);
        let height = width / aspect;
        let (cx, cy) = self.center();

        Ok(CropRect {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
        .clamped_to(image))
    }

    /// Maps a crop drawn on a displayed preview to natural image pixels.
    pub fn to_natural(self, displayed: Size, natural: Size) -> Self {
        let sx = natural.width / displayed.width;
        let sy = natural.height / displayed.height;
        CropRect {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }

    /// Whole-pixel `(x, y, width, height)`, kept inside `image`.
    pub fn to_pixels(self, image: Size) -> (u32, u32, u32, u32) {
        let x = self.x.round().max(0.0);
        let y = self.y.round().max(0.0);
        let width = self.width.round().min(image.width - x).max(1.0);
        let height = self.height.round().min(image.height - y).max(1.0);
        (x as u32, y as u32, width as u32, height as u32)
    }
}
