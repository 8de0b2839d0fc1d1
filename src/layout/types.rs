//! Core geometry and measurement types

use std::fmt;

/// A width/height pair
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Component-wise comparison within `tolerance`
    pub fn approx_eq(&self, other: &Size, tolerance: f64) -> bool {
        (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }
}

/// A bounding box representing the resolved extent of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a zero-sized bounding box at the origin
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Right edge x-coordinate
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Compute the union of two bounding boxes (smallest box containing both)
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(x, y, right - x, bottom - y)
    }

    /// Grow the box by `amount` on every side
    pub fn inflate(&self, amount: f64) -> BoundingBox {
        BoundingBox::new(
            self.x - amount,
            self.y - amount,
            self.width + 2.0 * amount,
            self.height + 2.0 * amount,
        )
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x={:.1} y={:.1} w={:.1} h={:.1}",
            self.x, self.y, self.width, self.height
        )
    }
}

/// A measurement constraint for one axis, as handed to the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasureSpec {
    /// The node must be exactly this size
    Exactly(f64),
    /// The node may be any size up to this bound
    AtMost(f64),
    /// The node may be any size
    Unspecified,
}

impl MeasureSpec {
    /// The spec used to ask a node for its intrinsic size
    pub fn content(available: Option<f64>) -> Self {
        match available {
            Some(limit) => MeasureSpec::AtMost(limit),
            None => MeasureSpec::Unspecified,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, MeasureSpec::Exactly(_))
    }

    /// The bound carried by the spec, if any
    pub fn size(&self) -> Option<f64> {
        match self {
            MeasureSpec::Exactly(v) | MeasureSpec::AtMost(v) => Some(*v),
            MeasureSpec::Unspecified => None,
        }
    }

    /// Resolve a desired size against this spec
    pub fn resolve(&self, desired: f64) -> f64 {
        match self {
            MeasureSpec::Exactly(v) => *v,
            MeasureSpec::AtMost(v) => desired.min(*v),
            MeasureSpec::Unspecified => desired,
        }
    }
}

/// What the host reports back from a measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub width: f64,
    pub height: f64,
    /// Distance from the top to the baseline, negative when there is none
    pub baseline: f64,
}

impl Measurement {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            baseline: -1.0,
        }
    }

    pub fn with_baseline(mut self, baseline: f64) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Writing direction of the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutDirection {
    #[default]
    LeftToRight,
    RightToLeft,
}

impl LayoutDirection {
    pub fn is_rtl(self) -> bool {
        self == LayoutDirection::RightToLeft
    }
}
