//! Anchors and the connections between them

use std::fmt;

use super::node::{Axis, NodeId};

/// A named attachment point on a node's edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnchorKind {
    Left,
    Right,
    Top,
    Bottom,
    Start,
    End,
    Baseline,
    CenterCircle,
}

impl AnchorKind {
    pub const COUNT: usize = 8;

    pub const ALL: [AnchorKind; Self::COUNT] = [
        Self::Left,
        Self::Right,
        Self::Top,
        Self::Bottom,
        Self::Start,
        Self::End,
        Self::Baseline,
        Self::CenterCircle,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Parse the lowercase name used by the constraint-set format
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            "start" => Some(Self::Start),
            "end" => Some(Self::End),
            "baseline" => Some(Self::Baseline),
            "circle" | "center_circle" => Some(Self::CenterCircle),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Start => "start",
            Self::End => "end",
            Self::Baseline => "baseline",
            Self::CenterCircle => "circle",
        }
    }

    /// The axis this anchor constrains, if it is a side anchor
    pub fn axis(self) -> Option<Axis> {
        match self {
            Self::Left | Self::Right | Self::Start | Self::End => Some(Axis::Horizontal),
            Self::Top | Self::Bottom | Self::Baseline => Some(Axis::Vertical),
            Self::CenterCircle => None,
        }
    }

    /// Whether a connection from `self` to `target` is meaningful
    pub fn is_compatible_with(self, target: AnchorKind) -> bool {
        match (self.axis(), target.axis()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => true,
            _ => false,
        }
    }

    /// Whether this is a logical (writing-direction dependent) anchor
    pub fn is_logical(self) -> bool {
        matches!(self, Self::Start | Self::End)
    }

    /// Map a logical anchor to its physical side
    pub fn to_physical(self, rtl: bool) -> AnchorKind {
        match (self, rtl) {
            (Self::Start, false) | (Self::End, true) => Self::Left,
            (Self::Start, true) | (Self::End, false) => Self::Right,
            (other, _) => other,
        }
    }
}

impl fmt::Display for AnchorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An anchor on a specific node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorRef {
    pub node: NodeId,
    pub kind: AnchorKind,
}

impl AnchorRef {
    pub fn new(node: NodeId, kind: AnchorKind) -> Self {
        Self { node, kind }
    }
}

impl fmt::Display for AnchorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.kind)
    }
}

/// A directed link from an anchor to a target anchor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub target: AnchorRef,
    /// Margin, or radius for circular connections
    pub margin: f64,
    /// Margin used instead of `margin` when the target is collapsed
    pub gone_margin: f64,
}

impl Connection {
    pub fn new(target: AnchorRef, margin: f64) -> Self {
        Self {
            target,
            margin,
            gone_margin: 0.0,
        }
    }

    pub fn with_gone_margin(mut self, gone_margin: f64) -> Self {
        self.gone_margin = gone_margin;
        self
    }

    /// Both endpoints of a baseline connection carry a baseline
    pub fn is_baseline(&self) -> bool {
        self.target.kind == AnchorKind::Baseline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_anchors_interconnect() {
        for a in [AnchorKind::Left, AnchorKind::Right, AnchorKind::Start, AnchorKind::End] {
            for b in [AnchorKind::Left, AnchorKind::Right, AnchorKind::Start, AnchorKind::End] {
                assert!(a.is_compatible_with(b), "{} -> {}", a, b);
            }
        }
    }

    #[test]
    fn test_cross_axis_is_incompatible() {
        assert!(!AnchorKind::Left.is_compatible_with(AnchorKind::Top));
        assert!(!AnchorKind::Baseline.is_compatible_with(AnchorKind::End));
        assert!(!AnchorKind::CenterCircle.is_compatible_with(AnchorKind::Top));
        assert!(AnchorKind::Baseline.is_compatible_with(AnchorKind::Top));
        assert!(AnchorKind::CenterCircle.is_compatible_with(AnchorKind::CenterCircle));
    }

    #[test]
    fn test_physical_mapping() {
        assert_eq!(AnchorKind::Start.to_physical(false), AnchorKind::Left);
        assert_eq!(AnchorKind::Start.to_physical(true), AnchorKind::Right);
        assert_eq!(AnchorKind::End.to_physical(false), AnchorKind::Right);
        assert_eq!(AnchorKind::End.to_physical(true), AnchorKind::Left);
        assert_eq!(AnchorKind::Top.to_physical(true), AnchorKind::Top);
    }

    #[test]
    fn test_names_round_trip() {
        for kind in AnchorKind::ALL {
            assert_eq!(AnchorKind::from_name(kind.name()), Some(kind));
        }
    }
}
