//! Nodes: the participants of a constraint layout

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::layout::types::{BoundingBox, Size};

use super::anchor::{AnchorKind, Connection};

/// Stable handle of a node inside an [`AnchorGraph`](super::AnchorGraph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub const BOTH: [Axis; 2] = [Axis::Horizontal, Axis::Vertical];

    pub fn other(self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }

    /// The (start, end) physical anchors of this axis
    pub fn sides(self) -> (AnchorKind, AnchorKind) {
        match self {
            Axis::Horizontal => (AnchorKind::Left, AnchorKind::Right),
            Axis::Vertical => (AnchorKind::Top, AnchorKind::Bottom),
        }
    }
}

/// A value per layout axis
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerAxis<T> {
    pub horizontal: T,
    pub vertical: T,
}

impl<T> PerAxis<T> {
    pub fn new(horizontal: T, vertical: T) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> PerAxis<U> {
        PerAxis {
            horizontal: f(self.horizontal),
            vertical: f(self.vertical),
        }
    }
}

impl<T: Clone> PerAxis<T> {
    pub fn splat(value: T) -> Self {
        Self::new(value.clone(), value)
    }
}

impl<T> Index<Axis> for PerAxis<T> {
    type Output = T;

    fn index(&self, axis: Axis) -> &T {
        match axis {
            Axis::Horizontal => &self.horizontal,
            Axis::Vertical => &self.vertical,
        }
    }
}

impl<T> IndexMut<Axis> for PerAxis<T> {
    fn index_mut(&mut self, axis: Axis) -> &mut T {
        match axis {
            Axis::Horizontal => &mut self.horizontal,
            Axis::Vertical => &mut self.vertical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    /// Takes space but is not drawn
    Invisible,
    /// Takes no space; connections to it use their gone margin
    Collapsed,
}

impl Visibility {
    /// Lenient: unknown names fall back to visible
    pub fn from_name(name: &str) -> Self {
        match name {
            "invisible" => Self::Invisible,
            "gone" | "collapsed" => Self::Collapsed,
            _ => Self::Visible,
        }
    }
}

/// How a chain distributes free space between its members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainStyle {
    #[default]
    Spread,
    SpreadInside,
    Packed,
}

impl ChainStyle {
    pub fn from_name(name: &str) -> Self {
        match name {
            "spread_inside" => Self::SpreadInside,
            "packed" => Self::Packed,
            _ => Self::Spread,
        }
    }
}

/// Declared size of one axis
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SizeSpec {
    Fixed(f64),
    #[default]
    WrapContent,
    MatchParent,
    /// Logical zero: the extent comes from the constraints
    MatchConstraint,
}

/// Sub-mode requested for a match-constraint axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchDefault {
    #[default]
    Spread,
    Wrap,
    Percent,
}

impl MatchDefault {
    pub fn from_name(name: &str) -> Self {
        match name {
            "wrap" => Self::Wrap,
            "percent" => Self::Percent,
            _ => Self::Spread,
        }
    }
}

/// Everything declared about the size of one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSpec {
    pub size: SizeSpec,
    /// Wrap content may shrink to its constraints; match parent yields to siblings
    pub constrained: bool,
    pub default: MatchDefault,
    pub percent: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl Default for AxisSpec {
    fn default() -> Self {
        Self {
            size: SizeSpec::WrapContent,
            constrained: false,
            default: MatchDefault::Spread,
            percent: None,
            min: 0.0,
            max: f64::INFINITY,
        }
    }
}

impl AxisSpec {
    pub fn new(size: SizeSpec) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn fixed(value: f64) -> Self {
        Self::new(SizeSpec::Fixed(value))
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max.max(self.min))
    }
}

/// Draw-time properties captured alongside constraints
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub alpha: f64,
    pub elevation: f64,
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub translation_x: f64,
    pub translation_y: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            elevation: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            translation_x: 0.0,
            translation_y: 0.0,
        }
    }
}

/// A custom attribute value carried by a constraint set
#[derive(Debug, Clone, PartialEq)]
pub enum CustomValue {
    Number(f64),
    Text(String),
    Flag(bool),
}

impl CustomValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CustomValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Orientation of a guideline's line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// The axis along which the guideline is offset
    pub fn axis(self) -> Axis {
        match self {
            Orientation::Vertical => Axis::Horizontal,
            Orientation::Horizontal => Axis::Vertical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GuidelinePosition {
    Begin(f64),
    End(f64),
    Percent(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Guideline {
    pub orientation: Orientation,
    pub position: GuidelinePosition,
    /// Mirror percent positions in right-to-left layouts
    pub use_rtl: bool,
    /// Shared value that overrides the begin offset when present
    pub reactive: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierSide {
    Left,
    Right,
    Top,
    Bottom,
    Start,
    End,
}

impl BarrierSide {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            "start" => Some(Self::Start),
            "end" => Some(Self::End),
            _ => None,
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Self::Top | Self::Bottom => Axis::Vertical,
            _ => Axis::Horizontal,
        }
    }

    /// Barriers on the far side track the maximum member edge
    pub fn tracks_max(self) -> bool {
        matches!(self, Self::Right | Self::Bottom | Self::End)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Barrier {
    pub side: BarrierSide,
    /// Whether collapsed members still contribute their edge
    pub allows_gone: bool,
    pub margin: f64,
    pub refs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Group {
    pub refs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layer {
    pub refs: Vec<String>,
    pub padding: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Placeholder {
    pub content: Option<String>,
}

/// What a node is; helpers are virtual nodes with a membership list
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NodeKind {
    #[default]
    Plain,
    Guideline(Guideline),
    Barrier(Barrier),
    Group(Group),
    Layer(Layer),
    Placeholder(Placeholder),
}

impl NodeKind {
    pub fn is_helper(&self) -> bool {
        !matches!(self, NodeKind::Plain)
    }

    /// Virtual nodes never go through host measurement
    pub fn is_virtual(&self) -> bool {
        !matches!(self, NodeKind::Plain | NodeKind::Placeholder(_))
    }

    /// Identifiers this helper references, in declaration order
    pub fn refs(&self) -> &[String] {
        match self {
            NodeKind::Barrier(b) => &b.refs,
            NodeKind::Group(g) => &g.refs,
            NodeKind::Layer(l) => &l.refs,
            NodeKind::Placeholder(p) => p.content.as_slice(),
            NodeKind::Plain | NodeKind::Guideline(_) => &[],
        }
    }

    pub fn role_name(&self) -> &'static str {
        match self {
            NodeKind::Plain => "plain",
            NodeKind::Guideline(_) => "guideline",
            NodeKind::Barrier(_) => "barrier",
            NodeKind::Group(_) => "group",
            NodeKind::Layer(_) => "layer",
            NodeKind::Placeholder(_) => "placeholder",
        }
    }
}

/// Sizing behaviour decided for one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DimensionBehavior {
    Fixed,
    #[default]
    Content,
    FillContainer,
    MatchConstraint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchConstraintMode {
    #[default]
    Spread,
    Wrap,
    Percent,
}

/// Classified sizing of one axis, recomputed every pass
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisBehavior {
    pub behavior: DimensionBehavior,
    pub mode: MatchConstraintMode,
    /// Literal size for `Fixed`
    pub fixed: f64,
    /// Content that may shrink or grow to satisfy its constraints
    pub constrained: bool,
    pub percent: f64,
}

impl AxisBehavior {
    pub fn is_match_constraint(&self) -> bool {
        self.behavior == DimensionBehavior::MatchConstraint
    }

    /// Whether the solver may assign a size different from the measured one
    pub fn is_flexible(&self) -> bool {
        self.is_match_constraint()
            || (self.behavior == DimensionBehavior::Content && self.constrained)
    }
}

/// Parsed aspect ratio, `value` is width / height
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionRatio {
    pub value: f64,
    /// Axis whose size is derived from the other one
    pub derived: Option<Axis>,
}

impl DimensionRatio {
    pub const NONE: DimensionRatio = DimensionRatio {
        value: f64::NAN,
        derived: None,
    };

    pub fn is_usable(&self) -> bool {
        self.value.is_finite() && self.value > 0.0
    }

    /// Size of the `derived` axis given the size of the other axis
    pub fn derive(&self, derived: Axis, known: f64) -> f64 {
        match derived {
            Axis::Horizontal => known * self.value,
            Axis::Vertical => known / self.value,
        }
    }
}

impl Default for DimensionRatio {
    fn default() -> Self {
        Self::NONE
    }
}

/// Effective horizontal constraints after writing-direction resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedHorizontal {
    pub left: Option<Connection>,
    pub right: Option<Connection>,
    pub bias: f64,
    pub guideline: Option<GuidelinePosition>,
    pub barrier_side: Option<BarrierSide>,
    /// Logical anchors were mapped right-to-left
    pub mirrored: bool,
}

impl Default for ResolvedHorizontal {
    fn default() -> Self {
        Self {
            left: None,
            right: None,
            bias: 0.5,
            guideline: None,
            barrier_side: None,
            mirrored: false,
        }
    }
}

/// Per-pass state derived from the declarations
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub horizontal: ResolvedHorizontal,
    pub behavior: PerAxis<AxisBehavior>,
    pub ratio: DimensionRatio,
    /// Collapsed content currently shown through a placeholder
    pub placeholder_content: bool,
    /// Visibility imposed by a group or placeholder for this pass
    pub visibility: Option<Visibility>,
    /// Target of another node's baseline connection
    pub baseline_target: bool,
    pub frame: BoundingBox,
    pub baseline: Option<f64>,
    /// Size a placeholder took over from its content
    pub adopted_size: Option<Size>,
}

/// A layout participant and everything declared about it
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: Option<String>,
    pub kind: NodeKind,
    pub(crate) connections: [Option<Connection>; AnchorKind::COUNT],
    pub size: PerAxis<AxisSpec>,
    pub dimension_ratio: Option<String>,
    pub bias: PerAxis<f64>,
    pub chain_style: PerAxis<ChainStyle>,
    pub weight: PerAxis<Option<f64>>,
    /// Angle in degrees for circular positioning, clockwise from up
    pub circle_angle: f64,
    pub visibility: Visibility,
    pub transform: Transform,
    pub custom: BTreeMap<String, CustomValue>,
    pub tag: Option<String>,
    pub(crate) resolution: Resolution,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: Option<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name,
            kind,
            connections: [None; AnchorKind::COUNT],
            size: PerAxis::default(),
            dimension_ratio: None,
            bias: PerAxis::splat(0.5),
            chain_style: PerAxis::default(),
            weight: PerAxis::default(),
            circle_angle: 0.0,
            visibility: Visibility::Visible,
            transform: Transform::default(),
            custom: BTreeMap::new(),
            tag: None,
            resolution: Resolution::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name for diagnostics: the identifier, or the arena handle
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }

    /// The declared outgoing connection of an anchor
    pub fn connection(&self, kind: AnchorKind) -> Option<&Connection> {
        self.connections[kind.index()].as_ref()
    }

    pub fn connections(&self) -> impl Iterator<Item = (AnchorKind, &Connection)> {
        AnchorKind::ALL
            .into_iter()
            .filter_map(|kind| self.connection(kind).map(|c| (kind, c)))
    }

    /// The connection the solver sees: resolved sides horizontally, declared otherwise
    pub fn effective(&self, kind: AnchorKind) -> Option<&Connection> {
        match kind {
            AnchorKind::Left => self.resolution.horizontal.left.as_ref(),
            AnchorKind::Right => self.resolution.horizontal.right.as_ref(),
            AnchorKind::Start | AnchorKind::End => None,
            other => self.connection(other),
        }
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn behavior(&self, axis: Axis) -> AxisBehavior {
        self.resolution.behavior[axis]
    }

    pub fn frame(&self) -> BoundingBox {
        self.resolution.frame
    }

    /// Visibility for the current pass: an override from a helper, else the declared one
    pub fn effective_visibility(&self) -> Visibility {
        self.resolution.visibility.unwrap_or(self.visibility)
    }

    pub fn is_collapsed(&self) -> bool {
        self.effective_visibility() == Visibility::Collapsed
    }

    /// Clear all connections and sizing flags
    pub(crate) fn reset(&mut self) {
        self.connections = [None; AnchorKind::COUNT];
        self.size = PerAxis::default();
        self.dimension_ratio = None;
        self.bias = PerAxis::splat(0.5);
        self.chain_style = PerAxis::default();
        self.weight = PerAxis::default();
        self.circle_angle = 0.0;
    }

    /// Drop everything derived in a previous pass, keeping the last geometry
    pub(crate) fn reset_resolution(&mut self) {
        let frame = self.resolution.frame;
        let baseline = self.resolution.baseline;
        let adopted_size = self.resolution.adopted_size;
        self.resolution = Resolution {
            frame,
            baseline,
            adopted_size,
            ..Resolution::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_axis_indexing() {
        let mut values = PerAxis::new(1.0, 2.0);
        assert_eq!(values[Axis::Horizontal], 1.0);
        values[Axis::Vertical] = 5.0;
        assert_eq!(values.vertical, 5.0);
    }

    #[test]
    fn test_axis_spec_clamp() {
        let spec = AxisSpec {
            min: 10.0,
            max: 50.0,
            ..AxisSpec::default()
        };
        assert_eq!(spec.clamp(5.0), 10.0);
        assert_eq!(spec.clamp(70.0), 50.0);
        assert_eq!(spec.clamp(20.0), 20.0);
    }

    #[test]
    fn test_ratio_derivation() {
        let ratio = DimensionRatio {
            value: 2.0,
            derived: Some(Axis::Horizontal),
        };
        assert_eq!(ratio.derive(Axis::Horizontal, 100.0), 200.0);
        assert_eq!(ratio.derive(Axis::Vertical, 100.0), 50.0);
        assert!(!DimensionRatio::NONE.is_usable());
    }

    #[test]
    fn test_lenient_enum_names() {
        assert_eq!(Visibility::from_name("gone"), Visibility::Collapsed);
        assert_eq!(Visibility::from_name("sideways"), Visibility::Visible);
        assert_eq!(ChainStyle::from_name("packed"), ChainStyle::Packed);
        assert_eq!(ChainStyle::from_name("bogus"), ChainStyle::Spread);
    }
}
