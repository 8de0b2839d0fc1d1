//! Sparse overrides replayed onto snapshot entries

use std::collections::BTreeMap;

use regex::Regex;
use tracing::debug;

use crate::graph::{AnchorKind, Axis, ChainStyle, CustomValue, MatchDefault, SizeSpec, Visibility};
use crate::layout::error::{ConfigurationError, ResolutionWarning};

use super::snapshot::{AnchorTarget, ConstraintBundle, ConstraintSnapshot};

/// Which entries a delta applies to
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaTarget {
    /// The entry with this identifier
    Id(String),
    /// Every entry whose tag fully matches this regular expression
    TagPattern(String),
}

/// One overridden declaration
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaField {
    Size(Axis, SizeSpec),
    MatchDefault(Axis, MatchDefault),
    Percent(Axis, f64),
    Min(Axis, f64),
    Max(Axis, f64),
    Constrained(Axis, bool),
    Connect(AnchorKind, AnchorTarget),
    Disconnect(AnchorKind),
    Ratio(Option<String>),
    Bias(Axis, f64),
    ChainStyle(Axis, ChainStyle),
    Weight(Axis, Option<f64>),
    CircleAngle(f64),
    Visibility(Visibility),
    Alpha(f64),
    Elevation(f64),
    Rotation(f64),
    Scale(f64, f64),
    Translation(f64, f64),
    /// Merged into the existing attributes, overriding equal keys
    Custom(BTreeMap<String, CustomValue>),
    Tag(Option<String>),
}

impl DeltaField {
    pub fn apply_to(&self, bundle: &mut ConstraintBundle) {
        match self {
            DeltaField::Size(axis, size) => bundle.size[*axis].size = *size,
            DeltaField::MatchDefault(axis, default) => bundle.size[*axis].default = *default,
            DeltaField::Percent(axis, percent) => bundle.size[*axis].percent = Some(*percent),
            DeltaField::Min(axis, min) => bundle.size[*axis].min = *min,
            DeltaField::Max(axis, max) => bundle.size[*axis].max = *max,
            DeltaField::Constrained(axis, constrained) => bundle.size[*axis].constrained = *constrained,
            DeltaField::Connect(anchor, target) => bundle.connect(*anchor, target.clone()),
            DeltaField::Disconnect(anchor) => {
                bundle.connections.remove(anchor);
            }
            DeltaField::Ratio(ratio) => bundle.dimension_ratio = ratio.clone(),
            DeltaField::Bias(axis, bias) => bundle.bias[*axis] = *bias,
            DeltaField::ChainStyle(axis, style) => bundle.chain_style[*axis] = *style,
            DeltaField::Weight(axis, weight) => bundle.weight[*axis] = *weight,
            DeltaField::CircleAngle(angle) => bundle.circle_angle = *angle,
            DeltaField::Visibility(visibility) => bundle.visibility = *visibility,
            DeltaField::Alpha(alpha) => bundle.transform.alpha = *alpha,
            DeltaField::Elevation(elevation) => bundle.transform.elevation = *elevation,
            DeltaField::Rotation(rotation) => bundle.transform.rotation = *rotation,
            DeltaField::Scale(x, y) => {
                bundle.transform.scale_x = *x;
                bundle.transform.scale_y = *y;
            }
            DeltaField::Translation(x, y) => {
                bundle.transform.translation_x = *x;
                bundle.transform.translation_y = *y;
            }
            DeltaField::Custom(values) => {
                bundle
                    .custom
                    .extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            DeltaField::Tag(tag) => bundle.tag = tag.clone(),
        }
    }
}

/// A sparse, typed overlay for one or more snapshot entries
///
/// Every field overwrites a single declaration, so replaying a delta is
/// idempotent.
#[derive(Debug, Clone, PartialEq)]
pub struct Delta {
    pub target: DeltaTarget,
    pub fields: Vec<DeltaField>,
}

impl Delta {
    pub fn for_id(id: impl Into<String>) -> Self {
        Self {
            target: DeltaTarget::Id(id.into()),
            fields: Vec::new(),
        }
    }

    pub fn for_tag(pattern: impl Into<String>) -> Self {
        Self {
            target: DeltaTarget::TagPattern(pattern.into()),
            fields: Vec::new(),
        }
    }

    pub fn with(mut self, field: DeltaField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn apply_to_bundle(&self, bundle: &mut ConstraintBundle) {
        for field in &self.fields {
            field.apply_to(bundle);
        }
    }

    /// Replay onto the targeted entries of `snapshot`
    ///
    /// An unknown identifier is a warning; an invalid tag pattern is an error.
    pub fn apply(&self, snapshot: &mut ConstraintSnapshot) -> Result<Vec<ResolutionWarning>, ConfigurationError> {
        let mut warnings = Vec::new();
        match &self.target {
            DeltaTarget::Id(id) => match snapshot.get_mut(id) {
                Some(bundle) => self.apply_to_bundle(bundle),
                None => warnings.push(ResolutionWarning::UnknownIdentifier { id: id.clone() }.emit()),
            },
            DeltaTarget::TagPattern(pattern) => {
                let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                    ConfigurationError::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    }
                })?;
                let mut matched = 0;
                for bundle in snapshot.bundles_mut() {
                    if bundle.tag.as_deref().is_some_and(|tag| regex.is_match(tag)) {
                        self.apply_to_bundle(bundle);
                        matched += 1;
                    }
                }
                debug!(pattern = %pattern, matched, "applied tagged delta");
            }
        }
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AxisSpec;
    use pretty_assertions::assert_eq;

    fn sample() -> ConstraintSnapshot {
        let mut snapshot = ConstraintSnapshot::new("main");
        let mut title = ConstraintBundle::default();
        title.tag = Some("header".into());
        title.custom.insert("color".into(), CustomValue::Text("red".into()));
        snapshot.insert("title", title);
        let mut subtitle = ConstraintBundle::default();
        subtitle.tag = Some("header_sub".into());
        snapshot.insert("subtitle", subtitle);
        snapshot.insert("body", ConstraintBundle::default());
        snapshot
    }

    #[test]
    fn test_width_override_leaves_other_fields() {
        let mut snapshot = sample();
        let before = snapshot.get("title").cloned().unwrap();
        let delta = Delta::for_id("title").with(DeltaField::Size(Axis::Horizontal, SizeSpec::Fixed(50.0)));

        delta.apply(&mut snapshot).unwrap();
        let once = snapshot.clone();
        delta.apply(&mut snapshot).unwrap();

        let after = snapshot.get("title").unwrap();
        assert_eq!(after.size.horizontal, AxisSpec::fixed(50.0));
        assert_eq!(
            ConstraintBundle {
                size: before.size,
                ..after.clone()
            },
            before
        );
        assert_eq!(snapshot, once);
    }

    #[test]
    fn test_tag_pattern_matches_whole_tag() {
        let mut snapshot = sample();
        let delta = Delta::for_tag("head.*").with(DeltaField::Visibility(Visibility::Collapsed));
        delta.apply(&mut snapshot).unwrap();
        assert_eq!(snapshot.get("title").unwrap().visibility, Visibility::Collapsed);
        assert_eq!(snapshot.get("subtitle").unwrap().visibility, Visibility::Collapsed);
        assert_eq!(snapshot.get("body").unwrap().visibility, Visibility::Visible);

        let mut snapshot = sample();
        Delta::for_tag("header")
            .with(DeltaField::Alpha(0.5))
            .apply(&mut snapshot)
            .unwrap();
        assert_eq!(snapshot.get("title").unwrap().transform.alpha, 0.5);
        assert_eq!(snapshot.get("subtitle").unwrap().transform.alpha, 1.0);
    }

    #[test]
    fn test_custom_attributes_merge() {
        let mut snapshot = sample();
        let mut values = BTreeMap::new();
        values.insert("size".to_string(), CustomValue::Number(14.0));
        Delta::for_id("title")
            .with(DeltaField::Custom(values))
            .apply(&mut snapshot)
            .unwrap();
        let custom = &snapshot.get("title").unwrap().custom;
        assert_eq!(custom.len(), 2);
        assert_eq!(custom.get("color"), Some(&CustomValue::Text("red".into())));
    }

    #[test]
    fn test_unknown_id_warns() {
        let mut snapshot = sample();
        let warnings = Delta::for_id("missing")
            .with(DeltaField::CircleAngle(90.0))
            .apply(&mut snapshot)
            .unwrap();
        assert_eq!(
            warnings,
            vec![ResolutionWarning::UnknownIdentifier { id: "missing".into() }]
        );
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let mut snapshot = sample();
        let result = Delta::for_tag("head(").with(DeltaField::Alpha(0.0)).apply(&mut snapshot);
        assert!(matches!(result, Err(ConfigurationError::InvalidPattern { .. })));
    }

    #[test]
    fn test_connect_and_disconnect() {
        let mut bundle = ConstraintBundle::default();
        Delta::for_id("x")
            .with(DeltaField::Connect(
                AnchorKind::Left,
                AnchorTarget::new("parent", AnchorKind::Left, 4.0),
            ))
            .apply_to_bundle(&mut bundle);
        assert!(bundle.connections.contains_key(&AnchorKind::Left));
        Delta::for_id("x")
            .with(DeltaField::Disconnect(AnchorKind::Left))
            .apply_to_bundle(&mut bundle);
        assert!(bundle.connections.is_empty());
    }
}
