//! Sizing behaviour classification and aspect-ratio parsing

use crate::graph::{
    AnchorGraph, Axis, AxisBehavior, AxisSpec, DimensionBehavior, DimensionRatio, MatchConstraintMode,
    MatchDefault, Node, PerAxis, SizeSpec,
};

/// Decide the sizing behaviour of one axis
///
/// `container_exact` tells whether the container's extent on this axis is
/// known; spreading into an unknown extent falls back to wrapping.
pub fn classify_axis(spec: &AxisSpec, container_exact: bool) -> AxisBehavior {
    let mut behavior = AxisBehavior::default();
    match spec.size {
        SizeSpec::Fixed(value) => {
            behavior.behavior = DimensionBehavior::Fixed;
            behavior.fixed = value.max(0.0);
        }
        SizeSpec::WrapContent => {
            behavior.behavior = DimensionBehavior::Content;
            behavior.constrained = spec.constrained;
        }
        SizeSpec::MatchParent if !spec.constrained => {
            behavior.behavior = DimensionBehavior::FillContainer;
        }
        SizeSpec::MatchParent => {
            behavior.behavior = DimensionBehavior::MatchConstraint;
            behavior.mode = MatchConstraintMode::Spread;
        }
        SizeSpec::MatchConstraint => {
            behavior.behavior = DimensionBehavior::MatchConstraint;
            match (spec.percent, spec.default) {
                (Some(percent), _) => {
                    behavior.mode = MatchConstraintMode::Percent;
                    behavior.percent = percent.max(0.0);
                }
                (None, MatchDefault::Percent) => {
                    behavior.mode = MatchConstraintMode::Percent;
                    behavior.percent = 1.0;
                }
                (None, MatchDefault::Wrap) => behavior.mode = MatchConstraintMode::Wrap,
                (None, MatchDefault::Spread) => behavior.mode = MatchConstraintMode::Spread,
            }
        }
    }
    if behavior.is_match_constraint()
        && behavior.mode == MatchConstraintMode::Spread
        && !container_exact
    {
        behavior.mode = MatchConstraintMode::Wrap;
    }
    behavior
}

/// Sizing behaviour of both axes of a node
pub fn classify(node: &Node, container_exact: PerAxis<bool>) -> PerAxis<AxisBehavior> {
    PerAxis::new(
        classify_axis(&node.size.horizontal, container_exact.horizontal),
        classify_axis(&node.size.vertical, container_exact.vertical),
    )
}

/// Parse a ratio string: `"W,num:den"`, `"H,num:den"`, `"num:den"` or a float
///
/// The value is always width / height. Malformed input yields a NaN ratio,
/// which downstream code treats as "no ratio".
pub fn parse_ratio(input: &str) -> DimensionRatio {
    let input = input.trim();
    if input.is_empty() {
        return DimensionRatio::NONE;
    }

    let (derived, rest) = match input.split_once(',') {
        Some((side, rest)) if !rest.trim().is_empty() => {
            let derived = match side.trim() {
                "W" | "w" => Some(Axis::Horizontal),
                "H" | "h" => Some(Axis::Vertical),
                _ => None,
            };
            (derived, rest.trim())
        }
        _ => (None, input),
    };

    let value = match rest.split_once(':') {
        Some((numerator, denominator)) => {
            match (
                numerator.trim().parse::<f64>(),
                denominator.trim().parse::<f64>(),
            ) {
                (Ok(n), Ok(d)) if d != 0.0 => n / d,
                _ => f64::NAN,
            }
        }
        None => rest.parse::<f64>().unwrap_or(f64::NAN),
    };

    DimensionRatio { value, derived }
}

/// Work out which axis a ratio drives, given the classified behaviours
///
/// An explicit side wins; otherwise the single match-constraint axis is
/// derived, and with two such axes the height follows the width.
pub fn effective_ratio(ratio: DimensionRatio, behavior: &PerAxis<AxisBehavior>) -> DimensionRatio {
    if !ratio.is_usable() {
        return DimensionRatio::NONE;
    }
    let horizontal = behavior.horizontal.is_match_constraint();
    let vertical = behavior.vertical.is_match_constraint();
    let derived = match ratio.derived {
        Some(axis) if behavior[axis].is_match_constraint() => axis,
        Some(_) => return DimensionRatio::NONE,
        None if vertical => Axis::Vertical,
        None if horizontal => Axis::Horizontal,
        None => return DimensionRatio::NONE,
    };
    DimensionRatio {
        value: ratio.value,
        derived: Some(derived),
    }
}

/// Classify every node and resolve its ratio
pub fn classify_all(graph: &mut AnchorGraph, container_exact: PerAxis<bool>) {
    for node in graph.nodes_mut() {
        let behavior = classify(node, container_exact);
        let ratio = node
            .dimension_ratio
            .as_deref()
            .map(parse_ratio)
            .unwrap_or(DimensionRatio::NONE);
        node.resolution.ratio = effective_ratio(ratio, &behavior);
        node.resolution.behavior = behavior;
    }
}
