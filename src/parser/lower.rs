//! Lowering parsed constraint sets into snapshots
//!
//! Unknown property names are skipped with a warning and unknown enum words
//! fall back to their defaults. Type mismatches, unknown anchors and
//! incompatible anchor pairs are errors.

use tracing::warn;

use crate::constraint_set::{AnchorTarget, ConstraintBundle, ConstraintSnapshot};
use crate::error::ParseError;
use crate::graph::{
    AnchorKind, Axis, Barrier, BarrierSide, ChainStyle, CustomValue, Group, Guideline, GuidelinePosition,
    Layer, MatchDefault, NodeKind, Orientation, Placeholder, SizeSpec, Visibility,
};

use super::ast::*;

/// Parse and lower a constraint-set file in one step
pub fn load(input: &str) -> Result<Vec<ConstraintSnapshot>, Vec<ParseError>> {
    let doc = super::parse(input)?;
    lower(&doc)
}

/// Turn every set of a document into a snapshot, collecting all errors
pub fn lower(doc: &Document) -> Result<Vec<ConstraintSnapshot>, Vec<ParseError>> {
    let mut errors = Vec::new();
    let mut snapshots = Vec::new();
    for set in &doc.sets {
        let set = &set.node;
        let mut snapshot = ConstraintSnapshot::new(set.name.node.as_str())
            .with_labels(set.labels.iter().map(|l| l.node.0.clone()));
        for entry in &set.entries {
            match lower_entry(&entry.node) {
                Ok(bundle) => snapshot.insert(entry.node.id.node.as_str(), bundle),
                Err(mut errs) => errors.append(&mut errs),
            }
        }
        snapshots.push(snapshot);
    }
    if errors.is_empty() {
        Ok(snapshots)
    } else {
        Err(errors)
    }
}

fn lower_entry(entry: &EntryDecl) -> Result<ConstraintBundle, Vec<ParseError>> {
    let kind = match &entry.role {
        Some(role) => lower_role(&role.node, &role.span).map_err(|e| vec![e])?,
        None => NodeKind::Plain,
    };
    let mut bundle = ConstraintBundle::new(kind);
    let errors: Vec<ParseError> = entry
        .properties
        .iter()
        .filter_map(|prop| apply_property(&mut bundle, &prop.node).err())
        .collect();
    if errors.is_empty() {
        Ok(bundle)
    } else {
        Err(errors)
    }
}

fn lower_role(role: &RoleDecl, span: &Span) -> Result<NodeKind, ParseError> {
    let arg = role.arg.as_ref().map(|a| a.node.as_str());
    match role.kind.node.as_str() {
        "guideline" => Ok(NodeKind::Guideline(Guideline {
            orientation: match arg {
                Some("horizontal") => Orientation::Horizontal,
                _ => Orientation::Vertical,
            },
            position: GuidelinePosition::Begin(0.0),
            use_rtl: false,
            reactive: None,
        })),
        "barrier" => {
            let side = arg.and_then(BarrierSide::from_name).ok_or_else(|| {
                ParseError::semantic(
                    span.clone(),
                    "a barrier needs a side: left, right, top, bottom, start or end",
                )
            })?;
            Ok(NodeKind::Barrier(Barrier {
                side,
                allows_gone: true,
                margin: 0.0,
                refs: Vec::new(),
            }))
        }
        "group" => Ok(NodeKind::Group(Group::default())),
        "layer" => Ok(NodeKind::Layer(Layer::default())),
        "placeholder" => Ok(NodeKind::Placeholder(Placeholder::default())),
        other => Err(ParseError::semantic(
            role.kind.span.clone(),
            format!("unknown helper role '{}'", other),
        )),
    }
}

fn number(value: &Spanned<Value>, key: &str) -> Result<f64, ParseError> {
    match value.node {
        Value::Number(n) => Ok(n),
        ref other => Err(mismatch(value, key, "a number", other)),
    }
}

fn flag(value: &Spanned<Value>, key: &str) -> Result<bool, ParseError> {
    match value.node {
        Value::Bool(b) => Ok(b),
        ref other => Err(mismatch(value, key, "true or false", other)),
    }
}

/// Words and strings are interchangeable for textual values
fn text<'v>(value: &'v Spanned<Value>, key: &str) -> Result<&'v str, ParseError> {
    match &value.node {
        Value::Word(s) | Value::String(s) => Ok(s.as_str()),
        other => Err(mismatch(value, key, "a word or string", other)),
    }
}

fn mismatch(value: &Spanned<Value>, key: &str, expected: &str, found: &Value) -> ParseError {
    ParseError::semantic(
        value.span.clone(),
        format!("'{}' expects {}, found {}", key, expected, found.describe()),
    )
}

fn axis_prefix(key: &str) -> Option<(Axis, &str)> {
    if let Some(rest) = key.strip_prefix("width") {
        Some((Axis::Horizontal, rest))
    } else if let Some(rest) = key.strip_prefix("height") {
        Some((Axis::Vertical, rest))
    } else if let Some(rest) = key.strip_prefix("horizontal_") {
        Some((Axis::Horizontal, rest))
    } else if let Some(rest) = key.strip_prefix("vertical_") {
        Some((Axis::Vertical, rest))
    } else {
        None
    }
}

fn size_spec(value: &Spanned<Value>, key: &str) -> Result<SizeSpec, ParseError> {
    match &value.node {
        // A literal zero is the conventional spelling of match-constraint
        Value::Number(n) if *n == 0.0 => Ok(SizeSpec::MatchConstraint),
        Value::Number(n) => Ok(SizeSpec::Fixed(*n)),
        _ => Ok(match text(value, key)? {
            "match_parent" | "fill" => SizeSpec::MatchParent,
            "match_constraint" => SizeSpec::MatchConstraint,
            _ => SizeSpec::WrapContent,
        }),
    }
}

fn custom_value(value: &Spanned<Value>, key: &str) -> Result<CustomValue, ParseError> {
    match &value.node {
        Value::Number(n) => Ok(CustomValue::Number(*n)),
        Value::Bool(b) => Ok(CustomValue::Flag(*b)),
        Value::Word(s) | Value::String(s) => Ok(CustomValue::Text(s.clone())),
        other => Err(mismatch(value, key, "a scalar", other)),
    }
}

fn anchor_target(source: AnchorKind, anchor: &AnchorValue) -> Result<AnchorTarget, ParseError> {
    let target_kind = AnchorKind::from_name(anchor.anchor.node.as_str()).ok_or_else(|| {
        ParseError::semantic(
            anchor.anchor.span.clone(),
            format!("unknown anchor '{}'", anchor.anchor.node),
        )
    })?;
    if !source.is_compatible_with(target_kind) {
        return Err(ParseError::semantic(
            anchor.target.span.start..anchor.anchor.span.end,
            format!("cannot connect {} to {}: incompatible anchor kinds", source, target_kind),
        ));
    }
    Ok(AnchorTarget::new(anchor.target.node.as_str(), target_kind, anchor.margin)
        .with_gone_margin(anchor.gone_margin.unwrap_or(0.0)))
}

/// Properties only meaningful for a helper role
///
/// Returns `Ok(false)` when the key is not one of the role's properties.
fn apply_helper_property(kind: &mut NodeKind, prop: &Property) -> Result<bool, ParseError> {
    let key = prop.key.node.as_str();
    let value = &prop.value;
    match kind {
        NodeKind::Guideline(guideline) => match key {
            "begin" => guideline.position = GuidelinePosition::Begin(number(value, key)?),
            "end" if !matches!(value.node, Value::Anchor(_)) => {
                guideline.position = GuidelinePosition::End(number(value, key)?)
            }
            "percent" => guideline.position = GuidelinePosition::Percent(number(value, key)?),
            "use_rtl" => guideline.use_rtl = flag(value, key)?,
            "reactive" => guideline.reactive = Some(text(value, key)?.to_string()),
            _ => return Ok(false),
        },
        NodeKind::Barrier(barrier) => match key {
            "refs" => barrier.refs = split_refs(text(value, key)?),
            "margin" => barrier.margin = number(value, key)?,
            "allows_gone" => barrier.allows_gone = flag(value, key)?,
            _ => return Ok(false),
        },
        NodeKind::Group(group) => match key {
            "refs" => group.refs = split_refs(text(value, key)?),
            _ => return Ok(false),
        },
        NodeKind::Layer(layer) => match key {
            "refs" => layer.refs = split_refs(text(value, key)?),
            "padding" => layer.padding = number(value, key)?,
            _ => return Ok(false),
        },
        NodeKind::Placeholder(placeholder) => match key {
            "content" => placeholder.content = Some(text(value, key)?.to_string()),
            _ => return Ok(false),
        },
        NodeKind::Plain => return Ok(false),
    }
    Ok(true)
}

fn split_refs(refs: &str) -> Vec<String> {
    refs.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

fn apply_property(bundle: &mut ConstraintBundle, prop: &Property) -> Result<(), ParseError> {
    if apply_helper_property(&mut bundle.kind, prop)? {
        return Ok(());
    }

    let key = prop.key.node.as_str();
    let value = &prop.value;

    if let Some(anchor) = AnchorKind::from_name(key) {
        return match &value.node {
            Value::Anchor(target) => {
                bundle.connect(anchor, anchor_target(anchor, target)?);
                Ok(())
            }
            other => Err(mismatch(value, key, "an anchor reference", other)),
        };
    }

    if let Some(name) = key.strip_prefix("custom.") {
        bundle.custom.insert(name.to_string(), custom_value(value, key)?);
        return Ok(());
    }

    match key {
        "ratio" => {
            bundle.dimension_ratio = Some(match &value.node {
                Value::Number(n) => n.to_string(),
                _ => text(value, key)?.to_string(),
            });
            return Ok(());
        }
        "circle_angle" => bundle.circle_angle = number(value, key)?,
        "visibility" => bundle.visibility = Visibility::from_name(text(value, key)?),
        "alpha" => bundle.transform.alpha = number(value, key)?,
        "elevation" => bundle.transform.elevation = number(value, key)?,
        "rotation" => bundle.transform.rotation = number(value, key)?,
        "scale_x" => bundle.transform.scale_x = number(value, key)?,
        "scale_y" => bundle.transform.scale_y = number(value, key)?,
        "translation_x" => bundle.transform.translation_x = number(value, key)?,
        "translation_y" => bundle.transform.translation_y = number(value, key)?,
        "tag" => bundle.tag = Some(text(value, key)?.to_string()),
        _ => match axis_prefix(key) {
            Some((axis, "")) => bundle.size[axis].size = size_spec(value, key)?,
            Some((axis, "_default")) => {
                bundle.size[axis].default = MatchDefault::from_name(text(value, key)?)
            }
            Some((axis, "_percent")) => bundle.size[axis].percent = Some(number(value, key)?),
            Some((axis, "_min")) => bundle.size[axis].min = number(value, key)?,
            Some((axis, "_max")) => bundle.size[axis].max = number(value, key)?,
            Some((axis, "_constrained")) => bundle.size[axis].constrained = flag(value, key)?,
            Some((axis, "bias")) => bundle.bias[axis] = number(value, key)?,
            Some((axis, "chain")) => bundle.chain_style[axis] = ChainStyle::from_name(text(value, key)?),
            Some((axis, "weight")) => bundle.weight[axis] = Some(number(value, key)?),
            _ => {
                warn!(key, span = ?prop.key.span, "ignoring unknown property");
            }
        },
    }
    Ok(())
}
