//! Constraint Layout - a constraint-resolution and dimension-negotiation engine
//!
//! Nodes declare relationships between their anchors (edges, baselines and
//! circular positions) and how their size should be decided. The engine
//! resolves writing direction, classifies sizing, incorporates helper nodes
//! (barriers, guidelines, groups, layers, placeholders) and negotiates
//! measurements with the host until the solved frames are stable.
//!
//! Constraints can be declared in code through [`AnchorGraph`] or loaded from
//! `.cset` constraint-set files.
//!
//! # Example
//!
//! ```rust
//! use constraint_layout::{resolve, MeasureSpec};
//!
//! let layout = resolve(
//!     r#"set main {
//!         title {
//!             width: 120
//!             height: 40
//!             start: parent.start + 16
//!             top: parent.top + 8
//!         }
//!     }"#,
//!     MeasureSpec::Exactly(320.0),
//!     MeasureSpec::Exactly(200.0),
//! )
//! .unwrap();
//!
//! let title = layout.frame("title").unwrap();
//! assert_eq!((title.x, title.y), (16.0, 8.0));
//! ```

pub mod constraint_set;
pub mod error;
pub mod graph;
pub mod host;
pub mod layout;
pub mod parser;

pub use constraint_set::{ConstraintSetStore, ConstraintSnapshot, Delta, DeltaField};
pub use error::ParseError;
pub use graph::{AnchorGraph, AnchorKind, AnchorRef, NodeId};
pub use host::StaticHost;
pub use layout::{
    BoundingBox, ConfigurationError, ConstraintLayout, LayoutConfig, LayoutDirection, LayoutError,
    LayoutParticipant, MeasureHost, MeasureSpec, MeasureStats, ResolutionWarning, Size,
};

use std::fmt;

use thiserror::Error;

/// Errors that can occur while resolving a constraint-set file
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Error during parsing
    #[error("parse errors: {}", format_parse_errors(.0))]
    Parse(Vec<ParseError>),

    #[error("no constraint set named '{name}' matches labels [{}]", .labels.join(", "))]
    UnknownSet { name: String, labels: Vec<String> },

    #[error("the source declares no constraint sets")]
    Empty,

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Error during layout
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
}

impl From<Vec<ParseError>> for ResolveError {
    fn from(errors: Vec<ParseError>) -> Self {
        ResolveError::Parse(errors)
    }
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Configuration for resolving a constraint-set file
#[derive(Debug, Clone)]
pub struct ResolveConfig {
    /// Engine configuration
    pub layout: LayoutConfig,
    pub width: MeasureSpec,
    pub height: MeasureSpec,
    pub direction: LayoutDirection,
    /// Set to apply; the first declared set when absent
    pub set: Option<String>,
    /// Labels the chosen variant must carry
    pub labels: Vec<String>,
    /// Debug mode: also report helper frames
    pub debug: bool,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            width: MeasureSpec::Unspecified,
            height: MeasureSpec::Unspecified,
            direction: LayoutDirection::LeftToRight,
            set: None,
            labels: Vec::new(),
            debug: false,
        }
    }
}

impl ResolveConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, config: LayoutConfig) -> Self {
        self.layout = config;
        self
    }

    /// Set the container constraints
    pub fn with_container(mut self, width: MeasureSpec, height: MeasureSpec) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_direction(mut self, direction: LayoutDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Select a set by name and required labels
    pub fn with_set(mut self, name: impl Into<String>, labels: Vec<String>) -> Self {
        self.set = Some(name.into());
        self.labels = labels;
        self
    }

    /// Enable or disable debug mode
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Geometry produced by resolving a constraint-set file
#[derive(Debug, Clone)]
pub struct ResolvedLayout {
    /// Name of the applied set
    pub set: String,
    pub size: Size,
    /// Placed nodes in attachment order
    pub frames: Vec<(String, BoundingBox)>,
    pub warnings: Vec<ResolutionWarning>,
    pub stats: MeasureStats,
}

impl ResolvedLayout {
    pub fn frame(&self, name: &str) -> Option<BoundingBox> {
        self.frames
            .iter()
            .find(|(id, _)| id == name)
            .map(|(_, frame)| *frame)
    }
}

impl fmt::Display for ResolvedLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {:.1}x{:.1}",
            self.set, self.size.width, self.size.height
        )?;
        for (id, frame) in &self.frames {
            writeln!(f, "  {} {}", id, frame)?;
        }
        Ok(())
    }
}

/// Load every constraint set declared in `source` into a store
pub fn load(source: &str) -> Result<ConstraintSetStore, Vec<ParseError>> {
    let mut store = ConstraintSetStore::new();
    for snapshot in parser::load(source)? {
        store.insert(snapshot);
    }
    Ok(store)
}

/// Resolve the first set of `source` inside the given container
pub fn resolve(source: &str, width: MeasureSpec, height: MeasureSpec) -> Result<ResolvedLayout, ResolveError> {
    resolve_with_config(source, ResolveConfig::new().with_container(width, height))
}

/// Resolve a constraint-set file with custom configuration
///
/// Every plain entry of the chosen set becomes a node measured by a
/// [`StaticHost`]; helper entries are synthesized when the set is applied.
pub fn resolve_with_config(source: &str, config: ResolveConfig) -> Result<ResolvedLayout, ResolveError> {
    let sets = parser::load(source)?;
    let name = match &config.set {
        Some(name) => name.clone(),
        None => sets.first().map(|s| s.name.clone()).ok_or(ResolveError::Empty)?,
    };
    let mut store = ConstraintSetStore::new();
    for snapshot in sets {
        store.insert(snapshot);
    }
    let snapshot = store
        .select(&name, config.labels.as_slice())
        .ok_or_else(|| ResolveError::UnknownSet {
            name: name.clone(),
            labels: config.labels.clone(),
        })?;

    let mut layout = ConstraintLayout::new(config.layout.clone());
    layout.set_direction(config.direction);
    for (id, bundle) in snapshot.entries() {
        if !bundle.kind.is_helper() {
            layout.on_attach(Some(id))?;
        }
    }
    let report = layout.apply_constraint_set(&snapshot, true)?;

    let mut host = StaticHost::new();
    let size = layout.on_measure(config.width, config.height, &mut host)?;
    layout.on_layout_complete(&mut host);
    layout.pre_draw();

    let mut frames = host.into_placed();
    if config.debug {
        frames.extend(
            layout
                .graph()
                .helpers()
                .map(|helper| (helper.display_name(), helper.frame())),
        );
    }

    let mut warnings = report.warnings;
    warnings.extend(layout.warnings().iter().cloned());
    Ok(ResolvedLayout {
        set: name,
        size,
        frames,
        warnings,
        stats: layout.stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_simple_set() {
        let layout = resolve(
            "set main { a { width: 50 height: 20 left: parent.left + 10 top: parent.top + 5 } }",
            MeasureSpec::Exactly(200.0),
            MeasureSpec::Exactly(100.0),
        )
        .unwrap();
        assert_eq!(layout.set, "main");
        assert_eq!(layout.size, Size::new(200.0, 100.0));
        assert_eq!(layout.frame("a"), Some(BoundingBox::new(10.0, 5.0, 50.0, 20.0)));
    }

    #[test]
    fn test_resolve_selects_labelled_variant() {
        let source = r#"
            set main [portrait] { a { width: 10 height: 10 } }
            set main [landscape] { a { width: 30 height: 10 } }
        "#;
        let config = ResolveConfig::new()
            .with_container(MeasureSpec::Exactly(100.0), MeasureSpec::Exactly(100.0))
            .with_set("main", vec!["landscape".to_string()]);
        let layout = resolve_with_config(source, config).unwrap();
        assert_eq!(layout.frame("a").unwrap().width, 30.0);
    }

    #[test]
    fn test_resolve_unknown_set() {
        let config = ResolveConfig::new().with_set("other", Vec::new());
        let err = resolve_with_config("set main { }", config).unwrap_err();
        assert!(matches!(err, ResolveError::UnknownSet { .. }));
    }

    #[test]
    fn test_resolve_empty_source() {
        assert!(matches!(
            resolve("", MeasureSpec::Unspecified, MeasureSpec::Unspecified),
            Err(ResolveError::Empty)
        ));
    }

    #[test]
    fn test_resolve_parse_error() {
        let result = resolve("set main { a { width 10 } }", MeasureSpec::Unspecified, MeasureSpec::Unspecified);
        assert!(matches!(result, Err(ResolveError::Parse(_))));
    }

    #[test]
    fn test_debug_reports_helpers() {
        let source = r#"set main {
            a { width: 40 height: 10 }
            guide: guideline(vertical) { begin: 25 }
        }"#;
        let config = ResolveConfig::new()
            .with_container(MeasureSpec::Exactly(100.0), MeasureSpec::Exactly(100.0))
            .with_debug(true);
        let layout = resolve_with_config(source, config).unwrap();
        assert_eq!(layout.frame("guide").map(|f| f.x), Some(25.0));
    }
}
