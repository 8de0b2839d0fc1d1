//! Named, labelled constraint sets

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::layout::error::{ConfigurationError, ResolutionWarning};

use super::delta::Delta;
use super::snapshot::ConstraintSnapshot;

/// Holds every known constraint set, each name possibly with several variants
///
/// Snapshots are shared as `Arc`s and never mutated in place while shared:
/// replaying a delta gives the store a fresh copy and leaves handles held
/// elsewhere untouched.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSetStore {
    sets: BTreeMap<String, Vec<Arc<ConstraintSnapshot>>>,
}

impl ConstraintSetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variant under the snapshot's name
    pub fn insert(&mut self, snapshot: ConstraintSnapshot) -> Arc<ConstraintSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.sets
            .entry(snapshot.name.clone())
            .or_default()
            .push(Arc::clone(&snapshot));
        snapshot
    }

    /// The first variant registered under `name`
    pub fn get(&self, name: &str) -> Option<Arc<ConstraintSnapshot>> {
        self.sets.get(name).and_then(|v| v.first()).cloned()
    }

    /// The first variant under `name` carrying every required label
    pub fn select<S: AsRef<str>>(&self, name: &str, labels: &[S]) -> Option<Arc<ConstraintSnapshot>> {
        self.sets
            .get(name)?
            .iter()
            .find(|snapshot| snapshot.labels_match(labels))
            .cloned()
    }

    pub fn variants(&self, name: &str) -> &[Arc<ConstraintSnapshot>] {
        self.sets.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Vec<Arc<ConstraintSnapshot>> {
        self.sets.remove(name).unwrap_or_default()
    }

    /// Replay a delta onto every variant stored under `name`
    pub fn apply_delta(&mut self, name: &str, delta: &Delta) -> Result<Vec<ResolutionWarning>, ConfigurationError> {
        let mut warnings = Vec::new();
        let Some(variants) = self.sets.get_mut(name) else {
            warnings.push(ResolutionWarning::UnknownIdentifier { id: name.to_string() }.emit());
            return Ok(warnings);
        };
        for variant in variants.iter_mut() {
            warnings.extend(delta.apply(Arc::make_mut(variant))?);
        }
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint_set::{ConstraintBundle, DeltaField};
    use crate::graph::{Axis, SizeSpec};

    fn store() -> ConstraintSetStore {
        let mut store = ConstraintSetStore::new();
        let mut portrait = ConstraintSnapshot::new("main").with_labels(["portrait"]);
        portrait.insert("title", ConstraintBundle::default());
        let mut landscape = ConstraintSnapshot::new("main").with_labels(["landscape", "large"]);
        landscape.insert("title", ConstraintBundle::default());
        store.insert(portrait);
        store.insert(landscape);
        store
    }

    #[test]
    fn test_select_by_labels() {
        let store = store();
        assert!(store.select("main", &["landscape"]).unwrap().labels.contains("large"));
        assert!(store.select("main", &["portrait"]).unwrap().labels.contains("portrait"));
        assert!(store.select("main", &["dark"]).is_none());
        assert!(store.select("other", &["portrait"]).is_none());
        assert_eq!(store.variants("main").len(), 2);
    }

    #[test]
    fn test_delta_copies_on_write() {
        let mut store = store();
        let held = store.get("main").unwrap();
        let delta = Delta::for_id("title").with(DeltaField::Size(Axis::Horizontal, SizeSpec::Fixed(50.0)));
        assert!(store.apply_delta("main", &delta).unwrap().is_empty());

        assert_eq!(held.get("title").unwrap().size.horizontal.size, SizeSpec::WrapContent);
        for variant in store.variants("main") {
            assert_eq!(variant.get("title").unwrap().size.horizontal.size, SizeSpec::Fixed(50.0));
        }
    }

    #[test]
    fn test_unknown_set_warns() {
        let mut store = store();
        let warnings = store.apply_delta("missing", &Delta::for_id("title")).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(store.remove("main").len(), 2);
        assert_eq!(store.names().count(), 0);
    }
}
