//! Explicit pass context: configuration and shared named values

use std::collections::HashMap;

use super::config::LayoutConfig;

/// Named values shared between layouts, e.g. to drive reactive guidelines
#[derive(Debug, Clone, Default)]
pub struct SharedValues {
    values: HashMap<String, f64>,
    revision: u64,
}

impl SharedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Set a value; returns true when it changed
    pub fn set(&mut self, key: impl Into<String>, value: f64) -> bool {
        let previous = self.values.insert(key.into(), value);
        let changed = previous != Some(value);
        if changed {
            self.revision += 1;
        }
        changed
    }

    pub fn remove(&mut self, key: &str) -> Option<f64> {
        let removed = self.values.remove(key);
        if removed.is_some() {
            self.revision += 1;
        }
        removed
    }

    /// Incremented on every change, so observers can tell whether to relayout
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Everything a resolution pass reads besides the graph itself
#[derive(Debug, Clone, Default)]
pub struct LayoutContext {
    pub config: LayoutConfig,
    pub shared: SharedValues,
}

impl LayoutContext {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            shared: SharedValues::new(),
        }
    }
}
