//! A measurement host driven by declared custom attributes

use crate::graph::{CustomValue, Node};
use crate::layout::{BoundingBox, MeasureHost, MeasureSpec, Measurement};

/// Custom attribute holding a node's intrinsic width
pub const CONTENT_WIDTH: &str = "content_width";
/// Custom attribute holding a node's intrinsic height
pub const CONTENT_HEIGHT: &str = "content_height";
/// Custom attribute holding a node's baseline offset
pub const BASELINE: &str = "baseline";

/// Host whose nodes report fixed intrinsic sizes
///
/// Nodes without `content_width`/`content_height` attributes measure as
/// empty. Placements are recorded in order.
#[derive(Debug, Default)]
pub struct StaticHost {
    placed: Vec<(String, BoundingBox)>,
}

impl StaticHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn placed(&self) -> &[(String, BoundingBox)] {
        &self.placed
    }

    pub fn into_placed(self) -> Vec<(String, BoundingBox)> {
        self.placed
    }
}

fn attribute(node: &Node, key: &str) -> Option<f64> {
    node.custom.get(key).and_then(CustomValue::as_number)
}

impl MeasureHost for StaticHost {
    fn measure(&mut self, node: &Node, width: MeasureSpec, height: MeasureSpec) -> Measurement {
        let content_width = attribute(node, CONTENT_WIDTH).unwrap_or(0.0);
        let content_height = attribute(node, CONTENT_HEIGHT).unwrap_or(0.0);
        let measurement = Measurement::new(width.resolve(content_width), height.resolve(content_height));
        match attribute(node, BASELINE) {
            Some(baseline) => measurement.with_baseline(baseline),
            None => measurement,
        }
    }

    fn place(&mut self, node: &Node, frame: BoundingBox) {
        self.placed.push((node.display_name(), frame));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AnchorGraph;

    #[test]
    fn test_measures_from_attributes() {
        let mut graph = AnchorGraph::new();
        let id = graph.add_node(Some("label")).unwrap();
        let node = graph.node_mut(id).unwrap();
        node.custom.insert(CONTENT_WIDTH.into(), CustomValue::Number(120.0));
        node.custom.insert(CONTENT_HEIGHT.into(), CustomValue::Number(20.0));
        node.custom.insert(BASELINE.into(), CustomValue::Number(15.0));

        let mut host = StaticHost::new();
        let node = graph.node(id).unwrap();
        let m = host.measure(node, MeasureSpec::AtMost(100.0), MeasureSpec::Unspecified);
        assert_eq!(m, Measurement::new(100.0, 20.0).with_baseline(15.0));

        let m = host.measure(node, MeasureSpec::Exactly(40.0), MeasureSpec::Exactly(40.0));
        assert_eq!(m.size().width, 40.0);
    }
}
