use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A value written into a node's annotation bag by an analyzer/optimizer
/// pass, e.g. `BoundsChecker` tagging a subscript `"bounds_safety" ->
/// Text("safe")`. Kept as a small closed value set rather than
/// `serde_json::Value` so passes can't smuggle arbitrary structured data
/// through a channel meant for scalar findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnnotationValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Per-node metadata bag (, Typed IR field (d)). Insertion-ordered
/// so diagnostic rendering is deterministic ( determinism property).
pub type AnnotationBag = IndexMap<String, AnnotationValue>;

/// Convenience constructor so call sites read like `annotate! {"safety" =>
/// "safe"}` without pulling in a macro.
pub fn bag() -> AnnotationBag {
    IndexMap::new()
}
