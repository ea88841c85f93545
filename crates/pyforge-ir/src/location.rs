use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in the original Python source, carried on every TypedIR node so
/// diagnostics and counterexamples can point back at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Used for synthesized nodes (e.g. the temporary a comprehension lowers
    /// into) that have no single source point of their own.
    pub const fn synthetic() -> Self {
        Self { line: 0, column: 0 }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
