//! Decorator and pragma-comment parsing for the pyforge translator.
//!
//! The supported Python subset carries two families of out-of-band hints:
//!
//! - formal annotations, written with the `@requires`/`@ensures`/`@invariant`
//!   decorator convention consumed by `CorrectnessProver`;
//! - `# pyforge:` pragma comments that steer bounds-checking, optimization
//!   level, and HPCL strategy for a single function.
//!
//! Both are parsed here, ahead of full AST lowering, because they live in
//! syntax the Python grammar itself does not model (decorator call argument
//! text, comment pragmas) and are most naturally extracted with regexes
//! over the function's leading lines.

#![allow(clippy::missing_errors_doc)]

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("invalid annotation syntax: {0}")]
    InvalidSyntax(String),
    #[error("unknown pragma key: {0}")]
    UnknownKey(String),
    #[error("invalid value for key {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Depth knob for `Analyzers`, one of the two closed enums the pipeline
/// `Options` exposes verbatim ( `analysis_level`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AnalysisLevel {
    #[default]
    Basic,
    Comprehensive,
}

/// `Optimizers` aggressiveness knob ( `optimization_level`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum OptimizationLevel {
    None,
    #[default]
    Basic,
    Moderate,
    Aggressive,
}

/// Target architecture for `VectorizationDetector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TargetArch {
    #[default]
    X86_64,
    Arm,
}

/// Per-function bounds-checking strategy. `Explicit` always emits the HPCL
/// bounds-checked accessor; `Elided` is only legal once `BoundsProver`
/// discharges the obligation; `Disabled` is a user escape
/// hatch that still records the obligation as an unchecked warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BoundsChecking {
    #[default]
    Explicit,
    Elided,
    Disabled,
}

/// A single `@requires`/`@ensures`/`@invariant` clause. The condition is
/// kept as Python source text: this crate only isolates it from the
/// decorator syntax. Turning it into a formula is `pyforge-verify`'s job,
/// once the frontend has a typed scope to resolve names against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormalClause {
    pub kind: ClauseKind,
    pub condition: String,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClauseKind {
    Requires,
    Ensures,
    Invariant,
}

/// The full set of formal obligations attached to one function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormalSpec {
    pub requires: Vec<FormalClause>,
    pub ensures: Vec<FormalClause>,
    pub invariants: Vec<FormalClause>,
}

impl FormalSpec {
    pub fn is_empty(&self) -> bool {
        self.requires.is_empty() && self.ensures.is_empty() && self.invariants.is_empty()
    }
}

/// A free-form optimization hint mined from a `# pyforge: hint=...` pragma,
/// e.g. `unroll`, `no-vectorize`, `memoize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceHint {
    ForceUnroll,
    NoVectorize,
    ForceMemoize,
    Custom(String),
}

/// The full annotation bag for one function, combining formal obligations
/// with codegen strategy pragmas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodegenAnnotations {
    pub bounds_checking: BoundsChecking,
    pub optimization_level: OptimizationLevel,
    pub verify_bounds: bool,
    pub performance_hints: Vec<PerformanceHint>,
    pub formal_spec: FormalSpec,
    pub custom_attributes: Vec<String>,
}

fn decorator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*@(requires|ensures|invariant)\s*\(\s*(.*)\)\s*$")
            .expect("static regex is valid")
    })
}

fn pragma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*#\s*pyforge:\s*([A-Za-z_][A-Za-z0-9_-]*)\s*=\s*(.+?)\s*$")
            .expect("static regex is valid")
    })
}

/// Strip one layer of matching quotes from a decorator argument, e.g.
/// `"n >= 0"` -> `n >= 0`. Unquoted arguments (bare boolean expressions)
/// pass through unchanged.
fn unquote(raw: &str) -> String {
    let trimmed = raw.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') && bytes[0] == bytes[bytes.len() - 1]
    {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Scans the lines immediately preceding a `def` statement (the decorator
/// block) plus any `# pyforge:` pragma comments inside the function's first
/// line, and produces the combined annotation bag.
///
/// `leading_lines` is the decorator block as it appears in source, in
/// order, 1-indexed against `first_line`.
pub fn parse_function_annotations(
    leading_lines: &[&str],
    first_line: usize,
) -> Result<CodegenAnnotations, AnnotationError> {
    let mut annotations = CodegenAnnotations::default();
    for (offset, raw_line) in leading_lines.iter().enumerate() {
        let line_no = first_line + offset;
        if let Some(caps) = decorator_re().captures(raw_line) {
            let kind = match &caps[1] {
                "requires" => ClauseKind::Requires,
                "ensures" => ClauseKind::Ensures,
                "invariant" => ClauseKind::Invariant,
                other => return Err(AnnotationError::UnknownKey(other.to_string())),
            };
            let condition = unquote(&caps[2]);
            if condition.is_empty() {
                return Err(AnnotationError::InvalidSyntax(raw_line.to_string()));
            }
            let clause = FormalClause {
                kind,
                condition,
                line: line_no,
            };
            match kind {
                ClauseKind::Requires => annotations.formal_spec.requires.push(clause),
                ClauseKind::Ensures => annotations.formal_spec.ensures.push(clause),
                ClauseKind::Invariant => annotations.formal_spec.invariants.push(clause),
            }
            continue;
        }
        if let Some(caps) = pragma_re().captures(raw_line) {
            apply_pragma(&mut annotations, &caps[1], &caps[2])?;
        }
    }
    Ok(annotations)
}

fn apply_pragma(
    annotations: &mut CodegenAnnotations,
    key: &str,
    value: &str,
) -> Result<(), AnnotationError> {
    match key {
        "bounds" => {
            annotations.bounds_checking = match value {
                "explicit" => BoundsChecking::Explicit,
                "elided" => BoundsChecking::Elided,
                "disabled" => BoundsChecking::Disabled,
                other => {
                    return Err(AnnotationError::InvalidValue {
                        key: key.to_string(),
                        value: other.to_string(),
                    })
                }
            };
        }
        "optimize" => {
            annotations.optimization_level = match value {
                "none" => OptimizationLevel::None,
                "basic" => OptimizationLevel::Basic,
                "moderate" => OptimizationLevel::Moderate,
                "aggressive" => OptimizationLevel::Aggressive,
                other => {
                    return Err(AnnotationError::InvalidValue {
                        key: key.to_string(),
                        value: other.to_string(),
                    })
                }
            };
        }
        "verify_bounds" => {
            annotations.verify_bounds = match value {
                "true" => true,
                "false" => false,
                other => {
                    return Err(AnnotationError::InvalidValue {
                        key: key.to_string(),
                        value: other.to_string(),
                    })
                }
            };
        }
        "hint" => {
            annotations.performance_hints.push(match value {
                "unroll" => PerformanceHint::ForceUnroll,
                "no-vectorize" => PerformanceHint::NoVectorize,
                "memoize" => PerformanceHint::ForceMemoize,
                other => PerformanceHint::Custom(other.to_string()),
            });
        }
        other => {
            annotations.custom_attributes.push(format!("{other}={value}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_requires_and_ensures() {
        let lines = [
            "@requires(\"n >= 0\")",
            "@ensures(\"result >= 1\")",
        ];
        let anns = parse_function_annotations(&lines, 10).unwrap();
        assert_eq!(anns.formal_spec.requires.len(), 1);
        assert_eq!(anns.formal_spec.requires[0].condition, "n >= 0");
        assert_eq!(anns.formal_spec.requires[0].line, 10);
        assert_eq!(anns.formal_spec.ensures[0].condition, "result >= 1");
    }

    #[test]
    fn parses_bare_invariant_without_quotes() {
        let lines = ["@invariant(i <= n)"];
        let anns = parse_function_annotations(&lines, 1).unwrap();
        assert_eq!(anns.formal_spec.invariants[0].condition, "i <= n");
    }

    #[test]
    fn parses_bounds_pragma() {
        let lines = ["# pyforge: bounds=elided"];
        let anns = parse_function_annotations(&lines, 1).unwrap();
        assert_eq!(anns.bounds_checking, BoundsChecking::Elided);
    }

    #[test]
    fn rejects_unknown_bounds_value() {
        let lines = ["# pyforge: bounds=sometimes"];
        let err = parse_function_annotations(&lines, 1).unwrap_err();
        assert!(matches!(err, AnnotationError::InvalidValue { .. }));
    }

    #[test]
    fn unknown_pragma_key_becomes_custom_attribute() {
        let lines = ["# pyforge: target=embedded"];
        let anns = parse_function_annotations(&lines, 1).unwrap();
        assert_eq!(anns.custom_attributes, vec!["target=embedded".to_string()]);
    }

    #[test]
    fn empty_decorator_condition_is_a_syntax_error() {
        let lines = ["@requires()"];
        let err = parse_function_annotations(&lines, 1).unwrap_err();
        assert!(matches!(err, AnnotationError::InvalidSyntax(_)));
    }

    #[test]
    fn default_annotations_are_explicit_bounds_basic_optimization() {
        let anns = CodegenAnnotations::default();
        assert_eq!(anns.bounds_checking, BoundsChecking::Explicit);
        assert_eq!(anns.optimization_level, OptimizationLevel::Basic);
        assert!(!anns.verify_bounds);
        assert!(anns.formal_spec.is_empty());
    }
}
