use std::fmt;
use thiserror::Error;

/// Source location for error reporting. Separate from [`pyforge_ir::SourceLocation`]
/// so this crate's error type doesn't force every caller to depend on the IR's
/// serde shape just to report a `file:line:column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

impl From<pyforge_ir::SourceLocation> for SourceSpan {
    fn from(loc: pyforge_ir::SourceLocation) -> Self {
        SourceSpan {
            file: String::new(),
            line: loc.line,
            column: loc.column,
        }
    }
}

/// The closed set of failure categories a translation can produce (
/// "Error taxonomy"). Kept as a plain enum rather than one-struct-per-kind so
/// callers can match exhaustively without reaching into `anyhow::Error`.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("Python parse error")]
    ParseError,

    #[error("unsupported Python construct")]
    UnsupportedConstruct(String),

    #[error("type inference error")]
    TypeInferenceError(String),

    #[error("undefined reference")]
    UndefinedReference(String),

    #[error("invalid C identifier")]
    InvalidIdentifier(String),

    #[error("bounds violation")]
    BoundsViolation(String),

    #[error("code generation error")]
    CodeGenerationError(String),

    #[error("verification failed")]
    VerificationError(String),

    #[error("internal error")]
    InternalError(String),
}

/// A [`ErrorKind`] plus the location it was raised at and a stack of
/// human-readable context frames, pushed innermost-first by `.with_context`
/// as the error unwinds through nested calls.
#[derive(Debug, Error)]
pub struct TranslateError {
    pub kind: ErrorKind,
    pub location: Option<SourceSpan>,
    pub context: Vec<String>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TranslateError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: None,
            context: Vec::new(),
            source: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<SourceSpan>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// True for the hard-failure kinds that must abort translation
    /// rather than degrade to a diagnostic on the side (undefined references,
    /// parse failures, malformed identifiers).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::ParseError
                | ErrorKind::UndefinedReference(_)
                | ErrorKind::InvalidIdentifier(_)
                | ErrorKind::UnsupportedConstruct(_)
        )
    }
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(loc) = &self.location {
            write!(f, " at {loc}")?;
        }
        if !self.context.is_empty() {
            write!(f, "\n\nContext:")?;
            for (i, ctx) in self.context.iter().enumerate() {
                write!(f, "\n  {}. {}", i + 1, ctx)?;
            }
        }
        Ok(())
    }
}

pub type TranslateResult<T> = Result<T, TranslateError>;

pub trait ResultExt<T> {
    fn with_context(self, ctx: impl Into<String>) -> TranslateResult<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<TranslateError>,
{
    fn with_context(self, ctx: impl Into<String>) -> TranslateResult<T> {
        self.map_err(|e| e.into().with_context(ctx))
    }
}

impl From<anyhow::Error> for TranslateError {
    fn from(err: anyhow::Error) -> Self {
        TranslateError::new(ErrorKind::InternalError(err.to_string()))
    }
}

#[macro_export]
macro_rules! translate_error {
    ($kind:expr) => {
        $crate::error::TranslateError::new($kind)
    };
    ($kind:expr, $($ctx:expr),+) => {{
        let mut err = $crate::error::TranslateError::new($kind);
        $(err = err.with_context($ctx);)+
        err
    }};
}

#[macro_export]
macro_rules! translate_bail {
    ($kind:expr) => {
        return Err($crate::translate_error!($kind))
    };
    ($kind:expr, $($ctx:expr),+) => {
        return Err($crate::translate_error!($kind, $($ctx),+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_reference_is_fatal() {
        let err = TranslateError::new(ErrorKind::UndefinedReference("foo".into()));
        assert!(err.is_fatal());
    }

    #[test]
    fn verification_error_is_not_fatal() {
        let err = TranslateError::new(ErrorKind::VerificationError("could not prove bound".into()));
        assert!(!err.is_fatal());
    }

    #[test]
    fn display_includes_location_and_context() {
        let err = TranslateError::new(ErrorKind::TypeInferenceError("unknown type".into()))
            .with_location(SourceSpan {
                file: "example.py".into(),
                line: 4,
                column: 1,
            })
            .with_context("in function 'add'");
        let rendered = format!("{err}");
        assert!(rendered.contains("example.py:4:1"));
        assert!(rendered.contains("in function 'add'"));
    }

    #[test]
    fn macro_builds_error_with_context() {
        let err = translate_error!(ErrorKind::ParseError, "top level");
        assert_eq!(err.context, vec!["top level".to_string()]);
    }
}
