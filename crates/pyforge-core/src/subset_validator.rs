//! Checks a [`TypedModule`] against the supported Python subset after type
//! inference has run. Split from
//! [`crate::frontend`] because several checks need resolved types (e.g.
//! bounds-check elision eligibility needs to know an index expression is
//! integral) and some need whole-function context (recursion detection for
//! [`FunctionProperties::is_recursive`]).

use crate::error::{ErrorKind, TranslateError};
use pyforge_ir::{AssignTarget, Decl, ExprKind, FunctionDecl, SourceLocation, Stmt, TypedExpr, TypedModule};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Builtins that have a static, non-generator replacement under the
/// supported subset but still require a rewrite pass before they reach the
/// emitter ( tier `SUPPORTED_WITH_REWRITE`).
const REWRITE_BUILTINS: &[&str] = &[];

/// Builtins that inspect or mutate program structure at runtime; C has no
/// runtime reflection to lower them to, but a caller can still choose to
/// keep going and patch the result by hand ( tier
/// `UNSUPPORTED_STATIC`).
const UNSUPPORTED_STATIC_BUILTINS: &[&str] =
    &["setattr", "getattr", "delattr", "globals", "locals", "vars", "__import__", "hasattr"];

/// Builtins whose semantics are irreducibly dynamic (arbitrary code as
/// data); no rewrite makes these translatable ( tier
/// `UNSUPPORTED_DYNAMIC`).
const UNSUPPORTED_DYNAMIC_BUILTINS: &[&str] = &["exec", "eval"];

/// One of the four subset-feature tiers a construct can fall into (spec
/// §4.2). Ordered worst-first so `Ord`-style "most severe wins" reasoning
/// reads naturally if this is ever compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureTier {
    Supported,
    SupportedWithRewrite,
    UnsupportedStatic,
    UnsupportedDynamic,
}

impl FeatureTier {
    fn is_unsupported(self) -> bool {
        matches!(self, FeatureTier::UnsupportedStatic | FeatureTier::UnsupportedDynamic)
    }
}

/// One classified occurrence of a feature, recorded at the point the
/// validator's tree walk encounters it.
#[derive(Debug, Clone)]
pub struct FeatureOccurrence {
    pub feature: String,
    pub tier: FeatureTier,
    pub location: SourceLocation,
}

/// The full result of walking a module: every classified feature
/// occurrence, in visitation order. Replaces a bare pass/fail result so a
/// caller can decide whether `SUPPORTED_WITH_REWRITE`/`UNSUPPORTED_*`
/// occurrences are acceptable for its use case.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub occurrences: Vec<FeatureOccurrence>,
}

impl ValidationReport {
    fn push(&mut self, feature: &str, tier: FeatureTier, location: SourceLocation) {
        self.occurrences.push(FeatureOccurrence { feature: feature.to_string(), tier, location });
    }

    pub fn count(&self, tier: FeatureTier) -> usize {
        self.occurrences.iter().filter(|o| o.tier == tier).count()
    }

    pub fn has_unsupported(&self) -> bool {
        self.occurrences.iter().any(|o| o.tier.is_unsupported())
    }

    pub fn summary(&self) -> String {
        format!(
            "{} supported-with-rewrite, {} unsupported-static, {} unsupported-dynamic",
            self.count(FeatureTier::SupportedWithRewrite),
            self.count(FeatureTier::UnsupportedStatic),
            self.count(FeatureTier::UnsupportedDynamic),
        )
    }
}

impl PartialEq for FeatureOccurrence {
    fn eq(&self, other: &Self) -> bool {
        self.feature == other.feature && self.tier == other.tier
    }
}

/// The 37 reserved words of C99/C11 that a translated identifier must never
/// collide with, since HPCL-generated names and user identifiers land in
/// the same translation unit.
const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "_Bool", "_Complex", "_Imaginary",
];

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("static regex is valid"))
}

/// Validates that `name` is a syntactically legal, non-reserved C
/// identifier, mirroring `cgen`'s
/// `_validate_c_identifier`.
pub fn validate_c_identifier(name: &str) -> Result<(), TranslateError> {
    if !identifier_re().is_match(name) {
        return Err(TranslateError::new(ErrorKind::InvalidIdentifier(format!(
            "'{name}' is not a valid C identifier"
        ))));
    }
    if C_KEYWORDS.contains(&name) {
        return Err(TranslateError::new(ErrorKind::InvalidIdentifier(format!(
            "'{name}' collides with a reserved C keyword"
        ))));
    }
    Ok(())
}

pub struct SubsetValidator;

impl SubsetValidator {
    /// Walks `module` and classifies every feature it uses into one of the
    /// four subset tiers. Hard-fails only when an
    /// `UNSUPPORTED_*` feature is present and `allow_best_effort_stub` is
    /// false; with it set, unsupported occurrences are still recorded in
    /// the returned report but do not block translation.
    pub fn validate_module(
        module: &TypedModule,
        allow_best_effort_stub: bool,
    ) -> Result<ValidationReport, TranslateError> {
        let mut report = ValidationReport::default();
        let mut seen_names = HashSet::new();
        for decl in &module.decls {
            let name = decl.name();
            validate_c_identifier(name)?;
            if !seen_names.insert(name.to_string()) {
                return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(format!(
                    "duplicate top-level declaration `{name}`"
                ))));
            }
            if let Decl::Function(f) = decl {
                Self::validate_function(f, &mut report)?;
            }
        }
        if report.has_unsupported() && !allow_best_effort_stub {
            let offender = report
                .occurrences
                .iter()
                .find(|o| o.tier.is_unsupported())
                .expect("has_unsupported found one");
            return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(format!(
                "`{}` is outside the supported subset ({})",
                offender.feature,
                report.summary()
            )))
            .with_location(offender.location));
        }
        Ok(report)
    }

    fn validate_function(f: &FunctionDecl, report: &mut ValidationReport) -> Result<(), TranslateError> {
        for param in &f.params {
            validate_c_identifier(&param.name)?;
            if param.ty.is_unknown() {
                return Err(TranslateError::new(ErrorKind::TypeInferenceError(format!(
                    "parameter `{}` of `{}` has no resolvable type; annotate it",
                    param.name, f.name
                )))
                .with_location(f.loc));
            }
        }
        if f.ret_type.is_unknown() {
            return Err(TranslateError::new(ErrorKind::TypeInferenceError(format!(
                "function `{}` has no resolvable return type; annotate it",
                f.name
            )))
            .with_location(f.loc));
        }
        let mut has_return = false;
        for stmt in &f.body {
            Self::validate_stmt(stmt, &mut has_return, report)?;
        }
        if !matches!(f.ret_type, pyforge_ir::Type::Void) && !has_return {
            return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(format!(
                "function `{}` declares a non-void return type but has no `return` statement",
                f.name
            )))
            .with_location(f.loc));
        }
        Ok(())
    }

    fn validate_stmt(
        stmt: &Stmt,
        has_return: &mut bool,
        report: &mut ValidationReport,
    ) -> Result<(), TranslateError> {
        match stmt {
            Stmt::Assign { target, value, loc } => {
                Self::validate_assign_target(target, *loc)?;
                Self::validate_expr(value, report)
            }
            Stmt::AugAssign { value, loc, .. } => {
                report.push("augmented assignment", FeatureTier::SupportedWithRewrite, *loc);
                Self::validate_expr(value, report)
            }
            Stmt::If { condition, then_body, else_body, .. } => {
                Self::validate_expr(condition, report)?;
                for s in then_body {
                    Self::validate_stmt(s, has_return, report)?;
                }
                if let Some(else_body) = else_body {
                    for s in else_body {
                        Self::validate_stmt(s, has_return, report)?;
                    }
                }
                Ok(())
            }
            Stmt::While { condition, body, .. } => {
                Self::validate_expr(condition, report)?;
                for s in body {
                    Self::validate_stmt(s, has_return, report)?;
                }
                Ok(())
            }
            Stmt::ForRange { var, start, stop, step, body, loc } => {
                validate_c_identifier(var).map_err(|e| e.with_location(*loc))?;
                Self::validate_expr(start, report)?;
                Self::validate_expr(stop, report)?;
                Self::validate_expr(step, report)?;
                for s in body {
                    Self::validate_stmt(s, has_return, report)?;
                }
                Ok(())
            }
            Stmt::ForContainer { var, iter, body, loc } => {
                validate_c_identifier(var).map_err(|e| e.with_location(*loc))?;
                Self::validate_expr(iter, report)?;
                for s in body {
                    Self::validate_stmt(s, has_return, report)?;
                }
                Ok(())
            }
            Stmt::Return { value, .. } => {
                *has_return = true;
                if let Some(v) = value {
                    Self::validate_expr(v, report)?;
                }
                Ok(())
            }
            Stmt::ExprStmt { value, .. } => Self::validate_expr(value, report),
            Stmt::Assert { condition, message, .. } => {
                Self::validate_expr(condition, report)?;
                if let Some(m) = message {
                    Self::validate_expr(m, report)?;
                }
                Ok(())
            }
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Pass(_) => Ok(()),
        }
    }

    fn validate_assign_target(target: &AssignTarget, loc: SourceLocation) -> Result<(), TranslateError> {
        match target {
            AssignTarget::Name(name) => validate_c_identifier(name).map_err(|e| e.with_location(loc)),
            AssignTarget::Subscript { base, index } => {
                Self::validate_expr_unreported(base)?;
                Self::validate_expr_unreported(index)
            }
            AssignTarget::DictKey { base, key } => {
                Self::validate_expr_unreported(base)?;
                Self::validate_expr_unreported(key)
            }
        }
    }

    /// Validates identifiers/calls nested in an assignment target without a
    /// report handle; a write target's base/index can themselves contain
    /// calls, but never a comprehension, so no tier classification applies.
    fn validate_expr_unreported(expr: &TypedExpr) -> Result<(), TranslateError> {
        let mut scratch = ValidationReport::default();
        Self::validate_expr(expr, &mut scratch)
    }

    fn validate_expr(expr: &TypedExpr, report: &mut ValidationReport) -> Result<(), TranslateError> {
        match &expr.kind {
            ExprKind::Literal(_) => Ok(()),
            ExprKind::Name(_) => Ok(()),
            ExprKind::Binary { left, right, .. } => {
                Self::validate_expr(left, report)?;
                Self::validate_expr(right, report)
            }
            ExprKind::Unary { operand, .. } => Self::validate_expr(operand, report),
            ExprKind::Compare { left, right, .. } => {
                Self::validate_expr(left, report)?;
                Self::validate_expr(right, report)
            }
            ExprKind::BoolOp { values, .. } => values.iter().try_for_each(|v| Self::validate_expr(v, report)),
            ExprKind::Subscript { base, index } => {
                Self::validate_expr(base, report)?;
                Self::validate_expr(index, report)
            }
            ExprKind::Slice { base, start, stop, step } => {
                Self::validate_expr(base, report)?;
                [start, stop, step]
                    .into_iter()
                    .flatten()
                    .try_for_each(|e| Self::validate_expr(e, report))
            }
            ExprKind::Attribute { value, .. } => Self::validate_expr(value, report),
            ExprKind::Call { func, args } => {
                if UNSUPPORTED_DYNAMIC_BUILTINS.contains(&func.as_str()) {
                    report.push(func, FeatureTier::UnsupportedDynamic, expr.loc);
                } else if UNSUPPORTED_STATIC_BUILTINS.contains(&func.as_str()) {
                    report.push(func, FeatureTier::UnsupportedStatic, expr.loc);
                } else if REWRITE_BUILTINS.contains(&func.as_str()) {
                    report.push(func, FeatureTier::SupportedWithRewrite, expr.loc);
                } else {
                    validate_c_identifier(func).map_err(|e| e.with_location(expr.loc))?;
                }
                args.iter().try_for_each(|a| Self::validate_expr(a, report))
            }
            ExprKind::MethodCall { object, args, .. } => {
                Self::validate_expr(object, report)?;
                args.iter().try_for_each(|a| Self::validate_expr(a, report))
            }
            ExprKind::Container(lit) => match lit {
                pyforge_ir::ContainerLiteral::List(elts) | pyforge_ir::ContainerLiteral::Set(elts) => {
                    elts.iter().try_for_each(|e| Self::validate_expr(e, report))
                }
                pyforge_ir::ContainerLiteral::Dict(entries) => entries.iter().try_for_each(|(k, v)| {
                    Self::validate_expr(k, report)?;
                    Self::validate_expr(v, report)
                }),
            },
            ExprKind::Comprehension(comp) => {
                report.push("comprehension", FeatureTier::SupportedWithRewrite, expr.loc);
                Self::validate_expr(&comp.element, report)?;
                Self::validate_expr(&comp.iter, report)?;
                if let Some(cond) = &comp.condition {
                    Self::validate_expr(cond, report)?;
                }
                if let pyforge_ir::ComprehensionKind::Dict { value } = &comp.kind {
                    Self::validate_expr(value, report)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{convert_module, parse_source};
    use crate::type_inference::TypeInferencer;

    fn build(source: &str) -> TypedModule {
        let module = parse_source(source, "<test>").unwrap();
        let mut m = convert_module(module, source).unwrap();
        TypeInferencer::infer_module(&mut m).unwrap();
        m
    }

    #[test]
    fn accepts_well_formed_function() {
        let m = build("def add(a: int, b: int) -> int:\n    return a + b\n");
        assert!(SubsetValidator::validate_module(&m, false).is_ok());
    }

    #[test]
    fn rejects_c_keyword_identifier() {
        let err = validate_c_identifier("while").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidIdentifier(_)));
    }

    #[test]
    fn rejects_non_void_function_missing_return() {
        let m = build("def f(a: int) -> int:\n    x = a + 1\n");
        let err = SubsetValidator::validate_module(&m, false).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnsupportedConstruct(_)));
    }

    #[test]
    fn rejects_duplicate_top_level_declaration() {
        let mut m = build("def f(a: int) -> int:\n    return a\n");
        let dup = m.decls[0].clone();
        m.decls.push(dup);
        let err = SubsetValidator::validate_module(&m, false).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnsupportedConstruct(_)));
    }

    #[test]
    fn aug_assign_is_tagged_supported_with_rewrite() {
        let m = build("def f(a: int) -> int:\n    a += 1\n    return a\n");
        let report = SubsetValidator::validate_module(&m, false).unwrap();
        assert_eq!(report.count(FeatureTier::SupportedWithRewrite), 1);
    }

    #[test]
    fn list_comprehension_is_tagged_supported_with_rewrite() {
        let m = build("def f() -> int:\n    xs = [x for x in range(10)]\n    return 0\n");
        let report = SubsetValidator::validate_module(&m, false).unwrap();
        assert_eq!(report.count(FeatureTier::SupportedWithRewrite), 1);
    }

    #[test]
    fn unsupported_static_builtin_fails_by_default() {
        let m = build("def f(a: int) -> int:\n    getattr(a, a)\n    return a\n");
        let err = SubsetValidator::validate_module(&m, false).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnsupportedConstruct(_)));
    }

    #[test]
    fn unsupported_static_builtin_is_recorded_when_stub_allowed() {
        let m = build("def f(a: int) -> int:\n    getattr(a, a)\n    return a\n");
        let report = SubsetValidator::validate_module(&m, true).unwrap();
        assert_eq!(report.count(FeatureTier::UnsupportedStatic), 1);
        assert!(report.has_unsupported());
    }
}
