//! Final pre-validation normalization pass.
//! Runs after [`crate::type_inference`] so every node it touches already has
//! a resolved [`Type`], and before [`crate::subset_validator`], which
//! assumes the two transient node shapes handled here — augmented
//! assignment and comprehensions — no longer exist.

use crate::error::{ErrorKind, TranslateError};
use pyforge_ir::{
    AssignTarget, Comprehension, ComprehensionKind, ContainerLiteral, Decl, ExprKind, FunctionDecl,
    SourceLocation, Stmt, Symbol, TypedExpr, TypedModule, Type,
};

pub struct IrBuilder;

impl IrBuilder {
    pub fn normalize_module(module: &mut TypedModule) -> Result<(), TranslateError> {
        for decl in &mut module.decls {
            if let Decl::Function(f) = decl {
                Self::normalize_function(f)?;
            }
        }
        Ok(())
    }

    fn normalize_function(f: &mut FunctionDecl) -> Result<(), TranslateError> {
        let body = std::mem::take(&mut f.body);
        f.body = lower_block(body)?;
        Ok(())
    }
}

fn lower_block(body: Vec<Stmt>) -> Result<Vec<Stmt>, TranslateError> {
    let mut out = Vec::with_capacity(body.len());
    for stmt in body {
        out.extend(lower_stmt(stmt)?);
    }
    Ok(out)
}

/// Lowers one statement, possibly expanding it into several (a comprehension
/// assignment becomes an initializer plus a `ForContainer` loop).
fn lower_stmt(stmt: Stmt) -> Result<Vec<Stmt>, TranslateError> {
    Ok(match stmt {
        Stmt::Assign { target, value, loc } => match value.kind {
            ExprKind::Comprehension(comp) => {
                let AssignTarget::Name(name) = target else {
                    return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
                        "a comprehension can only be assigned to a plain name".into(),
                    ))
                    .with_location(loc));
                };
                lower_comprehension_assign(name, value.ty, *comp, loc)?
            }
            kind => vec![Stmt::Assign {
                target,
                value: TypedExpr {
                    kind,
                    ty: value.ty,
                    loc: value.loc,
                    annotations: value.annotations,
                },
                loc,
            }],
        },
        Stmt::AugAssign { target, op, value, loc } => {
            let ty = value.ty.clone();
            let left = Box::new(TypedExpr::new(ExprKind::Name(target.clone()), ty.clone(), loc));
            let binop = TypedExpr::new(ExprKind::Binary { op, left, right: Box::new(value) }, ty, loc);
            vec![Stmt::Assign { target: AssignTarget::Name(target), value: binop, loc }]
        }
        Stmt::If { condition, then_body, else_body, loc } => vec![Stmt::If {
            condition,
            then_body: lower_block(then_body)?,
            else_body: else_body.map(lower_block).transpose()?,
            loc,
        }],
        Stmt::While { condition, body, loc } => vec![Stmt::While { condition, body: lower_block(body)?, loc }],
        Stmt::ForRange { var, start, stop, step, body, loc } => vec![Stmt::ForRange {
            var,
            start,
            stop,
            step,
            body: lower_block(body)?,
            loc,
        }],
        Stmt::ForContainer { var, iter, body, loc } => {
            vec![Stmt::ForContainer { var, iter, body: lower_block(body)?, loc }]
        }
        other => vec![other],
    })
}

fn empty_container_literal(kind: &ComprehensionKind) -> ContainerLiteral {
    match kind {
        ComprehensionKind::List => ContainerLiteral::List(Vec::new()),
        ComprehensionKind::Set => ContainerLiteral::Set(Vec::new()),
        ComprehensionKind::Dict { .. } => ContainerLiteral::Dict(Vec::new()),
    }
}

/// `xs = [e for x in it if c]` lowers to:
/// ```text
/// xs = <empty container>
/// for x in it:
///     if c:
///         xs.append(e)   // xs.add(e) for a set, xs.insert(k, v) for a dict
/// ```
/// matching the "initialize/loop/conditional-append" shape `ExprKind`'s doc
/// comment promises.
fn lower_comprehension_assign(
    target: Symbol,
    result_ty: Type,
    comp: Comprehension,
    loc: SourceLocation,
) -> Result<Vec<Stmt>, TranslateError> {
    let Comprehension { kind, element, target: loop_var, iter, condition } = comp;
    let init = Stmt::Assign {
        target: AssignTarget::Name(target.clone()),
        value: TypedExpr::new(ExprKind::Container(empty_container_literal(&kind)), result_ty, loc),
        loc,
    };
    let object = Box::new(TypedExpr::new(ExprKind::Name(target), Type::Unknown, loc));
    let append_expr = match kind {
        ComprehensionKind::List => TypedExpr::new(
            ExprKind::MethodCall { object, method: "append".to_string(), args: vec![*element] },
            Type::Void,
            loc,
        ),
        ComprehensionKind::Set => TypedExpr::new(
            ExprKind::MethodCall { object, method: "add".to_string(), args: vec![*element] },
            Type::Void,
            loc,
        ),
        ComprehensionKind::Dict { value } => TypedExpr::new(
            ExprKind::MethodCall { object, method: "insert".to_string(), args: vec![*element, *value] },
            Type::Void,
            loc,
        ),
    };
    let append_stmt = Stmt::ExprStmt { value: append_expr, loc };
    let loop_body = match condition {
        Some(cond) => vec![Stmt::If { condition: *cond, then_body: vec![append_stmt], else_body: None, loc }],
        None => vec![append_stmt],
    };
    let for_loop = Stmt::ForContainer { var: loop_var, iter: *iter, body: loop_body, loc };
    Ok(vec![init, for_loop])
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
    fn aug_assign_lowers_to_assign_after_binop() {
        let mut m = build("def f(n: int) -> int:\n    n += 1\n    return n\n");
        IrBuilder::normalize_module(&mut m).unwrap();
        let f = m.find_function("f").unwrap();
        let Stmt::Assign { value, .. } = &f.body[0] else { panic!("expected Assign") };
        assert!(matches!(value.kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn list_comprehension_lowers_to_init_and_for_loop() {
        let mut m = build("def f() -> int:\n    xs = [x for x in range(10)]\n    return 0\n");
        IrBuilder::normalize_module(&mut m).unwrap();
        let f = m.find_function("f").unwrap();
        assert!(matches!(f.body[0], Stmt::Assign { .. }));
        assert!(matches!(f.body[1], Stmt::ForContainer { .. }));
        let Stmt::ForContainer { body, .. } = &f.body[1] else { panic!() };
        let Stmt::ExprStmt { value, .. } = &body[0] else { panic!("expected append call") };
        let ExprKind::MethodCall { method, .. } = &value.kind else { panic!() };
        assert_eq!(method, "append");
    }

    #[test]
    fn filtered_comprehension_wraps_append_in_if() {
        let mut m = build("def f() -> int:\n    xs = [x for x in range(10) if x > 0]\n    return 0\n");
        IrBuilder::normalize_module(&mut m).unwrap();
        let f = m.find_function("f").unwrap();
        let Stmt::ForContainer { body, .. } = &f.body[1] else { panic!() };
        assert!(matches!(body[0], Stmt::If { .. }));
    }
}
