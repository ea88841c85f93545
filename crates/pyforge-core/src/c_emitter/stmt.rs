//! Statement emission. `ForRange`/`ForContainer` are the one place the
//! emitter must distinguish a canonical C `for` loop from an HPCL foreach
//! macro, since the two `Stmt` variants the `TypedIR Builder` produces carry
//! that distinction explicitly ((c), §4.7 "for x in container").

use super::expr::emit_expr;
use super::writer::Writer;
use crate::error::{ErrorKind, TranslateError};
use pyforge_ir::{AssignTarget, ContainerKey, ContainerRegistry, Stmt};

pub fn emit_block(
    w: &mut Writer<'_>,
    registry: &mut ContainerRegistry,
    body: &[Stmt],
) -> Result<(), TranslateError> {
    for stmt in body {
        emit_stmt(w, registry, stmt)?;
    }
    Ok(())
}

pub fn emit_stmt(
    w: &mut Writer<'_>,
    registry: &mut ContainerRegistry,
    stmt: &Stmt,
) -> Result<(), TranslateError> {
    match stmt {
        Stmt::Assign { target, value, .. } => {
            let rhs = emit_expr(registry, value)?;
            match target {
                AssignTarget::Name(name) => w.line(format!("{name} = {rhs};")),
                AssignTarget::Subscript { base, index } => {
                    let container = match ContainerKey::from_type(&base.ty) {
                        Some(key) => registry.get_or_register(key, crate::hpcl::container_name),
                        None => {
                            return Err(TranslateError::new(ErrorKind::CodeGenerationError(
                                "subscript assignment requires a container-typed base".to_string(),
                            ))
                            .with_location(base.loc))
                        }
                    };
                    let base_s = emit_expr(registry, base)?;
                    let index_s = emit_expr(registry, index)?;
                    w.line(format!("*{container}_at(&{base_s}, {index_s}) = {rhs};"));
                }
                AssignTarget::DictKey { base, key } => {
                    let container = match ContainerKey::from_type(&base.ty) {
                        Some(key) => registry.get_or_register(key, crate::hpcl::container_name),
                        None => {
                            return Err(TranslateError::new(ErrorKind::CodeGenerationError(
                                "dict-key assignment requires a dict-typed base".to_string(),
                            ))
                            .with_location(base.loc))
                        }
                    };
                    let base_s = emit_expr(registry, base)?;
                    let key_s = emit_expr(registry, key)?;
                    w.line(format!("{container}_insert(&{base_s}, {key_s}, {rhs});"));
                }
            }
        }
        Stmt::AugAssign { .. } => {
            unreachable!("ir_builder lowers AugAssign to Assign before the emitter runs")
        }
        Stmt::If { condition, then_body, else_body, .. } => {
            let cond = emit_expr(registry, condition)?;
            w.open_block(&format!("if ({cond})"));
            emit_block(w, registry, then_body)?;
            w.close_block();
            if let Some(else_body) = else_body {
                w.open_block("else");
                emit_block(w, registry, else_body)?;
                w.close_block();
            }
        }
        Stmt::While { condition, body, .. } => {
            let cond = emit_expr(registry, condition)?;
            w.open_block(&format!("while ({cond})"));
            emit_block(w, registry, body)?;
            w.close_block();
        }
        Stmt::ForRange { var, start, stop, step, body, .. } => {
            let start_s = emit_expr(registry, start)?;
            let stop_s = emit_expr(registry, stop)?;
            let step_s = emit_expr(registry, step)?;
            let header = format!(
                "for (int64_t {var} = {start_s}; {var} < {stop_s}; {var} += {step_s})"
            );
            w.open_block(&header);
            emit_block(w, registry, body)?;
            w.close_block();
        }
        Stmt::ForContainer { var, iter, body, .. } => {
            let container = match ContainerKey::from_type(&iter.ty) {
                Some(key) => registry.get_or_register(key, crate::hpcl::container_name),
                None => {
                    return Err(TranslateError::new(crate::error::ErrorKind::CodeGenerationError(
                        "for-in loop requires a container-typed iterable".to_string(),
                    ))
                    .with_location(iter.loc))
                }
            };
            let iter_s = emit_expr(registry, iter)?;
            w.open_block(&format!("c_foreach ({var}, {container}, {iter_s})"));
            emit_block(w, registry, body)?;
            w.close_block();
        }
        Stmt::Return { value, .. } => match value {
            Some(v) => {
                let rendered = emit_expr(registry, v)?;
                w.line(format!("return {rendered};"));
            }
            None => w.line("return;"),
        },
        Stmt::Break(_) => w.line("break;"),
        Stmt::Continue(_) => w.line("continue;"),
        Stmt::ExprStmt { value, .. } => {
            let rendered = emit_expr(registry, value)?;
            w.line(format!("{rendered};"));
        }
        Stmt::Assert { condition, message, .. } => {
            let cond = emit_expr(registry, condition)?;
            match message {
                Some(m) => {
                    let msg = emit_expr(registry, m)?;
                    w.line(format!("cgr_assert({cond}, {msg});"));
                }
                None => w.line(format!("cgr_assert({cond}, \"assertion failed\");")),
            }
        }
        Stmt::Pass(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use pyforge_ir::{ExprKind, Literal, SourceLocation, Type, TypedExpr};

    fn name(n: &str, ty: Type) -> TypedExpr {
        TypedExpr::new(ExprKind::Name(n.to_string()), ty, loc())
    }

    fn int_lit(n: i64) -> TypedExpr {
        TypedExpr::new(ExprKind::Literal(Literal::Int(n)), Type::I64, loc())
    }

    fn loc() -> SourceLocation {
        SourceLocation { line: 1, column: 0 }
    }

    #[test]
    fn if_else_emits_attached_braces_by_default() {
        let options = Options::default();
        let mut w = Writer::new(&options);
        let mut registry = ContainerRegistry::new();
        let cond = TypedExpr::new(ExprKind::Literal(Literal::Bool(true)), Type::Bool, loc());
        let then_body = vec![Stmt::Return { value: None, loc: loc() }];
        let else_body = Some(vec![Stmt::Pass(loc())]);
        let stmt = Stmt::If { condition: cond, then_body, else_body, loc: loc() };
        emit_stmt(&mut w, &mut registry, &stmt).unwrap();
        let out = w.into_string();
        assert!(out.contains("if (true) {"));
        assert!(out.contains("} else {") || out.contains("else {"));
    }

    #[test]
    fn for_range_emits_canonical_c_loop() {
        let options = Options::default();
        let mut w = Writer::new(&options);
        let mut registry = ContainerRegistry::new();
        let mk = |n: i64| TypedExpr::new(ExprKind::Literal(Literal::Int(n)), Type::I64, loc());
        let stmt = Stmt::ForRange {
            var: "i".into(),
            start: mk(0),
            stop: mk(10),
            step: mk(1),
            body: vec![],
            loc: loc(),
        };
        emit_stmt(&mut w, &mut registry, &stmt).unwrap();
        assert!(w.into_string().contains("for (int64_t i = 0; i < 10; i += 1)"));
    }

    #[test]
    fn list_subscript_write_emits_hpcl_at_assignment() {
        let options = Options::default();
        let mut w = Writer::new(&options);
        let mut registry = ContainerRegistry::new();
        let base = name("xs", Type::List(Box::new(Type::I64)));
        let target = AssignTarget::Subscript { base: Box::new(base), index: Box::new(int_lit(0)) };
        let stmt = Stmt::Assign { target, value: int_lit(5), loc: loc() };
        emit_stmt(&mut w, &mut registry, &stmt).unwrap();
        assert!(w.into_string().contains("*vec_int64_at(&xs, 0) = 5;"));
    }

    #[test]
    fn dict_key_write_emits_hpcl_insert_call() {
        let options = Options::default();
        let mut w = Writer::new(&options);
        let mut registry = ContainerRegistry::new();
        let base = name("d", Type::Dict(Box::new(Type::I64), Box::new(Type::I64)));
        let target = AssignTarget::DictKey { base: Box::new(base), key: Box::new(int_lit(1)) };
        let stmt = Stmt::Assign { target, value: int_lit(2), loc: loc() };
        emit_stmt(&mut w, &mut registry, &stmt).unwrap();
        assert!(w.into_string().contains("hmap_int64_int64_insert(&d, 1, 2);"));
    }
}
