//! Fills in the [`Type::Unknown`] slots the frontend leaves behind (spec
//! §4.1 "Type inference"). Runs after [`crate::frontend`] and before
//! [`crate::subset_validator`]: the validator needs resolved types to check,
//! for instance, that a `for ... in range(...)` induction variable is never
//! reassigned to a non-integer type.
//!
//! Single bottom-up/top-down pass over one function body at a time, a scope
//! stack of `Symbol -> Type`, and `Type::promote` for binary operators.
//! There is no cross-function inference: a function's parameter and return
//! types must be fully annotated.

use crate::error::{ErrorKind, TranslateError};
use pyforge_ir::{
    AssignTarget, BinOp, ContainerLiteral, ExprKind, FunctionDecl, Param, Stmt, Symbol, TypedExpr,
    TypedModule, Type,
};
use std::collections::HashMap;

pub struct TypeInferencer {
    scopes: Vec<HashMap<Symbol, Type>>,
}

impl TypeInferencer {
    pub fn new() -> Self {
        Self { scopes: vec![HashMap::new()] }
    }

    pub fn infer_module(module: &mut TypedModule) -> Result<(), TranslateError> {
        for decl in &mut module.decls {
            if let pyforge_ir::Decl::Function(f) = decl {
                let mut inferencer = TypeInferencer::new();
                inferencer.infer_function(f)?;
            }
        }
        Ok(())
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, ty: Type) {
        self.scopes.last_mut().expect("scope stack is never empty").insert(name.to_string(), ty);
    }

    fn lookup(&self, name: &str) -> Option<Type> {
        self.scopes.iter().rev().find_map(|s| s.get(name).cloned())
    }

    pub fn infer_function(&mut self, f: &mut FunctionDecl) -> Result<(), TranslateError> {
        for Param { name, ty } in &f.params {
            self.declare(name, ty.clone());
        }
        self.infer_block(&mut f.body)?;
        Ok(())
    }

    fn infer_block(&mut self, body: &mut [Stmt]) -> Result<(), TranslateError> {
        for stmt in body {
            self.infer_stmt(stmt)?;
        }
        Ok(())
    }

    fn infer_stmt(&mut self, stmt: &mut Stmt) -> Result<(), TranslateError> {
        match stmt {
            Stmt::Assign { target, value, loc } => {
                self.infer_expr(value)?;
                let ty = value.ty.clone();
                match target {
                    AssignTarget::Name(name) => {
                        if let Some(existing) = self.lookup(name) {
                            if existing != ty && !existing.is_unknown() {
                                return Err(TranslateError::new(ErrorKind::TypeInferenceError(format!(
                                    "`{name}` was `{existing:?}`, cannot reassign with `{ty:?}`"
                                )))
                                .with_location(*loc));
                            }
                        }
                        self.declare(name, ty);
                    }
                    AssignTarget::Subscript { base, index } => {
                        self.infer_expr(base)?;
                        self.infer_expr(index)?;
                        if matches!(base.ty, Type::Dict(_, _)) {
                            promote_to_dict_key(target);
                        }
                    }
                    AssignTarget::DictKey { base, key } => {
                        self.infer_expr(base)?;
                        self.infer_expr(key)?;
                    }
                }
            }
            Stmt::AugAssign { target, op, value, loc } => {
                self.infer_expr(value)?;
                let Some(current) = self.lookup(target) else {
                    return Err(TranslateError::new(ErrorKind::UndefinedReference(target.clone()))
                        .with_location(*loc));
                };
                check_binop_operands(*op, &current, &value.ty, *loc)?;
            }
            Stmt::If { condition, then_body, else_body, .. } => {
                self.infer_expr(condition)?;
                self.push_scope();
                self.infer_block(then_body)?;
                self.pop_scope();
                if let Some(else_body) = else_body {
                    self.push_scope();
                    self.infer_block(else_body)?;
                    self.pop_scope();
                }
            }
            Stmt::While { condition, body, .. } => {
                self.infer_expr(condition)?;
                self.push_scope();
                self.infer_block(body)?;
                self.pop_scope();
            }
            Stmt::ForRange { var, start, stop, step, body, .. } => {
                self.infer_expr(start)?;
                self.infer_expr(stop)?;
                self.infer_expr(step)?;
                self.push_scope();
                self.declare(var, Type::promote(&start.ty, &stop.ty));
                self.infer_block(body)?;
                self.pop_scope();
            }
            Stmt::ForContainer { var, iter, body, loc } => {
                self.infer_expr(iter)?;
                let elem_ty = match &iter.ty {
                    Type::List(e) | Type::Set(e) => (**e).clone(),
                    Type::Dict(k, _) => (**k).clone(),
                    Type::Unknown => Type::Unknown,
                    other => {
                        return Err(TranslateError::new(ErrorKind::TypeInferenceError(format!(
                            "cannot iterate over `{other:?}`"
                        )))
                        .with_location(*loc))
                    }
                };
                self.push_scope();
                self.declare(var, elem_ty);
                self.infer_block(body)?;
                self.pop_scope();
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.infer_expr(value)?;
                }
            }
            Stmt::ExprStmt { value, .. } => self.infer_expr(value)?,
            Stmt::Assert { condition, message, .. } => {
                self.infer_expr(condition)?;
                if let Some(message) = message {
                    self.infer_expr(message)?;
                }
            }
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Pass(_) => {}
        }
        Ok(())
    }

    fn infer_expr(&mut self, expr: &mut TypedExpr) -> Result<(), TranslateError> {
        let loc = expr.loc;
        match &mut expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Name(name) => {
                let Some(ty) = self.lookup(name) else {
                    return Err(TranslateError::new(ErrorKind::UndefinedReference(name.clone()))
                        .with_location(loc));
                };
                expr.ty = ty;
            }
            ExprKind::Binary { op, left, right } => {
                self.infer_expr(left)?;
                self.infer_expr(right)?;
                check_binop_operands(*op, &left.ty, &right.ty, loc)?;
                expr.ty = Type::promote(&left.ty, &right.ty);
            }
            ExprKind::Unary { operand, .. } => {
                self.infer_expr(operand)?;
                expr.ty = operand.ty.clone();
            }
            ExprKind::Compare { left, right, .. } => {
                self.infer_expr(left)?;
                self.infer_expr(right)?;
                expr.ty = Type::Bool;
            }
            ExprKind::BoolOp { values, .. } => {
                for v in values.iter_mut() {
                    self.infer_expr(v)?;
                }
                expr.ty = Type::Bool;
            }
            ExprKind::Subscript { base, index } => {
                self.infer_expr(base)?;
                self.infer_expr(index)?;
                expr.ty = match &base.ty {
                    Type::List(e) | Type::Set(e) => (**e).clone(),
                    Type::Dict(_, v) => (**v).clone(),
                    Type::Unknown => Type::Unknown,
                    other => {
                        return Err(TranslateError::new(ErrorKind::TypeInferenceError(format!(
                            "`{other:?}` is not subscriptable"
                        )))
                        .with_location(loc))
                    }
                };
            }
            ExprKind::Slice { base, start, stop, step } => {
                self.infer_expr(base)?;
                if let Some(s) = start {
                    self.infer_expr(s)?;
                }
                if let Some(s) = stop {
                    self.infer_expr(s)?;
                }
                if let Some(s) = step {
                    self.infer_expr(s)?;
                }
                expr.ty = base.ty.clone();
            }
            ExprKind::Attribute { value, .. } => {
                self.infer_expr(value)?;
                expr.ty = Type::Unknown;
            }
            ExprKind::Call { args, .. } => {
                for a in args.iter_mut() {
                    self.infer_expr(a)?;
                }
                // Builtin call return types are resolved by `ir_builder`,
                // which knows the registry the call result feeds into; left
                // `Unknown` here is not an error by itself.
            }
            ExprKind::MethodCall { object, args, .. } => {
                self.infer_expr(object)?;
                for a in args.iter_mut() {
                    self.infer_expr(a)?;
                }
            }
            ExprKind::Container(lit) => {
                expr.ty = infer_container_type(self, lit)?;
            }
            ExprKind::Comprehension(comp) => {
                self.push_scope();
                self.infer_expr(&mut comp.iter)?;
                let elem_ty = match &comp.iter.ty {
                    Type::List(e) | Type::Set(e) => (**e).clone(),
                    Type::Dict(k, _) => (**k).clone(),
                    _ => Type::Unknown,
                };
                self.declare(&comp.target, elem_ty);
                self.infer_expr(&mut comp.element)?;
                if let Some(cond) = &mut comp.condition {
                    self.infer_expr(cond)?;
                }
                expr.ty = match &comp.kind {
                    pyforge_ir::ComprehensionKind::List => Type::List(Box::new(comp.element.ty.clone())),
                    pyforge_ir::ComprehensionKind::Set => Type::Set(Box::new(comp.element.ty.clone())),
                    pyforge_ir::ComprehensionKind::Dict { value } => {
                        Type::Dict(Box::new(comp.element.ty.clone()), Box::new(value.ty.clone()))
                    }
                };
                self.pop_scope();
            }
        }
        Ok(())
    }
}

impl Default for TypeInferencer {
    fn default() -> Self {
        Self::new()
    }
}

/// `xs[k] = v` converts to a generic `Subscript` target since the frontend
/// can't tell a list write from a dict write by syntax alone; once `xs`'s
/// type resolves to a dict this retags it `DictKey` so `ir_builder` and the
/// emitter never have to re-derive the distinction.
fn promote_to_dict_key(target: &mut AssignTarget) {
    let AssignTarget::Subscript { base, index } = target else { return };
    let placeholder = || Box::new(TypedExpr::new(ExprKind::Literal(pyforge_ir::Literal::Null), Type::Void, base.loc));
    let base = std::mem::replace(base, placeholder());
    let key = std::mem::replace(index, placeholder());
    *target = AssignTarget::DictKey { base, key };
}

fn infer_container_type(
    inferencer: &mut TypeInferencer,
    lit: &mut ContainerLiteral,
) -> Result<Type, TranslateError> {
    match lit {
        ContainerLiteral::List(elts) => {
            for e in elts.iter_mut() {
                inferencer.infer_expr(e)?;
            }
            let elem = elts.first().map(|e| e.ty.clone()).unwrap_or(Type::Unknown);
            Ok(Type::List(Box::new(elem)))
        }
        ContainerLiteral::Set(elts) => {
            for e in elts.iter_mut() {
                inferencer.infer_expr(e)?;
            }
            let elem = elts.first().map(|e| e.ty.clone()).unwrap_or(Type::Unknown);
            Ok(Type::Set(Box::new(elem)))
        }
        ContainerLiteral::Dict(entries) => {
            for (k, v) in entries.iter_mut() {
                inferencer.infer_expr(k)?;
                inferencer.infer_expr(v)?;
            }
            let key = entries.first().map(|(k, _)| k.ty.clone()).unwrap_or(Type::Unknown);
            let val = entries.first().map(|(_, v)| v.ty.clone()).unwrap_or(Type::Unknown);
            Ok(Type::Dict(Box::new(key), Box::new(val)))
        }
    }
}

fn check_binop_operands(
    op: BinOp,
    left: &Type,
    right: &Type,
    loc: pyforge_ir::SourceLocation,
) -> Result<(), TranslateError> {
    if left.is_unknown() || right.is_unknown() {
        return Ok(());
    }
    let numeric_only = !matches!(op, BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::LShift | BinOp::RShift);
    if numeric_only {
        if !left.is_numeric() || !right.is_numeric() {
            return Err(TranslateError::new(ErrorKind::TypeInferenceError(format!(
                "operator {op:?} requires numeric operands, found `{left:?}` and `{right:?}`"
            )))
            .with_location(loc));
        }
    } else if !left.is_integer() || !right.is_integer() {
        return Err(TranslateError::new(ErrorKind::TypeInferenceError(format!(
            "bitwise operator {op:?} requires integer operands, found `{left:?}` and `{right:?}`"
        )))
        .with_location(loc));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{convert_module, parse_source};

    fn build(source: &str) -> TypedModule {
        let module = parse_source(source, "<test>").unwrap();
        convert_module(module, source).unwrap()
    }

    #[test]
    fn infers_binop_result_type() {
        let mut m = build("def add(a: int, b: int) -> int:\n    return a + b\n");
        TypeInferencer::infer_module(&mut m).unwrap();
        let f = m.find_function("add").unwrap();
        let Stmt::Return { value: Some(v), .. } = &f.body[0] else { panic!() };
        assert_eq!(v.ty, Type::I32);
    }

    #[test]
    fn rejects_undefined_reference() {
        let mut m = build("def f() -> int:\n    return x\n");
        let err = TypeInferencer::infer_module(&mut m).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UndefinedReference(_)));
    }

    #[test]
    fn rejects_reassignment_with_conflicting_type() {
        let mut m = build("def f() -> int:\n    x = 1\n    x = \"oops\"\n    return x\n");
        let err = TypeInferencer::infer_module(&mut m).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TypeInferenceError(_)));
    }

    #[test]
    fn infers_list_element_type_from_first_element() {
        let mut m = build("def f() -> int:\n    xs = [1, 2, 3]\n    return xs[0]\n");
        TypeInferencer::infer_module(&mut m).unwrap();
        let f = m.find_function("f").unwrap();
        let Stmt::Assign { value, .. } = &f.body[0] else { panic!() };
        assert_eq!(value.ty, Type::List(Box::new(Type::I64)));
    }

    #[test]
    fn list_subscript_assignment_keeps_subscript_target() {
        let mut m = build("def f(xs: list[int], i: int, v: int) -> int:\n    xs[i] = v\n    return 0\n");
        TypeInferencer::infer_module(&mut m).unwrap();
        let f = m.find_function("f").unwrap();
        let Stmt::Assign { target, .. } = &f.body[0] else { panic!() };
        assert!(matches!(target, AssignTarget::Subscript { .. }));
    }

    #[test]
    fn dict_subscript_assignment_promotes_to_dict_key() {
        let mut m = build("def f(d: dict[int, int], k: int, v: int) -> int:\n    d[k] = v\n    return 0\n");
        TypeInferencer::infer_module(&mut m).unwrap();
        let f = m.find_function("f").unwrap();
        let Stmt::Assign { target, .. } = &f.body[0] else { panic!() };
        assert!(matches!(target, AssignTarget::DictKey { .. }));
    }
}
