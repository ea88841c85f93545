//! Expression emission with precedence-driven parenthesization (
//! "Operator precedence": conservative over-parenthesization is preferred
//! to ambiguity).

use crate::error::{ErrorKind, TranslateError};
use crate::hpcl;
use pyforge_ir::{
    BinOp, BoolOp, CompareOp, ContainerKey, ContainerLiteral, ContainerRegistry, ExprKind, Literal,
    SourceLocation, TypedExpr, UnaryOp,
};

/// Binding power, higher binds tighter. Mirrors C operator precedence for
/// the subset of operators this emitter produces directly; the Python-
/// semantics operators routed through `cgr_*` helper calls (`/`, `//`, `%`,
/// `**`) are emitted as ordinary function calls and never need parens
/// around their own operands, only around the arguments.
fn binop_precedence(op: BinOp) -> u8 {
    match op {
        BinOp::Mul => 12,
        BinOp::Add | BinOp::Sub => 11,
        BinOp::LShift | BinOp::RShift => 10,
        BinOp::BitAnd => 8,
        BinOp::BitXor => 7,
        BinOp::BitOr => 6,
        BinOp::Div | BinOp::FloorDiv | BinOp::Mod | BinOp::Pow => 14,
    }
}

fn compare_precedence() -> u8 {
    9
}

fn boolop_precedence(op: BoolOp) -> u8 {
    match op {
        BoolOp::And => 4,
        BoolOp::Or => 3,
    }
}

/// Root precedence used when an expression is emitted in a context (e.g.
/// directly as a statement, or as a function argument) where no parens are
/// ever needed regardless of the inner operator.
const ROOT_PRECEDENCE: u8 = 0;

fn own_precedence(expr: &TypedExpr) -> u8 {
    match &expr.kind {
        ExprKind::Binary { op, .. } => binop_precedence(*op),
        ExprKind::Compare { .. } => compare_precedence(),
        ExprKind::BoolOp { op, .. } => boolop_precedence(*op),
        ExprKind::Unary { .. } => 13,
        _ => 15,
    }
}

fn escape_c_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn binop_symbol(op: BinOp) -> Option<&'static str> {
    Some(match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::BitAnd => "&",
        BinOp::BitOr => "|",
        BinOp::BitXor => "^",
        BinOp::LShift => "<<",
        BinOp::RShift => ">>",
        BinOp::Div | BinOp::FloorDiv | BinOp::Mod | BinOp::Pow => return None,
    })
}

fn compare_symbol(op: CompareOp) -> Option<&'static str> {
    Some(match op {
        CompareOp::Eq => "==",
        CompareOp::NotEq => "!=",
        CompareOp::Lt => "<",
        CompareOp::LtEq => "<=",
        CompareOp::Gt => ">",
        CompareOp::GtEq => ">=",
        CompareOp::In | CompareOp::NotIn => return None,
    })
}

/// Renders `expr` to C source text, registering any container shapes it
/// references ( "Shared-resource policy": the registry may still be
/// written to by the emitter when it meets a container operation not yet
/// seen during the `TypedIR Builder` pass).
pub fn emit_expr(
    registry: &mut ContainerRegistry,
    expr: &TypedExpr,
) -> Result<String, TranslateError> {
    emit_expr_prec(registry, expr, ROOT_PRECEDENCE)
}

fn emit_expr_prec(
    registry: &mut ContainerRegistry,
    expr: &TypedExpr,
    context_prec: u8,
) -> Result<String, TranslateError> {
    let own = own_precedence(expr);
    let rendered = emit_expr_inner(registry, expr)?;
    if own < context_prec {
        Ok(format!("({rendered})"))
    } else {
        Ok(rendered)
    }
}

fn emit_expr_inner(registry: &mut ContainerRegistry, expr: &TypedExpr) -> Result<String, TranslateError> {
    match &expr.kind {
        ExprKind::Literal(lit) => Ok(emit_literal(lit)),
        ExprKind::Name(name) => Ok(name.clone()),
        ExprKind::Binary { op, left, right } => emit_binary(registry, *op, left, right),
        ExprKind::Unary { op, operand } => {
            let sym = match op {
                UnaryOp::Not => "!",
                UnaryOp::Neg => "-",
                UnaryOp::Pos => "+",
                UnaryOp::BitNot => "~",
            };
            let rendered = emit_expr_prec(registry, operand, 13)?;
            Ok(format!("{sym}{rendered}"))
        }
        ExprKind::Compare { op, left, right } => emit_compare(registry, *op, left, right),
        ExprKind::BoolOp { op, values } => emit_boolop(registry, *op, values),
        ExprKind::Subscript { base, index } => {
            let container = container_name_for(registry, &base.ty)?;
            let base_s = emit_expr_prec(registry, base, 15)?;
            let index_s = emit_expr(registry, index)?;
            Ok(format!("*{container}_at(&{base_s}, {index_s})"))
        }
        ExprKind::Attribute { value, attr } => {
            let value_s = emit_expr_prec(registry, value, 15)?;
            Ok(format!("{value_s}.{attr}"))
        }
        ExprKind::Call { func, args } => emit_call(registry, func, args, expr.loc),
        ExprKind::MethodCall { object, method, args } => emit_method_call(registry, object, method, args),
        ExprKind::Container(lit) => emit_container_literal(registry, lit, &expr.ty),
        ExprKind::Slice { .. } => Err(TranslateError::new(ErrorKind::CodeGenerationError(
            "a bare slice expression has no direct C rendering outside of a subscript or call"
                .to_string(),
        ))
        .with_location(expr.loc)),
        ExprKind::Comprehension(_) => Err(TranslateError::new(ErrorKind::InternalError(
            "comprehension reached the emitter; ir_builder should have lowered it".to_string(),
        ))
        .with_location(expr.loc)),
    }
}

fn emit_literal(lit: &Literal) -> String {
    match lit {
        Literal::Int(n) => n.to_string(),
        Literal::Float(f) => {
            if f.fract() == 0.0 && f.is_finite() {
                format!("{f:.1}")
            } else {
                format!("{f}")
            }
        }
        Literal::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Literal::Str(s) => escape_c_string(s),
        Literal::Null => "NULL".to_string(),
    }
}

fn emit_binary(
    registry: &mut ContainerRegistry,
    op: BinOp,
    left: &TypedExpr,
    right: &TypedExpr,
) -> Result<String, TranslateError> {
    if let Some(sym) = binop_symbol(op) {
        let prec = binop_precedence(op);
        let l = emit_expr_prec(registry, left, prec)?;
        let r = emit_expr_prec(registry, right, prec + 1)?;
        return Ok(format!("{l} {sym} {r}"));
    }
    let helper = match op {
        BinOp::Div => "cgr_truediv",
        BinOp::FloorDiv => "cgr_floordiv",
        BinOp::Mod => "cgr_mod",
        BinOp::Pow => "cgr_pow",
        _ => unreachable!("handled by binop_symbol above"),
    };
    let l = emit_expr(registry, left)?;
    let r = emit_expr(registry, right)?;
    Ok(format!("{helper}({l}, {r})"))
}

fn emit_compare(
    registry: &mut ContainerRegistry,
    op: CompareOp,
    left: &TypedExpr,
    right: &TypedExpr,
) -> Result<String, TranslateError> {
    if let Some(sym) = compare_symbol(op) {
        let prec = compare_precedence();
        let l = emit_expr_prec(registry, left, prec)?;
        let r = emit_expr_prec(registry, right, prec + 1)?;
        return Ok(format!("{l} {sym} {r}"));
    }
    let container = container_name_for(registry, &right.ty)?;
    let l = emit_expr(registry, left)?;
    let r = emit_expr(registry, right)?;
    let call = format!("{container}_contains(&{r}, {l})");
    Ok(match op {
        CompareOp::NotIn => format!("!{call}"),
        _ => call,
    })
}

fn emit_boolop(registry: &mut ContainerRegistry, op: BoolOp, values: &[TypedExpr]) -> Result<String, TranslateError> {
    let sym = match op {
        BoolOp::And => "&&",
        BoolOp::Or => "||",
    };
    let prec = boolop_precedence(op);
    let parts: Result<Vec<_>, _> = values.iter().map(|v| emit_expr_prec(registry, v, prec)).collect();
    Ok(parts?.join(&format!(" {sym} ")))
}

fn emit_args(registry: &mut ContainerRegistry, args: &[TypedExpr]) -> Result<String, TranslateError> {
    let parts: Result<Vec<_>, _> = args.iter().map(|a| emit_expr(registry, a)).collect();
    Ok(parts?.join(", "))
}

/// A bare (non-`.method()`) builtin call, e.g. `len(xs)`. `len` dispatches
/// to the argument's own container's `_size` accessor ( `len() ->
/// vec_T_size`); the scalar math builtins route through the same `cgr_*`
/// runtime-helper family `emit_binary` uses for `/`, `//`, `%`, `**`. Any
/// other name is a user-defined function and renders as an ordinary call.
fn emit_call(
    registry: &mut ContainerRegistry,
    func: &str,
    args: &[TypedExpr],
    loc: SourceLocation,
) -> Result<String, TranslateError> {
    match func {
        "len" => {
            let [arg] = args else {
                return Err(TranslateError::new(ErrorKind::CodeGenerationError(
                    "len() takes exactly one argument".to_string(),
                ))
                .with_location(loc));
            };
            let container = container_name_for(registry, &arg.ty)?;
            let rendered = emit_expr_prec(registry, arg, 15)?;
            Ok(format!("{container}_size(&{rendered})"))
        }
        "abs" => emit_scalar_builtin(registry, "cgr_abs", args, loc),
        "min" => emit_scalar_builtin(registry, "cgr_min", args, loc),
        "max" => emit_scalar_builtin(registry, "cgr_max", args, loc),
        _ => {
            let rendered_args = emit_args(registry, args)?;
            Ok(format!("{func}({rendered_args})"))
        }
    }
}

fn emit_scalar_builtin(
    registry: &mut ContainerRegistry,
    helper: &str,
    args: &[TypedExpr],
    loc: SourceLocation,
) -> Result<String, TranslateError> {
    if args.is_empty() {
        return Err(TranslateError::new(ErrorKind::CodeGenerationError(format!(
            "{helper} requires at least one argument"
        )))
        .with_location(loc));
    }
    let rendered_args = emit_args(registry, args)?;
    Ok(format!("{helper}({rendered_args})"))
}

fn container_name_for(registry: &mut ContainerRegistry, ty: &pyforge_ir::Type) -> Result<String, TranslateError> {
    match ContainerKey::from_type(ty) {
        Some(key) => Ok(registry.get_or_register(key, hpcl::container_name)),
        None => Err(TranslateError::new(ErrorKind::CodeGenerationError(
            "expected a container type for this operation".to_string(),
        ))),
    }
}

fn emit_method_call(
    registry: &mut ContainerRegistry,
    object: &TypedExpr,
    method: &str,
    args: &[TypedExpr],
) -> Result<String, TranslateError> {
    let Some(key) = ContainerKey::from_type(&object.ty) else {
        // Not a container method: emit as a plain C "object.method(args)" call
        // (struct-bound helper functions use this shape).
        let object_s = emit_expr_prec(registry, object, 15)?;
        let rendered_args = emit_args(registry, args)?;
        return Ok(format!("{object_s}.{method}({rendered_args})"));
    };
    let name = registry.get_or_register(key.clone(), hpcl::container_name);
    let object_s = emit_expr(registry, object)?;
    let hpcl_method = hpcl::lower_method_name(&key, method).unwrap_or(method);
    let rendered_args = emit_args(registry, args)?;
    if rendered_args.is_empty() {
        Ok(format!("{name}_{hpcl_method}(&{object_s})"))
    } else {
        Ok(format!("{name}_{hpcl_method}(&{object_s}, {rendered_args})"))
    }
}

fn emit_container_literal(
    registry: &mut ContainerRegistry,
    lit: &ContainerLiteral,
    ty: &pyforge_ir::Type,
) -> Result<String, TranslateError> {
    let Some(key) = ContainerKey::from_type(ty) else {
        return Err(TranslateError::new(ErrorKind::CodeGenerationError(
            "container literal has a non-container resolved type".to_string(),
        )));
    };
    let name = registry.get_or_register(key, hpcl::container_name);
    match lit {
        ContainerLiteral::List(elts) | ContainerLiteral::Set(elts) if elts.is_empty() => {
            Ok(format!("{name}_init()"))
        }
        ContainerLiteral::Dict(entries) if entries.is_empty() => Ok(format!("{name}_init()")),
        _ => Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
            "non-empty container literals are lowered via the comprehension-initializer path; \
             write them as an empty literal followed by append/insert calls"
                .to_string(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyforge_ir::{SourceLocation, Type};

    fn loc() -> SourceLocation {
        SourceLocation { line: 1, column: 0 }
    }

    fn lit(n: i64) -> TypedExpr {
        TypedExpr::new(ExprKind::Literal(Literal::Int(n)), Type::I64, loc())
    }

    #[test]
    fn add_renders_without_parens() {
        let mut reg = ContainerRegistry::new();
        let expr = TypedExpr::new(
            ExprKind::Binary { op: BinOp::Add, left: Box::new(lit(1)), right: Box::new(lit(2)) },
            Type::I64,
            loc(),
        );
        assert_eq!(emit_expr(&mut reg, &expr).unwrap(), "1 + 2");
    }

    #[test]
    fn mul_of_add_parenthesizes_left() {
        let mut reg = ContainerRegistry::new();
        let add = TypedExpr::new(
            ExprKind::Binary { op: BinOp::Add, left: Box::new(lit(1)), right: Box::new(lit(2)) },
            Type::I64,
            loc(),
        );
        let mul = TypedExpr::new(
            ExprKind::Binary { op: BinOp::Mul, left: Box::new(add), right: Box::new(lit(3)) },
            Type::I64,
            loc(),
        );
        assert_eq!(emit_expr(&mut reg, &mul).unwrap(), "(1 + 2) * 3");
    }

    #[test]
    fn floordiv_routes_through_runtime_helper() {
        let mut reg = ContainerRegistry::new();
        let expr = TypedExpr::new(
            ExprKind::Binary { op: BinOp::FloorDiv, left: Box::new(lit(7)), right: Box::new(lit(2)) },
            Type::I64,
            loc(),
        );
        assert_eq!(emit_expr(&mut reg, &expr).unwrap(), "cgr_floordiv(7, 2)");
    }

    #[test]
    fn subscript_read_renders_hpcl_at_call() {
        let mut reg = ContainerRegistry::new();
        let base = TypedExpr::new(ExprKind::Name("xs".into()), Type::List(Box::new(Type::I64)), loc());
        let expr = TypedExpr::new(
            ExprKind::Subscript { base: Box::new(base), index: Box::new(lit(0)) },
            Type::I64,
            loc(),
        );
        assert_eq!(emit_expr(&mut reg, &expr).unwrap(), "*vec_int64_at(&xs, 0)");
    }

    #[test]
    fn len_call_lowers_to_hpcl_size() {
        let mut reg = ContainerRegistry::new();
        let xs = TypedExpr::new(ExprKind::Name("xs".into()), Type::List(Box::new(Type::I64)), loc());
        let expr = TypedExpr::new(ExprKind::Call { func: "len".into(), args: vec![xs] }, Type::I64, loc());
        assert_eq!(emit_expr(&mut reg, &expr).unwrap(), "vec_int64_size(&xs)");
    }

    #[test]
    fn abs_call_routes_through_runtime_helper() {
        let mut reg = ContainerRegistry::new();
        let expr = TypedExpr::new(ExprKind::Call { func: "abs".into(), args: vec![lit(-3)] }, Type::I64, loc());
        assert_eq!(emit_expr(&mut reg, &expr).unwrap(), "cgr_abs(-3)");
    }

    #[test]
    fn min_call_routes_through_runtime_helper() {
        let mut reg = ContainerRegistry::new();
        let expr = TypedExpr::new(
            ExprKind::Call { func: "min".into(), args: vec![lit(1), lit(2)] },
            Type::I64,
            loc(),
        );
        assert_eq!(emit_expr(&mut reg, &expr).unwrap(), "cgr_min(1, 2)");
    }

    #[test]
    fn user_defined_call_still_renders_generically() {
        let mut reg = ContainerRegistry::new();
        let expr = TypedExpr::new(ExprKind::Call { func: "helper".into(), args: vec![lit(1)] }, Type::I64, loc());
        assert_eq!(emit_expr(&mut reg, &expr).unwrap(), "helper(1)");
    }

    #[test]
    fn append_call_lowers_to_push() {
        let mut reg = ContainerRegistry::new();
        let object = TypedExpr::new(ExprKind::Name("xs".into()), Type::List(Box::new(Type::I64)), loc());
        let expr = TypedExpr::new(
            ExprKind::MethodCall { object: Box::new(object), method: "append".into(), args: vec![lit(5)] },
            Type::Void,
            loc(),
        );
        assert_eq!(emit_expr(&mut reg, &expr).unwrap(), "vec_int64_push(&xs, 5)");
    }
}
