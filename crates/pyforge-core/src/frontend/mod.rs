//! Python source to pre-inference Typed IR. This module
//! owns the boundary with `rustpython_parser`/`rustpython_ast`; nothing past
//! here (`type_inference`, `subset_validator`, `ir_builder`) touches the
//! `ast` crate directly.
//!
//! Expression and statement nodes come out of this module with
//! [`Type::Unknown`] wherever the type isn't syntactically given (a literal,
//! an annotated parameter); [`crate::type_inference`] fills the rest in.

mod type_extraction;

pub use type_extraction::TypeExtractor;

use crate::error::{ErrorKind, TranslateError};
use pyforge_annotations::CodegenAnnotations;
use pyforge_ir::{
    AssignTarget, BinOp, BoolOp, CompareOp, ContainerLiteral, Decl, ExprKind, FunctionDecl,
    FunctionProperties, Literal, Param, SourceLocation, Stmt, TypedExpr, TypedModule, Type, UnaryOp,
};
use rustpython_ast::{self as ast, Ranged};
use rustpython_parser::{parse, Mode};

/// Maps byte offsets from `rustpython_parser`'s `TextSize` ranges back to
/// 1-indexed `(line, column)` pairs, the way a hand-rolled line index would
/// in any offset-based parser front end.
struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { line_starts }
    }

    fn resolve(&self, offset: u32) -> SourceLocation {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let column = offset - self.line_starts[line];
        SourceLocation::new(line + 1, column as usize + 1)
    }
}

fn loc_of(index: &LineIndex, node: &impl Ranged) -> SourceLocation {
    let offset: u32 = node.range().start().into();
    index.resolve(offset)
}

/// Parses `source` into an untyped `rustpython_ast::Mod`, translating a
/// parser failure into [`ErrorKind::ParseError`].
pub fn parse_source(source: &str, filename: &str) -> Result<ast::ModModule, TranslateError> {
    match parse(source, Mode::Module, filename) {
        Ok(ast::Mod::Module(m)) => Ok(m),
        Ok(_) => Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
            "only module-level source is supported".into(),
        ))),
        Err(e) => Err(TranslateError::new(ErrorKind::ParseError).with_context(e.to_string())),
    }
}

/// Converts a parsed module into a [`TypedModule`] whose expression nodes
/// carry [`Type::Unknown`] wherever annotation resolution alone can't supply
/// a type. Decorators and `# pyforge:` pragmas are recovered from `source`
/// directly since `rustpython_ast` has already thrown away their raw text.
pub fn convert_module(module: ast::ModModule, source: &str) -> Result<TypedModule, TranslateError> {
    let index = LineIndex::new(source);
    let lines: Vec<&str> = source.lines().collect();
    let mut decls = Vec::new();
    for stmt in module.body {
        match stmt {
            ast::Stmt::FunctionDef(f) => {
                decls.push(Decl::Function(convert_function(&index, &lines, f)?));
            }
            ast::Stmt::AnnAssign(a) => {
                decls.push(Decl::GlobalConst(convert_global_const(&index, a)?));
            }
            ast::Stmt::Import(_) | ast::Stmt::ImportFrom(_) => {
                // Imports carry no run-time meaning for the supported subset;
                // HPCL headers are synthesized separately by the emitter.
            }
            other => {
                return Err(unsupported_stmt(&index, &other, "unsupported top-level statement"))
            }
        }
    }
    Ok(TypedModule { decls })
}

fn convert_global_const(
    index: &LineIndex,
    a: ast::StmtAnnAssign,
) -> Result<pyforge_ir::GlobalConstDecl, TranslateError> {
    let loc = loc_of(index, &a);
    let ast::Expr::Name(target) = a.target.as_ref() else {
        return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
            "module-level assignment target must be a name".into(),
        ))
        .with_location(loc));
    };
    let ty = TypeExtractor::extract_type(&a.annotation)?;
    let Some(value_expr) = a.value else {
        return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
            "module-level constant requires a value".into(),
        ))
        .with_location(loc));
    };
    let value = convert_expr(index, *value_expr)?;
    Ok(pyforge_ir::GlobalConstDecl {
        name: target.id.to_string(),
        ty,
        value,
        loc,
    })
}

fn leading_annotation_lines<'a>(lines: &[&'a str], def_line: usize) -> Vec<&'a str> {
    let mut collected = Vec::new();
    let mut idx = def_line.saturating_sub(1);
    while idx > 0 {
        let candidate = lines[idx - 1];
        let trimmed = candidate.trim_start();
        if trimmed.starts_with('@') || trimmed.starts_with('#') {
            collected.push(candidate);
            idx -= 1;
        } else {
            break;
        }
    }
    collected.reverse();
    collected
}

fn convert_function(
    index: &LineIndex,
    lines: &[&str],
    f: ast::StmtFunctionDef,
) -> Result<FunctionDecl, TranslateError> {
    let loc = loc_of(index, &f);
    let def_line = loc.line;
    let leading = leading_annotation_lines(lines, def_line);
    let first_pragma_line = def_line.saturating_sub(leading.len());
    let annotations: CodegenAnnotations =
        pyforge_annotations::parse_function_annotations(&leading, first_pragma_line)
            .map_err(|e| {
                TranslateError::new(ErrorKind::UnsupportedConstruct(e.to_string())).with_location(loc)
            })?;

    let params = convert_params(&f.args)?;
    let ret_type = TypeExtractor::extract_return_type(&f.returns)?;
    let body = convert_body(index, f.body)?;

    Ok(FunctionDecl {
        name: f.name.to_string(),
        params,
        ret_type,
        body,
        properties: FunctionProperties::default(),
        annotations,
        loc,
    })
}

fn convert_params(args: &ast::Arguments) -> Result<Vec<Param>, TranslateError> {
    if !args.posonlyargs.is_empty() || !args.kwonlyargs.is_empty() {
        return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
            "positional-only and keyword-only parameters are not supported".into(),
        )));
    }
    if args.vararg.is_some() || args.kwarg.is_some() {
        return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
            "*args/**kwargs are not supported".into(),
        )));
    }
    args.args
        .iter()
        .map(|arg| {
            let name = arg.def.arg.to_string();
            let ty = match &arg.def.annotation {
                Some(a) => TypeExtractor::extract_type(a)?,
                None => Type::Unknown,
            };
            Ok(Param { name, ty })
        })
        .collect()
}

fn convert_body(index: &LineIndex, body: Vec<ast::Stmt>) -> Result<Vec<Stmt>, TranslateError> {
    body.into_iter().map(|s| convert_stmt(index, s)).collect()
}

fn convert_stmt(index: &LineIndex, stmt: ast::Stmt) -> Result<Stmt, TranslateError> {
    match stmt {
        ast::Stmt::Assign(a) => convert_assign(index, a),
        ast::Stmt::AugAssign(a) => convert_aug_assign(index, a),
        ast::Stmt::Return(r) => convert_return(index, r),
        ast::Stmt::If(i) => convert_if(index, i),
        ast::Stmt::While(w) => convert_while(index, w),
        ast::Stmt::For(f) => convert_for(index, f),
        ast::Stmt::Expr(e) => convert_expr_stmt(index, e),
        ast::Stmt::Assert(a) => convert_assert(index, a),
        ast::Stmt::Pass(p) => Ok(Stmt::Pass(loc_of(index, &p))),
        ast::Stmt::Break(b) => Ok(Stmt::Break(loc_of(index, &b))),
        ast::Stmt::Continue(c) => Ok(Stmt::Continue(loc_of(index, &c))),
        other => Err(unsupported_stmt(index, &other, "unsupported statement")),
    }
}

fn unsupported_stmt(index: &LineIndex, stmt: &ast::Stmt, msg: &str) -> TranslateError {
    TranslateError::new(ErrorKind::UnsupportedConstruct(msg.to_string()))
        .with_location(loc_of(index, &stmt))
}

fn convert_assign(index: &LineIndex, a: ast::StmtAssign) -> Result<Stmt, TranslateError> {
    let loc = loc_of(index, &a);
    if a.targets.len() != 1 {
        return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
            "chained assignment (a = b = c) is not supported".into(),
        ))
        .with_location(loc));
    }
    let target = convert_assign_target(index, a.targets.into_iter().next().unwrap(), loc)?;
    let value = convert_expr(index, *a.value)?;
    Ok(Stmt::Assign { target, value, loc })
}

/// `xs = v` converts straight to `Name`; `xs[i] = v` converts to `Subscript`
/// regardless of whether `xs` turns out to be a list or a dict -- the two
/// share the same Python syntax, so only `type_inference` (which knows
/// `xs`'s resolved type) can promote the dict case to `DictKey`.
fn convert_assign_target(
    index: &LineIndex,
    target: ast::Expr,
    loc: SourceLocation,
) -> Result<AssignTarget, TranslateError> {
    match target {
        ast::Expr::Name(n) => Ok(AssignTarget::Name(n.id.to_string())),
        ast::Expr::Subscript(s) => {
            let base = Box::new(convert_expr(index, *s.value)?);
            let ast::Expr::Slice(_) = s.slice.as_ref() else {
                let index_expr = Box::new(convert_expr(index, *s.slice)?);
                return Ok(AssignTarget::Subscript { base, index: index_expr });
            };
            Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
                "slice assignment is not supported".into(),
            ))
            .with_location(loc))
        }
        _ => Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
            "assignment target must be a plain name or a single subscript".into(),
        ))
        .with_location(loc)),
    }
}

fn convert_aug_assign(index: &LineIndex, a: ast::StmtAugAssign) -> Result<Stmt, TranslateError> {
    let loc = loc_of(index, &a);
    let ast::Expr::Name(target) = a.target.as_ref() else {
        return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
            "augmented assignment target must be a plain name".into(),
        ))
        .with_location(loc));
    };
    let op = convert_binop(&a.op, loc)?;
    let value = convert_expr(index, *a.value)?;
    Ok(Stmt::AugAssign {
        target: target.id.to_string(),
        op,
        value,
        loc,
    })
}

fn convert_return(index: &LineIndex, r: ast::StmtReturn) -> Result<Stmt, TranslateError> {
    let loc = loc_of(index, &r);
    let value = r.value.map(|v| convert_expr(index, *v)).transpose()?;
    Ok(Stmt::Return { value, loc })
}

fn convert_if(index: &LineIndex, i: ast::StmtIf) -> Result<Stmt, TranslateError> {
    let loc = loc_of(index, &i);
    let condition = convert_expr(index, *i.test)?;
    let then_body = convert_body(index, i.body)?;
    let else_body = if i.orelse.is_empty() {
        None
    } else {
        Some(convert_body(index, i.orelse)?)
    };
    Ok(Stmt::If {
        condition,
        then_body,
        else_body,
        loc,
    })
}

fn convert_while(index: &LineIndex, w: ast::StmtWhile) -> Result<Stmt, TranslateError> {
    let loc = loc_of(index, &w);
    let condition = convert_expr(index, *w.test)?;
    let body = convert_body(index, w.body)?;
    Ok(Stmt::While { condition, body, loc })
}

/// `for x in range(start, stop, step)` lowers straight to `ForRange`; any
/// other iterable lowers to `ForContainer` ((c)).
fn convert_for(index: &LineIndex, f: ast::StmtFor) -> Result<Stmt, TranslateError> {
    let loc = loc_of(index, &f);
    let ast::Expr::Name(var) = f.target.as_ref() else {
        return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
            "for-loop target must be a plain name".into(),
        ))
        .with_location(loc));
    };
    let body = convert_body(index, f.body)?;
    if let ast::Expr::Call(call) = f.iter.as_ref() {
        if let ast::Expr::Name(n) = call.func.as_ref() {
            if n.id.as_str() == "range" {
                let (start, stop, step) = range_call_args(index, call, loc)?;
                return Ok(Stmt::ForRange {
                    var: var.id.to_string(),
                    start,
                    stop,
                    step,
                    body,
                    loc,
                });
            }
        }
    }
    let iter = convert_expr(index, *f.iter)?;
    Ok(Stmt::ForContainer {
        var: var.id.to_string(),
        iter,
        body,
        loc,
    })
}

fn range_call_args(
    index: &LineIndex,
    call: &ast::ExprCall,
    loc: SourceLocation,
) -> Result<(TypedExpr, TypedExpr, TypedExpr), TranslateError> {
    let int_lit = |v: i64| TypedExpr::new(ExprKind::Literal(Literal::Int(v)), Type::default_int(), loc);
    match call.args.len() {
        1 => {
            let stop = convert_expr(index, call.args[0].clone())?;
            Ok((int_lit(0), stop, int_lit(1)))
        }
        2 => {
            let start = convert_expr(index, call.args[0].clone())?;
            let stop = convert_expr(index, call.args[1].clone())?;
            Ok((start, stop, int_lit(1)))
        }
        3 => {
            let start = convert_expr(index, call.args[0].clone())?;
            let stop = convert_expr(index, call.args[1].clone())?;
            let step = convert_expr(index, call.args[2].clone())?;
            Ok((start, stop, step))
        }
        _ => Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
            "range() takes 1 to 3 arguments".into(),
        ))
        .with_location(loc)),
    }
}

fn convert_expr_stmt(index: &LineIndex, e: ast::StmtExpr) -> Result<Stmt, TranslateError> {
    let loc = loc_of(index, &e);
    let value = convert_expr(index, *e.value)?;
    Ok(Stmt::ExprStmt { value, loc })
}

fn convert_assert(index: &LineIndex, a: ast::StmtAssert) -> Result<Stmt, TranslateError> {
    let loc = loc_of(index, &a);
    let condition = convert_expr(index, *a.test)?;
    let message = a.msg.map(|m| convert_expr(index, *m)).transpose()?;
    Ok(Stmt::Assert {
        condition,
        message,
        loc,
    })
}

fn convert_expr(index: &LineIndex, expr: ast::Expr) -> Result<TypedExpr, TranslateError> {
    let loc = loc_of(index, &expr);
    match expr {
        ast::Expr::Constant(c) => convert_constant(c, loc),
        ast::Expr::Name(n) => Ok(TypedExpr::new(ExprKind::Name(n.id.to_string()), Type::Unknown, loc)),
        ast::Expr::BinOp(b) => convert_binop_expr(index, b, loc),
        ast::Expr::UnaryOp(u) => convert_unaryop_expr(index, u, loc),
        ast::Expr::BoolOp(b) => convert_boolop_expr(index, b, loc),
        ast::Expr::Compare(c) => convert_compare_expr(index, c, loc),
        ast::Expr::Call(c) => convert_call_expr(index, c, loc),
        ast::Expr::Subscript(s) => convert_subscript_expr(index, s, loc),
        ast::Expr::Attribute(a) => convert_attribute_expr(index, a, loc),
        ast::Expr::List(l) => convert_list_expr(index, l, loc),
        ast::Expr::Set(s) => convert_set_expr(index, s, loc),
        ast::Expr::Dict(d) => convert_dict_expr(index, d, loc),
        ast::Expr::ListComp(c) => convert_list_comp(index, c, loc),
        ast::Expr::SetComp(c) => convert_set_comp(index, c, loc),
        ast::Expr::DictComp(c) => convert_dict_comp(index, c, loc),
        other => Err(TranslateError::new(ErrorKind::UnsupportedConstruct(format!(
            "unsupported expression: {other:?}"
        )))
        .with_location(loc)),
    }
}

fn convert_constant(c: ast::ExprConstant, loc: SourceLocation) -> Result<TypedExpr, TranslateError> {
    let (lit, ty) = match &c.value {
        ast::Constant::Int(i) => {
            let v: i64 = i.try_into().map_err(|_| {
                TranslateError::new(ErrorKind::UnsupportedConstruct(
                    "integer literal does not fit in 64 bits".into(),
                ))
                .with_location(loc)
            })?;
            (Literal::Int(v), Type::default_int())
        }
        ast::Constant::Float(f) => (Literal::Float(*f), Type::default_float()),
        ast::Constant::Bool(b) => (Literal::Bool(*b), Type::Bool),
        ast::Constant::Str(s) => (Literal::Str(s.to_string()), Type::CStr),
        ast::Constant::None => (Literal::Null, Type::Void),
        other => {
            return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(format!(
                "unsupported literal: {other:?}"
            )))
            .with_location(loc))
        }
    };
    Ok(TypedExpr::new(ExprKind::Literal(lit), ty, loc))
}

fn convert_binop_expr(
    index: &LineIndex,
    b: ast::ExprBinOp,
    loc: SourceLocation,
) -> Result<TypedExpr, TranslateError> {
    let op = convert_binop(&b.op, loc)?;
    let left = Box::new(convert_expr(index, *b.left)?);
    let right = Box::new(convert_expr(index, *b.right)?);
    Ok(TypedExpr::new(ExprKind::Binary { op, left, right }, Type::Unknown, loc))
}

fn convert_unaryop_expr(
    index: &LineIndex,
    u: ast::ExprUnaryOp,
    loc: SourceLocation,
) -> Result<TypedExpr, TranslateError> {
    let op = match u.op {
        ast::UnaryOp::Not => UnaryOp::Not,
        ast::UnaryOp::UAdd => UnaryOp::Pos,
        ast::UnaryOp::USub => UnaryOp::Neg,
        ast::UnaryOp::Invert => UnaryOp::BitNot,
    };
    let operand = Box::new(convert_expr(index, *u.operand)?);
    Ok(TypedExpr::new(ExprKind::Unary { op, operand }, Type::Unknown, loc))
}

fn convert_boolop_expr(
    index: &LineIndex,
    b: ast::ExprBoolOp,
    loc: SourceLocation,
) -> Result<TypedExpr, TranslateError> {
    let op = match b.op {
        ast::BoolOp::And => BoolOp::And,
        ast::BoolOp::Or => BoolOp::Or,
    };
    let values = b
        .values
        .into_iter()
        .map(|v| convert_expr(index, v))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TypedExpr::new(ExprKind::BoolOp { op, values }, Type::Bool, loc))
}

/// A chained comparison `a < b < c` expands to `(a < b) and (b < c)` at the
/// point of conversion rather
/// than surviving as its own IR node, so later passes only ever see binary
/// `Compare` nodes.
fn convert_compare_expr(
    index: &LineIndex,
    c: ast::ExprCompare,
    loc: SourceLocation,
) -> Result<TypedExpr, TranslateError> {
    let left = convert_expr(index, *c.left)?;
    let mut operands = Vec::with_capacity(c.comparators.len());
    for comparator in c.comparators {
        operands.push(convert_expr(index, comparator)?);
    }
    let mut pairs = Vec::with_capacity(c.ops.len());
    let mut prev = left;
    for (op, rhs) in c.ops.iter().zip(operands.into_iter()) {
        let cmp_op = convert_cmpop(op);
        let pair = TypedExpr::new(
            ExprKind::Compare {
                op: cmp_op,
                left: Box::new(prev.clone()),
                right: Box::new(rhs.clone()),
            },
            Type::Bool,
            loc,
        );
        pairs.push(pair);
        prev = rhs;
    }
    if pairs.len() == 1 {
        Ok(pairs.into_iter().next().unwrap())
    } else {
        Ok(TypedExpr::new(
            ExprKind::BoolOp {
                op: BoolOp::And,
                values: pairs,
            },
            Type::Bool,
            loc,
        ))
    }
}

fn convert_call_expr(
    index: &LineIndex,
    c: ast::ExprCall,
    loc: SourceLocation,
) -> Result<TypedExpr, TranslateError> {
    let args = c
        .args
        .into_iter()
        .map(|a| convert_expr(index, a))
        .collect::<Result<Vec<_>, _>>()?;
    if let ast::Expr::Attribute(attr) = c.func.as_ref() {
        let object = convert_expr(index, attr.value.as_ref().clone())?;
        return Ok(TypedExpr::new(
            ExprKind::MethodCall {
                object: Box::new(object),
                method: attr.attr.to_string(),
                args,
            },
            Type::Unknown,
            loc,
        ));
    }
    let ast::Expr::Name(n) = c.func.as_ref() else {
        return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
            "only simple and method calls are supported".into(),
        ))
        .with_location(loc));
    };
    Ok(TypedExpr::new(
        ExprKind::Call {
            func: n.id.to_string(),
            args,
        },
        Type::Unknown,
        loc,
    ))
}

fn convert_subscript_expr(
    index: &LineIndex,
    s: ast::ExprSubscript,
    loc: SourceLocation,
) -> Result<TypedExpr, TranslateError> {
    let base = Box::new(convert_expr(index, *s.value)?);
    match *s.slice {
        ast::Expr::Slice(slice) => {
            let start = slice.lower.map(|e| convert_expr(index, *e)).transpose()?.map(Box::new);
            let stop = slice.upper.map(|e| convert_expr(index, *e)).transpose()?.map(Box::new);
            let step = slice.step.map(|e| convert_expr(index, *e)).transpose()?.map(Box::new);
            Ok(TypedExpr::new(
                ExprKind::Slice { base, start, stop, step },
                Type::Unknown,
                loc,
            ))
        }
        other => {
            let index_expr = Box::new(convert_expr(index, other)?);
            Ok(TypedExpr::new(
                ExprKind::Subscript { base, index: index_expr },
                Type::Unknown,
                loc,
            ))
        }
    }
}

fn convert_attribute_expr(
    index: &LineIndex,
    a: ast::ExprAttribute,
    loc: SourceLocation,
) -> Result<TypedExpr, TranslateError> {
    let value = Box::new(convert_expr(index, *a.value)?);
    Ok(TypedExpr::new(
        ExprKind::Attribute {
            value,
            attr: a.attr.to_string(),
        },
        Type::Unknown,
        loc,
    ))
}

fn convert_list_expr(index: &LineIndex, l: ast::ExprList, loc: SourceLocation) -> Result<TypedExpr, TranslateError> {
    let elts = l
        .elts
        .into_iter()
        .map(|e| convert_expr(index, e))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TypedExpr::new(
        ExprKind::Container(ContainerLiteral::List(elts)),
        Type::Unknown,
        loc,
    ))
}

fn convert_set_expr(index: &LineIndex, s: ast::ExprSet, loc: SourceLocation) -> Result<TypedExpr, TranslateError> {
    let elts = s
        .elts
        .into_iter()
        .map(|e| convert_expr(index, e))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TypedExpr::new(
        ExprKind::Container(ContainerLiteral::Set(elts)),
        Type::Unknown,
        loc,
    ))
}

fn convert_dict_expr(index: &LineIndex, d: ast::ExprDict, loc: SourceLocation) -> Result<TypedExpr, TranslateError> {
    let mut entries = Vec::new();
    for (k, v) in d.keys.into_iter().zip(d.values.into_iter()) {
        let Some(key) = k else {
            return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
                "dict unpacking (`**other`) is not supported".into(),
            ))
            .with_location(loc));
        };
        entries.push((convert_expr(index, key)?, convert_expr(index, v)?));
    }
    Ok(TypedExpr::new(
        ExprKind::Container(ContainerLiteral::Dict(entries)),
        Type::Unknown,
        loc,
    ))
}

fn convert_list_comp(
    index: &LineIndex,
    c: ast::ExprListComp,
    loc: SourceLocation,
) -> Result<TypedExpr, TranslateError> {
    let comp = convert_comprehension(index, pyforge_ir::ComprehensionKind::List, *c.elt, c.generators, loc)?;
    Ok(TypedExpr::new(ExprKind::Comprehension(comp), Type::Unknown, loc))
}

fn convert_set_comp(
    index: &LineIndex,
    c: ast::ExprSetComp,
    loc: SourceLocation,
) -> Result<TypedExpr, TranslateError> {
    let comp = convert_comprehension(index, pyforge_ir::ComprehensionKind::Set, *c.elt, c.generators, loc)?;
    Ok(TypedExpr::new(ExprKind::Comprehension(comp), Type::Unknown, loc))
}

fn convert_dict_comp(
    index: &LineIndex,
    c: ast::ExprDictComp,
    loc: SourceLocation,
) -> Result<TypedExpr, TranslateError> {
    let value = Box::new(convert_expr(index, *c.value)?);
    let comp = convert_comprehension(
        index,
        pyforge_ir::ComprehensionKind::Dict { value },
        *c.key,
        c.generators,
        loc,
    )?;
    Ok(TypedExpr::new(ExprKind::Comprehension(comp), Type::Unknown, loc))
}

fn convert_comprehension(
    index: &LineIndex,
    kind: pyforge_ir::ComprehensionKind,
    elt: ast::Expr,
    generators: Vec<ast::Comprehension>,
    loc: SourceLocation,
) -> Result<pyforge_ir::Comprehension, TranslateError> {
    if generators.len() != 1 {
        return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
            "only single-clause comprehensions (one `for`) are supported".into(),
        ))
        .with_location(loc));
    }
    let gen = generators.into_iter().next().unwrap();
    if gen.is_async {
        return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
            "async comprehensions are not supported".into(),
        ))
        .with_location(loc));
    }
    let ast::Expr::Name(target) = &gen.target else {
        return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
            "comprehension target must be a plain name".into(),
        ))
        .with_location(loc));
    };
    let element = Box::new(convert_expr(index, elt)?);
    let iter = Box::new(convert_expr(index, gen.iter)?);
    let condition = match gen.ifs.len() {
        0 => None,
        1 => Some(Box::new(convert_expr(index, gen.ifs.into_iter().next().unwrap())?)),
        _ => {
            return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
                "at most one `if` clause per comprehension is supported".into(),
            ))
            .with_location(loc))
        }
    };
    Ok(pyforge_ir::Comprehension {
        kind,
        element,
        target: target.id.to_string(),
        iter,
        condition,
    })
}

fn convert_binop(op: &ast::Operator, loc: SourceLocation) -> Result<BinOp, TranslateError> {
    Ok(match op {
        ast::Operator::Add => BinOp::Add,
        ast::Operator::Sub => BinOp::Sub,
        ast::Operator::Mult => BinOp::Mul,
        ast::Operator::Div => BinOp::Div,
        ast::Operator::FloorDiv => BinOp::FloorDiv,
        ast::Operator::Mod => BinOp::Mod,
        ast::Operator::Pow => BinOp::Pow,
        ast::Operator::BitAnd => BinOp::BitAnd,
        ast::Operator::BitOr => BinOp::BitOr,
        ast::Operator::BitXor => BinOp::BitXor,
        ast::Operator::LShift => BinOp::LShift,
        ast::Operator::RShift => BinOp::RShift,
        ast::Operator::MatMult => {
            return Err(TranslateError::new(ErrorKind::UnsupportedConstruct(
                "matrix multiplication (`@`) is not supported".into(),
            ))
            .with_location(loc))
        }
    })
}

fn convert_cmpop(op: &ast::CmpOp) -> CompareOp {
    match op {
        ast::CmpOp::Eq => CompareOp::Eq,
        ast::CmpOp::NotEq => CompareOp::NotEq,
        ast::CmpOp::Lt => CompareOp::Lt,
        ast::CmpOp::LtE => CompareOp::LtEq,
        ast::CmpOp::Gt => CompareOp::Gt,
        ast::CmpOp::GtE => CompareOp::GtEq,
        ast::CmpOp::In => CompareOp::In,
        ast::CmpOp::NotIn => CompareOp::NotIn,
        // `is`/`is not` degrade to value equality: the supported subset has
        // no object-identity concept once lowered to C value types.
        ast::CmpOp::Is => CompareOp::Eq,
        ast::CmpOp::IsNot => CompareOp::NotEq,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(source: &str) -> TypedModule {
        let module = parse_source(source, "<test>").unwrap();
        convert_module(module, source).unwrap()
    }

    #[test]
    fn converts_simple_function() {
        let m = build("def add(a: int, b: int) -> int:\n    return a + b\n");
        let f = m.find_function("add").unwrap();
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.ret_type, Type::I32);
        assert_eq!(f.body.len(), 1);
    }

    #[test]
    fn rejects_star_args() {
        let module = parse_source("def f(*args):\n    pass\n", "<test>").unwrap();
        let err = convert_module(module, "def f(*args):\n    pass\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnsupportedConstruct(_)));
    }

    #[test]
    fn chained_comparison_expands_to_boolop_of_compares() {
        let m = build("def f(a: int, b: int, c: int) -> bool:\n    return a < b < c\n");
        let f = m.find_function("f").unwrap();
        let Stmt::Return { value: Some(v), .. } = &f.body[0] else { panic!() };
        assert!(matches!(v.kind, ExprKind::BoolOp { op: BoolOp::And, .. }));
    }

    #[test]
    fn range_for_loop_becomes_for_range() {
        let m = build("def f(n: int) -> int:\n    total = 0\n    for i in range(n):\n        total += i\n    return total\n");
        let f = m.find_function("f").unwrap();
        assert!(matches!(f.body[1], Stmt::ForRange { .. }));
    }

    #[test]
    fn reads_pragma_above_function() {
        let m = build("# pyforge: bounds=elided\ndef f(n: int) -> int:\n    return n\n");
        let f = m.find_function("f").unwrap();
        assert_eq!(
            f.annotations.bounds_checking,
            pyforge_annotations::BoundsChecking::Elided
        );
    }
}
