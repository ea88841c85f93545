use crate::error::{ErrorKind, TranslateError};
use pyforge_ir::Type;
use rustpython_ast as ast;

/// Resolves a Python annotation expression to a [`Type`] token (
/// "Annotation resolution"), narrowed to the closed subset this translator
/// accepts: `Optional`/`Union`/`Protocol`/bare `Callable` have no C-shaped
/// representation here and are rejected rather than approximated.
pub struct TypeExtractor;

impl TypeExtractor {
    pub fn extract_return_type(annotation: &Option<Box<ast::Expr>>) -> Result<Type, TranslateError> {
        match annotation {
            Some(expr) => Self::extract_type(expr),
            None => Ok(Type::Void),
        }
    }

    pub fn extract_type(expr: &ast::Expr) -> Result<Type, TranslateError> {
        match expr {
            ast::Expr::Name(n) => Self::extract_simple_type(n.id.as_str()),
            ast::Expr::Subscript(s) => Self::extract_generic_type(s),
            ast::Expr::Constant(c) => match &c.value {
                ast::Constant::None => Ok(Type::Void),
                _ => Err(unsupported("only `None` constants are valid in type position")),
            },
            ast::Expr::Attribute(a) => Self::extract_simple_type(a.attr.as_str()),
            _ => Err(unsupported("unsupported type annotation shape")),
        }
    }

    fn extract_simple_type(name: &str) -> Result<Type, TranslateError> {
        match name {
            // A bare `int` annotation maps to C `int` (HPCL token
            // `int32`), not the wider literal-inference default -- only an
            // unannotated integer literal infers to `i64`.
            "int" => Ok(Type::I32),
            "float" => Ok(Type::default_float()),
            "bool" => Ok(Type::Bool),
            "str" => Ok(Type::CStr),
            "None" => Ok(Type::Void),
            "i8" => Ok(Type::I8),
            "i16" => Ok(Type::I16),
            "i32" => Ok(Type::I32),
            "i64" => Ok(Type::I64),
            "u8" => Ok(Type::U8),
            "u16" => Ok(Type::U16),
            "u32" => Ok(Type::U32),
            "u64" => Ok(Type::U64),
            "f32" => Ok(Type::F32),
            "f64" => Ok(Type::F64),
            other => Ok(Type::Struct(other.to_string())),
        }
    }

    fn extract_generic_type(s: &ast::ExprSubscript) -> Result<Type, TranslateError> {
        let ast::Expr::Name(base) = s.value.as_ref() else {
            return Err(unsupported("generic base must be a plain name"));
        };
        match base.id.as_str() {
            "List" | "list" => Ok(Type::List(Box::new(Self::extract_type(s.slice.as_ref())?))),
            "Set" | "set" => Ok(Type::Set(Box::new(Self::extract_type(s.slice.as_ref())?))),
            "Dict" | "dict" => Self::extract_dict_type(s),
            "Optional" | "Union" => Err(unsupported(
                "Optional/Union types have no C representation in this subset",
            )),
            other => Err(unsupported(&format!("unsupported generic base `{other}`"))),
        }
    }

    fn extract_dict_type(s: &ast::ExprSubscript) -> Result<Type, TranslateError> {
        let ast::Expr::Tuple(t) = s.slice.as_ref() else {
            return Err(unsupported("dict[...] requires exactly two type parameters"));
        };
        if t.elts.len() != 2 {
            return Err(unsupported("dict[...] requires exactly two type parameters"));
        }
        let key = Self::extract_type(&t.elts[0])?;
        let val = Self::extract_type(&t.elts[1])?;
        Ok(Type::Dict(Box::new(key), Box::new(val)))
    }
}

fn unsupported(msg: &str) -> TranslateError {
    TranslateError::new(ErrorKind::UnsupportedConstruct(msg.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustpython_parser::{parse, Mode};

    fn parse_expr(src: &str) -> ast::Expr {
        let module = parse(&format!("x: {src}\n"), Mode::Module, "<test>").unwrap();
        let ast::Mod::Module(m) = module else { panic!() };
        let ast::Stmt::AnnAssign(a) = &m.body[0] else { panic!() };
        a.annotation.as_ref().clone()
    }

    #[test]
    fn resolves_builtin_scalars() {
        assert_eq!(TypeExtractor::extract_type(&parse_expr("int")).unwrap(), Type::I32);
        assert_eq!(TypeExtractor::extract_type(&parse_expr("float")).unwrap(), Type::F64);
        assert_eq!(TypeExtractor::extract_type(&parse_expr("str")).unwrap(), Type::CStr);
    }

    #[test]
    fn resolves_list_of_int() {
        let ty = TypeExtractor::extract_type(&parse_expr("list[int]")).unwrap();
        assert_eq!(ty, Type::List(Box::new(Type::I32)));
    }

    #[test]
    fn resolves_dict_of_str_to_int() {
        let ty = TypeExtractor::extract_type(&parse_expr("dict[str, int]")).unwrap();
        assert_eq!(ty, Type::Dict(Box::new(Type::CStr), Box::new(Type::I32)));
    }

    #[test]
    fn rejects_optional() {
        let err = TypeExtractor::extract_type(&parse_expr("Optional[int]")).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnsupportedConstruct(_)));
    }
}
