use serde::{Deserialize, Serialize};

/// The closed set of type tokens. Every IR
/// expression node carries one of these, or `Unknown` as a clearly-marked
/// inference failure per the section's invariant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    /// `char*` — a Python `str`.
    CStr,
    Void,
    /// Inference failure marker; never a valid type for code that reaches
    /// the emitter (`TypeInferenceError` is raised first).
    Unknown,
    List(Box<Type>),
    Dict(Box<Type>, Box<Type>),
    Set(Box<Type>),
    Struct(String),
    Function {
        params: Vec<Type>,
        ret: Box<Type>,
    },
}

impl Type {
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, Type::F32 | Type::F64)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Type::I8
                | Type::I16
                | Type::I32
                | Type::I64
                | Type::U8
                | Type::U16
                | Type::U32
                | Type::U64
        )
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Type::List(_) | Type::Dict(_, _) | Type::Set(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    /// Default literal-int width: `i64` unless a narrower width is
    /// demanded by the surrounding context.
    pub const fn default_int() -> Type {
        Type::I64
    }

    pub const fn default_float() -> Type {
        Type::F64
    }

    /// Arithmetic promotion rule from `i32 + f64 -> f64`, and in
    /// general any int/float mix promotes to the wider float, any two
    /// distinct integer widths promote to the wider of the two.
    pub fn promote(a: &Type, b: &Type) -> Type {
        if a == b {
            return a.clone();
        }
        match (a, b) {
            (Type::F64, other) | (other, Type::F64) if other.is_numeric() => Type::F64,
            (Type::F32, other) | (other, Type::F32) if other.is_numeric() => {
                if matches!(other, Type::F64) {
                    Type::F64
                } else {
                    Type::F32
                }
            }
            (x, y) if x.is_integer() && y.is_integer() => {
                if int_width(x) >= int_width(y) {
                    x.clone()
                } else {
                    y.clone()
                }
            }
            _ => Type::Unknown,
        }
    }

    /// HPCL element-type token used in monomorphized container names, e.g.
    /// `i32` -> `int32`, `char*` -> `cstr` ( naming scheme).
    pub fn hpcl_token(&self) -> String {
        match self {
            Type::I8 => "int8".into(),
            Type::I16 => "int16".into(),
            Type::I32 => "int32".into(),
            Type::I64 => "int64".into(),
            Type::U8 => "uint8".into(),
            Type::U16 => "uint16".into(),
            Type::U32 => "uint32".into(),
            Type::U64 => "uint64".into(),
            Type::F32 => "float32".into(),
            Type::F64 => "float64".into(),
            Type::Bool => "bool".into(),
            Type::CStr => "cstr".into(),
            Type::Struct(name) => name.to_lowercase(),
            Type::Void | Type::Unknown | Type::List(_) | Type::Dict(_, _) | Type::Set(_) => {
                // Containers of containers and void/unknown never become an
                // element token directly; callers normalize/reject earlier.
                "unknown".into()
            }
            Type::Function { .. } => "fnptr".into(),
        }
    }

    /// Emitted C spelling for a primitive/void/unknown scalar type. Containers
    /// and structs are rendered by the HPCL mapper / struct emitter instead.
    pub fn c_scalar_spelling(&self) -> &'static str {
        match self {
            Type::I8 => "int8_t",
            Type::I16 => "int16_t",
            Type::I32 => "int32_t",
            Type::I64 => "int64_t",
            Type::U8 => "uint8_t",
            Type::U16 => "uint16_t",
            Type::U32 => "uint32_t",
            Type::U64 => "uint64_t",
            Type::F32 => "float",
            Type::F64 => "double",
            Type::Bool => "bool",
            Type::CStr => "const char *",
            Type::Void => "void",
            Type::Unknown => "/* unknown */ void",
            Type::List(_) | Type::Dict(_, _) | Type::Set(_) | Type::Struct(_) | Type::Function { .. } => {
                "/* non-scalar */ void"
            }
        }
    }
}

fn int_width(ty: &Type) -> u8 {
    match ty {
        Type::I8 | Type::U8 => 8,
        Type::I16 | Type::U16 => 16,
        Type::I32 | Type::U32 => 32,
        Type::I64 | Type::U64 => 64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotes_int_and_float_to_float() {
        assert_eq!(Type::promote(&Type::I32, &Type::F64), Type::F64);
    }

    #[test]
    fn promotes_to_wider_int() {
        assert_eq!(Type::promote(&Type::I8, &Type::I64), Type::I64);
    }

    #[test]
    fn identical_types_promote_to_themselves() {
        assert_eq!(Type::promote(&Type::Bool, &Type::Bool), Type::Bool);
    }

    #[test]
    fn hpcl_tokens_match_naming_scheme() {
        assert_eq!(Type::I32.hpcl_token(), "int32");
        assert_eq!(Type::CStr.hpcl_token(), "cstr");
    }
}
