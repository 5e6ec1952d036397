use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Float,
    Bool,
    String,
    Nil,

    /// An instance of the named struct.
    Struct(String),

    // What declarations bind their names to
    Function(FunctionType),
    StructDef(StructType),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub parameters: Vec<Type>,
    pub ret_ty: Box<Type>,
}

impl FunctionType {
    pub fn new(parameters: Vec<Type>, ret_ty: Type) -> Self {
        Self {
            parameters,
            ret_ty: Box::new(ret_ty),
        }
    }
}

/// Field layout of a declared struct, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<(String, Type)>,
}

impl StructType {
    pub fn field(&self, name: &str) -> Option<&Type> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, ty)| ty)
    }
}

impl Type {
    /// Whether a value of type `other` may be stored where `self` is
    /// expected. `nil` fits anywhere.
    pub fn accepts(&self, other: &Type) -> bool {
        *other == Type::Nil || self == other
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    pub fn is_value(&self) -> bool {
        !matches!(self, Type::Function(_) | Type::StructDef(_))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Bool => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::Nil => write!(f, "nil"),
            Type::Struct(name) => write!(f, "{}", name),
            Type::Function(function_type) => {
                let parameters = function_type
                    .parameters
                    .iter()
                    .map(|ty| ty.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "fun({}) -> {}", parameters, function_type.ret_ty)
            }
            Type::StructDef(struct_type) => write!(f, "struct {}", struct_type.name),
        }
    }
}
