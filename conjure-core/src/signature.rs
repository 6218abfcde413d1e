//! Formal parameter lists of make-targets and methods, with optional declared types.

use serde::Serialize;

use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ParamKind {
    /// Ordinary named parameter; may be filled positionally or by keyword.
    Fixed,
    /// Catch-all for surplus positional values.
    VarPositional,
    /// Catch-all for keyword values naming no fixed parameter.
    VarKeyword,
}

/// Declared type of a parameter. `Opaque` stands for a declaration that cannot be checked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum TypeTag {
    Null,
    Bool,
    Integer,
    Number,
    String,
    Array,
    Map,
    Instance(String),
    Opaque(String),
}

impl TypeTag {
    /// Whether `value` satisfies the tag. `None` when the tag cannot be used for a check.
    pub fn check(&self, value: &Value) -> Option<bool> {
        use serde_json::Value as Json;

        let ok = match (self, value) {
            (TypeTag::Opaque(_), _) => return None,
            (TypeTag::Instance(name), Value::Object(instance)) => instance.type_name() == name,
            (TypeTag::Instance(_), Value::Data(_)) => false,
            (_, Value::Object(_)) => false,
            (TypeTag::Null, Value::Data(d)) => d.is_null(),
            (TypeTag::Bool, Value::Data(d)) => d.is_boolean(),
            (TypeTag::Integer, Value::Data(d)) => d.is_i64() || d.is_u64(),
            (TypeTag::Number, Value::Data(d)) => d.is_number(),
            (TypeTag::String, Value::Data(d)) => d.is_string(),
            (TypeTag::Array, Value::Data(d)) => matches!(d, Json::Array(_)),
            (TypeTag::Map, Value::Data(d)) => matches!(d, Json::Object(_)),
        };
        Some(ok)
    }

    pub fn name(&self) -> &str {
        match self {
            TypeTag::Null => "null",
            TypeTag::Bool => "bool",
            TypeTag::Integer => "int",
            TypeTag::Number => "float",
            TypeTag::String => "str",
            TypeTag::Array => "list",
            TypeTag::Map => "dict",
            TypeTag::Instance(name) | TypeTag::Opaque(name) => name,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FormalParameter {
    pub name: String,
    pub kind: ParamKind,
    pub default: Option<Value>,
    pub annotation: Option<TypeTag>,
}

impl FormalParameter {
    /// Fixed parameter without a default.
    pub fn required(&self) -> bool {
        self.kind == ParamKind::Fixed && self.default.is_none()
    }
}

/// Ordered formal parameters of a callable. Built with chained calls:
///
/// ```
/// use conjure_core::{Signature, TypeTag};
/// use serde_json::json;
///
/// let sig = Signature::new()
///     .param("name")
///     .param_with_default("greeting", json!("hello"))
///     .annotate("name", TypeTag::String)
///     .var_keyword("options");
/// assert_eq!(sig.fixed().count(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Signature {
    params: Vec<FormalParameter>,
}

impl Signature {
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    pub fn param(self, name: &str) -> Self {
        self.push(name, ParamKind::Fixed, None)
    }

    pub fn param_with_default(self, name: &str, default: impl Into<Value>) -> Self {
        self.push(name, ParamKind::Fixed, Some(default.into()))
    }

    pub fn var_positional(self, name: &str) -> Self {
        self.push(name, ParamKind::VarPositional, None)
    }

    pub fn var_keyword(self, name: &str) -> Self {
        self.push(name, ParamKind::VarKeyword, None)
    }

    /// Attach a declared type to an already declared parameter. Unknown names are ignored.
    pub fn annotate(mut self, name: &str, tag: TypeTag) -> Self {
        if let Some(p) = self.params.iter_mut().find(|p| p.name == name) {
            p.annotation = Some(tag);
        }
        self
    }

    fn push(mut self, name: &str, kind: ParamKind, default: Option<Value>) -> Self {
        self.params.push(FormalParameter {
            name: name.to_owned(),
            kind,
            default,
            annotation: None,
        });
        self
    }

    pub fn params(&self) -> &[FormalParameter] {
        &self.params
    }

    /// Parameters that can receive an individually named binding, in declaration order.
    pub fn fixed(&self) -> impl Iterator<Item = &FormalParameter> {
        self.params.iter().filter(|p| p.kind == ParamKind::Fixed)
    }

    pub fn accepts_var_positional(&self) -> bool {
        self.params.iter().any(|p| p.kind == ParamKind::VarPositional)
    }

    pub fn accepts_var_keyword(&self) -> bool {
        self.params.iter().any(|p| p.kind == ParamKind::VarKeyword)
    }
}
