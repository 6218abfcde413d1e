//! Values passed between containers: plain data or activated objects, plus call arguments.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::signature::Signature;
use crate::CoreError;

/// Activated component, shared by every holder of the container.
pub type Instance = Arc<dyn Object>;

/// Something with callable methods: an activated entity, a factory, or a [`Wrapper`](crate::Wrapper).
pub trait Object: Send + Sync {
    fn type_name(&self) -> &str;

    /// Formal parameters of `method`, or `None` when the object has no such method.
    fn signature(&self, method: &str) -> Option<Signature>;

    fn invoke(&self, method: &str, args: Arguments) -> Result<Value, CoreError>;
}

/// Data or object flowing through binding, activation and interception.
#[derive(Clone)]
pub enum Value {
    Data(serde_json::Value),
    Object(Instance),
}

impl Value {
    pub fn null() -> Self {
        Value::Data(serde_json::Value::Null)
    }

    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Data(d) => Some(d),
            Value::Object(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Value::Object(o) => Some(o),
            Value::Data(_) => None,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &str {
        use serde_json::Value as Json;

        match self {
            Value::Object(o) => o.type_name(),
            Value::Data(Json::Null) => "null",
            Value::Data(Json::Bool(_)) => "bool",
            Value::Data(Json::Number(n)) if n.is_f64() => "float",
            Value::Data(Json::Number(_)) => "int",
            Value::Data(Json::String(_)) => "str",
            Value::Data(Json::Array(_)) => "list",
            Value::Data(Json::Object(_)) => "dict",
        }
    }

    /// Same data, or the very same object.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Data(a), Value::Data(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(data: serde_json::Value) -> Self {
        Value::Data(data)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Object(instance)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Data(d) => write!(f, "{}", d),
            Value::Object(o) => write!(f, "<{} object>", o.type_name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Positional and keyword values for one call.
#[derive(Clone, Debug, Default)]
pub struct Arguments {
    pub args: Vec<Value>,
    pub kwargs: BTreeMap<String, Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(args: Vec<Value>) -> Self {
        Self {
            args,
            kwargs: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name.to_owned(), value.into());
        self
    }

    /// Match these arguments against `signature` the way a call site would:
    /// positional values fill fixed parameters in order, keywords fill by name,
    /// defaults cover what is left, catch-alls take the surplus.
    pub fn bind(self, signature: &Signature) -> Result<BoundArguments, CoreError> {
        let fixed: Vec<_> = signature.fixed().collect();
        let mut bound = BoundArguments::default();

        let mut positional = self.args.into_iter();
        for (param, value) in fixed.iter().zip(&mut positional) {
            bound.values.insert(param.name.clone(), value);
        }
        let surplus: Vec<Value> = positional.collect();
        if !surplus.is_empty() {
            if !signature.accepts_var_positional() {
                return Err(CoreError::Invocation(format!(
                    "takes {} positional arguments but {} were given",
                    fixed.len(),
                    fixed.len() + surplus.len()
                )));
            }
            bound.rest = surplus;
        }

        for (name, value) in self.kwargs {
            if fixed.iter().any(|p| p.name == name) {
                if bound.values.contains_key(&name) {
                    return Err(CoreError::Invocation(format!(
                        "got multiple values for argument {:?}",
                        name
                    )));
                }
                bound.values.insert(name, value);
            } else if signature.accepts_var_keyword() {
                bound.extra.insert(name, value);
            } else {
                return Err(CoreError::Invocation(format!(
                    "got an unexpected keyword argument {:?}",
                    name
                )));
            }
        }

        let mut missing = Vec::new();
        for param in &fixed {
            if bound.values.contains_key(&param.name) {
                continue;
            }
            match &param.default {
                Some(default) => {
                    bound.values.insert(param.name.clone(), default.clone());
                }
                None => missing.push(param.name.as_str()),
            }
        }
        if !missing.is_empty() {
            return Err(CoreError::Invocation(format!(
                "missing required arguments: {}",
                missing.join(", ")
            )));
        }

        Ok(bound)
    }
}

/// Arguments after [`Arguments::bind`]: every fixed parameter has a value.
#[derive(Clone, Debug, Default)]
pub struct BoundArguments {
    values: BTreeMap<String, Value>,
    rest: Vec<Value>,
    extra: BTreeMap<String, Value>,
}

impl BoundArguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Value, CoreError> {
        self.values
            .get(name)
            .ok_or_else(|| CoreError::Invocation(format!("no argument named {:?}", name)))
    }

    pub fn data(&self, name: &str) -> Option<&serde_json::Value> {
        self.get(name).and_then(Value::as_data)
    }

    pub fn object(&self, name: &str) -> Option<&Instance> {
        self.get(name).and_then(Value::as_object)
    }

    /// Values collected by the variadic-positional parameter.
    pub fn rest(&self) -> &[Value] {
        &self.rest
    }

    /// Values collected by the variadic-keyword parameter.
    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }
}

type MethodFn = Box<dyn Fn(BoundArguments) -> Result<Value, CoreError> + Send + Sync>;

/// An [`Object`] assembled from a method table. State lives in whatever the closures capture.
pub struct Component {
    type_name: String,
    methods: HashMap<String, (Signature, MethodFn)>,
}

impl Component {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_owned(),
            methods: HashMap::new(),
        }
    }

    pub fn method<F>(mut self, name: &str, signature: Signature, f: F) -> Self
    where
        F: Fn(BoundArguments) -> Result<Value, CoreError> + Send + Sync + 'static,
    {
        self.methods
            .insert(name.to_owned(), (signature, Box::new(f)));
        self
    }

    pub fn into_instance(self) -> Instance {
        Arc::new(self)
    }
}

impl Object for Component {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn signature(&self, method: &str) -> Option<Signature> {
        self.methods.get(method).map(|(sig, _)| sig.clone())
    }

    fn invoke(&self, method: &str, args: Arguments) -> Result<Value, CoreError> {
        let (signature, f) = self
            .methods
            .get(method)
            .ok_or_else(|| CoreError::NoSuchMethod {
                type_name: self.type_name.clone(),
                method: method.to_owned(),
            })?;
        f(args.bind(signature)?)
    }
}
