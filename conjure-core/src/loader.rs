//! Symbol loader: resolves a fully-qualified name to something callable.

use std::collections::HashMap;
use std::sync::Arc;

use crate::signature::Signature;
use crate::value::{Arguments, BoundArguments, Value};
use crate::CoreError;

/// A make-target: an entity constructor or a free function.
pub trait Callable: Send + Sync {
    fn signature(&self) -> &Signature;

    fn call(&self, args: Arguments) -> Result<Value, CoreError>;
}

/// Resolves names like `app.service.Mailer` to a [`Callable`]. Injected into the registry.
pub trait Loader: Send + Sync {
    fn resolve(&self, name: &str) -> Result<Arc<dyn Callable>, CoreError>;
}

type NativeBody = Box<dyn Fn(BoundArguments) -> Result<Value, CoreError> + Send + Sync>;

/// Rust closure with a declared signature. Arguments are bound before the closure runs.
pub struct NativeFn {
    signature: Signature,
    body: NativeBody,
}

impl NativeFn {
    pub fn new<F>(signature: Signature, body: F) -> Self
    where
        F: Fn(BoundArguments) -> Result<Value, CoreError> + Send + Sync + 'static,
    {
        Self {
            signature,
            body: Box::new(body),
        }
    }
}

impl Callable for NativeFn {
    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn call(&self, args: Arguments) -> Result<Value, CoreError> {
        (self.body)(args.bind(&self.signature)?)
    }
}

/// Mapping-based loader: names registered up front.
#[derive(Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Arc<dyn Callable>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            symbols: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, name: &str, signature: Signature, body: F) -> &mut Self
    where
        F: Fn(BoundArguments) -> Result<Value, CoreError> + Send + Sync + 'static,
    {
        self.register_callable(name, Arc::new(NativeFn::new(signature, body)))
    }

    pub fn register_callable(&mut self, name: &str, callable: Arc<dyn Callable>) -> &mut Self {
        self.symbols.insert(name.to_owned(), callable);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }
}

impl Loader for SymbolTable {
    fn resolve(&self, name: &str) -> Result<Arc<dyn Callable>, CoreError> {
        self.symbols
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::Load(name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_symbol_is_a_load_error() {
        let table = SymbolTable::new();
        assert!(matches!(table.resolve("app.Nope"), Err(CoreError::Load(name)) if name == "app.Nope"));
    }

    #[test]
    fn registered_symbol_is_callable() {
        let mut table = SymbolTable::new();
        table.register("app.double", Signature::new().param("n"), |args| {
            let n = args.data("n").and_then(|v| v.as_i64()).unwrap_or_default();
            Ok(json!(n * 2).into())
        });
        assert!(table.contains("app.double"));
        assert!(!table.contains("app.triple"));
        let f = table.resolve("app.double").unwrap();
        let out = f.call(Arguments::new().arg(json!(21))).unwrap();
        assert_eq!(out.as_data(), Some(&json!(42)));
    }
}
