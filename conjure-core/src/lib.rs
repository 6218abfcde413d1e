//! Conjure core: container metadata, parameter binding, activation and interception.

pub mod binder;
pub mod controller;
pub mod loader;
pub mod metadata;
pub mod registry;
pub mod signature;
pub mod transformer;
pub mod value;
pub mod wrapper;

pub use binder::{bind_parameters, CastParameters, ParameterMetadata, SourceType};
pub use controller::{ActivationGraph, Controller};
pub use loader::{Callable, Loader, NativeFn, SymbolTable};
pub use metadata::{
    ContainerKind, ContainerMeta, Definition, Event, Interception, ParameterCollection,
    SELF_REFERENCE,
};
pub use registry::{Locator, Registry, RegistryBuilder};
pub use signature::{FormalParameter, ParamKind, Signature, TypeTag};
pub use transformer::{Transformer, TypeTransformer};
pub use value::{Arguments, BoundArguments, Component, Instance, Object, Value};
pub use wrapper::Wrapper;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("unknown container: {0}")]
    UnknownContainer(String),
    #[error("container {0} is registered more than once")]
    DuplicateContainer(String),
    #[error("duplicate parameter name: {0}")]
    DuplicateParameter(String),
    #[error("cannot load symbol: {0}")]
    Load(String),
    #[error("container {container}: no make method {method} on the factory")]
    MissingMakeMethod { container: String, method: String },
    #[error("container {0} did not resolve to an object")]
    NotAnObject(String),
    #[error("container {container}: missing parameters: {}", .missing.join(", "))]
    MissingParameters { container: String, missing: Vec<String> },
    #[error("{container}: given {given}({value}), expected {expected}, for {parameter}")]
    UnexpectedDefinitionType {
        container: String,
        given: String,
        value: String,
        expected: String,
        parameter: String,
    },
    #[error("container {container}: failed to interpret {target}: {reason}")]
    ValueInterpretation {
        container: String,
        target: String,
        reason: String,
    },
    #[error("cast error: {0}")]
    Cast(String),
    #[error("invocation error: {0}")]
    Invocation(String),
    #[error("{type_name} has no method {method}")]
    NoSuchMethod { type_name: String, method: String },
    #[error("circular activation of container {0}")]
    CircularActivation(String),
    #[error("container {0} cannot be intercepted")]
    NotInterceptable(String),
    #[error("the registry backing container {0} has been dropped")]
    Detached(String),
    #[error("component error: {0}")]
    Component(String),
}
