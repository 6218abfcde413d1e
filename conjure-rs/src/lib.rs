//! Conjure for Rust: configuration assembler and re-exports of conjure-core.

pub mod assembler;

pub use assembler::{Assembler, AssemblyError, ConfigParser, ContainerCreator, JsonParser};
pub use conjure_core::{
    Arguments, Callable, Component, ContainerKind, ContainerMeta, Controller, CoreError, Definition, Event,
    Instance, Interception, Loader, Locator, NativeFn, Object, ParameterCollection, Registry, RegistryBuilder,
    Signature, SymbolTable, Transformer, TypeTag, TypeTransformer, Value, Wrapper, SELF_REFERENCE,
};
