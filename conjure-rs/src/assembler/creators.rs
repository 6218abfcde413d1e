//! One creator per container kind: checks the block's required keys, builds the metadata.

use conjure_core::{ContainerMeta, ParameterCollection};

use super::document::ContainerNode;
use super::AssemblyError;

/// Turns a container block of a given `kind` into metadata.
pub trait ContainerCreator: Send + Sync {
    fn can_handle(&self, kind: &str) -> bool;

    fn create(&self, id: &str, node: &ContainerNode, params: ParameterCollection) -> Result<ContainerMeta, AssemblyError>;
}

fn required<'a>(id: &str, key: &str, value: &'a Option<String>) -> Result<&'a str, AssemblyError> {
    value
        .as_deref()
        .ok_or_else(|| AssemblyError::IncompatibleBlock(format!("container {}: missing key {:?}", id, key)))
}

/// `{"kind": "entity", "class": "module.Type"}`
pub struct EntityCreator;

impl ContainerCreator for EntityCreator {
    fn can_handle(&self, kind: &str) -> bool {
        kind == "entity"
    }

    fn create(&self, id: &str, node: &ContainerNode, params: ParameterCollection) -> Result<ContainerMeta, AssemblyError> {
        let class = required(id, "class", &node.class)?;
        Ok(ContainerMeta::entity(id, class).with_params(params))
    }
}

/// `{"kind": "factorization", "with": "factory-id", "call": "make"}`; both spellings accepted.
pub struct FactorizationCreator;

impl ContainerCreator for FactorizationCreator {
    fn can_handle(&self, kind: &str) -> bool {
        matches!(kind, "factorization" | "factorisation")
    }

    fn create(&self, id: &str, node: &ContainerNode, params: ParameterCollection) -> Result<ContainerMeta, AssemblyError> {
        let factory = required(id, "with", &node.with)?;
        let method = required(id, "call", &node.call)?;
        Ok(ContainerMeta::factorization(id, factory, method).with_params(params))
    }
}

/// `{"kind": "callable", "with": "module.function"}`
pub struct LambdaCreator;

impl ContainerCreator for LambdaCreator {
    fn can_handle(&self, kind: &str) -> bool {
        kind == "callable"
    }

    fn create(&self, id: &str, node: &ContainerNode, params: ParameterCollection) -> Result<ContainerMeta, AssemblyError> {
        let callable = required(id, "with", &node.with)?;
        Ok(ContainerMeta::lambda(id, callable).with_params(params))
    }
}

pub fn default_creators() -> Vec<Box<dyn ContainerCreator>> {
    vec![Box::new(EntityCreator), Box::new(FactorizationCreator), Box::new(LambdaCreator)]
}
