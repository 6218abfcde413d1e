//! Registry: one controller per container id, plus interceptions indexed by actor.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use tracing::debug;

use crate::controller::{ActivationGraph, Controller};
use crate::loader::Loader;
use crate::metadata::{ContainerMeta, Interception, SELF_REFERENCE};
use crate::transformer::{Transformer, TypeTransformer};
use crate::value::{Arguments, Value};
use crate::CoreError;

/// Lookup capability handed to controllers and wrappers.
pub trait Locator: Send + Sync {
    /// Activate (or fetch the cached instance of) container `id`.
    fn get(&self, id: &str) -> Result<Value, CoreError>;

    /// Interceptions whose actor is `id`, in declaration order.
    fn get_interceptions(&self, id: &str) -> Arc<[Interception]>;
}

/// Collects container metadata, validates the wiring, and builds a [`Registry`].
pub struct RegistryBuilder {
    containers: Vec<ContainerMeta>,
    loader: Arc<dyn Loader>,
    transformer: Arc<dyn Transformer>,
}

impl RegistryBuilder {
    pub fn new(loader: Arc<dyn Loader>) -> Self {
        Self {
            containers: Vec::new(),
            loader,
            transformer: Arc::new(TypeTransformer),
        }
    }

    pub fn transformer(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn container(mut self, metadata: ContainerMeta) -> Self {
        self.containers.push(metadata);
        self
    }

    pub fn containers(mut self, metadata: impl IntoIterator<Item = ContainerMeta>) -> Self {
        self.containers.extend(metadata);
        self
    }

    /// Fails on duplicate ids, interceptions naming unknown containers, and actors that refuse interception.
    pub fn build(self) -> Result<Arc<Registry>, CoreError> {
        let mut known = HashSet::new();
        for meta in &self.containers {
            if !known.insert(meta.id.as_str()) {
                return Err(CoreError::DuplicateContainer(meta.id.clone()));
            }
        }

        let mut by_actor: HashMap<String, Vec<Interception>> = HashMap::new();
        for meta in &self.containers {
            for interception in &meta.interceptions {
                let mut interception = interception.clone();
                if interception.actor == SELF_REFERENCE {
                    interception.actor = meta.id.clone();
                }
                if interception.handler == SELF_REFERENCE {
                    interception.handler = meta.id.clone();
                }

                for id in [&interception.actor, &interception.handler] {
                    if !known.contains(id.as_str()) {
                        return Err(CoreError::UnknownContainer(id.clone()));
                    }
                }
                let sealed = self
                    .containers
                    .iter()
                    .any(|m| m.id == interception.actor && !m.accepts_interceptions());
                if sealed {
                    return Err(CoreError::NotInterceptable(interception.actor));
                }

                by_actor
                    .entry(interception.actor.clone())
                    .or_default()
                    .push(interception);
            }
        }

        let order: Vec<String> = self.containers.iter().map(|m| m.id.clone()).collect();
        let interceptions: HashMap<String, Arc<[Interception]>> = by_actor
            .into_iter()
            .map(|(actor, list)| (actor, Arc::from(list)))
            .collect();
        let RegistryBuilder {
            containers,
            loader,
            transformer,
        } = self;

        debug!(containers = order.len(), "registry built");

        Ok(Arc::new_cyclic(|registry: &Weak<Registry>| {
            let locator: Weak<dyn Locator> = registry.clone();
            let graph = Arc::new(ActivationGraph::new());
            let controllers = containers
                .into_iter()
                .map(|meta| {
                    let id = meta.id.clone();
                    let controller = Controller::new(
                        meta,
                        locator.clone(),
                        Arc::clone(&loader),
                        Arc::clone(&transformer),
                        Arc::clone(&graph),
                    );
                    (id, controller)
                })
                .collect();
            Registry {
                controllers,
                interceptions,
                order,
            }
        }))
    }
}

/// Maps container ids to controllers. Controllers hold a weak back-reference to it.
pub struct Registry {
    controllers: HashMap<String, Controller>,
    interceptions: HashMap<String, Arc<[Interception]>>,
    order: Vec<String>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("order", &self.order)
            .field("interceptions", &self.interceptions)
            .finish_non_exhaustive()
    }
}

impl Registry {
    pub fn builder(loader: Arc<dyn Loader>) -> RegistryBuilder {
        RegistryBuilder::new(loader)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.controllers.contains_key(id)
    }

    pub fn controller(&self, id: &str) -> Option<&Controller> {
        self.controllers.get(id)
    }

    /// Container ids in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn activated(&self, id: &str) -> Result<bool, CoreError> {
        self.controllers
            .get(id)
            .map(Controller::activated)
            .ok_or_else(|| CoreError::UnknownContainer(id.to_owned()))
    }

    /// Activate container `id` and call `method` on it.
    pub fn call(&self, id: &str, method: &str, args: Arguments) -> Result<Value, CoreError> {
        let instance = self.get(id)?;
        let object = instance
            .as_object()
            .ok_or_else(|| CoreError::NotAnObject(id.to_owned()))?;
        object.invoke(method, args)
    }
}

impl Locator for Registry {
    fn get(&self, id: &str) -> Result<Value, CoreError> {
        self.controllers
            .get(id)
            .ok_or_else(|| CoreError::UnknownContainer(id.to_owned()))?
            .activate()
    }

    fn get_interceptions(&self, id: &str) -> Arc<[Interception]> {
        self.interceptions
            .get(id)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }
}
