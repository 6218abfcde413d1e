//! Container metadata: what to activate, with which parameters, intercepted how.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::CoreError;

/// Actor id that refers to the container declaring the interception.
pub const SELF_REFERENCE: &str = "me";

/// One parameter definition, cast into a [`Value`](crate::Value) at activation time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Definition {
    Literal(serde_json::Value),
    /// Id of another container, activated when the parameter is cast.
    Reference(String),
    /// Raw text with a declared kind (`int`, `str`, `entity`, ...).
    Typed { kind: String, raw: String },
}

impl Definition {
    pub fn literal(value: serde_json::Value) -> Self {
        Definition::Literal(value)
    }

    pub fn reference(id: &str) -> Self {
        Definition::Reference(id.to_owned())
    }

    pub fn typed(kind: &str, raw: &str) -> Self {
        Definition::Typed {
            kind: kind.to_owned(),
            raw: raw.to_owned(),
        }
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Literal(v) => write!(f, "{}", v),
            Definition::Reference(id) => write!(f, "<container {}>", id),
            Definition::Typed { kind, raw } => write!(f, "{}({:?})", kind, raw),
        }
    }
}

/// Ordered positional definitions plus uniquely named keyword definitions.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ParameterCollection {
    sequence: Vec<Definition>,
    items: BTreeMap<String, Definition>,
}

impl ParameterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, definition: Definition) {
        self.sequence.push(definition);
    }

    /// Add a keyword definition. A name may appear only once.
    pub fn insert(&mut self, name: &str, definition: Definition) -> Result<(), CoreError> {
        if self.items.contains_key(name) {
            return Err(CoreError::DuplicateParameter(name.to_owned()));
        }
        self.items.insert(name.to_owned(), definition);
        Ok(())
    }

    pub fn with(mut self, definition: Definition) -> Self {
        self.push(definition);
        self
    }

    pub fn with_named(mut self, name: &str, definition: Definition) -> Result<Self, CoreError> {
        self.insert(name, definition)?;
        Ok(self)
    }

    pub fn sequence(&self) -> &[Definition] {
        &self.sequence
    }

    pub fn items(&self) -> &BTreeMap<String, Definition> {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty() && self.items.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Event {
    /// Before the call, with the handler's own parameters.
    Before,
    /// Before the call, with the call's arguments.
    Pre,
    /// After the call, threading the result through each handler.
    Post,
    /// After the call, with the handler's own parameters; runs even on failure.
    After,
}

impl Event {
    pub const ALL: [Event; 4] = [Event::Before, Event::Pre, Event::Post, Event::After];

    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Before => "before",
            Event::Pre => "pre",
            Event::Post => "post",
            Event::After => "after",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Event {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Event::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown interception event: {}", s))
    }
}

/// `handler.handling_method` runs on `event` around `actor.intercepted_method`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Interception {
    pub event: Event,
    pub actor: String,
    pub intercepted_method: String,
    pub handler: String,
    pub handling_method: String,
    pub handling_params: ParameterCollection,
}

impl Interception {
    pub fn new(event: Event, actor: &str, intercepted_method: &str, handler: &str, handling_method: &str) -> Self {
        Self {
            event,
            actor: actor.to_owned(),
            intercepted_method: intercepted_method.to_owned(),
            handler: handler.to_owned(),
            handling_method: handling_method.to_owned(),
            handling_params: ParameterCollection::new(),
        }
    }

    pub fn with_params(mut self, params: ParameterCollection) -> Self {
        self.handling_params = params;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContainerKind {
    /// Load `implementation` and call it.
    Entity { implementation: String },
    /// Activate `factory_id` and call its `factory_method`.
    Factorization { factory_id: String, factory_method: String },
    /// Load `callable` and call it. Never intercepted.
    Lambda { callable: String },
}

impl ContainerKind {
    pub fn label(&self) -> &'static str {
        match self {
            ContainerKind::Entity { .. } => "entity",
            ContainerKind::Factorization { .. } => "factorization",
            ContainerKind::Lambda { .. } => "callable",
        }
    }

    /// What the container makes its instance from, for listings.
    pub fn target(&self) -> String {
        match self {
            ContainerKind::Entity { implementation } => implementation.clone(),
            ContainerKind::Factorization {
                factory_id,
                factory_method,
            } => format!("{}.{}", factory_id, factory_method),
            ContainerKind::Lambda { callable } => callable.clone(),
        }
    }
}

/// Immutable description of one container.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContainerMeta {
    pub id: String,
    pub kind: ContainerKind,
    pub params: ParameterCollection,
    /// Interceptions declared by this container, which acts as their handler.
    pub interceptions: Vec<Interception>,
    pub cacheable: bool,
    /// False when no other container may intercept this one's methods.
    pub interceptable: bool,
}

impl ContainerMeta {
    pub fn new(id: &str, kind: ContainerKind) -> Self {
        Self {
            id: id.to_owned(),
            kind,
            params: ParameterCollection::new(),
            interceptions: Vec::new(),
            cacheable: true,
            interceptable: true,
        }
    }

    pub fn entity(id: &str, implementation: &str) -> Self {
        Self::new(
            id,
            ContainerKind::Entity {
                implementation: implementation.to_owned(),
            },
        )
    }

    pub fn factorization(id: &str, factory_id: &str, factory_method: &str) -> Self {
        Self::new(
            id,
            ContainerKind::Factorization {
                factory_id: factory_id.to_owned(),
                factory_method: factory_method.to_owned(),
            },
        )
    }

    pub fn lambda(id: &str, callable: &str) -> Self {
        Self::new(
            id,
            ContainerKind::Lambda {
                callable: callable.to_owned(),
            },
        )
    }

    pub fn with_params(mut self, params: ParameterCollection) -> Self {
        self.params = params;
        self
    }

    pub fn with_interception(mut self, interception: Interception) -> Self {
        self.interceptions.push(interception);
        self
    }

    pub fn cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable;
        self
    }

    pub fn interceptable(mut self, interceptable: bool) -> Self {
        self.interceptable = interceptable;
        self
    }

    pub fn is_lambda(&self) -> bool {
        matches!(self.kind, ContainerKind::Lambda { .. })
    }

    /// Whether this container may be named as an interception actor.
    pub fn accepts_interceptions(&self) -> bool {
        self.interceptable && !self.is_lambda()
    }
}
