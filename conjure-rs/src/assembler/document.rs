//! JSON configuration document: containers, their parameters and interceptions.

use serde::Deserialize;
use serde_json::Value as Json;

use conjure_core::{Definition, Event, Interception, ParameterCollection};

use super::AssemblyError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    pub containers: Vec<ContainerNode>,
}

/// One container block. Which of `class`, `with` and `call` are needed depends on `kind`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerNode {
    pub kind: String,
    pub id: Option<String>,
    pub class: Option<String>,
    pub with: Option<String>,
    pub call: Option<String>,
    #[serde(default)]
    pub params: Vec<ParamNode>,
    #[serde(default)]
    pub interceptions: Vec<InterceptionNode>,
    /// Make a fresh instance on every lookup.
    #[serde(default)]
    pub factory_mode: bool,
    /// Forbid other containers from intercepting this one.
    #[serde(default)]
    pub no_interruption: bool,
}

/// A parameter; keyword when `name` is set, positional otherwise.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamNode {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: Option<Json>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
}

/// Exactly one of the event keys names the actor.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterceptionNode {
    pub before: Option<String>,
    pub pre: Option<String>,
    pub post: Option<String>,
    pub after: Option<String>,
    #[serde(rename = "do")]
    pub intercepted_method: String,
    #[serde(rename = "with")]
    pub handling_method: String,
    #[serde(default)]
    pub params: Vec<ParamNode>,
}

impl ParamNode {
    fn definition(&self, index: usize) -> Result<Definition, AssemblyError> {
        match (&self.reference, &self.kind, &self.value) {
            (Some(_), _, Some(_)) => Err(AssemblyError::IncompatibleBlock(format!(
                "parameter #{} has both a value and a ref",
                index
            ))),
            (Some(id), _, None) => Ok(Definition::reference(id)),
            (None, Some(kind), Some(value)) => {
                let raw = match value {
                    Json::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Ok(Definition::typed(kind, &raw))
            }
            (None, None, Some(value)) => Ok(Definition::literal(value.clone())),
            (None, _, None) => Err(AssemblyError::IncompatibleBlock(format!(
                "parameter #{} has neither a value nor a ref",
                index
            ))),
        }
    }
}

/// Build a parameter collection, rejecting duplicate names.
pub(crate) fn parameters(id: &str, nodes: &[ParamNode]) -> Result<ParameterCollection, AssemblyError> {
    let mut params = ParameterCollection::new();
    for (index, node) in nodes.iter().enumerate() {
        let definition = node.definition(index)?;
        match &node.name {
            Some(name) => params
                .insert(name, definition)
                .map_err(|source| AssemblyError::InContainer {
                    id: id.to_owned(),
                    source,
                })?,
            None => params.push(definition),
        }
    }
    Ok(params)
}

impl InterceptionNode {
    pub(crate) fn interception(&self, owner: &str) -> Result<Interception, AssemblyError> {
        let candidates = [
            (Event::Before, &self.before),
            (Event::Pre, &self.pre),
            (Event::Post, &self.post),
            (Event::After, &self.after),
        ];
        let mut found = None;
        for (event, actor) in candidates {
            let Some(actor) = actor else { continue };
            if found.is_some() {
                return Err(AssemblyError::IncompatibleBlock(format!(
                    "container {}: interception on {} declares more than one event",
                    owner, self.intercepted_method
                )));
            }
            found = Some((event, actor));
        }
        let (event, actor) = found.ok_or_else(|| {
            AssemblyError::IncompatibleBlock(format!(
                "container {}: interception on {} declares no event",
                owner, self.intercepted_method
            ))
        })?;

        Ok(Interception::new(
            event,
            actor,
            &self.intercepted_method,
            owner,
            &self.handling_method,
        )
        .with_params(parameters(owner, &self.params)?))
    }
}
