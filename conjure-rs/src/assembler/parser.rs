//! Configuration parsers. JSON is the only built-in format.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::debug;

use conjure_core::ContainerMeta;

use super::creators::{default_creators, ContainerCreator};
use super::document::{parameters, Document};
use super::AssemblyError;

/// A configuration format the assembler can read.
pub trait ConfigParser: Send + Sync {
    fn can_handle(&self, path: &Path) -> bool;

    fn parse(&self, path: &Path) -> Result<Vec<ContainerMeta>, AssemblyError>;
}

/// Reads `{"containers": [...]}` documents from `.json` files.
pub struct JsonParser {
    creators: Vec<Box<dyn ContainerCreator>>,
}

impl Default for JsonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonParser {
    pub fn new() -> Self {
        Self {
            creators: default_creators(),
        }
    }

    /// Register an extra creator; it is consulted after the built-in ones.
    pub fn with_creator(mut self, creator: Box<dyn ContainerCreator>) -> Self {
        self.creators.push(creator);
        self
    }

    pub fn parse_str(&self, text: &str) -> Result<Vec<ContainerMeta>, AssemblyError> {
        let document: Document = serde_json::from_str(text)?;
        let mut seen = HashSet::new();
        let mut containers = Vec::with_capacity(document.containers.len());

        for node in &document.containers {
            let id = node
                .id
                .as_deref()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| AssemblyError::IncompatibleBlock("container without an id".into()))?;
            if !seen.insert(id) {
                return Err(AssemblyError::IncompatibleBlock(format!(
                    "container {} is declared twice",
                    id
                )));
            }
            let creator = self
                .creators
                .iter()
                .find(|c| c.can_handle(&node.kind))
                .ok_or_else(|| {
                    AssemblyError::IncompatibleBlock(format!("container {}: unknown kind {:?}", id, node.kind))
                })?;

            let mut meta = creator.create(id, node, parameters(id, &node.params)?)?;
            for interception in &node.interceptions {
                meta = meta.with_interception(interception.interception(id)?);
            }
            let meta = meta
                .cacheable(!node.factory_mode)
                .interceptable(!node.no_interruption);
            debug!(
                container = %meta.id,
                kind = meta.kind.label(),
                interceptions = meta.interceptions.len(),
                "parsed container"
            );
            containers.push(meta);
        }
        Ok(containers)
    }
}

impl ConfigParser for JsonParser {
    fn can_handle(&self, path: &Path) -> bool {
        path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
    }

    fn parse(&self, path: &Path) -> Result<Vec<ContainerMeta>, AssemblyError> {
        let text = fs::read_to_string(path).map_err(|source| AssemblyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_str(&text)
    }
}
