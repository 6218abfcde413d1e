//! Assembler: configuration files to container metadata to a [`Registry`].

pub mod creators;
pub mod document;
pub mod parser;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use conjure_core::{ContainerMeta, CoreError, Loader, Registry, Transformer};

pub use creators::{ContainerCreator, EntityCreator, FactorizationCreator, LambdaCreator};
pub use parser::{ConfigParser, JsonParser};

#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("incompatible block: {0}")]
    IncompatibleBlock(String),
    #[error("no parser handles {}", .0.display())]
    UnsupportedConfigFile(PathBuf),
    #[error("container {id}: {source}")]
    InContainer {
        id: String,
        #[source]
        source: CoreError,
    },
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Collects container metadata from configuration files.
///
/// Files are merged in load order: a container whose id was already loaded
/// replaces the earlier definition in place.
pub struct Assembler {
    parsers: Vec<Box<dyn ConfigParser>>,
    containers: Vec<ContainerMeta>,
    transformer: Option<Arc<dyn Transformer>>,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            parsers: vec![Box::new(JsonParser::new())],
            containers: Vec::new(),
            transformer: None,
        }
    }

    pub fn with_parser(mut self, parser: Box<dyn ConfigParser>) -> Self {
        self.parsers.push(parser);
        self
    }

    /// Transformer for the built registry; the core's type transformer otherwise.
    pub fn with_transformer(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    pub fn load<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<(), AssemblyError> {
        for path in paths {
            let path = path.as_ref();
            let mut handled = false;
            for parser in self.parsers.iter().filter(|p| p.can_handle(path)) {
                handled = true;
                let parsed = parser.parse(path)?;
                debug!(path = %path.display(), containers = parsed.len(), "loaded configuration");
                merge(&mut self.containers, parsed);
            }
            if !handled {
                return Err(AssemblyError::UnsupportedConfigFile(path.to_path_buf()));
            }
        }
        Ok(())
    }

    /// Merge metadata from an in-memory JSON document.
    pub fn load_json(&mut self, text: &str) -> Result<(), AssemblyError> {
        let parsed = JsonParser::new().parse_str(text)?;
        merge(&mut self.containers, parsed);
        Ok(())
    }

    pub fn containers(&self) -> &[ContainerMeta] {
        &self.containers
    }

    pub fn build(&self, loader: Arc<dyn Loader>) -> Result<Arc<Registry>, AssemblyError> {
        let mut builder = Registry::builder(loader).containers(self.containers.iter().cloned());
        if let Some(transformer) = &self.transformer {
            builder = builder.transformer(Arc::clone(transformer));
        }
        let registry = builder.build()?;
        info!(containers = self.containers.len(), "registry assembled");
        Ok(registry)
    }
}

fn merge(containers: &mut Vec<ContainerMeta>, parsed: Vec<ContainerMeta>) {
    for meta in parsed {
        match containers.iter_mut().find(|c| c.id == meta.id) {
            Some(existing) => {
                debug!(container = %meta.id, "container redefined");
                *existing = meta;
            }
            None => containers.push(meta),
        }
    }
}
