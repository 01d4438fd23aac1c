//! Generator configuration.
//!
//! A JSON file lists which kernel serves each noise variant, plus the
//! request to run:
//!
//! ```json
//! {
//!   "generators": [{ "variant": "PERLIN_2D", "kernel": "kernels/perlin_2d.wgsl" }],
//!   "output": { "variant": "PERLIN_2D", "width": 256, "height": 256, "seed": "abc" }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gpu::BackendError;
use crate::kernel::{KernelBinding, KernelRegistry};
use crate::noise::NoiseVariant;
use crate::pipeline::GenerationRequest;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Kernel(#[from] BackendError),
}

fn default_entry_point() -> String {
    "main".to_string()
}

/// One generator list entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorEntry {
    pub variant: NoiseVariant,
    /// WGSL source, relative to the config file. `None` leaves the variant unbound.
    #[serde(default)]
    pub kernel: Option<PathBuf>,
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub generators: Vec<GeneratorEntry>,
    pub output: GenerationRequest,
}

impl GeneratorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and compiles every listed kernel, in list order.
    ///
    /// `compile` receives `(label, source, entry_point)`. Entries without a
    /// kernel become unbound bindings.
    pub fn build_registry<K, F>(&self, base_dir: &Path, mut compile: F) -> Result<KernelRegistry<K>, ConfigError>
    where
        F: FnMut(&str, &str, &str) -> Result<K, BackendError>,
    {
        let mut registry = KernelRegistry::new();
        for entry in &self.generators {
            let binding = match &entry.kernel {
                Some(relative) => {
                    let path = base_dir.join(relative);
                    let source = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                        path: path.clone(),
                        source,
                    })?;
                    log::debug!("Compiling {} from {}", entry.variant, path.display());
                    KernelBinding::new(entry.variant, compile(entry.variant.name(), &source, &entry.entry_point)?)
                }
                None => {
                    log::warn!("Generator {} has no kernel", entry.variant);
                    KernelBinding::unbound(entry.variant)
                }
            };
            registry.register(binding);
        }
        Ok(registry)
    }
}
