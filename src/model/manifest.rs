use std::{collections::BTreeMap, path::Path};

use serde::Deserialize;

use crate::model::{specifier::ModuleSpecifier, ParseError};

/// Module name to raw specifier.
pub type Dependencies = BTreeMap<String, String>;

/// The JSON manifest listing the modules of a project.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub dependencies: Dependencies,
    #[serde(default)]
    pub dev_dependencies: Dependencies,
}

impl Manifest {
    pub fn from_file(path: &Path) -> Result<Manifest, ParseError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ParseError::IO {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents).map_err(|source| ParseError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_json_str(data: &str) -> Result<Manifest, serde_json::Error> {
        serde_json::from_str(data)
    }

    /// Union of `dependencies` and `devDependencies`; dev entries win on collision.
    pub fn dependencies(&self) -> Dependencies {
        let mut merged = self.dependencies.clone();
        merged.extend(
            self.dev_dependencies
                .iter()
                .map(|(name, raw)| (name.clone(), raw.clone())),
        );
        merged
    }

    pub fn specifiers(&self) -> Vec<ModuleSpecifier> {
        self.dependencies()
            .into_iter()
            .map(|(name, raw)| ModuleSpecifier { name, raw })
            .collect()
    }
}
