//! Role configurations for the four generation stages
//!
//! A role is data, not code: persona text, the response-shape contract the
//! stage expects back, and generation parameters. The built-in set is
//! compiled in from `assets/roles/*.yaml`; a directory of YAML files with
//! the same names overrides individual roles.

use crate::offer::Stage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const BUILTIN_GATHER: &str = include_str!("../assets/roles/gather.yaml");
const BUILTIN_COPY: &str = include_str!("../assets/roles/copy.yaml");
const BUILTIN_DESIGN: &str = include_str!("../assets/roles/design.yaml");
const BUILTIN_AUDIT: &str = include_str!("../assets/roles/audit.yaml");

/// Errors loading role configurations.
#[derive(Debug, Error)]
pub enum RoleError {
    #[error("cannot read role file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid role definition '{name}': {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Persona, response contract and generation parameters for one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Stable role name; matches the stage name.
    pub name: String,
    /// Short persona title
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Natural-language description of the exact structure expected back.
    pub response_contract: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_iterations() -> u32 {
    1
}

impl RoleConfig {
    /// Parse a role from YAML text.
    pub fn from_yaml(name: &str, text: &str) -> Result<Self, RoleError> {
        serde_yaml::from_str(text).map_err(|source| RoleError::Parse {
            name: name.to_string(),
            source,
        })
    }

    /// System prompt sent alongside every stage context.
    pub fn system_prompt(&self) -> String {
        format!(
            "You are the {}.\n\nGoal: {}\n\n{}\n\n{}",
            self.role,
            self.goal.trim(),
            self.backstory.trim(),
            self.response_contract.trim()
        )
    }
}

/// The four roles the pipeline runs, one per stage.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleSet {
    pub gather: RoleConfig,
    pub copy: RoleConfig,
    pub design: RoleConfig,
    pub audit: RoleConfig,
}

impl RoleSet {
    /// The compiled-in role set.
    pub fn builtin() -> Result<Self, RoleError> {
        Ok(Self {
            gather: RoleConfig::from_yaml("gather", BUILTIN_GATHER)?,
            copy: RoleConfig::from_yaml("copy", BUILTIN_COPY)?,
            design: RoleConfig::from_yaml("design", BUILTIN_DESIGN)?,
            audit: RoleConfig::from_yaml("audit", BUILTIN_AUDIT)?,
        })
    }

    /// Built-ins, with any `<stage>.yaml` found in `dir` taking precedence.
    pub fn load_dir(dir: &Path) -> Result<Self, RoleError> {
        let mut set = Self::builtin()?;
        for stage in Stage::ALL {
            let path = dir.join(format!("{}.yaml", stage.as_str()));
            if !path.exists() {
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|source| RoleError::Io {
                path: path.clone(),
                source,
            })?;
            let role = RoleConfig::from_yaml(stage.as_str(), &text)?;
            tracing::debug!(stage = stage.as_str(), path = %path.display(), "role override loaded");
            *set.get_mut(stage) = role;
        }
        Ok(set)
    }

    pub fn get(&self, stage: Stage) -> &RoleConfig {
        match stage {
            Stage::Gather => &self.gather,
            Stage::Copy => &self.copy,
            Stage::Design => &self.design,
            Stage::Audit => &self.audit,
        }
    }

    fn get_mut(&mut self, stage: Stage) -> &mut RoleConfig {
        match stage {
            Stage::Gather => &mut self.gather,
            Stage::Copy => &mut self.copy,
            Stage::Design => &mut self.design,
            Stage::Audit => &mut self.audit,
        }
    }

    /// Report configuration problems. Empty means the set is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for stage in Stage::ALL {
            let role = self.get(stage);
            let label = stage.as_str();
            if role.name != label {
                issues.push(format!("{}: name is '{}'", label, role.name));
            }
            if role.role.trim().is_empty() || role.backstory.trim().is_empty() {
                issues.push(format!("{}: persona is empty", label));
            }
            if role.response_contract.trim().is_empty() {
                issues.push(format!("{}: response contract is empty", label));
            }
            if !(0.0..=2.0).contains(&role.temperature) {
                issues.push(format!(
                    "{}: temperature {} outside [0, 2]",
                    label, role.temperature
                ));
            }
            if role.max_iterations == 0 {
                issues.push(format!("{}: iteration budget is zero", label));
            }
        }
        issues
    }
}
