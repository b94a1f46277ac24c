use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct BatchPlan {
    pub steps: Vec<PlanEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PlanEntry {
    Upgrade(UpgradePlan),
    Component(ComponentPlan),
}

impl PlanEntry {
    pub fn kind(&self) -> &'static str {
        match self {
            PlanEntry::Upgrade(_) => "upgrade",
            PlanEntry::Component(_) => "component",
        }
    }
}

/// Per-step overrides of the command-line flags.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct PlanCommon {
    pub apply: Option<bool>,
    pub no_backup: Option<bool>,
    pub json: Option<bool>,
    pub encoding: Option<String>,
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpgradePlan {
    #[serde(default)]
    pub common: PlanCommon,
    pub root: PathBuf,
    pub from: Option<String>,
    pub to: String,
    #[serde(default)]
    pub depth: usize,
    pub scope: Option<String>,
    #[serde(default)]
    pub subdirs: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ComponentPlan {
    #[serde(default)]
    pub common: PlanCommon,
    pub root: PathBuf,
    pub name: String,
    pub replacement: String,
}

pub fn load_plan(path: &Path) -> Result<BatchPlan> {
    let data = fs::read(path).with_context(|| format!("reading plan {}", path.display()))?;
    let plan = if path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
    {
        serde_json::from_slice(&data)
            .with_context(|| format!("parsing JSON plan {}", path.display()))?
    } else {
        serde_yaml::from_slice(&data)
            .with_context(|| format!("parsing YAML plan {}", path.display()))?
    };
    Ok(plan)
}
