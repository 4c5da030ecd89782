//! Catalog files: assets, threats, vulnerabilities and the scenarios that
//! pair them.
//!
//! The engine never checks references between records. The catalog does,
//! so a typo in a scenario is reported instead of silently skipped.

use magerit_core::{Asset, ContextFactors, RiskScenario, Threat, Vulnerability};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("scenario #{index} references unknown {kind} '{id}'")]
    UnknownReference {
        index: usize,
        kind: &'static str,
        id: String,
    },
}

/// One asset/threat/vulnerability combination to assess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRef {
    pub asset: String,
    pub threat: String,
    pub vulnerability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environmental_factor: Option<f64>,
}

impl ScenarioRef {
    fn factors(&self) -> ContextFactors {
        ContextFactors::new(
            self.temporal_factor.unwrap_or(1.0),
            self.environmental_factor.unwrap_or(1.0),
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub assets: Vec<Asset>,
    pub threats: Vec<Threat>,
    pub vulnerabilities: Vec<Vulnerability>,
    pub scenarios: Vec<ScenarioRef>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Resolve every scenario against the catalog records.
    pub fn resolve(&self) -> Result<Vec<RiskScenario<'_>>, CatalogError> {
        let assets = index("asset", &self.assets, |a| &a.id)?;
        let threats = index("threat", &self.threats, |t| &t.id)?;
        let vulns = index("vulnerability", &self.vulnerabilities, |v| &v.id)?;

        self.scenarios
            .iter()
            .enumerate()
            .map(|(index, s)| {
                let unknown = |kind, id: &str| CatalogError::UnknownReference {
                    index,
                    kind,
                    id: id.to_string(),
                };
                Ok(RiskScenario {
                    asset: assets
                        .get(s.asset.as_str())
                        .copied()
                        .ok_or_else(|| unknown("asset", &s.asset))?,
                    threat: threats
                        .get(s.threat.as_str())
                        .copied()
                        .ok_or_else(|| unknown("threat", &s.threat))?,
                    vulnerability: vulns
                        .get(s.vulnerability.as_str())
                        .copied()
                        .ok_or_else(|| unknown("vulnerability", &s.vulnerability))?,
                    factors: s.factors(),
                })
            })
            .collect()
    }
}

fn index<'a, T>(
    kind: &'static str,
    records: &'a [T],
    id: impl Fn(&T) -> &String,
) -> Result<HashMap<&'a str, &'a T>, CatalogError> {
    let mut map = HashMap::with_capacity(records.len());
    for record in records {
        let key = id(record).as_str();
        if map.insert(key, record).is_some() {
            return Err(CatalogError::DuplicateId {
                kind,
                id: key.to_string(),
            });
        }
    }
    Ok(map)
}
