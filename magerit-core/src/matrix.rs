//! Probability × impact risk matrix with tolerance zones.
//!
//! Cells are derived from configuration and never change after the matrix
//! is built. Assessment membership is tracked separately: each risk key
//! lives in exactly one cell, and re-placing it moves it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::audit::clamp_unit;
use crate::calculator::{RiskAssessment, RiskKey};
use crate::classifier::{RiskLevel, RiskThresholds};
use crate::error::{ConfigError, Result};

/// Default matrix size.
pub const DEFAULT_MATRIX_LEVELS: usize = 5;

// Absorbs float error so that grid points like 0.6 × 5 land in bucket 3.
const BUCKET_EPSILON: f64 = 1e-9;

/// Policy grouping of risk levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceZone {
    Acceptable,
    Tolerable,
    Unacceptable,
}

impl ToleranceZone {
    /// Recommended action for risks in this zone.
    pub fn action(self) -> &'static str {
        match self {
            ToleranceZone::Unacceptable => "mitigate immediately",
            ToleranceZone::Tolerable => "monitor and plan mitigation",
            ToleranceZone::Acceptable => "accept and monitor routinely",
        }
    }
}

impl std::fmt::Display for ToleranceZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToleranceZone::Acceptable => write!(f, "acceptable"),
            ToleranceZone::Tolerable => write!(f, "tolerable"),
            ToleranceZone::Unacceptable => write!(f, "unacceptable"),
        }
    }
}

/// Assignment of risk levels to tolerance zones. Must partition all five levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceZones {
    pub acceptable: Vec<RiskLevel>,
    pub tolerable: Vec<RiskLevel>,
    pub unacceptable: Vec<RiskLevel>,
}

impl Default for ToleranceZones {
    fn default() -> Self {
        Self {
            acceptable: vec![RiskLevel::VeryLow, RiskLevel::Low],
            tolerable: vec![RiskLevel::Medium],
            unacceptable: vec![RiskLevel::High, RiskLevel::Critical],
        }
    }
}

impl ToleranceZones {
    /// Zone of every level, indexed by [`RiskLevel::rank`].
    pub fn partition(&self) -> std::result::Result<[ToleranceZone; 5], ConfigError> {
        let groups = [
            (ToleranceZone::Acceptable, &self.acceptable),
            (ToleranceZone::Tolerable, &self.tolerable),
            (ToleranceZone::Unacceptable, &self.unacceptable),
        ];

        let mut table = [ToleranceZone::Acceptable; 5];
        for level in RiskLevel::ALL {
            let mut owners = groups
                .iter()
                .filter(|(_, levels)| levels.contains(&level))
                .map(|(zone, _)| *zone);
            match (owners.next(), owners.next()) {
                (None, _) => return Err(ConfigError::ToleranceGap(level.to_string())),
                (Some(_), Some(_)) => {
                    return Err(ConfigError::ToleranceOverlap(level.to_string()));
                }
                (Some(zone), None) => table[level.rank() as usize] = zone,
            }
        }
        Ok(table)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.partition().map(|_| ())
    }
}

/// One cell of the matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixCell {
    pub probability_level: usize,
    pub impact_level: usize,
    /// `probability_level × impact_level`.
    pub risk_score: usize,
    pub risk_level: RiskLevel,
    pub tolerance_zone: ToleranceZone,
    pub action: String,
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    probability: f64,
    impact: f64,
    cell: usize,
}

/// An N×N probability/impact grid.
#[derive(Debug, Clone)]
pub struct RiskMatrix {
    levels: usize,
    zones: ToleranceZones,
    thresholds: RiskThresholds,
    cells: Vec<MatrixCell>,
    members: Vec<BTreeSet<RiskKey>>,
    placements: HashMap<RiskKey, Placement>,
}

impl RiskMatrix {
    /// Build the grid. Fails on invalid levels, thresholds or zone partition.
    pub fn build(
        levels: usize,
        zones: &ToleranceZones,
        thresholds: &RiskThresholds,
    ) -> Result<Self> {
        if levels == 0 {
            return Err(ConfigError::NonPositiveLevels.into());
        }
        thresholds.validate()?;
        let zone_of = zones.partition()?;

        let max_score = (levels * levels) as f64;
        let mut cells = Vec::with_capacity(levels * levels);
        for probability_level in 1..=levels {
            for impact_level in 1..=levels {
                let risk_score = probability_level * impact_level;
                let risk_level = thresholds.classify(risk_score as f64 / max_score);
                let tolerance_zone = zone_of[risk_level.rank() as usize];
                cells.push(MatrixCell {
                    probability_level,
                    impact_level,
                    risk_score,
                    risk_level,
                    tolerance_zone,
                    action: tolerance_zone.action().to_string(),
                });
            }
        }

        Ok(Self {
            levels,
            zones: zones.clone(),
            thresholds: *thresholds,
            members: vec![BTreeSet::new(); cells.len()],
            cells,
            placements: HashMap::new(),
        })
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn zones(&self) -> &ToleranceZones {
        &self.zones
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    /// All cells, probability-major, both axes ascending.
    pub fn cells(&self) -> &[MatrixCell] {
        &self.cells
    }

    /// Cell at 1-based coordinates.
    pub fn cell(&self, probability_level: usize, impact_level: usize) -> Option<&MatrixCell> {
        self.index(probability_level, impact_level)
            .map(|i| &self.cells[i])
    }

    /// Discretize a [0, 1] value into a 1-based bucket: `⌈value × levels⌉`.
    pub fn bucket(&self, value: f64) -> usize {
        let scaled = (clamp_unit(value) * self.levels as f64 - BUCKET_EPSILON).ceil();
        (scaled.max(1.0) as usize).min(self.levels)
    }

    /// Cell for a continuous (probability, impact) point.
    pub fn locate(&self, probability: f64, impact: f64) -> &MatrixCell {
        &self.cells[self.locate_index(probability, impact)]
    }

    /// Cell an assessment belongs in, without recording membership.
    pub fn locate_assessment(&self, assessment: &RiskAssessment) -> &MatrixCell {
        self.locate(
            assessment.threat_probability(),
            assessment.effective_impact(),
        )
    }

    /// Record an assessment in its cell, moving it if its key was already placed.
    pub fn place(&mut self, assessment: &RiskAssessment) -> &MatrixCell {
        self.place_at(
            assessment.key().clone(),
            assessment.threat_probability(),
            assessment.effective_impact(),
        )
    }

    pub fn place_at(&mut self, key: RiskKey, probability: f64, impact: f64) -> &MatrixCell {
        let cell = self.locate_index(probability, impact);
        if let Some(previous) = self.placements.get(&key) {
            self.members[previous.cell].remove(&key);
        }
        self.members[cell].insert(key.clone());
        self.placements.insert(
            key,
            Placement {
                probability,
                impact,
                cell,
            },
        );
        &self.cells[cell]
    }

    /// Drop a key's membership. Returns false when it was not placed.
    pub fn remove(&mut self, key: &RiskKey) -> bool {
        match self.placements.remove(key) {
            Some(placement) => {
                self.members[placement.cell].remove(key);
                true
            }
            None => false,
        }
    }

    /// Cell a key currently lives in.
    pub fn cell_of(&self, key: &RiskKey) -> Option<&MatrixCell> {
        self.placements.get(key).map(|p| &self.cells[p.cell])
    }

    /// Keys placed in a cell.
    pub fn members(
        &self,
        probability_level: usize,
        impact_level: usize,
    ) -> impl Iterator<Item = &RiskKey> + '_ {
        self.index(probability_level, impact_level)
            .into_iter()
            .flat_map(move |i| self.members[i].iter())
    }

    pub fn member_count(&self) -> usize {
        self.placements.len()
    }

    /// Member counts as `[probability_level - 1][impact_level - 1]`.
    pub fn heat_map(&self) -> Vec<Vec<usize>> {
        self.members
            .chunks(self.levels)
            .map(|row| row.iter().map(BTreeSet::len).collect())
            .collect()
    }

    /// Member counts per tolerance zone. Every zone is present.
    pub fn zone_counts(&self) -> BTreeMap<ToleranceZone, usize> {
        let mut counts: BTreeMap<ToleranceZone, usize> = [
            ToleranceZone::Acceptable,
            ToleranceZone::Tolerable,
            ToleranceZone::Unacceptable,
        ]
        .into_iter()
        .map(|z| (z, 0))
        .collect();
        for placement in self.placements.values() {
            *counts
                .entry(self.cells[placement.cell].tolerance_zone)
                .or_default() += 1;
        }
        counts
    }

    /// A new matrix with different size or zones, carrying every member over.
    pub fn rebuild(&self, levels: usize, zones: &ToleranceZones) -> Result<Self> {
        let mut next = Self::build(levels, zones, &self.thresholds)?;
        for (key, placement) in &self.placements {
            next.place_at(key.clone(), placement.probability, placement.impact);
        }
        Ok(next)
    }

    fn index(&self, probability_level: usize, impact_level: usize) -> Option<usize> {
        let in_range = |l: usize| (1..=self.levels).contains(&l);
        if in_range(probability_level) && in_range(impact_level) {
            Some((probability_level - 1) * self.levels + (impact_level - 1))
        } else {
            None
        }
    }

    fn locate_index(&self, probability: f64, impact: f64) -> usize {
        let p = self.bucket(probability);
        let i = self.bucket(impact);
        (p - 1) * self.levels + (i - 1)
    }
}
