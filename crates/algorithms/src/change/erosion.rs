//! Per-cell erosion and accretion
//!
//! For every numbered cell, joined on `grid_id`:
//!
//! - `erosion   = year2_area - unchanged_area`
//! - `accretion = year1_area - unchanged_area`
//!
//! both reported in km² (`m² / 1e6`). A cell missing from a year's coverage or
//! from the unchanged map contributes 0 for that term.

use super::fishnet::GridCell;
use super::overlay::Coverage;
use std::collections::BTreeMap;
use tracing::warn;

/// Square metres per square kilometre
pub const M2_PER_KM2: f64 = 1_000_000.0;

/// Raw differences below `-NEGATIVE_TOLERANCE` m² are reported as anomalies
pub const NEGATIVE_TOLERANCE: f64 = 1e-6;

/// Which change quantity a table or ranking refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeMetric {
    Erosion,
    Accretion,
}

impl ChangeMetric {
    /// Attribute name of the km² total
    pub fn field_name(&self) -> &'static str {
        match self {
            ChangeMetric::Erosion => "erosion_km2",
            ChangeMetric::Accretion => "accretion_km2",
        }
    }

    /// Output name fragment, as in `Top_30_Stretch_Erosion.shp`
    pub fn label(&self) -> &'static str {
        match self {
            ChangeMetric::Erosion => "Erosion",
            ChangeMetric::Accretion => "Accretion",
        }
    }
}

/// Change bookkeeping for one cell
#[derive(Debug, Clone)]
pub struct CellChange {
    pub grid_id: u32,
    pub year1_area: f64,
    pub year2_area: f64,
    pub unchanged_area: f64,
    pub erosion_km2: f64,
    pub accretion_km2: f64,
}

impl CellChange {
    pub fn value(&self, metric: ChangeMetric) -> f64 {
        match metric {
            ChangeMetric::Erosion => self.erosion_km2,
            ChangeMetric::Accretion => self.accretion_km2,
        }
    }
}

/// Per-cell changes plus the count of cells whose raw differences came out negative
#[derive(Debug, Clone, Default)]
pub struct ChangeTable {
    pub cells: Vec<CellChange>,
    pub negative: usize,
}

/// Derive erosion and accretion for every cell.
///
/// Values are kept exactly as the formulas give them. Negative results beyond
/// float noise mean the overlays disagree about a cell and are logged.
pub fn erosion_accretion(
    cells: &[GridCell],
    year1: &Coverage,
    year2: &Coverage,
    unchanged: &BTreeMap<u32, f64>,
) -> ChangeTable {
    let mut negative = 0usize;
    let cells: Vec<CellChange> = cells
        .iter()
        .map(|cell| {
            let year1_area = year1.area(cell.grid_id);
            let year2_area = year2.area(cell.grid_id);
            let unchanged_area = unchanged.get(&cell.grid_id).copied().unwrap_or(0.0);

            let erosion = year2_area - unchanged_area;
            let accretion = year1_area - unchanged_area;
            if erosion < -NEGATIVE_TOLERANCE || accretion < -NEGATIVE_TOLERANCE {
                negative += 1;
                warn!(
                    "grid_id {}: negative change (erosion {:.6} m², accretion {:.6} m²)",
                    cell.grid_id, erosion, accretion
                );
            }

            CellChange {
                grid_id: cell.grid_id,
                year1_area,
                year2_area,
                unchanged_area,
                erosion_km2: erosion / M2_PER_KM2,
                accretion_km2: accretion / M2_PER_KM2,
            }
        })
        .collect();

    ChangeTable { cells, negative }
}
