//! River change analysis
//!
//! The erosion/accretion pipeline, stage by stage:
//!
//! - **projection**: pick the working (metric) CRS from the study area
//! - **fishnet**: square grid, clipped to the study area and numbered
//! - **overlay**: per-cell river fragments for each year, unchanged area
//! - **erosion**: per-cell erosion and accretion in km²
//! - **stretch**: group cells into stretches and rank them
//! - **pipeline**: the whole run, writing one shapefile per stage

mod erosion;
mod fishnet;
mod overlay;
mod pipeline;
mod projection;
mod stretch;

pub use erosion::{erosion_accretion, CellChange, ChangeMetric, ChangeTable, M2_PER_KM2, NEGATIVE_TOLERANCE};
pub use fishnet::{clip_fishnet, fishnet, number_cells, Fishnet, FishnetParams, GridCell};
pub use overlay::{
    overlay_year, unchanged_by_cell, unchanged_fragments, Coverage, OverlayRecord, RiverFeature,
    UnchangedRecord,
};
pub use pipeline::{
    outputs, run_analysis, AnalysisInputs, AnalysisParams, AnalysisRequest, AnalysisSummary,
};
pub use projection::{utm_zone_for, working_crs};
pub use stretch::{aggregate_stretches, top_stretches, Stretch, StretchParams};
