//! # RiverShift Algorithms
//!
//! River erosion and accretion analysis over a square fishnet.
//!
//! ## Modules
//!
//! - **change**: fishnet, yearly overlays, erosion/accretion, stretch ranking
//!   and the end-to-end pipeline
//! - **vector**: planar measurements, bounding boxes, union and dissolve

pub mod change;
pub mod vector;

pub(crate) mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::change::{
        aggregate_stretches, clip_fishnet, erosion_accretion, fishnet, number_cells,
        overlay_year, run_analysis, top_stretches, unchanged_by_cell, unchanged_fragments,
        working_crs, AnalysisParams, AnalysisRequest, AnalysisSummary, CellChange,
        ChangeMetric, Coverage, FishnetParams, GridCell, OverlayRecord, RiverFeature,
        Stretch, StretchParams, UnchangedRecord,
    };
    pub use crate::vector::{area, dissolve, union_all, BoundingBox};
    pub use rivershift_core::prelude::*;
}
