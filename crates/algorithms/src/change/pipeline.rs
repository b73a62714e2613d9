//! End-to-end river change analysis
//!
//! `run_analysis` is the single entry point: it takes the two river-extent
//! layers, the study-area boundary and an output directory, and writes one
//! shapefile per stage. Stages run strictly in sequence; a failure aborts the
//! run and leaves whatever files were already written.

use super::erosion::{erosion_accretion, ChangeMetric};
use super::fishnet::{clip_fishnet, fishnet, number_cells, FishnetParams, GridCell};
use super::overlay::{
    overlay_year, unchanged_by_cell, unchanged_fragments, Coverage, OverlayRecord, RiverFeature,
    UnchangedRecord,
};
use super::projection::working_crs;
use super::stretch::{aggregate_stretches, top_stretches, Stretch, StretchParams};
use crate::vector::BoundingBox;
use rivershift_core::io::{read_layer, write_layer, Field};
use rivershift_core::{Error, Feature, FeatureCollection, Result, CRS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Output file names
pub mod outputs {
    pub const FISHNET: &str = "Fishnet.shp";
    pub const CLIPPED_FISHNET: &str = "Clipped_Fishnet.shp";
    pub const NUMBERED_FISHNET: &str = "Numbered_Clipped_Fishnet.shp";
    pub const YEAR1: &str = "Fishnet_Year1.shp";
    pub const YEAR2: &str = "Fishnet_Year2.shp";
    pub const UNCHANGED: &str = "Unchanged_Area.shp";

    /// `Top_{n}_Stretch_{Erosion|Accretion}.shp`
    pub fn top_stretches(n: usize, label: &str) -> String {
        format!("Top_{}_Stretch_{}.shp", n, label)
    }
}

/// Analysis parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisParams {
    pub fishnet: FishnetParams,
    pub stretch: StretchParams,
}

impl AnalysisParams {
    pub fn validate(&self) -> Result<()> {
        self.fishnet.validate()?;
        self.stretch.validate()
    }
}

/// What the caller supplies. Any field may be missing until validated.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub year1: Option<PathBuf>,
    pub year2: Option<PathBuf>,
    pub study_area: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

/// A request with every input present
#[derive(Debug, Clone)]
pub struct AnalysisInputs {
    pub year1: PathBuf,
    pub year2: PathBuf,
    pub study_area: PathBuf,
    pub output_dir: PathBuf,
}

impl AnalysisRequest {
    /// Check that all four inputs are present and non-empty.
    ///
    /// Reports every missing field at once.
    pub fn validate(&self) -> Result<AnalysisInputs> {
        fn present(p: &Option<PathBuf>) -> Option<PathBuf> {
            p.as_ref().filter(|p| !p.as_os_str().is_empty()).cloned()
        }

        let year1 = present(&self.year1);
        let year2 = present(&self.year2);
        let study_area = present(&self.study_area);
        let output_dir = present(&self.output_dir);

        let missing: Vec<&'static str> = [
            ("year 1 layer", year1.is_none()),
            ("year 2 layer", year2.is_none()),
            ("study area", study_area.is_none()),
            ("output directory", output_dir.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        match (year1, year2, study_area, output_dir) {
            (Some(year1), Some(year2), Some(study_area), Some(output_dir)) => Ok(AnalysisInputs {
                year1,
                year2,
                study_area,
                output_dir,
            }),
            _ => Err(Error::MissingInput(missing)),
        }
    }
}

/// Counts and rankings from a completed run
#[derive(Debug, Clone)]
pub struct AnalysisSummary {
    pub working_crs: Option<CRS>,
    pub fishnet_cells: usize,
    pub clipped_cells: usize,
    pub year1_fragments: usize,
    pub year2_fragments: usize,
    pub unchanged_fragments: usize,
    /// Cells whose raw erosion or accretion came out negative
    pub negative_changes: usize,
    pub top_erosion: Vec<Stretch>,
    pub top_accretion: Vec<Stretch>,
    /// Every file written, in order
    pub outputs: Vec<PathBuf>,
}

/// Run the full pipeline.
///
/// Inputs and parameters are validated before anything is read or written.
pub fn run_analysis(request: &AnalysisRequest, params: &AnalysisParams) -> Result<AnalysisSummary> {
    let inputs = request.validate()?;
    params.validate()?;

    let out = &inputs.output_dir;
    std::fs::create_dir_all(out)?;
    let mut written = Vec::new();

    // CRS normalization
    let study = read_layer(&inputs.study_area)?;
    if study.is_empty() {
        return Err(Error::EmptyLayer(inputs.study_area.display().to_string()));
    }
    let crs = working_crs(&study)?;
    let study = align(study, crs.as_ref(), "study area")?;
    info!(
        "Working CRS: {}",
        crs.as_ref().map(|c| c.to_string()).unwrap_or_else(|| "unspecified".into())
    );

    // Fishnet
    let study_polygons = study.polygons("study area")?;
    let bounds = study
        .bounds()
        .map(BoundingBox::from_rect)
        .ok_or_else(|| Error::EmptyLayer("study area".into()))?;
    let grid = fishnet(&bounds, &params.fishnet)?;
    info!(
        "Fishnet: {} cells of {} units over {:.1} x {:.1}",
        grid.len(),
        params.fishnet.cell_size,
        bounds.width(),
        bounds.height()
    );
    save(out, outputs::FISHNET, grid.iter().cloned().map(Feature::new), &crs, &[], &mut written)?;

    // Clip and number
    let clipped = clip_fishnet(&grid, &study_polygons);
    save(out, outputs::CLIPPED_FISHNET, clipped.iter().cloned().map(Feature::new), &crs, &[], &mut written)?;
    let cells = number_cells(clipped);
    info!("Clipped fishnet: {} cells inside the study area", cells.len());
    save(
        out,
        outputs::NUMBERED_FISHNET,
        cells.iter().map(GridCell::to_feature),
        &crs,
        GridCell::FIELDS,
        &mut written,
    )?;

    // Year overlays
    let (year1, fields1) = overlay_layer(&inputs.year1, "year 1", crs.as_ref(), &cells)?;
    save(
        out,
        outputs::YEAR1,
        year1.iter().map(OverlayRecord::to_feature),
        &crs,
        &OverlayRecord::fields(&fields1),
        &mut written,
    )?;
    let (year2, fields2) = overlay_layer(&inputs.year2, "year 2", crs.as_ref(), &cells)?;
    save(
        out,
        outputs::YEAR2,
        year2.iter().map(OverlayRecord::to_feature),
        &crs,
        &OverlayRecord::fields(&fields2),
        &mut written,
    )?;

    // Unchanged area
    let unchanged = unchanged_fragments(&year1, &year2);
    save(
        out,
        outputs::UNCHANGED,
        unchanged.iter().map(UnchangedRecord::to_feature),
        &crs,
        &UnchangedRecord::fields(&fields1, &fields2),
        &mut written,
    )?;
    let coverage1 = Coverage::from_overlay(&year1);
    let coverage2 = Coverage::from_overlay(&year2);
    let unchanged_cells = unchanged_by_cell(&coverage1, &coverage2);
    info!(
        "Unchanged area: {} fragments in {} cells, {:.1} of {:.1} (year 1) / {:.1} (year 2) square units",
        unchanged.len(),
        unchanged_cells.len(),
        unchanged_cells.values().sum::<f64>(),
        coverage1.total_area(),
        coverage2.total_area()
    );

    // Erosion / accretion
    let changes = erosion_accretion(&cells, &coverage1, &coverage2, &unchanged_cells);
    if changes.negative > 0 {
        warn!(
            "{} cells have negative erosion or accretion; the overlays disagree for those cells",
            changes.negative
        );
    }

    // Stretches and ranking
    let mut ranked = Vec::with_capacity(2);
    for (metric, coverage) in [(ChangeMetric::Erosion, &coverage1), (ChangeMetric::Accretion, &coverage2)] {
        let stretches = aggregate_stretches(&changes.cells, metric, coverage, &params.stretch)?;
        let top = top_stretches(&stretches, params.stretch.top_n);
        let name = outputs::top_stretches(params.stretch.top_n, metric.label());
        save(out, &name, top.iter().map(Stretch::to_feature), &crs, &Stretch::fields(metric), &mut written)?;
        ranked.push(top);
    }
    let top_accretion = ranked.pop().unwrap_or_default();
    let top_erosion = ranked.pop().unwrap_or_default();

    info!(
        "Top {} stretches of erosion and accretion saved to {}",
        params.stretch.top_n,
        out.display()
    );

    Ok(AnalysisSummary {
        working_crs: crs,
        fishnet_cells: grid.len(),
        clipped_cells: cells.len(),
        year1_fragments: year1.len(),
        year2_fragments: year2.len(),
        unchanged_fragments: unchanged.len(),
        negative_changes: changes.negative,
        top_erosion,
        top_accretion,
        outputs: written,
    })
}

/// Bring a layer into the working CRS
fn align(layer: FeatureCollection, target: Option<&CRS>, name: &str) -> Result<FeatureCollection> {
    match (target, &layer.crs) {
        (Some(target), None) => {
            warn!("{} has no CRS; assuming {}", name, target);
            layer.reproject(target)
        }
        (Some(target), Some(_)) => layer.reproject(target),
        (None, Some(crs)) => {
            warn!("{} is in {} but the study area has no CRS; using it unchanged", name, crs);
            Ok(layer)
        }
        (None, None) => Ok(layer),
    }
}

/// Overlay one river layer, returning the fragments and the layer's columns
fn overlay_layer(
    path: &Path,
    name: &str,
    crs: Option<&CRS>,
    cells: &[GridCell],
) -> Result<(Vec<OverlayRecord>, Vec<Field>)> {
    let layer = align(read_layer(path)?, crs, name)?;
    let rivers = RiverFeature::from_layer(&layer, name)?;
    let records = overlay_year(cells, &rivers);
    info!(
        "{} overlay: {} river polygons, {} attribute columns, {} fragments",
        name,
        rivers.len(),
        layer.fields.len(),
        records.len()
    );
    Ok((records, layer.fields))
}

fn save(
    dir: &Path,
    name: &str,
    features: impl Iterator<Item = Feature>,
    crs: &Option<CRS>,
    fields: &[Field],
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    let mut layer = FeatureCollection::with_crs(crs.clone());
    layer.features.extend(features);
    let path = dir.join(name);
    write_layer(&path, &layer, fields)?;
    written.push(path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_inputs_listed() {
        let request = AnalysisRequest {
            year1: Some(PathBuf::from("y1.shp")),
            year2: None,
            study_area: Some(PathBuf::new()),
            output_dir: None,
        };
        match request.validate() {
            Err(Error::MissingInput(missing)) => {
                assert_eq!(missing, vec!["year 2 layer", "study area", "output directory"]);
            }
            other => panic!("expected MissingInput, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_inputs_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let request = AnalysisRequest {
            year1: None,
            year2: None,
            study_area: None,
            output_dir: Some(out.clone()),
        };
        assert!(run_analysis(&request, &AnalysisParams::default()).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_invalid_params_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let request = AnalysisRequest {
            year1: Some("a.shp".into()),
            year2: Some("b.shp".into()),
            study_area: Some("c.shp".into()),
            output_dir: Some(out.clone()),
        };
        let mut params = AnalysisParams::default();
        params.stretch.stretch_size = 0;
        assert!(matches!(
            run_analysis(&request, &params),
            Err(Error::InvalidParameter { name: "stretch_size", .. })
        ));
        assert!(!out.exists());
    }

    #[test]
    fn test_output_names() {
        assert_eq!(outputs::top_stretches(30, "Erosion"), "Top_30_Stretch_Erosion.shp");
        assert_eq!(outputs::top_stretches(10, "Accretion"), "Top_10_Stretch_Accretion.shp");
    }
}
