//! Fishnet generation, clipping and numbering
//!
//! The fishnet is a regular grid of square cells laid over the study area's
//! bounding box. Cells are enumerated column by column (all `y` for one `x`
//! before the next `x`); clipping keeps that order, and `grid_id` follows it.

use crate::vector::{union_all, BoundingBox};
use geo::{Area, BooleanOps, BoundingRect, MultiPolygon, Polygon};
use rivershift_core::io::{Field, FieldKind};
use rivershift_core::{Algorithm, AttributeValue, Error, Feature, Result};
use serde::{Deserialize, Serialize};

/// Tolerance (in cells) when turning `extent / cell_size` into a cell count,
/// so a 300 m extent with 30 m cells is 10 cells, not 9 or 11.
const COUNT_EPSILON: f64 = 1e-9;

/// Parameters for fishnet generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FishnetParams {
    /// Cell side length in working-projection units (metres for UTM)
    pub cell_size: f64,
    /// Emit the partially-covering cells along the top and right edges so the
    /// grid reaches the full bounding box (`ceil` instead of `floor` counts)
    pub partial_edge_cells: bool,
}

impl Default for FishnetParams {
    fn default() -> Self {
        Self {
            cell_size: 30.0,
            partial_edge_cells: false,
        }
    }
}

impl FishnetParams {
    pub fn validate(&self) -> Result<()> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "cell_size",
                value: self.cell_size.to_string(),
                reason: "must be a positive finite number".into(),
            });
        }
        Ok(())
    }

    /// Number of (columns, rows) the grid has over `bounds`
    pub fn dimensions(&self, bounds: &BoundingBox) -> (usize, usize) {
        let count = |extent: f64| -> usize {
            let ratio = extent / self.cell_size;
            if !ratio.is_finite() || ratio <= 0.0 {
                return 0;
            }
            let n = if self.partial_edge_cells {
                (ratio - COUNT_EPSILON).ceil()
            } else {
                (ratio + COUNT_EPSILON).floor()
            };
            n.max(0.0) as usize
        };
        (count(bounds.width()), count(bounds.height()))
    }
}

/// A numbered fishnet cell, clipped to the study area
#[derive(Debug, Clone)]
pub struct GridCell {
    /// 1-based, assigned in post-clip order
    pub grid_id: u32,
    pub geometry: MultiPolygon<f64>,
    /// Clipped cell area (not the nominal `cell_size²`)
    pub area: f64,
}

impl GridCell {
    pub const FIELDS: &'static [Field] = &[Field::new("grid_id", FieldKind::Integer)];

    pub fn to_feature(&self) -> Feature {
        Feature::new(self.geometry.clone())
            .with_property("grid_id", AttributeValue::Int(i64::from(self.grid_id)))
    }
}

/// Fishnet generator
#[derive(Debug, Clone, Default)]
pub struct Fishnet;

impl Algorithm for Fishnet {
    type Input = BoundingBox;
    type Output = Vec<Polygon<f64>>;
    type Params = FishnetParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Fishnet"
    }

    fn description(&self) -> &'static str {
        "Regular grid of square cells over a bounding box"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        fishnet(&input, &params)
    }
}

/// Generate the unclipped fishnet over `bounds`.
///
/// Cell `(i, j)` spans `[min_x + i·s, min_x + (i+1)·s] × [min_y + j·s, min_y + (j+1)·s]`.
/// The inner loop runs over `j` (y), so cells come out column by column.
/// An extent narrower than one cell yields no cells (unless
/// `partial_edge_cells` is set).
pub fn fishnet(bounds: &BoundingBox, params: &FishnetParams) -> Result<Vec<Polygon<f64>>> {
    params.validate()?;
    let (nx, ny) = params.dimensions(bounds);
    let s = params.cell_size;

    let mut cells = Vec::with_capacity(nx * ny);
    for i in 0..nx {
        let x = bounds.min_x + i as f64 * s;
        for j in 0..ny {
            let y = bounds.min_y + j as f64 * s;
            cells.push(BoundingBox::new(x, y, x + s, y + s).to_polygon());
        }
    }
    Ok(cells)
}

/// Clip fishnet cells to the study area.
///
/// Each cell is intersected with the union of the study-area polygons. Cells
/// whose intersection has no area are dropped; the rest keep their order.
pub fn clip_fishnet(cells: &[Polygon<f64>], study_area: &[MultiPolygon<f64>]) -> Vec<MultiPolygon<f64>> {
    let boundary = union_all(study_area);
    let Some(boundary_box) = boundary.bounding_rect().map(BoundingBox::from_rect) else {
        return Vec::new();
    };

    cells
        .iter()
        .filter_map(|cell| {
            let cell_box = BoundingBox::from_rect(cell.bounding_rect()?);
            if !cell_box.intersects(&boundary_box) {
                return None;
            }
            let clipped = cell.intersection(&boundary);
            (clipped.unsigned_area() > 0.0).then_some(clipped)
        })
        .collect()
}

/// Assign `grid_id = 1..=N` in iteration order
pub fn number_cells(clipped: Vec<MultiPolygon<f64>>) -> Vec<GridCell> {
    clipped
        .into_iter()
        .zip(1u32..)
        .map(|(geometry, grid_id)| {
            let area = geometry.unsigned_area();
            GridCell { grid_id, geometry, area }
        })
        .collect()
}
