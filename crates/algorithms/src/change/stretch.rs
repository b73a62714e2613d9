//! Stretch aggregation and top-N ranking
//!
//! A stretch is a run of consecutive `grid_id`s: `stretch_id = grid_id / stretch_size`.
//! With the default 100 cells, stretch 0 holds ids 1-99 and stretch k holds
//! `100k ..= 100k + 99`.
//!
//! Only cells holding river in the ranked year belong to a stretch: year 1
//! for erosion, year 2 for accretion. A stretch's geometry is the union of
//! that year's river surface in its cells, so dry cells neither add area nor
//! create stretches of their own.

use super::erosion::{CellChange, ChangeMetric};
use super::overlay::Coverage;
use crate::vector::union_all;
use geo::MultiPolygon;
use rivershift_core::io::{Field, FieldKind};
use rivershift_core::{AttributeValue, Error, Feature, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters for stretch aggregation and ranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StretchParams {
    /// Cells per stretch
    pub stretch_size: u32,
    /// Stretches kept in each ranking
    pub top_n: usize,
}

impl Default for StretchParams {
    fn default() -> Self {
        Self {
            stretch_size: 100,
            top_n: 30,
        }
    }
}

impl StretchParams {
    pub fn validate(&self) -> Result<()> {
        if self.stretch_size == 0 {
            return Err(Error::InvalidParameter {
                name: "stretch_size",
                value: self.stretch_size.to_string(),
                reason: "must be at least 1 cell".into(),
            });
        }
        if self.top_n == 0 {
            return Err(Error::InvalidParameter {
                name: "top_n",
                value: self.top_n.to_string(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn stretch_id(&self, grid_id: u32) -> u32 {
        grid_id / self.stretch_size
    }
}

/// One stretch's total for a single metric
#[derive(Debug, Clone)]
pub struct Stretch {
    pub stretch_id: u32,
    pub metric: ChangeMetric,
    /// Member cell count
    pub cells: usize,
    /// Union of the ranked year's river surface in the member cells
    pub geometry: MultiPolygon<f64>,
    /// Summed km² of the metric
    pub total_km2: f64,
}

impl Stretch {
    pub fn fields(metric: ChangeMetric) -> [Field; 3] {
        [
            Field::new("stretch_id", FieldKind::Integer),
            Field::new("cells", FieldKind::Integer),
            Field::new(metric.field_name(), FieldKind::Float),
        ]
    }

    pub fn to_feature(&self) -> Feature {
        Feature::new(self.geometry.clone())
            .with_property("stretch_id", AttributeValue::Int(i64::from(self.stretch_id)))
            .with_property("cells", AttributeValue::Int(self.cells as i64))
            .with_property(self.metric.field_name(), AttributeValue::Float(self.total_km2))
    }
}

/// Group the cells wet in `coverage` into stretches and sum one metric per
/// stretch.
///
/// `coverage` is the year the metric is ranked on. Stretches come back in
/// ascending `stretch_id` order; cells are summed in `grid_id` order within
/// each stretch.
pub fn aggregate_stretches(
    changes: &[CellChange],
    metric: ChangeMetric,
    coverage: &Coverage,
    params: &StretchParams,
) -> Result<Vec<Stretch>> {
    params.validate()?;

    let mut groups: BTreeMap<u32, Vec<(&CellChange, &MultiPolygon<f64>)>> = BTreeMap::new();
    for change in changes {
        if let Some(river) = coverage.geometry(change.grid_id) {
            groups
                .entry(params.stretch_id(change.grid_id))
                .or_default()
                .push((change, river));
        }
    }

    Ok(groups
        .into_iter()
        .map(|(stretch_id, members)| Stretch {
            stretch_id,
            metric,
            cells: members.len(),
            geometry: union_all(members.iter().map(|(_, river)| *river)),
            total_km2: members.iter().map(|(c, _)| c.value(metric)).sum(),
        })
        .collect())
}

/// The `n` stretches with the largest totals, largest first.
///
/// The sort is stable, so equal totals keep their incoming (ascending
/// `stretch_id`) order. NaN totals are never ranked.
pub fn top_stretches(stretches: &[Stretch], n: usize) -> Vec<Stretch> {
    let mut ranked: Vec<&Stretch> = stretches.iter().filter(|s| !s.total_km2.is_nan()).collect();
    ranked.sort_by(|a, b| b.total_km2.total_cmp(&a.total_km2));
    ranked.into_iter().take(n).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::fishnet::GridCell;
    use crate::change::overlay::{overlay_year, RiverFeature};
    use crate::vector::BoundingBox;
    use geo::Area;

    fn square(grid_id: u32) -> MultiPolygon<f64> {
        let x = grid_id as f64 * 30.0;
        MultiPolygon::new(vec![BoundingBox::new(x, 0.0, x + 30.0, 30.0).to_polygon()])
    }

    /// A row of 30 m cells with ids `1..=n`, laid out left to right
    fn row(n: u32) -> Vec<GridCell> {
        (1..=n)
            .map(|grid_id| GridCell {
                grid_id,
                geometry: square(grid_id),
                area: 900.0,
            })
            .collect()
    }

    /// Coverage of the given cells, each fully wet
    fn wet(ids: impl IntoIterator<Item = u32>) -> Coverage {
        let cells = row(300);
        let rivers = RiverFeature::from_polygons(ids.into_iter().map(square));
        Coverage::from_overlay(&overlay_year(&cells, &rivers))
    }

    fn change(grid_id: u32, erosion_km2: f64) -> CellChange {
        CellChange {
            grid_id,
            year1_area: 900.0,
            year2_area: erosion_km2 * 1e6,
            unchanged_area: 0.0,
            erosion_km2,
            accretion_km2: 0.0,
        }
    }

    fn stretch(stretch_id: u32, total_km2: f64) -> Stretch {
        Stretch {
            stretch_id,
            metric: ChangeMetric::Erosion,
            cells: 1,
            geometry: MultiPolygon::new(vec![]),
            total_km2,
        }
    }

    #[test]
    fn test_stretch_ids() {
        let p = StretchParams::default();
        assert_eq!(p.stretch_id(1), 0);
        assert_eq!(p.stretch_id(99), 0);
        assert_eq!(p.stretch_id(100), 1);
        assert_eq!(p.stretch_id(250), 2);
    }

    #[test]
    fn test_aggregate_sums_members() {
        let changes: Vec<CellChange> = (1..=250).map(|id| change(id, id as f64 * 1e-4)).collect();
        let coverage = wet(1..=250);
        let stretches =
            aggregate_stretches(&changes, ChangeMetric::Erosion, &coverage, &StretchParams::default()).unwrap();

        assert_eq!(stretches.iter().map(|s| s.stretch_id).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(stretches.iter().map(|s| s.cells).collect::<Vec<_>>(), vec![99, 100, 51]);

        for s in &stretches {
            let expected: f64 = changes
                .iter()
                .filter(|c| c.grid_id / 100 == s.stretch_id)
                .map(|c| c.erosion_km2)
                .sum();
            assert_eq!(s.total_km2, expected);
        }

        // Adjacent 30 m squares merge into one strip
        assert_eq!(stretches[1].geometry.0.len(), 1);
        assert!((stretches[1].geometry.unsigned_area() - 100.0 * 900.0).abs() < 1e-3);
    }

    #[test]
    fn test_dry_cells_are_left_out() {
        // Only ids 1..=10 hold river; stretches of 10 cells
        let changes: Vec<CellChange> = (1..=40).map(|id| change(id, 1e-4)).collect();
        let params = StretchParams { stretch_size: 10, top_n: 30 };
        let stretches = aggregate_stretches(&changes, ChangeMetric::Erosion, &wet(1..=10), &params).unwrap();

        assert_eq!(stretches.iter().map(|s| s.stretch_id).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(stretches.iter().map(|s| s.cells).collect::<Vec<_>>(), vec![9, 1]);
        assert!((stretches[0].total_km2 - 9e-4).abs() < 1e-12);
        assert!((stretches[0].geometry.unsigned_area() - 9.0 * 900.0).abs() < 1e-3);
    }

    #[test]
    fn test_geometry_is_river_surface_not_cells() {
        let cells = row(3);
        // River covers the lower third of cell 2 only
        let rivers = RiverFeature::from_polygons([MultiPolygon::new(vec![
            BoundingBox::new(60.0, 0.0, 90.0, 10.0).to_polygon(),
        ])]);
        let coverage = Coverage::from_overlay(&overlay_year(&cells, &rivers));
        let changes: Vec<CellChange> = (1..=3).map(|id| change(id, 0.0)).collect();

        let stretches =
            aggregate_stretches(&changes, ChangeMetric::Accretion, &coverage, &StretchParams::default()).unwrap();
        assert_eq!(stretches.len(), 1);
        assert_eq!(stretches[0].cells, 1);
        assert!((stretches[0].geometry.unsigned_area() - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_aggregate_accretion_metric() {
        let mut c = change(5, 0.5);
        c.accretion_km2 = 0.25;
        let stretches =
            aggregate_stretches(&[c], ChangeMetric::Accretion, &wet([5]), &StretchParams::default()).unwrap();
        assert_eq!(stretches[0].total_km2, 0.25);
        assert_eq!(
            stretches[0].to_feature().get_property("accretion_km2"),
            Some(&AttributeValue::Float(0.25))
        );
    }

    #[test]
    fn test_zero_stretch_size_rejected() {
        let params = StretchParams { stretch_size: 0, top_n: 30 };
        assert!(aggregate_stretches(&[], ChangeMetric::Erosion, &Coverage::default(), &params).is_err());
    }

    #[test]
    fn test_top_is_descending_and_bounded() {
        let stretches: Vec<Stretch> = (0..50).map(|i| stretch(i, ((i * 37) % 50) as f64)).collect();
        let top = top_stretches(&stretches, 30);

        assert_eq!(top.len(), 30);
        assert!(top.windows(2).all(|w| w[0].total_km2 >= w[1].total_km2));
        assert_eq!(top[0].total_km2, 49.0);

        assert!(top_stretches(&stretches[..5], 30).len() == 5);
    }

    #[test]
    fn test_top_ties_keep_first_seen() {
        let stretches = vec![stretch(0, 1.0), stretch(1, 2.0), stretch(2, 1.0), stretch(3, 2.0)];
        let top = top_stretches(&stretches, 3);
        assert_eq!(top.iter().map(|s| s.stretch_id).collect::<Vec<_>>(), vec![1, 3, 0]);
    }

    #[test]
    fn test_top_is_idempotent() {
        let stretches = vec![stretch(0, 0.3), stretch(1, f64::NAN), stretch(2, 0.7)];
        let a = top_stretches(&stretches, 30);
        let b = top_stretches(&stretches, 30);
        assert_eq!(a.len(), 2);
        assert_eq!(
            a.iter().map(|s| (s.stretch_id, s.total_km2)).collect::<Vec<_>>(),
            b.iter().map(|s| (s.stretch_id, s.total_km2)).collect::<Vec<_>>()
        );
    }
}
