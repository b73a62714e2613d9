//! Year overlays and unchanged area
//!
//! A year overlay cuts every numbered cell by every river polygon of one
//! snapshot, carrying the river's attributes onto each fragment. The
//! unchanged area is the river surface present in both snapshots. It is
//! written out fragment by fragment, and summed cell by cell (on dissolved
//! coverage, so overlapping river polygons count once) for the change
//! formulas. Both sides are always joined on `grid_id`, never on row position.

use super::fishnet::GridCell;
use crate::maybe_rayon::*;
use crate::vector::{dissolve, BoundingBox};
use geo::{Area, BooleanOps, BoundingRect, MultiPolygon};
use rivershift_core::io::{column_name, Field, FieldKind};
use rivershift_core::vector::geometry_kind;
use rivershift_core::{AttributeValue, Error, Feature, FeatureCollection, Result};
use std::collections::BTreeMap;
use tracing::warn;

type Attributes = Vec<(String, AttributeValue)>;

/// One polygon of a river layer, with its attribute row
#[derive(Debug, Clone)]
pub struct RiverFeature {
    /// Index of the feature in its source layer
    pub fid: usize,
    pub geometry: MultiPolygon<f64>,
    pub attributes: Attributes,
}

impl RiverFeature {
    /// Every polygonal feature of `layer`.
    ///
    /// Features without geometry are skipped but keep their place in the
    /// `fid` numbering. Any non-polygonal geometry is an error naming `name`.
    pub fn from_layer(layer: &FeatureCollection, name: &str) -> Result<Vec<Self>> {
        let mut rivers = Vec::with_capacity(layer.len());
        for (fid, feature) in layer.iter().enumerate() {
            let Some(geometry) = &feature.geometry else {
                continue;
            };
            let polygons = feature.polygons().ok_or_else(|| Error::NonPolygonGeometry {
                layer: name.to_string(),
                index: fid,
                kind: geometry_kind(geometry),
            })?;
            rivers.push(Self {
                fid,
                geometry: polygons,
                attributes: feature.properties.clone(),
            });
        }
        Ok(rivers)
    }

    /// Attribute-less features, numbered in order
    pub fn from_polygons(polygons: impl IntoIterator<Item = MultiPolygon<f64>>) -> Vec<Self> {
        polygons
            .into_iter()
            .enumerate()
            .map(|(fid, geometry)| Self {
                fid,
                geometry,
                attributes: Vec::new(),
            })
            .collect()
    }
}

/// `computed` followed by the `passthrough` columns whose `.dbf` name does not
/// clash with a computed one. Clashing columns are dropped with a warning.
pub fn with_passthrough(computed: &[Field], passthrough: impl IntoIterator<Item = Field>) -> Vec<Field> {
    let mut fields = computed.to_vec();
    for field in passthrough {
        let column = column_name(&field.name);
        if computed.iter().any(|c| column_name(&c.name) == column) {
            warn!("river attribute '{}' is replaced by the computed column '{}'", field.name, column);
            continue;
        }
        fields.push(field);
    }
    fields
}

/// One cell × river-polygon intersection fragment
#[derive(Debug, Clone)]
pub struct OverlayRecord {
    pub grid_id: u32,
    /// Index of the river feature the fragment came from
    pub src_fid: usize,
    pub geometry: MultiPolygon<f64>,
    pub area: f64,
    /// The river feature's attribute row
    pub attributes: Attributes,
}

impl OverlayRecord {
    pub const FIELDS: &'static [Field] = &[
        Field::new("grid_id", FieldKind::Integer),
        Field::new("src_fid", FieldKind::Integer),
        Field::new("area", FieldKind::Float),
    ];

    /// Computed columns, then the river layer's own
    pub fn fields(river_fields: &[Field]) -> Vec<Field> {
        with_passthrough(Self::FIELDS, river_fields.iter().cloned())
    }

    /// Computed properties come first, so they win any name lookup
    pub fn to_feature(&self) -> Feature {
        let mut feature = Feature::new(self.geometry.clone())
            .with_property("grid_id", AttributeValue::Int(i64::from(self.grid_id)))
            .with_property("src_fid", AttributeValue::Int(self.src_fid as i64))
            .with_property("area", AttributeValue::Float(self.area));
        feature.properties.extend(self.attributes.iter().cloned());
        feature
    }
}

/// Name a year's attribute takes in the unchanged layer: the first 8
/// characters, then `_1` or `_2`
pub fn year_suffixed(name: &str, year: u8) -> String {
    format!("{}_{}", name.chars().take(8).collect::<String>(), year)
}

fn suffixed_fields(fields: &[Field], year: u8) -> impl Iterator<Item = Field> + '_ {
    fields.iter().map(move |f| Field::named(year_suffixed(&f.name, year), f.kind))
}

fn suffixed_attributes(attributes: &[(String, AttributeValue)], year: u8) -> Attributes {
    attributes
        .iter()
        .map(|(name, value)| (year_suffixed(name, year), value.clone()))
        .collect()
}

/// River surface common to one year-1 fragment and one year-2 fragment
#[derive(Debug, Clone)]
pub struct UnchangedRecord {
    pub grid_id: u32,
    pub year1_fid: usize,
    pub year2_fid: usize,
    pub geometry: MultiPolygon<f64>,
    pub unchanged_area: f64,
    /// Both fragments' attributes, suffixed `_1` and `_2`
    pub attributes: Attributes,
}

impl UnchangedRecord {
    pub const FIELDS: &'static [Field] = &[
        Field::new("grid_id", FieldKind::Integer),
        Field::new("src_fid_1", FieldKind::Integer),
        Field::new("src_fid_2", FieldKind::Integer),
        Field::new("unchanged_area", FieldKind::Float),
    ];

    pub fn fields(year1_fields: &[Field], year2_fields: &[Field]) -> Vec<Field> {
        with_passthrough(
            Self::FIELDS,
            suffixed_fields(year1_fields, 1).chain(suffixed_fields(year2_fields, 2)),
        )
    }

    pub fn to_feature(&self) -> Feature {
        let mut feature = Feature::new(self.geometry.clone())
            .with_property("grid_id", AttributeValue::Int(i64::from(self.grid_id)))
            .with_property("src_fid_1", AttributeValue::Int(self.year1_fid as i64))
            .with_property("src_fid_2", AttributeValue::Int(self.year2_fid as i64))
            .with_property("unchanged_area", AttributeValue::Float(self.unchanged_area));
        feature.properties.extend(self.attributes.iter().cloned());
        feature
    }
}

/// Intersect every cell with every river polygon.
///
/// Fragments with no area are discarded. Output is ordered by `grid_id`, then
/// by river feature; a cell may yield zero, one or several fragments.
pub fn overlay_year(cells: &[GridCell], rivers: &[RiverFeature]) -> Vec<OverlayRecord> {
    let river_boxes: Vec<Option<BoundingBox>> = rivers
        .iter()
        .map(|r| r.geometry.bounding_rect().map(BoundingBox::from_rect))
        .collect();

    cells
        .into_par_iter()
        .flat_map(|cell| {
            let Some(cell_box) = cell.geometry.bounding_rect().map(BoundingBox::from_rect) else {
                return Vec::new();
            };
            rivers
                .iter()
                .zip(&river_boxes)
                .filter(|(_, river_box)| river_box.map_or(false, |b| b.intersects(&cell_box)))
                .filter_map(|(river, _)| {
                    let geometry = cell.geometry.intersection(&river.geometry);
                    let area = geometry.unsigned_area();
                    (area > 0.0).then(|| OverlayRecord {
                        grid_id: cell.grid_id,
                        src_fid: river.fid,
                        geometry,
                        area,
                        attributes: river.attributes.clone(),
                    })
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// River surface of one snapshot, dissolved to one geometry per cell
#[derive(Debug, Clone, Default)]
pub struct Coverage {
    cells: BTreeMap<u32, (MultiPolygon<f64>, f64)>,
}

impl Coverage {
    /// Dissolve overlay fragments by `grid_id`.
    ///
    /// Overlapping river polygons inside a cell are counted once.
    pub fn from_overlay(records: &[OverlayRecord]) -> Self {
        let cells = dissolve(records.iter().map(|r| (r.grid_id, &r.geometry)))
            .into_iter()
            .map(|(grid_id, geometry)| {
                let area = geometry.unsigned_area();
                (grid_id, (geometry, area))
            })
            .collect();
        Self { cells }
    }

    /// River area in the cell, 0 when the cell has none
    pub fn area(&self, grid_id: u32) -> f64 {
        self.cells.get(&grid_id).map_or(0.0, |(_, area)| *area)
    }

    pub fn geometry(&self, grid_id: u32) -> Option<&MultiPolygon<f64>> {
        self.cells.get(&grid_id).map(|(geometry, _)| geometry)
    }

    /// Number of cells holding river surface
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Total river area over all cells
    pub fn total_area(&self) -> f64 {
        self.cells.values().map(|(_, area)| area).sum()
    }
}

/// Intersect the two years' fragments pairwise within each cell.
///
/// Ordered like year 1's fragments, then by year-2 fragment. Pairs with no
/// common area are dropped.
pub fn unchanged_fragments(year1: &[OverlayRecord], year2: &[OverlayRecord]) -> Vec<UnchangedRecord> {
    let mut by_cell: BTreeMap<u32, Vec<&OverlayRecord>> = BTreeMap::new();
    for record in year2 {
        by_cell.entry(record.grid_id).or_default().push(record);
    }

    year1
        .into_par_iter()
        .flat_map(|a| {
            let Some(partners) = by_cell.get(&a.grid_id) else {
                return Vec::new();
            };
            partners
                .iter()
                .filter_map(|b| {
                    let geometry = a.geometry.intersection(&b.geometry);
                    let unchanged_area = geometry.unsigned_area();
                    (unchanged_area > 0.0).then(|| {
                        let mut attributes = suffixed_attributes(&a.attributes, 1);
                        attributes.extend(suffixed_attributes(&b.attributes, 2));
                        UnchangedRecord {
                            grid_id: a.grid_id,
                            year1_fid: a.src_fid,
                            year2_fid: b.src_fid,
                            geometry,
                            unchanged_area,
                            attributes,
                        }
                    })
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Area common to both snapshots, per cell.
///
/// Cells are disjoint, so pairing only same-`grid_id` geometry loses no area.
/// Cells without a common area are absent.
pub fn unchanged_by_cell(year1: &Coverage, year2: &Coverage) -> BTreeMap<u32, f64> {
    year1
        .cells
        .iter()
        .filter_map(|(&grid_id, (geom1, _))| {
            let area = geom1.intersection(year2.geometry(grid_id)?).unsigned_area();
            (area > 0.0).then_some((grid_id, area))
        })
        .collect()
}
