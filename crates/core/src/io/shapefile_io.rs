//! ESRI Shapefile reading/writing
//!
//! Uses the `shapefile` crate for `.shp`/`.shx`/`.dbf` and handles the `.prj`
//! sidecar as plain WKT text.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geo_types::Geometry;
use shapefile::dbase::{self, FieldName, FieldType, FieldValue, Record, TableWriterBuilder};
use shapefile::Shape;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// dBASE field names are limited to 10 characters
const MAX_FIELD_NAME: usize = 10;

/// Largest magnitude a numeric column may hold and still be written as N(18,0)
const MAX_INTEGRAL: f64 = 1e15;

/// dBASE column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Whole numbers, N(18,0)
    Integer,
    /// Real numbers, N(24,15)
    Float,
    /// Text, C(254)
    Text,
    Bool,
}

/// One attribute column of a layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: Cow<'static, str>,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name: Cow::Borrowed(name),
            kind,
        }
    }

    /// A column whose name is only known at runtime
    pub fn named(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            kind,
        }
    }
}

/// The name a column gets in the `.dbf` (first 10 characters)
pub fn column_name(name: &str) -> String {
    name.chars().take(MAX_FIELD_NAME).collect()
}

/// Path of the `.prj` sidecar for a `.shp`
pub fn prj_path(path: &Path) -> PathBuf {
    path.with_extension("prj")
}

/// Read the CRS from the `.prj` sidecar, if there is one
pub fn read_prj(path: &Path) -> Result<Option<CRS>> {
    let prj = prj_path(path);
    if !prj.exists() {
        return Ok(None);
    }
    let wkt = std::fs::read_to_string(&prj)?;
    if wkt.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(CRS::from_wkt(wkt)))
}

/// Read a shapefile: geometries, every `.dbf` column and the `.prj` CRS.
///
/// Properties are keyed by the column names as stored in the `.dbf`, and
/// `layer.fields` lists the columns in file order. Numeric columns holding
/// only whole numbers are typed `Integer`. Null shapes become features
/// without geometry.
pub fn read_layer<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let path = path.as_ref();
    let rows = shapefile::read(path)?;
    let mut fields = read_schema(path)?;
    let mut layer = FeatureCollection::with_crs(read_prj(path)?);

    for (index, (shape, record)) in rows.into_iter().enumerate() {
        let geometry = match shape {
            Shape::NullShape => None,
            other => Some(
                Geometry::<f64>::try_from(other)
                    .map_err(|e| Error::Shapefile(format!("feature {}: {:?}", index, e)))?,
            ),
        };
        let properties = fields
            .iter()
            .map(|field| {
                let value = record
                    .get(field.name.as_ref())
                    .map(from_field_value)
                    .unwrap_or(AttributeValue::Null);
                (field.name.to_string(), value)
            })
            .collect();
        layer.push(Feature { geometry, properties });
    }

    for (column, field) in fields.iter_mut().enumerate() {
        if field.kind == FieldKind::Float && all_integral(&layer, column) {
            field.kind = FieldKind::Integer;
        }
    }
    layer.fields = fields;

    debug!(
        "Read {} features, {} fields from {} (CRS: {})",
        layer.len(),
        layer.fields.len(),
        path.display(),
        layer.crs.as_ref().map(|c| c.to_string()).unwrap_or_else(|| "none".into())
    );
    Ok(layer)
}

/// Column names and types from the `.dbf` header
fn read_schema(path: &Path) -> Result<Vec<Field>> {
    let dbf = path.with_extension("dbf");
    let reader = dbase::Reader::from_path(&dbf)
        .map_err(|e| Error::Shapefile(format!("{}: {:?}", dbf.display(), e)))?;
    Ok(reader
        .fields()
        .iter()
        .map(|info| {
            let kind = match info.field_type() {
                FieldType::Numeric | FieldType::Float | FieldType::Double | FieldType::Currency => {
                    FieldKind::Float
                }
                FieldType::Integer => FieldKind::Integer,
                FieldType::Logical => FieldKind::Bool,
                _ => FieldKind::Text,
            };
            Field::named(info.name(), kind)
        })
        .collect())
}

fn all_integral(layer: &FeatureCollection, column: usize) -> bool {
    layer.iter().all(|f| match f.properties.get(column).map(|(_, v)| v) {
        Some(AttributeValue::Float(v)) => v.fract() == 0.0 && v.abs() < MAX_INTEGRAL,
        _ => true,
    })
}

/// Write a polygon layer as a shapefile with the given attribute columns.
///
/// Column names longer than 10 characters are truncated. A layer written
/// without columns gets a single `FID` column holding the feature index.
/// Features whose geometry is missing or not polygonal are skipped. The
/// layer's CRS, when it can be expressed as WKT, goes to a `.prj` sidecar.
pub fn write_layer<P: AsRef<Path>>(
    path: P,
    layer: &FeatureCollection,
    fields: &[Field],
) -> Result<()> {
    let path = path.as_ref();
    let fid_field = [Field::new("FID", FieldKind::Integer)];
    let fields = if fields.is_empty() { &fid_field[..] } else { fields };
    let columns = column_names(fields)?;

    let mut builder = TableWriterBuilder::new();
    for (field, column) in fields.iter().zip(&columns) {
        let name = FieldName::try_from(column.as_str())
            .map_err(|e| Error::Shapefile(format!("field {}: {:?}", column, e)))?;
        builder = match field.kind {
            FieldKind::Integer => builder.add_numeric_field(name, 18, 0),
            FieldKind::Float => builder.add_numeric_field(name, 24, 15),
            FieldKind::Text => builder.add_character_field(name, 254),
            FieldKind::Bool => builder.add_logical_field(name),
        };
    }

    let mut writer = shapefile::Writer::from_path(path, builder)?;
    let mut written = 0usize;

    for (index, feature) in layer.features.iter().enumerate() {
        let Some(polygons) = feature.polygons() else {
            continue;
        };
        if polygons.0.is_empty() {
            continue;
        }

        let mut record = Record::default();
        for (field, column) in fields.iter().zip(&columns) {
            let value = if field.name == "FID" && feature.get_property("FID").is_none() {
                AttributeValue::Int(index as i64)
            } else {
                feature
                    .get_property(&field.name)
                    .cloned()
                    .unwrap_or(AttributeValue::Null)
            };
            record.insert(column.clone(), to_field_value(&value, field.kind));
        }

        let shape = shapefile::Polygon::from(polygons);
        writer.write_shape_and_record(&shape, &record)?;
        written += 1;
    }
    drop(writer);

    match layer.crs.as_ref().and_then(|c| c.to_wkt()) {
        Some(wkt) => std::fs::write(prj_path(path), wkt)?,
        None => warn!(
            "{}: no WKT for CRS {}; .prj not written",
            path.display(),
            layer.crs.as_ref().map(|c| c.to_string()).unwrap_or_else(|| "none".into())
        ),
    }

    debug!("Wrote {} features to {}", written, path.display());
    Ok(())
}

/// dBASE column names, truncated and checked for collisions
fn column_names(fields: &[Field]) -> Result<Vec<String>> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    let mut names = Vec::with_capacity(fields.len());
    for field in fields {
        let truncated = column_name(&field.name);
        if let Some(first) = seen.insert(truncated.clone(), field.name.as_ref()) {
            return Err(Error::FieldNameCollision {
                first: first.to_string(),
                second: field.name.to_string(),
                truncated,
            });
        }
        names.push(truncated);
    }
    Ok(names)
}

fn from_field_value(value: &FieldValue) -> AttributeValue {
    match value {
        FieldValue::Character(Some(s)) => AttributeValue::String(s.trim().to_string()),
        FieldValue::Numeric(Some(v)) => AttributeValue::Float(*v),
        FieldValue::Logical(Some(b)) => AttributeValue::Bool(*b),
        FieldValue::Float(Some(v)) => AttributeValue::Float(f64::from(*v)),
        FieldValue::Integer(v) => AttributeValue::Int(i64::from(*v)),
        FieldValue::Double(v) => AttributeValue::Float(*v),
        _ => AttributeValue::Null,
    }
}

fn to_field_value(value: &AttributeValue, kind: FieldKind) -> FieldValue {
    match kind {
        FieldKind::Integer | FieldKind::Float => FieldValue::Numeric(value.as_f64()),
        FieldKind::Text => FieldValue::Character(match value {
            AttributeValue::Null => None,
            AttributeValue::String(s) => Some(s.clone()),
            AttributeValue::Bool(b) => Some(b.to_string()),
            AttributeValue::Int(v) => Some(v.to_string()),
            AttributeValue::Float(v) => Some(v.to_string()),
        }),
        FieldKind::Bool => FieldValue::Logical(match value {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }),
    }
}
