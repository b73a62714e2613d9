//! Vector data structures
//!
//! - `Feature`: geometry + ordered attributes
//! - `FeatureCollection`: a layer, i.e. features sharing one CRS

use crate::crs::{Transform, CRS};
use crate::error::{Error, Result};
use crate::io::Field;
use geo::{BoundingRect, MapCoords, MultiPolygon, Rect};
use geo_types::Geometry;
use serde::{Deserialize, Serialize};

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// A geographic feature with geometry and attributes.
///
/// Attributes keep insertion order, which becomes the field order on write.
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: Vec<(String, AttributeValue)>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: Some(geometry.into()),
            properties: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.set_property(key, value);
        self
    }

    /// Set an attribute, replacing any existing value under the same key
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        let key = key.into();
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.properties.push((key, value)),
        }
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Polygonal geometry as a `MultiPolygon`, or `None` for other kinds
    pub fn polygons(&self) -> Option<MultiPolygon<f64>> {
        match self.geometry.as_ref()? {
            Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
            Geometry::MultiPolygon(mp) => Some(mp.clone()),
            Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
            _ => None,
        }
    }
}

/// A layer: features plus the CRS they are expressed in
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    /// CRS, if known (`None` when the source had no `.prj`)
    pub crs: Option<CRS>,
    /// Attribute columns as read from the `.dbf`, in file order
    pub fields: Vec<Field>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
            crs: None,
            fields: Vec::new(),
        }
    }

    pub fn with_crs(crs: Option<CRS>) -> Self {
        Self {
            features: Vec::new(),
            crs,
            fields: Vec::new(),
        }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Envelope of all geometries
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref()?.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                    (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
                )
            })
    }

    /// Every feature's geometry as a `MultiPolygon`.
    ///
    /// Features without geometry are skipped; any other geometry kind is an
    /// error naming `layer`.
    pub fn polygons(&self, layer: &str) -> Result<Vec<MultiPolygon<f64>>> {
        let mut out = Vec::with_capacity(self.features.len());
        for (index, feature) in self.features.iter().enumerate() {
            let Some(geometry) = &feature.geometry else {
                continue;
            };
            match feature.polygons() {
                Some(mp) => out.push(mp),
                None => {
                    return Err(Error::NonPolygonGeometry {
                        layer: layer.to_string(),
                        index,
                        kind: geometry_kind(geometry),
                    })
                }
            }
        }
        Ok(out)
    }

    /// Reproject every geometry into `target`.
    ///
    /// A layer without a CRS is assumed to already be in `target`.
    pub fn reproject(self, target: &CRS) -> Result<Self> {
        let transform = match &self.crs {
            Some(src) => Transform::between(src, target)?,
            None => Transform::Identity,
        };
        if transform.is_identity() {
            return Ok(Self {
                crs: Some(target.clone()),
                ..self
            });
        }

        let features = self
            .features
            .into_iter()
            .map(|f| {
                let geometry = match f.geometry {
                    Some(g) => Some(g.try_map_coords(|c| transform.apply(c))?),
                    None => None,
                };
                Ok(Feature {
                    geometry,
                    properties: f.properties,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            features,
            crs: Some(target.clone()),
            fields: self.fields,
        })
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

/// Short name of a geometry variant, for error messages
pub fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
