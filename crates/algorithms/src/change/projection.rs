//! Working CRS selection
//!
//! Areas are only meaningful in a metric projection. A study area delivered
//! in geographic coordinates is analysed in the WGS84 UTM zone of its first
//! feature's centroid; a projected study area keeps its own CRS.

use crate::vector::centroid;
use rivershift_core::crs::{CrsKind, UtmZone};
use rivershift_core::{Error, FeatureCollection, Result, CRS};
use tracing::{debug, warn};

/// Pick the metric CRS the analysis runs in.
///
/// Returns `None` when the study area has no CRS at all; every layer is then
/// used as-is.
pub fn working_crs(study_area: &FeatureCollection) -> Result<Option<CRS>> {
    let Some(crs) = &study_area.crs else {
        warn!("Study area has no CRS; coordinates are assumed to be metric");
        return Ok(None);
    };

    match crs.kind() {
        CrsKind::Geographic => {
            let zone = utm_zone_for(study_area)?;
            debug!("Geographic study area ({}) -> EPSG:{}", crs, zone.epsg());
            Ok(Some(CRS::utm(zone)))
        }
        CrsKind::Projected => Ok(Some(crs.clone())),
        CrsKind::Unknown => {
            warn!("Unrecognised study area CRS {}; treating it as projected", crs);
            Ok(Some(crs.clone()))
        }
    }
}

/// UTM zone of the first feature's centroid (longitude/latitude).
///
/// `zone = floor((lon + 180) / 6) + 1`; north when `lat >= 0`.
pub fn utm_zone_for(layer: &FeatureCollection) -> Result<UtmZone> {
    let point = layer
        .iter()
        .find_map(|f| f.geometry.as_ref())
        .and_then(centroid)
        .ok_or_else(|| Error::EmptyLayer("study area".into()))?;
    Ok(UtmZone::for_lon_lat(point.x(), point.y()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::BoundingBox;
    use rivershift_core::Feature;

    fn layer(crs: Option<CRS>, boxes: &[BoundingBox]) -> FeatureCollection {
        let mut fc = FeatureCollection::with_crs(crs);
        for b in boxes {
            fc.push(Feature::new(b.to_polygon()));
        }
        fc
    }

    #[test]
    fn test_geographic_north() {
        // Jamuna river near Sirajganj, Bangladesh
        let fc = layer(Some(CRS::wgs84()), &[BoundingBox::new(89.6, 24.3, 89.8, 24.6)]);
        let crs = working_crs(&fc).unwrap().unwrap();
        assert_eq!(crs.epsg(), Some(32645));
    }

    #[test]
    fn test_geographic_south_uses_first_feature() {
        let fc = layer(
            Some(CRS::wgs84()),
            &[
                BoundingBox::new(-60.1, -3.2, -59.9, -3.0),
                BoundingBox::new(10.0, 40.0, 11.0, 41.0),
            ],
        );
        let crs = working_crs(&fc).unwrap().unwrap();
        assert_eq!(crs.epsg(), Some(32721));
    }

    #[test]
    fn test_projected_is_kept() {
        let fc = layer(Some(CRS::from_epsg(32646)), &[BoundingBox::new(0.0, 0.0, 300.0, 300.0)]);
        assert_eq!(working_crs(&fc).unwrap(), Some(CRS::from_epsg(32646)));
    }

    #[test]
    fn test_missing_crs() {
        let fc = layer(None, &[BoundingBox::new(0.0, 0.0, 300.0, 300.0)]);
        assert_eq!(working_crs(&fc).unwrap(), None);
    }

    #[test]
    fn test_empty_geographic_layer() {
        let fc = layer(Some(CRS::wgs84()), &[]);
        assert!(matches!(working_crs(&fc), Err(Error::EmptyLayer(_))));
    }
}
