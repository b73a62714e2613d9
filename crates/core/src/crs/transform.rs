//! Coordinate transformations between two CRS.
//!
//! WGS84 ⇄ WGS84 UTM runs on the built-in Snyder formulas; every other pair is
//! delegated to proj4rs.

use super::{UtmZone, CRS};
use crate::error::{Error, Result};
use geo::Coord;
use proj4rs::proj::Proj;
use std::fmt;
use tracing::debug;

/// A point-wise transformation between two CRS.
#[derive(Debug)]
pub enum Transform {
    Identity,
    /// WGS84 lon/lat → UTM
    ToUtm(UtmZone),
    /// UTM → WGS84 lon/lat
    FromUtm(UtmZone),
    /// UTM zone → UTM zone, through lon/lat
    UtmToUtm(UtmZone, UtmZone),
    /// Any other pair, through proj4rs
    Proj(Box<ProjPair>),
}

/// Source and target projections for proj4rs
pub struct ProjPair {
    src: Proj,
    dst: Proj,
    /// proj4rs takes and returns geographic coordinates in radians
    src_angular: bool,
    dst_angular: bool,
}

impl fmt::Debug for ProjPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjPair")
            .field("src_angular", &self.src_angular)
            .field("dst_angular", &self.dst_angular)
            .finish_non_exhaustive()
    }
}

impl ProjPair {
    fn new(src: &CRS, dst: &CRS) -> Result<Self> {
        let src_def = definition(src)?;
        let dst_def = definition(dst)?;
        debug!("proj4rs transform: '{}' -> '{}'", src_def, dst_def);
        Ok(Self {
            src: parse(&src_def)?,
            dst: parse(&dst_def)?,
            src_angular: is_angular(&src_def),
            dst_angular: is_angular(&dst_def),
        })
    }

    fn convert(&self, c: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = if self.src_angular {
            (c.x.to_radians(), c.y.to_radians(), 0.0)
        } else {
            (c.x, c.y, 0.0)
        };
        proj4rs::transform::transform(&self.src, &self.dst, &mut point)
            .map_err(|e| Error::Projection(format!("({}, {}): {}", c.x, c.y, e)))?;
        Ok(if self.dst_angular {
            Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
        } else {
            Coord { x: point.0, y: point.1 }
        })
    }
}

fn definition(crs: &CRS) -> Result<String> {
    crs.proj_string()
        .ok_or_else(|| Error::UnsupportedCrs(format!("no projection definition for {}", crs)))
}

fn parse(def: &str) -> Result<Proj> {
    Proj::from_proj_string(def).map_err(|e| Error::UnsupportedCrs(format!("{}: {}", def, e)))
}

fn is_angular(def: &str) -> bool {
    def.contains("+proj=longlat") || def.contains("+proj=latlong")
}

impl Transform {
    /// Resolve the transformation taking coordinates in `src` to `dst`.
    ///
    /// Fails only when a CRS cannot be expressed as a PROJ definition at all.
    pub fn between(src: &CRS, dst: &CRS) -> Result<Self> {
        if src.is_equivalent(dst) {
            return Ok(Transform::Identity);
        }

        let fast = match (src.is_wgs84(), src.utm_zone(), dst.is_wgs84(), dst.utm_zone()) {
            (true, _, true, _) => Some(Transform::Identity),
            (true, _, _, Some(zone)) => Some(Transform::ToUtm(zone)),
            (_, Some(zone), true, _) => Some(Transform::FromUtm(zone)),
            (_, Some(a), _, Some(b)) if a == b => Some(Transform::Identity),
            (_, Some(a), _, Some(b)) => Some(Transform::UtmToUtm(a, b)),
            _ => None,
        };
        match fast {
            Some(t) => Ok(t),
            None => Ok(Transform::Proj(Box::new(ProjPair::new(src, dst)?))),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Transform::Identity)
    }

    /// Transform one coordinate
    pub fn apply(&self, c: Coord<f64>) -> Result<Coord<f64>> {
        let (x, y) = match self {
            Transform::Identity => return Ok(c),
            Transform::ToUtm(zone) => zone.forward(c.x, c.y),
            Transform::FromUtm(zone) => zone.inverse(c.x, c.y),
            Transform::UtmToUtm(from, to) => {
                let (lon, lat) = from.inverse(c.x, c.y);
                to.forward(lon, lat)
            }
            Transform::Proj(pair) => return pair.convert(c),
        };
        Ok(Coord { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAD83_UTM17N_ESRI: &str = r#"PROJCS["NAD_1983_UTM_Zone_17N",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-81.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

    /// Spherical Mercator forward formula
    fn web_mercator(lon: f64, lat: f64) -> Coord<f64> {
        let r = 6_378_137.0;
        Coord {
            x: r * lon.to_radians(),
            y: r * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln(),
        }
    }

    #[test]
    fn test_same_crs_is_identity() {
        let t = Transform::between(&CRS::from_epsg(32633), &CRS::from_epsg(32633)).unwrap();
        assert!(t.is_identity());
        let c = Coord { x: 1.0, y: 2.0 };
        assert_eq!(t.apply(c).unwrap(), c);
    }

    #[test]
    fn test_geographic_to_utm() {
        let t = Transform::between(&CRS::wgs84(), &CRS::from_epsg(32630)).unwrap();
        assert!(matches!(t, Transform::ToUtm(UtmZone { number: 30, north: true })));
        let out = t.apply(Coord { x: -3.0, y: 0.0 }).unwrap();
        assert!((out.x - 500_000.0).abs() < 0.01);
    }

    #[test]
    fn test_utm_zone_change() {
        let src = CRS::from_epsg(32630);
        let dst = CRS::from_epsg(32631);
        let t = Transform::between(&src, &dst).unwrap();
        assert!(matches!(t, Transform::UtmToUtm(_, _)));

        // A point on the 0° meridian sits at equal distance from both central meridians
        let lon_lat = UtmZone { number: 30, north: true }.forward(0.0, 45.0);
        let out = t.apply(Coord { x: lon_lat.0, y: lon_lat.1 }).unwrap();
        assert!((out.x - (1_000_000.0 - lon_lat.0)).abs() < 0.5);
        assert!((out.y - lon_lat.1).abs() < 0.5);
    }

    #[test]
    fn test_web_mercator_to_utm() {
        let zone = UtmZone { number: 45, north: true };
        let t = Transform::between(&CRS::from_epsg(3857), &CRS::utm(zone)).unwrap();
        assert!(matches!(t, Transform::Proj(_)));

        let out = t.apply(web_mercator(89.7, 24.4)).unwrap();
        let (e, n) = zone.forward(89.7, 24.4);
        assert!((out.x - e).abs() < 0.05, "{} vs {}", out.x, e);
        assert!((out.y - n).abs() < 0.05, "{} vs {}", out.y, n);
    }

    #[test]
    fn test_web_mercator_to_geographic() {
        let t = Transform::between(&CRS::from_epsg(3857), &CRS::wgs84()).unwrap();
        let out = t.apply(web_mercator(-60.0, -3.1)).unwrap();
        assert!((out.x + 60.0).abs() < 1e-9);
        assert!((out.y + 3.1).abs() < 1e-9);
    }

    #[test]
    fn test_other_projection_through_wkt() {
        let src = CRS::from_wkt(NAD83_UTM17N_ESRI);
        let t = Transform::between(&src, &CRS::wgs84()).unwrap();
        // False easting on the central meridian, at the equator
        let out = t.apply(Coord { x: 500_000.0, y: 0.0 }).unwrap();
        assert!((out.x + 81.0).abs() < 1e-6);
        assert!(out.y.abs() < 1e-6);
    }

    #[test]
    fn test_undefined_crs_is_unsupported() {
        let err = Transform::between(&CRS::from_epsg(2154), &CRS::from_epsg(32630));
        assert!(matches!(err, Err(Error::UnsupportedCrs(_))));
    }
}
