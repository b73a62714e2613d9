//! Pure-Rust WGS84 ⇄ UTM projection (Snyder 1987, USGS formulas).
//!
//! Covers EPSG 326xx (UTM North) and 327xx (UTM South). This is the fast path
//! for the common case of lon/lat river layers analysed in UTM; every other
//! CRS pair goes through proj4rs (see `Transform`).

// ── WGS84 ellipsoid constants ────────────────────────────────────────────

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const E2: f64 = 2.0 * F - F * F; // eccentricity squared
const E_PRIME2: f64 = E2 / (1.0 - E2); // second eccentricity squared
const K0: f64 = 0.9996; // UTM scale factor
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// EPSG code of WGS84 geographic coordinates.
pub const WGS84_EPSG: u32 = 4326;

/// A UTM zone on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtmZone {
    /// Zone number, 1..=60
    pub number: u32,
    /// Northern hemisphere?
    pub north: bool,
}

impl UtmZone {
    /// Zone containing a WGS84 position.
    ///
    /// `zone = floor((lon + 180) / 6) + 1`, hemisphere from the sign of the
    /// latitude (the equator counts as north). Longitude 180 folds into zone 60.
    pub fn for_lon_lat(lon: f64, lat: f64) -> Self {
        let number = (((lon + 180.0) / 6.0).floor() as i64 + 1).clamp(1, 60) as u32;
        Self { number, north: lat >= 0.0 }
    }

    /// EPSG code (326xx / 327xx)
    pub fn epsg(&self) -> u32 {
        if self.north {
            32600 + self.number
        } else {
            32700 + self.number
        }
    }

    /// Central meridian in degrees
    pub fn central_meridian(&self) -> f64 {
        (self.number as f64 - 1.0) * 6.0 - 180.0 + 3.0
    }

    /// PROJ definition of the zone
    pub fn proj_string(&self) -> String {
        format!(
            "+proj=utm +zone={}{} +datum=WGS84 +units=m +no_defs",
            self.number,
            if self.north { "" } else { " +south" }
        )
    }

    /// Project WGS84 (longitude, latitude) in degrees to (easting, northing) in metres.
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        wgs84_to_utm(lon, lat, self.central_meridian(), self.north)
    }

    /// Unproject (easting, northing) in metres to WGS84 (longitude, latitude) in degrees.
    pub fn inverse(&self, easting: f64, northing: f64) -> (f64, f64) {
        utm_to_wgs84(easting, northing, self.central_meridian(), self.north)
    }
}

/// Check if an EPSG code represents WGS84 geographic.
pub fn is_wgs84(epsg: u32) -> bool {
    epsg == WGS84_EPSG
}

/// Parse an EPSG code into a UTM zone.
///
/// - EPSG 326xx → zone xx, North hemisphere
/// - EPSG 327xx → zone xx, South hemisphere
pub fn parse_utm_epsg(epsg: u32) -> Option<UtmZone> {
    if (32601..=32660).contains(&epsg) {
        Some(UtmZone { number: epsg - 32600, north: true })
    } else if (32701..=32760).contains(&epsg) {
        Some(UtmZone { number: epsg - 32700, north: false })
    } else {
        None
    }
}

// ── Core projection (Snyder 1987, USGS Prof. Paper 1395, pp. 61-64) ─────

fn wgs84_to_utm(lon_deg: f64, lat_deg: f64, lon0_deg: f64, north: bool) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let lon0 = lon0_deg.to_radians();

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a_coeff = cos_lat * (lon - lon0);

    let m = meridional_arc(lat);

    let a2 = a_coeff * a_coeff;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    // Snyder eq. 8-9
    let easting = K0 * n
        * (a_coeff
            + (1.0 - t + c) * a2 * a_coeff / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a_coeff / 120.0)
        + FALSE_EASTING;

    // Snyder eq. 8-10
    let northing = K0
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    let northing = if north { northing } else { northing + FALSE_NORTHING_SOUTH };

    (easting, northing)
}

fn utm_to_wgs84(easting: f64, northing: f64, lon0_deg: f64, north: bool) -> (f64, f64) {
    let x = easting - FALSE_EASTING;
    let y = if north { northing } else { northing - FALSE_NORTHING_SOUTH };

    let e4 = E2 * E2;
    let e6 = e4 * E2;

    // Footpoint latitude (Snyder eqs. 3-24, 3-26 and 8-18)
    let m = y / K0;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
    let sqrt_1_e2 = (1.0 - E2).sqrt();
    let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = E_PRIME2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let denom = 1.0 - E2 * sin_phi1 * sin_phi1;
    let n1 = A / denom.sqrt();
    let r1 = A * (1.0 - E2) / denom.powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    // Snyder eqs. 8-17 and 8-18
    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * E_PRIME2 - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    let lon = lon0_deg.to_radians()
        + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1) * d5
                / 120.0)
            / cos_phi1;

    (lon.to_degrees(), lat.to_degrees())
}

/// Meridional arc from equator to latitude `lat` (radians).
/// Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e2 = E2;
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    A * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64, msg: &str) {
        let diff = (a - b).abs();
        assert!(
            diff < tol,
            "{msg}: expected {b}, got {a}, diff {diff} exceeds tolerance {tol}"
        );
    }

    #[test]
    fn parse_utm_codes() {
        assert_eq!(parse_utm_epsg(32630), Some(UtmZone { number: 30, north: true }));
        assert_eq!(parse_utm_epsg(32721), Some(UtmZone { number: 21, north: false }));
        assert_eq!(parse_utm_epsg(4326), None);
        assert_eq!(parse_utm_epsg(32600), None);
        assert_eq!(parse_utm_epsg(32761), None);
    }

    #[test]
    fn zone_selection_by_position() {
        // Dhaka, 90.4°E 23.8°N → zone 46N
        let z = UtmZone::for_lon_lat(90.4, 23.8);
        assert_eq!(z.epsg(), 32646);
        // São Paulo, 46.6°W 23.5°S → zone 23S
        let z = UtmZone::for_lon_lat(-46.6, -23.5);
        assert_eq!(z.epsg(), 32723);
        // Equator counts as north
        assert!(UtmZone::for_lon_lat(10.0, 0.0).north);
        // Antimeridian edges
        assert_eq!(UtmZone::for_lon_lat(-180.0, 1.0).number, 1);
        assert_eq!(UtmZone::for_lon_lat(180.0, 1.0).number, 60);
    }

    // pyproj reference: Transformer.from_crs(4326, 32630, always_xy=True)
    //   .transform(-3.7037, 40.4168) → (440298.94, 4474257.31)
    #[test]
    fn madrid_forward() {
        let zone = UtmZone { number: 30, north: true };
        let (e, n) = zone.forward(-3.7037, 40.4168);
        assert_close(e, 440_298.94, 1.0, "easting");
        assert_close(n, 4_474_257.31, 1.0, "northing");
    }

    // Buenos Aires → UTM 21S: (373317.50, 6170036.17)
    #[test]
    fn buenos_aires_forward() {
        let zone = UtmZone { number: 21, north: false };
        let (e, n) = zone.forward(-58.3816, -34.6037);
        assert_close(e, 373_317.50, 1.0, "easting");
        assert_close(n, 6_170_036.17, 1.0, "northing");
    }

    #[test]
    fn equator_central_meridian() {
        let zone = UtmZone { number: 30, north: true };
        let (e, n) = zone.forward(-3.0, 0.0);
        assert_close(e, 500_000.0, 0.01, "easting at CM");
        assert_close(n, 0.0, 0.01, "northing at equator");
    }

    #[test]
    fn inverse_recovers_position() {
        for &(lon, lat) in &[(-3.7037, 40.4168), (-58.3816, -34.6037), (90.41, 23.81), (14.2, 62.9)] {
            let zone = UtmZone::for_lon_lat(lon, lat);
            let (e, n) = zone.forward(lon, lat);
            let (lon2, lat2) = zone.inverse(e, n);
            assert_close(lon2, lon, 1e-5, "longitude");
            assert_close(lat2, lat, 1e-5, "latitude");
        }
    }
}
