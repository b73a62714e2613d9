//! Coordinate Reference System handling
//!
//! Layers carry their CRS as read from the `.prj` sidecar (WKT). The pipeline
//! interprets three things directly: geographic vs projected, which WGS84 UTM
//! zone a projected CRS is, and Web Mercator. Anything else is handed to
//! proj4rs through a PROJ definition derived from the WKT.

mod transform;
pub mod utm;

pub use transform::Transform;
pub use utm::UtmZone;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad classification of a CRS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsKind {
    /// Angular coordinates (degrees)
    Geographic,
    /// Planar coordinates (linear units)
    Projected,
    Unknown,
}

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation (primary)
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
        }
    }

    /// Create a CRS from a WKT string.
    ///
    /// The EPSG code is picked up from the outermost `AUTHORITY`/`ID` node
    /// when present.
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        let wkt = wkt.into().trim().to_string();
        let epsg = wkt_epsg(&wkt);
        Self {
            wkt: Some(wkt),
            epsg,
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(utm::WGS84_EPSG)
    }

    /// WGS84 / UTM CRS for the given zone
    pub fn utm(zone: UtmZone) -> Self {
        Self::from_epsg(zone.epsg())
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Geographic, projected, or unknown
    pub fn kind(&self) -> CrsKind {
        if let Some(code) = self.epsg {
            // EPSG 4000-4999 is the geographic 2D block
            if (4000..5000).contains(&code) {
                return CrsKind::Geographic;
            }
            if utm::parse_utm_epsg(code).is_some() || WEB_MERCATOR_EPSG.contains(&code) {
                return CrsKind::Projected;
            }
        }
        if let Some(wkt) = &self.wkt {
            let head = wkt.trim_start().to_ascii_uppercase();
            if ["GEOGCS", "GEOGCRS", "GEOGRAPHICCRS"].iter().any(|k| head.starts_with(k)) {
                return CrsKind::Geographic;
            }
            if ["PROJCS", "PROJCRS", "PROJECTEDCRS"].iter().any(|k| head.starts_with(k)) {
                return CrsKind::Projected;
            }
        }
        CrsKind::Unknown
    }

    /// Is this an angular (degree-based) CRS?
    pub fn is_geographic(&self) -> bool {
        self.kind() == CrsKind::Geographic
    }

    /// WGS84 longitude/latitude, by EPSG code or by datum name in the WKT
    pub fn is_wgs84(&self) -> bool {
        if let Some(code) = self.epsg {
            return utm::is_wgs84(code);
        }
        self.is_geographic() && self.wkt.as_deref().map_or(false, wkt_is_wgs84)
    }

    /// Spherical (Web / Pseudo) Mercator
    pub fn is_web_mercator(&self) -> bool {
        if let Some(code) = self.epsg {
            return WEB_MERCATOR_EPSG.contains(&code);
        }
        self.wkt.as_deref().map_or(false, |wkt| {
            let upper = wkt.to_ascii_uppercase();
            WEB_MERCATOR_NAMES.iter().any(|name| upper.contains(name))
        })
    }

    /// WGS84 UTM zone, if this CRS is one
    pub fn utm_zone(&self) -> Option<UtmZone> {
        if let Some(zone) = self.epsg.and_then(utm::parse_utm_epsg) {
            return Some(zone);
        }
        if self.kind() == CrsKind::Projected {
            return self.wkt.as_deref().and_then(wkt_utm_zone);
        }
        None
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }

        if let (Some(a), Some(b)) = (self.utm_zone(), other.utm_zone()) {
            return a == b;
        }

        if self.is_wgs84() && other.is_wgs84() {
            return true;
        }

        // If both have WKT, compare (this is imperfect)
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }

        false
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(zone) = self.utm_zone() {
            return format!("UTM zone {}{}", zone.number, if zone.north { 'N' } else { 'S' });
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", wkt.chars().take(50).collect::<String>());
        }
        "Unknown".to_string()
    }

    /// PROJ definition for proj4rs.
    ///
    /// WGS84, its UTM zones and Web Mercator are generated directly; any other
    /// CRS is converted from its WKT. `None` when neither works.
    pub fn proj_string(&self) -> Option<String> {
        if let Some(zone) = self.utm_zone() {
            return Some(zone.proj_string());
        }
        if self.is_wgs84() {
            return Some(WGS84_PROJ.to_string());
        }
        if self.is_web_mercator() {
            return Some(WEB_MERCATOR_PROJ.to_string());
        }
        self.wkt
            .as_deref()
            .and_then(|wkt| proj4wkt::wkt_to_projstring(wkt).ok())
    }

    /// WKT suitable for a `.prj` sidecar.
    ///
    /// Returns the stored WKT when there is one, otherwise generates ESRI-style
    /// WKT for WGS84, WGS84 / UTM and Web Mercator.
    pub fn to_wkt(&self) -> Option<String> {
        if let Some(wkt) = &self.wkt {
            return Some(wkt.clone());
        }
        if let Some(zone) = self.utm_zone() {
            return Some(utm_wkt(zone));
        }
        if self.is_wgs84() {
            return Some(GCS_WGS84.to_string());
        }
        if self.is_web_mercator() {
            return Some(WEB_MERCATOR_WKT.to_string());
        }
        None
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

const WGS84_PROJ: &str = "+proj=longlat +datum=WGS84 +no_defs";

const WEB_MERCATOR_PROJ: &str =
    "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs";

const WEB_MERCATOR_EPSG: [u32; 5] = [3857, 3785, 900913, 102100, 102113];

const WEB_MERCATOR_NAMES: [&str; 4] = [
    "WEB_MERCATOR",
    "PSEUDO-MERCATOR",
    "PSEUDO_MERCATOR",
    "MERCATOR_AUXILIARY_SPHERE",
];

const GCS_WGS84: &str = "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",\
SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],PRIMEM[\"Greenwich\",0.0],\
UNIT[\"Degree\",0.0174532925199433]]";

const WEB_MERCATOR_WKT: &str = "PROJCS[\"WGS_1984_Web_Mercator_Auxiliary_Sphere\",\
GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],\
PRIMEM[\"Greenwich\",0.0],UNIT[\"Degree\",0.0174532925199433]],\
PROJECTION[\"Mercator_Auxiliary_Sphere\"],PARAMETER[\"False_Easting\",0.0],\
PARAMETER[\"False_Northing\",0.0],PARAMETER[\"Central_Meridian\",0.0],\
PARAMETER[\"Standard_Parallel_1\",0.0],PARAMETER[\"Auxiliary_Sphere_Type\",0.0],\
UNIT[\"Meter\",1.0]]";

fn utm_wkt(zone: UtmZone) -> String {
    format!(
        "PROJCS[\"WGS_1984_UTM_Zone_{}{}\",{},PROJECTION[\"Transverse_Mercator\"],\
PARAMETER[\"False_Easting\",500000.0],PARAMETER[\"False_Northing\",{:.1}],\
PARAMETER[\"Central_Meridian\",{:.1}],PARAMETER[\"Scale_Factor\",0.9996],\
PARAMETER[\"Latitude_Of_Origin\",0.0],UNIT[\"Meter\",1.0]]",
        zone.number,
        if zone.north { 'N' } else { 'S' },
        GCS_WGS84,
        if zone.north { 0.0 } else { 10_000_000.0 },
        zone.central_meridian(),
    )
}

/// EPSG code from the last `AUTHORITY["EPSG","nnnn"]` or `ID["EPSG",nnnn]` node.
fn wkt_epsg(wkt: &str) -> Option<u32> {
    let upper = wkt.to_ascii_uppercase();
    let authority = upper.rfind("AUTHORITY[\"EPSG\",");
    let id = upper.rfind("ID[\"EPSG\",");
    let (start, skip) = match (authority, id) {
        (Some(a), Some(i)) if i > a => (i, "ID[\"EPSG\",".len()),
        (Some(a), _) => (a, "AUTHORITY[\"EPSG\",".len()),
        (None, Some(i)) => (i, "ID[\"EPSG\",".len()),
        (None, None) => return None,
    };
    let digits: String = upper[start + skip..]
        .trim_start_matches(|c: char| c == '"' || c.is_whitespace())
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Datum named as WGS 84 in any of the usual spellings
fn wkt_is_wgs84(wkt: &str) -> bool {
    let upper = wkt.to_ascii_uppercase();
    ["WGS_1984", "WGS 84", "WGS84", "WGS 1984"].iter().any(|name| upper.contains(name))
}

/// Zone from names like `WGS 84 / UTM zone 33N` or `WGS_1984_UTM_Zone_33N`.
///
/// Only WGS84 UTM counts; `NAD83 / UTM zone 17N` and friends go through proj4rs.
fn wkt_utm_zone(wkt: &str) -> Option<UtmZone> {
    if !wkt_is_wgs84(wkt) {
        return None;
    }
    let upper = wkt.to_ascii_uppercase();
    let pos = upper.find("UTM ZONE ").or_else(|| upper.find("UTM_ZONE_"))?;
    let rest = &upper[pos + "UTM ZONE ".len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let number: u32 = digits.parse().ok()?;
    if !(1..=60).contains(&number) {
        return None;
    }
    let north = match rest[digits.len()..].chars().next() {
        Some('S') => false,
        _ => true,
    };
    Some(UtmZone { number, north })
}
