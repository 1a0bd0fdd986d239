//! Point type and forward/inverse projection math.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::fmt::{Display, Formatter};

/// SRID of the projection unit locations are stored in (ETRS-TM35FIN).
pub const PROJECTION_SRID: u32 = 3067;

// GRS80 ellipsoid, used by ETRS89.
const GRS80_A: f64 = 6_378_137.0;
const GRS80_F: f64 = 1.0 / 298.257_222_101;

const TM35FIN_CENTRAL_MERIDIAN_DEG: f64 = 27.0;
const TM35FIN_SCALE: f64 = 0.9996;
const TM35FIN_FALSE_EASTING: f64 = 500_000.0;

const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

pub type GeoResult<T> = Result<T, GeoError>;

#[derive(Debug, Clone, PartialEq)]
pub enum GeoError {
    UnsupportedSrid(u32),
    OutOfRange { srid: u32, x: f64, y: f64 },
}

impl Display for GeoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedSrid(srid) => write!(f, "unsupported spatial reference: EPSG:{srid}"),
            Self::OutOfRange { srid, x, y } => {
                write!(f, "coordinate ({x}, {y}) is outside the valid range of EPSG:{srid}")
            }
        }
    }
}

impl Error for GeoError {}

/// Supported spatial reference systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialReference {
    /// Geographic WGS84 longitude/latitude in degrees.
    Wgs84,
    /// ETRS89 / TM35FIN(E,N), metres.
    EtrsTm35Fin,
    /// Spherical (pseudo) Mercator used by web map tiles, metres.
    WebMercator,
}

impl SpatialReference {
    pub fn from_srid(srid: u32) -> GeoResult<Self> {
        match srid {
            4326 => Ok(Self::Wgs84),
            3067 => Ok(Self::EtrsTm35Fin),
            3857 => Ok(Self::WebMercator),
            other => Err(GeoError::UnsupportedSrid(other)),
        }
    }

    pub fn srid(self) -> u32 {
        match self {
            Self::Wgs84 => 4326,
            Self::EtrsTm35Fin => 3067,
            Self::WebMercator => 3857,
        }
    }
}

/// A 2D point in the SRS identified by `srid`.
///
/// For geographic systems `x` is longitude and `y` latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub srid: u32,
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(srid: u32, x: f64, y: f64) -> Self {
        Self { srid, x, y }
    }
}

/// Converts a `(latitude, longitude)` pair into a point in `target_srid`.
///
/// The pair order follows how external registers publish coordinates; the
/// resulting geographic point has `x = longitude`, `y = latitude`.
pub fn convert_from_wgs84(coords: (f64, f64), target_srid: u32) -> GeoResult<Point> {
    let (lat, lon) = coords;
    let point = Point::new(SpatialReference::Wgs84.srid(), lon, lat);
    transform(point, target_srid)
}

/// Transforms `point` into `target_srid`.
pub fn transform(point: Point, target_srid: u32) -> GeoResult<Point> {
    let source = SpatialReference::from_srid(point.srid)?;
    let target = SpatialReference::from_srid(target_srid)?;
    if source == target {
        return Ok(point);
    }

    let (lon, lat) = to_geographic(source, point)?;
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(GeoError::OutOfRange {
            srid: point.srid,
            x: point.x,
            y: point.y,
        });
    }
    let (x, y) = from_geographic(target, lon, lat)?;
    Ok(Point::new(target.srid(), x, y))
}

fn to_geographic(source: SpatialReference, point: Point) -> GeoResult<(f64, f64)> {
    match source {
        SpatialReference::Wgs84 => Ok((point.x, point.y)),
        SpatialReference::EtrsTm35Fin => Ok(tm35fin().inverse(point.x, point.y)),
        SpatialReference::WebMercator => Ok(web_mercator_inverse(point.x, point.y)),
    }
}

fn from_geographic(target: SpatialReference, lon: f64, lat: f64) -> GeoResult<(f64, f64)> {
    match target {
        SpatialReference::Wgs84 => Ok((lon, lat)),
        SpatialReference::EtrsTm35Fin => Ok(tm35fin().forward(lon, lat)),
        SpatialReference::WebMercator => {
            // Mercator diverges at the poles.
            if lat.abs() >= 90.0 {
                return Err(GeoError::OutOfRange {
                    srid: SpatialReference::Wgs84.srid(),
                    x: lon,
                    y: lat,
                });
            }
            Ok(web_mercator_forward(lon, lat))
        }
    }
}

fn web_mercator_forward(lon: f64, lat: f64) -> (f64, f64) {
    let x = WEB_MERCATOR_RADIUS * lon.to_radians();
    let y = WEB_MERCATOR_RADIUS * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

fn web_mercator_inverse(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / WEB_MERCATOR_RADIUS).to_degrees();
    let lat = (2.0 * (y / WEB_MERCATOR_RADIUS).exp().atan() - FRAC_PI_2).to_degrees();
    (lon, lat)
}

fn tm35fin() -> TransverseMercator {
    TransverseMercator {
        a: GRS80_A,
        f: GRS80_F,
        lon0: TM35FIN_CENTRAL_MERIDIAN_DEG.to_radians(),
        k0: TM35FIN_SCALE,
        false_easting: TM35FIN_FALSE_EASTING,
        false_northing: 0.0,
    }
}

/// Ellipsoidal Transverse Mercator with latitude of origin at the equator.
///
/// Series expansions after Snyder, "Map Projections: A Working Manual"
/// (USGS PP 1395), accurate to millimetres within a few degrees of the
/// central meridian.
struct TransverseMercator {
    a: f64,
    f: f64,
    lon0: f64,
    k0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl TransverseMercator {
    fn e2(&self) -> f64 {
        self.f * (2.0 - self.f)
    }

    fn meridian_arc(&self, phi: f64) -> f64 {
        let e2 = self.e2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        self.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }

    fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let e2 = self.e2();
        let ep2 = e2 / (1.0 - e2);
        let phi = lat_deg.to_radians();
        let lambda = lon_deg.to_radians();

        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = phi.tan();
        let n = self.a / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = (lambda - self.lon0) * cos_phi;
        let m = self.meridian_arc(phi);

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let x = self.k0
            * n
            * (a + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0);
        let y = self.k0
            * (m + n
                * tan_phi
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

        (x + self.false_easting, y + self.false_northing)
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let e2 = self.e2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = e2 / (1.0 - e2);

        let m = (y - self.false_northing) / self.k0;
        let mu = m / (self.a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let sqrt_1_e2 = (1.0 - e2).sqrt();
        let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);
        let e1_2 = e1 * e1;
        let e1_3 = e1_2 * e1;
        let e1_4 = e1_3 * e1;

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

        let (sin_phi1, cos_phi1) = phi1.sin_cos();
        let tan_phi1 = phi1.tan();
        let c1 = ep2 * cos_phi1 * cos_phi1;
        let t1 = tan_phi1 * tan_phi1;
        let denom = 1.0 - e2 * sin_phi1 * sin_phi1;
        let n1 = self.a / denom.sqrt();
        let r1 = self.a * (1.0 - e2) / denom.powf(1.5);
        let d = (x - self.false_easting) / (n1 * self.k0);

        let d2 = d * d;
        let d3 = d2 * d;
        let d4 = d3 * d;
        let d5 = d4 * d;
        let d6 = d5 * d;

        let phi = phi1
            - (n1 * tan_phi1 / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * ep2
                        - 3.0 * c1 * c1)
                        * d6
                        / 720.0);
        let lambda = self.lon0
            + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d5
                    / 120.0)
                / cos_phi1;

        (lambda.to_degrees(), phi.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::{convert_from_wgs84, transform, GeoError, Point, SpatialReference, PROJECTION_SRID};

    #[test]
    fn central_meridian_maps_to_false_easting() {
        let point = convert_from_wgs84((60.0, 27.0), PROJECTION_SRID).expect("transform");
        assert_eq!(point.srid, 3067);
        assert!((point.x - 500_000.0).abs() < 1e-6, "x = {}", point.x);
        // 0.9996 * meridian arc length to 60 degrees north.
        assert!((point.y - 6_651_411.19).abs() < 1.0, "y = {}", point.y);
    }

    #[test]
    fn helsinki_lands_in_expected_tm35fin_window() {
        let point = convert_from_wgs84((60.1699, 24.9384), PROJECTION_SRID).expect("transform");
        assert!(point.x > 385_000.0 && point.x < 387_000.0, "x = {}", point.x);
        assert!(point.y > 6_671_000.0 && point.y < 6_673_000.0, "y = {}", point.y);
    }

    #[test]
    fn tm35fin_inverse_round_trips() {
        let original = Point::new(4326, 23.7610, 61.4978);
        let projected = transform(original, 3067).expect("forward");
        let back = transform(projected, 4326).expect("inverse");
        assert!((back.x - original.x).abs() < 1e-6, "lon = {}", back.x);
        assert!((back.y - original.y).abs() < 1e-6, "lat = {}", back.y);
    }

    #[test]
    fn web_mercator_antimeridian_is_half_circumference() {
        let point = transform(Point::new(4326, 180.0, 0.0), 3857).expect("forward");
        assert!((point.x - 20_037_508.342_789).abs() < 1e-3);
        assert!(point.y.abs() < 1e-6);
    }

    #[test]
    fn same_reference_is_identity() {
        let point = Point::new(3067, 385_000.0, 6_672_000.0);
        assert_eq!(transform(point, 3067).expect("identity"), point);
    }

    #[test]
    fn rejects_unknown_srid() {
        let err = transform(Point::new(4326, 24.0, 60.0), 2393).expect_err("unsupported");
        assert_eq!(err, GeoError::UnsupportedSrid(2393));
        assert!(SpatialReference::from_srid(9999).is_err());
    }

    #[test]
    fn rejects_coordinates_outside_geographic_range() {
        let err = transform(Point::new(4326, 24.0, 95.0), 3067).expect_err("latitude > 90");
        assert!(matches!(err, GeoError::OutOfRange { srid: 4326, .. }));
    }
}
