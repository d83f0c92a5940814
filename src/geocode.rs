use geo::Point;

use crate::errors::RecordError;

pub trait Geocoder: Send + Sync {
    fn to_point(&self, longitude: f64, latitude: f64) -> Result<Point<f64>, RecordError>;
}

/// Builds points straight from the dataset's x/y pair without reprojection.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanarGeocoder;

impl Geocoder for PlanarGeocoder {
    fn to_point(&self, longitude: f64, latitude: f64) -> Result<Point<f64>, RecordError> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(RecordError::InvalidLocation(format!(
                "non-finite coordinate pair ({longitude}, {latitude})"
            )));
        }
        Ok(Point::new(longitude, latitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn places_longitude_on_x_axis() {
        let point = PlanarGeocoder.to_point(127.0276, 37.4979).unwrap();
        assert_eq!(point.x(), 127.0276);
        assert_eq!(point.y(), 37.4979);
    }

    #[test]
    fn rejects_non_finite_components() {
        assert!(PlanarGeocoder.to_point(f64::NAN, 37.0).is_err());
        assert!(PlanarGeocoder.to_point(127.0, f64::INFINITY).is_err());
    }
}
