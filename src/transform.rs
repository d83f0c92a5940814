use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::split_address;
use crate::category::Category;
use crate::errors::RecordError;
use crate::extract::{extract, Coordinates, FieldSet};
use crate::geocode::Geocoder;
use crate::model::{NormalizedRestaurant, RawRecord};

/// What to do with a record whose coordinates are missing or unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationPolicy {
    /// Leave the record unwritten and dirty.
    #[default]
    Skip,
    /// Store the record at (0, 0).
    DefaultToZero,
    /// Store the record without a location.
    Omit,
}

impl LocationPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "skip" => Some(LocationPolicy::Skip),
            "zero" | "default_to_zero" => Some(LocationPolicy::DefaultToZero),
            "omit" | "none" => Some(LocationPolicy::Omit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LocationPolicy::Skip => "skip",
            LocationPolicy::DefaultToZero => "zero",
            LocationPolicy::Omit => "omit",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransformOptions {
    pub location_policy: LocationPolicy,
    /// Fail records whose payload lacks any mapped key.
    pub strict_fields: bool,
}

pub fn normalize_record(
    record: &RawRecord,
    options: &TransformOptions,
    geocoder: &dyn Geocoder,
) -> Result<NormalizedRestaurant, RecordError> {
    let fields = extract(&record.payload)?;
    if options.strict_fields {
        fields.require_all()?;
    } else {
        let absent = fields.absent_keys();
        if !absent.is_empty() {
            debug!(record_id = %record.id, ?absent, "payload is missing mapped keys");
        }
    }

    let location = resolve_location(&fields, options.location_policy, geocoder)?;
    let jibun = split_address(fields.jibun_address.as_str());
    let doro = split_address(fields.doro_address.as_str());

    Ok(NormalizedRestaurant {
        id: record.id.clone(),
        name: fields.name.as_str().to_string(),
        category: Category::normalize(fields.category.as_str()),
        phone: fields.phone(),
        province: jibun.province,
        district: jibun.district,
        jibun_detail: jibun.detail,
        doro_detail: doro.detail,
        location,
    })
}

fn resolve_location(
    fields: &FieldSet,
    policy: LocationPolicy,
    geocoder: &dyn Geocoder,
) -> Result<Option<geo::Point<f64>>, RecordError> {
    let problem = match fields.coordinates() {
        Coordinates::Valid {
            longitude,
            latitude,
        } => return geocoder.to_point(longitude, latitude).map(Some),
        Coordinates::Missing => "coordinates are missing",
        Coordinates::Invalid => "coordinates are not numeric",
    };

    match policy {
        LocationPolicy::Skip => Err(RecordError::InvalidLocation(problem.to_string())),
        LocationPolicy::DefaultToZero => geocoder.to_point(0.0, 0.0).map(Some),
        LocationPolicy::Omit => Ok(None),
    }
}
