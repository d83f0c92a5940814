use serde_json::{Map, Value};

use crate::errors::RecordError;

pub const NAME_KEY: &str = "BPLCNM";
pub const CATEGORY_KEY: &str = "UPTAENM";
pub const PHONE_KEY: &str = "SITETEL";
pub const JIBUN_ADDRESS_KEY: &str = "SITEWHLADDR";
pub const DORO_ADDRESS_KEY: &str = "RDNWHLADDR";
pub const LONGITUDE_KEY: &str = "X";
pub const LATITUDE_KEY: &str = "Y";

/// A mapped payload value. `Absent` means the key was missing or `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Absent,
    Present(String),
}

impl Field {
    /// Lenient view: absent fields read as the empty string.
    pub fn as_str(&self) -> &str {
        match self {
            Field::Absent => "",
            Field::Present(value) => value.as_str(),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    pub fn is_blank(&self) -> bool {
        self.as_str().trim().is_empty()
    }

    fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Field::Absent,
            Some(Value::String(text)) => Field::Present(text.clone()),
            Some(Value::Number(number)) => Field::Present(number.to_string()),
            Some(Value::Bool(flag)) => Field::Present(flag.to_string()),
            Some(Value::Array(_)) | Some(Value::Object(_)) => Field::Present(String::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    pub name: Field,
    pub category: Field,
    pub phone: Field,
    pub jibun_address: Field,
    pub doro_address: Field,
    pub longitude: Field,
    pub latitude: Field,
}

/// Outcome of reading the coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coordinates {
    Valid { longitude: f64, latitude: f64 },
    Missing,
    Invalid,
}

impl FieldSet {
    fn entries(&self) -> [(&'static str, &Field); 7] {
        [
            (NAME_KEY, &self.name),
            (CATEGORY_KEY, &self.category),
            (PHONE_KEY, &self.phone),
            (JIBUN_ADDRESS_KEY, &self.jibun_address),
            (DORO_ADDRESS_KEY, &self.doro_address),
            (LONGITUDE_KEY, &self.longitude),
            (LATITUDE_KEY, &self.latitude),
        ]
    }

    /// Source keys that were not present in the payload.
    pub fn absent_keys(&self) -> Vec<&'static str> {
        self.entries()
            .into_iter()
            .filter(|(_, field)| field.is_absent())
            .map(|(key, _)| key)
            .collect()
    }

    pub fn require_all(&self) -> Result<(), RecordError> {
        match self.absent_keys().first() {
            Some(key) => Err(RecordError::MissingField(*key)),
            None => Ok(()),
        }
    }

    pub fn phone(&self) -> String {
        normalize_phone(self.phone.as_str())
    }

    pub fn coordinates(&self) -> Coordinates {
        if self.longitude.is_blank() || self.latitude.is_blank() {
            return Coordinates::Missing;
        }
        match (
            parse_coordinate(self.longitude.as_str()),
            parse_coordinate(self.latitude.as_str()),
        ) {
            (Some(longitude), Some(latitude)) => Coordinates::Valid {
                longitude,
                latitude,
            },
            _ => Coordinates::Invalid,
        }
    }
}

pub fn extract(payload: &str) -> Result<FieldSet, RecordError> {
    let root: Value = serde_json::from_str(payload)
        .map_err(|err| RecordError::MalformedPayload(err.to_string()))?;
    let object = root
        .as_object()
        .ok_or_else(|| RecordError::MalformedPayload("payload is not a JSON object".into()))?;

    Ok(FieldSet {
        name: field(object, NAME_KEY),
        category: field(object, CATEGORY_KEY),
        phone: field(object, PHONE_KEY),
        jibun_address: field(object, JIBUN_ADDRESS_KEY),
        doro_address: field(object, DORO_ADDRESS_KEY),
        longitude: field(object, LONGITUDE_KEY),
        latitude: field(object, LATITUDE_KEY),
    })
}

fn field(object: &Map<String, Value>, key: &str) -> Field {
    Field::from_value(object.get(key))
}

pub fn normalize_phone(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

fn parse_coordinate(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_mapped_fields() {
        let fields = extract(
            r#"{"BPLCNM":"을지면옥","UPTAENM":"냉면집","SITETEL":"02 2266 7052",
                "SITEWHLADDR":"서울특별시 중구 입정동 177-1","RDNWHLADDR":"서울특별시 중구 충무로14길 2-1",
                "X":"199298.43","Y":"451620.891","MGTNO":"3000000-101-1985-01234"}"#,
        )
        .unwrap();

        assert_eq!(fields.name, Field::Present("을지면옥".into()));
        assert_eq!(fields.category.as_str(), "냉면집");
        assert_eq!(fields.phone(), "0222667052");
        assert!(fields.absent_keys().is_empty());
        assert_eq!(
            fields.coordinates(),
            Coordinates::Valid {
                longitude: 199298.43,
                latitude: 451620.891
            }
        );
    }

    #[test]
    fn distinguishes_absent_from_empty() {
        let fields = extract(r#"{"BPLCNM":"","SITETEL":null,"X":127.0}"#).unwrap();

        assert_eq!(fields.name, Field::Present(String::new()));
        assert!(fields.phone.is_absent());
        assert_eq!(fields.phone(), "");
        assert_eq!(fields.longitude.as_str(), "127.0");
        assert_eq!(
            fields.absent_keys(),
            vec![CATEGORY_KEY, PHONE_KEY, JIBUN_ADDRESS_KEY, DORO_ADDRESS_KEY, LATITUDE_KEY]
        );
        assert_eq!(
            fields.require_all(),
            Err(RecordError::MissingField(CATEGORY_KEY))
        );
    }

    #[test]
    fn rejects_unparseable_payloads() {
        assert!(matches!(
            extract("{not json"),
            Err(RecordError::MalformedPayload(_))
        ));
        assert!(matches!(
            extract(r#"["BPLCNM"]"#),
            Err(RecordError::MalformedPayload(_))
        ));
    }

    #[test]
    fn classifies_coordinates() {
        let missing = extract(r#"{"X":"","Y":"37.5"}"#).unwrap();
        assert_eq!(missing.coordinates(), Coordinates::Missing);

        let invalid = extract(r#"{"X":"east","Y":"37.5"}"#).unwrap();
        assert_eq!(invalid.coordinates(), Coordinates::Invalid);

        let not_finite = extract(r#"{"X":"NaN","Y":"37.5"}"#).unwrap();
        assert_eq!(not_finite.coordinates(), Coordinates::Invalid);

        let padded = extract(r#"{"X":" 127.0276 ","Y":"37.4979"}"#).unwrap();
        assert_eq!(
            padded.coordinates(),
            Coordinates::Valid {
                longitude: 127.0276,
                latitude: 37.4979
            }
        );
    }
}
