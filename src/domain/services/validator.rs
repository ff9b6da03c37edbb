//! Request Validator Service
//!
//! Pure domain logic for checking lookup payloads before a job exists.
//! This service has NO side effects: a rejected payload never reaches a store.

use crate::domain::entities::LookupRequest;
use crate::domain::value_objects::{LATITUDE_RANGE, LONGITUDE_RANGE};
use serde_json::{Map, Value};

/// Payload field carrying a `[lat, lng]` pair.
pub const COORDINATES_FIELD: &str = "coordinates";

/// Payload field carrying an address string.
pub const ADDRESS_FIELD: &str = "address";

/// Pseudo-field used when the body itself is not a JSON object.
pub const BODY_FIELD: &str = "json";

/// A payload rejected by the validation layer.
///
/// Every variant is scoped to one field; only the first violation found
/// is reported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing data for required field.")]
    MissingField { field: &'static str },

    #[error("Field may not be null.")]
    NullField { field: &'static str },

    #[error("Field may not be empty.")]
    EmptyField { field: &'static str },

    #[error("{message}")]
    InvalidType {
        field: &'static str,
        message: &'static str,
    },

    #[error("Coordinates list must contain exactly two floats.")]
    InvalidLength { field: &'static str },

    #[error("{message}")]
    OutOfRange {
        field: &'static str,
        message: &'static str,
    },

    #[error("Invalid JSON body.")]
    InvalidBody,
}

impl ValidationError {
    /// Field the error is reported under.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField { field }
            | Self::NullField { field }
            | Self::EmptyField { field }
            | Self::InvalidType { field, .. }
            | Self::InvalidLength { field }
            | Self::OutOfRange { field, .. } => field,
            Self::InvalidBody => BODY_FIELD,
        }
    }
}

/// Validator for lookup submissions.
pub struct RequestValidator;

impl RequestValidator {
    /// Decode a raw request body into a JSON object.
    ///
    /// An empty body is treated as `{}` so that missing fields are reported
    /// per field rather than as a malformed body.
    pub fn parse_body(body: &[u8]) -> Result<Value, ValidationError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Object(Map::new()));
        }
        match serde_json::from_slice::<Value>(body) {
            Ok(value @ Value::Object(_)) => Ok(value),
            _ => Err(ValidationError::InvalidBody),
        }
    }

    /// Validate a `{"coordinates": [lat, lng]}` payload.
    ///
    /// Checks run in order: presence, element types, length, latitude
    /// range, longitude range.
    pub fn validate_coordinates(payload: &Value) -> Result<LookupRequest, ValidationError> {
        let field = COORDINATES_FIELD;
        let items = match Self::required(payload, field)? {
            Value::Array(items) => items,
            _ => {
                return Err(ValidationError::InvalidType {
                    field,
                    message: "Not a valid list.",
                })
            }
        };

        let numbers = items
            .iter()
            .map(|item| {
                item.as_f64().ok_or(ValidationError::InvalidType {
                    field,
                    message: "Not a valid number.",
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        let &[latitude, longitude] = numbers.as_slice() else {
            return Err(ValidationError::InvalidLength { field });
        };

        Self::check_range(latitude, longitude)?;
        Ok(LookupRequest::by_coordinates(latitude, longitude))
    }

    /// Validate an `{"address": "<string>"}` payload.
    pub fn validate_address(payload: &Value) -> Result<LookupRequest, ValidationError> {
        let field = ADDRESS_FIELD;
        let address = Self::required(payload, field)?
            .as_str()
            .ok_or(ValidationError::InvalidType {
                field,
                message: "Not a valid string.",
            })?;

        if address.trim().is_empty() {
            return Err(ValidationError::EmptyField { field });
        }

        Ok(LookupRequest::by_address(address))
    }

    /// Re-check the invariants of an already typed request.
    pub fn validate_request(request: &LookupRequest) -> Result<(), ValidationError> {
        match request {
            LookupRequest::ByAddress { address } if address.trim().is_empty() => {
                Err(ValidationError::EmptyField {
                    field: ADDRESS_FIELD,
                })
            }
            LookupRequest::ByAddress { .. } => Ok(()),
            LookupRequest::ByCoordinates {
                latitude,
                longitude,
            } => Self::check_range(*latitude, *longitude),
        }
    }

    fn check_range(latitude: f64, longitude: f64) -> Result<(), ValidationError> {
        let field = COORDINATES_FIELD;
        // NaN falls outside both ranges.
        if !LATITUDE_RANGE.contains(&latitude) {
            return Err(ValidationError::OutOfRange {
                field,
                message: "Latitude must be between -90 and 90",
            });
        }
        if !LONGITUDE_RANGE.contains(&longitude) {
            return Err(ValidationError::OutOfRange {
                field,
                message: "Longitude must be between -180 and 180",
            });
        }
        Ok(())
    }

    fn required<'a>(payload: &'a Value, field: &'static str) -> Result<&'a Value, ValidationError> {
        match payload.get(field) {
            None => Err(ValidationError::MissingField { field }),
            Some(Value::Null) => Err(ValidationError::NullField { field }),
            Some(value) => Ok(value),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    // ===== Body Parsing Tests =====

    #[test]
    fn test_parse_body_object() {
        let value = RequestValidator::parse_body(br#"{"address": "x"}"#).unwrap();
        assert_eq!(value, json!({"address": "x"}));
    }

    #[test]
    fn test_parse_body_empty_is_empty_object() {
        assert_eq!(RequestValidator::parse_body(b"").unwrap(), json!({}));
        assert_eq!(RequestValidator::parse_body(b"  \n").unwrap(), json!({}));
    }

    #[test]
    fn test_parse_body_rejects_non_object() {
        assert_eq!(
            RequestValidator::parse_body(b"[1, 2]"),
            Err(ValidationError::InvalidBody)
        );
        assert_eq!(
            RequestValidator::parse_body(b"{not json"),
            Err(ValidationError::InvalidBody)
        );
        assert_eq!(ValidationError::InvalidBody.field(), "json");
    }

    // ===== Coordinates Tests =====

    #[test]
    fn test_coordinates_valid() {
        let req =
            RequestValidator::validate_coordinates(&json!({"coordinates": [50, 50]})).unwrap();
        assert_eq!(req, LookupRequest::by_coordinates(50.0, 50.0));
    }

    #[test]
    fn test_coordinates_missing() {
        let err = RequestValidator::validate_coordinates(&json!({"nonsense": 42})).unwrap_err();
        assert_eq!(err, ValidationError::MissingField { field: "coordinates" });
        assert_eq!(err.to_string(), "Missing data for required field.");
    }

    #[test]
    fn test_coordinates_null() {
        let err =
            RequestValidator::validate_coordinates(&json!({"coordinates": null})).unwrap_err();
        assert_eq!(err.to_string(), "Field may not be null.");
    }

    #[test]
    fn test_coordinates_not_a_list() {
        let err = RequestValidator::validate_coordinates(&json!({"coordinates": "50,50"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "Not a valid list.");
        assert_eq!(err.field(), "coordinates");
    }

    #[test]
    fn test_coordinates_non_numeric_element() {
        let err = RequestValidator::validate_coordinates(&json!({"coordinates": [1, "x"]}))
            .unwrap_err();
        assert_eq!(err.to_string(), "Not a valid number.");
    }

    #[test]
    fn test_coordinates_wrong_length() {
        for payload in [
            json!({"coordinates": []}),
            json!({"coordinates": [1]}),
            json!({"coordinates": [1, 2, 3]}),
        ] {
            let err = RequestValidator::validate_coordinates(&payload).unwrap_err();
            assert_eq!(err, ValidationError::InvalidLength { field: "coordinates" });
            assert_eq!(err.to_string(), "Coordinates list must contain exactly two floats.");
        }
    }

    #[test]
    fn test_coordinates_out_of_range_messages() {
        let cases = [
            (json!([-91, 0]), "Latitude must be between -90 and 90"),
            (json!([91, 0]), "Latitude must be between -90 and 90"),
            (json!([0, -181]), "Longitude must be between -180 and 180"),
            (json!([0, 181]), "Longitude must be between -180 and 180"),
        ];
        for (coords, message) in cases {
            let err = RequestValidator::validate_coordinates(&json!({ "coordinates": coords }))
                .unwrap_err();
            assert_eq!(err.to_string(), message);
        }
    }

    #[test]
    fn test_coordinates_reports_latitude_first() {
        let err = RequestValidator::validate_coordinates(&json!({"coordinates": [100, 200]}))
            .unwrap_err();
        assert_eq!(err.to_string(), "Latitude must be between -90 and 90");
    }

    // ===== Address Tests =====

    #[test]
    fn test_address_valid() {
        let req = RequestValidator::validate_address(&json!({"address": "Test Address"})).unwrap();
        assert_eq!(req, LookupRequest::by_address("Test Address"));
    }

    #[test]
    fn test_address_missing() {
        let err = RequestValidator::validate_address(&json!({})).unwrap_err();
        assert_eq!(err, ValidationError::MissingField { field: "address" });
    }

    #[test]
    fn test_address_wrong_type() {
        let err = RequestValidator::validate_address(&json!({"address": 42})).unwrap_err();
        assert_eq!(err.to_string(), "Not a valid string.");
    }

    #[test]
    fn test_address_empty() {
        let err = RequestValidator::validate_address(&json!({"address": "   "})).unwrap_err();
        assert_eq!(err, ValidationError::EmptyField { field: "address" });
    }

    // ===== Typed Request Tests =====

    #[test]
    fn test_validate_request() {
        let check = |req: LookupRequest| RequestValidator::validate_request(&req);
        assert!(check(LookupRequest::by_address("a")).is_ok());
        assert!(check(LookupRequest::by_address("")).is_err());
        assert!(check(LookupRequest::by_coordinates(10.0, 10.0)).is_ok());
        assert!(check(LookupRequest::by_coordinates(95.0, 10.0)).is_err());
        assert!(check(LookupRequest::by_coordinates(f64::NAN, 0.0)).is_err());
    }

    proptest! {
        #[test]
        fn prop_in_range_coordinates_accepted(lat in -90.0f64..=90.0, lng in -180.0f64..=180.0) {
            let result =
                RequestValidator::validate_coordinates(&json!({"coordinates": [lat, lng]}));
            prop_assert_eq!(result, Ok(LookupRequest::by_coordinates(lat, lng)));
        }

        #[test]
        fn prop_out_of_range_latitude_rejected(
            lat in 90.000_001f64..1.0e6,
            negate in any::<bool>(),
            lng in -180.0f64..=180.0,
        ) {
            let lat = if negate { -lat } else { lat };
            let result =
                RequestValidator::validate_coordinates(&json!({"coordinates": [lat, lng]}));
            let is_out_of_range = matches!(result, Err(ValidationError::OutOfRange { .. }));
            prop_assert!(is_out_of_range);
        }

        #[test]
        fn prop_out_of_range_longitude_rejected(
            lat in -90.0f64..=90.0,
            lng in 180.000_001f64..1.0e6,
            negate in any::<bool>(),
        ) {
            let lng = if negate { -lng } else { lng };
            let result =
                RequestValidator::validate_coordinates(&json!({"coordinates": [lat, lng]}));
            let is_out_of_range = matches!(result, Err(ValidationError::OutOfRange { .. }));
            prop_assert!(is_out_of_range);
        }
    }
}
