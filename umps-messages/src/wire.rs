//! Self-describing binary encoding (spec §6: "tag-length-value, equivalent in expressive power
//! to CBOR") plus a lossless JSON debugging representation.

use serde::de::DeserializeOwned;
use serde::Serialize;

use umps_base::error::{Error, Result};

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    ciborium::into_writer(value, &mut buffer)
        .map_err(|error| Error::serialization_failure(format!("cbor encode: {error}")))?;
    Ok(buffer)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes)
        .map_err(|error| Error::serialization_failure(format!("cbor decode: {error}")))
}

/// Produces the lossless JSON debugging representation (spec §6) by round-tripping through the
/// same typed value the wire encoding uses.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|error| Error::serialization_failure(format!("json encode: {error}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn round_trips_through_cbor() {
        let value = Sample {
            name: "x".to_string(),
            count: 3,
        };
        let bytes = encode(&value).unwrap();
        let decoded: Sample = decode(&bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn json_representation_is_lossless() {
        let value = Sample {
            name: "y".to_string(),
            count: 7,
        };
        let json = to_json(&value).unwrap();
        let decoded: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, value);
    }
}
