//! Serde adapters for fields stored as native BSON types in MongoDB.
//!
//! The same structs are read from MongoDB, from the JSON snapshot held in
//! Redis and from API clients, so every adapter accepts both the BSON form
//! (`ObjectId`, `DateTime`, `Int32`/`Double`) and its plain JSON counterpart.
//! Serialization always produces the JSON-friendly form; the repository
//! converts ids and timestamps back to BSON before writing.

use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, Bson};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

fn object_id_from_bson<E: serde::de::Error>(value: Bson) -> Result<Option<String>, E> {
    match value {
        Bson::ObjectId(oid) => Ok(Some(oid.to_hex())),
        Bson::String(hex) => ObjectId::parse_str(&hex)
            .map(|oid| Some(oid.to_hex()))
            .map_err(E::custom),
        Bson::Null | Bson::Undefined => Ok(None),
        other => Err(E::custom(format!(
            "expected an object id, found {:?}",
            other.element_type()
        ))),
    }
}

/// `ObjectId` or hex string into a hex `String`
pub mod object_id {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        object_id_from_bson(Bson::deserialize(deserializer)?)?
            .ok_or_else(|| D::Error::custom("object id must not be null"))
    }
}

/// Nullable variant of [`object_id`]
pub mod optional_object_id {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        object_id_from_bson(Bson::deserialize(deserializer)?)
    }
}

/// BSON `DateTime` or RFC 3339 string, serialized as RFC 3339
pub mod optional_datetime {
    use super::*;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(timestamp) => serializer.serialize_str(&timestamp.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Bson::deserialize(deserializer)? {
            Bson::DateTime(timestamp) => Ok(Some(timestamp.to_chrono())),
            Bson::String(raw) => DateTime::parse_from_rfc3339(&raw)
                .map(|timestamp| Some(timestamp.with_timezone(&Utc)))
                .map_err(D::Error::custom),
            Bson::Null | Bson::Undefined => Ok(None),
            other => Err(D::Error::custom(format!(
                "expected a datetime, found {:?}",
                other.element_type()
            ))),
        }
    }
}

fn integer_from_bson(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) if v.is_finite() => Some(v.trunc() as i64),
        _ => None,
    }
}

/// Any numeric BSON value truncated to `i64`; null counts as zero
///
/// Documents written by other clients store whole numbers as doubles.
pub mod integer {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Bson::deserialize(deserializer)?;
        match value {
            Bson::Null | Bson::Undefined => Ok(0),
            ref other => integer_from_bson(other).ok_or_else(|| {
                D::Error::custom(format!("expected a number, found {:?}", other.element_type()))
            }),
        }
    }
}

/// Nullable variant of [`integer`]
pub mod optional_integer {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Bson::deserialize(deserializer)?;
        match value {
            Bson::Null | Bson::Undefined => Ok(None),
            ref other => integer_from_bson(other).map(Some).ok_or_else(|| {
                D::Error::custom(format!("expected a number, found {:?}", other.element_type()))
            }),
        }
    }
}
