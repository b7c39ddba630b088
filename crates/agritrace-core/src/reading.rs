//! # Sensor Reading Data Model
//!
//! A reading is a mapping of named sensor fields captured at one instant
//! and tied to exactly one batch. Readings are immutable once recorded;
//! the leaf digest is a pure function of the payload, so any later edit
//! to a stored payload is detectable against the anchored root.
//!
//! The wire field names (`temperature`, `humidity`, `soilMoisture`, `ph`,
//! `rainfall`, `npk.{nitrogen,phosphorus,potassium}`) match what field
//! devices already report.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EncodingError;
use crate::identity::{BatchId, ReadingId};
use crate::temporal::Timestamp;

/// Macro-nutrient sub-record of a sensor sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Npk {
    /// Soil nitrogen (mg/kg).
    pub nitrogen: f64,
    /// Soil phosphorus (mg/kg).
    pub phosphorus: f64,
    /// Soil potassium (mg/kg).
    pub potassium: f64,
}

/// A typed sensor sample as reported by a field device.
///
/// Optional fields are omitted from the serialized object entirely rather
/// than emitted as `null` — an absent field and a null field would
/// otherwise canonicalize to different bytes for the same physical sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorValues {
    /// Air temperature (°C).
    pub temperature: f64,
    /// Relative humidity (%).
    pub humidity: f64,
    /// Volumetric soil moisture (%).
    #[serde(rename = "soilMoisture")]
    pub soil_moisture: f64,
    /// Soil pH, if the probe reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
    /// Rainfall since the previous reading (mm).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rainfall: Option<f64>,
    /// N/P/K sub-record, if the probe reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub npk: Option<Npk>,
}

impl SensorValues {
    /// Serialize into the JSON-object payload that gets persisted and
    /// hashed.
    pub fn into_payload(self) -> Result<Value, EncodingError> {
        let value = serde_json::to_value(self)?;
        ensure_object(&value)?;
        Ok(value)
    }
}

/// Reject any payload that is not a JSON object.
///
/// Leaf hashing is defined over named fields; a bare scalar or array has
/// no field names to canonicalize.
pub fn ensure_object(payload: &Value) -> Result<(), EncodingError> {
    match payload {
        Value::Object(_) => Ok(()),
        Value::Null => Err(EncodingError::NotAnObject("null")),
        Value::Bool(_) => Err(EncodingError::NotAnObject("bool")),
        Value::Number(_) => Err(EncodingError::NotAnObject("number")),
        Value::String(_) => Err(EncodingError::NotAnObject("string")),
        Value::Array(_) => Err(EncodingError::NotAnObject("array")),
    }
}

/// A persisted sensor reading.
///
/// `sequence` is assigned by the store, monotonically increasing within a
/// batch, so readings recorded in the same second keep their insertion
/// order. The canonical reading order for root computation is
/// `(recorded_at, sequence)` ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Unique reading identifier.
    pub id: ReadingId,
    /// The batch this reading belongs to.
    pub batch_id: BatchId,
    /// When the reading was recorded (UTC).
    pub recorded_at: Timestamp,
    /// Store-assigned position within the batch.
    pub sequence: u64,
    /// The sensor fields. Always a JSON object.
    pub payload: Value,
}

impl Reading {
    /// Construct a reading, validating that the payload is a JSON object.
    pub fn new(
        id: ReadingId,
        batch_id: BatchId,
        recorded_at: Timestamp,
        sequence: u64,
        payload: Value,
    ) -> Result<Self, EncodingError> {
        ensure_object(&payload)?;
        Ok(Self {
            id,
            batch_id,
            recorded_at,
            sequence,
            payload,
        })
    }
}

/// Descriptive metadata for a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMetadata {
    /// The crop being harvested.
    pub crop: String,
    /// Where the harvest run takes place.
    pub location: String,
}

impl BatchMetadata {
    /// Metadata with both fields supplied.
    pub fn new(crop: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            crop: crop.into(),
            location: location.into(),
        }
    }
}

impl Default for BatchMetadata {
    fn default() -> Self {
        Self {
            crop: "Unknown Crop".to_string(),
            location: "Unknown Location".to_string(),
        }
    }
}
