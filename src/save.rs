//! Save-Game Serialization — key-value persistence for activation fields
//!
//! A generic string-keyed value store written out as JSON. The activation
//! field persists exactly two floats (thickness, delay) and only while it is
//! enabled at save time; on load, the presence of both keys re-enables the
//! field with clamped values, and their absence means "stay disabled".
//! Restoring always clears `enable_on_start` so the saved decision is not
//! overwritten by the spawn-time default.

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::activator::CharacterActivator;

pub const THICKNESS_KEY: &str = "activator.thickness";
pub const DELAY_KEY: &str = "activator.delay";

/// Errors at the save file boundary. Gameplay-side save/restore itself never
/// fails — missing keys are a legitimate "stay disabled" outcome.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Writer / Reader
// ============================================================================

/// Collects key-value pairs for one save snapshot. BTreeMap keeps the
/// emitted JSON stable across runs.
#[derive(Debug, Default, Clone)]
pub struct SaveWriter {
    values: BTreeMap<String, Value>,
}

impl SaveWriter {
    pub fn write_f32(&mut self, key: &str, value: f32) {
        self.values.insert(key.to_owned(), Value::from(value));
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string(&self.values)?)
    }
}

/// Read-side view of one save snapshot.
#[derive(Debug, Default, Clone)]
pub struct SaveReader {
    values: BTreeMap<String, Value>,
}

impl SaveReader {
    pub fn from_json(data: &str) -> Result<Self, SaveError> {
        Ok(Self { values: serde_json::from_str(data)? })
    }

    pub fn read_f32(&self, key: &str) -> Option<f32> {
        self.values.get(key).and_then(Value::as_f64).map(|v| v as f32)
    }
}

// ============================================================================
// Activator persistence
// ============================================================================

/// Persist an activation field. Disabled fields write nothing.
pub fn write_activator(activator: &CharacterActivator, writer: &mut SaveWriter) {
    if activator.enabled {
        writer.write_f32(THICKNESS_KEY, activator.thickness);
        writer.write_f32(DELAY_KEY, activator.delay);
    }
}

/// Restore an activation field. Returns whether the field ended up enabled.
pub fn read_activator(activator: &mut CharacterActivator, reader: &SaveReader) -> bool {
    match (reader.read_f32(THICKNESS_KEY), reader.read_f32(DELAY_KEY)) {
        (Some(thickness), Some(delay)) => {
            activator.enable_field(thickness, delay);
        }
        _ => {
            activator.disable_field();
        }
    }
    // The saved decision wins over the spawn-time default
    activator.enable_on_start = false;
    activator.enabled
}

// ============================================================================
// Tests
// ============================================================================
