//! Fitment records produced by the extractor

use serde::{Deserialize, Serialize};

/// A fitment attribute with independent front and rear values
///
/// For a non-staggered fitment both sides carry the same value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Staggered {
    pub front: Option<String>,
    pub rear: Option<String>,
}

impl Staggered {
    pub fn new(front: Option<String>, rear: Option<String>) -> Self {
        Self { front, rear }
    }

    /// Same value on both axles
    pub fn uniform(value: Option<String>) -> Self {
        Self {
            rear: value.clone(),
            front: value,
        }
    }

    pub fn is_staggered(&self) -> bool {
        self.front != self.rear
    }

    /// Applies `f` to both sides
    pub fn map(self, f: impl Fn(Option<String>) -> Option<String>) -> Self {
        Self {
            front: f(self.front),
            rear: f(self.rear),
        }
    }
}

/// One row of a trim's fitment table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FlatTireRow", into = "FlatTireRow")]
pub struct TireRow {
    pub original_equipment: bool,
    pub recommended_for_winter: bool,
    pub size: Staggered,
    pub rim: Staggered,
    pub offset: Staggered,
    pub backspacing: Staggered,
    pub tire_weight: Staggered,
    pub max_psi: Staggered,
}

/// Persisted shape of a [`TireRow`]: every staggered field as a `front_*`/`rear_*` pair
#[derive(Clone, Serialize, Deserialize)]
struct FlatTireRow {
    original_equipment: bool,
    recommended_for_winter: bool,
    front_size: Option<String>,
    rear_size: Option<String>,
    front_rim: Option<String>,
    rear_rim: Option<String>,
    front_offset: Option<String>,
    rear_offset: Option<String>,
    front_backspacing: Option<String>,
    rear_backspacing: Option<String>,
    front_tire_weight: Option<String>,
    rear_tire_weight: Option<String>,
    front_max_psi: Option<String>,
    rear_max_psi: Option<String>,
}

impl From<TireRow> for FlatTireRow {
    fn from(row: TireRow) -> Self {
        Self {
            original_equipment: row.original_equipment,
            recommended_for_winter: row.recommended_for_winter,
            front_size: row.size.front,
            rear_size: row.size.rear,
            front_rim: row.rim.front,
            rear_rim: row.rim.rear,
            front_offset: row.offset.front,
            rear_offset: row.offset.rear,
            front_backspacing: row.backspacing.front,
            rear_backspacing: row.backspacing.rear,
            front_tire_weight: row.tire_weight.front,
            rear_tire_weight: row.tire_weight.rear,
            front_max_psi: row.max_psi.front,
            rear_max_psi: row.max_psi.rear,
        }
    }
}

impl From<FlatTireRow> for TireRow {
    fn from(flat: FlatTireRow) -> Self {
        Self {
            original_equipment: flat.original_equipment,
            recommended_for_winter: flat.recommended_for_winter,
            size: Staggered::new(flat.front_size, flat.rear_size),
            rim: Staggered::new(flat.front_rim, flat.rear_rim),
            offset: Staggered::new(flat.front_offset, flat.rear_offset),
            backspacing: Staggered::new(flat.front_backspacing, flat.rear_backspacing),
            tire_weight: Staggered::new(flat.front_tire_weight, flat.rear_tire_weight),
            max_psi: Staggered::new(flat.front_max_psi, flat.rear_max_psi),
        }
    }
}

/// One vehicle trim's fitment data
///
/// Identity fields come from the page's own title element. A record with no
/// tire rows is still valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_output: Option<String>,

    pub make: String,
    pub model: String,
    pub year: u16,

    pub engine: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centerbore: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bolt_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wheel_fasteners: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wheel_tightening_torque: Option<String>,

    pub tires: Vec<TireRow>,
}
