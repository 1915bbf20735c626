//! Edge attributes and sentinels.

use serde::{Deserialize, Serialize};

/// Weight given to edges added without an explicit weight.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Type tag given to edges added without an explicit type.
pub const DEFAULT_TYPE: i32 = 0;

/// Weight returned when the queried edge does not exist.
pub const ERROR_WEIGHT: f64 = f64::NAN;

/// Type returned when the queried edge does not exist.
pub const ERROR_TYPE: i32 = -1;

/// Weight and type of a single edge between an ordered pair of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeInfo {
    pub weight: f64,
    pub kind: i32,
}

impl EdgeInfo {
    pub fn new(weight: f64, kind: i32) -> Self {
        Self { weight, kind }
    }
}

impl Default for EdgeInfo {
    fn default() -> Self {
        Self {
            weight: DEFAULT_WEIGHT,
            kind: DEFAULT_TYPE,
        }
    }
}
