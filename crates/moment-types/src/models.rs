use serde::{Deserialize, Serialize};

/// A persisted moment, as echoed back by the create handler.
///
/// `id` is milliseconds since epoch at creation time and doubles as the
/// creation-order marker. `timestamp` comes from a separate clock read, so
/// the two are not guaranteed to agree to the microsecond.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Moment {
    pub id: i64,
    pub name: String,
    pub message: String,
    pub image: String,
    pub rotation: f64,
    pub timestamp: String,
}

/// The projection returned by the list handler. Timestamps are not
/// projected; clients take ordering from position in the returned sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentSummary {
    pub id: i64,
    pub name: String,
    pub message: String,
    pub image: String,
    pub rotation: f64,
}
