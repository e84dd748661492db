/// Vehicle identifiers are opaque, caller-assigned strings.
pub type VehicleId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
