//! Flight - insured flights and their oracle-reported status

use crate::error::OracleError;
use crate::types::account_id::AccountId;
use serde::{Deserialize, Serialize};

/// Flight status as reported by oracles
///
/// Discriminants are the wire codes oracle processes report.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FlightStatus {
    #[default]
    Unknown = 0,
    OnTime = 10,
    LateAirline = 20,
    LateWeather = 30,
    LateTechnical = 40,
    LateOther = 50,
}

impl FlightStatus {
    /// Every status, in code order
    pub const ALL: [FlightStatus; 6] = [
        FlightStatus::Unknown,
        FlightStatus::OnTime,
        FlightStatus::LateAirline,
        FlightStatus::LateWeather,
        FlightStatus::LateTechnical,
        FlightStatus::LateOther,
    ];

    /// Wire code
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Delay attributable to the airline, the only insured outcome
    #[inline]
    pub fn is_airline_fault(self) -> bool {
        self == FlightStatus::LateAirline
    }

    /// Anything but Unknown
    #[inline]
    pub fn is_settled(self) -> bool {
        self != FlightStatus::Unknown
    }
}

impl TryFrom<u8> for FlightStatus {
    type Error = OracleError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        FlightStatus::ALL
            .into_iter()
            .find(|s| s.code() == code)
            .ok_or(OracleError::InvalidStatusCode(code))
    }
}

impl std::fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FlightStatus::Unknown => "unknown",
            FlightStatus::OnTime => "on_time",
            FlightStatus::LateAirline => "late_airline",
            FlightStatus::LateWeather => "late_weather",
            FlightStatus::LateTechnical => "late_technical",
            FlightStatus::LateOther => "late_other",
        };
        write!(f, "{}", label)
    }
}

/// Unique flight key: (airline, flight code, scheduled timestamp)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlightKey {
    /// Operating airline
    pub airline: AccountId,
    /// Flight code, e.g. `ABC-DEF-GHI`
    pub code: String,
    /// Scheduled departure (Unix seconds)
    pub timestamp: i64,
}

impl FlightKey {
    pub fn new(airline: AccountId, code: impl Into<String>, timestamp: i64) -> Self {
        Self {
            airline,
            code: code.into(),
            timestamp,
        }
    }

    /// Stable digest of the key, used to seed request indexes
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.airline.as_bytes());
        hasher.update(self.code.as_bytes());
        hasher.update(&self.timestamp.to_le_bytes());
        *hasher.finalize().as_bytes()
    }
}

impl std::fmt::Display for FlightKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}/{}", self.code, self.timestamp, self.airline.short())
    }
}

/// Registered flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub key: FlightKey,
    /// Written only by oracle consensus
    pub status: FlightStatus,
}

impl Flight {
    pub fn new(key: FlightKey) -> Self {
        Self {
            key,
            status: FlightStatus::Unknown,
        }
    }

    /// Scheduled departure as a UTC datetime
    pub fn scheduled_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.key.timestamp, 0)
    }
}
