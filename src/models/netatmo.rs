//! Models for the subset of the Netatmo Energy and Weather APIs used by the neuron.
//!
//! Notes
//! - Every endpoint wraps its payload in the same envelope (`body`, `status`, `time_server`).
//! - Fields the neuron does not read are left out; unknown fields are ignored by serde.
//! - Dashboard measurements stay as raw JSON values so new sensor kinds pass through untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

// =====================
// Scalar ID newtype wrappers
// =====================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HomeId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

// =====================
// Neuron enums
// =====================

/// API family an action needs. Energy actions all operate on a home.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    Energy,
    Weather,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    GetStatus,
    SetTemp,
    CancelSetTemp,
    ChangeMode,
    SwitchSchedule,
    WeatherData,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::GetStatus,
        Action::SetTemp,
        Action::CancelSetTemp,
        Action::ChangeMode,
        Action::SwitchSchedule,
        Action::WeatherData,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::GetStatus => "GET_STATUS",
            Action::SetTemp => "SET_TEMP",
            Action::CancelSetTemp => "CANCEL_SET_TEMP",
            Action::ChangeMode => "CHANGE_MODE",
            Action::SwitchSchedule => "SWITCH_SCHEDULE",
            Action::WeatherData => "WEATHER_DATA",
        }
    }

    /// Exact, case-sensitive lookup of an action name.
    pub fn from_name(name: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.as_str() == name)
    }

    pub fn capability(self) -> Capability {
        match self {
            Action::WeatherData => Capability::Weather,
            _ => Capability::Energy,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Home-wide heating mode accepted by `setthermmode`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThermMode {
    Schedule,
    Away,
    /// Frost guard.
    Hg,
}

impl ThermMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThermMode::Schedule => "schedule",
            ThermMode::Away => "away",
            ThermMode::Hg => "hg",
        }
    }

    pub fn from_name(name: &str) -> Option<ThermMode> {
        match name {
            "schedule" => Some(ThermMode::Schedule),
            "away" => Some(ThermMode::Away),
            "hg" => Some(ThermMode::Hg),
            _ => None,
        }
    }
}

/// Room setpoint mode accepted by `setroomthermpoint`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetpointMode {
    Manual,
    /// Return the room to the home's schedule.
    Home,
}

impl SetpointMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SetpointMode::Manual => "manual",
            SetpointMode::Home => "home",
        }
    }
}

// =====================
// Response envelopes
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub body: T,
    pub status: Option<String>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub time_server: Option<DateTime<Utc>>,
}

/// Response of the write endpoints, which carry no body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub time_server: Option<DateTime<Utc>>,
}

/// Error payload of the `/api/*` endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiErrorDetail {
    pub code: i64,
    pub message: String,
}

/// Error payload of the OAuth endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Option<u64>,
}

// =====================
// Energy: homesdata
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HomesData {
    #[serde(default)]
    pub homes: Vec<Home>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Home {
    pub id: HomeId,
    pub name: Option<String>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
    pub therm_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub r#type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub name: String,
    #[serde(default)]
    pub selected: bool,
}

// =====================
// Energy: homestatus
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeStatusBody {
    pub home: HomeStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeStatus {
    pub id: HomeId,
    #[serde(default)]
    pub rooms: Vec<RoomStatus>,
}

/// Live state of one room. Rooms without a thermostat omit the `therm_*` fields.
///
/// Temperatures keep the provider's number as sent, so `21` stays an integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomStatus {
    pub id: RoomId,
    pub reachable: Option<bool>,
    pub therm_measured_temperature: Option<Number>,
    pub therm_setpoint_mode: Option<String>,
    pub therm_setpoint_temperature: Option<Number>,
}

// =====================
// Weather: getstationsdata
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StationsData {
    #[serde(default)]
    pub devices: Vec<Station>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    #[serde(rename = "_id")]
    pub id: DeviceId,
    pub station_name: Option<String>,
    pub module_name: Option<String>,
    /// Absent while the station is offline.
    pub dashboard_data: Option<Map<String, Value>>,
    pub battery_percent: Option<Value>,
    #[serde(default)]
    pub modules: Vec<StationModule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationModule {
    #[serde(rename = "_id")]
    pub id: DeviceId,
    pub module_name: String,
    pub r#type: Option<String>,
    pub dashboard_data: Option<Map<String, Value>>,
    pub battery_percent: Option<Value>,
}
