//! Option record handed to the neuron, and its validation into an [`ActionRequest`].
//!
//! Every option maps to a `NETATMO_*` environment variable and a `--kebab-case` CLI flag.
//! Empty or whitespace-only values count as absent.

use crate::models::netatmo::{Action, Capability, DeviceId, HomeId, RoomId, ScheduleId, ThermMode};
use core::fmt;
use std::error::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.netatmo.com";

/// (CLI flag, environment variable) for each recognised option, in validation order.
pub const OPTIONS: [(&str, &str); 14] = [
    ("username", "NETATMO_USERNAME"),
    ("password", "NETATMO_PASSWORD"),
    ("client-id", "NETATMO_CLIENT_ID"),
    ("client-secret", "NETATMO_CLIENT_SECRET"),
    ("action", "NETATMO_ACTION"),
    ("home-id", "NETATMO_HOME_ID"),
    ("room-id", "NETATMO_ROOM_ID"),
    ("room-name", "NETATMO_ROOM_NAME"),
    ("thermo-mode", "NETATMO_THERMO_MODE"),
    ("temperature", "NETATMO_TEMPERATURE"),
    ("schedule-id", "NETATMO_SCHEDULE_ID"),
    ("schedule-name", "NETATMO_SCHEDULE_NAME"),
    ("device-id", "NETATMO_DEVICE_ID"),
    ("base-url", "NETATMO_BASE_URL"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    /// A required option is absent; carries the option name.
    Missing(&'static str),
    /// An option is present but unusable.
    Invalid(String),
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterError::Missing(field) => {
                let article = if field.starts_with(['a', 'e', 'i', 'o', 'u']) { "an" } else { "a" };
                write!(f, "Netatmo needs {} {}", article, field)
            }
            ParameterError::Invalid(reason) => write!(f, "{}", reason),
        }
    }
}

impl Error for ParameterError {}

#[derive(Clone, Default, PartialEq)]
pub struct Config {
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// One of the [`Action`] names, e.g. `GET_STATUS`.
    pub action: Option<String>,
    pub home_id: Option<String>,
    pub room_id: Option<String>,
    pub room_name: Option<String>,
    /// `schedule`, `away` or `hg`; only read by `CHANGE_MODE`.
    pub thermo_mode: Option<String>,
    /// Target temperature in °C; fractional values are truncated.
    pub temperature: Option<String>,
    pub schedule_id: Option<String>,
    pub schedule_name: Option<String>,
    pub device_id: Option<String>,
    /// API root; `None` means [`DEFAULT_BASE_URL`].
    pub base_url: Option<String>,
}

// Hand-written so secrets never reach the logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("action", &self.action)
            .field("home_id", &self.home_id)
            .field("room_id", &self.room_id)
            .field("room_name", &self.room_name)
            .field("thermo_mode", &self.thermo_mode)
            .field("temperature", &self.temperature)
            .field("schedule_id", &self.schedule_id)
            .field("schedule_name", &self.schedule_name)
            .field("device_id", &self.device_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut cfg = Config::default();
        for (flag, var) in OPTIONS {
            if let Ok(value) = std::env::var(var) {
                cfg.set(flag, value);
            }
        }
        cfg
    }

    /// Set an option by its CLI flag name. Returns `false` for unknown names.
    pub fn set(&mut self, flag: &str, value: impl Into<String>) -> bool {
        let slot = match flag {
            "username" => &mut self.username,
            "password" => &mut self.password,
            "client-id" => &mut self.client_id,
            "client-secret" => &mut self.client_secret,
            "action" => &mut self.action,
            "home-id" => &mut self.home_id,
            "room-id" => &mut self.room_id,
            "room-name" => &mut self.room_name,
            "thermo-mode" => &mut self.thermo_mode,
            "temperature" => &mut self.temperature,
            "schedule-id" => &mut self.schedule_id,
            "schedule-name" => &mut self.schedule_name,
            "device-id" => &mut self.device_id,
            "base-url" => &mut self.base_url,
            _ => return false,
        };
        *slot = Some(value.into());
        true
    }

    pub fn base_url(&self) -> &str {
        present(&self.base_url).unwrap_or(DEFAULT_BASE_URL)
    }

    /// Check the option record and build the typed request.
    ///
    /// Credentials and the action are checked first, in that order, then the
    /// home id for energy actions, then the action-specific options.
    pub fn validate(&self) -> Result<ActionRequest, ParameterError> {
        let username = required(&self.username, "username")?;
        let password = required(&self.password, "password")?;
        let client_id = required(&self.client_id, "clientId")?;
        let client_secret = required(&self.client_secret, "clientSecret")?;
        let action_name = required(&self.action, "action")?;
        let action =
            Action::from_name(action_name).ok_or_else(|| ParameterError::Invalid(format!("Invalid action {}", action_name)))?;

        let home_id = match action.capability() {
            Capability::Energy => Some(HomeId(required(&self.home_id, "homeId")?.to_string())),
            Capability::Weather => None,
        };

        let params = match (action, home_id) {
            (Action::GetStatus, Some(home_id)) => ActionParams::GetStatus { home_id },
            (Action::SetTemp, Some(home_id)) => ActionParams::SetTemp {
                home_id,
                room: self.room_ref()?,
                temperature: parse_temperature(required(&self.temperature, "temperature")?)?,
            },
            (Action::CancelSetTemp, Some(home_id)) => ActionParams::CancelSetTemp {
                home_id,
                room: self.room_ref()?,
            },
            (Action::ChangeMode, Some(home_id)) => {
                let raw = required(&self.thermo_mode, "thermoMode")?;
                let mode = ThermMode::from_name(raw)
                    .ok_or_else(|| ParameterError::Invalid(format!("Invalid Therm mode {}", raw)))?;
                ActionParams::ChangeMode { home_id, mode }
            }
            (Action::SwitchSchedule, Some(home_id)) => ActionParams::SwitchSchedule {
                home_id,
                schedule: self.schedule_ref()?,
            },
            (Action::WeatherData, _) => ActionParams::WeatherData {
                device_id: present(&self.device_id).map(|d| DeviceId(d.to_string())),
            },
            (_, None) => return Err(ParameterError::Missing("homeId")),
        };

        Ok(ActionRequest {
            credentials: Credentials {
                username: username.to_string(),
                password: password.to_string(),
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
            },
            params,
        })
    }

    fn room_ref(&self) -> Result<RoomRef, ParameterError> {
        match (present(&self.room_id), present(&self.room_name)) {
            (Some(id), _) => Ok(RoomRef::Id(RoomId(id.to_string()))),
            (None, Some(name)) => Ok(RoomRef::Name(name.to_string())),
            (None, None) => Err(ParameterError::Missing("roomId or roomName")),
        }
    }

    fn schedule_ref(&self) -> Result<ScheduleRef, ParameterError> {
        match (present(&self.schedule_id), present(&self.schedule_name)) {
            (Some(id), _) => Ok(ScheduleRef::Id(ScheduleId(id.to_string()))),
            (None, Some(name)) => Ok(ScheduleRef::Name(name.to_string())),
            (None, None) => Err(ParameterError::Missing("scheduleId or scheduleName")),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, ParameterError> {
    present(value).ok_or(ParameterError::Missing(field))
}

/// Setpoints outside this range (°C) are rejected before reaching the API.
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = -50.0..=50.0;

/// Parse a spoken/configured temperature and truncate it toward zero.
pub fn parse_temperature(raw: &str) -> Result<i64, ParameterError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParameterError::Invalid(format!("Invalid temperature {}", raw)))?
        .trunc();
    if !TEMPERATURE_RANGE.contains(&value) {
        return Err(ParameterError::Invalid(format!(
            "temperature {} outside {}..={}",
            raw.trim(),
            TEMPERATURE_RANGE.start(),
            TEMPERATURE_RANGE.end()
        )));
    }
    Ok(value as i64)
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomRef {
    Id(RoomId),
    /// Resolved against home data, case-insensitively.
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleRef {
    Id(ScheduleId),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionParams {
    GetStatus { home_id: HomeId },
    SetTemp { home_id: HomeId, room: RoomRef, temperature: i64 },
    CancelSetTemp { home_id: HomeId, room: RoomRef },
    ChangeMode { home_id: HomeId, mode: ThermMode },
    SwitchSchedule { home_id: HomeId, schedule: ScheduleRef },
    /// Without a device id the account's first station is used.
    WeatherData { device_id: Option<DeviceId> },
}

impl ActionParams {
    pub fn action(&self) -> Action {
        match self {
            ActionParams::GetStatus { .. } => Action::GetStatus,
            ActionParams::SetTemp { .. } => Action::SetTemp,
            ActionParams::CancelSetTemp { .. } => Action::CancelSetTemp,
            ActionParams::ChangeMode { .. } => Action::ChangeMode,
            ActionParams::SwitchSchedule { .. } => Action::SwitchSchedule,
            ActionParams::WeatherData { .. } => Action::WeatherData,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub credentials: Credentials,
    pub params: ActionParams,
}
