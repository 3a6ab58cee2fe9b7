//! Blocking HTTP client for the Netatmo Energy and Weather APIs.
//!
//! - Blocking client using `ureq` (no async).
//! - Uses the models in `crate::models::netatmo`.
//! - Covers only the endpoints the neuron actions need.
//!
//! Authentication
//! - Performs one OAuth2 password grant when the client is built. The access token is reused for
//!   every call; the refresh token is kept but never exchanged.

use http::StatusCode;
use log::debug;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::Credentials;
use crate::models::netatmo::*;

const OAUTH_TOKEN_PATH: &str = "/oauth2/token";
const OAUTH_SCOPE: &str = "read_thermostat write_thermostat read_station";

const SET_THERM_MODE_PATH: &str = "/api/setthermmode";
const HOME_STATUS_PATH: &str = "/api/homestatus";
const HOMES_DATA_PATH: &str = "/api/homesdata";
const SET_ROOM_THERMPOINT_PATH: &str = "/api/setroomthermpoint";
const SWITCH_HOME_SCHEDULE_PATH: &str = "/api/switchhomeschedule";
const GET_STATIONS_DATA_PATH: &str = "/api/getstationsdata";

#[derive(Debug)]
pub enum NetatmoClientError {
    Transport(String),
    Http { status: u16, message: String },
    Json(serde_path_to_error::Error<serde_json::Error>),
    Auth(String),
}

impl core::fmt::Display for NetatmoClientError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NetatmoClientError::Transport(s) => write!(f, "transport error: {}", s),
            NetatmoClientError::Http { status, message } => write!(f, "http {}: {}", status, message),
            NetatmoClientError::Json(e) => write!(f, "json error at `{}`: {}", e.path(), e.inner()),
            NetatmoClientError::Auth(e) => write!(f, "auth error: {}", e),
        }
    }
}

impl std::error::Error for NetatmoClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetatmoClientError::Json(e) => Some(e.inner()),
            _ => None,
        }
    }
}

impl From<serde_path_to_error::Error<serde_json::Error>> for NetatmoClientError {
    fn from(value: serde_path_to_error::Error<serde_json::Error>) -> Self {
        NetatmoClientError::Json(value)
    }
}

// Status codes never arrive as `ureq::Error`: the agent is built with
// `http_status_as_error(false)` and `read_json` maps them to `Http`.
impl From<ureq::Error> for NetatmoClientError {
    fn from(value: ureq::Error) -> Self {
        NetatmoClientError::Transport(value.to_string())
    }
}

/// Body of a `setroomthermpoint` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomThermpoint {
    pub home_id: HomeId,
    pub room_id: RoomId,
    pub mode: SetpointMode,
    /// Integer °C; only sent with [`SetpointMode::Manual`].
    pub temp: Option<i64>,
}

/// The remote operations the action executors rely on.
pub trait NetatmoApi {
    /// Topology of the account's homes; narrowed to `home_id` when given.
    fn homes_data(&self, home_id: Option<&HomeId>) -> Result<HomesData, NetatmoClientError>;

    fn home_status(&self, home_id: &HomeId) -> Result<HomeStatus, NetatmoClientError>;

    fn set_therm_mode(&self, home_id: &HomeId, mode: ThermMode) -> Result<StatusResponse, NetatmoClientError>;

    fn set_room_thermpoint(&self, setpoint: &RoomThermpoint) -> Result<StatusResponse, NetatmoClientError>;

    fn switch_home_schedule(
        &self,
        home_id: &HomeId,
        schedule_id: &ScheduleId,
    ) -> Result<StatusResponse, NetatmoClientError>;

    fn stations_data(&self, device_id: Option<&DeviceId>) -> Result<StationsData, NetatmoClientError>;
}

struct Session {
    access_token: String,
    refresh_token: String,
    expires_in: Option<Duration>,
}

pub struct NetatmoClient {
    agent: ureq::Agent,
    base_url: String,
    session: Session,
}

impl NetatmoClient {
    /// Build an agent and exchange `credentials` for a bearer token.
    pub fn authenticate(base_url: &str, credentials: &Credentials) -> Result<Self, NetatmoClientError> {
        let config = ureq::Agent::config_builder().http_status_as_error(false).build();
        let agent = ureq::Agent::new_with_config(config);
        let base_url = base_url.trim_end_matches('/').to_string();

        let session = Self::oauth_password_grant(&agent, &base_url, credentials)?;
        debug!(
            "Obtained access token {} (refresh token {}, expires in {})",
            mask_token(&session.access_token),
            mask_token(&session.refresh_token),
            session
                .expires_in
                .map(|d| format!("{}s", d.as_secs()))
                .unwrap_or_else(|| "-".to_string())
        );

        Ok(NetatmoClient {
            agent,
            base_url,
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn oauth_password_grant(
        agent: &ureq::Agent,
        base_url: &str,
        credentials: &Credentials,
    ) -> Result<Session, NetatmoClientError> {
        debug!(
            "Requesting password grant for {} (client {})",
            credentials.username, credentials.client_id
        );
        let mut resp = agent
            .post(format!("{}{}", base_url, OAUTH_TOKEN_PATH))
            .header("Accept", "application/json")
            .send_form([
                ("grant_type", "password"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
                ("scope", OAUTH_SCOPE),
            ])?;
        let status = resp.status();
        let body = resp.body_mut().read_to_string()?;

        if !status.is_success() {
            let reason = match serde_json::from_str::<OAuthErrorResponse>(&body) {
                Ok(e) => match e.error_description {
                    Some(desc) => format!("{}: {}", e.error, desc),
                    None => e.error,
                },
                Err(_) => body,
            };
            return Err(NetatmoClientError::Auth(format!("http {}: {}", status.as_u16(), reason)));
        }

        let TokenResponse {
            access_token,
            refresh_token,
            expires_in,
        } = decode(&body)?;
        Ok(Session {
            access_token,
            refresh_token,
            expires_in: expires_in.map(Duration::from_secs),
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.session.access_token)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, NetatmoClientError> {
        let mut req = self
            .agent
            .get(self.url(path))
            .header("Accept", "application/json")
            .header("Authorization", self.bearer());
        for (k, v) in query {
            req = req.query(*k, *v);
        }
        debug!("GET {} {:?}", path, query);
        let resp = req.call()?;
        Self::read_json(resp)
    }

    fn post_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, NetatmoClientError> {
        let mut req = self
            .agent
            .post(self.url(path))
            .header("Accept", "application/json")
            .header("Authorization", self.bearer());
        for (k, v) in query {
            req = req.query(*k, *v);
        }
        debug!("POST {} {:?}", path, query);
        let resp = req.send_empty()?;
        Self::read_json(resp)
    }

    fn read_json<T: DeserializeOwned>(mut resp: http::Response<ureq::Body>) -> Result<T, NetatmoClientError> {
        let status = resp.status();
        let body = resp.body_mut().read_to_string()?;
        if status.is_success() {
            return decode(&body);
        }
        Err(http_error(status, body))
    }
}

impl NetatmoApi for NetatmoClient {
    fn homes_data(&self, home_id: Option<&HomeId>) -> Result<HomesData, NetatmoClientError> {
        let query = home_id.map(|h| vec![("home_id", h.0.as_str())]).unwrap_or_default();
        let resp: ApiResponse<HomesData> = self.get_json(HOMES_DATA_PATH, &query)?;
        Ok(resp.body)
    }

    fn home_status(&self, home_id: &HomeId) -> Result<HomeStatus, NetatmoClientError> {
        let resp: ApiResponse<HomeStatusBody> = self.get_json(HOME_STATUS_PATH, &[("home_id", home_id.0.as_str())])?;
        Ok(resp.body.home)
    }

    fn set_therm_mode(&self, home_id: &HomeId, mode: ThermMode) -> Result<StatusResponse, NetatmoClientError> {
        self.post_json(
            SET_THERM_MODE_PATH,
            &[("home_id", home_id.0.as_str()), ("mode", mode.as_str())],
        )
    }

    fn set_room_thermpoint(&self, setpoint: &RoomThermpoint) -> Result<StatusResponse, NetatmoClientError> {
        let temp = setpoint.temp.map(|t| t.to_string());
        let mut query = vec![
            ("home_id", setpoint.home_id.0.as_str()),
            ("room_id", setpoint.room_id.0.as_str()),
            ("mode", setpoint.mode.as_str()),
        ];
        if let Some(t) = temp.as_deref() {
            query.push(("temp", t));
        }
        self.post_json(SET_ROOM_THERMPOINT_PATH, &query)
    }

    fn switch_home_schedule(
        &self,
        home_id: &HomeId,
        schedule_id: &ScheduleId,
    ) -> Result<StatusResponse, NetatmoClientError> {
        self.post_json(
            SWITCH_HOME_SCHEDULE_PATH,
            &[("home_id", home_id.0.as_str()), ("schedule_id", schedule_id.0.as_str())],
        )
    }

    fn stations_data(&self, device_id: Option<&DeviceId>) -> Result<StationsData, NetatmoClientError> {
        let query = device_id.map(|d| vec![("device_id", d.0.as_str())]).unwrap_or_default();
        let resp: ApiResponse<StationsData> = self.get_json(GET_STATIONS_DATA_PATH, &query)?;
        Ok(resp.body)
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, NetatmoClientError> {
    let de = &mut serde_json::Deserializer::from_str(body);
    Ok(serde_path_to_error::deserialize(de)?)
}

fn http_error(status: StatusCode, body: String) -> NetatmoClientError {
    let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(e) => format!("{} (code {})", e.error.message, e.error.code),
        Err(_) if body.is_empty() => String::from("<no body>"),
        Err(_) => body,
    };
    NetatmoClientError::Http {
        status: status.as_u16(),
        message,
    }
}

/// Mask a token for logging, keeping only its edges.
fn mask_token(value: &str) -> String {
    let chars = value.chars().count();
    if chars <= 8 {
        "*".repeat(chars)
    } else {
        let head = value.chars().take(4).collect::<String>();
        let tail = value.chars().skip(chars - 4).collect::<String>();
        format!("{}...{}", head, tail)
    }
}
