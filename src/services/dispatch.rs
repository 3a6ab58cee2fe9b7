//! Single-pass action execution: validate, authenticate, run one action, hand the result to a sink.

use crate::client::{NetatmoApi, NetatmoClient, NetatmoClientError};
use crate::config::{ActionParams, Config, ParameterError};
use crate::services::energy::{self, AckRecord, HomeStatusRecord};
use crate::services::weather::{self, WeatherRecord};
use core::fmt;
use log::info;
use serde::Serialize;
use std::error::Error;

#[derive(Debug)]
pub enum NeuronError {
    /// Missing or unusable option; raised before or instead of the remote write.
    Parameter(ParameterError),
    /// Transport, HTTP or response-shape failure from the Netatmo API.
    Client(NetatmoClientError),
}

impl fmt::Display for NeuronError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeuronError::Parameter(e) => write!(f, "{}", e),
            NeuronError::Client(e) => write!(f, "netatmo api: {}", e),
        }
    }
}

impl Error for NeuronError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NeuronError::Parameter(e) => Some(e),
            NeuronError::Client(e) => Some(e),
        }
    }
}

impl From<ParameterError> for NeuronError {
    fn from(value: ParameterError) -> Self {
        NeuronError::Parameter(value)
    }
}

impl From<NetatmoClientError> for NeuronError {
    fn from(value: NetatmoClientError) -> Self {
        NeuronError::Client(value)
    }
}

/// What the neuron says back. The shape depends on the action that ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultRecord {
    HomeStatus(HomeStatusRecord),
    Ack(AckRecord),
    Weather(WeatherRecord),
}

/// Receiver of the result record, called at most once per invocation.
pub trait ResultSink {
    fn say(&mut self, record: ResultRecord);
}

impl<F: FnMut(ResultRecord)> ResultSink for F {
    fn say(&mut self, record: ResultRecord) {
        self(record)
    }
}

pub struct ActionDispatcher<'a, A: NetatmoApi> {
    api: &'a A,
}

impl<'a, A: NetatmoApi> ActionDispatcher<'a, A> {
    pub fn new(api: &'a A) -> Self {
        ActionDispatcher { api }
    }

    /// Run exactly one action. Actions without a spoken result return `None`.
    pub fn execute(&self, params: &ActionParams) -> Result<Option<ResultRecord>, NeuronError> {
        let api = self.api;
        let record = match params {
            ActionParams::GetStatus { home_id } => Some(ResultRecord::HomeStatus(energy::get_status(api, home_id)?)),
            ActionParams::SetTemp {
                home_id,
                room,
                temperature,
            } => {
                energy::set_temp(api, home_id, room, *temperature)?;
                None
            }
            ActionParams::CancelSetTemp { home_id, room } => {
                Some(ResultRecord::Ack(energy::cancel_set_temp(api, home_id, room)?))
            }
            ActionParams::ChangeMode { home_id, mode } => {
                energy::change_mode(api, home_id, *mode)?;
                None
            }
            ActionParams::SwitchSchedule { home_id, schedule } => {
                energy::switch_schedule(api, home_id, schedule)?;
                None
            }
            ActionParams::WeatherData { device_id } => {
                Some(ResultRecord::Weather(weather::weather_data(api, device_id.as_ref())?))
            }
        };
        Ok(record)
    }

    /// Run the action and pass its record, if any, to `sink`.
    pub fn dispatch(&self, params: &ActionParams, sink: &mut impl ResultSink) -> Result<(), NeuronError> {
        if let Some(record) = self.execute(params)? {
            sink.say(record);
        }
        Ok(())
    }
}

/// Full invocation: validate `config`, log in, run the action, say the result.
pub fn run(config: &Config, sink: &mut impl ResultSink) -> Result<(), NeuronError> {
    let request = config.validate()?;
    let action = request.params.action();
    info!("Netatmo launch {} for {}", action, request.credentials.username);

    let client = NetatmoClient::authenticate(config.base_url(), &request.credentials)?;
    info!("Authenticated to Netatmo API");

    ActionDispatcher::new(&client).dispatch(&request.params, sink)?;
    info!("{} complete", action);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RoomRef, ScheduleRef};
    use crate::models::netatmo::{HomeId, RoomId, ScheduleId, ThermMode};
    use crate::services::fake::{Call, FakeApi};
    use serde_json::json;

    const HOME: &str = "5c8a2f9b0000000000000001";

    fn collect(api: &FakeApi, params: ActionParams) -> Result<Vec<ResultRecord>, NeuronError> {
        let mut said = Vec::new();
        ActionDispatcher::new(api).dispatch(&params, &mut |r: ResultRecord| said.push(r))?;
        Ok(said)
    }

    #[test]
    fn silent_actions_say_nothing() {
        let home_id = HomeId(HOME.into());
        let silent = [
            ActionParams::SetTemp {
                home_id: home_id.clone(),
                room: RoomRef::Id(RoomId("R1".into())),
                temperature: 20,
            },
            ActionParams::ChangeMode {
                home_id: home_id.clone(),
                mode: ThermMode::Away,
            },
            ActionParams::SwitchSchedule {
                home_id: home_id.clone(),
                schedule: ScheduleRef::Id(ScheduleId("S1".into())),
            },
        ];
        for params in silent {
            let api = FakeApi::from_fixtures();
            assert!(collect(&api, params.clone()).expect("dispatch").is_empty(), "{params:?}");
            assert_eq!(api.calls().len(), 1);
        }
    }

    #[test]
    fn status_and_ack_records_are_said_once() {
        let home_id = HomeId(HOME.into());
        let api = FakeApi::from_fixtures();
        let said = collect(&api, ActionParams::GetStatus { home_id: home_id.clone() }).expect("dispatch");
        assert_eq!(said.len(), 1);
        assert!(matches!(&said[0], ResultRecord::HomeStatus(r) if r.rooms.len() == 2));

        let api = FakeApi::from_fixtures();
        let said = collect(
            &api,
            ActionParams::CancelSetTemp {
                home_id,
                room: RoomRef::Name("Bedroom".into()),
            },
        )
        .expect("dispatch");
        assert_eq!(serde_json::to_value(&said).unwrap(), json!([{"ok": "ok"}]));
        assert_eq!(
            api.calls().first(),
            Some(&Call::HomesData(Some(HomeId(HOME.into()))))
        );
    }

    #[test]
    fn weather_record_serializes_flat() {
        let api = FakeApi::from_fixtures();
        let said = collect(&api, ActionParams::WeatherData { device_id: None }).expect("dispatch");
        let value = serde_json::to_value(&said[0]).unwrap();
        assert_eq!(value["Temperature"], json!(21.4));
        assert_eq!(value["Rain Gauge"]["battery_percent"], json!(80));
    }

    #[test]
    fn failures_say_nothing() {
        let api = FakeApi::from_fixtures();
        let err = collect(
            &api,
            ActionParams::SetTemp {
                home_id: HomeId(HOME.into()),
                room: RoomRef::Name("Attic".into()),
                temperature: 20,
            },
        )
        .unwrap_err();
        assert!(matches!(err, NeuronError::Parameter(ParameterError::Invalid(_))));
    }

    #[test]
    fn run_rejects_bad_config_before_network() {
        let cfg = Config {
            username: Some("someone@example.com".into()),
            password: Some("hunter2".into()),
            client_id: Some("client".into()),
            client_secret: Some("secret".into()),
            action: Some("OPEN_WINDOWS".into()),
            // unroutable, so a network attempt would fail with a client error instead
            base_url: Some("http://127.0.0.1:9".into()),
            ..Config::default()
        };
        let mut said = Vec::new();
        let err = run(&cfg, &mut |r: ResultRecord| said.push(r)).unwrap_err();
        assert!(matches!(err, NeuronError::Parameter(ParameterError::Invalid(_))));
        assert!(said.is_empty());
    }
}
