//! In-memory [`NetatmoApi`] used by the service tests. Records every call it receives.

use crate::client::{NetatmoApi, NetatmoClientError, RoomThermpoint};
use crate::models::netatmo::*;
use std::cell::RefCell;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    HomesData(Option<HomeId>),
    HomeStatus(HomeId),
    SetThermMode(HomeId, ThermMode),
    SetRoomThermpoint(RoomThermpoint),
    SwitchHomeSchedule(HomeId, ScheduleId),
    StationsData(Option<DeviceId>),
}

pub struct FakeApi {
    pub homes: HomesData,
    pub status: HomeStatus,
    pub stations: StationsData,
    pub calls: RefCell<Vec<Call>>,
}

fn load_fixture<T: serde::de::DeserializeOwned>(name: &str) -> ApiResponse<T> {
    let json = std::fs::read_to_string(format!("tests/data/{name}")).expect("fixture present");
    serde_json::from_str(&json).expect("parse fixture")
}

impl FakeApi {
    pub fn from_fixtures() -> Self {
        FakeApi {
            homes: load_fixture::<HomesData>("homesdata.json").body,
            status: load_fixture::<HomeStatusBody>("homestatus.json").body.home,
            stations: load_fixture::<StationsData>("stationsdata.json").body,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn ok(&self, call: Call) -> Result<StatusResponse, NetatmoClientError> {
        self.calls.borrow_mut().push(call);
        Ok(StatusResponse {
            status: "ok".into(),
            time_server: None,
        })
    }
}

impl NetatmoApi for FakeApi {
    fn homes_data(&self, home_id: Option<&HomeId>) -> Result<HomesData, NetatmoClientError> {
        self.calls.borrow_mut().push(Call::HomesData(home_id.cloned()));
        Ok(self.homes.clone())
    }

    fn home_status(&self, home_id: &HomeId) -> Result<HomeStatus, NetatmoClientError> {
        self.calls.borrow_mut().push(Call::HomeStatus(home_id.clone()));
        Ok(self.status.clone())
    }

    fn set_therm_mode(&self, home_id: &HomeId, mode: ThermMode) -> Result<StatusResponse, NetatmoClientError> {
        self.ok(Call::SetThermMode(home_id.clone(), mode))
    }

    fn set_room_thermpoint(&self, setpoint: &RoomThermpoint) -> Result<StatusResponse, NetatmoClientError> {
        self.ok(Call::SetRoomThermpoint(setpoint.clone()))
    }

    fn switch_home_schedule(
        &self,
        home_id: &HomeId,
        schedule_id: &ScheduleId,
    ) -> Result<StatusResponse, NetatmoClientError> {
        self.ok(Call::SwitchHomeSchedule(home_id.clone(), schedule_id.clone()))
    }

    fn stations_data(&self, device_id: Option<&DeviceId>) -> Result<StationsData, NetatmoClientError> {
        self.calls.borrow_mut().push(Call::StationsData(device_id.cloned()));
        Ok(self.stations.clone())
    }
}
