use crate::client::{NetatmoApi, RoomThermpoint};
use crate::config::{ParameterError, RoomRef, ScheduleRef};
use crate::models::netatmo::{Home, HomeId, HomeStatus, RoomId, ScheduleId, SetpointMode, ThermMode};
use crate::services::dispatch::NeuronError;
use crate::utils::{find_room_id_by_name, find_room_name_by_id, find_schedule_id_by_name, select_home};
use log::{debug, info};
use serde::Serialize;
use serde_json::Number;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeStatusRecord {
    pub rooms: Vec<RoomRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub id: String,
    /// `None` when home data does not know the room.
    pub name: Option<String>,
    pub reachable: Option<bool>,
    pub current_temp: Option<Number>,
    pub mode: Option<String>,
    pub wanted_temp: Option<Number>,
}

/// Acknowledgement carrying the provider's status string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AckRecord {
    pub ok: String,
}

fn load_home(api: &impl NetatmoApi, home_id: &HomeId) -> Result<Home, NeuronError> {
    let data = api.homes_data(Some(home_id))?;
    let home = select_home(&data, home_id)
        .ok_or_else(|| ParameterError::Invalid(format!("home {} not found", home_id.0)))?;
    if home.id != *home_id {
        debug!("home {} not returned by homesdata, using {}", home_id.0, home.id.0);
    }
    Ok(home.clone())
}

fn resolve_room(api: &impl NetatmoApi, home_id: &HomeId, room: &RoomRef) -> Result<RoomId, NeuronError> {
    match room {
        RoomRef::Id(id) => Ok(id.clone()),
        RoomRef::Name(name) => {
            let home = load_home(api, home_id)?;
            let id = find_room_id_by_name(&home, name)
                .cloned()
                .ok_or_else(|| ParameterError::Invalid(format!("room {} not found", name)))?;
            debug!("id of the room {} is {}", name, id.0);
            Ok(id)
        }
    }
}

fn resolve_schedule(
    api: &impl NetatmoApi,
    home_id: &HomeId,
    schedule: &ScheduleRef,
) -> Result<ScheduleId, NeuronError> {
    match schedule {
        ScheduleRef::Id(id) => Ok(id.clone()),
        ScheduleRef::Name(name) => {
            let home = load_home(api, home_id)?;
            let id = find_schedule_id_by_name(&home, name)
                .cloned()
                .ok_or_else(|| ParameterError::Invalid(format!("schedule {} not found", name)))?;
            debug!("id of the schedule {} is {}", name, id.0);
            Ok(id)
        }
    }
}

/// Join live room state with the room names from home data.
pub fn build_home_status_record(home: &Home, status: &HomeStatus) -> HomeStatusRecord {
    let rooms = status
        .rooms
        .iter()
        .map(|room| RoomRecord {
            id: room.id.0.clone(),
            name: find_room_name_by_id(home, &room.id).map(str::to_string),
            reachable: room.reachable,
            current_temp: room.therm_measured_temperature.clone(),
            mode: room.therm_setpoint_mode.clone(),
            wanted_temp: room.therm_setpoint_temperature.clone(),
        })
        .collect();
    HomeStatusRecord { rooms }
}

pub fn get_status(api: &impl NetatmoApi, home_id: &HomeId) -> Result<HomeStatusRecord, NeuronError> {
    let home = load_home(api, home_id)?;
    let status = api.home_status(home_id)?;
    let record = build_home_status_record(&home, &status);
    info!(
        "home {} ({}): {} room(s) reported, therm mode {}",
        home_id.0,
        home.name.as_deref().unwrap_or("-"),
        record.rooms.len(),
        home.therm_mode.as_deref().unwrap_or("-")
    );
    Ok(record)
}

pub fn set_temp(api: &impl NetatmoApi, home_id: &HomeId, room: &RoomRef, temperature: i64) -> Result<(), NeuronError> {
    debug!("changeRoomTemp to temp {}", temperature);
    let room_id = resolve_room(api, home_id, room)?;
    let resp = api.set_room_thermpoint(&RoomThermpoint {
        home_id: home_id.clone(),
        room_id: room_id.clone(),
        mode: SetpointMode::Manual,
        temp: Some(temperature),
    })?;
    info!("room {} set to {}°C: {}", room_id.0, temperature, resp.status);
    Ok(())
}

pub fn cancel_set_temp(api: &impl NetatmoApi, home_id: &HomeId, room: &RoomRef) -> Result<AckRecord, NeuronError> {
    let room_id = resolve_room(api, home_id, room)?;
    let resp = api.set_room_thermpoint(&RoomThermpoint {
        home_id: home_id.clone(),
        room_id: room_id.clone(),
        mode: SetpointMode::Home,
        temp: None,
    })?;
    info!("room {} back to schedule: {}", room_id.0, resp.status);
    Ok(AckRecord { ok: resp.status })
}

pub fn change_mode(api: &impl NetatmoApi, home_id: &HomeId, mode: ThermMode) -> Result<(), NeuronError> {
    let resp = api.set_therm_mode(home_id, mode)?;
    info!("home {} mode set to {}: {}", home_id.0, mode.as_str(), resp.status);
    Ok(())
}

pub fn switch_schedule(api: &impl NetatmoApi, home_id: &HomeId, schedule: &ScheduleRef) -> Result<(), NeuronError> {
    let schedule_id = resolve_schedule(api, home_id, schedule)?;
    let resp = api.switch_home_schedule(home_id, &schedule_id)?;
    info!("home {} switched to schedule {}: {}", home_id.0, schedule_id.0, resp.status);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::netatmo::Room;
    use crate::services::fake::{Call, FakeApi};
    use serde_json::json;

    const HOME: &str = "5c8a2f9b0000000000000001";

    fn home_id() -> HomeId {
        HomeId(HOME.into())
    }

    #[test]
    fn status_record_joins_names() {
        let home = Home {
            id: HomeId("H1".into()),
            name: None,
            rooms: vec![Room {
                id: RoomId("R1".into()),
                name: "Kitchen".into(),
                r#type: None,
            }],
            schedules: vec![],
            therm_mode: None,
        };
        let status: HomeStatus = serde_json::from_value(json!({
            "id": "H1",
            "rooms": [{
                "id": "R1",
                "reachable": true,
                "therm_measured_temperature": 19.5,
                "therm_setpoint_mode": "manual",
                "therm_setpoint_temperature": 21
            }]
        }))
        .expect("home status");

        let record = build_home_status_record(&home, &status);
        assert_eq!(record.rooms[0].wanted_temp, Some(Number::from(21)));
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"rooms": [{
                "id": "R1",
                "name": "Kitchen",
                "reachable": true,
                "currentTemp": 19.5,
                "mode": "manual",
                "wantedTemp": 21
            }]})
        );
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"rooms":[{"id":"R1","name":"Kitchen","reachable":true,"currentTemp":19.5,"mode":"manual","wantedTemp":21}]}"#
        );
    }

    #[test]
    fn get_status_reads_data_then_status() {
        let api = FakeApi::from_fixtures();
        let record = get_status(&api, &home_id()).expect("status");
        assert_eq!(
            api.calls(),
            vec![Call::HomesData(Some(home_id())), Call::HomeStatus(home_id())]
        );
        assert_eq!(record.rooms.len(), 2);
        assert_eq!(record.rooms[0].name.as_deref(), Some("Kitchen"));
        assert_eq!(record.rooms[0].wanted_temp, Some(Number::from(21)));
        // R3 is not part of home data
        assert_eq!(record.rooms[1].name, None);
        assert_eq!(record.rooms[1].reachable, Some(false));
    }

    #[test]
    fn get_status_without_any_home_fails() {
        let mut api = FakeApi::from_fixtures();
        api.homes.homes.clear();
        let err = get_status(&api, &home_id()).unwrap_err();
        assert!(matches!(err, NeuronError::Parameter(ParameterError::Invalid(_))));
        assert_eq!(api.calls(), vec![Call::HomesData(Some(home_id()))]);
    }

    #[test]
    fn set_temp_resolves_room_name() {
        let api = FakeApi::from_fixtures();
        set_temp(&api, &home_id(), &RoomRef::Name("kitchen".into()), 21).expect("set temp");
        assert_eq!(
            api.calls(),
            vec![
                Call::HomesData(Some(home_id())),
                Call::SetRoomThermpoint(RoomThermpoint {
                    home_id: home_id(),
                    room_id: RoomId("R1".into()),
                    mode: SetpointMode::Manual,
                    temp: Some(21),
                }),
            ]
        );
    }

    #[test]
    fn set_temp_with_room_id_skips_lookup() {
        let api = FakeApi::from_fixtures();
        set_temp(&api, &home_id(), &RoomRef::Id(RoomId("R2".into())), 18).expect("set temp");
        assert_eq!(api.calls().len(), 1);
    }

    #[test]
    fn set_temp_unknown_room_fails_before_write() {
        let api = FakeApi::from_fixtures();
        let err = set_temp(&api, &home_id(), &RoomRef::Name("Garage".into()), 21).unwrap_err();
        assert_eq!(err.to_string(), "room Garage not found");
        assert_eq!(api.calls(), vec![Call::HomesData(Some(home_id()))]);
    }

    #[test]
    fn cancel_set_temp_returns_provider_status() {
        let api = FakeApi::from_fixtures();
        let ack = cancel_set_temp(&api, &home_id(), &RoomRef::Id(RoomId("R1".into()))).expect("cancel");
        assert_eq!(ack, AckRecord { ok: "ok".into() });
        assert_eq!(
            api.calls(),
            vec![Call::SetRoomThermpoint(RoomThermpoint {
                home_id: home_id(),
                room_id: RoomId("R1".into()),
                mode: SetpointMode::Home,
                temp: None,
            })]
        );
    }

    #[test]
    fn change_mode_issues_one_call() {
        for mode in [ThermMode::Schedule, ThermMode::Away, ThermMode::Hg] {
            let api = FakeApi::from_fixtures();
            change_mode(&api, &home_id(), mode).expect("change mode");
            assert_eq!(api.calls(), vec![Call::SetThermMode(home_id(), mode)]);
        }
    }

    #[test]
    fn switch_schedule_by_name() {
        let api = FakeApi::from_fixtures();
        switch_schedule(&api, &home_id(), &ScheduleRef::Name("HOLIDAYS".into())).expect("switch");
        assert_eq!(
            api.calls().last(),
            Some(&Call::SwitchHomeSchedule(home_id(), ScheduleId("S2".into())))
        );

        let api = FakeApi::from_fixtures();
        let err = switch_schedule(&api, &home_id(), &ScheduleRef::Name("Winter".into())).unwrap_err();
        assert!(matches!(err, NeuronError::Parameter(ParameterError::Invalid(_))));
    }
}
