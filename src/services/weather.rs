use crate::client::NetatmoApi;
use crate::config::ParameterError;
use crate::models::netatmo::{DeviceId, Station};
use crate::services::dispatch::NeuronError;
use log::{info, warn};
use serde_json::{Map, Value};

const BATTERY_KEY: &str = "battery_percent";

/// Station measurements, with one nested object per module keyed by module name.
pub type WeatherRecord = Map<String, Value>;

fn measurements(name: &str, dashboard: Option<&Map<String, Value>>, battery: Option<&Value>) -> Map<String, Value> {
    let mut out = match dashboard {
        Some(d) => d.clone(),
        None => {
            warn!("{} reports no dashboard data (offline?)", name);
            Map::new()
        }
    };
    if let Some(b) = battery {
        out.insert(BATTERY_KEY.to_string(), b.clone());
    }
    out
}

pub fn build_weather_record(station: &Station) -> WeatherRecord {
    let station_name = station
        .station_name
        .as_deref()
        .or(station.module_name.as_deref())
        .unwrap_or(&station.id.0);
    let mut record = measurements(station_name, station.dashboard_data.as_ref(), station.battery_percent.as_ref());

    for module in &station.modules {
        let values = measurements(
            &module.module_name,
            module.dashboard_data.as_ref(),
            module.battery_percent.as_ref(),
        );
        record.insert(module.module_name.clone(), Value::Object(values));
    }
    record
}

/// Pick the requested station (case-insensitive), falling back to the first one returned.
pub fn select_station<'a>(stations: &'a [Station], device_id: Option<&DeviceId>) -> Option<&'a Station> {
    if let Some(id) = device_id {
        if let Some(station) = stations.iter().find(|s| s.id.0.eq_ignore_ascii_case(&id.0)) {
            return Some(station);
        }
        if let Some(first) = stations.first() {
            warn!("device {} not among the returned stations, using {}", id.0, first.id.0);
        }
    }
    stations.first()
}

pub fn weather_data(api: &impl NetatmoApi, device_id: Option<&DeviceId>) -> Result<WeatherRecord, NeuronError> {
    let data = api.stations_data(device_id)?;
    let station = select_station(&data.devices, device_id)
        .ok_or_else(|| {
            let target = device_id.map(|d| d.0.as_str()).unwrap_or("<any>");
            ParameterError::Invalid(format!("no weather station found for device {}", target))
        })?;

    let record = build_weather_record(station);
    info!(
        "station {}: {} module(s), {} entries",
        station.id.0,
        station.modules.len(),
        record.len()
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::netatmo::StationModule;
    use crate::services::fake::{Call, FakeApi};
    use serde_json::json;

    fn object(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn merges_station_and_modules() {
        let station = Station {
            id: DeviceId("70:ee:50:00:00:01".into()),
            station_name: None,
            module_name: None,
            dashboard_data: Some(object(json!({"Temperature": 18.2}))),
            battery_percent: None,
            modules: vec![StationModule {
                id: DeviceId("05:00:00:00:00:01".into()),
                module_name: "Rain Gauge".into(),
                r#type: None,
                dashboard_data: Some(object(json!({"Rain": 0.4}))),
                battery_percent: Some(json!(80)),
            }],
        };

        assert_eq!(
            Value::Object(build_weather_record(&station)),
            json!({"Temperature": 18.2, "Rain Gauge": {"Rain": 0.4, "battery_percent": 80}})
        );
    }

    #[test]
    fn offline_module_keeps_battery_only() {
        let api = FakeApi::from_fixtures();
        let record = weather_data(&api, None).expect("weather");
        assert_eq!(record.get("Garden"), Some(&json!({"battery_percent": 12})));
        assert_eq!(record.get("CO2"), Some(&json!(612)));
        assert_eq!(
            record.get("Rain Gauge"),
            Some(&json!({"time_utc": 1700000000, "Rain": 0.4, "sum_rain_24": 2.1, "battery_percent": 80}))
        );
        assert_eq!(api.calls(), vec![Call::StationsData(None)]);
    }

    #[test]
    fn requests_the_configured_device() {
        let api = FakeApi::from_fixtures();
        let id = DeviceId("70:EE:50:00:00:01".into());
        weather_data(&api, Some(&id)).expect("weather");
        assert_eq!(api.calls(), vec![Call::StationsData(Some(id))]);
    }

    #[test]
    fn unmatched_device_falls_back_to_first_station() {
        let mut api = FakeApi::from_fixtures();
        let mut second = api.stations.devices[0].clone();
        second.id = DeviceId("70:ee:50:00:00:02".into());
        second.modules.clear();
        api.stations.devices.push(second);

        let picked = select_station(&api.stations.devices, Some(&DeviceId("70:EE:50:00:00:02".into())));
        assert_eq!(picked.map(|s| s.id.0.as_str()), Some("70:ee:50:00:00:02"));

        let unknown = DeviceId("70:ee:50:00:00:09".into());
        let picked = select_station(&api.stations.devices, Some(&unknown));
        assert_eq!(picked.map(|s| s.id.0.as_str()), Some("70:ee:50:00:00:01"));

        let record = weather_data(&api, Some(&unknown)).expect("weather");
        assert!(record.contains_key("Rain Gauge"));
        assert_eq!(api.calls(), vec![Call::StationsData(Some(unknown))]);
    }

    #[test]
    fn no_station_is_an_error() {
        let mut api = FakeApi::from_fixtures();
        api.stations.devices.clear();
        let err = weather_data(&api, Some(&DeviceId("70:ee:50:00:00:09".into()))).unwrap_err();
        assert_eq!(err.to_string(), "no weather station found for device 70:ee:50:00:00:09");
    }
}
