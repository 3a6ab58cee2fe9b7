use crate::models::netatmo::{Home, HomeId, HomesData, RoomId, ScheduleId};

/// Case-insensitive exact comparison.
fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Pick the home with `home_id`, falling back to the first home of the account.
pub fn select_home<'a>(data: &'a HomesData, home_id: &HomeId) -> Option<&'a Home> {
    data.homes
        .iter()
        .find(|h| same_name(&h.id.0, &home_id.0))
        .or_else(|| data.homes.first())
}

pub fn find_room_name_by_id<'a>(home: &'a Home, room_id: &RoomId) -> Option<&'a str> {
    home.rooms
        .iter()
        .find(|r| same_name(&r.id.0, &room_id.0))
        .map(|r| r.name.as_str())
}

pub fn find_room_id_by_name<'a>(home: &'a Home, room_name: &str) -> Option<&'a RoomId> {
    home.rooms.iter().find(|r| same_name(&r.name, room_name)).map(|r| &r.id)
}

pub fn find_schedule_id_by_name<'a>(home: &'a Home, schedule_name: &str) -> Option<&'a ScheduleId> {
    home.schedules
        .iter()
        .find(|s| same_name(&s.name, schedule_name))
        .map(|s| &s.id)
}
