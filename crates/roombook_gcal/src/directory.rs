//! Static room name to calendar id mapping.

use roombook_common::{unknown_room, RoombookError};
use roombook_config::RoomCalendars;

/// The rooms that have their own resource calendar, in directory order.
#[derive(Debug, Clone, Default)]
pub struct RoomDirectory {
    rooms: RoomCalendars,
}

impl RoomDirectory {
    pub fn new(rooms: RoomCalendars) -> Self {
        Self { rooms }
    }

    /// Calendar id of `room_name`; unknown names fail before any remote call.
    pub fn resolve_room_calendar(&self, room_name: &str) -> Result<&str, RoombookError> {
        self.rooms
            .get(room_name)
            .map(String::as_str)
            .ok_or_else(|| unknown_room(room_name))
    }

    /// `(room name, calendar id)` pairs in directory order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rooms.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn room_names(&self) -> Vec<String> {
        self.rooms.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RoomDirectory {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
