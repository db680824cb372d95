//! Key Naming Module
//!
//! Key layout shared with the room, player and quiz flows that own these records.

use crate::error::KeyParseError;

/// Namespace of every room-scoped key
pub const ROOM_NAMESPACE: &str = "Room";

/// SCAN pattern that discovers room records
pub const ROOM_KEY_PATTERN: &str = "Room:*";

const SEPARATOR: char = ':';

pub fn room_key(room_id: &str) -> String {
    format!("Room:{}", room_id)
}

pub fn players_key(room_id: &str) -> String {
    format!("Room:{}:Players", room_id)
}

pub fn leaderboard_key(room_id: &str) -> String {
    format!("Room:{}:Leaderboard", room_id)
}

pub fn current_quiz_key(room_id: &str) -> String {
    format!("Room:{}:CurrentQuiz", room_id)
}

pub fn quiz_set_key(room_id: &str) -> String {
    format!("Room:{}:QuizSet", room_id)
}

pub fn quiz_key(room_id: &str, quiz_id: &str) -> String {
    format!("Room:{}:Quiz:{}", room_id, quiz_id)
}

pub fn quiz_choices_key(room_id: &str, quiz_id: &str) -> String {
    format!("Room:{}:Quiz:{}:Choices", room_id, quiz_id)
}

pub fn player_key(player_id: &str) -> String {
    format!("Player:{}", player_id)
}

/// Extracts the room identifier from a `Room:{id}` record key.
///
/// `Room:*` also matches derived keys such as `Room:42:Players`; those are
/// rejected with [`KeyParseError::DerivedKey`] so a sweep refreshes each room
/// once, through its record key.
pub fn parse_room_id(key: &str) -> Result<&str, KeyParseError> {
    let rest = key
        .strip_prefix(ROOM_NAMESPACE)
        .and_then(|rest| rest.strip_prefix(SEPARATOR))
        .ok_or(KeyParseError::WrongNamespace)?;

    if rest.is_empty() {
        return Err(KeyParseError::EmptyId);
    }
    if rest.contains(SEPARATOR) {
        return Err(KeyParseError::DerivedKey);
    }

    Ok(rest)
}
