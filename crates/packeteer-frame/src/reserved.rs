//! Reserved frame type ids.
//!
//! Ids with the high bit set are reserved for well-known categories that
//! downstream frameworks treat specially. Application ids should leave the
//! high bit clear. The convention is advisory: the frame codec accepts any id.

/// High bit marking a reserved id.
pub const MARKER: i32 = i32::MIN;

/// Audio stream data.
pub const AUDIO_TYPE: i32 = 1 | MARKER;

/// Video stream data.
pub const VIDEO_TYPE: i32 = 2 | MARKER;

/// Container (muxed) stream data.
pub const CONTAINER_TYPE: i32 = 3 | MARKER;

/// Every reserved id by name. `MARKER` itself is not an id and is excluded.
pub const RESERVED_IDS: &[(&str, i32)] = &[
    ("AUDIO_TYPE", AUDIO_TYPE),
    ("VIDEO_TYPE", VIDEO_TYPE),
    ("CONTAINER_TYPE", CONTAINER_TYPE),
];

/// Returns true if the id carries the reserved marker bit.
pub fn is_reserved(type_id: i32) -> bool {
    type_id & MARKER != 0
}

/// Look up a reserved id by name.
pub fn lookup(name: &str) -> Option<i32> {
    RESERVED_IDS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|&(_, id)| id)
}

/// Returns the registered name for a reserved id.
pub fn name_of(type_id: i32) -> Option<&'static str> {
    RESERVED_IDS
        .iter()
        .find(|&&(_, id)| id == type_id)
        .map(|&(name, _)| name)
}

/// Renders an id as four space-separated 8-bit binary groups, big-endian.
pub fn describe(type_id: i32) -> String {
    type_id
        .to_be_bytes()
        .iter()
        .map(|b| format!("{b:08b}"))
        .collect::<Vec<_>>()
        .join(" ")
}
