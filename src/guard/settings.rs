//! Flood guard tunables.

use serde::{Deserialize, Serialize};

/// Rate limit and mute length applied to every tracked actor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FloodSettings {
    /// Maximum messages allowed inside the window
    #[serde(default = "default_max_messages")]
    pub max_messages: u32,

    /// Window length in seconds
    #[serde(default = "default_time_frame")]
    pub time_frame: u64,

    /// Mute length in seconds
    #[serde(default = "default_mute_duration")]
    pub mute_duration: u64,
}

fn default_max_messages() -> u32 {
    5
}

fn default_time_frame() -> u64 {
    10
}

fn default_mute_duration() -> u64 {
    60
}

impl Default for FloodSettings {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            time_frame: default_time_frame(),
            mute_duration: default_mute_duration(),
        }
    }
}

impl FloodSettings {
    pub fn new(max_messages: u32, time_frame: u64, mute_duration: u64) -> Self {
        Self {
            max_messages,
            time_frame,
            mute_duration,
        }
    }

    pub(crate) fn time_frame_secs(&self) -> i64 {
        i64::try_from(self.time_frame).unwrap_or(i64::MAX)
    }

    pub(crate) fn mute_duration_secs(&self) -> i64 {
        i64::try_from(self.mute_duration).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: FloodSettings = serde_json::from_str(r#"{"max_messages": 3}"#).unwrap();
        assert_eq!(settings, FloodSettings::new(3, 10, 60));
    }

    #[test]
    fn test_empty_json_is_default() {
        let settings: FloodSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, FloodSettings::default());
    }
}
