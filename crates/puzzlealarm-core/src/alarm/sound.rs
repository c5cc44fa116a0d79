//! Alarm sound references.
//!
//! A sound is either one of the bundled tones, addressed by key, or a file the
//! user imported. Resolving a reference to something playable is left to the
//! audio layer.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A bundled tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinSound {
    pub key: &'static str,
    pub name: &'static str,
}

pub const BUILTIN_SOUNDS: &[BuiltinSound] = &[
    BuiltinSound { key: "default", name: "Default" },
    BuiltinSound { key: "gentle_alarm", name: "Gentle Alarm" },
    BuiltinSound { key: "andromeda", name: "Andromeda" },
    BuiltinSound { key: "radar", name: "Radar" },
    BuiltinSound { key: "chimes", name: "Chimes" },
];

pub fn builtin_sound(key: &str) -> Option<&'static BuiltinSound> {
    BUILTIN_SOUNDS.iter().find(|s| s.key == key)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SoundRef {
    Builtin(String),
    Custom(PathBuf),
}

impl SoundRef {
    pub fn builtin(key: impl Into<String>) -> Self {
        SoundRef::Builtin(key.into())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            SoundRef::Builtin(key) if key.is_empty() => Err(ValidationError::EmptySound),
            SoundRef::Builtin(key) => builtin_sound(key)
                .map(|_| ())
                .ok_or_else(|| ValidationError::UnknownSound(key.clone())),
            SoundRef::Custom(path) if path.as_os_str().is_empty() => {
                Err(ValidationError::EmptySound)
            }
            SoundRef::Custom(_) => Ok(()),
        }
    }
}

impl Default for SoundRef {
    fn default() -> Self {
        SoundRef::Builtin("default".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_keys_are_checked_against_catalogue() {
        assert!(SoundRef::builtin("radar").validate().is_ok());
        assert_eq!(
            SoundRef::builtin("kazoo").validate(),
            Err(ValidationError::UnknownSound("kazoo".into()))
        );
        assert_eq!(SoundRef::builtin("").validate(), Err(ValidationError::EmptySound));
    }

    #[test]
    fn custom_paths_only_need_to_be_present() {
        assert!(SoundRef::Custom("/sdcard/ring.mp3".into()).validate().is_ok());
        assert_eq!(
            SoundRef::Custom(PathBuf::new()).validate(),
            Err(ValidationError::EmptySound)
        );
    }

    #[test]
    fn tagged_wire_form() {
        let json = serde_json::to_value(SoundRef::builtin("chimes")).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "builtin", "value": "chimes"}));
    }
}
