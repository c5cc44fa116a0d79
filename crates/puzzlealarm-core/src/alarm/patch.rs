//! Partial updates for alarms.
//!
//! Top-level fields replace; `settings` and `snooze_settings` merge field by
//! field, so a patch touching only the snooze duration keeps every other
//! snooze field.

use super::model::{
    Alarm, AlarmSettings, AlarmTime, PuzzleConfig, RepeatPattern, SnoozeSettings,
};
use super::sound::SoundRef;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlarmPatch {
    pub time: Option<AlarmTime>,
    pub enabled: Option<bool>,
    pub label: Option<String>,
    pub repeat_pattern: Option<RepeatPattern>,
    pub repeat_days: Option<Vec<u8>>,
    pub settings: Option<AlarmSettingsPatch>,
    pub snooze_settings: Option<SnoozeSettingsPatch>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlarmSettingsPatch {
    pub sound: Option<SoundRef>,
    pub sound_name: Option<String>,
    pub vibrate: Option<bool>,
    pub volume: Option<f32>,
    pub gradual_volume: Option<bool>,
    /// `Some(None)` removes the dismiss challenge.
    pub dismiss_challenge: Option<Option<PuzzleConfig>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnoozeSettingsPatch {
    pub duration: Option<u32>,
    pub max_count: Option<u32>,
    pub require_challenge: Option<bool>,
    /// `Some(None)` removes the snooze challenge.
    pub challenge_config: Option<Option<PuzzleConfig>>,
    pub auto_shorten: Option<bool>,
    pub shorten_by: Option<u32>,
    pub progressive_difficulty: Option<bool>,
}

impl AlarmPatch {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    pub fn time(time: AlarmTime) -> Self {
        Self {
            time: Some(time),
            ..Self::default()
        }
    }

    /// The merged record. Id, timestamps and handles are left untouched.
    pub fn apply(&self, alarm: &Alarm) -> Alarm {
        let mut merged = alarm.clone();
        if let Some(time) = self.time {
            merged.time = time;
        }
        if let Some(enabled) = self.enabled {
            merged.enabled = enabled;
        }
        if let Some(label) = &self.label {
            merged.label = label.clone();
        }
        if let Some(pattern) = self.repeat_pattern {
            merged.repeat_pattern = pattern;
        }
        if let Some(days) = &self.repeat_days {
            merged.repeat_days = days.clone();
        }
        if let Some(patch) = &self.settings {
            patch.apply_to(&mut merged.settings);
        }
        if let Some(patch) = &self.snooze_settings {
            patch.apply_to(&mut merged.snooze_settings);
        }
        merged
    }
}

impl AlarmSettingsPatch {
    fn apply_to(&self, settings: &mut AlarmSettings) {
        if let Some(sound) = &self.sound {
            settings.sound = sound.clone();
        }
        if let Some(name) = &self.sound_name {
            settings.sound_name = name.clone();
        }
        if let Some(vibrate) = self.vibrate {
            settings.vibrate = vibrate;
        }
        if let Some(volume) = self.volume {
            settings.volume = volume;
        }
        if let Some(gradual) = self.gradual_volume {
            settings.gradual_volume = gradual;
        }
        if let Some(challenge) = self.dismiss_challenge {
            settings.dismiss_challenge = challenge;
        }
    }
}

impl SnoozeSettingsPatch {
    fn apply_to(&self, settings: &mut SnoozeSettings) {
        if let Some(duration) = self.duration {
            settings.duration = duration;
        }
        if let Some(max_count) = self.max_count {
            settings.max_count = max_count;
        }
        if let Some(require) = self.require_challenge {
            settings.require_challenge = require;
        }
        if let Some(challenge) = self.challenge_config {
            settings.challenge_config = challenge;
        }
        if let Some(auto) = self.auto_shorten {
            settings.auto_shorten = auto;
        }
        if let Some(by) = self.shorten_by {
            settings.shorten_by = by;
        }
        if let Some(progressive) = self.progressive_difficulty {
            settings.progressive_difficulty = progressive;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::model::{DifficultyLevel, PuzzleType};
    use chrono::Utc;

    fn alarm() -> Alarm {
        let now = Utc::now();
        Alarm {
            id: "a1".into(),
            time: "07:00".parse().unwrap(),
            enabled: true,
            label: "Work".into(),
            repeat_pattern: RepeatPattern::Weekdays,
            repeat_days: vec![],
            settings: AlarmSettings::default(),
            snooze_settings: SnoozeSettings {
                challenge_config: Some(PuzzleConfig::new(PuzzleType::Math, DifficultyLevel::Easy)),
                ..SnoozeSettings::default()
            },
            notification_ids: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn nested_settings_merge_shallowly() {
        let original = alarm();
        let patch = AlarmPatch {
            snooze_settings: Some(SnoozeSettingsPatch {
                duration: Some(9),
                ..SnoozeSettingsPatch::default()
            }),
            settings: Some(AlarmSettingsPatch {
                volume: Some(0.3),
                ..AlarmSettingsPatch::default()
            }),
            ..AlarmPatch::default()
        };
        let merged = patch.apply(&original);
        assert_eq!(merged.snooze_settings.duration, 9);
        assert_eq!(merged.snooze_settings.max_count, original.snooze_settings.max_count);
        assert_eq!(merged.snooze_settings.challenge_config, original.snooze_settings.challenge_config);
        assert_eq!(merged.settings.volume, 0.3);
        assert_eq!(merged.settings.sound, original.settings.sound);
        assert_eq!(merged.label, "Work");
    }

    #[test]
    fn explicit_none_clears_a_challenge() {
        let patch = AlarmPatch {
            snooze_settings: Some(SnoozeSettingsPatch {
                challenge_config: Some(None),
                ..SnoozeSettingsPatch::default()
            }),
            ..AlarmPatch::default()
        };
        assert!(patch.apply(&alarm()).snooze_settings.challenge_config.is_none());
    }

    #[test]
    fn empty_patch_is_identity() {
        let original = alarm();
        assert_eq!(AlarmPatch::default().apply(&original), original);
    }
}
