//! Alarm records and the value objects embedded in them.
//!
//! An [`Alarm`] is persisted as a whole inside the alarm collection; the
//! settings structs and [`PuzzleConfig`] are never stored on their own.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::sound::SoundRef;
use crate::error::ValidationError;
use crate::gateway::TriggerHandle;
use crate::recurrence::WeekdaySet;

/// Wall-clock time of day, stored as `HH:MM` (24-hour, no timezone).
///
/// Ordering is by hour then minute, which matches lexicographic ordering of
/// the zero-padded string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AlarmTime {
    hour: u8,
    minute: u8,
}

impl AlarmTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, ValidationError> {
        if hour > 23 || minute > 59 {
            return Err(ValidationError::InvalidTime(format!("{hour}:{minute}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    /// Seconds and sub-seconds are always zero.
    pub fn as_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for AlarmTime {
    type Err = ValidationError;

    /// Accepts exactly `([01][0-9]|2[0-3]):[0-5][0-9]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidTime(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(invalid());
        }
        let digit = |b: u8| b.is_ascii_digit().then(|| b - b'0');
        let (h1, h2, m1, m2) = match (
            digit(bytes[0]),
            digit(bytes[1]),
            digit(bytes[3]),
            digit(bytes[4]),
        ) {
            (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
            _ => return Err(invalid()),
        };
        Self::new(h1 * 10 + h2, m1 * 10 + m2).map_err(|_| invalid())
    }
}

impl TryFrom<String> for AlarmTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AlarmTime> for String {
    fn from(value: AlarmTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for AlarmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatPattern {
    Once,
    Daily,
    Weekdays,
    Weekends,
    Custom,
}

impl RepeatPattern {
    pub fn is_repeating(self) -> bool {
        self != RepeatPattern::Once
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RepeatPattern::Once => "once",
            RepeatPattern::Daily => "daily",
            RepeatPattern::Weekdays => "weekdays",
            RepeatPattern::Weekends => "weekends",
            RepeatPattern::Custom => "custom",
        }
    }
}

impl FromStr for RepeatPattern {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "once" => Ok(RepeatPattern::Once),
            "daily" => Ok(RepeatPattern::Daily),
            "weekdays" => Ok(RepeatPattern::Weekdays),
            "weekends" => Ok(RepeatPattern::Weekends),
            "custom" => Ok(RepeatPattern::Custom),
            other => Err(ValidationError::InvalidValue {
                field: "repeat_pattern".into(),
                message: format!("unknown pattern '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PuzzleType {
    Math,
    Barcode,
    Typing,
    Memory,
}

/// Challenge difficulty, ordered `Easy < Medium < Hard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

impl DifficultyLevel {
    const LADDER: [DifficultyLevel; 3] = [
        DifficultyLevel::Easy,
        DifficultyLevel::Medium,
        DifficultyLevel::Hard,
    ];

    /// Step `steps` levels up the ladder, clamped at `Hard`.
    pub fn advanced(self, steps: u32) -> Self {
        let base = Self::LADDER.iter().position(|d| *d == self).unwrap_or(0);
        let index = base
            .saturating_add(steps as usize)
            .min(Self::LADDER.len() - 1);
        Self::LADDER[index]
    }
}

/// Challenge configuration gating a snooze or a dismiss.
///
/// Type and difficulty are optional on the wire so that an incomplete
/// record can be reported by validation instead of failing to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleConfig {
    #[serde(rename = "type", default)]
    pub puzzle_type: Option<PuzzleType>,
    #[serde(default)]
    pub difficulty: Option<DifficultyLevel>,
    pub enabled: bool,
}

impl PuzzleConfig {
    pub fn new(puzzle_type: PuzzleType, difficulty: DifficultyLevel) -> Self {
        Self {
            puzzle_type: Some(puzzle_type),
            difficulty: Some(difficulty),
            enabled: true,
        }
    }

    /// Same challenge with its difficulty advanced `steps` levels.
    /// A missing difficulty is treated as `Easy`.
    pub fn escalated(&self, steps: u32) -> Self {
        if steps == 0 {
            return *self;
        }
        let base = self.difficulty.unwrap_or(DifficultyLevel::Easy);
        Self {
            difficulty: Some(base.advanced(steps)),
            ..*self
        }
    }
}

/// Dismiss-time configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmSettings {
    pub sound: SoundRef,
    pub sound_name: String,
    pub vibrate: bool,
    /// 0.0 ..= 1.0
    pub volume: f32,
    pub gradual_volume: bool,
    #[serde(default)]
    pub dismiss_challenge: Option<PuzzleConfig>,
}

impl AlarmSettings {
    /// The dismiss challenge, if one is configured and switched on.
    pub fn active_dismiss_challenge(&self) -> Option<&PuzzleConfig> {
        self.dismiss_challenge.as_ref().filter(|c| c.enabled)
    }
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            sound: SoundRef::default(),
            sound_name: "Default Sound".into(),
            vibrate: true,
            volume: 0.8,
            gradual_volume: false,
            dismiss_challenge: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnoozeSettings {
    /// Minutes, 1 ..= 60.
    pub duration: u32,
    /// 1 ..= 10.
    pub max_count: u32,
    pub require_challenge: bool,
    #[serde(default)]
    pub challenge_config: Option<PuzzleConfig>,
    pub auto_shorten: bool,
    /// Minutes removed per previous snooze; always less than `duration`.
    pub shorten_by: u32,
    #[serde(default)]
    pub progressive_difficulty: bool,
}

impl SnoozeSettings {
    /// Snooze length after `count` previous snoozes, floored at one minute.
    pub fn duration_after(&self, count: u32) -> u32 {
        if !self.auto_shorten {
            return self.duration;
        }
        self.duration
            .saturating_sub(count.saturating_mul(self.shorten_by))
            .max(1)
    }

    /// The challenge gating a snooze, if snoozing requires one.
    pub fn active_challenge(&self) -> Option<&PuzzleConfig> {
        if !self.require_challenge {
            return None;
        }
        self.challenge_config.as_ref().filter(|c| c.enabled)
    }
}

impl Default for SnoozeSettings {
    fn default() -> Self {
        Self {
            duration: 5,
            max_count: 3,
            require_challenge: false,
            challenge_config: None,
            auto_shorten: false,
            shorten_by: 1,
            progressive_difficulty: false,
        }
    }
}

/// A persisted alarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: String,
    pub time: AlarmTime,
    pub enabled: bool,
    pub label: String,
    pub repeat_pattern: RepeatPattern,
    /// Weekday indices 0-6 (Sunday = 0); only read for `Custom`.
    #[serde(default)]
    pub repeat_days: Vec<u8>,
    pub settings: AlarmSettings,
    pub snooze_settings: SnoozeSettings,
    /// Handles of the occurrences currently live in the native scheduler.
    #[serde(default)]
    pub notification_ids: Vec<TriggerHandle>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Alarm {
    /// Concrete weekday set for the repeat pattern (empty for `Once`).
    pub fn weekday_set(&self) -> WeekdaySet {
        WeekdaySet::for_pattern(self.repeat_pattern, &self.repeat_days)
    }

    /// Label to show, with `placeholder` substituted for a blank one.
    pub fn display_label<'a>(&'a self, placeholder: &'a str) -> &'a str {
        if self.label.trim().is_empty() {
            placeholder
        } else {
            &self.label
        }
    }

    /// Human-readable repeat description ("Weekdays", "Mon, Wed", ...).
    pub fn repeat_label(&self) -> String {
        match self.repeat_pattern {
            RepeatPattern::Once => "Once".into(),
            RepeatPattern::Daily => "Every day".into(),
            RepeatPattern::Weekdays => "Weekdays".into(),
            RepeatPattern::Weekends => "Weekends".into(),
            RepeatPattern::Custom => {
                const NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
                let days: BTreeSet<u8> = self.repeat_days.iter().copied().filter(|d| *d < 7).collect();
                match days.len() {
                    0 => "Once".into(),
                    7 => "Every day".into(),
                    _ => days
                        .iter()
                        .map(|d| NAMES[usize::from(*d)])
                        .collect::<Vec<_>>()
                        .join(", "),
                }
            }
        }
    }
}

/// Whether going from `old` to `new` changes when the alarm fires.
///
/// Day lists are compared as sets, so reordering them is not a change.
pub fn should_reschedule(old: &Alarm, new: &Alarm) -> bool {
    old.time != new.time
        || old.repeat_pattern != new.repeat_pattern
        || old.weekday_set() != new.weekday_set()
}

/// Everything needed to create an alarm; id and timestamps are assigned by
/// the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlarm {
    pub time: AlarmTime,
    pub enabled: bool,
    pub label: String,
    pub repeat_pattern: RepeatPattern,
    pub repeat_days: Vec<u8>,
    pub settings: AlarmSettings,
    pub snooze_settings: SnoozeSettings,
}

impl NewAlarm {
    /// An enabled one-shot alarm with default settings and a blank label.
    pub fn new(time: AlarmTime) -> Self {
        Self {
            time,
            enabled: true,
            label: String::new(),
            repeat_pattern: RepeatPattern::Once,
            repeat_days: Vec::new(),
            settings: AlarmSettings::default(),
            snooze_settings: SnoozeSettings::default(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn repeat(mut self, pattern: RepeatPattern) -> Self {
        self.repeat_pattern = pattern;
        self
    }

    pub fn custom_days(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.repeat_pattern = RepeatPattern::Custom;
        self.repeat_days = days.into_iter().collect();
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn settings(mut self, settings: AlarmSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn snooze_settings(mut self, snooze_settings: SnoozeSettings) -> Self {
        self.snooze_settings = snooze_settings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alarm_time_parses_strict_24h() {
        assert_eq!("07:05".parse::<AlarmTime>().unwrap(), AlarmTime::new(7, 5).unwrap());
        assert_eq!("23:59".parse::<AlarmTime>().unwrap().to_string(), "23:59");
        for bad in ["7:05", "24:00", "12:60", "12-30", "ab:cd", "12:300", ""] {
            assert!(bad.parse::<AlarmTime>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn alarm_time_orders_like_its_string_form() {
        let mut times: Vec<AlarmTime> = ["10:00", "09:30", "09:05", "23:00"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        times.sort();
        let rendered: Vec<String> = times.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["09:05", "09:30", "10:00", "23:00"]);
    }

    #[test]
    fn alarm_time_serializes_as_string() {
        let t = AlarmTime::new(6, 30).unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"06:30\"");
        assert!(serde_json::from_str::<AlarmTime>("\"25:00\"").is_err());
    }

    #[test]
    fn difficulty_advances_and_clamps() {
        assert_eq!(DifficultyLevel::Easy.advanced(0), DifficultyLevel::Easy);
        assert_eq!(DifficultyLevel::Easy.advanced(1), DifficultyLevel::Medium);
        assert_eq!(DifficultyLevel::Medium.advanced(5), DifficultyLevel::Hard);
        assert_eq!(DifficultyLevel::Hard.advanced(u32::MAX), DifficultyLevel::Hard);
    }

    #[test]
    fn escalated_keeps_base_at_zero_and_defaults_missing_to_easy() {
        let base = PuzzleConfig::new(PuzzleType::Math, DifficultyLevel::Medium);
        assert_eq!(base.escalated(0), base);

        let incomplete = PuzzleConfig {
            puzzle_type: Some(PuzzleType::Typing),
            difficulty: None,
            enabled: true,
        };
        assert_eq!(incomplete.escalated(1).difficulty, Some(DifficultyLevel::Medium));
    }

    #[test]
    fn snooze_duration_shortens_to_floor() {
        let settings = SnoozeSettings {
            duration: 10,
            auto_shorten: true,
            shorten_by: 1,
            ..SnoozeSettings::default()
        };
        let durations: Vec<u32> = (0..12).map(|n| settings.duration_after(n)).collect();
        assert_eq!(durations, [10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 1, 1]);

        let fixed = SnoozeSettings { duration: 10, ..SnoozeSettings::default() };
        assert_eq!(fixed.duration_after(4), 10);
    }

    #[test]
    fn snooze_challenge_requires_flag_and_enabled_config() {
        let mut settings = SnoozeSettings {
            challenge_config: Some(PuzzleConfig::new(PuzzleType::Math, DifficultyLevel::Easy)),
            ..SnoozeSettings::default()
        };
        assert!(settings.active_challenge().is_none());
        settings.require_challenge = true;
        assert!(settings.active_challenge().is_some());
        settings.challenge_config.as_mut().unwrap().enabled = false;
        assert!(settings.active_challenge().is_none());
    }

    #[test]
    fn puzzle_config_wire_shape() {
        let json = serde_json::to_value(PuzzleConfig::new(PuzzleType::Memory, DifficultyLevel::Hard)).unwrap();
        assert_eq!(json["type"], "MEMORY");
        assert_eq!(json["difficulty"], "HARD");

        let partial: PuzzleConfig = serde_json::from_str(r#"{"enabled":true}"#).unwrap();
        assert!(partial.puzzle_type.is_none());
    }
}
