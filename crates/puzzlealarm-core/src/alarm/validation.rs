//! Structural and business rules for alarm records.
//!
//! Called by the repository before any persistence or scheduling side effect.

use super::model::{Alarm, AlarmSettings, PuzzleConfig, RepeatPattern, SnoozeSettings};
use crate::error::ValidationError;

pub fn validate_alarm(alarm: &Alarm) -> Result<(), ValidationError> {
    if alarm.label.trim().is_empty() {
        return Err(ValidationError::LabelRequired);
    }
    validate_repeat(alarm.repeat_pattern, &alarm.repeat_days)?;
    validate_settings(&alarm.settings)?;
    validate_snooze_settings(&alarm.snooze_settings)
}

pub fn validate_repeat(pattern: RepeatPattern, days: &[u8]) -> Result<(), ValidationError> {
    if pattern != RepeatPattern::Custom {
        return Ok(());
    }
    if days.is_empty() {
        return Err(ValidationError::MissingRepeatDays);
    }
    match days.iter().find(|d| **d > 6) {
        Some(day) => Err(ValidationError::InvalidRepeatDay(*day)),
        None => Ok(()),
    }
}

pub fn validate_settings(settings: &AlarmSettings) -> Result<(), ValidationError> {
    validate_challenge("dismiss", settings.dismiss_challenge.as_ref())?;
    // Written as a negated range check so NaN is rejected too.
    if !(0.0..=1.0).contains(&settings.volume) {
        return Err(ValidationError::VolumeOutOfRange(settings.volume));
    }
    settings.sound.validate()?;
    if settings.sound_name.trim().is_empty() {
        return Err(ValidationError::SoundNameRequired);
    }
    Ok(())
}

pub fn validate_snooze_settings(settings: &SnoozeSettings) -> Result<(), ValidationError> {
    validate_challenge("snooze", settings.challenge_config.as_ref())?;
    if !(1..=60).contains(&settings.duration) {
        return Err(ValidationError::SnoozeDurationOutOfRange(settings.duration));
    }
    if !(1..=10).contains(&settings.max_count) {
        return Err(ValidationError::SnoozeCountOutOfRange(settings.max_count));
    }
    if settings.shorten_by >= settings.duration {
        return Err(ValidationError::ShortenByTooLarge {
            shorten_by: settings.shorten_by,
            duration: settings.duration,
        });
    }
    Ok(())
}

fn validate_challenge(
    which: &'static str,
    config: Option<&PuzzleConfig>,
) -> Result<(), ValidationError> {
    let Some(config) = config.filter(|c| c.enabled) else {
        return Ok(());
    };
    if config.puzzle_type.is_none() {
        return Err(ValidationError::IncompleteChallenge { which, missing: "type" });
    }
    if config.difficulty.is_none() {
        return Err(ValidationError::IncompleteChallenge { which, missing: "difficulty" });
    }
    Ok(())
}
