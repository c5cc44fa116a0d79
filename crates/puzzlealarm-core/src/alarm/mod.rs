mod ids;
mod model;
mod patch;
mod sound;
mod validation;

pub use ids::{
    base_alarm_id, occurrence_handle_id, parse_alarm_link, snooze_handle_id, LINK_PREFIX,
    SNOOZE_SUFFIX,
};
pub use model::{
    should_reschedule, Alarm, AlarmSettings, AlarmTime, DifficultyLevel, NewAlarm, PuzzleConfig,
    PuzzleType, RepeatPattern, SnoozeSettings,
};
pub use patch::{AlarmPatch, AlarmSettingsPatch, SnoozeSettingsPatch};
pub use sound::{builtin_sound, BuiltinSound, SoundRef, BUILTIN_SOUNDS};
pub use validation::{validate_alarm, validate_repeat, validate_settings, validate_snooze_settings};
