//! Handle ids and their mapping back to logical alarm ids.
//!
//! Every trigger registered with the platform carries an id derived from the
//! alarm id: `<alarmId>` for one-shot alarms, `<alarmId>_<index>` for each
//! materialized occurrence of a repeating alarm and `<alarmId>_snooze` for a
//! snooze wake. When the platform reports a fire, or the app is launched from
//! one, the suffix has to be stripped again.

pub const SNOOZE_SUFFIX: &str = "snooze";
pub const LINK_PREFIX: &str = "puzzlealarm://alarm/";

pub fn occurrence_handle_id(alarm_id: &str, index: usize) -> String {
    format!("{alarm_id}_{index}")
}

pub fn snooze_handle_id(alarm_id: &str) -> String {
    format!("{alarm_id}_{SNOOZE_SUFFIX}")
}

/// Logical alarm id for a trigger id. Only numeric and `snooze` suffixes are
/// stripped; anything else is returned unchanged.
pub fn base_alarm_id(handle_id: &str) -> &str {
    match handle_id.rsplit_once('_') {
        Some((base, suffix))
            if !base.is_empty()
                && (suffix == SNOOZE_SUFFIX
                    || (!suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))) =>
        {
            base
        }
        _ => handle_id,
    }
}

/// Alarm id from a `puzzlealarm://alarm/<id>` launch link.
pub fn parse_alarm_link(url: &str) -> Option<&str> {
    let rest = url.strip_prefix(LINK_PREFIX)?;
    let rest = rest.trim_end_matches('/');
    if rest.is_empty() {
        return None;
    }
    Some(base_alarm_id(rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_occurrence_and_snooze_suffixes() {
        assert_eq!(base_alarm_id("abc-123_0"), "abc-123");
        assert_eq!(base_alarm_id("abc-123_12"), "abc-123");
        assert_eq!(base_alarm_id("abc-123_snooze"), "abc-123");
        assert_eq!(base_alarm_id(&occurrence_handle_id("x", 3)), "x");
        assert_eq!(base_alarm_id(&snooze_handle_id("x")), "x");
    }

    #[test]
    fn leaves_plain_ids_alone() {
        assert_eq!(base_alarm_id("abc-123"), "abc-123");
        assert_eq!(base_alarm_id("my_alarm"), "my_alarm");
        assert_eq!(base_alarm_id("_0"), "_0");
        assert_eq!(base_alarm_id("abc_"), "abc_");
    }

    #[test]
    fn parses_launch_links() {
        assert_eq!(parse_alarm_link("puzzlealarm://alarm/abc_2"), Some("abc"));
        assert_eq!(parse_alarm_link("puzzlealarm://alarm/abc/"), Some("abc"));
        assert_eq!(parse_alarm_link("puzzlealarm://alarm/"), None);
        assert_eq!(parse_alarm_link("https://example.com/alarm/abc"), None);
    }
}
