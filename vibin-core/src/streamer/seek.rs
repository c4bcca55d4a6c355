//! Parses the three accepted forms of a `seek()` target: a normalized
//! fraction in `[0,1]`, a whole number of seconds, or an `h:mm:ss` string.
//! Grounded on the HMS-parsing idiom in
//! `pmocontrol/src/music_renderer/watcher.rs::parse_hms_to_secs`.

use serde_json::Value;

use crate::errors::{Result, VibinError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekTarget {
    pub seconds: u32,
}

/// `duration_seconds` is the active track's known duration, needed to turn
/// a normalized fraction into an absolute position. A JSON integer (`90`)
/// is always whole seconds. A JSON float is the StreamMagic normalized-seek
/// quirk: `0.0` is 0 seconds, a value strictly between `0` and `1` scales by
/// duration, and `1.0` (and anything `>= 1.0`) is truncated to whole seconds
/// rather than treated as end-of-track — matching the original adapter's
/// `target == 0` / `target < 1` / `else: int(target)` split.
pub fn parse_seek_target(input: &Value, duration_seconds: Option<i64>) -> Result<SeekTarget> {
    match input {
        Value::Number(n) => {
            if let Some(whole) = n.as_u64() {
                return Ok(SeekTarget { seconds: whole as u32 });
            }
            let fraction = n.as_f64().ok_or_else(|| VibinError::InputError("seek target number must be a non-negative integer or a fraction in [0,1]".to_string()))?;
            if fraction < 0.0 {
                return Err(VibinError::InputError(format!("seek target {fraction} must not be negative")));
            }
            if fraction == 0.0 {
                return Ok(SeekTarget { seconds: 0 });
            }
            if fraction < 1.0 {
                let duration = duration_seconds.ok_or_else(|| VibinError::InputError("cannot seek by normalized fraction: active track duration is unknown".to_string()))?;
                return Ok(SeekTarget {
                    seconds: (fraction * duration as f64).floor() as u32,
                });
            }
            Ok(SeekTarget { seconds: fraction as u32 })
        }
        Value::String(hms) => parse_hms(hms).map(|seconds| SeekTarget { seconds }),
        _ => Err(VibinError::InputError("seek target must be a number or an h:mm:ss string".to_string())),
    }
}

fn parse_hms(hms: &str) -> Result<u32> {
    let invalid = || VibinError::InputError(format!("invalid h:mm:ss seek target: {hms}"));

    let parts: Vec<u32> = hms.split(':').map(|p| p.parse::<u32>().map_err(|_| invalid())).collect::<Result<_>>()?;

    match parts.as_slice() {
        [hours, minutes, seconds] => Ok(hours * 3600 + minutes * 60 + seconds),
        [minutes, seconds] => Ok(minutes * 60 + seconds),
        [seconds] => Ok(*seconds),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_number_is_seconds_directly() {
        let target = parse_seek_target(&Value::from(90u64), None).unwrap();
        assert_eq!(target.seconds, 90);
    }

    #[test]
    fn fraction_scales_by_duration() {
        let target = parse_seek_target(&Value::from(0.5), Some(200)).unwrap();
        assert_eq!(target.seconds, 100);
    }

    #[test]
    fn fraction_without_known_duration_is_rejected() {
        assert!(parse_seek_target(&Value::from(0.5), None).is_err());
    }

    #[test]
    fn zero_fraction_maps_to_zero_seconds_without_duration() {
        let target = parse_seek_target(&Value::from(0.0), None).unwrap();
        assert_eq!(target.seconds, 0);
    }

    #[test]
    fn one_point_zero_is_one_second_not_end_of_track() {
        let target = parse_seek_target(&Value::from(1.0), Some(200)).unwrap();
        assert_eq!(target.seconds, 1);
    }

    #[test]
    fn float_above_one_truncates_to_whole_seconds() {
        let target = parse_seek_target(&Value::from(42.9), None).unwrap();
        assert_eq!(target.seconds, 42);
    }

    #[test]
    fn hms_string_is_parsed() {
        let target = parse_seek_target(&Value::from("1:02:03"), None).unwrap();
        assert_eq!(target.seconds, 3723);
    }

    #[test]
    fn mm_ss_string_is_parsed() {
        let target = parse_seek_target(&Value::from("02:03"), None).unwrap();
        assert_eq!(target.seconds, 123);
    }

    #[test]
    fn boolean_input_is_a_type_error() {
        assert!(parse_seek_target(&Value::from(true), None).is_err());
    }
}
