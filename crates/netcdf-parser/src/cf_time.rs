//! CF-convention time decoding.
//!
//! Time variables store offsets from an epoch, described by a `units`
//! attribute such as `days since 1950-01-01 00:00:00 UTC` (Argo `JULD`) or
//! `seconds since 1970-01-01T00:00:00Z`.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{NetCdfError, NetCdfResult};

/// Largest offset accepted before decoding, in milliseconds (~3 million years).
const MAX_OFFSET_MILLIS: f64 = 1.0e17;

/// Parsed `<unit> since <epoch>` description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfTimeUnits {
    millis_per_unit: f64,
    epoch: DateTime<Utc>,
}

impl CfTimeUnits {
    /// Parse a CF units string.
    pub fn parse(units: &str) -> NetCdfResult<Self> {
        let lower = units.to_ascii_lowercase();
        let split = lower
            .find(" since ")
            .ok_or_else(|| NetCdfError::InvalidFormat(format!("not a CF time unit: {}", units)))?;

        let unit = lower[..split].trim();
        let epoch = units[split + " since ".len()..].trim();

        let millis_per_unit = match unit {
            "milliseconds" | "millisecond" | "msec" | "msecs" | "ms" => 1.0,
            "seconds" | "second" | "sec" | "secs" | "s" => 1_000.0,
            "minutes" | "minute" | "min" | "mins" => 60_000.0,
            "hours" | "hour" | "hr" | "hrs" | "h" => 3_600_000.0,
            "days" | "day" | "d" => 86_400_000.0,
            "weeks" | "week" => 604_800_000.0,
            other => {
                return Err(NetCdfError::InvalidFormat(format!(
                    "unsupported time unit '{}' in '{}'",
                    other, units
                )))
            }
        };

        Ok(Self {
            millis_per_unit,
            epoch: parse_epoch(epoch)?,
        })
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Decode one stored offset. Non-finite or out-of-range values yield `None`.
    pub fn decode(&self, value: f64) -> Option<DateTime<Utc>> {
        if !value.is_finite() {
            return None;
        }
        let millis = value * self.millis_per_unit;
        if millis.abs() > MAX_OFFSET_MILLIS {
            return None;
        }
        let offset = Duration::try_milliseconds(millis.round() as i64)?;
        self.epoch.checked_add_signed(offset)
    }
}

fn parse_epoch(raw: &str) -> NetCdfResult<DateTime<Utc>> {
    let mut s = raw.trim();
    for suffix in [" UTC", " utc", "UTC", "Z", "z"] {
        if let Some(stripped) = s.strip_suffix(suffix) {
            s = stripped.trim_end();
            break;
        }
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
        .ok_or_else(|| NetCdfError::InvalidFormat(format!("unparseable time epoch '{}'", raw)))
}
