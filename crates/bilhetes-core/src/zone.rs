use std::fmt;
use std::ops::Range;

use chrono::{
    DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc,
};

use crate::CoreError;

/// Time zone in which calendar days, months and years are taken.
///
/// Timestamps are stored in UTC; a `Zone` decides which local day a ticket
/// falls on for filtering, reporting and display. `Local` follows the
/// machine's zone rules (including DST); `Fixed` is a constant offset, used
/// when the viewer's zone travels over the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Zone {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl Zone {
    pub fn utc() -> Self {
        Zone::Fixed(Utc.fix())
    }

    /// The local zone frozen at its current offset.
    pub fn current_offset() -> Self {
        Zone::Fixed(Local::now().offset().fix())
    }

    pub fn naive_local(&self, at: &DateTime<Utc>) -> NaiveDateTime {
        match self {
            Zone::Local => at.with_timezone(&Local).naive_local(),
            Zone::Fixed(offset) => at.with_timezone(offset).naive_local(),
        }
    }

    pub fn date_of(&self, at: &DateTime<Utc>) -> NaiveDate {
        self.naive_local(at).date()
    }

    /// First instant of `date` in this zone.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        match self {
            Zone::Local => first_instant(&Local, midnight),
            Zone::Fixed(offset) => first_instant(offset, midnight),
        }
    }

    /// Half-open UTC range covering calendar `year` in this zone.
    pub fn year_range(&self, year: i32) -> Range<DateTime<Utc>> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .map_or(DateTime::<Utc>::MIN_UTC, |d| self.start_of_day(d));
        let end = NaiveDate::from_ymd_opt(year + 1, 1, 1)
            .map_or(DateTime::<Utc>::MAX_UTC, |d| self.start_of_day(d));
        start..end
    }

    /// Accepts `local`, `Z`/`UTC`, or an offset such as `-03:00` / `+0530`.
    pub fn parse_str(input: &str) -> Result<Self, CoreError> {
        let s = input.trim();
        if s.eq_ignore_ascii_case("local") {
            return Ok(Zone::Local);
        }
        if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
            return Ok(Zone::utc());
        }
        parse_offset(s)
            .map(Zone::Fixed)
            .ok_or_else(|| CoreError::UnknownValue {
                kind: "tz",
                value: input.to_string(),
            })
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Local => f.write_str("local"),
            Zone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

fn first_instant<Tz: TimeZone>(tz: &Tz, midnight: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&midnight).earliest() {
        Some(t) => t.with_timezone(&Utc),
        // Midnight skipped by a DST jump: shift by the offset in force then.
        None => {
            let offset = tz.offset_from_utc_datetime(&midnight).fix();
            (midnight - Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc()
        }
    }
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brt() -> Zone {
        Zone::parse_str("-03:00").unwrap()
    }

    #[test]
    fn parses_offsets_and_names() {
        assert_eq!(Zone::parse_str("local").unwrap(), Zone::Local);
        assert_eq!(Zone::parse_str("UTC").unwrap(), Zone::utc());
        assert_eq!(Zone::parse_str("+0000").unwrap(), Zone::utc());
        assert_eq!(
            Zone::parse_str("+05:30").unwrap(),
            Zone::Fixed(FixedOffset::east_opt(5 * 3600 + 1800).unwrap())
        );
        assert!(Zone::parse_str("-3").is_err());
        assert!(Zone::parse_str("America/Sao_Paulo").is_err());
        assert!(Zone::parse_str("+01:75").is_err());
    }

    #[test]
    fn display_parses_back() {
        for zone in [Zone::Local, Zone::utc(), brt()] {
            assert_eq!(Zone::parse_str(&zone.to_string()).unwrap(), zone);
        }
    }

    #[test]
    fn date_of_follows_the_offset() {
        let at = Utc.with_ymd_and_hms(2024, 3, 11, 1, 0, 0).unwrap();
        assert_eq!(Zone::utc().date_of(&at), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        assert_eq!(brt().date_of(&at), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    }

    #[test]
    fn year_range_starts_at_local_midnight() {
        let range = brt().year_range(2024);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2025, 1, 1, 3, 0, 0).unwrap());

        let new_year_utc = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        assert!(!range.contains(&new_year_utc));
        assert!(Zone::utc().year_range(2024).contains(&new_year_utc));
    }
}
