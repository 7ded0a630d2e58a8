//! FAT directory-entry date/time fields.
//!
//! Date: bits 0-4 day, 5-8 month, 9-15 years since 1980.
//! Time: bits 0-4 seconds / 2, 5-10 minutes, 11-15 hours.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// First year representable in a FAT date.
pub const FAT_EPOCH_YEAR: i32 = 1980;
const FAT_LAST_YEAR: i32 = FAT_EPOCH_YEAR + 127;

/// Decode FAT fields into a calendar date-time; `None` for impossible fields (e.g. month 0).
pub fn fat_to_datetime(date: u16, time: u16) -> Option<NaiveDateTime> {
    let year = FAT_EPOCH_YEAR + i32::from(date >> 9);
    let month = u32::from((date >> 5) & 0x0F);
    let day = u32::from(date & 0x1F);
    let hour = u32::from(time >> 11);
    let minute = u32::from((time >> 5) & 0x3F);
    let second = 2 * u32::from(time & 0x1F);
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

/// Seconds-resolution timestamp of FAT fields, treating the wall-clock fields as UTC.
///
/// Invalid fields map to 0.
pub fn fat_to_timestamp(date: u16, time: u16) -> u32 {
    fat_to_datetime(date, time)
        .map(|dt| u32::try_from(dt.and_utc().timestamp()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

/// Encode a date-time into FAT fields; years are clamped to 1980..=2107, seconds rounded down
/// to an even value.
pub fn datetime_to_fat(dt: &NaiveDateTime) -> (u16, u16) {
    let (year, month, day, hour, minute, second) = if dt.year() < FAT_EPOCH_YEAR {
        (FAT_EPOCH_YEAR, 1, 1, 0, 0, 0)
    } else if dt.year() > FAT_LAST_YEAR {
        (FAT_LAST_YEAR, 12, 31, 23, 59, 58)
    } else {
        (
            dt.year(),
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
        )
    };
    let date = (((year - FAT_EPOCH_YEAR) as u16) << 9) | ((month as u16) << 5) | day as u16;
    let time = ((hour as u16) << 11) | ((minute as u16) << 5) | (second / 2) as u16;
    (date, time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn decodes_packed_fields() {
        let date = (40 << 9) | (3 << 5) | 15;
        let time = (12 << 11) | (34 << 5) | 28;
        assert_eq!(fat_to_datetime(date, time), Some(dt(2020, 3, 15, 12, 34, 56)));
        assert_eq!(
            fat_to_timestamp(date, time) as i64,
            dt(2020, 3, 15, 12, 34, 56).and_utc().timestamp()
        );
    }

    #[test]
    fn zeroed_fields_are_invalid() {
        assert_eq!(fat_to_datetime(0, 0), None);
        assert_eq!(fat_to_timestamp(0, 0), 0);
    }

    #[test]
    fn encoding_drops_odd_second_and_clamps_years() {
        let (date, time) = datetime_to_fat(&dt(2023, 11, 2, 8, 5, 7));
        assert_eq!(fat_to_datetime(date, time), Some(dt(2023, 11, 2, 8, 5, 6)));

        let (date, time) = datetime_to_fat(&dt(1970, 1, 1, 0, 0, 0));
        assert_eq!(fat_to_datetime(date, time), Some(dt(1980, 1, 1, 0, 0, 0)));
    }
}
