use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

pub(crate) fn format_offset(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}

pub(crate) fn format_date(value: Date) -> String {
    value
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| value.to_string())
}

/// Accepts RFC 3339, a `datetime-local` style value without offset, or a
/// bare date. Values without an offset are read as UTC.
pub(crate) fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(parsed);
    }
    if let Ok(parsed) =
        PrimitiveDateTime::parse(value, format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"))
    {
        return Some(parsed.assume_utc());
    }
    if let Ok(parsed) =
        PrimitiveDateTime::parse(value, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(parsed.assume_utc());
    }
    parse_date(value).map(|date| date.midnight().assume_utc())
}

pub(crate) fn parse_date(value: &str) -> Option<Date> {
    let value = value.trim();
    let date_part = value.split('T').next().unwrap_or(value);
    Date::parse(date_part, format_description!("[year]-[month]-[day]")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Month, Time, UtcOffset};

    #[test]
    fn format_offset_preserves_offset() {
        let date = Date::from_calendar_date(2025, Month::January, 2).unwrap();
        let time = Time::from_hms(10, 20, 30).unwrap();
        let utc = PrimitiveDateTime::new(date, time).assume_utc();
        let offset = UtcOffset::from_hms(3, 0, 0).unwrap();
        assert_eq!(format_offset(utc.to_offset(offset)), "2025-01-02T13:20:30+03:00");
    }

    #[test]
    fn parse_timestamp_accepts_common_shapes() {
        let full = parse_timestamp("2024-05-13T12:00:00Z").expect("rfc3339");
        let local = parse_timestamp("2024-05-13T12:00").expect("datetime-local");
        let bare = parse_timestamp("2024-05-13").expect("date");

        assert_eq!(full, local);
        assert_eq!(bare.hour(), 0);
        assert_eq!(bare.date(), full.date());
        assert!(parse_timestamp("next tuesday").is_none());
    }

    #[test]
    fn parse_date_ignores_time_suffix() {
        let date = parse_date("2024-09-01T00:00:00.000Z").expect("date");
        assert_eq!(format_date(date), "2024-09-01");
    }
}
