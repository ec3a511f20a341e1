//! Conversions between log text and the integer encodings used in
//! [`NormalizedRequest`](crate::NormalizedRequest): Apache timestamps to UTC
//! epoch seconds, and dotted-quad IPv4 addresses to `u32`.

use crate::error::CodecError;
use chrono::{DateTime, NaiveDate, Utc};
use std::net::Ipv4Addr;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// DD/Mon/YYYY:HH:MM:SS +HHMM
const DATE_WIDTH: usize = 26;

/// Convert an Apache timestamp such as `[10/Oct/2000:13:55:36 -0700]` to UTC
/// seconds since the epoch.
///
/// The surrounding brackets are optional, so the bracket contents captured by
/// the line matcher can be passed straight in.
///
/// ```
/// use weblog_core::codec::date_to_epoch;
///
/// assert_eq!(date_to_epoch("[14/Feb/2009:11:31:30 +1200]"), Ok(1234567890));
/// assert_eq!(date_to_epoch("01/Jan/1970:00:00:00 +0000"), Ok(0));
/// ```
pub fn date_to_epoch(text: &str) -> Result<i64, CodecError> {
    let invalid = || CodecError::Date(text.to_string());

    let body = text
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(text);
    if body.len() != DATE_WIDTH || !body.is_ascii() {
        return Err(invalid());
    }

    let bytes = body.as_bytes();
    let separators = [(2, b'/'), (6, b'/'), (11, b':'), (14, b':'), (17, b':'), (20, b' ')];
    if separators.iter().any(|&(i, c)| bytes[i] != c) {
        return Err(invalid());
    }

    let day = number(&body[0..2]).ok_or_else(invalid)?;
    let month = MONTHS
        .iter()
        .position(|m| *m == &body[3..6])
        .ok_or_else(invalid)? as u32
        + 1;
    let year = number(&body[7..11]).ok_or_else(invalid)?;
    let hour = number(&body[12..14]).ok_or_else(invalid)?;
    let minute = number(&body[15..17]).ok_or_else(invalid)?;
    let second = number(&body[18..20]).ok_or_else(invalid)?;

    // there is no year zero in log timestamps
    if year == 0 {
        return Err(invalid());
    }

    let naive = NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(invalid)?;
    let epoch = DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc).timestamp();

    let offset_hours = number(&body[22..24]).ok_or_else(invalid)?;
    let offset_minutes = number(&body[24..26]).ok_or_else(invalid)?;
    if offset_minutes >= 60 {
        return Err(invalid());
    }
    let offset = i64::from(offset_hours * 3600 + offset_minutes * 60);

    // local wall-clock time is ahead of UTC for '+' offsets
    match bytes[21] {
        b'+' => Ok(epoch - offset),
        b'-' => Ok(epoch + offset),
        _ => Err(invalid()),
    }
}

/// Render epoch seconds as an Apache timestamp, always in UTC.
///
/// Only `+0000` input survives a round trip through [`date_to_epoch`]
/// unchanged; other offsets come back normalised to UTC.
pub fn epoch_to_date(epoch: i64) -> Result<String, CodecError> {
    let date = DateTime::<Utc>::from_timestamp(epoch, 0).ok_or(CodecError::Epoch(epoch))?;
    Ok(date.format("[%d/%b/%Y:%H:%M:%S +0000]").to_string())
}

/// Big-endian integer value of a dotted-quad IPv4 address.
pub fn ip4_to_int(quad: &str) -> Result<u32, CodecError> {
    quad.parse::<Ipv4Addr>()
        .map(u32::from)
        .map_err(|_| CodecError::Address(quad.to_string()))
}

/// Dotted-quad form of a big-endian IPv4 integer.
pub fn int_to_ip4(ip: u32) -> String {
    Ipv4Addr::from(ip).to_string()
}

// all-digit fields only, so "+1" or " 1" never sneak through str::parse
fn number(field: &str) -> Option<u32> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_date_to_epoch_known_values() {
        assert_eq!(date_to_epoch("[01/Jan/1970:00:00:00 +0000]"), Ok(0));
        assert_eq!(date_to_epoch("[09/Sep/2001:13:46:40 +1200]"), Ok(1_000_000_000));
        assert_eq!(date_to_epoch("[14/Feb/2009:11:31:30 +1200]"), Ok(1_234_567_890));
        assert_eq!(date_to_epoch("[10/Oct/2000:13:55:36 -0700]"), Ok(971_211_336));
        assert_eq!(date_to_epoch("[21/Feb/2010:00:09:57 +1300]"), Ok(1_266_664_197));
    }

    #[test]
    fn test_date_to_epoch_without_brackets() {
        assert_eq!(date_to_epoch("10/Oct/2000:13:55:36 -0700"), Ok(971_211_336));
    }

    #[test]
    fn test_date_to_epoch_outside_32_bit_range() {
        assert_eq!(date_to_epoch("[31/Dec/1969:23:59:59 +0000]"), Ok(-1));
        assert_eq!(date_to_epoch("[20/Jul/1969:20:17:40 +0000]"), Ok(-14_182_940));
        assert_eq!(date_to_epoch("[01/Jan/2100:00:00:00 +0000]"), Ok(4_102_444_800));
    }

    #[test]
    fn test_date_to_epoch_rejects_bad_input() {
        let bad = [
            "[10/Foo/2000:13:55:36 -0700]", // month
            "[10/Oct/200:13:55:36 -0700]",  // 3-digit year
            "[10/Oct/20000:13:55:36 -0700]",
            "[10/Oct/0000:13:55:36 +0000]", // year zero
            "[30/Feb/2001:00:00:00 +0000]", // not a calendar date
            "[10/Oct/2000:25:55:36 -0700]",
            "[10/Oct/2000:13:55:36 *0700]", // offset sign
            "[10/Oct/2000:13:55:36 +0popo]",
            "[10/Oct/2000:13:55:36 +0075]",
            "[10/Oct/2000 13:55:36 -0700]",
            "[+1/Oct/2000:13:55:36 -0700]",
            "[10/Oct/2000:13:55:36]",
            "",
            "[10/Oct/2000:13:55:36 -0700",
        ];
        for text in bad {
            assert_eq!(
                date_to_epoch(text),
                Err(CodecError::Date(text.to_string())),
                "{text}"
            );
        }
    }

    #[test]
    fn test_date_to_epoch_rejects_multibyte_text() {
        assert!(date_to_epoch("[10/Okt/2000:13:55:3é -0700]").is_err());
    }

    #[test]
    fn test_epoch_to_date() {
        assert_eq!(epoch_to_date(1_234_567_890).unwrap(), "[13/Feb/2009:23:31:30 +0000]");
        assert_eq!(epoch_to_date(-1).unwrap(), "[31/Dec/1969:23:59:59 +0000]");
        assert_eq!(epoch_to_date(i64::MAX), Err(CodecError::Epoch(i64::MAX)));
    }

    #[test]
    fn test_non_utc_offset_normalises_to_utc() {
        let epoch = date_to_epoch("[10/Oct/2000:13:55:36 -0700]").unwrap();
        assert_eq!(epoch_to_date(epoch).unwrap(), "[10/Oct/2000:20:55:36 +0000]");
    }

    #[test]
    fn test_ip4_conversions() {
        assert_eq!(ip4_to_int("192.0.2.235"), Ok(3_221_226_219));
        assert_eq!(ip4_to_int("0.0.0.0"), Ok(0));
        assert_eq!(ip4_to_int("255.255.255.255"), Ok(u32::MAX));
        assert_eq!(int_to_ip4(3_221_226_219), "192.0.2.235");
    }

    #[test]
    fn test_ip4_to_int_rejects_malformed_quads() {
        for quad in ["1.2.3", "1.2.3.4.5", "1.2.3.256", "a.b.c.d", "", "::1", "1.2.3.-4"] {
            assert_eq!(ip4_to_int(quad), Err(CodecError::Address(quad.to_string())));
        }
    }

    proptest! {
        #[test]
        fn ip4_int_round_trip(ip in any::<u32>()) {
            prop_assert_eq!(ip4_to_int(&int_to_ip4(ip)), Ok(ip));
        }

        // years 0001..=9999
        #[test]
        fn utc_date_round_trip(epoch in -62_135_596_800i64..=253_402_300_799) {
            let date = epoch_to_date(epoch).unwrap();
            prop_assert_eq!(date_to_epoch(&date), Ok(epoch));
            prop_assert_eq!(epoch_to_date(date_to_epoch(&date).unwrap()).unwrap(), date);
        }
    }
}
