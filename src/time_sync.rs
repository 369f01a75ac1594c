//! Network time synchronisation.
//!
//! One SNTP exchange: a 48-byte request whose first byte is `0x1B`
//! (LI 0, version 3, client mode), answered by a packet whose transmit
//! timestamp seconds sit big-endian at offset 40.  The seconds count from
//! 1900-01-01; the real-time clock holds local calendar time with a fixed
//! offset and ISO weekday numbering (Monday = 1).

use core::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Timelike};
use log::{info, warn};

use crate::app::ports::{ClockPort, TimeSourcePort};
use crate::error::{ConnectivityError, Result};

pub const NTP_PACKET_LEN: usize = 48;
pub const NTP_PORT: u16 = 123;

const CLIENT_REQUEST_HEADER: u8 = 0x1B;
const TRANSMIT_SECONDS_OFFSET: usize = 40;

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
pub const NTP_UNIX_DELTA: i64 = 2_208_988_800;

/// Calendar time as stored in the real-time clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtcDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    /// 1 = Monday … 7 = Sunday.
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl fmt::Display for RtcDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

pub fn build_request() -> [u8; NTP_PACKET_LEN] {
    let mut packet = [0u8; NTP_PACKET_LEN];
    packet[0] = CLIENT_REQUEST_HEADER;
    packet
}

pub fn parse_transmit_seconds(response: &[u8]) -> core::result::Result<u32, ConnectivityError> {
    let field = response
        .get(TRANSMIT_SECONDS_OFFSET..TRANSMIT_SECONDS_OFFSET + 4)
        .ok_or(ConnectivityError::BadTimeResponse)?;
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(field);
    Ok(u32::from_be_bytes(bytes))
}

impl RtcDateTime {
    /// Calendar fields of a Unix timestamp, read as wall-clock time.
    pub fn from_unix(secs: i64) -> Option<Self> {
        let dt = DateTime::from_timestamp(secs, 0)?;
        Some(Self {
            year: u16::try_from(dt.year()).ok()?,
            month: dt.month() as u8,
            day: dt.day() as u8,
            weekday: dt.weekday().number_from_monday() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
        })
    }

    /// Inverse of [`RtcDateTime::from_unix`]; the weekday is ignored.
    pub fn to_unix(&self) -> Option<i64> {
        let date = NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )?;
        let dt = date.and_hms_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
        )?;
        Some(dt.and_utc().timestamp())
    }
}

/// Convert NTP seconds to local calendar time.  The offset is applied to
/// the timestamp, so an hour past midnight rolls the date as well.
pub fn to_local_datetime(
    ntp_seconds: u32,
    tz_offset_hours: i8,
) -> core::result::Result<RtcDateTime, ConnectivityError> {
    let unix = i64::from(ntp_seconds) - NTP_UNIX_DELTA + i64::from(tz_offset_hours) * 3_600;
    RtcDateTime::from_unix(unix).ok_or(ConnectivityError::BadTimeResponse)
}

/// Query the time service up to `attempts` times and set the clock from
/// the first usable answer.
pub fn sync_clock<S, C>(
    source: &mut S,
    clock: &mut C,
    attempts: u32,
    tz_offset_hours: i8,
) -> Result<RtcDateTime>
where
    S: TimeSourcePort,
    C: ClockPort,
{
    let request = build_request();
    let mut last = ConnectivityError::TimeServiceUnreachable;
    for attempt in 1..=attempts.max(1) {
        let result = source
            .query(&request)
            .and_then(|resp| parse_transmit_seconds(&resp))
            .and_then(|secs| to_local_datetime(secs, tz_offset_hours));
        match result {
            Ok(now) => {
                clock.set(&now);
                info!("Clock set to {}", now);
                return Ok(now);
            }
            Err(e) => {
                warn!("Time sync attempt {}/{} failed: {}", attempt, attempts, e);
                last = e;
            }
        }
    }
    Err(last.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn response(seconds: u32) -> [u8; NTP_PACKET_LEN] {
        let mut packet = [0u8; NTP_PACKET_LEN];
        packet[40..44].copy_from_slice(&seconds.to_be_bytes());
        packet
    }

    struct Scripted {
        answers: Vec<core::result::Result<[u8; NTP_PACKET_LEN], ConnectivityError>>,
        queries: u32,
    }

    impl TimeSourcePort for Scripted {
        fn query(
            &mut self,
            request: &[u8; NTP_PACKET_LEN],
        ) -> core::result::Result<[u8; NTP_PACKET_LEN], ConnectivityError> {
            assert_eq!(request[0], 0x1B);
            self.queries += 1;
            if self.answers.is_empty() {
                return Err(ConnectivityError::TimeServiceUnreachable);
            }
            self.answers.remove(0)
        }
    }

    #[derive(Default)]
    struct Rtc(Option<RtcDateTime>);

    impl ClockPort for Rtc {
        fn now(&self) -> Option<RtcDateTime> {
            self.0
        }
        fn set(&mut self, now: &RtcDateTime) {
            self.0 = Some(*now);
        }
    }

    #[test]
    fn request_is_client_header_then_zeros() {
        let req = build_request();
        assert_eq!(req[0], 0x1B);
        assert!(req[1..].iter().all(|b| *b == 0));
    }

    #[test]
    fn transmit_seconds_at_offset_40() {
        assert_eq!(parse_transmit_seconds(&response(0xEA05_8BC0)).unwrap(), 0xEA05_8BC0);
        assert_eq!(
            parse_transmit_seconds(&[0u8; 43]),
            Err(ConnectivityError::BadTimeResponse)
        );
    }

    #[test]
    fn converts_with_offset_and_iso_weekday() {
        // 2024-06-01 12:00:00 UTC, a Saturday
        let dt = to_local_datetime(3_926_232_000, 2).unwrap();
        assert_eq!(
            dt,
            RtcDateTime { year: 2024, month: 6, day: 1, weekday: 6, hour: 14, minute: 0, second: 0 }
        );
        assert_eq!(dt.to_string(), "2024-06-01 14:00:00");
    }

    #[test]
    fn offset_rolls_over_midnight() {
        // 2024-12-31 23:30:00 UTC
        let dt = to_local_datetime(3_944_676_600, 2).unwrap();
        assert_eq!((dt.year, dt.month, dt.day, dt.hour), (2025, 1, 1, 1));
        assert_eq!(dt.weekday, 3);
    }

    #[test]
    fn unix_round_trip() {
        let dt = RtcDateTime::from_unix(1_717_243_200).unwrap();
        assert_eq!(dt.to_unix(), Some(1_717_243_200));
    }

    #[test]
    fn sync_retries_then_sets_clock() {
        let mut source = Scripted {
            answers: vec![
                Err(ConnectivityError::TimeServiceUnreachable),
                Ok(response(3_926_232_000)),
            ],
            queries: 0,
        };
        let mut rtc = Rtc::default();
        let now = sync_clock(&mut source, &mut rtc, 5, 2).unwrap();
        assert_eq!(source.queries, 2);
        assert_eq!(rtc.now(), Some(now));
    }

    #[test]
    fn sync_gives_up_after_attempts() {
        let mut source = Scripted { answers: Vec::new(), queries: 0 };
        let mut rtc = Rtc::default();
        assert_eq!(
            sync_clock(&mut source, &mut rtc, 5, 2),
            Err(Error::Connectivity(ConnectivityError::TimeServiceUnreachable))
        );
        assert_eq!(source.queries, 5);
        assert_eq!(rtc.now(), None);
    }
}
