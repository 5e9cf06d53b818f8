//! Ledger timestamps: local wall-clock time as `YYYY-MM-DD HH:MM:SS.ffffff`.

use time::OffsetDateTime;

/// Current local time, formatted for the ledger.
///
/// Falls back to UTC when the local offset cannot be determined (which the
/// `time` crate refuses to do on some multi-threaded Unix processes).
pub fn now() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    format(now)
}

pub fn format(dt: OffsetDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.microsecond(),
    )
}
