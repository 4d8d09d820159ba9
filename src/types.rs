//! Shared field helpers: band table, timestamp derivation, callsign folding.

use crate::record::Record;

/// Band edges in MHz paired with the ADIF band name.
const BAND_EDGES: &[(f64, f64, &str)] = &[
    (0.1357, 0.1378, "2190m"),
    (0.472, 0.479, "630m"),
    (0.501, 0.504, "560m"),
    (1.8, 2.0, "160m"),
    (3.5, 4.0, "80m"),
    (5.06, 5.45, "60m"),
    (7.0, 7.3, "40m"),
    (10.1, 10.15, "30m"),
    (14.0, 14.35, "20m"),
    (18.068, 18.168, "17m"),
    (21.0, 21.45, "15m"),
    (24.890, 24.99, "12m"),
    (28.0, 29.7, "10m"),
    (50.0, 54.0, "6m"),
    (70.0, 71.0, "4m"),
    (144.0, 148.0, "2m"),
    (222.0, 225.0, "1.25m"),
    (420.0, 450.0, "70cm"),
    (902.0, 928.0, "33cm"),
    (1240.0, 1300.0, "23cm"),
    (2300.0, 2450.0, "13cm"),
    (3300.0, 3500.0, "9cm"),
    (5650.0, 5925.0, "6cm"),
    (10000.0, 10500.0, "3cm"),
    (24000.0, 24250.0, "1.25cm"),
    (47000.0, 47200.0, "6mm"),
    (75500.0, 81000.0, "4mm"),
    (119980.0, 120020.0, "2.5mm"),
    (142000.0, 149000.0, "2mm"),
    (241000.0, 250000.0, "1mm"),
];

/// Maps a frequency in MHz to its ADIF band name, or `None` when the
/// frequency falls outside every amateur allocation.
pub fn freq_to_band(mhz: f64) -> Option<&'static str> {
    BAND_EDGES
        .iter()
        .find(|(lo, hi, _)| mhz >= *lo && mhz <= *hi)
        .map(|(_, _, name)| *name)
}

/// Trimmed, uppercased callsign used for comparisons.
pub fn normalize_call(call: &str) -> String {
    call.trim().to_ascii_uppercase()
}

/// Derives a Unix timestamp in seconds from a record's `QSO_DATE`
/// (`YYYYMMDD`) and `TIME_ON` (`HHMM` or `HHMMSS`) fields.
///
/// Returns `None` when either field is missing or malformed; callers
/// degrade to "no information" rather than failing.
pub fn qso_timestamp(record: &Record) -> Option<i64> {
    let date = record.get("QSO_DATE")?;
    let time = record.get("TIME_ON")?;
    timestamp_from(date.trim(), time.trim())
}

fn timestamp_from(date: &str, time: &str) -> Option<i64> {
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !(time.len() == 4 || time.len() == 6) || !time.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year: i64 = date[0..4].parse().ok()?;
    let month: u32 = date[4..6].parse().ok()?;
    let day: u32 = date[6..8].parse().ok()?;
    let hour: i64 = time[0..2].parse().ok()?;
    let minute: i64 = time[2..4].parse().ok()?;
    let second: i64 = if time.len() == 6 {
        time[4..6].parse().ok()?
    } else {
        0
    };

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    if hour > 23 || minute > 59 || second > 59 {
        return None;
    }

    Some(days_from_civil(year, month, day) * 86_400 + hour * 3_600 + minute * 60 + second)
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = i64::from((month + 9) % 12);
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}
