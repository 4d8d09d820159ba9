//! Cross-log record matching and field merging.
//!
//! Matching decides whether two independently logged records describe the
//! same contact; merging folds a source record into a destination record
//! under a declarative per-field rule table. Both are pure functions of
//! their inputs.

use serde::{Deserialize, Serialize};

use crate::record::Record;
use crate::types::{freq_to_band, normalize_call, qso_timestamp};

/// Default match key: callsign, band, mode, and the contact start time.
pub const DEFAULT_KEY_FIELDS: &[&str] = &["CALL", "BAND", "MODE", "QSO_DATE", "TIME_ON"];

/// Default clock-skew tolerance between two loggers, in seconds.
pub const DEFAULT_MAX_DELTA_SECONDS: i64 = 900;

/// Frequency fields compare equal within 1 kHz.
const FREQ_TOLERANCE_MHZ: f64 = 0.001;

/// Configuration for [`matches`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Fields that make up the match key.
    pub key_fields: Vec<String>,
    /// Maximum start-time difference in seconds.
    pub max_delta_seconds: i64,
    /// Treat a key field absent from either record as matching. Default is
    /// false: no field, no match.
    pub match_missing: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            key_fields: DEFAULT_KEY_FIELDS.iter().map(|s| s.to_string()).collect(),
            max_delta_seconds: DEFAULT_MAX_DELTA_SECONDS,
            match_missing: false,
        }
    }
}

/// True when the record carries the minimum fields a useful QSO needs:
/// CALL, BAND, MODE, QSO_DATE, and TIME_ON.
pub fn minimum_qso(record: &Record) -> bool {
    ["CALL", "BAND", "MODE", "QSO_DATE", "TIME_ON"]
        .iter()
        .all(|name| record.has(name))
}

/// Decides whether `a` and `b` describe the same contact.
///
/// Every key field must compare equal under its field class (callsigns
/// case-insensitively, frequencies numerically, modes with submode
/// fallback), and when the key includes date/time the start times must lie
/// within the tolerance window. Symmetric in `a` and `b`.
pub fn matches(a: &Record, b: &Record, options: &MatchOptions) -> bool {
    if !options.match_missing && !(minimum_qso(a) && minimum_qso(b)) {
        return false;
    }

    let mut check_time = false;
    for field in &options.key_fields {
        let name = field.trim().to_ascii_uppercase();
        let ok = match name.as_str() {
            "QSO_DATE" | "TIME_ON" => {
                check_time = true;
                true
            }
            "BAND" | "BAND_RX" => band_matches(a, b, &name, options.match_missing),
            "FREQ" | "FREQ_RX" => freq_matches(a, b, &name, options.match_missing),
            "MODE" | "SUBMODE" => mode_matches(a, b, options.match_missing),
            "CALL" | "OPERATOR" | "STATION_CALLSIGN" | "OWNER_CALLSIGN" => {
                text_matches(a, b, &name, options.match_missing, true)
            }
            _ => text_matches(a, b, &name, options.match_missing, false),
        };
        if !ok {
            return false;
        }
    }

    if check_time && !time_matches(a, b, options) {
        return false;
    }
    true
}

fn text_matches(a: &Record, b: &Record, name: &str, missing_ok: bool, fold_case: bool) -> bool {
    match (a.get(name), b.get(name)) {
        (Some(x), Some(y)) if fold_case => normalize_call(x) == normalize_call(y),
        (Some(x), Some(y)) => x.trim() == y.trim(),
        _ => missing_ok,
    }
}

fn band_matches(a: &Record, b: &Record, name: &str, missing_ok: bool) -> bool {
    match (effective_band(a, name), effective_band(b, name)) {
        (Some(x), Some(y)) => x == y,
        _ => missing_ok,
    }
}

/// The record's band, lowercased; falls back to deriving the band from the
/// frequency field when the band field is absent or empty.
fn effective_band(record: &Record, name: &str) -> Option<String> {
    if let Some(band) = record.get(name) {
        let band = band.trim();
        if !band.is_empty() {
            return Some(band.to_ascii_lowercase());
        }
    }
    let freq_name = if name == "BAND_RX" { "FREQ_RX" } else { "FREQ" };
    let mhz: f64 = record.get(freq_name)?.trim().parse().ok()?;
    freq_to_band(mhz).map(str::to_string)
}

fn freq_matches(a: &Record, b: &Record, name: &str, missing_ok: bool) -> bool {
    let parse = |record: &Record| -> Option<f64> { record.get(name)?.trim().parse().ok() };
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => (x - y).abs() <= FREQ_TOLERANCE_MHZ,
        _ => missing_ok,
    }
}

/// Mode equivalence with submode fallback: PSK31 logged as MODE=PSK31 on
/// one side and MODE=PSK/SUBMODE=PSK31 on the other still matches.
fn mode_matches(a: &Record, b: &Record, missing_ok: bool) -> bool {
    let upper = |record: &Record, name: &str| {
        record
            .get(name)
            .map(|v| v.trim().to_ascii_uppercase())
            .unwrap_or_default()
    };
    let m1 = upper(a, "MODE");
    let m2 = upper(b, "MODE");
    let sm1 = upper(a, "SUBMODE");
    let sm2 = upper(b, "SUBMODE");

    if m1.is_empty() || m2.is_empty() {
        return missing_ok;
    }
    if m1 == m2 {
        if !sm1.is_empty() && !sm2.is_empty() {
            return sm1 == sm2;
        }
        return true;
    }
    m1 == sm2 || m2 == sm1
}

fn time_matches(a: &Record, b: &Record, options: &MatchOptions) -> bool {
    match (qso_timestamp(a), qso_timestamp(b)) {
        (Some(x), Some(y)) => (x - y).abs() <= options.max_delta_seconds,
        _ => options.match_missing,
    }
}

/// How one field combines during [`merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeRule {
    /// Keep dest's value if present, otherwise take src's.
    PreferDest,
    /// Take src's value if present, otherwise keep dest's.
    PreferSrc,
    /// Take whichever side is non-empty; dest wins when both are.
    PreferNonempty,
    /// Src is authoritative: its value always wins when the field is
    /// present in src.
    AlwaysSrc,
    /// Dest is authoritative: src never contributes this field.
    AlwaysDest,
}

/// Declarative merge policy: an ordered rule table keyed by exact field
/// name or `PREFIX*` wildcard, first match wins, plus a fallback rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergePolicy {
    /// Ordered `(pattern, rule)` table.
    pub rules: Vec<(String, MergeRule)>,
    /// Rule applied when no pattern matches.
    pub default_rule: MergeRule,
    /// Permit an empty src value under [`MergeRule::AlwaysSrc`] to delete
    /// the field. Default is false: merge never deletes.
    pub allow_clear: bool,
}

impl Default for MergePolicy {
    /// Bookkeeping fields prefer whichever side is filled in; provider
    /// confirmation families are taken from src, the side assumed to carry
    /// the fresher service export.
    fn default() -> Self {
        let rules = [
            ("CALL", MergeRule::PreferNonempty),
            ("BAND", MergeRule::PreferNonempty),
            ("MODE", MergeRule::PreferNonempty),
            ("SUBMODE", MergeRule::PreferNonempty),
            ("QSO_DATE", MergeRule::PreferNonempty),
            ("TIME_ON", MergeRule::PreferNonempty),
            ("FREQ", MergeRule::PreferNonempty),
            ("QSL_*", MergeRule::AlwaysSrc),
            ("QSLRDATE", MergeRule::AlwaysSrc),
            ("LOTW_*", MergeRule::AlwaysSrc),
            ("EQSL_*", MergeRule::AlwaysSrc),
            ("CLUBLOG_*", MergeRule::AlwaysSrc),
            ("QRZCOM_*", MergeRule::AlwaysSrc),
            ("APP_LOTW_*", MergeRule::AlwaysSrc),
            ("APP_MASTERLOG_CLUBLOG_*", MergeRule::AlwaysSrc),
            ("APP_QRZLOG_*", MergeRule::AlwaysSrc),
        ];
        Self {
            rules: rules
                .into_iter()
                .map(|(pattern, rule)| (pattern.to_string(), rule))
                .collect(),
            default_rule: MergeRule::PreferNonempty,
            allow_clear: false,
        }
    }
}

impl MergePolicy {
    /// The rule governing `field`.
    pub fn rule_for(&self, field: &str) -> MergeRule {
        let name = field.trim().to_ascii_uppercase();
        for (pattern, rule) in &self.rules {
            if pattern_matches(pattern, &name) {
                return *rule;
            }
        }
        self.default_rule
    }
}

fn pattern_matches(pattern: &str, name: &str) -> bool {
    let pattern = pattern.trim().to_ascii_uppercase();
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => name == pattern,
    }
}

/// Combines `src` into `dest` under `policy`, producing a new record.
///
/// Field order follows dest, then src-only fields in src order. A field
/// present in dest is only dropped when src supplies an empty value under
/// an `AlwaysSrc` rule with `allow_clear` set. Idempotent: merging the same
/// src twice yields the same record.
pub fn merge(dest: &Record, src: &Record, policy: &MergePolicy) -> Record {
    let mut out = Record::new();
    for (name, _) in dest.iter() {
        if let Some(value) = merged_value(name, dest, src, policy) {
            out.set(name, value);
        }
    }
    for (name, _) in src.iter() {
        if !dest.has(name) {
            if let Some(value) = merged_value(name, dest, src, policy) {
                out.set(name, value);
            }
        }
    }
    out
}

fn merged_value<'a>(
    name: &str,
    dest: &'a Record,
    src: &'a Record,
    policy: &MergePolicy,
) -> Option<&'a str> {
    let d = dest.get(name);
    let s = src.get(name);
    let nonempty = |v: Option<&'a str>| v.filter(|v| !v.trim().is_empty());

    match policy.rule_for(name) {
        MergeRule::PreferDest => d.or(s),
        MergeRule::PreferSrc => s.or(d),
        MergeRule::PreferNonempty => nonempty(d).or(nonempty(s)).or(d).or(s),
        MergeRule::AlwaysSrc => match s {
            Some(value) if !value.trim().is_empty() => Some(value),
            Some(_) if policy.allow_clear => None,
            Some(_) => d.or(s),
            None => d,
        },
        MergeRule::AlwaysDest => d,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qso(call: &str, band: &str, mode: &str, date: &str, time: &str) -> Record {
        [
            ("CALL", call),
            ("BAND", band),
            ("MODE", mode),
            ("QSO_DATE", date),
            ("TIME_ON", time),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn default_policy_routes_provider_fields_to_src() {
        let policy = MergePolicy::default();
        assert_eq!(policy.rule_for("LOTW_QSL_RCVD"), MergeRule::AlwaysSrc);
        assert_eq!(policy.rule_for("eqsl_qslrdate"), MergeRule::AlwaysSrc);
        assert_eq!(policy.rule_for("CALL"), MergeRule::PreferNonempty);
        assert_eq!(policy.rule_for("COMMENT"), MergeRule::PreferNonempty);
    }

    #[test]
    fn minimum_qso_requires_all_five_fields() {
        let mut record = qso("W1AW", "20m", "CW", "20230101", "1200");
        assert!(minimum_qso(&record));
        record.remove("TIME_ON");
        assert!(!minimum_qso(&record));
    }

    #[test]
    fn mode_submode_fallback() {
        let mut a = qso("W1AW", "20m", "PSK31", "20230101", "1200");
        let mut b = qso("W1AW", "20m", "PSK", "20230101", "1200");
        b.set("SUBMODE", "PSK31");
        let options = MatchOptions::default();
        assert!(matches(&a, &b, &options));
        assert!(matches(&b, &a, &options));

        a.set("MODE", "RTTY");
        assert!(!matches(&a, &b, &options));
    }

    #[test]
    fn band_derived_from_frequency_when_empty() {
        let a = qso("W1AW", "20m", "CW", "20230101", "1200");
        let mut b = qso("W1AW", "", "CW", "20230101", "1200");
        b.set("FREQ", "14.025");
        let options = MatchOptions::default();
        assert!(matches(&a, &b, &options));

        b.set("FREQ", "7.025");
        assert!(!matches(&a, &b, &options));
    }

    #[test]
    fn merge_prefer_nonempty_keeps_dest_on_tie() {
        let policy = MergePolicy::default();
        let dest: Record = [("CALL", "W1AW"), ("COMMENT", "from dest")]
            .into_iter()
            .collect();
        let src: Record = [("CALL", "W1AW"), ("COMMENT", "from src"), ("NAME", "Sam")]
            .into_iter()
            .collect();
        let merged = merge(&dest, &src, &policy);
        assert_eq!(merged.get("COMMENT"), Some("from dest"));
        assert_eq!(merged.get("NAME"), Some("Sam"));
    }

    #[test]
    fn always_src_clears_only_when_allowed() {
        let mut policy = MergePolicy::default();
        let dest: Record = [("LOTW_QSL_RCVD", "N")].into_iter().collect();
        let src: Record = [("LOTW_QSL_RCVD", "")].into_iter().collect();

        let merged = merge(&dest, &src, &policy);
        assert_eq!(merged.get("LOTW_QSL_RCVD"), Some("N"));

        policy.allow_clear = true;
        let merged = merge(&dest, &src, &policy);
        assert!(!merged.has("LOTW_QSL_RCVD"));
    }
}
