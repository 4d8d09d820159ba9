use adiflog::merge::{MatchOptions, MergePolicy, MergeRule, matches, merge};
use adiflog::record::Record;

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
fn identical_key_fields_match() {
    let a = qso("W1AW", "20m", "CW", "20230101", "1200");
    let b = qso("w1aw", "20M", "cw", "20230101", "1203");
    let options = MatchOptions::default();
    assert!(matches(&a, &b, &options));
    assert!(matches(&b, &a, &options));
}

#[test]
fn time_window_bounds_are_inclusive() {
    let a = qso("W1AW", "20m", "CW", "20230101", "1200");
    let inside = qso("W1AW", "20m", "CW", "20230101", "1215");
    let outside = qso("W1AW", "20m", "CW", "20230101", "121501");
    let options = MatchOptions::default();

    // 900 seconds apart exactly.
    assert!(matches(&a, &inside, &options));
    assert!(matches(&inside, &a, &options));
    // 901 seconds apart.
    assert!(!matches(&a, &outside, &options));
    assert!(!matches(&outside, &a, &options));
}

#[test]
fn midnight_rollover_stays_within_window() {
    let a = qso("W1AW", "20m", "CW", "20230101", "2359");
    let b = qso("W1AW", "20m", "CW", "20230102", "0005");
    assert!(matches(&a, &b, &MatchOptions::default()));
}

#[test]
fn frequency_key_field_tolerates_one_kilohertz() {
    let with_freq = |mhz: &str| {
        let mut record = qso("W1AW", "20m", "CW", "20230101", "1200");
        record.set("FREQ", mhz);
        record
    };
    let a = with_freq("14.0250");
    let close = with_freq("14.0254");
    let edge = with_freq("14.0260");
    let far = with_freq("14.0261");

    let mut options = MatchOptions::default();
    options.key_fields.push("FREQ".to_string());

    assert!(matches(&a, &close, &options));
    // 1 kHz apart exactly: still equal.
    assert!(matches(&a, &edge, &options));
    assert!(matches(&edge, &a, &options));
    // 1.1 kHz apart.
    assert!(!matches(&a, &far, &options));
    assert!(!matches(&far, &a, &options));
}

#[test]
fn differing_call_or_band_is_no_match() {
    let a = qso("W1AW", "20m", "CW", "20230101", "1200");
    let options = MatchOptions::default();
    assert!(!matches(
        &a,
        &qso("K1ABC", "20m", "CW", "20230101", "1200"),
        &options
    ));
    assert!(!matches(
        &a,
        &qso("W1AW", "40m", "CW", "20230101", "1200"),
        &options
    ));
}

#[test]
fn missing_key_field_is_conservative_no_match() {
    let a = qso("W1AW", "20m", "CW", "20230101", "1200");
    let mut b = a.clone();
    b.remove("MODE");

    let mut options = MatchOptions::default();
    assert!(!matches(&a, &b, &options));
    assert!(!matches(&b, &a, &options));

    options.match_missing = true;
    assert!(matches(&a, &b, &options));
}

#[test]
fn wider_window_is_configurable() {
    let a = qso("W1AW", "20m", "CW", "20230101", "1200");
    let b = qso("W1AW", "20m", "CW", "20230101", "1300");
    let options = MatchOptions {
        max_delta_seconds: 3600,
        ..MatchOptions::default()
    };
    assert!(matches(&a, &b, &options));
    assert!(!matches(&a, &b, &MatchOptions::default()));
}

#[test]
fn lotw_confirmation_merges_into_master_log() {
    // Scenario: the master log has no LoTW receipt; the LoTW export does.
    let dest = qso("W1AW", "20m", "CW", "20230101", "1200");
    let mut src = qso("W1AW", "20m", "CW", "20230101", "1202");
    src.set("LOTW_QSL_RCVD", "Y");

    let options = MatchOptions::default();
    assert!(matches(&dest, &src, &options));

    let merged = merge(&dest, &src, &MergePolicy::default());
    assert_eq!(merged.get("LOTW_QSL_RCVD"), Some("Y"));
    // Bookkeeping keeps dest's values on a tie.
    assert_eq!(merged.get("TIME_ON"), Some("1200"));
}

#[test]
fn merge_is_idempotent_under_default_policy() {
    let mut dest = qso("W1AW", "20m", "CW", "20230101", "1200");
    dest.set("COMMENT", "first pass");
    let mut src = qso("W1AW", "", "CW", "20230101", "1202");
    src.set("LOTW_QSL_RCVD", "Y");
    src.set("NAME", "Hiram");

    let policy = MergePolicy::default();
    let once = merge(&dest, &src, &policy);
    let twice = merge(&once, &src, &policy);
    assert_eq!(once, twice);
}

#[test]
fn merge_never_deletes_dest_fields_by_default() {
    let mut dest = qso("W1AW", "20m", "CW", "20230101", "1200");
    dest.set("RST_SENT", "599");
    let src = qso("W1AW", "20m", "CW", "20230101", "1200");

    let merged = merge(&dest, &src, &MergePolicy::default());
    assert_eq!(merged.get("RST_SENT"), Some("599"));
    assert_eq!(merged.len(), dest.len());
}

#[test]
fn always_dest_ignores_src_entirely() {
    let policy = MergePolicy {
        rules: vec![("NOTES".to_string(), MergeRule::AlwaysDest)],
        default_rule: MergeRule::PreferNonempty,
        allow_clear: false,
    };
    let dest: Record = [("CALL", "W1AW")].into_iter().collect();
    let src: Record = [("CALL", "W1AW"), ("NOTES", "from src")]
        .into_iter()
        .collect();

    let merged = merge(&dest, &src, &policy);
    assert!(!merged.has("NOTES"));
}

#[test]
fn merged_field_order_is_dest_then_src() {
    let dest: Record = [("CALL", "W1AW"), ("BAND", "20m")].into_iter().collect();
    let src: Record = [("NAME", "Hiram"), ("CALL", "W1AW")].into_iter().collect();

    let merged = merge(&dest, &src, &MergePolicy::default());
    assert_eq!(
        merged.names().collect::<Vec<_>>(),
        ["CALL", "BAND", "NAME"]
    );
}
