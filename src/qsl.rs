//! Reduction of per-provider confirmation fields to one normalized QSL
//! status.
//!
//! Each confirmation service speaks its own vocabulary; a small lookup
//! table per provider maps raw values into the shared [`QslStatus`]
//! ordering, and [`resolve`] folds the per-provider results with `max`.
//! Always recomputed from the record's current fields, never cached.

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Normalized confirmation status, ordered by affirmativeness: a later
/// variant outranks an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QslStatus {
    /// No provider field present at all.
    Unknown,
    /// The operator chose to ignore confirmation for this contact.
    Ignored,
    /// A provider is engaged but no receipt has been reported.
    NotConfirmed,
    /// A confirmation was requested and is pending.
    Requested,
    /// At least one provider reports the contact confirmed.
    Confirmed,
}

/// A confirmation source inspected by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// The generic per-QSO card fields (`QSL_RCVD`, `QSLRDATE`).
    Direct,
    /// ARRL Logbook of the World.
    Lotw,
    /// eQSL.cc.
    Eqsl,
    /// Club Log.
    ClubLog,
    /// QRZ.com logbook.
    Qrz,
}

/// Default provider order: the direct per-QSO flag first, then the online
/// services.
pub const DEFAULT_PROVIDERS: &[Provider] = &[
    Provider::Direct,
    Provider::Lotw,
    Provider::Eqsl,
    Provider::ClubLog,
    Provider::Qrz,
];

/// ADIF received-flag vocabulary shared by the direct, LoTW, and eQSL
/// fields.
const RCVD_FLAG_MAP: &[(&str, QslStatus)] = &[
    ("Y", QslStatus::Confirmed),
    ("V", QslStatus::Confirmed),
    ("R", QslStatus::Requested),
    ("N", QslStatus::NotConfirmed),
    ("I", QslStatus::Ignored),
];

/// Upload-status vocabulary: an acknowledged upload is not a receipt.
const UPLOAD_FLAG_MAP: &[(&str, QslStatus)] = &[
    ("Y", QslStatus::NotConfirmed),
    ("N", QslStatus::NotConfirmed),
    ("M", QslStatus::NotConfirmed),
];

/// Club Log's aggregator flag.
const CLUBLOG_FLAG_MAP: &[(&str, QslStatus)] = &[
    ("Y", QslStatus::Confirmed),
    ("V", QslStatus::Confirmed),
];

/// QRZ logbook status field.
const QRZ_STATUS_MAP: &[(&str, QslStatus)] = &[("C", QslStatus::Confirmed)];

/// Computes the normalized status using [`DEFAULT_PROVIDERS`].
pub fn resolve(record: &Record) -> QslStatus {
    resolve_with(record, DEFAULT_PROVIDERS)
}

/// Computes the normalized status over an explicit provider set, taking
/// the most affirmative status any of them reports. Returns
/// [`QslStatus::Unknown`] when no provider field is present.
pub fn resolve_with(record: &Record, providers: &[Provider]) -> QslStatus {
    providers
        .iter()
        .filter_map(|provider| provider_status(record, *provider))
        .max()
        .unwrap_or(QslStatus::Unknown)
}

/// True when any provider reports the contact confirmed.
pub fn qsl_received(record: &Record) -> bool {
    resolve(record) == QslStatus::Confirmed
}

/// One provider's view of the record, or `None` when none of its fields
/// are present.
pub fn provider_status(record: &Record, provider: Provider) -> Option<QslStatus> {
    match provider {
        Provider::Direct => reduce([
            flag(record, "QSL_RCVD", RCVD_FLAG_MAP),
            date_confirms(record, "QSLRDATE"),
        ]),
        Provider::Lotw => reduce([
            flag(record, "LOTW_QSL_RCVD", RCVD_FLAG_MAP),
            date_confirms(record, "LOTW_QSLRDATE"),
            date_confirms(record, "APP_LOTW_RXQSL"),
            date_confirms(record, "APP_LOTW_2XQSL"),
            date_confirms(record, "APP_LOTW_QSLMODE"),
        ]),
        Provider::Eqsl => reduce([
            flag(record, "EQSL_QSL_RCVD", RCVD_FLAG_MAP),
            date_confirms(record, "EQSL_QSLRDATE"),
        ]),
        Provider::ClubLog => reduce([
            flag(record, "APP_MASTERLOG_CLUBLOG_QSL", CLUBLOG_FLAG_MAP),
            date_confirms(record, "APP_MASTERLOG_CLUBLOG_QSLRDATE"),
            flag(record, "CLUBLOG_QSO_UPLOAD_STATUS", UPLOAD_FLAG_MAP),
        ]),
        Provider::Qrz => reduce([
            flag(record, "APP_QRZLOG_STATUS", QRZ_STATUS_MAP),
            flag(record, "QRZCOM_QSO_UPLOAD_STATUS", UPLOAD_FLAG_MAP),
        ]),
    }
}

fn reduce<const N: usize>(statuses: [Option<QslStatus>; N]) -> Option<QslStatus> {
    statuses.into_iter().flatten().max()
}

/// Looks the field's raw value up in a provider table; unknown raw values
/// carry no information.
fn flag(record: &Record, name: &str, table: &[(&str, QslStatus)]) -> Option<QslStatus> {
    let raw = record.get(name)?.trim().to_ascii_uppercase();
    table
        .iter()
        .find(|(key, _)| *key == raw)
        .map(|(_, status)| *status)
}

/// A non-empty received-date field counts as a confirmation.
fn date_confirms(record: &Record, name: &str) -> Option<QslStatus> {
    record
        .get(name)
        .filter(|value| !value.trim().is_empty())
        .map(|_| QslStatus::Confirmed)
}
