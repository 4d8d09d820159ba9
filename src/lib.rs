//! Parsing, streaming iteration, reconciliation, and QSL-status reduction
//! for ADIF amateur-radio contact logs.
//!
//! # Examples
//!
//! Parse one record:
//! ```
//! use adiflog::record::Record;
//!
//! let text = "<CALL:4>W1AW<BAND:3>20m<MODE:2>CW<QSO_DATE:8>20230101<TIME_ON:4>1200<EOR>";
//! let (record, _) = Record::parse(text, 0).expect("parse");
//! assert_eq!(record.get("call"), Some("W1AW"));
//! assert_eq!(record.get("BAND"), Some("20m"));
//! ```
//!
//! Stream a log and resolve confirmation status:
//! ```
//! use std::io::Cursor;
//!
//! use adiflog::{qsl, reader::AdifReader};
//!
//! let data = "Exported by masterlog\n<ADIF_VER:5>3.1.4<EOH>\n\
//!     <CALL:4>W1AW<BAND:3>20m<MODE:2>CW<LOTW_QSL_RCVD:1>Y<EOR>\n";
//! let mut reader = AdifReader::new(Cursor::new(data));
//! let records: Vec<_> = reader
//!     .by_ref()
//!     .collect::<Result<_, _>>()
//!     .expect("well-formed log");
//! assert_eq!(records.len(), 1);
//! assert!(reader.header().is_some());
//! assert_eq!(qsl::resolve(&records[0]), qsl::QslStatus::Confirmed);
//! ```
#![deny(missing_docs)]

/// Tagged-field codec for `<NAME:LEN[:TYPE]>value` tokens.
pub mod codec;
/// Record matching and policy-driven merging across logs.
pub mod merge;
/// QSL confirmation status normalization.
pub mod qsl;
/// Streaming record reader over a buffered text stream.
pub mod reader;
/// Ordered, case-insensitive record model.
pub mod record;
/// Shared band, timestamp, and callsign helpers.
pub mod types;
