//! Wire protocol between report producers and the bthid daemon.
//!
//! Producers connect over TCP and write one HID report per line, hex-encoded
//! and newline-terminated. [`ReportCodec`] frames that stream in both
//! directions; [`ReportSender`] is a small producer built on it.

pub mod client;
pub mod codec;
pub mod error;

pub use client::ReportSender;
pub use codec::{decode_frame, encode_frame, ReportCodec, MAX_FRAME_LENGTH};
pub use error::ProtocolError;
