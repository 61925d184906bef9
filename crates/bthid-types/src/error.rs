//! Errors raised while building descriptors or interpreting reports.

use thiserror::Error;

use crate::device::DeviceClass;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid bluetooth address: {0}")]
    InvalidAddress(String),

    #[error("unknown device class: {0}")]
    UnknownDeviceClass(String),

    #[error("no device classes registered")]
    EmptyRegistry,

    #[error("report id {report_id:#04x} claimed by both {first} and {second}")]
    DuplicateReportId {
        report_id: u8,
        first: DeviceClass,
        second: DeviceClass,
    },

    #[error("{class} descriptor declares {declared} payload bytes but reports carry {actual}")]
    PayloadMismatch {
        class: DeviceClass,
        declared: usize,
        actual: usize,
    },

    #[error("{class} descriptor declares report id {declared:?}, expected {expected:#04x}")]
    ReportIdMismatch {
        class: DeviceClass,
        declared: Option<u8>,
        expected: u8,
    },

    #[error("malformed report descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("report too short: {0} bytes")]
    ReportTooShort(usize),

    #[error("report header {0:#04x} is not a DATA input header")]
    BadReportHeader(u8),

    #[error("report id {0:#04x} is not registered")]
    UnknownReportId(u8),

    #[error("{class} report must be {expected} bytes, got {actual}")]
    ReportLength {
        class: DeviceClass,
        expected: usize,
        actual: usize,
    },
}
