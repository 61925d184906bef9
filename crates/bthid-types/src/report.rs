//! The report abstraction shared by every device class.

use crate::device::DeviceClass;
use crate::keyboard::KeyboardReport;
use crate::mouse::MouseReport;
use crate::touch::TouchReport;

/// Bluetooth HID transaction header for an input report on the interrupt
/// channel: `DATA` (0xA) with report type `Input` (0x1).
pub const REPORT_HEADER: u8 = 0xA1;

/// Header length: the transaction byte plus the report ID.
pub const REPORT_HEADER_LEN: usize = 2;

/// A message that encodes to one HID input report.
pub trait HidReport {
    /// The class whose descriptor fragment describes this report.
    fn device_class(&self) -> DeviceClass;

    /// The fixed-width payload that follows the header.
    fn payload(&self) -> Vec<u8>;

    fn report_id(&self) -> u8 {
        self.device_class().report_id()
    }

    /// The raw report as sent over the interrupt channel:
    /// `[0xA1, report_id, payload...]`.
    fn encode(&self) -> Vec<u8> {
        let payload = self.payload();
        debug_assert_eq!(payload.len(), self.device_class().payload_len());
        let mut report = Vec::with_capacity(REPORT_HEADER_LEN + payload.len());
        report.push(REPORT_HEADER);
        report.push(self.report_id());
        report.extend_from_slice(&payload);
        report
    }
}

/// Any report the peripheral can emit.
#[derive(Debug, Clone, PartialEq)]
pub enum HidMessage {
    Keyboard(KeyboardReport),
    Mouse(MouseReport),
    Touch(TouchReport),
}

impl HidReport for HidMessage {
    fn device_class(&self) -> DeviceClass {
        match self {
            Self::Keyboard(r) => r.device_class(),
            Self::Mouse(r) => r.device_class(),
            Self::Touch(r) => r.device_class(),
        }
    }

    fn payload(&self) -> Vec<u8> {
        match self {
            Self::Keyboard(r) => r.payload(),
            Self::Mouse(r) => r.payload(),
            Self::Touch(r) => r.payload(),
        }
    }
}

impl From<KeyboardReport> for HidMessage {
    fn from(report: KeyboardReport) -> Self {
        Self::Keyboard(report)
    }
}

impl From<MouseReport> for HidMessage {
    fn from(report: MouseReport) -> Self {
        Self::Mouse(report)
    }
}

impl From<TouchReport> for HidMessage {
    fn from(report: TouchReport) -> Self {
        Self::Touch(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::Keycode;

    #[test]
    fn encoded_length_matches_class() {
        let messages: Vec<HidMessage> = vec![
            KeyboardReport::default().into(),
            MouseReport::default().into(),
            TouchReport::default().into(),
        ];
        for msg in messages {
            let report = msg.encode();
            assert_eq!(report.len(), msg.device_class().report_len());
            assert_eq!(report[0], REPORT_HEADER);
            assert_eq!(report[1], msg.device_class().report_id());
        }
    }

    #[test]
    fn enum_delegates_to_inner_report() {
        let inner = KeyboardReport::press(Keycode::A);
        let msg = HidMessage::from(inner);
        assert_eq!(msg.encode(), inner.encode());
    }
}
