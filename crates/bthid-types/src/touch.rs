//! Single-contact digitizer (absolute pointer) device class.

use crate::device::DeviceClass;
use crate::report::HidReport;
use crate::scale::scale_absolute;

pub const TOUCH_REPORT_ID: u8 = 0x03;

/// Status byte, x, y.
pub const TOUCH_PAYLOAD_LEN: usize = 5;

/// Logical and physical maximum of both axes.
pub const TOUCH_MAX: i16 = 10_000;

const TOUCH_MAX_LE: [u8; 2] = TOUCH_MAX.to_le_bytes();

/// Tip-switch bit of the status byte.
pub const TOUCH_TIP_SWITCH: u8 = 1 << 0;

/// In-range bit of the status byte.
pub const TOUCH_IN_RANGE: u8 = 1 << 1;

#[rustfmt::skip]
pub const TOUCH_DESCRIPTOR: &[u8] = &[
    0x05, 0x0D,                             // Usage Page (Digitizer)
    0x09, 0x02,                             // Usage (Pen)
    0xA1, 0x01,                             // Collection (Application)
    0x85, TOUCH_REPORT_ID,                  //   Report ID
    0x09, 0x20,                             //   Usage (Stylus)
    0xA1, 0x00,                             //   Collection (Physical)
    0x09, 0x42,                             //     Usage (Tip Switch)
    0x09, 0x32,                             //     Usage (In Range)
    0x15, 0x00,                             //     Logical Minimum (0)
    0x25, 0x01,                             //     Logical Maximum (1)
    0x75, 0x01,                             //     Report Size (1)
    0x95, 0x02,                             //     Report Count (2)
    0x81, 0x02,                             //     Input (Data,Var,Abs)
    0x75, 0x01,                             //     Report Size (1)
    0x95, 0x06,                             //     Report Count (6)
    0x81, 0x01,                             //     Input (Const,Array,Abs)
    0x05, 0x01,                             //     Usage Page (Generic Desktop)
    0x09, 0x01,                             //     Usage (Pointer)
    0xA1, 0x00,                             //     Collection (Physical)
    0x09, 0x30,                             //       Usage (X)
    0x09, 0x31,                             //       Usage (Y)
    0x16, 0x00, 0x00,                       //       Logical Minimum (0)
    0x26, TOUCH_MAX_LE[0], TOUCH_MAX_LE[1], //       Logical Maximum (TOUCH_MAX)
    0x36, 0x00, 0x00,                       //       Physical Minimum (0)
    0x46, TOUCH_MAX_LE[0], TOUCH_MAX_LE[1], //       Physical Maximum (TOUCH_MAX)
    0x66, 0x00, 0x00,                       //       Unit (None)
    0x75, 0x10,                             //       Report Size (16)
    0x95, 0x02,                             //       Report Count (2)
    0x81, 0x02,                             //       Input (Data,Var,Abs)
    0xC0,                                   //     End Collection
    0xC0,                                   //   End Collection
    0xC0,                                   // End Collection
];

/// Absolute pointer position.
///
/// `abs_x`/`abs_y` are fractions of the surface in `[0.0, 1.0]`; negative
/// values are encoded as-is but fall outside the declared logical range.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TouchReport {
    /// Status bits, see [`TOUCH_TIP_SWITCH`] and [`TOUCH_IN_RANGE`].
    pub status: u8,
    pub abs_x: f64,
    pub abs_y: f64,
}

impl TouchReport {
    /// Hover (in range, not touching) at the given position.
    #[must_use]
    pub fn hover(abs_x: f64, abs_y: f64) -> Self {
        Self {
            status: TOUCH_IN_RANGE,
            abs_x,
            abs_y,
        }
    }

    /// Contact at the given position.
    #[must_use]
    pub fn contact(abs_x: f64, abs_y: f64) -> Self {
        Self {
            status: TOUCH_IN_RANGE | TOUCH_TIP_SWITCH,
            abs_x,
            abs_y,
        }
    }
}

impl HidReport for TouchReport {
    fn device_class(&self) -> DeviceClass {
        DeviceClass::Touch
    }

    fn payload(&self) -> Vec<u8> {
        let [x_lo, x_hi] = scale_absolute(self.abs_x, TOUCH_MAX);
        let [y_lo, y_hi] = scale_absolute(self.abs_y, TOUCH_MAX);
        vec![self.status, x_lo, x_hi, y_lo, y_hi]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_embeds_little_endian_maximum() {
        let pos = TOUCH_DESCRIPTOR
            .windows(3)
            .position(|w| w == [0x26, 0x10, 0x27])
            .expect("logical maximum item");
        assert!(pos > 0);
    }

    #[test]
    fn full_scale_corner() {
        let report = TouchReport::contact(1.0, 1.0);
        assert_eq!(
            report.encode(),
            vec![0xA1, 0x03, 0x03, 0x10, 0x27, 0x10, 0x27]
        );
    }

    #[test]
    fn hover_at_center() {
        let report = TouchReport::hover(0.5, 0.5);
        assert_eq!(report.payload(), vec![0x02, 0x88, 0x13, 0x88, 0x13]);
    }
}
