//! Relative pointer (mouse) device class.

use crate::device::DeviceClass;
use crate::report::HidReport;
use crate::scale::scale_signed;

pub const MOUSE_REPORT_ID: u8 = 0x02;

/// Buttons byte, x, y, wheel, two reserved bytes.
pub const MOUSE_PAYLOAD_LEN: usize = 6;

/// Relative pointer with three button usages (two reported), x/y/wheel axes
/// in -127..=127, and two bytes of constant padding.
#[rustfmt::skip]
pub const MOUSE_DESCRIPTOR: &[u8] = &[
    0x05, 0x01,            // Usage Page (Generic Desktop Ctrls)
    0x09, 0x02,            // Usage (Mouse)
    0xA1, 0x01,            // Collection (Application)
    0x85, MOUSE_REPORT_ID, //   Report ID
    0x09, 0x01,            //   Usage (Pointer)
    0xA1, 0x00,            //   Collection (Physical)
    0x05, 0x09,            //     Usage Page (Button)
    0x19, 0x01,            //     Usage Minimum (0x01)
    0x29, 0x03,            //     Usage Maximum (0x03)
    0x15, 0x00,            //     Logical Minimum (0)
    0x25, 0x01,            //     Logical Maximum (1)
    0x75, 0x01,            //     Report Size (1)
    0x95, 0x03,            //     Report Count (3)
    0x81, 0x02,            //     Input (Data,Var,Abs)
    0x75, 0x05,            //     Report Size (5)
    0x95, 0x01,            //     Report Count (1)
    0x81, 0x01,            //     Input (Const,Array,Abs)
    0x05, 0x01,            //     Usage Page (Generic Desktop Ctrls)
    0x09, 0x30,            //     Usage (X)
    0x09, 0x31,            //     Usage (Y)
    0x09, 0x38,            //     Usage (Wheel)
    0x15, 0x81,            //     Logical Minimum (-127)
    0x25, 0x7F,            //     Logical Maximum (127)
    0x75, 0x08,            //     Report Size (8)
    0x95, 0x03,            //     Report Count (3)
    0x81, 0x06,            //     Input (Data,Var,Rel)
    0x75, 0x08,            //     Report Size (8)
    0x95, 0x02,            //     Report Count (2)
    0x81, 0x01,            //     Input (Const,Array,Abs)
    0xC0,                  //   End Collection
    0xC0,                  // End Collection
];

/// Relative mouse movement.
///
/// Axes are normalised to `[-1.0, 1.0]` and scaled to one signed byte each.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MouseReport {
    pub left_button: bool,
    pub right_button: bool,
    pub rel_x: f64,
    pub rel_y: f64,
    pub wheel: f64,
}

impl MouseReport {
    /// A movement-only report.
    #[must_use]
    pub fn movement(rel_x: f64, rel_y: f64) -> Self {
        Self {
            rel_x,
            rel_y,
            ..Self::default()
        }
    }

    /// Button bits: left in bit 0, right in bit 1.
    #[must_use]
    pub fn buttons(&self) -> u8 {
        u8::from(self.left_button) | (u8::from(self.right_button) << 1)
    }
}

impl HidReport for MouseReport {
    fn device_class(&self) -> DeviceClass {
        DeviceClass::Mouse
    }

    fn payload(&self) -> Vec<u8> {
        let [x] = scale_signed::<1>(self.rel_x);
        let [y] = scale_signed::<1>(self.rel_y);
        let [wheel] = scale_signed::<1>(self.wheel);
        vec![self.buttons(), x, y, wheel, 0x00, 0x00]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_bits() {
        let mut report = MouseReport::default();
        assert_eq!(report.buttons(), 0b00);
        report.left_button = true;
        assert_eq!(report.buttons(), 0b01);
        report.right_button = true;
        assert_eq!(report.buttons(), 0b11);
        report.left_button = false;
        assert_eq!(report.buttons(), 0b10);
    }

    #[test]
    fn axis_extremes() {
        let report = MouseReport {
            rel_x: -1.0,
            rel_y: 1.0,
            wheel: 0.0,
            ..MouseReport::default()
        };
        assert_eq!(
            report.encode(),
            vec![0xA1, 0x02, 0x00, 0x81, 0x7F, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn payload_length_is_fixed() {
        for value in [-1.0, -0.3, 0.0, 0.7, 1.0] {
            let report = MouseReport {
                left_button: true,
                right_button: true,
                rel_x: value,
                rel_y: -value,
                wheel: value,
            };
            assert_eq!(report.payload().len(), MOUSE_PAYLOAD_LEN);
        }
    }
}
