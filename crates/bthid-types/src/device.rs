//! Device classes advertised by the emulated peripheral.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypesError;
use crate::{keyboard, mouse, touch};

/// A HID capability the peripheral can expose.
///
/// Each class owns a constant report ID, a static report-descriptor fragment,
/// and a fixed payload length. The set is closed; which classes are
/// advertised, and in what order, is decided once by a
/// [`DescriptorRegistry`](crate::DescriptorRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Keyboard,
    Mouse,
    Touch,
}

impl DeviceClass {
    /// Every device class, in the default advertisement order.
    pub const ALL: [Self; 3] = [Self::Keyboard, Self::Mouse, Self::Touch];

    /// The report ID this class's reports carry after the `0xA1` header.
    #[must_use]
    pub const fn report_id(self) -> u8 {
        match self {
            Self::Keyboard => keyboard::KEYBOARD_REPORT_ID,
            Self::Mouse => mouse::MOUSE_REPORT_ID,
            Self::Touch => touch::TOUCH_REPORT_ID,
        }
    }

    /// The report-descriptor fragment for this class.
    #[must_use]
    pub const fn descriptor(self) -> &'static [u8] {
        match self {
            Self::Keyboard => keyboard::KEYBOARD_DESCRIPTOR,
            Self::Mouse => mouse::MOUSE_DESCRIPTOR,
            Self::Touch => touch::TOUCH_DESCRIPTOR,
        }
    }

    /// Payload length in bytes, excluding the two-byte header.
    #[must_use]
    pub const fn payload_len(self) -> usize {
        match self {
            Self::Keyboard => keyboard::KEYBOARD_PAYLOAD_LEN,
            Self::Mouse => mouse::MOUSE_PAYLOAD_LEN,
            Self::Touch => touch::TOUCH_PAYLOAD_LEN,
        }
    }

    /// Full report length on the wire, header included.
    #[must_use]
    pub const fn report_len(self) -> usize {
        crate::report::REPORT_HEADER_LEN + self.payload_len()
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Keyboard => "keyboard",
            Self::Mouse => "mouse",
            Self::Touch => "touch",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceClass {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|class| class.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| TypesError::UnknownDeviceClass(s.to_string()))
    }
}
