//! Shared types for bthid.
//!
//! Device classes and their report descriptors, the HID input reports each
//! class emits, the composite descriptor registry, and Bluetooth addresses.

pub mod address;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod keyboard;
pub mod mouse;
pub mod report;
pub mod scale;
pub mod touch;

pub use address::BdAddr;
pub use descriptor::{parse_fragment, DescriptorRegistry, FragmentInfo};
pub use device::DeviceClass;
pub use error::TypesError;
pub use keyboard::{KeyboardReport, Keycode, Modifiers};
pub use mouse::MouseReport;
pub use report::{HidMessage, HidReport, REPORT_HEADER, REPORT_HEADER_LEN};
pub use touch::TouchReport;
