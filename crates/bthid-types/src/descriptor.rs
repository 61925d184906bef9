//! Composite report descriptor and its self-check.
//!
//! The descriptor advertised in the SDP record is the concatenation of each
//! registered class's fragment, in registration order. Before it is handed
//! out, every fragment is parsed just far enough to confirm that it declares
//! the report ID its class uses and an input payload of exactly the length
//! its reports carry.

use std::collections::HashMap;

use crate::device::DeviceClass;
use crate::error::TypesError;
use crate::report::{REPORT_HEADER, REPORT_HEADER_LEN};

const ITEM_INPUT: u8 = 0x80;
const ITEM_REPORT_SIZE: u8 = 0x74;
const ITEM_REPORT_ID: u8 = 0x84;
const ITEM_REPORT_COUNT: u8 = 0x94;
const ITEM_LONG: u8 = 0xFE;

/// What a descriptor fragment declares about its input report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FragmentInfo {
    pub report_id: Option<u8>,
    /// Total size of all Input items, in bits.
    pub input_bits: u32,
}

impl FragmentInfo {
    /// Whole input bytes, or `None` if the bit count is not byte-aligned.
    #[must_use]
    pub fn input_bytes(&self) -> Option<usize> {
        (self.input_bits % 8 == 0).then(|| (self.input_bits / 8) as usize)
    }
}

/// Walk the short items of a descriptor fragment, tracking the global Report
/// Size and Report Count and summing every Input item.
///
/// Only a single report ID per fragment is supported.
pub fn parse_fragment(bytes: &[u8]) -> Result<FragmentInfo, TypesError> {
    let mut info = FragmentInfo::default();
    let mut report_size: u32 = 0;
    let mut report_count: u32 = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        let prefix = bytes[pos];

        if prefix == ITEM_LONG {
            let len = *bytes.get(pos + 1).ok_or_else(|| {
                TypesError::MalformedDescriptor(format!("truncated long item at offset {pos}"))
            })? as usize;
            pos += 3 + len;
            continue;
        }

        let size = match prefix & 0x03 {
            3 => 4,
            n => n as usize,
        };
        let data = bytes.get(pos + 1..pos + 1 + size).ok_or_else(|| {
            TypesError::MalformedDescriptor(format!(
                "item {prefix:#04x} at offset {pos} runs past the end"
            ))
        })?;
        let value = data
            .iter()
            .rev()
            .fold(0u32, |acc, b| (acc << 8) | u32::from(*b));

        match prefix & 0xFC {
            ITEM_REPORT_SIZE => report_size = value,
            ITEM_REPORT_COUNT => report_count = value,
            ITEM_REPORT_ID => {
                let id = u8::try_from(value).map_err(|_| {
                    TypesError::MalformedDescriptor(format!("report id {value} out of range"))
                })?;
                if info.report_id.is_some_and(|prev| prev != id) {
                    return Err(TypesError::MalformedDescriptor(format!(
                        "fragment declares more than one report id ({id:#04x})"
                    )));
                }
                info.report_id = Some(id);
            }
            ITEM_INPUT => info.input_bits += report_size * report_count,
            _ => {}
        }

        pos += 1 + size;
    }

    if pos > bytes.len() {
        return Err(TypesError::MalformedDescriptor(
            "long item runs past the end".to_string(),
        ));
    }

    Ok(info)
}

/// The ordered set of device classes the peripheral advertises.
///
/// Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorRegistry {
    classes: Vec<DeviceClass>,
    by_report_id: HashMap<u8, DeviceClass>,
}

impl DescriptorRegistry {
    /// Build a registry from an ordered list of classes.
    ///
    /// Fails if the list is empty, a report ID is claimed twice, or a
    /// fragment disagrees with its class about report ID or payload length.
    pub fn new(classes: Vec<DeviceClass>) -> Result<Self, TypesError> {
        if classes.is_empty() {
            return Err(TypesError::EmptyRegistry);
        }

        let mut by_report_id = HashMap::new();
        for &class in &classes {
            if let Some(&first) = by_report_id.get(&class.report_id()) {
                return Err(TypesError::DuplicateReportId {
                    report_id: class.report_id(),
                    first,
                    second: class,
                });
            }
            check_fragment(class)?;
            by_report_id.insert(class.report_id(), class);
        }

        Ok(Self {
            classes,
            by_report_id,
        })
    }

    pub fn classes(&self) -> &[DeviceClass] {
        &self.classes
    }

    /// Concatenation of every fragment in registration order.
    pub fn composite_descriptor(&self) -> Vec<u8> {
        self.classes
            .iter()
            .flat_map(|class| class.descriptor().iter().copied())
            .collect()
    }

    /// The composite descriptor as uppercase hex, as embedded in the SDP
    /// record.
    pub fn descriptor_hex(&self) -> String {
        hex::encode_upper(self.composite_descriptor())
    }

    pub fn class_for_report_id(&self, report_id: u8) -> Option<DeviceClass> {
        self.by_report_id.get(&report_id).copied()
    }

    /// Check that a raw report carries the input header, a registered report
    /// ID, and the exact length that class declares.
    pub fn validate(&self, report: &[u8]) -> Result<DeviceClass, TypesError> {
        if report.len() < REPORT_HEADER_LEN {
            return Err(TypesError::ReportTooShort(report.len()));
        }
        if report[0] != REPORT_HEADER {
            return Err(TypesError::BadReportHeader(report[0]));
        }
        let class = self
            .class_for_report_id(report[1])
            .ok_or(TypesError::UnknownReportId(report[1]))?;
        if report.len() != class.report_len() {
            return Err(TypesError::ReportLength {
                class,
                expected: class.report_len(),
                actual: report.len(),
            });
        }
        Ok(class)
    }
}

impl Default for DescriptorRegistry {
    /// Keyboard, mouse, touch.
    fn default() -> Self {
        let classes = DeviceClass::ALL.to_vec();
        let by_report_id = classes.iter().map(|c| (c.report_id(), *c)).collect();
        Self {
            classes,
            by_report_id,
        }
    }
}

fn check_fragment(class: DeviceClass) -> Result<(), TypesError> {
    let info = parse_fragment(class.descriptor())?;

    if info.report_id != Some(class.report_id()) {
        return Err(TypesError::ReportIdMismatch {
            class,
            declared: info.report_id,
            expected: class.report_id(),
        });
    }

    let declared = info.input_bytes().ok_or_else(|| {
        TypesError::MalformedDescriptor(format!(
            "{class} input is {} bits, not a whole number of bytes",
            info.input_bits
        ))
    })?;
    if declared != class.payload_len() {
        return Err(TypesError::PayloadMismatch {
            class,
            declared,
            actual: class.payload_len(),
        });
    }

    Ok(())
}
