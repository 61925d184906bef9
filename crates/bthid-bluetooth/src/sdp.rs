//! HID service record.

/// Placeholder the composite descriptor hex is substituted into.
pub const REPORT_DESC_PLACEHOLDER: &str = "$REPORT_DESC";

const TEMPLATE: &str = include_str!("sdp_record.xml");

/// Build the SDP record XML for a composite report descriptor given as
/// uppercase hex.
pub fn service_record(descriptor_hex: &str) -> String {
    TEMPLATE.replace(REPORT_DESC_PLACEHOLDER, descriptor_hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bthid_types::DescriptorRegistry;

    #[test]
    fn descriptor_is_substituted_once() {
        let hex = DescriptorRegistry::default().descriptor_hex();
        let record = service_record(&hex);
        assert!(!record.contains(REPORT_DESC_PLACEHOLDER));
        assert_eq!(record.matches(hex.as_str()).count(), 1);
        assert!(record.contains(&format!(r#"<text encoding="hex" value="{hex}" />"#)));
    }

    #[test]
    fn advertises_both_hid_channels() {
        let record = service_record("00");
        assert!(record.contains(r#"<uint16 value="0x0011" />"#));
        assert!(record.contains(r#"<uint16 value="0x0013" />"#));
        assert!(record.contains(r#"<uuid value="0x1124" />"#));
    }
}
