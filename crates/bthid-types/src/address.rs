//! Bluetooth device address type.

use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// A 48-bit Bluetooth device address (BD_ADDR), most significant octet first.
///
/// Displays and parses in the usual colon-separated form, e.g.
/// `00:1A:7D:DA:71:13`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BdAddr(pub [u8; 6]);

impl BdAddr {
    #[must_use]
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    #[must_use]
    pub const fn octets(self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for BdAddr {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in &mut octets {
            let part = parts
                .next()
                .filter(|p| p.len() == 2 && p.bytes().all(|b| b.is_ascii_hexdigit()))
                .ok_or_else(|| TypesError::InvalidAddress(s.to_string()))?;
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| TypesError::InvalidAddress(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(TypesError::InvalidAddress(s.to_string()));
        }
        Ok(Self(octets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_uppercase_colon_separated() {
        let addr = BdAddr::new([0x00, 0x1a, 0x7d, 0xda, 0x71, 0x13]);
        assert_eq!(addr.to_string(), "00:1A:7D:DA:71:13");
    }

    #[test]
    fn parse_accepts_either_case() {
        let upper: BdAddr = "B8:27:EB:01:02:0A".parse().unwrap();
        let lower: BdAddr = "b8:27:eb:01:02:0a".parse().unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.octets(), [0xb8, 0x27, 0xeb, 0x01, 0x02, 0x0a]);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!("B8:27:EB:01:02".parse::<BdAddr>().is_err());
        assert!("B8:27:EB:01:02:0A:FF".parse::<BdAddr>().is_err());
        assert!("B8-27-EB-01-02-0A".parse::<BdAddr>().is_err());
        assert!("B8:27:EB:01:02:ZZ".parse::<BdAddr>().is_err());
        assert!("B8:27:EB:01:2:0A".parse::<BdAddr>().is_err());
    }

    #[test]
    fn parse_rejects_signed_octets() {
        assert!("B8:27:EB:01:02:+1".parse::<BdAddr>().is_err());
        assert!("+1:27:EB:01:02:0A".parse::<BdAddr>().is_err());
        assert!("B8:27:EB:-0:02:0A".parse::<BdAddr>().is_err());
    }
}
