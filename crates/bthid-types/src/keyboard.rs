//! Keyboard device class: report descriptor, usage codes, and reports.

use bitflags::bitflags;

use crate::device::DeviceClass;
use crate::report::HidReport;

pub const KEYBOARD_REPORT_ID: u8 = 0x01;

/// Modifier byte, reserved byte, six keycode slots.
pub const KEYBOARD_PAYLOAD_LEN: usize = 8;

/// Number of simultaneously pressed non-modifier keys a report can carry.
pub const MAX_KEYS: usize = 6;

/// Generic keyboard: 8 modifier bits, one constant byte, six 8-bit key slots.
#[rustfmt::skip]
pub const KEYBOARD_DESCRIPTOR: &[u8] = &[
    0x05, 0x01,               // Usage Page (Generic Desktop Ctrls)
    0x09, 0x06,               // Usage (Keyboard)
    0xA1, 0x01,               // Collection (Application)
    0x85, KEYBOARD_REPORT_ID, //   Report ID
    0xA1, 0x00,               //   Collection (Physical)
    0x05, 0x07,               //     Usage Page (Kbrd/Keypad)
    0x19, 0xE0,               //     Usage Minimum (0xE0)
    0x29, 0xE7,               //     Usage Maximum (0xE7)
    0x15, 0x00,               //     Logical Minimum (0)
    0x25, 0x01,               //     Logical Maximum (1)
    0x75, 0x01,               //     Report Size (1)
    0x95, 0x08,               //     Report Count (8)
    0x81, 0x02,               //     Input (Data,Var,Abs)
    0x95, 0x01,               //     Report Count (1)
    0x75, 0x08,               //     Report Size (8)
    0x81, 0x01,               //     Input (Const,Array,Abs)
    0x95, 0x06,               //     Report Count (6)
    0x75, 0x08,               //     Report Size (8)
    0x15, 0x00,               //     Logical Minimum (0)
    0x25, 0x65,               //     Logical Maximum (101)
    0x05, 0x07,               //     Usage Page (Kbrd/Keypad)
    0x19, 0x00,               //     Usage Minimum (0x00)
    0x29, 0x65,               //     Usage Maximum (0x65)
    0x81, 0x00,               //     Input (Data,Array,Abs)
    0xC0,                     //   End Collection
    0xC0,                     // End Collection
];

bitflags! {
    /// Modifier keys, one bit each in the first payload byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const LEFT_CTRL = 1 << 0;
        const LEFT_SHIFT = 1 << 1;
        const LEFT_ALT = 1 << 2;
        const LEFT_META = 1 << 3;
        const RIGHT_CTRL = 1 << 4;
        const RIGHT_SHIFT = 1 << 5;
        const RIGHT_ALT = 1 << 6;
        const RIGHT_META = 1 << 7;
    }
}

/// A usage from the Keyboard/Keypad page (HID Usage Tables 1.21, section 10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Keycode(pub u8);

impl Keycode {
    pub const NONE: Self = Self(0x00);
    pub const A: Self = Self(0x04);
    pub const B: Self = Self(0x05);
    pub const C: Self = Self(0x06);
    pub const D: Self = Self(0x07);
    pub const E: Self = Self(0x08);
    pub const F: Self = Self(0x09);
    pub const G: Self = Self(0x0a);
    pub const H: Self = Self(0x0b);
    pub const I: Self = Self(0x0c);
    pub const J: Self = Self(0x0d);
    pub const K: Self = Self(0x0e);
    pub const L: Self = Self(0x0f);
    pub const M: Self = Self(0x10);
    pub const N: Self = Self(0x11);
    pub const O: Self = Self(0x12);
    pub const P: Self = Self(0x13);
    pub const Q: Self = Self(0x14);
    pub const R: Self = Self(0x15);
    pub const S: Self = Self(0x16);
    pub const T: Self = Self(0x17);
    pub const U: Self = Self(0x18);
    pub const V: Self = Self(0x19);
    pub const W: Self = Self(0x1a);
    pub const X: Self = Self(0x1b);
    pub const Y: Self = Self(0x1c);
    pub const Z: Self = Self(0x1d);
    pub const NUMBER_1: Self = Self(0x1e);
    pub const NUMBER_2: Self = Self(0x1f);
    pub const NUMBER_3: Self = Self(0x20);
    pub const NUMBER_4: Self = Self(0x21);
    pub const NUMBER_5: Self = Self(0x22);
    pub const NUMBER_6: Self = Self(0x23);
    pub const NUMBER_7: Self = Self(0x24);
    pub const NUMBER_8: Self = Self(0x25);
    pub const NUMBER_9: Self = Self(0x26);
    pub const NUMBER_0: Self = Self(0x27);
    pub const ENTER: Self = Self(0x28);
    pub const ESCAPE: Self = Self(0x29);
    pub const BACKSPACE: Self = Self(0x2a);
    pub const TAB: Self = Self(0x2b);
    pub const SPACEBAR: Self = Self(0x2c);
    pub const MINUS: Self = Self(0x2d);
    pub const EQUAL_SIGN: Self = Self(0x2e);
    pub const LEFT_BRACKET: Self = Self(0x2f);
    pub const RIGHT_BRACKET: Self = Self(0x30);
    pub const BACKSLASH: Self = Self(0x31);
    pub const HASH: Self = Self(0x32);
    pub const SEMICOLON: Self = Self(0x33);
    pub const SINGLE_QUOTE: Self = Self(0x34);
    pub const ACCENT_GRAVE: Self = Self(0x35);
    pub const COMMA: Self = Self(0x36);
    pub const PERIOD: Self = Self(0x37);
    pub const FORWARD_SLASH: Self = Self(0x38);
    pub const CAPS_LOCK: Self = Self(0x39);
    pub const F1: Self = Self(0x3a);
    pub const F2: Self = Self(0x3b);
    pub const F3: Self = Self(0x3c);
    pub const F4: Self = Self(0x3d);
    pub const F5: Self = Self(0x3e);
    pub const F6: Self = Self(0x3f);
    pub const F7: Self = Self(0x40);
    pub const F8: Self = Self(0x41);
    pub const F9: Self = Self(0x42);
    pub const F10: Self = Self(0x43);
    pub const F11: Self = Self(0x44);
    pub const F12: Self = Self(0x45);
    pub const PRINT_SCREEN: Self = Self(0x46);
    pub const SCROLL_LOCK: Self = Self(0x47);
    pub const PAUSE_BREAK: Self = Self(0x48);
    pub const INSERT: Self = Self(0x49);
    pub const HOME: Self = Self(0x4a);
    pub const PAGE_UP: Self = Self(0x4b);
    pub const DELETE: Self = Self(0x4c);
    pub const END: Self = Self(0x4d);
    pub const PAGE_DOWN: Self = Self(0x4e);
    pub const RIGHT_ARROW: Self = Self(0x4f);
    pub const LEFT_ARROW: Self = Self(0x50);
    pub const DOWN_ARROW: Self = Self(0x51);
    pub const UP_ARROW: Self = Self(0x52);
    // Keypad Num Lock and Clear share a usage.
    pub const NUM_LOCK: Self = Self(0x53);
    pub const CLEAR: Self = Self(0x53);
    pub const NUMPAD_DIVIDE: Self = Self(0x54);
    pub const NUMPAD_MULTIPLY: Self = Self(0x55);
    pub const NUMPAD_MINUS: Self = Self(0x56);
    pub const NUMPAD_PLUS: Self = Self(0x57);
    pub const NUMPAD_ENTER: Self = Self(0x58);
    pub const NUMPAD_1: Self = Self(0x59);
    pub const NUMPAD_2: Self = Self(0x5a);
    pub const NUMPAD_3: Self = Self(0x5b);
    pub const NUMPAD_4: Self = Self(0x5c);
    pub const NUMPAD_5: Self = Self(0x5d);
    pub const NUMPAD_6: Self = Self(0x5e);
    pub const NUMPAD_7: Self = Self(0x5f);
    pub const NUMPAD_8: Self = Self(0x60);
    pub const NUMPAD_9: Self = Self(0x61);
    pub const NUMPAD_0: Self = Self(0x62);
    pub const NUMPAD_DOT: Self = Self(0x63);
    /// Right of left Shift on non-US layouts.
    pub const NON_US_BACKSLASH: Self = Self(0x64);
    pub const CONTEXT_MENU: Self = Self(0x65);
    pub const F13: Self = Self(0x68);
    pub const F14: Self = Self(0x69);
    pub const F15: Self = Self(0x6a);
    pub const F16: Self = Self(0x6b);
    pub const F17: Self = Self(0x6c);
    pub const F18: Self = Self(0x6d);
    pub const F19: Self = Self(0x6e);
    pub const F20: Self = Self(0x6f);
    pub const F21: Self = Self(0x70);
    pub const F22: Self = Self(0x71);
    pub const F23: Self = Self(0x72);
    pub const EXECUTE: Self = Self(0x74);
    pub const HELP: Self = Self(0x75);
    pub const SELECT: Self = Self(0x77);
    pub const INTL_RO: Self = Self(0x87);
    pub const INTL_YEN: Self = Self(0x89);
    pub const HANGEUL: Self = Self(0x90);
    pub const HANJA: Self = Self(0x91);
    pub const LEFT_CTRL: Self = Self(0xe0);
    pub const LEFT_SHIFT: Self = Self(0xe1);
    pub const LEFT_ALT: Self = Self(0xe2);
    pub const LEFT_META: Self = Self(0xe3);
    pub const RIGHT_CTRL: Self = Self(0xe4);
    pub const RIGHT_SHIFT: Self = Self(0xe5);
    pub const RIGHT_ALT: Self = Self(0xe6);
    pub const RIGHT_META: Self = Self(0xe7);
    pub const MEDIA_PLAY_PAUSE: Self = Self(0xe8);
    pub const REFRESH: Self = Self(0xfa);

    /// Map a character to the key (and modifiers) that types it on a US
    /// layout. Returns `None` for characters with no single-key mapping.
    #[must_use]
    pub fn from_char(c: char) -> Option<(Self, Modifiers)> {
        let plain = |key| Some((key, Modifiers::empty()));
        let shifted = |key| Some((key, Modifiers::LEFT_SHIFT));

        match c {
            'a'..='z' => plain(Self(Self::A.0 + (c as u8 - b'a'))),
            'A'..='Z' => shifted(Self(Self::A.0 + (c as u8 - b'A'))),
            '0' => plain(Self::NUMBER_0),
            '1'..='9' => plain(Self(Self::NUMBER_1.0 + (c as u8 - b'1'))),
            ' ' => plain(Self::SPACEBAR),
            '\n' => plain(Self::ENTER),
            '\t' => plain(Self::TAB),
            '-' => plain(Self::MINUS),
            '=' => plain(Self::EQUAL_SIGN),
            '[' => plain(Self::LEFT_BRACKET),
            ']' => plain(Self::RIGHT_BRACKET),
            '\\' => plain(Self::BACKSLASH),
            ';' => plain(Self::SEMICOLON),
            '\'' => plain(Self::SINGLE_QUOTE),
            '`' => plain(Self::ACCENT_GRAVE),
            ',' => plain(Self::COMMA),
            '.' => plain(Self::PERIOD),
            '/' => plain(Self::FORWARD_SLASH),
            '!' => shifted(Self::NUMBER_1),
            '@' => shifted(Self::NUMBER_2),
            '#' => shifted(Self::NUMBER_3),
            '$' => shifted(Self::NUMBER_4),
            '%' => shifted(Self::NUMBER_5),
            '^' => shifted(Self::NUMBER_6),
            '&' => shifted(Self::NUMBER_7),
            '*' => shifted(Self::NUMBER_8),
            '(' => shifted(Self::NUMBER_9),
            ')' => shifted(Self::NUMBER_0),
            '_' => shifted(Self::MINUS),
            '+' => shifted(Self::EQUAL_SIGN),
            '{' => shifted(Self::LEFT_BRACKET),
            '}' => shifted(Self::RIGHT_BRACKET),
            '|' => shifted(Self::BACKSLASH),
            ':' => shifted(Self::SEMICOLON),
            '"' => shifted(Self::SINGLE_QUOTE),
            '~' => shifted(Self::ACCENT_GRAVE),
            '<' => shifted(Self::COMMA),
            '>' => shifted(Self::PERIOD),
            '?' => shifted(Self::FORWARD_SLASH),
            _ => None,
        }
    }
}

/// Keyboard input report: modifier bits plus up to six pressed keys.
///
/// The default value is the "all keys released" report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardReport {
    pub modifiers: Modifiers,
    pub keys: [Keycode; MAX_KEYS],
}

impl KeyboardReport {
    /// A report with a single key held and no modifiers.
    #[must_use]
    pub fn press(key: Keycode) -> Self {
        Self::default().with_key(key)
    }

    /// Put `key` in the first free slot. A full report is returned unchanged.
    #[must_use]
    pub fn with_key(mut self, key: Keycode) -> Self {
        if let Some(slot) = self.keys.iter_mut().find(|k| **k == Keycode::NONE) {
            *slot = key;
        }
        self
    }

    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    /// The report that types `c`, if it has a US-layout mapping.
    #[must_use]
    pub fn for_char(c: char) -> Option<Self> {
        Keycode::from_char(c).map(|(key, modifiers)| Self::press(key).with_modifiers(modifiers))
    }
}

impl HidReport for KeyboardReport {
    fn device_class(&self) -> DeviceClass {
        DeviceClass::Keyboard
    }

    fn payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(KEYBOARD_PAYLOAD_LEN);
        payload.push(self.modifiers.bits());
        payload.push(0x00);
        payload.extend(self.keys.iter().map(|k| k.0));
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_a_report_bytes() {
        let report = KeyboardReport::press(Keycode::A).encode();
        assert_eq!(
            report,
            vec![0xA1, 0x01, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn release_report_is_all_zero_payload() {
        let report = KeyboardReport::default().encode();
        assert_eq!(report.len(), 10);
        assert!(report[2..].iter().all(|b| *b == 0));
    }

    #[test]
    fn six_keys_fill_every_slot_and_seventh_is_dropped() {
        let mut report = KeyboardReport::default();
        for key in [
            Keycode::A,
            Keycode::B,
            Keycode::C,
            Keycode::D,
            Keycode::E,
            Keycode::F,
            Keycode::G,
        ] {
            report = report.with_key(key);
        }
        let payload = report.payload();
        assert_eq!(payload.len(), KEYBOARD_PAYLOAD_LEN);
        assert_eq!(&payload[2..], &[0x04, 0x05, 0x06, 0x07, 0x08, 0x09]);
    }

    #[test]
    fn modifiers_occupy_first_byte() {
        let report = KeyboardReport::press(Keycode::TAB)
            .with_modifiers(Modifiers::LEFT_ALT | Modifiers::RIGHT_META);
        assert_eq!(report.payload()[0], 0b1000_0100);
    }

    #[test]
    fn char_mapping() {
        assert_eq!(
            Keycode::from_char('a'),
            Some((Keycode::A, Modifiers::empty()))
        );
        assert_eq!(
            Keycode::from_char('Z'),
            Some((Keycode::Z, Modifiers::LEFT_SHIFT))
        );
        assert_eq!(
            Keycode::from_char('0'),
            Some((Keycode::NUMBER_0, Modifiers::empty()))
        );
        assert_eq!(
            Keycode::from_char('9'),
            Some((Keycode::NUMBER_9, Modifiers::empty()))
        );
        assert_eq!(
            Keycode::from_char('?'),
            Some((Keycode::FORWARD_SLASH, Modifiers::LEFT_SHIFT))
        );
        assert_eq!(Keycode::from_char('é'), None);
    }

    #[test]
    fn for_char_builds_shifted_report() {
        let report = KeyboardReport::for_char('W').unwrap();
        assert_eq!(report.modifiers, Modifiers::LEFT_SHIFT);
        assert_eq!(report.keys[0], Keycode::W);
    }
}
