//! Hex line framing.
//!
//! Each frame is the raw report hex-encoded (either case on input, uppercase
//! on output) and terminated by `\n`. ASCII whitespace inside a line is
//! ignored, so `A1 01 00 ...` and a trailing `\r` are both accepted. An empty
//! line decodes to empty bytes, which readers treat as end of stream.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::error::ProtocolError;

/// Maximum line length, excluding the terminating newline.
pub const MAX_FRAME_LENGTH: usize = 1024;

/// Encode a raw report as one uppercase hex line, newline included.
pub fn encode_frame(report: &[u8]) -> String {
    let mut line = hex::encode_upper(report);
    line.push('\n');
    line
}

/// Decode one line (without its newline) into raw report bytes.
///
/// Whitespace-only input yields empty bytes. Odd-length or non-hex input is a
/// framing error.
pub fn decode_frame(frame: &[u8]) -> Result<Bytes, ProtocolError> {
    let digits: Vec<u8> = frame
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.is_empty() {
        return Ok(Bytes::new());
    }
    hex::decode(&digits)
        .map(Bytes::from)
        .map_err(|e| ProtocolError::Framing(e.to_string()))
}

/// [`Decoder`]/[`Encoder`] pair for hex report lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportCodec;

impl ReportCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for ReportCodec {
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(newline) = src.iter().position(|b| *b == b'\n') else {
            if src.len() > MAX_FRAME_LENGTH {
                return Err(ProtocolError::FrameTooLong {
                    len: src.len(),
                    max: MAX_FRAME_LENGTH,
                });
            }
            return Ok(None);
        };

        if newline > MAX_FRAME_LENGTH {
            return Err(ProtocolError::FrameTooLong {
                len: newline,
                max: MAX_FRAME_LENGTH,
            });
        }

        let line = src.split_to(newline);
        src.advance(1);
        let report = decode_frame(&line)?;
        trace!(len = report.len(), "decoded frame");
        Ok(Some(report))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(report) = self.decode(src)? {
            return Ok(Some(report));
        }
        if src.is_empty() {
            return Ok(None);
        }
        // Unterminated last line.
        let line = src.split();
        decode_frame(&line).map(Some)
    }
}

impl<T: AsRef<[u8]>> Encoder<T> for ReportCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let report = item.as_ref();
        let len = report.len() * 2;
        if len > MAX_FRAME_LENGTH {
            return Err(ProtocolError::FrameTooLong {
                len,
                max: MAX_FRAME_LENGTH,
            });
        }
        dst.extend_from_slice(encode_frame(report).as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bthid_types::{HidReport, KeyboardReport, Keycode, MouseReport, TouchReport};

    #[test]
    fn empty_frame_is_end_of_stream() {
        assert!(decode_frame(b"").unwrap().is_empty());
        assert!(decode_frame(b" \r").unwrap().is_empty());
    }

    #[test]
    fn odd_length_is_framing_error() {
        assert!(matches!(
            decode_frame(b"A1 0"),
            Err(ProtocolError::Framing(_))
        ));
    }

    #[test]
    fn non_hex_is_framing_error() {
        assert!(matches!(
            decode_frame(b"A1ZZ"),
            Err(ProtocolError::Framing(_))
        ));
    }

    #[test]
    fn spaced_mixed_case_input() {
        let bytes = decode_frame(b"a1 01 00 00 04 00 00 00 00 00\r").unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[0xA1, 0x01, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn reports_survive_the_line_format() {
        let reports = [
            KeyboardReport::press(Keycode::ENTER).encode(),
            MouseReport::movement(-1.0, 1.0).encode(),
            TouchReport::contact(1.0, 0.0).encode(),
        ];
        for raw in reports {
            let line = encode_frame(&raw);
            assert!(line.ends_with('\n'));
            let decoded = decode_frame(line.trim_end().as_bytes()).unwrap();
            assert_eq!(decoded.as_ref(), raw.as_slice());
        }

        let line = encode_frame(&MouseReport::movement(-1.0, 0.0).encode());
        assert_eq!(&line[6..8], "81");
    }

    #[test]
    fn decoder_splits_lines_and_waits_for_more() {
        let mut codec = ReportCodec::new();
        let mut buf = BytesMut::from(&b"A10200\nA103"[..]);

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.as_ref(), &[0xA1, 0x02, 0x00]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"FF\n\n");
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.as_ref(), &[0xA1, 0x03, 0xFF]);
        let end = codec.decode(&mut buf).unwrap().unwrap();
        assert!(end.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn decoder_flushes_unterminated_line_at_eof() {
        let mut codec = ReportCodec::new();
        let mut buf = BytesMut::from(&b"A101"[..]);
        let last = codec.decode_eof(&mut buf).unwrap().unwrap();
        assert_eq!(last.as_ref(), &[0xA1, 0x01]);
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decoder_rejects_overlong_lines() {
        let mut codec = ReportCodec::new();
        let mut buf = BytesMut::from(vec![b'0'; MAX_FRAME_LENGTH + 2].as_slice());
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::FrameTooLong { .. })
        ));
    }

    #[test]
    fn encoder_writes_uppercase_line() {
        let mut codec = ReportCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(&[0xA1u8, 0x02, 0xab][..], &mut buf).unwrap();
        assert_eq!(&buf[..], b"A102AB\n");
    }
}
