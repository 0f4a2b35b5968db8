//! Body layouts for the non-opaque frame kinds.
//!
//! All multi-byte integers are Big Endian. String fields are length-prefixed
//! UTF-8; failure codes and the progress/failure messages are silently
//! truncated to what their length prefixes can carry.

use bytes::Bytes;
use thiserror::Error;

use super::wire::{PID_LEN, REGISTER_BODY_LEN};

/// Failure codes carry a 1-byte length prefix.
pub const MAX_FAILURE_CODE_LEN: usize = u8::MAX as usize;

/// Progress and failure messages carry a 2-byte length prefix.
pub const MAX_MESSAGE_LEN: usize = u16::MAX as usize;

/// A structurally invalid body inside a well-framed message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BodyError {
    /// Body ended inside the named field.
    #[error("body ends inside {0}")]
    Short(&'static str),

    /// Bytes left over after the last declared field.
    #[error("{0} trailing bytes after the last argument")]
    Trailing(usize),

    /// A string field was not valid UTF-8.
    #[error("{0} is not valid UTF-8")]
    Utf8(&'static str),
}

/// Build the Register body: `0x00 0x00` then the 32-byte pid.
pub fn register_body(pid: &str) -> Vec<u8> {
    debug_assert_eq!(pid.len(), PID_LEN);
    let mut body = Vec::with_capacity(REGISTER_BODY_LEN);
    body.extend_from_slice(&[0x00, 0x00]);
    body.extend_from_slice(pid.as_bytes());
    body
}

/// Parsed Function request body.
///
/// Wire form: `name_len:u8 | name | arg_count:u16 | (arg_len:u32 | arg)*`.
/// Argument payloads stay as raw MessagePack bytes; decoding them needs the
/// registered parameter types.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBody {
    pub name: String,
    pub args: Vec<Bytes>,
}

impl FunctionBody {
    pub fn parse(body: &Bytes) -> Result<Self, BodyError> {
        let mut at = 0usize;

        let name_len = *body.first().ok_or(BodyError::Short("name length"))? as usize;
        at += 1;
        let name = body
            .get(at..at + name_len)
            .ok_or(BodyError::Short("name"))?;
        let name = std::str::from_utf8(name)
            .map_err(|_| BodyError::Utf8("name"))?
            .to_string();
        at += name_len;

        let count = body
            .get(at..at + 2)
            .ok_or(BodyError::Short("argument count"))?;
        let count = u16::from_be_bytes([count[0], count[1]]) as usize;
        at += 2;

        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            let len = body
                .get(at..at + 4)
                .ok_or(BodyError::Short("argument length"))?;
            let len = u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize;
            at += 4;
            if body.len() < at + len {
                return Err(BodyError::Short("argument"));
            }
            args.push(body.slice(at..at + len));
            at += len;
        }

        if at != body.len() {
            return Err(BodyError::Trailing(body.len() - at));
        }

        Ok(Self { name, args })
    }

    /// Assemble the wire form; the supervisor side of the protocol.
    pub fn encode(&self) -> Vec<u8> {
        debug_assert!(self.name.len() <= u8::MAX as usize);
        let mut body = Vec::new();
        body.push(self.name.len() as u8);
        body.extend_from_slice(self.name.as_bytes());
        body.extend_from_slice(&(self.args.len() as u16).to_be_bytes());
        for arg in &self.args {
            body.extend_from_slice(&(arg.len() as u32).to_be_bytes());
            body.extend_from_slice(arg);
        }
        body
    }
}

/// Failure body: `code_len:u8 | code | message_len:u16 | message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureBody {
    pub code: String,
    pub message: String,
}

impl FailureBody {
    /// Build a failure body, silently truncating over-long fields.
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: truncate_utf8(code, MAX_FAILURE_CODE_LEN).to_string(),
            message: truncate_utf8(message, MAX_MESSAGE_LEN).to_string(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(3 + self.code.len() + self.message.len());
        body.push(self.code.len() as u8);
        body.extend_from_slice(self.code.as_bytes());
        body.extend_from_slice(&(self.message.len() as u16).to_be_bytes());
        body.extend_from_slice(self.message.as_bytes());
        body
    }

    pub fn parse(body: &[u8]) -> Result<Self, BodyError> {
        let code_len = *body.first().ok_or(BodyError::Short("code length"))? as usize;
        let code = body
            .get(1..1 + code_len)
            .ok_or(BodyError::Short("code"))?;
        let code = std::str::from_utf8(code)
            .map_err(|_| BodyError::Utf8("code"))?
            .to_string();

        let at = 1 + code_len;
        let message_len = body
            .get(at..at + 2)
            .ok_or(BodyError::Short("message length"))?;
        let message_len = u16::from_be_bytes([message_len[0], message_len[1]]) as usize;
        let message = body
            .get(at + 2..at + 2 + message_len)
            .ok_or(BodyError::Short("message"))?;
        let message = std::str::from_utf8(message)
            .map_err(|_| BodyError::Utf8("message"))?
            .to_string();

        Ok(Self { code, message })
    }
}

/// Progress body: `fraction:f32 | message_len:u16 | message`.
///
/// The fraction is transmitted as-is; the runtime does not clamp it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressBody {
    pub fraction: f32,
    pub message: String,
}

impl ProgressBody {
    /// Build a progress body, silently truncating an over-long message.
    pub fn new(fraction: f32, message: &str) -> Self {
        Self {
            fraction,
            message: truncate_utf8(message, MAX_MESSAGE_LEN).to_string(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(6 + self.message.len());
        body.extend_from_slice(&self.fraction.to_be_bytes());
        body.extend_from_slice(&(self.message.len() as u16).to_be_bytes());
        body.extend_from_slice(self.message.as_bytes());
        body
    }

    pub fn parse(body: &[u8]) -> Result<Self, BodyError> {
        let fraction = body.get(..4).ok_or(BodyError::Short("fraction"))?;
        let fraction = f32::from_be_bytes([fraction[0], fraction[1], fraction[2], fraction[3]]);

        let message_len = body
            .get(4..6)
            .ok_or(BodyError::Short("message length"))?;
        let message_len = u16::from_be_bytes([message_len[0], message_len[1]]) as usize;
        let message = body
            .get(6..6 + message_len)
            .ok_or(BodyError::Short("message"))?;
        let message = std::str::from_utf8(message)
            .map_err(|_| BodyError::Utf8("message"))?
            .to_string();

        Ok(Self { fraction, message })
    }
}

/// Cut a string to at most `max` bytes without splitting a character.
fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_body_is_34_bytes() {
        let pid = "abcdefghijklmnopqrstuvwxyz012345";
        let body = register_body(pid);
        assert_eq!(body.len(), REGISTER_BODY_LEN);
        assert_eq!(body.len(), 34);
        assert_eq!(&body[..2], &[0x00, 0x00]);
        assert_eq!(&body[2..], pid.as_bytes());
    }

    #[test]
    fn test_function_body_parse_wire_example() {
        // 03 "Add" 00 02 | 00 00 00 01 02 | 00 00 00 01 03
        let bytes = Bytes::from_static(&[
            0x03, b'A', b'd', b'd', 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x02, 0x00, 0x00, 0x00,
            0x01, 0x03,
        ]);
        let parsed = FunctionBody::parse(&bytes).unwrap();
        assert_eq!(parsed.name, "Add");
        assert_eq!(parsed.args.len(), 2);
        assert_eq!(&parsed.args[0][..], &[0x02]);
        assert_eq!(&parsed.args[1][..], &[0x03]);
    }

    #[test]
    fn test_function_body_roundtrip() {
        let original = FunctionBody {
            name: "Resample".to_string(),
            args: vec![Bytes::from_static(&[0xc3]), Bytes::from_static(&[0x00])],
        };
        let parsed = FunctionBody::parse(&Bytes::from(original.encode())).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_function_body_zero_args() {
        let original = FunctionBody {
            name: "Now".to_string(),
            args: vec![],
        };
        let parsed = FunctionBody::parse(&Bytes::from(original.encode())).unwrap();
        assert_eq!(parsed.name, "Now");
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn test_function_body_empty_name() {
        let bytes = Bytes::from_static(&[0x00, 0x00, 0x00]);
        let parsed = FunctionBody::parse(&bytes).unwrap();
        assert_eq!(parsed.name, "");
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn test_function_body_short_argument() {
        // Declares a 5-byte argument but carries 2.
        let bytes = Bytes::from_static(&[0x01, b'f', 0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x01, 0x02]);
        assert_eq!(
            FunctionBody::parse(&bytes),
            Err(BodyError::Short("argument"))
        );
    }

    #[test]
    fn test_function_body_trailing_bytes() {
        let mut bytes = FunctionBody {
            name: "f".to_string(),
            args: vec![],
        }
        .encode();
        bytes.push(0xff);
        assert_eq!(
            FunctionBody::parse(&Bytes::from(bytes)),
            Err(BodyError::Trailing(1))
        );
    }

    #[test]
    fn test_function_body_bad_name_utf8() {
        let bytes = Bytes::from_static(&[0x01, 0xff, 0x00, 0x00]);
        assert_eq!(FunctionBody::parse(&bytes), Err(BodyError::Utf8("name")));
    }

    #[test]
    fn test_failure_body_roundtrip() {
        let original = FailureBody::new("NotFound", "no computation named \"Nope\"");
        let parsed = FailureBody::parse(&original.encode()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_failure_body_truncates_silently() {
        let long_code = "c".repeat(300);
        let long_message = "m".repeat(70_000);
        let body = FailureBody::new(&long_code, &long_message);
        assert_eq!(body.code.len(), MAX_FAILURE_CODE_LEN);
        assert_eq!(body.message.len(), MAX_MESSAGE_LEN);

        // Encoded form stays parseable at the limits.
        let parsed = FailureBody::parse(&body.encode()).unwrap();
        assert_eq!(parsed, body);
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // "é" is 2 bytes; cutting at byte 3 must back up to 2.
        let s = "aéé";
        let cut = truncate_utf8(s, 3);
        assert_eq!(cut, "aé");
    }

    #[test]
    fn test_progress_body_big_endian_fraction() {
        let body = ProgressBody::new(0.25, "q").encode();
        assert_eq!(&body[..4], &[0x3e, 0x80, 0x00, 0x00]);
        assert_eq!(&body[4..6], &[0x00, 0x01]);
        assert_eq!(&body[6..], b"q");
    }

    #[test]
    fn test_progress_body_fraction_not_clamped() {
        let body = ProgressBody::new(1.5, "overdone");
        let parsed = ProgressBody::parse(&body.encode()).unwrap();
        assert_eq!(parsed.fraction, 1.5);
    }
}
