//! Codec error taxonomy.

use thiserror::Error;

/// Failure decoding a WSP/MMS PDU, a push wrapper, or a multipart body.
///
/// Decoding is tolerant: unknown headers are skipped rather than raising
/// an error. A [`DecodeError`] is only raised when the buffer does not
/// contain a structurally valid PDU.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of buffer while decoding {0}")]
    UnexpectedEof(&'static str),
    #[error("invalid uintvar (more than 5 continuation octets)")]
    InvalidUintvar,
    #[error("invalid value-length prefix")]
    InvalidValueLength,
    #[error("invalid text-string: not NUL-terminated")]
    UnterminatedTextString,
    #[error("invalid quoted-string: missing leading 0x22")]
    InvalidQuotedString,
    #[error("unsupported message-type {0:#x}")]
    UnsupportedMessageType(u8),
    #[error("invalid value {1} for enumerated field {0}")]
    InvalidEnumValue(&'static str, u32),
    #[error("unsupported MMS version byte {0:#x}")]
    UnsupportedVersion(u8),
    #[error("malformed multipart body: {0}")]
    MalformedMultipart(&'static str),
    #[error("malformed content-type: {0}")]
    MalformedContentType(String),
    #[error("malformed from-value")]
    MalformedFrom,
    #[error("malformed expiry-value")]
    MalformedExpiry,
    #[error("not a recognised push PDU")]
    NotAPush,
    #[error("required header {0} missing")]
    MissingHeader(&'static str),
}

/// Failure producing a valid PDU. Always treated as fatal by the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("I/O error while writing PDU: {0}")]
    Io(String),
    #[error("invalid combination: {0}")]
    InvalidCombination(&'static str),
    #[error("value does not fit the wire encoding: {0}")]
    ValueOutOfRange(&'static str),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
pub type EncodeResult<T> = Result<T, EncodeError>;
