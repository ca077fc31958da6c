//! Bit-exact encoder/decoder for the WSP/MMS binary wire format.
//!
//! This crate has no knowledge of transports, retry policy, or storage —
//! it only turns bytes into [`pdu::Pdu`] values and back. See `mms-core`
//! for the transaction engine built on top of it.

pub mod charset;
pub mod content_type;
pub mod enums;
pub mod error;
pub mod headers;
pub mod multipart;
pub mod pdu;
pub mod primitives;
pub mod push;

pub use error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
pub use pdu::{decode, encode, Pdu};
