//! IANA MIBenum <-> UTF-8 conversions for `encoded-string-value`.

use crate::error::DecodeResult;

/// An IANA "MIBenum" charset identifier, as carried on the wire in an
/// `encoded-string-value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mib(pub u64);

impl Mib {
    pub const US_ASCII: Mib = Mib(3);
    pub const ISO_8859_1: Mib = Mib(4);
    pub const UTF_16: Mib = Mib(1015);
    pub const UTF_16BE: Mib = Mib(1013);
    pub const UTF_16LE: Mib = Mib(1014);
    pub const UTF8: Mib = Mib(106);
}

/// Converts `raw` (bytes in the charset named by `mib`) to a UTF-8 string.
/// Passes through unchanged if the charset is already UTF-8; fails if `raw`
/// is not valid in the claimed charset and no fallback mapping is known.
pub fn decode_to_utf8(mib: Mib, raw: &[u8]) -> DecodeResult<String> {
    let encoding = match mib {
        Mib::UTF8 => return Ok(String::from_utf8_lossy(raw).into_owned()),
        Mib::US_ASCII => encoding_rs::WINDOWS_1252,
        Mib::ISO_8859_1 => encoding_rs::WINDOWS_1252,
        Mib::UTF_16 | Mib::UTF_16BE => encoding_rs::UTF_16BE,
        Mib::UTF_16LE => encoding_rs::UTF_16LE,
        _ => {
            // Unknown MIB: pass through as Latin-1-ish best effort rather
            // than failing the whole PDU over a single unsupported header.
            encoding_rs::WINDOWS_1252
        }
    };
    let (text, _, had_errors) = encoding.decode(raw);
    if had_errors {
        log::debug!("charset mib={} had decode errors, using lossy text", mib.0);
    }
    Ok(text.into_owned())
}

/// Re-encodes UTF-8 `text` into the charset named by `mib`. Used only when
/// emitting a field whose stored original charset is tracked; the encoder
/// normally writes UTF-8 (mib 106) for anything non-ASCII (see
/// [`crate::primitives::Encoder::write_encoded_string_value`]).
pub fn encode_from_utf8(mib: Mib, text: &str) -> Vec<u8> {
    let encoding = match mib {
        Mib::US_ASCII | Mib::ISO_8859_1 => encoding_rs::WINDOWS_1252,
        Mib::UTF_16 | Mib::UTF_16BE => encoding_rs::UTF_16BE,
        Mib::UTF_16LE => encoding_rs::UTF_16LE,
        _ => return text.as_bytes().to_vec(),
    };
    let (bytes, _, _) = encoding.encode(text);
    bytes.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_passthrough() {
        let s = decode_to_utf8(Mib::UTF8, "héllo".as_bytes()).unwrap();
        assert_eq!(s, "héllo");
    }

    #[test]
    fn ascii_is_identity_for_ascii_bytes() {
        let s = decode_to_utf8(Mib::US_ASCII, b"hello").unwrap();
        assert_eq!(s, "hello");
    }
}
