//! WAP Push envelope detection.
//!
//! An MMS notification/message arrives wrapped in a WSP Push PDU:
//! `TID PDU-Type(0x06|0x07) uintvar-headers-len headers body`. This module
//! strips that envelope once it has confirmed the wrapped content-type is
//! `application/vnd.wap.mms-message`, leaving the raw MMS PDU bytes for
//! [`crate::pdu::decode`].

use crate::error::{DecodeError, DecodeResult};
use crate::multipart::decode_content_type_field;
use crate::primitives::Decoder;

const WSP_PDU_TYPE_PUSH: u8 = 0x06;
const WSP_PDU_TYPE_CONFIRMED_PUSH: u8 = 0x07;

/// Strips the WSP Push envelope, returning the inner MMS PDU bytes.
///
/// Returns [`DecodeError::NotAPush`] if `buf` isn't a Push/ConfirmedPush
/// PDU, or if its content-type isn't the MMS message type — callers
/// should fall back to treating `buf` as an already-bare PDU in that
/// case (some transports deliver it unwrapped).
pub fn strip_push_envelope(buf: &[u8]) -> DecodeResult<&[u8]> {
    if buf.len() < 2 {
        return Err(DecodeError::NotAPush);
    }
    let pdu_type = buf[1];
    if pdu_type != WSP_PDU_TYPE_PUSH && pdu_type != WSP_PDU_TYPE_CONFIRMED_PUSH {
        return Err(DecodeError::NotAPush);
    }

    let mut dec = Decoder::new(&buf[2..]);
    let headers_len = dec.read_uintvar()? as usize;
    let header_bytes = dec.read_bytes(headers_len)?;
    let body_offset = 2 + dec.position();

    let mut hdec = Decoder::new(header_bytes);
    let ct = decode_content_type_field(&mut hdec)?;
    if !ct.type_.eq_ignore_ascii_case("application") || !ct.subtype.eq_ignore_ascii_case("vnd.wap.mms-message") {
        return Err(DecodeError::NotAPush);
    }

    Ok(&buf[body_offset..])
}

/// Returns the inner MMS PDU bytes whether `buf` is push-wrapped or a
/// bare PDU, the typical shape of the byte array a `PushManager` hands
/// to this layer.
pub fn unwrap_mms_bytes(buf: &[u8]) -> &[u8] {
    strip_push_envelope(buf).unwrap_or(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_type::ContentType;
    use crate::multipart::encode_content_type_field;
    use crate::primitives::Encoder;

    fn build_push(body: &[u8]) -> Vec<u8> {
        let mut headers_enc = Encoder::new();
        encode_content_type_field(
            &mut headers_enc,
            &ContentType::new("application", "vnd.wap.mms-message"),
        );
        let headers = headers_enc.into_bytes();

        let mut enc = Encoder::new();
        enc.write_u8(0x00); // TID, unused by this layer
        enc.write_u8(WSP_PDU_TYPE_PUSH);
        enc.write_uintvar(headers.len() as u64);
        enc.write_bytes(&headers);
        enc.write_bytes(body);
        enc.into_bytes()
    }

    #[test]
    fn strips_push_envelope_around_mms_body() {
        let wrapped = build_push(b"mms-pdu-bytes");
        let inner = strip_push_envelope(&wrapped).unwrap();
        assert_eq!(inner, b"mms-pdu-bytes");
    }

    #[test]
    fn rejects_non_push_pdu_type() {
        let mut buf = build_push(b"x");
        buf[1] = 0x01; // Connect, not Push
        assert!(strip_push_envelope(&buf).is_err());
    }

    #[test]
    fn unwrap_falls_back_to_bare_bytes() {
        let bare = [0x8C, 0x00]; // not push-shaped
        assert_eq!(unwrap_mms_bytes(&bare), &bare);
    }
}
