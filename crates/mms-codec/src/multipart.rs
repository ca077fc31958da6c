//! Multipart body encode/decode.
//!
//! A multipart body is a `uintvar` entry count followed by that many
//! entries of `uintvar-header-len uintvar-data-len content-type headers
//! body`. Each entry's content-type is either a well-known short-integer
//! or a value-length-prefixed string, same grammar as the outer
//! Content-Type header.

use crate::content_type::{self, ContentType};
use crate::error::{DecodeError, DecodeResult, EncodeResult};
use crate::headers::{ContentDisposition, PartHeaderName};
use crate::primitives::{Decoder, Encoder};

/// One MIME part of a multipart MMS body.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub content_type: ContentType,
    pub content_id: Option<String>,
    pub content_location: Option<String>,
    pub content_disposition: Option<ContentDisposition>,
    /// `Content-Transfer-Encoding` as seen in the part's own text headers,
    /// if present (not a well-known per-part header, carried as-is).
    pub content_transfer_encoding: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultipartBody {
    pub parts: Vec<Part>,
}

/// Small subset of the WSP well-known content-type assignments this
/// codec recognises. Anything else is carried as the full string form.
fn wellknown_code(ct: &ContentType) -> Option<u8> {
    match (ct.type_.to_ascii_lowercase().as_str(), ct.subtype.to_ascii_lowercase().as_str()) {
        ("text", "plain") => Some(0x03),
        ("text", "html") => Some(0x02),
        ("multipart", "mixed") => Some(0x0C),
        ("multipart", "related") => Some(0x33),
        ("image", "gif") => Some(0x1D),
        ("image", "jpeg") => Some(0x1E),
        ("image", "png") => Some(0x20),
        ("application", "vnd.wap.mms-message") => Some(0x3E),
        _ => None,
    }
}

fn wellknown_from_code(code: u8) -> Option<ContentType> {
    let (t, s) = match code {
        0x02 => ("text", "html"),
        0x03 => ("text", "plain"),
        0x0C => ("multipart", "mixed"),
        0x1D => ("image", "gif"),
        0x1E => ("image", "jpeg"),
        0x20 => ("image", "png"),
        0x33 => ("multipart", "related"),
        0x3E => ("application", "vnd.wap.mms-message"),
        _ => return None,
    };
    Some(ContentType::new(t, s))
}

/// Reads a content-type field: a well-known short-integer, or a
/// value-length-prefixed string carrying the full `type/subtype;
/// params` text (this codec's own general-form representation, see
/// `content_type` module).
pub fn decode_content_type_field(dec: &mut Decoder) -> DecodeResult<ContentType> {
    if dec.peek_is_short_integer()? {
        let code = dec.read_short_integer()?;
        return wellknown_from_code(code)
            .ok_or_else(|| DecodeError::MalformedContentType(format!("unknown well-known code {code:#x}")));
    }
    let vlen = dec.read_value_length()? as usize;
    let start = dec.position();
    let raw = dec.read_text_string()?;
    let end = dec.position();
    let declared_end = start + vlen;
    if declared_end > end {
        dec.skip(declared_end - end)?;
    }
    let s = String::from_utf8_lossy(&raw).into_owned();
    content_type::parse(&s)
}

pub fn encode_content_type_field(enc: &mut Encoder, ct: &ContentType) {
    if ct.params.is_empty() {
        if let Some(code) = wellknown_code(ct) {
            let _ = enc.write_short_integer(code);
            return;
        }
    }
    let s = content_type::unparse(ct);
    enc.write_with_value_length(|e| e.write_text_string(s.as_bytes()));
}

fn decode_part_headers(dec: &mut Decoder, ct: ContentType) -> DecodeResult<Part> {
    let mut content_id = None;
    let mut content_location = None;
    let mut content_disposition = None;
    while !dec.is_empty() {
        let id_byte = dec.read_u8()?;
        if id_byte & 0x80 == 0 {
            // Application-defined per-part header: NUL-terminated name
            // (first byte already consumed above) then a value; skip both.
            loop {
                let b = dec.read_u8()?;
                if b == 0 {
                    break;
                }
            }
            let _ = dec.read_encoded_string_value();
            continue;
        }
        let name = PartHeaderName::from_wire_id(id_byte & 0x7F);
        match name {
            PartHeaderName::ContentLocation => {
                content_location = Some(dec.read_encoded_string_value()?);
            }
            PartHeaderName::ContentId => {
                // Content-ID is always a quoted-string, per its WSP header
                // definition (no value-length wrapper).
                content_id = Some(dec.read_quoted_string()?);
            }
            PartHeaderName::ContentDisposition => {
                let vlen = dec.read_value_length()? as usize;
                let start = dec.position();
                let token = dec.read_short_integer()?;
                content_disposition = ContentDisposition::from_wire(token).ok();
                let end = dec.position();
                let declared_end = start + vlen;
                if declared_end > end {
                    dec.skip(declared_end - end)?;
                }
            }
            PartHeaderName::Unknown(_) => {
                let _ = dec.read_encoded_string_value();
            }
        }
    }
    Ok(Part {
        content_type: ct,
        content_id,
        content_location,
        content_disposition,
        // Not a WSP well-known per-part header; never carried over the
        // wire, only meaningful to callers building parts from local files.
        content_transfer_encoding: None,
        data: Vec::new(),
    })
}

/// Decodes the whole body given the outer Content-Type. Non-multipart
/// content types are wrapped as a single synthetic part carrying the
/// remaining bytes verbatim.
pub fn decode_body(dec: &mut Decoder, outer_ct: &ContentType) -> DecodeResult<MultipartBody> {
    if !outer_ct.is_multipart() {
        let data = dec.rest().to_vec();
        dec.skip(data.len())?;
        return Ok(MultipartBody {
            parts: vec![Part {
                content_type: outer_ct.clone(),
                content_id: None,
                content_location: None,
                content_disposition: None,
                content_transfer_encoding: None,
                data,
            }],
        });
    }

    let count = dec.read_uintvar()?;
    let mut parts = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let headers_len = dec.read_uintvar()? as usize;
        let data_len = dec.read_uintvar()? as usize;
        let headers_bytes = dec.read_bytes(headers_len)?;
        let mut hdec = Decoder::new(headers_bytes);
        let part_ct = decode_content_type_field(&mut hdec)?;
        let mut part = decode_part_headers(&mut hdec, part_ct)?;
        part.data = dec.read_bytes(data_len)?.to_vec();
        parts.push(part);
    }
    Ok(MultipartBody { parts })
}

pub fn encode_body(enc: &mut Encoder, outer_ct: &ContentType, body: &MultipartBody) -> EncodeResult<()> {
    if !outer_ct.is_multipart() {
        if let Some(part) = body.parts.first() {
            enc.write_bytes(&part.data);
        }
        return Ok(());
    }
    enc.write_uintvar(body.parts.len() as u64);
    for part in &body.parts {
        let mut hdr_enc = Encoder::new();
        encode_content_type_field(&mut hdr_enc, &part.content_type);
        if let Some(cid) = &part.content_id {
            hdr_enc.write_u8(PartHeaderName::ContentId.wire_id() | 0x80);
            hdr_enc.write_quoted_string(cid);
        }
        if let Some(loc) = &part.content_location {
            hdr_enc.write_u8(PartHeaderName::ContentLocation.wire_id() | 0x80);
            hdr_enc.write_encoded_string_value(loc);
        }
        if let Some(disp) = part.content_disposition {
            hdr_enc.write_u8(PartHeaderName::ContentDisposition.wire_id() | 0x80);
            hdr_enc.write_with_value_length(|e| {
                let _ = e.write_short_integer(disp.to_wire());
            });
        }
        if let Some(cte) = &part.content_transfer_encoding {
            hdr_enc.write_u8(0x8F);
            hdr_enc.write_encoded_string_value(cte);
        }
        let header_bytes = hdr_enc.into_bytes();
        enc.write_uintvar(header_bytes.len() as u64);
        enc.write_uintvar(part.data.len() as u64);
        enc.write_bytes(&header_bytes);
        enc.write_bytes(&part.data);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_part(cid: &str, body: &str) -> Part {
        Part {
            content_type: ContentType::new("text", "plain").with_param("charset", "utf-8"),
            content_id: Some(cid.to_string()),
            content_location: Some(format!("{cid}.txt")),
            content_disposition: None,
            content_transfer_encoding: None,
            data: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn multipart_mixed_round_trip() {
        let outer = ContentType::new("multipart", "mixed");
        let body = MultipartBody {
            parts: vec![text_part("<0>", "hello"), text_part("<1>", "world")],
        };
        let mut enc = Encoder::new();
        encode_body(&mut enc, &outer, &body).unwrap();
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        let decoded = decode_body(&mut dec, &outer).unwrap();
        assert!(dec.is_empty());
        assert_eq!(decoded.parts.len(), 2);
        assert_eq!(decoded.parts[0].data, b"hello");
        assert_eq!(decoded.parts[1].content_id.as_deref(), Some("<1>"));
    }

    #[test]
    fn multipart_related_preserves_smil_root() {
        let outer = ContentType::new("multipart", "related")
            .with_param("type", "application/smil")
            .with_param("start", "<smil>");
        let smil = Part {
            content_type: ContentType::new("application", "smil"),
            content_id: Some("<smil>".into()),
            content_location: Some("presentation.smil".into()),
            content_disposition: None,
            content_transfer_encoding: None,
            data: b"<smil><body/></smil>".to_vec(),
        };
        let body = MultipartBody {
            parts: vec![smil, text_part("<1>", "hi")],
        };
        let mut enc = Encoder::new();
        encode_body(&mut enc, &outer, &body).unwrap();
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        let decoded = decode_body(&mut dec, &outer).unwrap();
        assert_eq!(decoded.parts[0].content_type.full(), "application/smil");
        assert_eq!(decoded.parts[0].content_id.as_deref(), Some("<smil>"));
    }

    #[test]
    fn non_multipart_body_is_wrapped_as_single_part() {
        let outer = ContentType::new("text", "plain");
        let mut enc = Encoder::new();
        enc.write_bytes(b"just some bytes");
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        let decoded = decode_body(&mut dec, &outer).unwrap();
        assert_eq!(decoded.parts.len(), 1);
        assert_eq!(decoded.parts[0].data, b"just some bytes");
    }

    #[test]
    fn content_disposition_round_trips_in_part_headers() {
        let outer = ContentType::new("multipart", "mixed");
        let mut part = text_part("<0>", "hello");
        part.content_disposition = Some(ContentDisposition::Attachment);
        let body = MultipartBody { parts: vec![part] };
        let mut enc = Encoder::new();
        encode_body(&mut enc, &outer, &body).unwrap();
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        let decoded = decode_body(&mut dec, &outer).unwrap();
        assert_eq!(decoded.parts[0].content_disposition, Some(ContentDisposition::Attachment));
    }
}
