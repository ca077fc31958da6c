//! MMS header identifiers and a generic header value, decoded/encoded by
//! the "well-known header" / "application header" WSP rule, and the
//! per-part header set.

use crate::error::{DecodeError, DecodeResult, EncodeError};
use crate::primitives::{Decoder, Encoder};

/// MMS header ids. Kept as an open set: unrecognised
/// well-known ids decode to [`HeaderName::Unknown`] rather than failing,
/// matching "unknown headers are skipped on input".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderName {
    Bcc,
    Cc,
    ContentLocation,
    ContentType,
    Date,
    DeliveryReport,
    DeliveryTime,
    Expiry,
    From,
    MessageClass,
    MessageId,
    MessageType,
    MmsVersion,
    MessageSize,
    Priority,
    ReadReport,
    ReportAllowed,
    ResponseStatus,
    ResponseText,
    SenderVisibility,
    Status,
    Subject,
    To,
    TransactionId,
    RetrieveStatus,
    RetrieveText,
    ReadStatus,
    ReplyCharging,
    ReplyChargingDeadline,
    ReplyChargingId,
    ReplyChargingSize,
    PreviouslySentBy,
    PreviouslySentDate,
    Unknown(u8),
}

impl HeaderName {
    pub fn wire_id(self) -> u8 {
        use HeaderName::*;
        match self {
            Bcc => 0x01,
            Cc => 0x02,
            ContentLocation => 0x03,
            ContentType => 0x04,
            Date => 0x05,
            DeliveryReport => 0x06,
            DeliveryTime => 0x07,
            Expiry => 0x08,
            From => 0x09,
            MessageClass => 0x0A,
            MessageId => 0x0B,
            MessageType => 0x0C,
            MmsVersion => 0x0D,
            MessageSize => 0x0E,
            Priority => 0x0F,
            ReadReport => 0x10,
            ReportAllowed => 0x11,
            ResponseStatus => 0x12,
            ResponseText => 0x13,
            SenderVisibility => 0x14,
            Status => 0x15,
            Subject => 0x16,
            To => 0x17,
            TransactionId => 0x18,
            RetrieveStatus => 0x19,
            RetrieveText => 0x1A,
            ReadStatus => 0x1B,
            ReplyCharging => 0x1C,
            ReplyChargingDeadline => 0x1D,
            ReplyChargingId => 0x1E,
            ReplyChargingSize => 0x1F,
            PreviouslySentBy => 0x20,
            PreviouslySentDate => 0x21,
            Unknown(id) => id,
        }
    }

    pub fn from_wire_id(id: u8) -> Self {
        use HeaderName::*;
        match id {
            0x01 => Bcc,
            0x02 => Cc,
            0x03 => ContentLocation,
            0x04 => ContentType,
            0x05 => Date,
            0x06 => DeliveryReport,
            0x07 => DeliveryTime,
            0x08 => Expiry,
            0x09 => From,
            0x0A => MessageClass,
            0x0B => MessageId,
            0x0C => MessageType,
            0x0D => MmsVersion,
            0x0E => MessageSize,
            0x0F => Priority,
            0x10 => ReadReport,
            0x11 => ReportAllowed,
            0x12 => ResponseStatus,
            0x13 => ResponseText,
            0x14 => SenderVisibility,
            0x15 => Status,
            0x16 => Subject,
            0x17 => To,
            0x18 => TransactionId,
            0x19 => RetrieveStatus,
            0x1A => RetrieveText,
            0x1B => ReadStatus,
            0x1C => ReplyCharging,
            0x1D => ReplyChargingDeadline,
            0x1E => ReplyChargingId,
            0x1F => ReplyChargingSize,
            0x20 => PreviouslySentBy,
            0x21 => PreviouslySentDate,
            other => Unknown(other),
        }
    }

    /// Whether multiple occurrences of this header are accepted (list
    /// fields): Bcc/Cc/To accumulate, every other header keeps only the
    /// first occurrence seen.
    pub fn allows_multiple(self) -> bool {
        matches!(self, HeaderName::Bcc | HeaderName::Cc | HeaderName::To)
    }
}

/// Per-part header ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartHeaderName {
    ContentLocation,
    ContentDisposition,
    ContentId,
    Unknown(u8),
}

impl PartHeaderName {
    pub fn wire_id(self) -> u8 {
        match self {
            PartHeaderName::ContentLocation => 0x0E,
            PartHeaderName::ContentDisposition => 0x2E,
            PartHeaderName::ContentId => 0x40,
            PartHeaderName::Unknown(id) => id,
        }
    }

    pub fn from_wire_id(id: u8) -> Self {
        match id {
            0x0E => PartHeaderName::ContentLocation,
            0x2E | 0x45 => PartHeaderName::ContentDisposition,
            0x40 => PartHeaderName::ContentId,
            other => PartHeaderName::Unknown(other),
        }
    }
}

/// A decoded header value. The wire form actually used depends on
/// [`HeaderName`]; see [`decode_header`]/[`encode_header`].
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// `encoded-string-value`, already normalised to UTF-8.
    Text(String),
    /// `long-integer`.
    Long(u64),
    /// `short-integer` or single-octet enumerated token.
    Short(u8),
    /// `date-value`, seconds since epoch.
    Date(u64),
    /// Raw, un-interpreted bytes (used for headers this codec doesn't
    /// otherwise model, or application-defined headers).
    Bytes(Vec<u8>),
    /// `From`-value: `address-present` token + encoded-string, or
    /// `insert-address` with no address carried.
    From(Option<String>),
}

/// Which wire form a given well-known header uses. Headers not listed
/// here are assumed to use [`HeaderValue::Text`].
fn wire_form(name: HeaderName) -> HeaderForm {
    use HeaderForm::*;
    use HeaderName::*;
    match name {
        MessageType => ShortForm,
        MmsVersion => VersionForm,
        MessageClass => ShortOrTextForm,
        Priority => ShortForm,
        DeliveryReport | ReadReport | ReportAllowed | SenderVisibility => ShortForm,
        Date | DeliveryTime | Expiry => DateOrRelativeForm,
        MessageSize => LongForm,
        ResponseStatus | RetrieveStatus | ReadStatus | Status => ShortForm,
        From => FromForm,
        _ => TextForm,
    }
}

enum HeaderForm {
    TextForm,
    ShortForm,
    ShortOrTextForm,
    LongForm,
    VersionForm,
    DateOrRelativeForm,
    FromForm,
}

/// Reads one header (well-known or application) and its value.
///
/// A well-known header is one byte with the high bit set identifying the
/// header id; an application header is a NUL-terminated name followed by
/// its value.
pub fn decode_header(dec: &mut Decoder) -> DecodeResult<(HeaderName, HeaderValue, String)> {
    let first = dec.peek_u8()?;
    if first & 0x80 != 0 {
        dec.read_u8()?;
        let name = HeaderName::from_wire_id(first & 0x7F);
        let value = decode_value(dec, wire_form(name))?;
        Ok((name, value, String::new()))
    } else {
        let name_bytes = dec.read_text_string()?;
        let app_name = String::from_utf8_lossy(&name_bytes).into_owned();
        let value = decode_value(dec, HeaderForm::TextForm)?;
        Ok((HeaderName::Unknown(0), value, app_name))
    }
}

fn decode_value(dec: &mut Decoder, form: HeaderForm) -> DecodeResult<HeaderValue> {
    match form {
        HeaderForm::TextForm => Ok(HeaderValue::Text(dec.read_encoded_string_value()?)),
        HeaderForm::ShortForm => Ok(HeaderValue::Short(dec.read_short_integer()?)),
        HeaderForm::ShortOrTextForm => {
            if dec.peek_is_short_integer()? {
                Ok(HeaderValue::Short(dec.read_short_integer()?))
            } else {
                Ok(HeaderValue::Text(dec.read_encoded_string_value()?))
            }
        }
        HeaderForm::LongForm => Ok(HeaderValue::Long(dec.read_long_integer()?)),
        HeaderForm::VersionForm => {
            let (maj, min) = dec.read_version()?;
            Ok(HeaderValue::Short((maj << 4) | min))
        }
        HeaderForm::DateOrRelativeForm => {
            // Expiry/Date/Delivery-Time are value-length prefixed,
            // containing either a long-integer (absolute) or a token +
            // long-integer (relative), per the Expiry-value grammar.
            let vlen = dec.read_value_length()? as usize;
            let field_start = dec.position();
            let token = dec.peek_u8()?;
            let value = if token == 0x80 {
                dec.read_u8()?;
                HeaderValue::Date(dec.read_long_integer()?)
            } else if token == 0x81 {
                dec.read_u8()?;
                HeaderValue::Long(dec.read_long_integer()?)
            } else {
                HeaderValue::Long(dec.read_long_integer()?)
            };
            // Re-sync to the declared field boundary, tolerating any
            // padding a sender adds beyond what we interpreted.
            let declared_end = field_start + vlen;
            if declared_end > dec.position() {
                dec.skip(declared_end - dec.position())?;
            }
            Ok(value)
        }
        HeaderForm::FromForm => Ok(HeaderValue::From(decode_from_value(dec)?)),
    }
}

/// Writes a well-known header and its value.
pub fn encode_header(enc: &mut Encoder, name: HeaderName, value: &HeaderValue) {
    enc.write_u8(name.wire_id() | 0x80);
    encode_value(enc, wire_form(name), value);
}

/// Writes an absolute Expiry/Date/Delivery-Time header (token 0x80,
/// date-value).
pub fn encode_absolute_date_header(enc: &mut Encoder, name: HeaderName, epoch_secs: u64) {
    enc.write_u8(name.wire_id() | 0x80);
    enc.write_with_value_length(|e| {
        e.write_u8(0x80);
        e.write_date_value(epoch_secs);
    });
}

/// Writes a relative Expiry header (token 0x81, delta-seconds).
pub fn encode_relative_expiry_header(enc: &mut Encoder, delta_secs: u64) {
    enc.write_u8(HeaderName::Expiry.wire_id() | 0x80);
    enc.write_with_value_length(|e| {
        e.write_u8(0x81);
        e.write_long_integer(delta_secs);
    });
}

fn encode_value(enc: &mut Encoder, form: HeaderForm, value: &HeaderValue) {
    match (form, value) {
        (HeaderForm::TextForm, HeaderValue::Text(s)) => enc.write_encoded_string_value(s),
        (HeaderForm::ShortForm, HeaderValue::Short(b)) => {
            let _ = enc.write_short_integer(*b);
        }
        (HeaderForm::ShortOrTextForm, HeaderValue::Short(b)) => {
            let _ = enc.write_short_integer(*b);
        }
        (HeaderForm::ShortOrTextForm, HeaderValue::Text(s)) => enc.write_encoded_string_value(s),
        (HeaderForm::LongForm, HeaderValue::Long(v)) => enc.write_long_integer(*v),
        (HeaderForm::VersionForm, HeaderValue::Short(v)) => {
            enc.write_version(v >> 4, v & 0x0F);
        }
        (HeaderForm::FromForm, HeaderValue::From(opt)) => {
            let _ = encode_from_value(enc, opt.as_deref());
        }
        (HeaderForm::DateOrRelativeForm, HeaderValue::Date(v)) => {
            enc.write_with_value_length(|e| {
                e.write_u8(0x80);
                e.write_date_value(*v);
            });
        }
        (HeaderForm::DateOrRelativeForm, HeaderValue::Long(v)) => {
            // Plain Date-value (Date/Delivery-Time without the
            // relative-token option), as opposed to Expiry's
            // absolute/relative-token grammar.
            enc.write_with_value_length(|e| {
                e.write_long_integer(*v);
            });
        }
        _ => {
            // Mismatched form/value combination: write nothing rather than
            // producing a malformed field silently diverging from the
            // caller's intent.
            debug_assert!(false, "header value does not match its wire form");
        }
    }
}

/// Per-part Content-Disposition value token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentDisposition {
    FormData,
    Attachment,
    Inline,
}

impl ContentDisposition {
    pub fn to_wire(self) -> u8 {
        match self {
            ContentDisposition::FormData => 128,
            ContentDisposition::Attachment => 129,
            ContentDisposition::Inline => 130,
        }
    }

    pub fn from_wire(v: u8) -> DecodeResult<Self> {
        match v {
            128 => Ok(ContentDisposition::FormData),
            129 => Ok(ContentDisposition::Attachment),
            130 => Ok(ContentDisposition::Inline),
            other => Err(DecodeError::InvalidEnumValue(
                "ContentDisposition",
                other as u32,
            )),
        }
    }
}

/// Checks the From-value leading token:
/// 0x80 = address-present (encoded-string follows), 0x81 = insert-address.
pub fn decode_from_value(dec: &mut Decoder) -> DecodeResult<Option<String>> {
    let _vlen = dec.read_value_length()?;
    let token = dec.read_u8()?;
    match token {
        0x80 => Ok(Some(dec.read_encoded_string_value()?)),
        0x81 => Ok(None),
        _ => Err(DecodeError::MalformedFrom),
    }
}

pub fn encode_from_value(enc: &mut Encoder, from: Option<&str>) -> Result<(), EncodeError> {
    enc.write_with_value_length(|e| match from {
        Some(addr) => {
            e.write_u8(0x80);
            e.write_encoded_string_value(addr);
        }
        None => {
            e.write_u8(0x81);
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_name_round_trips_wire_id() {
        for id in [0x01u8, 0x04, 0x0D, 0x18, 0x21] {
            assert_eq!(HeaderName::from_wire_id(id).wire_id(), id);
        }
    }

    #[test]
    fn content_disposition_round_trip() {
        assert_eq!(
            ContentDisposition::from_wire(129).unwrap(),
            ContentDisposition::Attachment
        );
    }

    #[test]
    fn from_value_insert_address() {
        let mut enc = Encoder::new();
        encode_from_value(&mut enc, None).unwrap();
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        assert_eq!(decode_from_value(&mut dec).unwrap(), None);
    }

    #[test]
    fn from_header_round_trips_through_generic_dispatch() {
        let mut enc = Encoder::new();
        encode_header(
            &mut enc,
            HeaderName::From,
            &HeaderValue::From(Some("+1234567890/TYPE=PLMN".to_string())),
        );
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        let (name, value, _) = decode_header(&mut dec).unwrap();
        assert_eq!(name, HeaderName::From);
        assert_eq!(
            value,
            HeaderValue::From(Some("+1234567890/TYPE=PLMN".to_string()))
        );
    }

    #[test]
    fn from_value_address_present() {
        let mut enc = Encoder::new();
        encode_from_value(&mut enc, Some("+1234567890/TYPE=PLMN")).unwrap();
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        assert_eq!(
            decode_from_value(&mut dec).unwrap(),
            Some("+1234567890/TYPE=PLMN".to_string())
        );
    }
}
