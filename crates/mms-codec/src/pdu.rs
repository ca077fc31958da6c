//! Per-message-type PDU structures and their encode/decode.
//!
//! Each request/response/indication the transaction tasks exchange with an
//! MMSC is modelled as one variant of [`Pdu`], carrying only the fields the
//! transaction tasks in `mms-core` actually consume.

use crate::content_type;
use crate::enums::{MessageClass, MessageType, Priority, ResponseStatus};
use crate::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
use crate::headers::{self, HeaderName, HeaderValue};
use crate::multipart::MultipartBody;
use crate::primitives::{Decoder, Encoder};

/// MMS protocol version this codec emits. Decoding accepts 1.0-1.3.
pub const MMS_VERSION: (u8, u8) = (1, 3);

/// Absolute or relative expiry, per the Expiry-value grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Absolute(u64),
    Relative(u64),
}

impl Expiry {
    /// Resolves to an absolute wall-clock deadline given the current time.
    pub fn deadline(self, now_epoch_secs: u64) -> u64 {
        match self {
            Expiry::Absolute(t) => t,
            Expiry::Relative(d) => now_epoch_secs.saturating_add(d),
        }
    }
}

/// `M-Notification.ind`.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationInd {
    pub transaction_id: String,
    pub from: Option<String>,
    pub subject: Option<String>,
    pub class: Option<MessageClass>,
    pub size: Option<u64>,
    pub expiry: Option<Expiry>,
    pub content_location: String,
}

/// `M-NotifyResp.ind` status values reported to the MMSC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyRespStatus {
    Retrieved,
    Rejected,
    Deferred,
    Unrecognised,
}

impl NotifyRespStatus {
    fn to_wire(self) -> u8 {
        match self {
            NotifyRespStatus::Retrieved => 128,
            NotifyRespStatus::Rejected => 129,
            NotifyRespStatus::Deferred => 130,
            NotifyRespStatus::Unrecognised => 131,
        }
    }

    fn from_wire(v: u8) -> Self {
        match v {
            128 => NotifyRespStatus::Retrieved,
            130 => NotifyRespStatus::Deferred,
            131 => NotifyRespStatus::Unrecognised,
            _ => NotifyRespStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotifyRespInd {
    pub transaction_id: String,
    pub status: NotifyRespStatus,
}

/// `M-Retrieve.conf`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveConf {
    pub transaction_id: String,
    pub message_id: Option<String>,
    pub from: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject: Option<String>,
    pub date: Option<u64>,
    pub priority: Option<Priority>,
    pub class: Option<MessageClass>,
    /// Non-zero Retrieve-Status indicates an MMSC-reported retrieve error
    ///.
    pub retrieve_status: u8,
    pub retrieve_text: Option<String>,
    pub read_report_requested: bool,
    pub content_type: content_type::ContentType,
    pub body: MultipartBody,
}

/// `M-Acknowledge.ind`.
#[derive(Debug, Clone, PartialEq)]
pub struct AcknowledgeInd {
    pub transaction_id: String,
    pub report_allowed: bool,
}

/// `M-Delivery.ind`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryInd {
    pub message_id: String,
    pub to: Vec<String>,
    pub date: Option<u64>,
    pub status: u8,
}

/// `M-Read-Rec.ind` / `M-Read-Orig.ind`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadRecInd {
    pub message_id: String,
    pub to: String,
    pub from: Option<String>,
    pub date: Option<u64>,
    pub read_status: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadOrigInd {
    pub message_id: String,
    pub from: Option<String>,
    pub read_status: u8,
}

/// `M-Send.req`.
#[derive(Debug, Clone, PartialEq)]
pub struct SendReq {
    pub transaction_id: String,
    pub from: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: Option<String>,
    pub class: Option<MessageClass>,
    pub priority: Option<Priority>,
    pub delivery_report: Option<bool>,
    pub read_report: Option<bool>,
    pub content_type: content_type::ContentType,
    pub body: MultipartBody,
}

/// `M-Send.conf`.
#[derive(Debug, Clone, PartialEq)]
pub struct SendConf {
    pub transaction_id: String,
    pub response_status: ResponseStatus,
    pub response_text: Option<String>,
    pub message_id: Option<String>,
}

/// The top-level decoded PDU, tagged by `Message-Type`.
#[derive(Debug, Clone, PartialEq)]
pub enum Pdu {
    SendReq(SendReq),
    SendConf(SendConf),
    NotificationInd(NotificationInd),
    NotifyRespInd(NotifyRespInd),
    RetrieveConf(RetrieveConf),
    AcknowledgeInd(AcknowledgeInd),
    DeliveryInd(DeliveryInd),
    ReadRecInd(ReadRecInd),
    ReadOrigInd(ReadOrigInd),
}

impl Pdu {
    pub fn message_type(&self) -> MessageType {
        match self {
            Pdu::SendReq(_) => MessageType::SendReq,
            Pdu::SendConf(_) => MessageType::SendConf,
            Pdu::NotificationInd(_) => MessageType::NotificationInd,
            Pdu::NotifyRespInd(_) => MessageType::NotifyRespInd,
            Pdu::RetrieveConf(_) => MessageType::RetrieveConf,
            Pdu::AcknowledgeInd(_) => MessageType::AcknowledgeInd,
            Pdu::DeliveryInd(_) => MessageType::DeliveryInd,
            Pdu::ReadRecInd(_) => MessageType::ReadRecInd,
            Pdu::ReadOrigInd(_) => MessageType::ReadOrigInd,
        }
    }
}

/// Generic header accumulator: preserves insertion order and the
/// multiply-present-for-list-fields rule.
#[derive(Default)]
struct HeaderBag {
    entries: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderBag {
    fn decode(dec: &mut Decoder, stop_before_content_type_body: bool) -> DecodeResult<Self> {
        let mut bag = HeaderBag::default();
        while !dec.is_empty() {
            if stop_before_content_type_body && dec.peek_u8()? == (HeaderName::ContentType.wire_id() | 0x80) {
                break;
            }
            let (name, value, _app_name) = headers::decode_header(dec)?;
            if let HeaderName::Unknown(_) = name {
                continue; // application header we don't model; skip.
            }
            if bag.entries.iter().any(|(n, _)| *n == name) && !name.allows_multiple() {
                continue; // first occurrence wins.
            }
            bag.entries.push((name, value));
        }
        Ok(bag)
    }

    fn get(&self, name: HeaderName) -> Option<&HeaderValue> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    fn get_all_text(&self, name: HeaderName) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(n, _)| *n == name)
            .filter_map(|(_, v)| match v {
                HeaderValue::Text(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    fn text(&self, name: HeaderName) -> Option<String> {
        match self.get(name) {
            Some(HeaderValue::Text(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// `From` is never a plain text header on the wire: it carries an
    /// address-present/insert-address token. An absent header and an
    /// explicit insert-address both surface as `None` here.
    fn from_addr(&self) -> Option<String> {
        match self.get(HeaderName::From) {
            Some(HeaderValue::From(opt)) => opt.clone(),
            _ => None,
        }
    }

    fn short(&self, name: HeaderName) -> Option<u8> {
        match self.get(name) {
            Some(HeaderValue::Short(b)) => Some(*b),
            _ => None,
        }
    }

    fn long(&self, name: HeaderName) -> Option<u64> {
        match self.get(name) {
            Some(HeaderValue::Long(v)) => Some(*v),
            Some(HeaderValue::Date(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Decodes a full MMS PDU from `buf` (post WAP-push-header, if any).
pub fn decode(buf: &[u8]) -> DecodeResult<Pdu> {
    let mut dec = Decoder::new(buf);
    let (name, value, _) = headers::decode_header(&mut dec)?;
    if name != HeaderName::MessageType {
        return Err(DecodeError::MissingHeader("Message-Type"));
    }
    let type_byte = match value {
        HeaderValue::Short(b) => b,
        _ => return Err(DecodeError::MissingHeader("Message-Type")),
    };
    let msg_type = MessageType::from_wire(type_byte)
        .map_err(|_| DecodeError::UnsupportedMessageType(type_byte))?;

    match msg_type {
        MessageType::NotificationInd => decode_notification_ind(&mut dec).map(Pdu::NotificationInd),
        MessageType::NotifyRespInd => decode_notify_resp_ind(&mut dec).map(Pdu::NotifyRespInd),
        MessageType::RetrieveConf => decode_retrieve_conf(&mut dec).map(Pdu::RetrieveConf),
        MessageType::AcknowledgeInd => decode_acknowledge_ind(&mut dec).map(Pdu::AcknowledgeInd),
        MessageType::DeliveryInd => decode_delivery_ind(&mut dec).map(Pdu::DeliveryInd),
        MessageType::ReadRecInd => decode_read_rec_ind(&mut dec).map(Pdu::ReadRecInd),
        MessageType::ReadOrigInd => decode_read_orig_ind(&mut dec).map(Pdu::ReadOrigInd),
        MessageType::SendReq => decode_send_req(&mut dec).map(Pdu::SendReq),
        MessageType::SendConf => decode_send_conf(&mut dec).map(Pdu::SendConf),
        MessageType::ForwardReq | MessageType::ForwardConf => {
            Err(DecodeError::UnsupportedMessageType(type_byte))
        }
    }
}

/// Encodes a full MMS PDU.
pub fn encode(pdu: &Pdu) -> EncodeResult<Vec<u8>> {
    let mut enc = Encoder::new();
    match pdu {
        Pdu::SendReq(p) => encode_send_req(&mut enc, p)?,
        Pdu::SendConf(p) => encode_send_conf(&mut enc, p),
        Pdu::NotificationInd(p) => encode_notification_ind(&mut enc, p),
        Pdu::NotifyRespInd(p) => encode_notify_resp_ind(&mut enc, p),
        Pdu::RetrieveConf(p) => encode_retrieve_conf(&mut enc, p)?,
        Pdu::AcknowledgeInd(p) => encode_acknowledge_ind(&mut enc, p),
        Pdu::DeliveryInd(p) => encode_delivery_ind(&mut enc, p),
        Pdu::ReadRecInd(p) => encode_read_rec_ind(&mut enc, p),
        Pdu::ReadOrigInd(p) => encode_read_orig_ind(&mut enc, p),
    }
    Ok(enc.into_bytes())
}

fn write_message_type(enc: &mut Encoder, mt: MessageType) {
    headers::encode_header(enc, HeaderName::MessageType, &HeaderValue::Short(mt.to_wire()));
}

fn write_text_header(enc: &mut Encoder, name: HeaderName, value: &str) {
    headers::encode_header(enc, name, &HeaderValue::Text(value.to_string()));
}

fn write_list_header(enc: &mut Encoder, name: HeaderName, values: &[String]) {
    for v in values {
        write_text_header(enc, name, v);
    }
}

// --- M-Notification.ind ---

fn decode_notification_ind(dec: &mut Decoder) -> DecodeResult<NotificationInd> {
    let bag = HeaderBag::decode(dec, false)?;
    let transaction_id = bag
        .text(HeaderName::TransactionId)
        .ok_or(DecodeError::MissingHeader("Transaction-Id"))?;
    let content_location = bag
        .text(HeaderName::ContentLocation)
        .ok_or(DecodeError::MissingHeader("Content-Location"))?;
    let class = bag.short(HeaderName::MessageClass).and_then(|v| MessageClass::from_wire(v).ok());
    let expiry = match bag.get(HeaderName::Expiry) {
        Some(HeaderValue::Date(v)) => Some(Expiry::Absolute(*v)),
        Some(HeaderValue::Long(v)) => Some(Expiry::Relative(*v)),
        _ => None,
    };
    Ok(NotificationInd {
        transaction_id,
        from: bag.from_addr(),
        subject: bag.text(HeaderName::Subject),
        class,
        size: bag.long(HeaderName::MessageSize),
        expiry,
        content_location,
    })
}

fn encode_notification_ind(enc: &mut Encoder, p: &NotificationInd) {
    write_message_type(enc, MessageType::NotificationInd);
    write_text_header(enc, HeaderName::TransactionId, &p.transaction_id);
    headers::encode_header(
        enc,
        HeaderName::MmsVersion,
        &HeaderValue::Short((MMS_VERSION.0 << 4) | MMS_VERSION.1),
    );
    if p.from.is_some() {
        headers::encode_header(enc, HeaderName::From, &HeaderValue::From(p.from.clone()));
    }
    if let Some(subject) = &p.subject {
        write_text_header(enc, HeaderName::Subject, subject);
    }
    if let Some(class) = p.class {
        headers::encode_header(enc, HeaderName::MessageClass, &HeaderValue::Short(class.to_wire()));
    }
    if let Some(size) = p.size {
        headers::encode_header(enc, HeaderName::MessageSize, &HeaderValue::Long(size));
    }
    match p.expiry {
        Some(Expiry::Relative(d)) => headers::encode_relative_expiry_header(enc, d),
        Some(Expiry::Absolute(t)) => headers::encode_absolute_date_header(enc, HeaderName::Expiry, t),
        None => {}
    }
    write_text_header(enc, HeaderName::ContentLocation, &p.content_location);
}

// --- M-NotifyResp.ind ---

fn decode_notify_resp_ind(dec: &mut Decoder) -> DecodeResult<NotifyRespInd> {
    let bag = HeaderBag::decode(dec, false)?;
    let transaction_id = bag
        .text(HeaderName::TransactionId)
        .ok_or(DecodeError::MissingHeader("Transaction-Id"))?;
    let status = bag
        .short(HeaderName::Status)
        .map(NotifyRespStatus::from_wire)
        .unwrap_or(NotifyRespStatus::Rejected);
    Ok(NotifyRespInd { transaction_id, status })
}

fn encode_notify_resp_ind(enc: &mut Encoder, p: &NotifyRespInd) {
    write_message_type(enc, MessageType::NotifyRespInd);
    write_text_header(enc, HeaderName::TransactionId, &p.transaction_id);
    headers::encode_header(
        enc,
        HeaderName::MmsVersion,
        &HeaderValue::Short((MMS_VERSION.0 << 4) | MMS_VERSION.1),
    );
    headers::encode_header(enc, HeaderName::Status, &HeaderValue::Short(p.status.to_wire()));
}

// --- M-Retrieve.conf ---

fn decode_retrieve_conf(dec: &mut Decoder) -> DecodeResult<RetrieveConf> {
    let bag = HeaderBag::decode(dec, true)?;
    let transaction_id = bag
        .text(HeaderName::TransactionId)
        .ok_or(DecodeError::MissingHeader("Transaction-Id"))?;
    let priority = bag.short(HeaderName::Priority).and_then(|v| Priority::from_wire(v).ok());
    let class = bag.short(HeaderName::MessageClass).and_then(|v| MessageClass::from_wire(v).ok());
    let read_report_requested = bag
        .short(HeaderName::ReadReport)
        .map(|v| v == crate::enums::WapBool::Yes.to_wire())
        .unwrap_or(false);
    let retrieve_status = bag.short(HeaderName::RetrieveStatus).unwrap_or(0x80);

    // Content-Type header: either well-known short-integer or a
    // value-length-prefixed string with parameters.
    if dec.is_empty() || dec.peek_u8()? != (HeaderName::ContentType.wire_id() | 0x80) {
        return Err(DecodeError::MissingHeader("Content-Type"));
    }
    dec.read_u8()?;
    let content_type = crate::multipart::decode_content_type_field(dec)?;
    let body = crate::multipart::decode_body(dec, &content_type)?;

    Ok(RetrieveConf {
        transaction_id,
        message_id: bag.text(HeaderName::MessageId),
        from: bag.from_addr(),
        to: bag.get_all_text(HeaderName::To),
        cc: bag.get_all_text(HeaderName::Cc),
        subject: bag.text(HeaderName::Subject),
        date: bag.long(HeaderName::Date),
        priority,
        class,
        retrieve_status,
        retrieve_text: bag.text(HeaderName::RetrieveText),
        read_report_requested,
        content_type,
        body,
    })
}

fn encode_retrieve_conf(enc: &mut Encoder, p: &RetrieveConf) -> EncodeResult<()> {
    write_message_type(enc, MessageType::RetrieveConf);
    write_text_header(enc, HeaderName::TransactionId, &p.transaction_id);
    headers::encode_header(
        enc,
        HeaderName::MmsVersion,
        &HeaderValue::Short((MMS_VERSION.0 << 4) | MMS_VERSION.1),
    );
    if let Some(date) = p.date {
        headers::encode_header(enc, HeaderName::Date, &HeaderValue::Long(date));
    }
    if p.from.is_some() {
        headers::encode_header(enc, HeaderName::From, &HeaderValue::From(p.from.clone()));
    }
    write_list_header(enc, HeaderName::To, &p.to);
    write_list_header(enc, HeaderName::Cc, &p.cc);
    if let Some(subject) = &p.subject {
        write_text_header(enc, HeaderName::Subject, subject);
    }
    if let Some(priority) = p.priority {
        headers::encode_header(enc, HeaderName::Priority, &HeaderValue::Short(priority.to_wire()));
    }
    if let Some(msgid) = &p.message_id {
        write_text_header(enc, HeaderName::MessageId, msgid);
    }
    headers::encode_header(
        enc,
        HeaderName::RetrieveStatus,
        &HeaderValue::Short(p.retrieve_status),
    );
    if let Some(text) = &p.retrieve_text {
        write_text_header(enc, HeaderName::RetrieveText, text);
    }
    enc.write_u8(HeaderName::ContentType.wire_id() | 0x80);
    crate::multipart::encode_content_type_field(enc, &p.content_type);
    crate::multipart::encode_body(enc, &p.content_type, &p.body)
        .map_err(|_| EncodeError::InvalidCombination("multipart body"))?;
    Ok(())
}

// --- M-Acknowledge.ind ---

fn decode_acknowledge_ind(dec: &mut Decoder) -> DecodeResult<AcknowledgeInd> {
    let bag = HeaderBag::decode(dec, false)?;
    let transaction_id = bag
        .text(HeaderName::TransactionId)
        .ok_or(DecodeError::MissingHeader("Transaction-Id"))?;
    let report_allowed = bag
        .short(HeaderName::ReportAllowed)
        .map(|v| v == crate::enums::WapBool::Yes.to_wire())
        .unwrap_or(false);
    Ok(AcknowledgeInd {
        transaction_id,
        report_allowed,
    })
}

fn encode_acknowledge_ind(enc: &mut Encoder, p: &AcknowledgeInd) {
    write_message_type(enc, MessageType::AcknowledgeInd);
    write_text_header(enc, HeaderName::TransactionId, &p.transaction_id);
    headers::encode_header(
        enc,
        HeaderName::MmsVersion,
        &HeaderValue::Short((MMS_VERSION.0 << 4) | MMS_VERSION.1),
    );
    let v = crate::enums::WapBool::from_bool(p.report_allowed).to_wire();
    headers::encode_header(enc, HeaderName::ReportAllowed, &HeaderValue::Short(v));
}

// --- M-Delivery.ind ---

fn decode_delivery_ind(dec: &mut Decoder) -> DecodeResult<DeliveryInd> {
    let bag = HeaderBag::decode(dec, false)?;
    Ok(DeliveryInd {
        message_id: bag
            .text(HeaderName::MessageId)
            .ok_or(DecodeError::MissingHeader("Message-ID"))?,
        to: bag.get_all_text(HeaderName::To),
        date: bag.long(HeaderName::Date),
        status: bag.short(HeaderName::Status).unwrap_or(0),
    })
}

fn encode_delivery_ind(enc: &mut Encoder, p: &DeliveryInd) {
    write_message_type(enc, MessageType::DeliveryInd);
    write_text_header(enc, HeaderName::MessageId, &p.message_id);
    write_list_header(enc, HeaderName::To, &p.to);
    if let Some(date) = p.date {
        headers::encode_header(enc, HeaderName::Date, &HeaderValue::Long(date));
    }
    headers::encode_header(enc, HeaderName::Status, &HeaderValue::Short(p.status));
}

// --- M-Read-Rec.ind / M-Read-Orig.ind ---

fn decode_read_rec_ind(dec: &mut Decoder) -> DecodeResult<ReadRecInd> {
    let bag = HeaderBag::decode(dec, false)?;
    Ok(ReadRecInd {
        message_id: bag
            .text(HeaderName::MessageId)
            .ok_or(DecodeError::MissingHeader("Message-ID"))?,
        to: bag.text(HeaderName::To).unwrap_or_default(),
        from: bag.from_addr(),
        date: bag.long(HeaderName::Date),
        read_status: bag.short(HeaderName::ReadStatus).unwrap_or(0),
    })
}

fn encode_read_rec_ind(enc: &mut Encoder, p: &ReadRecInd) {
    write_message_type(enc, MessageType::ReadRecInd);
    write_text_header(enc, HeaderName::MessageId, &p.message_id);
    write_text_header(enc, HeaderName::To, &p.to);
    if p.from.is_some() {
        headers::encode_header(enc, HeaderName::From, &HeaderValue::From(p.from.clone()));
    }
    if let Some(date) = p.date {
        headers::encode_header(enc, HeaderName::Date, &HeaderValue::Long(date));
    }
    headers::encode_header(enc, HeaderName::ReadStatus, &HeaderValue::Short(p.read_status));
}

fn decode_read_orig_ind(dec: &mut Decoder) -> DecodeResult<ReadOrigInd> {
    let bag = HeaderBag::decode(dec, false)?;
    Ok(ReadOrigInd {
        message_id: bag
            .text(HeaderName::MessageId)
            .ok_or(DecodeError::MissingHeader("Message-ID"))?,
        from: bag.from_addr(),
        read_status: bag.short(HeaderName::ReadStatus).unwrap_or(0),
    })
}

fn encode_read_orig_ind(enc: &mut Encoder, p: &ReadOrigInd) {
    write_message_type(enc, MessageType::ReadOrigInd);
    write_text_header(enc, HeaderName::MessageId, &p.message_id);
    if p.from.is_some() {
        headers::encode_header(enc, HeaderName::From, &HeaderValue::From(p.from.clone()));
    }
    headers::encode_header(enc, HeaderName::ReadStatus, &HeaderValue::Short(p.read_status));
}

// --- M-Send.req ---

fn decode_send_req(dec: &mut Decoder) -> DecodeResult<SendReq> {
    let bag = HeaderBag::decode(dec, true)?;
    let transaction_id = bag
        .text(HeaderName::TransactionId)
        .ok_or(DecodeError::MissingHeader("Transaction-Id"))?;
    let class = bag.short(HeaderName::MessageClass).and_then(|v| MessageClass::from_wire(v).ok());
    let priority = bag.short(HeaderName::Priority).and_then(|v| Priority::from_wire(v).ok());
    let delivery_report = bag
        .short(HeaderName::DeliveryReport)
        .map(|v| v == crate::enums::WapBool::Yes.to_wire());
    let read_report = bag
        .short(HeaderName::ReadReport)
        .map(|v| v == crate::enums::WapBool::Yes.to_wire());

    if dec.is_empty() || dec.peek_u8()? != (HeaderName::ContentType.wire_id() | 0x80) {
        return Err(DecodeError::MissingHeader("Content-Type"));
    }
    dec.read_u8()?;
    let content_type = crate::multipart::decode_content_type_field(dec)?;
    let body = crate::multipart::decode_body(dec, &content_type)?;

    Ok(SendReq {
        transaction_id,
        from: bag.from_addr(),
        to: bag.get_all_text(HeaderName::To),
        cc: bag.get_all_text(HeaderName::Cc),
        bcc: bag.get_all_text(HeaderName::Bcc),
        subject: bag.text(HeaderName::Subject),
        class,
        priority,
        delivery_report,
        read_report,
        content_type,
        body,
    })
}

fn encode_send_req(enc: &mut Encoder, p: &SendReq) -> EncodeResult<()> {
    if p.to.is_empty() {
        return Err(EncodeError::InvalidCombination("Send.req requires a non-empty To"));
    }
    write_message_type(enc, MessageType::SendReq);
    write_text_header(enc, HeaderName::TransactionId, &p.transaction_id);
    headers::encode_header(
        enc,
        HeaderName::MmsVersion,
        &HeaderValue::Short((MMS_VERSION.0 << 4) | MMS_VERSION.1),
    );
    // From is mandatory on Send.req; sending no address at all asks the
    // MMSC to fill in the subscriber's own (insert-address).
    headers::encode_header(enc, HeaderName::From, &HeaderValue::From(p.from.clone()));
    write_list_header(enc, HeaderName::To, &p.to);
    write_list_header(enc, HeaderName::Cc, &p.cc);
    write_list_header(enc, HeaderName::Bcc, &p.bcc);
    if let Some(subject) = &p.subject {
        write_text_header(enc, HeaderName::Subject, subject);
    }
    if let Some(class) = p.class {
        headers::encode_header(enc, HeaderName::MessageClass, &HeaderValue::Short(class.to_wire()));
    }
    if let Some(priority) = p.priority {
        headers::encode_header(enc, HeaderName::Priority, &HeaderValue::Short(priority.to_wire()));
    }
    if let Some(dr) = p.delivery_report {
        let v = crate::enums::WapBool::from_bool(dr).to_wire();
        headers::encode_header(enc, HeaderName::DeliveryReport, &HeaderValue::Short(v));
    }
    if let Some(rr) = p.read_report {
        let v = crate::enums::WapBool::from_bool(rr).to_wire();
        headers::encode_header(enc, HeaderName::ReadReport, &HeaderValue::Short(v));
    }
    enc.write_u8(HeaderName::ContentType.wire_id() | 0x80);
    crate::multipart::encode_content_type_field(enc, &p.content_type);
    crate::multipart::encode_body(enc, &p.content_type, &p.body)
        .map_err(|_| EncodeError::InvalidCombination("multipart body"))?;
    Ok(())
}

// --- M-Send.conf ---

fn decode_send_conf(dec: &mut Decoder) -> DecodeResult<SendConf> {
    let bag = HeaderBag::decode(dec, false)?;
    let transaction_id = bag
        .text(HeaderName::TransactionId)
        .ok_or(DecodeError::MissingHeader("Transaction-Id"))?;
    let response_status = bag
        .short(HeaderName::ResponseStatus)
        .map(|v| ResponseStatus::from_wire(v as u32))
        .ok_or(DecodeError::MissingHeader("Response-Status"))?;
    Ok(SendConf {
        transaction_id,
        response_status,
        response_text: bag.text(HeaderName::ResponseText),
        message_id: bag.text(HeaderName::MessageId),
    })
}

fn encode_send_conf(enc: &mut Encoder, p: &SendConf) {
    write_message_type(enc, MessageType::SendConf);
    write_text_header(enc, HeaderName::TransactionId, &p.transaction_id);
    headers::encode_header(
        enc,
        HeaderName::MmsVersion,
        &HeaderValue::Short((MMS_VERSION.0 << 4) | MMS_VERSION.1),
    );
    let status_byte = p.response_status.to_wire().min(0xFF) as u8;
    headers::encode_header(enc, HeaderName::ResponseStatus, &HeaderValue::Short(status_byte));
    if let Some(text) = &p.response_text {
        write_text_header(enc, HeaderName::ResponseText, text);
    }
    if let Some(msgid) = &p.message_id {
        write_text_header(enc, HeaderName::MessageId, msgid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multipart::Part;

    #[test]
    fn notification_ind_round_trip() {
        let pdu = Pdu::NotificationInd(NotificationInd {
            transaction_id: "Ad0b9pXNC".to_string(),
            from: Some("+1234567890/TYPE=PLMN".to_string()),
            subject: Some("hello".to_string()),
            class: Some(MessageClass::Personal),
            size: Some(12345),
            expiry: Some(Expiry::Relative(259199)),
            content_location: "http://mmsc.example/get?id=1".to_string(),
        });
        let bytes = encode(&pdu).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, pdu);
    }

    #[test]
    fn acknowledge_ind_round_trip() {
        let pdu = Pdu::AcknowledgeInd(AcknowledgeInd {
            transaction_id: "tx1".into(),
            report_allowed: true,
        });
        let bytes = encode(&pdu).unwrap();
        assert_eq!(decode(&bytes).unwrap(), pdu);
    }

    #[test]
    fn send_conf_ok_with_message_id() {
        let pdu = Pdu::SendConf(SendConf {
            transaction_id: "tx2".into(),
            response_status: ResponseStatus::Ok,
            response_text: None,
            message_id: Some("TestMessageId".into()),
        });
        let bytes = encode(&pdu).unwrap();
        let Pdu::SendConf(decoded) = decode(&bytes).unwrap() else {
            panic!("expected SendConf");
        };
        assert!(decoded.response_status.is_ok());
        assert_eq!(decoded.message_id.as_deref(), Some("TestMessageId"));
    }

    #[test]
    fn send_conf_refused_with_text() {
        let pdu = Pdu::SendConf(SendConf {
            transaction_id: "tx3".into(),
            response_status: ResponseStatus::ErrorServiceDenied,
            response_text: Some("Unable to send".into()),
            message_id: None,
        });
        let bytes = encode(&pdu).unwrap();
        let Pdu::SendConf(decoded) = decode(&bytes).unwrap() else {
            panic!("expected SendConf");
        };
        assert_eq!(decoded.response_text.as_deref(), Some("Unable to send"));
    }

    #[test]
    fn read_rec_ind_round_trip() {
        let pdu = Pdu::ReadRecInd(ReadRecInd {
            message_id: "MessageID".into(),
            to: "+358501111111/TYPE=PLMN".into(),
            from: None,
            date: Some(1_700_000_000),
            read_status: crate::enums::ReadStatus::READ_STATUS_READ,
        });
        let bytes = encode(&pdu).unwrap();
        assert_eq!(decode(&bytes).unwrap(), pdu);
    }

    #[test]
    fn send_req_round_trip_with_multipart() {
        let body = MultipartBody {
            parts: vec![Part {
                content_type: content_type::ContentType::new("text", "plain")
                    .with_param("charset", "utf-8"),
                content_id: Some("<0>".into()),
                content_location: Some("text.txt".into()),
                content_disposition: None,
                content_transfer_encoding: None,
                data: b"hello world".to_vec(),
            }],
        };
        let pdu = Pdu::SendReq(SendReq {
            transaction_id: "tx4".into(),
            from: None,
            to: vec!["+1234567890".into()],
            cc: vec![],
            bcc: vec![],
            subject: None,
            class: None,
            priority: None,
            delivery_report: None,
            read_report: None,
            content_type: content_type::ContentType::new("multipart", "mixed")
                .with_param("boundary", "b1"),
            body,
        });
        let bytes = encode(&pdu).unwrap();
        let Pdu::SendReq(decoded) = decode(&bytes).unwrap() else {
            panic!("expected SendReq");
        };
        assert_eq!(decoded.to, vec!["+1234567890".to_string()]);
        assert_eq!(decoded.body.parts.len(), 1);
        assert_eq!(decoded.body.parts[0].data, b"hello world");
    }

    #[test]
    fn send_req_rejects_empty_to() {
        let pdu = SendReq {
            transaction_id: "tx5".into(),
            from: None,
            to: vec![],
            cc: vec![],
            bcc: vec![],
            subject: None,
            class: None,
            priority: None,
            delivery_report: None,
            read_report: None,
            content_type: content_type::ContentType::new("text", "plain"),
            body: MultipartBody { parts: vec![] },
        };
        let mut enc = Encoder::new();
        assert!(encode_send_req(&mut enc, &pdu).is_err());
    }
}
