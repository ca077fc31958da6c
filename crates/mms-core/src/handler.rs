//! `Handler` — the persistent message store collaborator. Deliberately
//! out of scope for this crate: only the narrow interface crosses the
//! boundary, named after `mms_handler.c`'s
//! `MMS_RECEIVE_STATE_*`/`MMS_SEND_STATE_*` constants.

use async_trait::async_trait;

use crate::Message;

/// Reply to `message_notify`: accept-and-download-now, defer, or
/// reject. Modelled as an enum rather than `Option<String>` so call
/// sites can't confuse "empty id" with "no reply".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyDecision {
    /// Accept now; download under this record id.
    Accept(String),
    /// Defer; no download is started yet.
    Defer,
    /// Reject; a NotifyResp with status=Rejected is sent.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveState {
    Receiving,
    Decoding,
    Downloaded,
    DownloadError,
    Deferred,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendState {
    Encoding,
    Sending,
    Sent,
    SendError,
    Refused,
    TooBig,
    Draft,
}

/// The three read-status outcomes a received M-Read-Orig.ind can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadReportStatus {
    Read,
    Deleted,
    /// Neither `READ_STATUS_READ` nor `READ_STATUS_DELETED` was on the
    /// wire.
    Invalid,
}

pub use mms_codec::enums::DeliveryStatus;

/// The message store. Every method is a callback the engine invokes;
/// the Handler owns persistence and replies asynchronously.
#[async_trait]
pub trait Handler: Send + Sync {
    /// A push datagram decoded to M-Notification.ind. Returns the
    /// decision described by [`NotifyDecision`], or `Err` on a store
    /// failure (retried by the caller subject to deadline).
    async fn message_notify(
        &self,
        imsi: &str,
        from: Option<&str>,
        subject: Option<&str>,
        expiry_epoch_secs: u64,
        push_bytes: &[u8],
    ) -> Result<NotifyDecision, String>;

    async fn message_received(&self, msg: &Message) -> Result<(), String>;

    async fn message_receive_state_changed(&self, id: &str, state: ReceiveState);

    async fn message_send_state_changed(&self, id: &str, state: SendState, details: Option<&str>);

    async fn message_sent(&self, id: &str, message_id: &str);

    async fn delivery_report(&self, imsi: &str, message_id: &str, recipient: &str, status: DeliveryStatus);

    async fn read_report(&self, imsi: &str, message_id: &str, recipient: &str, status: ReadReportStatus);

    /// Whether the store has outstanding work, consulted by the
    /// dispatcher's idle/`done` signalling.
    fn is_busy(&self) -> bool {
        false
    }
}
