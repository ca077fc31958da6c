//! `TransferList` — the local RPC surface's progress-reporting
//! collaborator.

/// What kind of transfer progress is being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Send,
    Retrieve,
}

pub trait TransferList: Send + Sync {
    fn transfer_started(&self, id: &str, kind: TransferKind);
    fn transfer_finished(&self, id: &str, kind: TransferKind);
    /// `total == 0` is valid and means the size was unknown up front
    ///.
    fn send_progress(&self, id: &str, kind: TransferKind, sent: u64, total: u64);
    fn receive_progress(&self, id: &str, kind: TransferKind, received: u64, total: u64);
}

/// A [`TransferList`] that drops every event, for callers that don't
/// need progress reporting (tests, `mms-cli` by default).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransferList;

impl TransferList for NullTransferList {
    fn transfer_started(&self, _id: &str, _kind: TransferKind) {}
    fn transfer_finished(&self, _id: &str, _kind: TransferKind) {}
    fn send_progress(&self, _id: &str, _kind: TransferKind, _sent: u64, _total: u64) {}
    fn receive_progress(&self, _id: &str, _kind: TransferKind, _received: u64, _total: u64) {}
}
