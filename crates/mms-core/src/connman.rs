//! `ConnMan` — the bearer/connection-manager collaborator. Out of
//! scope for this crate beyond this trait: obtaining a cellular data
//! context, the MMSC URL/proxy, and the local interface to bind to.

use async_trait::async_trait;

use crate::connection::Connection;

/// Which kind of bearer activation the caller prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    Auto,
    User,
}

#[async_trait]
pub trait ConnMan: Send + Sync {
    /// The IMSI to use when the caller didn't specify one, or `None`
    /// if no SIM is available.
    fn default_imsi(&self) -> Option<String>;

    /// Requests a bearer for `imsi`. `Ok(None)` means the bearer could
    /// not be obtained (e.g. SIM absent); the dispatcher treats that as
    /// `on-network-unavailable(can_retry=false)` for the head task.
    async fn open_connection(&self, imsi: &str, kind: ConnectionKind) -> Option<Connection>;

    /// Whether the connection manager has outstanding work, consulted
    /// by the dispatcher's idle/`done` signalling.
    fn is_busy(&self) -> bool {
        false
    }
}
