//! In-process `Handler`/`ConnMan` stand-ins: enough
//! to drive the dispatcher from the command line without a real
//! message store or connection manager behind them.

use async_trait::async_trait;
use mms_core::{Connection, ConnectionKind, ConnMan, DeliveryStatus, Handler, Message, NotifyDecision, ReadReportStatus, ReceiveState, SendState, SettingsStore, SimSettings};

pub struct ConsoleHandler;

#[async_trait]
impl Handler for ConsoleHandler {
    async fn message_notify(&self, imsi: &str, from: Option<&str>, subject: Option<&str>, expiry_epoch_secs: u64, _push_bytes: &[u8]) -> Result<NotifyDecision, String> {
        log::info!(target: "mms-cli", "notification on {imsi} from {from:?} subject {subject:?}, expires {expiry_epoch_secs}");
        Ok(NotifyDecision::Accept(format!("rx-{expiry_epoch_secs}")))
    }

    async fn message_received(&self, msg: &Message) -> Result<(), String> {
        println!("received message {} from {:?}: {} part(s) in {}", msg.id, msg.from, msg.parts.len(), msg.parts_dir.display());
        Ok(())
    }

    async fn message_receive_state_changed(&self, id: &str, state: ReceiveState) {
        log::info!(target: "mms-cli", "{id}: {state:?}");
    }

    async fn message_send_state_changed(&self, id: &str, state: SendState, details: Option<&str>) {
        match details {
            Some(d) => log::info!(target: "mms-cli", "{id}: {state:?} ({d})"),
            None => log::info!(target: "mms-cli", "{id}: {state:?}"),
        }
    }

    async fn message_sent(&self, id: &str, message_id: &str) {
        println!("{id}: sent, Message-ID {message_id}");
    }

    async fn delivery_report(&self, imsi: &str, message_id: &str, recipient: &str, status: DeliveryStatus) {
        log::info!(target: "mms-cli", "{imsi}: delivery report for {message_id} to {recipient}: {status:?}");
    }

    async fn read_report(&self, imsi: &str, message_id: &str, recipient: &str, status: ReadReportStatus) {
        log::info!(target: "mms-cli", "{imsi}: read report for {message_id} from {recipient}: {status:?}");
    }
}

/// Opens a connection directly from CLI-supplied coordinates, skipping
/// real bearer activation and any separate connection-broker service.
pub struct DirectConnMan {
    pub imsi: String,
    pub mmsc_url: String,
    pub mmsproxy: String,
    pub netif: String,
}

#[async_trait]
impl ConnMan for DirectConnMan {
    fn default_imsi(&self) -> Option<String> {
        Some(self.imsi.clone())
    }

    async fn open_connection(&self, imsi: &str, _kind: ConnectionKind) -> Option<Connection> {
        let mut conn = Connection::new(imsi, self.mmsc_url.clone(), self.mmsproxy.clone(), self.netif.clone());
        conn.advance(mms_core::ConnectionState::Open);
        Some(conn)
    }
}

/// A settings store that hands back one CLI-supplied `SimSettings` for
/// every IMSI, since a one-shot invocation has no per-subscriber store
/// to consult.
pub struct FixedSettingsStore(pub SimSettings);

#[async_trait]
impl SettingsStore for FixedSettingsStore {
    async fn settings(&self, _imsi: &str) -> SimSettings {
        self.0.clone()
    }
}
