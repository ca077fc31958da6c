//! Notification task: decodes an incoming push
//! datagram, asks the Handler what to do with it, replies with
//! M-NotifyResp.ind, and (on accept) hands off to a Retrieve task.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mms_codec::pdu::{self, Expiry, NotificationInd, NotifyRespInd, NotifyRespStatus, Pdu};
use mms_codec::push;

use crate::config::{Config, SettingsStore};
use crate::connection::Connection;
use crate::dispatcher::{DispatcherEvent, EventSink};
use crate::handler::{Handler, NotifyDecision};
use crate::http_task;
use crate::store::Message;
use crate::task::{Task, TaskBase, TaskPriority, TaskState};
use crate::transfer::NullTransferList;

/// Writes an unrecognised push PDU to `<root>/attic/NNN/push.pdu`
/// under the lowest unused `NNN`.
pub async fn attic_store(config: &Config, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let attic_dir = config.attic_dir();
    tokio::fs::create_dir_all(&attic_dir).await?;
    let mut n = 0u32;
    let path = loop {
        let candidate = attic_dir.join(format!("{n:03}"));
        if tokio::fs::metadata(&candidate).await.is_err() {
            break candidate;
        }
        n += 1;
    };
    tokio::fs::create_dir_all(&path).await?;
    let file = path.join("push.pdu");
    tokio::fs::write(&file, bytes).await?;
    Ok(file)
}

enum Outcome {
    /// NotifyResp to send, and whether a Retrieve task should follow.
    Reply {
        resp: NotifyRespInd,
        accept_id: Option<String>,
        expiry: Option<Expiry>,
        location_url: String,
    },
    /// Handled inline (Delivery.ind / Read-Orig.ind), nothing to send.
    Done,
    /// The Handler failed (e.g. a transient store error); retry subject
    /// to the task's deadline rather than reporting Rejected.
    Retry,
}

pub struct NotificationTask {
    base: TaskBase,
    push_bytes: Vec<u8>,
    config: Arc<Config>,
    handler: Arc<dyn Handler>,
    settings: Arc<dyn SettingsStore>,
    mmsc_url: String,
    outcome: Option<Outcome>,
}

impl NotificationTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        imsi: impl Into<String>,
        push_bytes: Vec<u8>,
        mmsc_url: impl Into<String>,
        config: Arc<Config>,
        handler: Arc<dyn Handler>,
        settings: Arc<dyn SettingsStore>,
        order: u64,
    ) -> Self {
        Self {
            base: TaskBase::new(format!("notify-{order}"), imsi, TaskPriority::Normal, order, Duration::from_secs(300), config.retry_secs),
            push_bytes,
            config,
            handler,
            settings,
            mmsc_url: mmsc_url.into(),
            outcome: None,
        }
    }

    async fn decide(&mut self) -> Outcome {
        let bytes = push::unwrap_mms_bytes(&self.push_bytes);
        let pdu = match pdu::decode(bytes) {
            Ok(p) => p,
            Err(_) => {
                if self.config.attic_enabled {
                    let _ = attic_store(&self.config, &self.push_bytes).await;
                }
                return Outcome::Done;
            }
        };

        match pdu {
            Pdu::NotificationInd(n) => self.decide_notification(n).await,
            Pdu::DeliveryInd(d) => {
                let status = mms_codec::enums::DeliveryStatus::from_wire(d.status);
                for to in &d.to {
                    self.handler.delivery_report(&self.base.imsi, &d.message_id, to, status).await;
                }
                Outcome::Done
            }
            Pdu::ReadOrigInd(r) => {
                let status = match r.read_status {
                    v if v == mms_codec::enums::ReadStatus::READ_STATUS_READ => crate::handler::ReadReportStatus::Read,
                    v if v == mms_codec::enums::ReadStatus::READ_STATUS_DELETED => crate::handler::ReadReportStatus::Deleted,
                    _ => crate::handler::ReadReportStatus::Invalid,
                };
                if let Some(from) = &r.from {
                    self.handler.read_report(&self.base.imsi, &r.message_id, from, status).await;
                }
                Outcome::Done
            }
            _ => {
                if self.config.attic_enabled {
                    let _ = attic_store(&self.config, &self.push_bytes).await;
                }
                Outcome::Done
            }
        }
    }

    async fn decide_notification(&mut self, n: NotificationInd) -> Outcome {
        let now = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs();
        let expiry_epoch = n.expiry.map(|e| e.deadline(now)).unwrap_or(now + 300);

        let decision = self
            .handler
            .message_notify(&self.base.imsi, n.from.as_deref(), n.subject.as_deref(), expiry_epoch, &self.push_bytes)
            .await;

        let (status, accept_id) = match decision {
            Ok(NotifyDecision::Accept(id)) => (NotifyRespStatus::Retrieved, Some(id)),
            Ok(NotifyDecision::Defer) => (NotifyRespStatus::Deferred, None),
            Ok(NotifyDecision::Reject) => (NotifyRespStatus::Rejected, None),
            Err(_) => return Outcome::Retry,
        };

        let resp = NotifyRespInd {
            transaction_id: n.transaction_id.clone(),
            status,
        };
        Outcome::Reply {
            resp,
            accept_id,
            expiry: Some(Expiry::Absolute(expiry_epoch)).filter(|_| accept_id.is_some()),
            location_url: n.content_location,
        }
    }
}

#[async_trait]
impl Task for NotificationTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    async fn run(&mut self, events: &dyn EventSink) {
        let outcome = self.decide().await;
        match outcome {
            Outcome::Done => self.base.transition(TaskState::Done, events),
            Outcome::Retry => self.base.retry(events),
            reply @ Outcome::Reply { .. } => {
                self.outcome = Some(reply);
                self.base.transition(TaskState::NeedConnection, events);
            }
        }
    }

    async fn transmit(&mut self, conn: &Connection, events: &dyn EventSink) {
        let Some(Outcome::Reply { resp, accept_id, expiry, location_url }) = self.outcome.take() else {
            self.base.transition(TaskState::Done, events);
            return;
        };

        let transaction_id = resp.transaction_id.clone();
        let bytes = match pdu::encode(&Pdu::NotifyRespInd(resp)) {
            Ok(b) => b,
            Err(_) => {
                self.base.transition(TaskState::Done, events);
                return;
            }
        };

        let sim = self.settings.settings(&self.base.imsi).await;
        let sent = http_task::post(conn, &self.mmsc_url, bytes, &sim, &NullTransferList, &self.base.id).await;

        if let Some(id) = accept_id {
            let expiry_epoch = expiry.map(|e| e.deadline(0));
            let retrieve = crate::tasks::retrieve::RetrieveTask::new(
                &self.base.imsi,
                id,
                transaction_id.clone(),
                location_url,
                self.mmsc_url.clone(),
                expiry_epoch,
                self.config.clone(),
                self.handler.clone(),
                self.settings.clone(),
                self.base.order + 1,
            );
            events.post(DispatcherEvent::Enqueue(Box::new(retrieve)));
        }

        match sent {
            Ok(_) => self.base.transition(TaskState::Done, events),
            Err(e) if e.is_retryable() => self.base.retry(events),
            Err(_) => self.base.transition(TaskState::Done, events),
        }
    }
}

/// Used only when `Message`'s directory-rename step is exercised from
/// tests: computes the temporary push-store path before the Handler
/// assigns a final id.
pub fn temp_dir(config: &Config, order: u64) -> PathBuf {
    Message::dir_for(&config.root_dir, &format!("tmp-{order}"))
}
