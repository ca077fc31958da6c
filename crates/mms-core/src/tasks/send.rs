//! Send task: POSTs `m-send.req`, decodes
//! M-Send.conf, and translates its Response-Status into a Handler
//! state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mms_codec::enums::ResponseStatus;
use mms_codec::pdu::Pdu;

use crate::config::{Config, SettingsStore};
use crate::connection::Connection;
use crate::dispatcher::EventSink;
use crate::error::Error;
use crate::handler::{Handler, SendState};
use crate::http_task;
use crate::task::{Task, TaskBase, TaskPriority, TaskState};
use crate::transfer::NullTransferList;

pub struct SendTask {
    base: TaskBase,
    record_id: String,
    req_path: PathBuf,
    mmsc_url: String,
    config: Arc<Config>,
    handler: Arc<dyn Handler>,
    settings: Arc<dyn SettingsStore>,
}

impl SendTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        imsi: impl Into<String>,
        record_id: String,
        req_path: PathBuf,
        mmsc_url: String,
        config: Arc<Config>,
        handler: Arc<dyn Handler>,
        settings: Arc<dyn SettingsStore>,
        order: u64,
    ) -> Self {
        Self {
            base: TaskBase::new(format!("send-{record_id}"), imsi, TaskPriority::Normal, order, Duration::from_secs(180), config.retry_secs),
            record_id,
            req_path,
            mmsc_url,
            config,
            handler,
            settings,
        }
    }
}

/// Response-Status values that the MMSC uses to mean "I won't accept
/// this", mapped to `Refused` rather than `SendError`.
fn is_refusal(status: ResponseStatus) -> bool {
    matches!(
        status,
        ResponseStatus::ErrorServiceDenied
            | ResponseStatus::ErrorPermanentServiceDenied
            | ResponseStatus::ErrorContentNotAccepted
            | ResponseStatus::ErrorPermanentContentNotAccepted
            | ResponseStatus::ErrorUnsupportedMessage
            | ResponseStatus::ErrorPermanentLackOfPrepaid
    )
}

#[async_trait]
impl Task for SendTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    async fn run(&mut self, events: &dyn EventSink) {
        self.base.transition(TaskState::NeedConnection, events);
    }

    async fn transmit(&mut self, conn: &Connection, events: &dyn EventSink) {
        self.handler.message_send_state_changed(&self.record_id, SendState::Sending, None).await;

        let bytes = match tokio::fs::read(&self.req_path).await {
            Ok(b) => b,
            Err(_) => {
                self.handler.message_send_state_changed(&self.record_id, SendState::SendError, Some("m-send.req missing")).await;
                self.base.transition(TaskState::Done, events);
                return;
            }
        };

        let sim = self.settings.settings(&self.base.imsi).await;
        let sent = http_task::post(conn, &self.mmsc_url, bytes, &sim, &NullTransferList, &self.record_id).await;

        let response_body = match sent {
            Ok(resp) => resp.body,
            Err(e) if e.is_retryable() => {
                self.base.retry(events);
                return;
            }
            Err(Error::PermanentHttp { .. }) => {
                self.handler.message_send_state_changed(&self.record_id, SendState::SendError, Some("HTTP error from MMSC")).await;
                self.base.transition(TaskState::Done, events);
                return;
            }
            Err(_) => {
                self.handler.message_send_state_changed(&self.record_id, SendState::SendError, None).await;
                self.base.transition(TaskState::Done, events);
                return;
            }
        };

        let conf = match mms_codec::pdu::decode(&response_body) {
            Ok(Pdu::SendConf(c)) => c,
            _ => {
                self.handler.message_send_state_changed(&self.record_id, SendState::SendError, Some("malformed M-Send.conf")).await;
                self.base.transition(TaskState::Done, events);
                return;
            }
        };

        match (conf.response_status, conf.message_id) {
            (ResponseStatus::Ok, Some(message_id)) if !message_id.is_empty() => {
                self.handler.message_sent(&self.record_id, &message_id).await;
            }
            (ResponseStatus::Ok, _) => {
                self.handler.message_send_state_changed(&self.record_id, SendState::SendError, Some("OK response without a Message-ID")).await;
            }
            (status, _) if is_refusal(status) => {
                self.handler
                    .message_send_state_changed(&self.record_id, SendState::Refused, conf.response_text.as_deref())
                    .await;
            }
            (status, _) if status.is_transient() => {
                self.base.retry(events);
                return;
            }
            (_, _) => {
                self.handler
                    .message_send_state_changed(&self.record_id, SendState::SendError, conf.response_text.as_deref())
                    .await;
            }
        }

        if !self.config.keep_temp_files {
            let _ = tokio::fs::remove_file(&self.req_path).await;
        }
        self.base.transition(TaskState::Done, events);
    }
}
