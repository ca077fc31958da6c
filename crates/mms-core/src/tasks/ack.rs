//! Ack task: POSTs M-Acknowledge.ind. Post-process
//! priority so it runs after the normal-priority work it trails.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mms_codec::pdu::{AcknowledgeInd, Pdu};

use crate::config::{Config, SettingsStore};
use crate::connection::Connection;
use crate::dispatcher::EventSink;
use crate::http_task;
use crate::task::{Task, TaskBase, TaskPriority, TaskState};
use crate::transfer::NullTransferList;

pub struct AckTask {
    base: TaskBase,
    record_id: String,
    transaction_id: String,
    mmsc_url: String,
    config: Arc<Config>,
    settings: Arc<dyn SettingsStore>,
}

impl AckTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(imsi: impl Into<String>, record_id: String, transaction_id: String, mmsc_url: String, config: Arc<Config>, settings: Arc<dyn SettingsStore>, order: u64) -> Self {
        Self {
            base: TaskBase::new(format!("ack-{record_id}"), imsi, TaskPriority::PostProcess, order, Duration::from_secs(120), config.retry_secs),
            record_id,
            transaction_id,
            mmsc_url,
            config,
            settings,
        }
    }
}

#[async_trait]
impl Task for AckTask {
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
        let sim = self.settings.settings(&self.base.imsi).await;
        let ack = AcknowledgeInd {
            transaction_id: self.transaction_id.clone(),
            report_allowed: sim.allow_dr,
        };
        let bytes = match mms_codec::pdu::encode(&Pdu::AcknowledgeInd(ack)) {
            Ok(b) => b,
            Err(_) => {
                self.base.transition(TaskState::Done, events);
                return;
            }
        };

        if self.config.keep_temp_files {
            let path = self.config.message_dir(&self.record_id).join("m-acknowledge.ind");
            let _ = tokio::fs::write(&path, &bytes).await;
        }

        let sent = http_task::post(conn, &self.mmsc_url, bytes, &sim, &NullTransferList, &self.record_id).await;
        match sent {
            Ok(_) => self.base.transition(TaskState::Done, events),
            Err(e) if e.is_retryable() => self.base.retry(events),
            Err(_) => self.base.transition(TaskState::Done, events),
        }
    }
}
