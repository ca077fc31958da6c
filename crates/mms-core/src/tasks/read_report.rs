//! Read-Report task: POSTs M-Read-Rec.ind.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mms_codec::enums::ReadStatus;
use mms_codec::pdu::{Pdu, ReadRecInd};

use crate::config::{Config, SettingsStore};
use crate::connection::Connection;
use crate::dispatcher::EventSink;
use crate::http_task;
use crate::task::{Task, TaskBase, TaskPriority, TaskState};
use crate::transfer::NullTransferList;

/// Mirrors the Handler's [`crate::handler::ReadReportStatus`] onto the
/// wire's Read-Status values: `Read` -> `READ_STATUS_READ`, `Deleted`
/// -> `READ_STATUS_DELETED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadDisposition {
    Read,
    Deleted,
}

pub struct ReadReportTask {
    base: TaskBase,
    message_id: String,
    to: String,
    mmsc_url: String,
    disposition: ReadDisposition,
    settings: Arc<dyn SettingsStore>,
}

impl ReadReportTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        imsi: impl Into<String>,
        message_id: String,
        to: String,
        disposition: ReadDisposition,
        mmsc_url: String,
        config: &Config,
        settings: Arc<dyn SettingsStore>,
        order: u64,
    ) -> Self {
        Self {
            base: TaskBase::new(format!("read-report-{order}"), imsi, TaskPriority::Normal, order, Duration::from_secs(120), config.retry_secs),
            message_id,
            to,
            mmsc_url,
            disposition,
            settings,
        }
    }
}

#[async_trait]
impl Task for ReadReportTask {
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
        let read_status = match self.disposition {
            ReadDisposition::Read => ReadStatus::Read.to_wire(),
            ReadDisposition::Deleted => ReadStatus::Deleted.to_wire(),
        };
        let pdu = ReadRecInd {
            message_id: self.message_id.clone(),
            to: crate::addr::normalise(&self.to),
            from: None,
            date: Some(std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs()),
            read_status,
        };
        let bytes = match mms_codec::pdu::encode(&Pdu::ReadRecInd(pdu)) {
            Ok(b) => b,
            Err(_) => {
                self.base.transition(TaskState::Done, events);
                return;
            }
        };
        let sim = self.settings.settings(&self.base.imsi).await;
        let sent = http_task::post(conn, &self.mmsc_url, bytes, &sim, &NullTransferList, &self.base.id).await;
        match sent {
            Ok(_) => self.base.transition(TaskState::Done, events),
            Err(e) if e.is_retryable() => self.base.retry(events),
            Err(_) => self.base.transition(TaskState::Done, events),
        }
    }
}
