//! Retrieve task: GETs the notification's
//! content-location and hands the saved body to a Decode task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::config::{Config, SettingsStore};
use crate::connection::Connection;
use crate::dispatcher::{DispatcherEvent, EventSink};
use crate::handler::{Handler, ReceiveState};
use crate::http_task;
use crate::task::{Task, TaskBase, TaskPriority, TaskState};
use crate::transfer::NullTransferList;

pub struct RetrieveTask {
    base: TaskBase,
    record_id: String,
    transaction_id: String,
    location_url: String,
    mmsc_url: String,
    config: Arc<Config>,
    handler: Arc<dyn Handler>,
    settings: Arc<dyn SettingsStore>,
}

impl RetrieveTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        imsi: impl Into<String>,
        record_id: String,
        transaction_id: String,
        location_url: String,
        mmsc_url: String,
        expiry_epoch_secs: Option<u64>,
        config: Arc<Config>,
        handler: Arc<dyn Handler>,
        settings: Arc<dyn SettingsStore>,
        order: u64,
    ) -> Self {
        let mut base = TaskBase::new(format!("retrieve-{record_id}"), imsi, TaskPriority::Normal, order, Duration::from_secs(300), config.retry_secs);
        if let Some(expiry) = expiry_epoch_secs {
            let now_epoch = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs();
            let remaining = expiry.saturating_sub(now_epoch);
            base.cap_deadline(Instant::now() + Duration::from_secs(remaining));
        }
        Self {
            base,
            record_id,
            transaction_id,
            location_url,
            mmsc_url,
            config,
            handler,
            settings,
        }
    }
}

#[async_trait]
impl Task for RetrieveTask {
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
        self.handler.message_receive_state_changed(&self.record_id, ReceiveState::Receiving).await;
        let sim = self.settings.settings(&self.base.imsi).await;
        let result = http_task::get(conn, &self.location_url, &sim, &NullTransferList, &self.record_id).await;

        match result {
            Ok(resp) => {
                let path = self.config.message_dir(&self.record_id).join("m-retrieve.conf");
                if let Some(parent) = path.parent() {
                    let _ = tokio::fs::create_dir_all(parent).await;
                }
                match tokio::fs::write(&path, &resp.body).await {
                    Ok(()) => {
                        let decode = crate::tasks::decode::DecodeTask::new(
                            &self.base.imsi,
                            self.record_id.clone(),
                            self.transaction_id.clone(),
                            path,
                            self.mmsc_url.clone(),
                            self.config.clone(),
                            self.handler.clone(),
                            self.settings.clone(),
                            self.base.order + 1,
                        );
                        events.post(DispatcherEvent::Enqueue(Box::new(decode)));
                        self.base.transition(TaskState::Done, events);
                    }
                    Err(_) => {
                        self.handler.message_receive_state_changed(&self.record_id, ReceiveState::DownloadError).await;
                        self.base.transition(TaskState::Done, events);
                    }
                }
            }
            Err(e) if e.is_retryable() => {
                self.handler.message_receive_state_changed(&self.record_id, ReceiveState::Deferred).await;
                self.base.retry(events);
            }
            Err(_) => {
                self.handler.message_receive_state_changed(&self.record_id, ReceiveState::DownloadError).await;
                self.base.transition(TaskState::Done, events);
            }
        }
    }
}
