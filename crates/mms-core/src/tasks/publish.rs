//! Publish task: hands the decoded message to
//! the Handler. Post-process priority, never touches the network.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::connection::Connection;
use crate::dispatcher::EventSink;
use crate::handler::Handler;
use crate::store::Message;
use crate::task::{Task, TaskBase, TaskPriority, TaskState};

pub struct PublishTask {
    base: TaskBase,
    msg: Option<Message>,
    handler: Arc<dyn Handler>,
}

impl PublishTask {
    pub fn new(imsi: impl Into<String>, msg: Message, handler: Arc<dyn Handler>, order: u64) -> Self {
        let id = format!("publish-{}", msg.id);
        Self {
            base: TaskBase::new(id, imsi, TaskPriority::PostProcess, order, Duration::from_secs(300), 30),
            msg: Some(msg),
            handler,
        }
    }
}

#[async_trait]
impl Task for PublishTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    async fn run(&mut self, events: &dyn EventSink) {
        let Some(msg) = self.msg.as_ref() else {
            self.base.transition(TaskState::Done, events);
            return;
        };
        match self.handler.message_received(msg).await {
            Ok(()) => self.base.transition(TaskState::Done, events),
            Err(_) => self.base.retry(events),
        }
    }

    async fn transmit(&mut self, _conn: &Connection, events: &dyn EventSink) {
        self.base.transition(TaskState::Done, events);
    }
}
