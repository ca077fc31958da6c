//! Task base: the polymorphic work unit the
//! dispatcher schedules. Dispatch goes through `Box<dyn Task>`, keeping
//! each transaction task's private state private to its module,
//! matching how `mms_task_*.c` each keep a private instance struct
//! behind a common `MMSTask` base.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::connection::Connection;
use crate::dispatcher::{DispatcherEvent, EventSink};

/// `Task.state`. Only `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Ready,
    NeedConnection,
    NeedUserConnection,
    Transmitting,
    Working,
    Pending,
    Sleep,
    Done,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        self == TaskState::Done
    }

    pub fn needs_connection(self) -> bool {
        matches!(self, TaskState::NeedConnection | TaskState::NeedUserConnection)
    }

    /// Whether `self -> next` appears in the transition table. `Done`
    /// never transitions away; every state may transition to `Done`
    /// (cancellation/deadline always applies).
    pub fn can_advance_to(self, next: TaskState) -> bool {
        use TaskState::*;
        if self == Done {
            return false;
        }
        if next == Done {
            return true;
        }
        matches!(
            (self, next),
            (Ready, Working | NeedConnection | NeedUserConnection | Sleep)
                | (NeedConnection, Transmitting | Sleep)
                | (NeedUserConnection, Transmitting | Sleep)
                | (Transmitting, Sleep)
                | (Pending, Ready)
                | (Sleep, Ready)
        )
    }
}

/// `Task.priority`: PostProcess tasks (ack, publish) only matter after
/// the normal-priority work they trail, since their creation order is
/// necessarily larger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskPriority {
    Normal,
    PostProcess,
}

/// Common task bookkeeping, embedded by every concrete task type.
pub struct TaskBase {
    pub id: String,
    pub imsi: String,
    pub priority: TaskPriority,
    pub order: u64,
    state: TaskState,
    deadline: Instant,
    cancelled: bool,
    retry_secs: u64,
}

impl TaskBase {
    pub fn new(id: impl Into<String>, imsi: impl Into<String>, priority: TaskPriority, order: u64, max_lifetime: Duration, retry_secs: u64) -> Self {
        Self {
            id: id.into(),
            imsi: imsi.into(),
            priority,
            order,
            state: TaskState::Ready,
            deadline: Instant::now() + max_lifetime,
            cancelled: false,
            retry_secs,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Tightens the deadline to no later than `at`. Widening is never allowed.
    pub fn cap_deadline(&mut self, at: Instant) {
        if at < self.deadline {
            self.deadline = at;
        }
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    fn set_state(&mut self, next: TaskState, events: &dyn EventSink) {
        if !self.state.can_advance_to(next) {
            log::warn!(target: "mms-task", "task {} illegal transition {:?} -> {:?} ignored", self.id, self.state, next);
            return;
        }
        self.state = next;
        events.post(DispatcherEvent::TaskStateChanged(self.id.clone()));
    }

    pub fn transition(&mut self, next: TaskState, events: &dyn EventSink) {
        self.set_state(next, events);
    }

    /// Schedules a wakeup `retry_secs` in the future, capped at the
    /// remaining time before deadline. If no time remains the task goes
    /// to `Done` and is considered cancelled.
    pub fn retry(&mut self, events: &dyn EventSink) {
        let now = Instant::now();
        if now >= self.deadline {
            self.cancelled = true;
            self.set_state(TaskState::Done, events);
            return;
        }
        let remaining = self.deadline - now;
        let delay = Duration::from_secs(self.retry_secs).min(remaining);
        self.set_state(TaskState::Sleep, events);
        events.post(DispatcherEvent::ScheduleWakeup {
            task_id: self.id.clone(),
            at: now + delay,
        });
    }

    /// Clears pending wakeups and transitions to `Done`, setting the
    /// cancelled flag.
    pub fn cancel(&mut self, events: &dyn EventSink) {
        self.cancelled = true;
        self.set_state(TaskState::Done, events);
    }
}

/// The four-method capability set. Default bodies satisfy tasks that
/// never touch the network.
#[async_trait]
pub trait Task: Send {
    fn base(&self) -> &TaskBase;
    fn base_mut(&mut self) -> &mut TaskBase;

    async fn run(&mut self, events: &dyn EventSink) {
        self.base_mut().transition(TaskState::Done, events);
    }

    async fn transmit(&mut self, _conn: &Connection, events: &dyn EventSink) {
        self.base_mut().transition(TaskState::Done, events);
    }

    fn on_network_unavailable(&mut self, can_retry: bool, events: &dyn EventSink) {
        if can_retry {
            self.base_mut().retry(events);
        } else {
            self.base_mut().cancel(events);
        }
    }

    fn cancel(&mut self, events: &dyn EventSink) {
        self.base_mut().cancel(events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::NullEventSink;

    #[test]
    fn done_is_terminal_and_unreachable_backwards() {
        assert!(TaskState::Done.is_terminal());
        assert!(!TaskState::Done.can_advance_to(TaskState::Ready));
    }

    #[test]
    fn every_state_can_reach_done() {
        for s in [
            TaskState::Ready,
            TaskState::NeedConnection,
            TaskState::NeedUserConnection,
            TaskState::Transmitting,
            TaskState::Working,
            TaskState::Pending,
            TaskState::Sleep,
        ] {
            assert!(s.can_advance_to(TaskState::Done));
        }
    }

    #[test]
    fn working_only_advances_to_done() {
        assert!(TaskState::Working.can_advance_to(TaskState::Done));
        assert!(!TaskState::Working.can_advance_to(TaskState::Ready));
        assert!(!TaskState::Working.can_advance_to(TaskState::Sleep));
    }

    #[test]
    fn retry_past_deadline_cancels_immediately() {
        let mut base = TaskBase::new("t", "imsi1", TaskPriority::Normal, 0, Duration::from_secs(0), 5);
        let sink = NullEventSink;
        base.retry(&sink);
        assert_eq!(base.state(), TaskState::Done);
        assert!(base.cancelled());
    }
}
