//! The single-threaded cooperative scheduler: one
//! task drains an mpsc channel and is the only place allowed to touch
//! the active `Connection` or run task logic.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::sleep_until;

use crate::connection::{Connection, ConnectionState};
use crate::connman::{ConnMan, ConnectionKind};
use crate::handler::Handler;
use crate::task::{Task, TaskState};
use crate::transfer::TransferList;

/// Everything a [`Task`] or the dispatcher's own subsystems post back
/// onto the event-loop thread.
pub enum DispatcherEvent {
    TaskStateChanged(String),
    ScheduleWakeup { task_id: String, at: Instant },
    Enqueue(Box<dyn Task>),
    Cancel(Option<String>),
    ConnectionOpened(Connection),
    ConnectionFailed(String),
}

/// What a [`Task`] posts events through. Kept as a trait (rather than
/// exposing the raw `UnboundedSender`) so unit tests can assert on
/// posted events without running a real dispatcher.
pub trait EventSink: Send + Sync {
    fn post(&self, event: DispatcherEvent);
}

impl EventSink for UnboundedSender<DispatcherEvent> {
    fn post(&self, event: DispatcherEvent) {
        let _ = self.send(event);
    }
}

/// A no-op sink for tasks exercised outside a running dispatcher.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn post(&self, _event: DispatcherEvent) {}
}

/// The host process callback fired once the dispatcher has nothing
/// left to do.
pub trait DispatcherDelegate: Send + Sync {
    fn done(&self);
}

/// Composite sort key implementing the six ordering rules,
/// most-significant rule first. Smaller sorts first.
fn sort_key(task: &dyn Task, conn: Option<&Connection>) -> (u8, u8, u8, u8, u64) {
    let state = task.base().state();
    let conn_open = conn.is_some_and(|c| c.is_open());

    // Rule 1: transmitting tasks stay ahead of everything while a
    // connection is open, so in-flight I/O is never preempted.
    let transmit_key = if conn_open && state == TaskState::Transmitting { 0 } else { 1 };

    // Rule 2: normal priority before post-process.
    let priority_key = task.base().priority as u8;

    // Rule 3: when the connection is open, tasks needing its IMSI sort
    // ahead of tasks needing a different one. Not applicable (and thus
    // neutral) to tasks that don't need a connection at all.
    let imsi_key = match (conn, state.needs_connection()) {
        (Some(c), true) if conn_open => {
            if task.base().imsi == c.imsi {
                0
            } else {
                1
            }
        }
        _ => 0,
    };

    // Rules 4 + 5 collapse into one ordinal: runnable work sorts ahead
    // of work waiting on a connection, which sorts ahead of everything
    // else still blocked (Working/Pending/Sleep, or Transmitting while
    // no connection is open).
    let category_key = match state {
        TaskState::Ready | TaskState::Done => 0,
        TaskState::NeedConnection | TaskState::NeedUserConnection => 1,
        _ => 2,
    };

    // Rule 6: creation order breaks remaining ties.
    (transmit_key, priority_key, imsi_key, category_key, task.base().order)
}

struct Wakeup {
    at: Instant,
    task_id: String,
}

impl PartialEq for Wakeup {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at
    }
}
impl Eq for Wakeup {}
impl PartialOrd for Wakeup {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Wakeup {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the earliest wakeup pops first.
        other.at.cmp(&self.at)
    }
}

pub struct Dispatcher {
    queue: Vec<Box<dyn Task>>,
    connection: Option<Connection>,
    /// IMSI of the in-flight `open_connection` call, if any. Prevents
    /// `step` from spawning a second attempt while one is still out.
    connecting: Option<String>,
    wakeups: BinaryHeap<Wakeup>,
    idle_secs: u64,
    handler: Arc<dyn Handler>,
    connman: Arc<dyn ConnMan>,
    transfers: Arc<dyn TransferList>,
    delegate: Arc<dyn DispatcherDelegate>,
    events_tx: UnboundedSender<DispatcherEvent>,
    events_rx: UnboundedReceiver<DispatcherEvent>,
}

impl Dispatcher {
    pub fn new(
        idle_secs: u64,
        handler: Arc<dyn Handler>,
        connman: Arc<dyn ConnMan>,
        transfers: Arc<dyn TransferList>,
        delegate: Arc<dyn DispatcherDelegate>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            queue: Vec::new(),
            connection: None,
            connecting: None,
            wakeups: BinaryHeap::new(),
            idle_secs,
            handler,
            connman,
            transfers,
            delegate,
            events_tx,
            events_rx,
        }
    }

    /// A handle tasks and external callers use to post events without
    /// borrowing the dispatcher itself.
    pub fn sink(&self) -> UnboundedSender<DispatcherEvent> {
        self.events_tx.clone()
    }

    pub fn enqueue(&mut self, task: Box<dyn Task>) {
        self.queue.push(task);
    }

    /// Sorts the queue and returns the index of the head task, or `None`
    /// if the queue is empty.
    fn head_index(&self) -> Option<usize> {
        if self.queue.is_empty() {
            return None;
        }
        let conn = self.connection.as_ref();
        let mut indices: Vec<usize> = (0..self.queue.len()).collect();
        indices.sort_by_key(|&i| sort_key(self.queue[i].as_ref(), conn));
        indices.into_iter().next()
    }

    fn cancel_matching(&mut self, id: Option<&str>) {
        let sink = self.events_tx.clone();
        for task in self.queue.iter_mut() {
            if id.is_none_or(|id| task.base().id == id) {
                task.cancel(&sink);
            }
        }
        self.queue.retain(|t| !t.base().state().is_terminal());
        if id.is_none() {
            self.connection = None;
        }
    }

    /// Whether the dispatcher has anything left to do.
    fn is_idle(&self) -> bool {
        self.queue.is_empty()
            && self.connection.is_none()
            && !self.handler.is_busy()
            && !self.connman.is_busy()
    }

    /// One pass: pick and (dis)pose of the head task if it is runnable,
    /// otherwise arrange for a connection. Returns `true` if progress
    /// was made (caller should loop again immediately).
    async fn step(&mut self) -> bool {
        let Some(idx) = self.head_index() else {
            return false;
        };
        let state = self.queue[idx].base().state();

        if state.is_terminal() || state == TaskState::Ready {
            let mut task = self.queue.remove(idx);
            let sink = self.events_tx.clone();
            if state.is_terminal() {
                // already done; drop it.
            } else {
                task.run(&sink).await;
                if !task.base().state().is_terminal() {
                    self.queue.push(task);
                }
            }
            return true;
        }

        if state.needs_connection() {
            let imsi = self.queue[idx].base().imsi.clone();
            if let Some(conn) = &self.connection {
                if conn.matches_imsi(&imsi) && conn.is_open() {
                    let mut task = self.queue.remove(idx);
                    let conn = self.connection.as_ref().unwrap().clone();
                    let sink = self.events_tx.clone();
                    task.transition(TaskState::Transmitting, &sink);
                    task.transmit(&conn, &sink).await;
                    if !task.base().state().is_terminal() {
                        self.queue.push(task);
                    }
                    return true;
                }
                if !conn.matches_imsi(&imsi) {
                    self.connection = None;
                    return true;
                }
                // Same IMSI, connection still opening: nothing to do yet.
                return false;
            }

            if self.connecting.is_some() {
                // An attempt is already out, for this IMSI or another;
                // only one connection is ever open at a time, so wait
                // for it to resolve before starting another.
                return false;
            }

            let kind = if state == TaskState::NeedUserConnection {
                ConnectionKind::User
            } else {
                ConnectionKind::Auto
            };
            self.connecting = Some(imsi.clone());
            let connman = self.connman.clone();
            let sink = self.events_tx.clone();
            tokio::spawn(async move {
                let event = match connman.open_connection(&imsi, kind).await {
                    Some(conn) => DispatcherEvent::ConnectionOpened(conn),
                    None => DispatcherEvent::ConnectionFailed(imsi),
                };
                let _ = sink.send(event);
            });
            return false;
        }

        false
    }

    /// Runs the event loop until `shutdown` is dropped or the channel
    /// is closed. Intended to be spawned as its own `tokio::task`.
    pub async fn run(mut self) {
        loop {
            while self.step().await {}

            if self.is_idle() {
                self.delegate.done();
            }

            let idle_deadline = if self.queue.iter().all(|t| {
                !matches!(
                    t.base().state(),
                    TaskState::NeedConnection | TaskState::NeedUserConnection | TaskState::Transmitting
                )
            }) && self.connection.is_some()
            {
                Some(Instant::now() + Duration::from_secs(self.idle_secs))
            } else {
                None
            };

            let next_wakeup = self.wakeups.peek().map(|w| w.at);

            tokio::select! {
                biased;
                event = self.events_rx.recv() => {
                    let Some(event) = event else { return };
                    self.handle_event(event);
                }
                _ = async { sleep_until(tokio::time::Instant::from_std(next_wakeup.unwrap())).await }, if next_wakeup.is_some() => {
                    if let Some(w) = self.wakeups.pop() {
                        log::trace!(target: "mms-dispatcher", "wakeup fired for task {}", w.task_id);
                        let sink = self.events_tx.clone();
                        if let Some(task) = self.queue.iter_mut().find(|t| t.base().id == w.task_id) {
                            if task.base().state() == TaskState::Sleep {
                                task.base_mut().transition(TaskState::Ready, &sink);
                            }
                        }
                    }
                }
                _ = async { sleep_until(tokio::time::Instant::from_std(idle_deadline.unwrap())).await }, if idle_deadline.is_some() => {
                    self.connection = None;
                }
            }
        }
    }

    fn handle_event(&mut self, event: DispatcherEvent) {
        match event {
            DispatcherEvent::TaskStateChanged(_) => {}
            DispatcherEvent::ScheduleWakeup { task_id, at } => {
                self.wakeups.push(Wakeup { task_id, at });
            }
            DispatcherEvent::Enqueue(task) => self.queue.push(task),
            DispatcherEvent::Cancel(id) => self.cancel_matching(id.as_deref()),
            DispatcherEvent::ConnectionOpened(conn) => {
                self.connecting = None;
                self.connection = Some(conn);
            }
            DispatcherEvent::ConnectionFailed(imsi) => {
                self.connecting = None;
                let sink = self.events_tx.clone();
                for task in self.queue.iter_mut() {
                    if task.base().imsi == imsi && task.base().state().needs_connection() {
                        task.on_network_unavailable(false, &sink);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{TaskBase, TaskPriority};

    struct StubTask(TaskBase);
    #[async_trait::async_trait]
    impl Task for StubTask {
        fn base(&self) -> &TaskBase {
            &self.0
        }
        fn base_mut(&mut self) -> &mut TaskBase {
            &mut self.0
        }
    }

    fn stub(id: &str, imsi: &str, priority: TaskPriority, order: u64, state: TaskState) -> Box<dyn Task> {
        let mut base = TaskBase::new(id, imsi, priority, order, Duration::from_secs(60), 5);
        let sink = NullEventSink;
        // Drive through legal transitions to reach the desired state for the test.
        match state {
            TaskState::Ready => {}
            TaskState::NeedConnection => base.transition(TaskState::NeedConnection, &sink),
            TaskState::Working => base.transition(TaskState::Working, &sink),
            _ => unreachable!("add a transition path for this test state"),
        }
        Box::new(StubTask(base))
    }

    #[test]
    fn runnable_sorts_before_needs_connection_before_others() {
        let a = stub("a", "imsi1", TaskPriority::Normal, 2, TaskState::Working);
        let b = stub("b", "imsi1", TaskPriority::Normal, 1, TaskState::NeedConnection);
        let c = stub("c", "imsi1", TaskPriority::Normal, 0, TaskState::Ready);
        let mut keys: Vec<_> = [&a, &b, &c].iter().map(|t| sort_key(t.as_ref(), None)).collect();
        let sorted = {
            let mut k = keys.clone();
            k.sort();
            k
        };
        keys.sort();
        assert_eq!(keys, sorted);
        assert!(sort_key(c.as_ref(), None) < sort_key(b.as_ref(), None));
        assert!(sort_key(b.as_ref(), None) < sort_key(a.as_ref(), None));
    }

    #[test]
    fn matching_imsi_sorts_before_other_imsi_when_connection_open() {
        let mut conn = Connection::new("imsi1", "http://mmsc", "", "rmnet0");
        conn.advance(ConnectionState::Open);
        let mine = stub("a", "imsi1", TaskPriority::Normal, 0, TaskState::NeedConnection);
        let other = stub("b", "imsi2", TaskPriority::Normal, 0, TaskState::NeedConnection);
        assert!(sort_key(mine.as_ref(), Some(&conn)) < sort_key(other.as_ref(), Some(&conn)));
    }

    #[test]
    fn creation_order_breaks_ties() {
        let first = stub("a", "imsi1", TaskPriority::Normal, 0, TaskState::Ready);
        let second = stub("b", "imsi1", TaskPriority::Normal, 1, TaskState::Ready);
        assert!(sort_key(first.as_ref(), None) < sort_key(second.as_ref(), None));
    }
}
