//! Engine crate for the client side of the MMS/WSP protocol: a
//! single-threaded cooperative dispatcher that drives a queue of
//! transaction tasks over at most one bearer connection at a time.

pub mod addr;
pub mod attachment;
pub mod config;
pub mod connection;
pub mod connman;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod http_task;
pub mod store;
pub mod task;
pub mod tasks;
pub mod transfer;

pub use config::{Config, DefaultSettingsStore, SettingsStore, SimSettings};
pub use connection::{Connection, ConnectionState};
pub use connman::{ConnMan, ConnectionKind};
pub use dispatcher::{Dispatcher, DispatcherDelegate, DispatcherEvent, EventSink, NullEventSink};
pub use error::{Error, Result};
pub use handler::{DeliveryStatus, Handler, NotifyDecision, ReadReportStatus, ReceiveState, SendState};
pub use store::{Message, Part, PartFlags};
pub use task::{Task, TaskBase, TaskPriority, TaskState};
pub use transfer::{NullTransferList, TransferKind, TransferList};
