//! The transaction tasks: one module per
//! `Task` implementation, wired together by the `Dispatcher` via
//! `DispatcherEvent::Enqueue`.

pub mod ack;
pub mod decode;
pub mod encode;
pub mod notification;
pub mod publish;
pub mod read_report;
pub mod retrieve;
pub mod send;
