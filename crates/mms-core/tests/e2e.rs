//! End-to-end transaction scenarios driven against a minimal in-process
//! HTTP server: real connections over mocks, one request/response
//! exchange at a time, since no HTTP mocking crate is in the
//! dependency stack.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use mms_codec::content_type::ContentType;
use mms_codec::enums::{MessageClass, Priority, ResponseStatus};
use mms_codec::multipart::{MultipartBody, Part as WirePart};
use mms_codec::pdu::{self, Expiry, NotificationInd, Pdu, ReadRecInd, RetrieveConf, SendConf};

use mms_core::attachment::Attachment;
use mms_core::tasks::encode::{EncodeTask, OutgoingRequest};
use mms_core::tasks::notification::NotificationTask;
use mms_core::tasks::read_report::{ReadDisposition, ReadReportTask};
use mms_core::{
    Config, Connection, ConnectionKind, ConnectionState, ConnMan, DefaultSettingsStore, DeliveryStatus, Dispatcher,
    DispatcherDelegate, Handler, Message, NotifyDecision, NullTransferList, ReadReportStatus, ReceiveState, SendState,
    SimSettings,
};

fn unique_root() -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let pid = std::process::id();
    std::env::temp_dir().join(format!("mms-core-e2e-{pid}-{n}"))
}

struct RecordedRequest {
    method: String,
    #[allow(dead_code)]
    path: String,
    body: Vec<u8>,
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length_of(headers: &str) -> usize {
    for line in headers.lines() {
        let lower = line.to_ascii_lowercase();
        if let Some(v) = lower.strip_prefix("content-length:") {
            if let Ok(n) = v.trim().parse() {
                return n;
            }
        }
    }
    0
}

/// Accepts `responses.len()` sequential connections (one request each,
/// `Connection: close`), replying with the matching entry in order, and
/// hands back every request it saw once all have been served.
async fn serve_responses(responses: Vec<Vec<u8>>) -> (String, tokio::task::JoinHandle<Vec<RecordedRequest>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback listener");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        let mut recorded = Vec::new();
        for response_body in responses {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut buf = Vec::new();
            let mut tmp = [0u8; 8192];
            let header_end = loop {
                let n = stream.read(&mut tmp).await.expect("read request");
                buf.extend_from_slice(&tmp[..n]);
                if let Some(pos) = find_header_end(&buf) {
                    break pos;
                }
            };
            let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let first_line = head.lines().next().unwrap_or("").to_string();
            let mut parts = first_line.split_whitespace();
            let method = parts.next().unwrap_or("").to_string();
            let path = parts.next().unwrap_or("").to_string();
            let content_length = content_length_of(&head);
            while buf.len() < header_end + 4 + content_length {
                let n = stream.read(&mut tmp).await.expect("read body");
                buf.extend_from_slice(&tmp[..n]);
            }
            let body = buf[header_end + 4..header_end + 4 + content_length].to_vec();
            let resp = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n", response_body.len());
            stream.write_all(resp.as_bytes()).await.expect("write response headers");
            stream.write_all(&response_body).await.expect("write response body");
            let _ = stream.shutdown().await;
            recorded.push(RecordedRequest { method, path, body });
        }
        recorded
    });
    (format!("http://{addr}"), handle)
}

#[derive(Default)]
struct Recorder {
    receive_states: Mutex<Vec<ReceiveState>>,
    send_states: Mutex<Vec<(SendState, Option<String>)>>,
    published: Mutex<Vec<Message>>,
    sent: Mutex<Vec<(String, String)>>,
    read_reports: Mutex<Vec<ReadReportStatus>>,
}

#[async_trait]
impl Handler for Recorder {
    async fn message_notify(&self, _imsi: &str, _from: Option<&str>, _subject: Option<&str>, _expiry_epoch_secs: u64, _push_bytes: &[u8]) -> Result<NotifyDecision, String> {
        Ok(NotifyDecision::Accept("rx-test".to_string()))
    }

    async fn message_received(&self, msg: &Message) -> Result<(), String> {
        self.published.lock().unwrap().push(msg.clone());
        Ok(())
    }

    async fn message_receive_state_changed(&self, _id: &str, state: ReceiveState) {
        self.receive_states.lock().unwrap().push(state);
    }

    async fn message_send_state_changed(&self, _id: &str, state: SendState, details: Option<&str>) {
        self.send_states.lock().unwrap().push((state, details.map(str::to_string)));
    }

    async fn message_sent(&self, id: &str, message_id: &str) {
        self.sent.lock().unwrap().push((id.to_string(), message_id.to_string()));
    }

    async fn delivery_report(&self, _imsi: &str, _message_id: &str, _recipient: &str, _status: DeliveryStatus) {}

    async fn read_report(&self, _imsi: &str, _message_id: &str, _recipient: &str, status: ReadReportStatus) {
        self.read_reports.lock().unwrap().push(status);
    }
}

struct TestConnMan {
    url: String,
}

#[async_trait]
impl ConnMan for TestConnMan {
    fn default_imsi(&self) -> Option<String> {
        Some("imsi-test".to_string())
    }

    async fn open_connection(&self, imsi: &str, _kind: ConnectionKind) -> Option<Connection> {
        let mut conn = Connection::new(imsi, self.url.clone(), "", "eth-test");
        conn.advance(ConnectionState::Open);
        Some(conn)
    }
}

struct FixedSettings(SimSettings);

#[async_trait]
impl mms_core::SettingsStore for FixedSettings {
    async fn settings(&self, _imsi: &str) -> SimSettings {
        self.0.clone()
    }
}

struct NotifyDone(Arc<tokio::sync::Notify>);

impl DispatcherDelegate for NotifyDone {
    fn done(&self) {
        self.0.notify_one();
    }
}

async fn run_until_done(dispatcher: Dispatcher, done: Arc<tokio::sync::Notify>) {
    let handle = tokio::spawn(dispatcher.run());
    tokio::time::timeout(Duration::from_secs(5), done.notified())
        .await
        .expect("dispatcher did not reach idle before the test timeout");
    handle.abort();
}

fn test_config(root: PathBuf) -> Arc<Config> {
    Arc::new(Config {
        root_dir: root,
        retry_secs: 1,
        ..Config::default()
    })
}

fn build_retrieve_conf_bytes() -> Vec<u8> {
    let conf = RetrieveConf {
        transaction_id: "tx-retrieve".to_string(),
        message_id: Some("ServerAssignedId".to_string()),
        from: Some("+15551234567/TYPE=PLMN".to_string()),
        to: vec!["+358501111111/TYPE=PLMN".to_string()],
        cc: Vec::new(),
        subject: Some("hello".to_string()),
        date: Some(1_700_000_000),
        priority: Some(Priority::Normal),
        class: Some(MessageClass::Personal),
        retrieve_status: 128,
        retrieve_text: None,
        read_report_requested: false,
        content_type: ContentType::new("multipart", "mixed"),
        body: MultipartBody {
            parts: vec![WirePart {
                content_type: ContentType::new("text", "plain"),
                content_id: Some("<part1>".to_string()),
                content_location: Some("text1.txt".to_string()),
                content_disposition: None,
                content_transfer_encoding: None,
                data: b"hi there".to_vec(),
            }],
        },
    };
    pdu::encode(&Pdu::RetrieveConf(conf)).expect("encode m-retrieve.conf")
}

/// Scenario: "Receive OK" — a notification is
/// accepted, retrieved, decoded, acknowledged, and published.
#[tokio::test(flavor = "multi_thread")]
async fn receive_ok_publishes_message_and_sends_ack() {
    let root = unique_root();
    let config = test_config(root.clone());
    let handler = Arc::new(Recorder::default());

    let retrieve_conf_bytes = build_retrieve_conf_bytes();
    let (base_url, server) = serve_responses(vec![
        Vec::new(),              // M-NotifyResp.ind POST response
        retrieve_conf_bytes,     // GET of the content-location
        Vec::new(),              // M-Acknowledge.ind POST response
    ])
    .await;

    let connman = Arc::new(TestConnMan { url: base_url.clone() });
    let transfers = Arc::new(NullTransferList);
    let done = Arc::new(tokio::sync::Notify::new());
    let delegate = Arc::new(NotifyDone(done.clone()));
    let dispatcher = Dispatcher::new(1, handler.clone(), connman, transfers, delegate);
    let sink = dispatcher.sink();

    let notification = NotificationInd {
        transaction_id: "tx-notify".to_string(),
        from: Some("+15551234567/TYPE=PLMN".to_string()),
        subject: Some("hello".to_string()),
        class: Some(MessageClass::Personal),
        size: Some(8),
        expiry: Some(Expiry::Relative(300)),
        content_location: format!("{base_url}/retrieve"),
    };
    let push_bytes = pdu::encode(&Pdu::NotificationInd(notification)).expect("encode notification");

    let settings = Arc::new(DefaultSettingsStore);
    let task = NotificationTask::new("imsi-test", push_bytes, base_url, config, handler.clone(), settings, 0);
    mms_core::EventSink::post(&sink, mms_core::DispatcherEvent::Enqueue(Box::new(task)));

    run_until_done(dispatcher, done).await;
    let requests = server.await.expect("server task");

    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[2].method, "POST");

    let published = handler.published.lock().unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].subject.as_deref(), Some("hello"));
    assert_eq!(published[0].parts.len(), 1);
    assert!(published[0].parts[0].path.exists());

    let receive_states = handler.receive_states.lock().unwrap();
    assert!(receive_states.contains(&ReceiveState::Downloaded));

    let Pdu::AcknowledgeInd(ack) = pdu::decode(&requests[2].body).expect("decode ack") else {
        panic!("expected AcknowledgeInd");
    };
    assert_eq!(ack.transaction_id, "tx-retrieve");
}

/// Scenario: "Send OK" — encode, POST, and a successful M-Send.conf.
#[tokio::test(flavor = "multi_thread")]
async fn send_ok_reports_sent_with_message_id() {
    let root = unique_root();
    let config = test_config(root.clone());
    let handler = Arc::new(Recorder::default());

    let attach_dir = root.join("attachments");
    std::fs::create_dir_all(&attach_dir).unwrap();
    let text_path = attach_dir.join("note.txt");
    std::fs::write(&text_path, b"plain text body").unwrap();

    let send_conf = SendConf {
        transaction_id: "tx-send".to_string(),
        response_status: ResponseStatus::Ok,
        response_text: None,
        message_id: Some("ServerAssignedId".to_string()),
    };
    let send_conf_bytes = pdu::encode(&Pdu::SendConf(send_conf)).expect("encode send conf");
    let (base_url, server) = serve_responses(vec![send_conf_bytes]).await;

    let connman = Arc::new(TestConnMan { url: base_url.clone() });
    let transfers = Arc::new(NullTransferList);
    let done = Arc::new(tokio::sync::Notify::new());
    let delegate = Arc::new(NotifyDone(done.clone()));
    let dispatcher = Dispatcher::new(1, handler.clone(), connman, transfers, delegate);
    let sink = dispatcher.sink();

    let request = OutgoingRequest {
        from: None,
        to: vec!["+358501111111".to_string()],
        cc: Vec::new(),
        bcc: Vec::new(),
        subject: Some("hi".to_string()),
        attachments: vec![Attachment {
            path: text_path,
            content_type: Some("text/plain".to_string()),
            content_id: None,
        }],
        request_delivery_report: false,
        request_read_report: false,
    };

    let settings = Arc::new(DefaultSettingsStore);
    let encode = EncodeTask::new("imsi-test", "rec-send-ok".to_string(), request, base_url, config, handler.clone(), settings, 0);
    mms_core::EventSink::post(&sink, mms_core::DispatcherEvent::Enqueue(Box::new(encode)));

    run_until_done(dispatcher, done).await;
    let requests = server.await.expect("server task");

    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");

    let sent = handler.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, "ServerAssignedId");
}

/// Scenario: "Send refused" — M-Send.conf comes back with a refusal
/// status, which must be reported as `Refused`, not `SendError`.
#[tokio::test(flavor = "multi_thread")]
async fn send_refused_reports_refused_not_send_error() {
    let root = unique_root();
    let config = test_config(root.clone());
    let handler = Arc::new(Recorder::default());

    let attach_dir = root.join("attachments");
    std::fs::create_dir_all(&attach_dir).unwrap();
    let text_path = attach_dir.join("note.txt");
    std::fs::write(&text_path, b"plain text body").unwrap();

    let send_conf = SendConf {
        transaction_id: "tx-refuse".to_string(),
        response_status: ResponseStatus::ErrorServiceDenied,
        response_text: Some("Unable to send".to_string()),
        message_id: None,
    };
    let send_conf_bytes = pdu::encode(&Pdu::SendConf(send_conf)).expect("encode send conf");
    let (base_url, server) = serve_responses(vec![send_conf_bytes]).await;

    let connman = Arc::new(TestConnMan { url: base_url.clone() });
    let transfers = Arc::new(NullTransferList);
    let done = Arc::new(tokio::sync::Notify::new());
    let delegate = Arc::new(NotifyDone(done.clone()));
    let dispatcher = Dispatcher::new(1, handler.clone(), connman, transfers, delegate);
    let sink = dispatcher.sink();

    let request = OutgoingRequest {
        from: None,
        to: vec!["+358501111111".to_string()],
        cc: Vec::new(),
        bcc: Vec::new(),
        subject: None,
        attachments: vec![Attachment {
            path: text_path,
            content_type: Some("text/plain".to_string()),
            content_id: None,
        }],
        request_delivery_report: false,
        request_read_report: false,
    };

    let settings = Arc::new(DefaultSettingsStore);
    let encode = EncodeTask::new("imsi-test", "rec-refused".to_string(), request, base_url, config, handler.clone(), settings, 0);
    mms_core::EventSink::post(&sink, mms_core::DispatcherEvent::Enqueue(Box::new(encode)));

    run_until_done(dispatcher, done).await;
    let _ = server.await.expect("server task");

    let send_states = handler.send_states.lock().unwrap();
    assert!(send_states.iter().any(|(s, d)| *s == SendState::Refused && d.as_deref() == Some("Unable to send")));
    assert!(!send_states.iter().any(|(s, _)| *s == SendState::SendError));
}

/// Scenario: "Send too big" — the encoded PDU exceeds the per-IMSI size
/// limit and nothing resizable brings it under, so Encode reports
/// `TooBig` and never reaches the network.
#[tokio::test(flavor = "multi_thread")]
async fn send_too_big_never_touches_the_network() {
    let root = unique_root();
    let config = test_config(root.clone());
    let handler = Arc::new(Recorder::default());

    let attach_dir = root.join("attachments");
    std::fs::create_dir_all(&attach_dir).unwrap();
    let text_path = attach_dir.join("note.txt");
    std::fs::write(&text_path, vec![b'x'; 4096]).unwrap();

    let connman = Arc::new(TestConnMan { url: "http://127.0.0.1:1".to_string() });
    let transfers = Arc::new(NullTransferList);
    let done = Arc::new(tokio::sync::Notify::new());
    let delegate = Arc::new(NotifyDone(done.clone()));
    let dispatcher = Dispatcher::new(1, handler.clone(), connman, transfers, delegate);
    let sink = dispatcher.sink();

    let mut sim = SimSettings::default();
    sim.size_limit = 16;

    let request = OutgoingRequest {
        from: None,
        to: vec!["+358501111111".to_string()],
        cc: Vec::new(),
        bcc: Vec::new(),
        subject: None,
        attachments: vec![Attachment {
            path: text_path,
            content_type: Some("text/plain".to_string()),
            content_id: None,
        }],
        request_delivery_report: false,
        request_read_report: false,
    };

    let settings = Arc::new(FixedSettings(sim));
    let encode = EncodeTask::new("imsi-test", "rec-too-big".to_string(), request, "http://127.0.0.1:1".to_string(), config, handler.clone(), settings, 0);
    mms_core::EventSink::post(&sink, mms_core::DispatcherEvent::Enqueue(Box::new(encode)));

    run_until_done(dispatcher, done).await;

    let send_states = handler.send_states.lock().unwrap();
    assert!(send_states.iter().any(|(s, _)| *s == SendState::TooBig));
    assert!(handler.sent.lock().unwrap().is_empty());
}

/// Scenario: "Read report" — the posted `M-Read-Rec.ind`'s `To` field
/// must carry `/TYPE=PLMN`, matching what `normalise_address` already
/// does for outgoing recipients.
#[tokio::test(flavor = "multi_thread")]
async fn read_report_normalises_to_address() {
    let root = unique_root();
    let config = test_config(root.clone());
    let handler = Arc::new(Recorder::default());

    let (base_url, server) = serve_responses(vec![Vec::new()]).await;

    let connman = Arc::new(TestConnMan { url: base_url.clone() });
    let transfers = Arc::new(NullTransferList);
    let done = Arc::new(tokio::sync::Notify::new());
    let delegate = Arc::new(NotifyDone(done.clone()));
    let dispatcher = Dispatcher::new(1, handler.clone(), connman, transfers, delegate);
    let sink = dispatcher.sink();

    let task = ReadReportTask::new(
        "imsi-test",
        "MessageID".to_string(),
        "+358501111111".to_string(),
        ReadDisposition::Read,
        base_url,
        &config,
        Arc::new(DefaultSettingsStore),
        0,
    );
    mms_core::EventSink::post(&sink, mms_core::DispatcherEvent::Enqueue(Box::new(task)));

    run_until_done(dispatcher, done).await;
    let requests = server.await.expect("server task");

    assert_eq!(requests.len(), 1);
    let Pdu::ReadRecInd(ReadRecInd { to, message_id, .. }) = pdu::decode(&requests[0].body).expect("decode read-rec") else {
        panic!("expected ReadRecInd");
    };
    assert_eq!(to, "+358501111111/TYPE=PLMN");
    assert_eq!(message_id, "MessageID");
}
