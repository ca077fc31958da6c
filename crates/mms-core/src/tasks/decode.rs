//! Decode task: parses the saved M-Retrieve.conf,
//! lays out parts on disk, and enqueues Ack and Publish tasks.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use memmap2::Mmap;
use mms_codec::pdu::{self, Pdu};

use crate::config::{Config, SettingsStore};
use crate::connection::Connection;
use crate::dispatcher::{DispatcherEvent, EventSink};
use crate::handler::{Handler, ReceiveState};
use crate::store::{dedupe_content_id, dedupe_filename, Message, Part, PartFlags};
use crate::task::{Task, TaskBase, TaskPriority, TaskState};

pub struct DecodeTask {
    base: TaskBase,
    record_id: String,
    transaction_id: String,
    retrieve_conf_path: PathBuf,
    mmsc_url: String,
    config: Arc<Config>,
    handler: Arc<dyn Handler>,
    settings: Arc<dyn SettingsStore>,
}

impl DecodeTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        imsi: impl Into<String>,
        record_id: String,
        transaction_id: String,
        retrieve_conf_path: PathBuf,
        mmsc_url: String,
        config: Arc<Config>,
        handler: Arc<dyn Handler>,
        settings: Arc<dyn SettingsStore>,
        order: u64,
    ) -> Self {
        Self {
            base: TaskBase::new(format!("decode-{record_id}"), imsi, TaskPriority::Normal, order, Duration::from_secs(60), config.retry_secs),
            record_id,
            transaction_id,
            retrieve_conf_path,
            mmsc_url,
            config,
            handler,
            settings,
        }
    }

    async fn decode_and_layout(&self) -> Result<Message, String> {
        let file = std::fs::File::open(&self.retrieve_conf_path).map_err(|e| e.to_string())?;
        // Safety: the file was just written by us and nothing else truncates
        // it out from under the mapping.
        let mmap = unsafe { Mmap::map(&file).map_err(|e| e.to_string())? };

        let parsed = pdu::decode(&mmap[..]).map_err(|e| e.to_string())?;
        let Pdu::RetrieveConf(conf) = parsed else {
            return Err("expected M-Retrieve.conf".to_string());
        };

        if conf.retrieve_status != 128 {
            return Err(format!("MMSC-reported retrieve error {}", conf.retrieve_status));
        }

        let mut msg = Message::new(&self.config.root_dir, &self.record_id);
        msg.message_id = conf.message_id;
        msg.from = conf.from;
        msg.to = conf.to;
        msg.cc = conf.cc;
        msg.subject = conf.subject;
        msg.date = conf.date;
        if let Some(priority) = conf.priority {
            msg.priority = priority;
        }
        if let Some(class) = conf.class {
            msg.class = class;
        }
        msg.read_report_requested = conf.read_report_requested;

        tokio::fs::create_dir_all(&msg.parts_dir).await.map_err(|e| e.to_string())?;

        let mut taken_names = HashSet::new();
        let mut taken_ids = HashSet::new();
        for (i, part) in conf.body.parts.into_iter().enumerate() {
            let proposed_name = part
                .content_location
                .clone()
                .unwrap_or_else(|| format!("part{i}.{}", part.content_type.subtype));
            let file_name = dedupe_filename(&proposed_name, &mut taken_names);
            let proposed_cid = part.content_id.clone().unwrap_or_else(|| file_name.clone());
            let cid = dedupe_content_id(proposed_cid.trim_start_matches('<').trim_end_matches('>'), &mut taken_ids);

            let out_path = msg.parts_dir.join(&file_name);
            let is_encoded = part.content_transfer_encoding.as_deref().is_some_and(|e| !e.eq_ignore_ascii_case("binary") && !e.eq_ignore_ascii_case("8bit"));
            let decoded = if is_encoded {
                decode_transfer_encoding(part.content_transfer_encoding.as_deref().unwrap_or(""), &part.data)
            } else {
                part.data.clone()
            };
            tokio::fs::write(&out_path, &decoded).await.map_err(|e| e.to_string())?;
            let original_path = if is_encoded {
                let orig = msg.parts_dir.join(format!("{file_name}.orig"));
                tokio::fs::write(&orig, &part.data).await.map_err(|e| e.to_string())?;
                Some(orig)
            } else {
                None
            };

            let is_smil = part.content_type.full().eq_ignore_ascii_case("application/smil");
            msg.parts.push(Part {
                content_type: part.content_type.full(),
                content_id: format!("<{cid}>"),
                content_location: part.content_location,
                path: out_path,
                original_encoded_path: original_path,
                flags: PartFlags {
                    smil: is_smil,
                    resizable: part.content_type.full().starts_with("image/"),
                },
            });
        }

        Ok(msg)
    }
}

/// Applies a per-part `Content-Transfer-Encoding`. Unknown
/// encodings pass the bytes through unchanged.
fn decode_transfer_encoding(encoding: &str, data: &[u8]) -> Vec<u8> {
    match encoding.to_ascii_lowercase().as_str() {
        "base64" => {
            let text: String = data.iter().filter(|b| !b.is_ascii_whitespace()).map(|&b| b as char).collect();
            base64_decode(&text).unwrap_or_else(|| data.to_vec())
        }
        _ => data.to_vec(),
    }
}

fn base64_decode(s: &str) -> Option<Vec<u8>> {
    const TABLE: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut rev = [255u8; 256];
    for (i, &c) in TABLE.iter().enumerate() {
        rev[c as usize] = i as u8;
    }
    let clean: Vec<u8> = s.bytes().filter(|&b| b != b'=').collect();
    let mut out = Vec::with_capacity(clean.len() * 3 / 4);
    for chunk in clean.chunks(4) {
        let mut buf = [0u8; 4];
        for (i, &c) in chunk.iter().enumerate() {
            let v = rev[c as usize];
            if v == 255 {
                return None;
            }
            buf[i] = v;
        }
        out.push((buf[0] << 2) | (buf[1] >> 4));
        if chunk.len() > 2 {
            out.push((buf[1] << 4) | (buf[2] >> 2));
        }
        if chunk.len() > 3 {
            out.push((buf[2] << 6) | buf[3]);
        }
    }
    Some(out)
}

#[async_trait]
impl Task for DecodeTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    async fn run(&mut self, events: &dyn EventSink) {
        self.handler.message_receive_state_changed(&self.record_id, ReceiveState::Decoding).await;
        match self.decode_and_layout().await {
            Ok(msg) => {
                let ack = crate::tasks::ack::AckTask::new(
                    &self.base.imsi,
                    self.record_id.clone(),
                    self.transaction_id.clone(),
                    self.mmsc_url.clone(),
                    self.config.clone(),
                    self.settings.clone(),
                    self.base.order + 1,
                );
                let publish = crate::tasks::publish::PublishTask::new(&self.base.imsi, msg, self.handler.clone(), self.base.order + 2);
                events.post(DispatcherEvent::Enqueue(Box::new(ack)));
                events.post(DispatcherEvent::Enqueue(Box::new(publish)));
                self.handler.message_receive_state_changed(&self.record_id, ReceiveState::Downloaded).await;
            }
            Err(_) => {
                self.handler.message_receive_state_changed(&self.record_id, ReceiveState::DownloadError).await;
            }
        }
        self.base.transition(TaskState::Done, events);
    }

    async fn transmit(&mut self, _conn: &Connection, events: &dyn EventSink) {
        self.base.transition(TaskState::Done, events);
    }
}
