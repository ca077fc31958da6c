mod cli;
mod stubs;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands, DumpCmd, SendCmd};
use mms_core::tasks::encode::{EncodeTask, OutgoingRequest};
use mms_core::{attachment::Attachment, Config, Dispatcher, DispatcherDelegate, DispatcherEvent, EventSink, NullTransferList, SettingsStore, SimSettings};

use stubs::{ConsoleHandler, DirectConnMan, FixedSettingsStore};

fn main() {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().expect("failed to build tokio runtime");

    match cli.command {
        Commands::Send(cmd) => rt.block_on(run_send(&cli.root, cli.imsi.as_deref(), cmd)),
        Commands::Dump(cmd) => run_dump(cmd),
    }
}

struct NotifyDone(Arc<tokio::sync::Notify>);

impl DispatcherDelegate for NotifyDone {
    fn done(&self) {
        self.0.notify_one();
    }
}

async fn run_send(root: &std::path::Path, imsi: Option<&str>, cmd: SendCmd) {
    let config = Arc::new(Config {
        root_dir: root.to_path_buf(),
        ..Config::default()
    });
    let sim = SimSettings {
        size_limit: cmd.size_limit,
        ..SimSettings::default()
    };
    let settings: Arc<dyn SettingsStore> = Arc::new(FixedSettingsStore(sim));

    let imsi = imsi.unwrap_or("sim0").to_string();
    let handler = Arc::new(ConsoleHandler);
    let connman = Arc::new(DirectConnMan {
        imsi: imsi.clone(),
        mmsc_url: cmd.mmsc_url.clone(),
        mmsproxy: cmd.proxy.clone(),
        netif: cmd.netif.clone(),
    });
    let transfers = Arc::new(NullTransferList);
    let done = Arc::new(tokio::sync::Notify::new());
    let delegate = Arc::new(NotifyDone(done.clone()));

    let dispatcher = Dispatcher::new(config.network_idle_secs, handler.clone(), connman, transfers, delegate);
    let sink = dispatcher.sink();

    let attachments = cmd
        .attachments
        .iter()
        .map(|spec| match spec.split_once(':') {
            Some((path, ct)) => Attachment {
                path: path.into(),
                content_type: Some(ct.to_string()),
                content_id: None,
            },
            None => Attachment {
                path: spec.into(),
                content_type: None,
                content_id: None,
            },
        })
        .collect();

    let request = OutgoingRequest {
        from: cmd.from,
        to: cmd.to,
        cc: cmd.cc,
        bcc: Vec::new(),
        subject: cmd.subject,
        attachments,
        request_delivery_report: cmd.request_delivery_report,
        request_read_report: cmd.request_read_report,
    };

    let record_id = format!("{:016x}", rand::random::<u64>());
    let encode = EncodeTask::new(imsi, record_id, request, cmd.mmsc_url, config, handler, settings, 0);
    sink.post(DispatcherEvent::Enqueue(Box::new(encode)));

    // The dispatcher's own event loop holds a sender clone for the
    // lifetime of its run(), so it never exits on its own (it is meant
    // to run for as long as the host process wants a bearer ready);
    // for a one-shot CLI invocation, abort it once `done` fires.
    let handle = tokio::spawn(dispatcher.run());
    done.notified().await;
    handle.abort();
    let _ = handle.await;
    drop(sink);
}

fn run_dump(cmd: DumpCmd) {
    let bytes = std::fs::read(&cmd.path).unwrap_or_else(|e| {
        eprintln!("failed to read {}: {e}", cmd.path.display());
        std::process::exit(1);
    });
    let inner = mms_codec::push::unwrap_mms_bytes(&bytes);
    match mms_codec::pdu::decode(inner) {
        Ok(pdu) => println!("{pdu:#?}"),
        Err(e) => {
            eprintln!("failed to decode {}: {e}", cmd.path.display());
            std::process::exit(1);
        }
    }
}
