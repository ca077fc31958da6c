use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Root storage directory (`<root>/msg`, `<root>/attic`).
    #[arg(long, default_value = "/tmp/mms-cli")]
    pub root: PathBuf,

    /// IMSI to act as; defaults to whatever the connection manager reports.
    #[arg(long)]
    pub imsi: Option<String>,

    /// Increases log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encodes and sends an MMS message (mms-send equivalent).
    Send(SendCmd),
    /// Decodes a raw WSP/MMS PDU file and prints its structure (mms-dump equivalent).
    Dump(DumpCmd),
}

#[derive(Parser, Debug)]
pub struct SendCmd {
    /// MMSC URL to POST the request to.
    #[arg(long)]
    pub mmsc_url: String,
    /// `host:port` of the MMS proxy, if any.
    #[arg(long, default_value = "")]
    pub proxy: String,
    /// Network interface the bearer is bound to.
    #[arg(long, default_value = "rmnet0")]
    pub netif: String,

    /// Recipient address(es).
    #[arg(short = 't', long = "to", required = true)]
    pub to: Vec<String>,
    #[arg(long = "cc")]
    pub cc: Vec<String>,
    #[arg(long)]
    pub subject: Option<String>,
    #[arg(long)]
    pub from: Option<String>,

    /// File(s) to attach; content-type is sniffed unless `path:type` is given.
    #[arg(short = 'a', long = "attach")]
    pub attachments: Vec<String>,

    /// Per-IMSI encoded-PDU size limit in bytes; 0 = unlimited.
    #[arg(long, default_value_t = 0)]
    pub size_limit: u64,

    #[arg(long)]
    pub request_delivery_report: bool,
    #[arg(long)]
    pub request_read_report: bool,
}

#[derive(Parser, Debug)]
pub struct DumpCmd {
    /// Path to a raw WSP/MMS PDU file (push-wrapped or bare).
    pub path: PathBuf,
}
