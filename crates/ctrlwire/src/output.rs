use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use ctrlwire_client::CommandReply;
use ctrlwire_frame::Message;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    kind: &'static str,
    #[serde(flatten)]
    message: &'a Message,
    peer: &'a str,
    timestamp: String,
}

/// Print the verified reply to a GET or SET.
pub fn print_reply(reply: &CommandReply, peer: &str, format: OutputFormat) {
    match format {
        OutputFormat::Raw => {
            print_raw(reply.raw.as_ref());
            println!();
        }
        _ => print_message("reply", &reply.message, peer, format),
    }
}

/// Print one TRAP pushed by the peer.
pub fn print_notification(message: &Message, peer: &str, format: OutputFormat) {
    match format {
        OutputFormat::Raw => println!("{message}"),
        _ => print_message("notification", message, peer, format),
    }
}

fn print_message(kind: &'static str, message: &Message, peer: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                kind,
                message,
                peer,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "VERB", "VARIABLE", "VALUE", "PEER"])
                .add_row(vec![
                    message.id.clone(),
                    message.verb.to_string(),
                    message.variable.clone(),
                    message.value.clone().unwrap_or_default(),
                    peer.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{kind}: id={} verb={} variable={} value={} peer={}",
                message.id,
                message.verb,
                message.variable,
                message.value.as_deref().unwrap_or("-"),
                peer
            );
        }
        OutputFormat::Raw => println!("{message}"),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
