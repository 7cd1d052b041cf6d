use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use packeteer_frame::{reserved, Frame};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
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
struct FrameOutput<'a> {
    flags: String,
    unreliable: bool,
    ignore_body_crc: bool,
    type_id: i32,
    reserved_name: Option<&'a str>,
    sub_id: Option<&'a str>,
    timestamp: i64,
    payload_size: usize,
    payload: String,
}

impl<'a> FrameOutput<'a> {
    fn new(frame: &'a Frame) -> Self {
        Self {
            flags: format!("{:016b}", frame.flags.wire_bits()),
            unreliable: frame.flags.is_unreliable(),
            ignore_body_crc: frame.flags.ignores_body_crc(),
            type_id: frame.type_id,
            reserved_name: reserved::name_of(frame.type_id),
            sub_id: frame.sub_id.as_deref(),
            timestamp: frame.timestamp,
            payload_size: frame.payload.len(),
            payload: payload_preview(frame.payload.as_ref()),
        }
    }
}

/// Print one decoded frame and flush, so a live stream shows it right away.
///
/// Table output has no per-frame form and falls back to pretty.
pub fn print_frame(frame: &Frame, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&FrameOutput::new(frame)),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{frame} payload={}", payload_preview(frame.payload.as_ref()));
        }
        OutputFormat::Raw => print_raw(frame.payload.as_ref()),
    }
    let _ = std::io::stdout().flush();
}

/// Lay out a batch of decoded frames in one table.
pub fn print_frame_table(frames: &[Frame]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["TYPE", "SUB-ID", "FLAGS", "TIMESTAMP", "SIZE", "PAYLOAD"]);
    for frame in frames {
        table.add_row(vec![
            type_label(frame.type_id),
            frame.sub_id.clone().unwrap_or_default(),
            format!("{:016b}", frame.flags.wire_bits()),
            frame.timestamp.to_string(),
            frame.payload.len().to_string(),
            payload_preview(frame.payload.as_ref()),
        ]);
    }
    println!("{table}");
}

#[derive(Serialize)]
struct ReservedOutput<'a> {
    name: &'a str,
    type_id: i32,
    bits: String,
}

pub fn print_reserved(format: OutputFormat) {
    let rows = reserved::RESERVED_IDS.iter().map(|&(name, type_id)| ReservedOutput {
        name,
        type_id,
        bits: reserved::describe(type_id),
    });

    match format {
        OutputFormat::Json => {
            print_json(&rows.collect::<Vec<_>>());
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NAME", "ID", "BITS"]);
            for row in rows {
                table.add_row(vec![row.name.to_string(), row.type_id.to_string(), row.bits]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in rows {
                println!("{} = {} ({})", row.name, row.type_id, row.bits);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn type_label(type_id: i32) -> String {
    match reserved::name_of(type_id) {
        Some(name) => format!("{type_id} ({name})"),
        None => type_id.to_string(),
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
