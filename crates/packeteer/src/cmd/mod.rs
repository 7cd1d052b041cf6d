use clap::{Args, Subcommand};
use std::path::PathBuf;

use packeteer_frame::reserved;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode one frame and write it to a file or stdout.
    Encode(EncodeArgs),
    /// Scan a capture for frames and print them.
    Decode(DecodeArgs),
    /// List reserved type ids.
    Reserved,
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args),
        Command::Decode(args) => decode::run(args, format),
        Command::Reserved => {
            crate::output::print_reserved(format);
            Ok(crate::exit::SUCCESS)
        }
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Type id: an integer or a reserved name such as AUDIO_TYPE.
    #[arg(long, allow_hyphen_values = true, value_parser = parse_type_id)]
    pub id: i32,
    /// Sub-id string (at most 255 UTF-8 bytes).
    #[arg(long)]
    pub sub_id: Option<String>,
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
    /// Set the unreliable transport hint.
    #[arg(long)]
    pub unreliable: bool,
    /// Let readers accept this frame even if its payload checksum fails.
    #[arg(long)]
    pub ignore_body_crc: bool,
    /// Timestamp in epoch milliseconds. Default: now.
    #[arg(long, allow_hyphen_values = true)]
    pub timestamp: Option<i64>,
    /// Write the frame here instead of stdout. Appends if the file exists.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file to scan. Default: stdin.
    pub input: Option<PathBuf>,
    /// Only print frames with these type ids (comma-separated).
    #[arg(long, value_delimiter = ',', value_parser = parse_type_id)]
    pub ids: Option<Vec<i32>>,
    /// Stop after printing N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_type_id(input: &str) -> Result<i32, String> {
    if let Some(id) = reserved::lookup(input) {
        return Ok(id);
    }
    input
        .parse()
        .map_err(|_| format!("expected an integer or reserved name, got `{input}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_id_accepts_numbers_and_names() {
        assert_eq!(parse_type_id("42"), Ok(42));
        assert_eq!(parse_type_id("-2147483648"), Ok(i32::MIN));
        assert_eq!(parse_type_id("CONTAINER_TYPE"), Ok(reserved::CONTAINER_TYPE));
        assert!(parse_type_id("bogus").is_err());
    }
}
