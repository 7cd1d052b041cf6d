use std::fs::{self, OpenOptions};
use std::io::Write;

use packeteer_frame::{now_millis, Flags, FrameWriter, FLAG_IGNORE_BODY_CRC, FLAG_UNRELIABLE};

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    let flags = flags_for(&args);
    let timestamp = args.timestamp.unwrap_or_else(now_millis);

    let out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };

    let mut writer = FrameWriter::new(out);
    writer.set_flags(flags);
    writer
        .send_at(args.id, args.sub_id.as_deref(), &payload, timestamp)
        .map_err(|err| frame_error("encode failed", err))?;

    tracing::info!(
        type_id = args.id,
        payload_len = payload.len(),
        timestamp,
        "frame written"
    );
    Ok(SUCCESS)
}

fn flags_for(args: &EncodeArgs) -> Flags {
    Flags::new()
        .with(FLAG_UNRELIABLE, args.unreliable)
        .with(FLAG_IGNORE_BODY_CRC, args.ignore_body_crc)
}

fn resolve_payload(args: &EncodeArgs) -> CliResult<Vec<u8>> {
    if let Some(json) = &args.json {
        serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(json.as_bytes().to_vec());
    }
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}
