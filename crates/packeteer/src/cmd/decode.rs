use std::fs::File;
use std::io::Read;

use packeteer_frame::{Frame, FrameError, FrameReader};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_frame, print_frame_table, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(
            File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
        None => Box::new(std::io::stdin().lock()),
    };

    // A table needs every row before it can be laid out.
    let outcome = if format == OutputFormat::Table {
        let mut frames = Vec::new();
        let outcome = scan_frames(input, &args, |frame| frames.push(frame));
        print_frame_table(&frames);
        outcome
    } else {
        scan_frames(input, &args, |frame| print_frame(&frame, format))
    };

    match outcome {
        Ok(_) => Ok(SUCCESS),
        Err(err) => Err(frame_error("decode failed", err)),
    }
}

/// Hand each matching frame to `on_frame` as soon as it is decoded, until the
/// input ends or `--count` is reached. Returns how many frames were handed out.
fn scan_frames<R, F>(input: R, args: &DecodeArgs, mut on_frame: F) -> Result<usize, FrameError>
where
    R: Read,
    F: FnMut(Frame),
{
    let mut reader = FrameReader::buffered(input);
    let mut emitted = 0usize;
    let mut skipped = 0usize;

    for result in reader.frames() {
        let frame = result?;

        if let Some(ids) = &args.ids {
            if !ids.contains(&frame.type_id) {
                skipped = skipped.saturating_add(1);
                continue;
            }
        }

        on_frame(frame);
        emitted += 1;
        if args.count.is_some_and(|count| emitted >= count) {
            break;
        }
    }

    tracing::debug!(emitted, skipped, "scan complete");
    Ok(emitted)
}
