use std::cell::RefCell;
use std::io::Read;
use std::rc::Rc;

use blazewire_client::NoopWatcher;
use serde::Serialize;

use crate::cmd::{open_session, parse_timeout, PreviewArgs};
use crate::exit::{client_error, io_error, CliResult, SUCCESS};
use crate::output::{print_json, print_raw, OutputFormat};

#[derive(Serialize)]
struct PreviewOutput<'a> {
    pattern_id: &'a str,
    bytes: usize,
    path: Option<String>,
}

pub fn run(args: PreviewArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&args.connect.timeout)?;
    let mut session = open_session(&args.connect, NoopWatcher, timeout)?;

    let image = Rc::new(RefCell::new((String::new(), Vec::new())));
    let sink = Rc::clone(&image);
    let token = session
        .get_preview_image(&args.pattern_id, move |id, stream| {
            let mut jpeg = Vec::new();
            if let Err(err) = stream.read_to_end(&mut jpeg) {
                tracing::warn!(error = %err, "preview image read failed");
            }
            *sink.borrow_mut() = (id.to_string(), jpeg);
        })
        .map_err(|err| client_error("preview request failed", err))?;
    session
        .wait(&token, timeout)
        .map_err(|err| client_error("preview request failed", err))?;

    let (pattern_id, jpeg) = image.take();
    if let Some(path) = &args.out {
        std::fs::write(path, &jpeg).map_err(|err| io_error("write preview failed", err))?;
    } else if format == OutputFormat::Raw {
        print_raw(&jpeg);
        return Ok(SUCCESS);
    }

    let out = PreviewOutput {
        pattern_id: &pattern_id,
        bytes: jpeg.len(),
        path: args.out.as_ref().map(|p| p.display().to_string()),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        _ => match &out.path {
            Some(path) => println!("{}: {} bytes -> {path}", out.pattern_id, out.bytes),
            None => println!("{}: {} bytes", out.pattern_id, out.bytes),
        },
    }
    Ok(SUCCESS)
}
