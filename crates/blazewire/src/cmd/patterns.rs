use std::cell::RefCell;
use std::rc::Rc;

use blazewire_client::NoopWatcher;

use crate::cmd::{open_session, parse_timeout, PatternsArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_patterns, OutputFormat};

pub fn run(args: PatternsArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&args.connect.timeout)?;
    let mut session = open_session(&args.connect, NoopWatcher, timeout)?;

    let patterns = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&patterns);
    let token = session
        .get_patterns(move |list| sink.borrow_mut().extend(list))
        .map_err(|err| client_error("pattern list failed", err))?;
    session
        .wait(&token, timeout)
        .map_err(|err| client_error("pattern list failed", err))?;

    let mut patterns = patterns.take();
    if args.sort {
        patterns.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    }
    print_patterns(&patterns, format);
    Ok(SUCCESS)
}
