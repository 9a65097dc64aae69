use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use blazewire_client::{PlaylistUpdate, SequencerState, Stats, Watcher};
use serde_json::json;

use crate::cmd::{open_session, parse_timeout, WatchArgs};
use crate::exit::{client_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{print_event, Event, OutputFormat};

const IDLE_WAIT: Duration = Duration::from_millis(20);

struct Printer {
    format: OutputFormat,
    printed: usize,
}

impl Watcher for Printer {
    fn on_stats(&mut self, stats: &Stats) {
        print_event(&Event::Stats(stats), self.format);
        self.printed += 1;
    }

    fn on_pattern_change(&mut self, state: &SequencerState) {
        print_event(&Event::PatternChange(state), self.format);
        self.printed += 1;
    }

    fn on_playlist_change(&mut self, update: &PlaylistUpdate) {
        print_event(&Event::PlaylistChange(update), self.format);
        self.printed += 1;
    }
}

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&args.connect.timeout)?;
    let printer = Printer { format, printed: 0 };
    let mut session = open_session(&args.connect, printer, timeout)?;
    session
        .send_json(&json!({"sendUpdates": true}))
        .map_err(|err| client_error("subscribe failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) {
        if !session.check_for_inbound() {
            return Err(CliError::new(FAILURE, "connection to controller lost"));
        }
        if let Some(count) = args.count {
            if session.watcher().printed >= count {
                return Ok(SUCCESS);
            }
        }
        std::thread::sleep(IDLE_WAIT);
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
