use std::cell::RefCell;
use std::rc::Rc;

use blazewire_client::{NoopWatcher, SequencerState, Settings, SystemStateRequest};

use crate::cmd::{open_session, parse_timeout, SettingsArgs};
use crate::exit::{client_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_system_state, OutputFormat};

pub fn run(args: SettingsArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&args.connect.timeout)?;
    let mut session = open_session(&args.connect, NoopWatcher, timeout)?;

    let settings = Rc::new(RefCell::new(None));
    let sequencer = Rc::new(RefCell::new(None));
    let settings_sink = Rc::clone(&settings);
    let sequencer_sink = Rc::clone(&sequencer);

    let tokens = session
        .get_system_state(SystemStateRequest {
            settings: Some(Box::new(move |s: &Settings| {
                *settings_sink.borrow_mut() = Some(s.clone());
            })),
            sequencer: Some(Box::new(move |s: &SequencerState| {
                *sequencer_sink.borrow_mut() = Some(s.clone());
            })),
            expander: None,
        })
        .map_err(|err| client_error("config request failed", err))?;

    for token in [&tokens.settings, &tokens.sequencer].into_iter().flatten() {
        session
            .wait(token, timeout)
            .map_err(|err| client_error("config request failed", err))?;
    }

    let settings = settings
        .take()
        .ok_or_else(|| CliError::new(DATA_INVALID, "controller sent no settings"))?;
    let sequencer = sequencer.take();
    print_system_state(&settings, sequencer.as_ref(), format);
    Ok(SUCCESS)
}
