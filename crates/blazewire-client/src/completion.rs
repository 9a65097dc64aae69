use std::cell::Cell;
use std::rc::Rc;

use crate::error::FailureCause;

/// State of a pending request as seen through its [`CompletionToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Pending,
    Done,
    Failed(FailureCause),
}

/// Handle the caller keeps to observe a request's outcome.
///
/// Tokens do not drive anything themselves; the outcome is only updated
/// while the owning client ticks. See [`Client::wait`](crate::Client::wait).
#[derive(Debug, Clone)]
pub struct CompletionToken(Rc<Cell<Completion>>);

impl CompletionToken {
    pub fn state(&self) -> Completion {
        self.0.get()
    }

    pub fn is_pending(&self) -> bool {
        self.state() == Completion::Pending
    }

    pub fn is_done(&self) -> bool {
        self.state() == Completion::Done
    }

    /// The failure cause, if the request failed.
    pub fn failure(&self) -> Option<FailureCause> {
        match self.state() {
            Completion::Failed(cause) => Some(cause),
            _ => None,
        }
    }
}

/// The slot-side half of a completion token. Resolves exactly once.
#[derive(Debug)]
pub(crate) struct Completer(Rc<Cell<Completion>>);

impl Completer {
    pub(crate) fn pair() -> (Completer, CompletionToken) {
        let state = Rc::new(Cell::new(Completion::Pending));
        (Completer(Rc::clone(&state)), CompletionToken(state))
    }

    pub(crate) fn token(&self) -> CompletionToken {
        CompletionToken(Rc::clone(&self.0))
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.0.get() == Completion::Pending
    }

    pub(crate) fn finish(&self) {
        if self.is_pending() {
            self.0.set(Completion::Done);
        }
    }

    pub(crate) fn fail(&self, cause: FailureCause) {
        if self.is_pending() {
            self.0.set(Completion::Failed(cause));
        }
    }
}
