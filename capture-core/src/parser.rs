//! Per-session parser list (spec §4.3). Classifiers attach parsers to a
//! session; every subsequent byte-run delivery walks the list in
//! registration order, invoking each. A parser may return
//! [`ParseOutcome::Unregister`] to be removed.
//!
//! The source's `(parse_fn, state_ptr, free_fn)` triple (spec §3.4, §9)
//! becomes `(parse_fn, state: Box<dyn Any>)` here: a boxed trait object's
//! `Drop` impl already is the free function, so there is nothing for a
//! separate `free_fn` pointer to do beyond what `Box`'s destructor gives
//! for free. See DESIGN.md for this simplification.

use std::any::Any;

use crate::session::{Direction, Session};

/// What a parser wants to happen after seeing a byte-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Keep this parser registered; call it again on the next run.
    Continue,
    /// Remove this parser after this call. Its state is dropped
    /// immediately, which runs any `Drop` impl the state carries.
    Unregister,
}

/// A stateful per-session parser. `state` is downcast by the caller
/// (typically with [`Any::downcast_mut`]) to the concrete state type the
/// classifier that registered it created.
pub type ParseFn<S> =
    fn(session: &mut S, state: &mut dyn Any, data: &[u8], direction: Direction) -> ParseOutcome;

struct ParserEntry<S> {
    state: Box<dyn Any + Send>,
    parse: ParseFn<S>,
}

/// The ordered list of parsers attached to one session.
pub struct ParserList<S> {
    entries: Vec<ParserEntry<S>>,
}

impl<S> Default for ParserList<S> {
    fn default() -> Self {
        ParserList {
            entries: Vec::new(),
        }
    }
}

impl<S: Session> ParserList<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends a parser. Matches `register_parser` in spec §6.2.
    pub fn register(&mut self, parse: ParseFn<S>, state: Box<dyn Any + Send>) {
        self.entries.push(ParserEntry { state, parse });
    }

    /// Calls every registered parser, in registration order, on one
    /// byte-run. Parsers that return [`ParseOutcome::Unregister`] are
    /// removed after this pass; the removal never causes the iterator to
    /// revisit an already-unregistered entry (spec §4.3's reentrancy
    /// requirement), since we collect indices to drop only after the
    /// full pass completes.
    pub fn deliver(&mut self, session: &mut S, data: &[u8], direction: Direction) {
        let entries = std::mem::take(&mut self.entries);
        let mut keep = Vec::with_capacity(entries.len());
        for mut entry in entries {
            let outcome = (entry.parse)(session, entry.state.as_mut(), data, direction);
            if outcome == ParseOutcome::Continue {
                keep.push(entry);
            }
            // Unregister: `entry` (and its boxed state) drops here.
        }
        self.entries = keep;
    }
}
