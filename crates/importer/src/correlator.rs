//! Reconstruction of exception-handling blocks from position markers.
//!
//! The bytecode encodes try/catch structure as exception-table rows over
//! label positions, while accesses arrive interleaved in instruction order.
//! One correlator instance tracks a single method: blocks move from pending
//! (registered, start not yet seen with a line number) to in-flight (start
//! stamped with its line) to finished (end label observed), collecting every
//! access that falls inside their live range on the way.

use std::collections::{BTreeSet, HashMap, HashSet};

use archgraph_class_file::Label;

use crate::raw::{RawAccessRecord, RawTryCatchBlock};

/// In-progress block state; frozen into a [`RawTryCatchBlock`] the moment
/// its end boundary is observed.
#[derive(Debug, Default)]
struct TryCatchBlockBuilder {
    caught_throwables: BTreeSet<String>,
    line_number: Option<u32>,
    accesses: Vec<RawAccessRecord>,
}

impl TryCatchBlockBuilder {
    fn freeze(self) -> Option<RawTryCatchBlock> {
        // in-flight blocks always carry the line their start label received
        self.line_number.map(|line_number| RawTryCatchBlock {
            caught_throwables: self.caught_throwables,
            line_number,
            accesses: self.accesses,
        })
    }
}

/// Outcome of one method's correlation.
pub(crate) struct FinishedMethodBlocks {
    pub blocks: Vec<RawTryCatchBlock>,
    /// Blocks that could not be matched to boundaries and were dropped
    pub dropped: usize,
}

/// State machine correlating block boundaries with the instruction stream
/// of one method. Not reentrant; must see events in file order.
#[derive(Debug, Default)]
pub(crate) struct TryCatchCorrelator {
    /// Registered blocks waiting for their start label, keyed start → end
    pending: HashMap<Label, HashMap<Label, TryCatchBlockBuilder>>,
    /// Blocks whose start was stamped with a line number, keyed by end label
    in_flight: HashMap<Label, Vec<TryCatchBlockBuilder>>,
    /// Every handler position registered so far; used to suppress the
    /// synthetic duplicate finally region compilers emit at catch handlers
    handlers: HashSet<Label>,
    /// Last label observed that has not (yet) received a line number
    waiting_label: Option<Label>,
    finished: Vec<RawTryCatchBlock>,
    active: bool,
}

impl TryCatchCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_try_catch(
        &mut self,
        start: Label,
        end: Label,
        handler: Label,
        throwable: String,
    ) {
        self.pending_block(start, end).caught_throwables.insert(throwable);
        self.active = true;
        self.handlers.insert(handler);
    }

    /// A catch handler is routinely followed by a synthetic copy of the
    /// finally region starting exactly at the handler's position; recording
    /// that copy would double-attribute the finally contents, so a finally
    /// registration whose start is a known handler position is skipped.
    pub fn register_try_finally(&mut self, start: Label, end: Label, handler: Label) {
        if !self.handlers.contains(&start) {
            self.pending_block(start, end);
            self.active = true;
        }
        self.handlers.insert(handler);
    }

    /// A label with no line number attached (yet). Most labels show up a
    /// second time with a line; a label that is displaced by the next one
    /// while still waiting is finalized as lineless: blocks starting there
    /// are synthetic and discarded, blocks ending there finish normally
    /// (a try block may legitimately end at a return statement).
    pub fn on_label(&mut self, label: Label) {
        if !self.active {
            return;
        }

        if let Some(waiting) = self.waiting_label.take() {
            self.finalize_lineless_label(waiting);
        }
        self.waiting_label = Some(label);
    }

    /// The same label observed with its source line: blocks pending with it
    /// as start go in-flight stamped with `line`, blocks in-flight with it
    /// as end are finished.
    pub fn on_line_number(&mut self, label: Label, line: u32) {
        if !self.active {
            return;
        }

        self.promote_starting_blocks(label, line);
        self.finish_ending_blocks(label);
        self.waiting_label = None;
    }

    /// Attribute an access to every currently in-flight block. Nested try
    /// regions can overlap a single instruction, so attribution is not
    /// exclusive.
    pub fn record_access(&mut self, access: &RawAccessRecord) {
        if !self.active {
            return;
        }
        for blocks in self.in_flight.values_mut() {
            for block in blocks {
                block.accesses.push(access.clone());
            }
        }
    }

    /// Whether any block is still pending or in flight for this method.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// End of the method: finalize a still-waiting label, then drop whatever
    /// could not be matched. Leftovers indicate inconsistent exception
    /// metadata; the blocks are omitted from the model instead of failing
    /// the import.
    pub fn finish_method(&mut self) -> FinishedMethodBlocks {
        if let Some(waiting) = self.waiting_label.take() {
            self.finalize_lineless_label(waiting);
        }
        self.handlers.clear();

        let mut dropped = 0;
        if !self.pending.is_empty() {
            dropped += self.pending.values().map(|by_end| by_end.len()).sum::<usize>();
            log::warn!("failed to match {dropped} registered try-catch block(s) to a start boundary");
            self.pending.clear();
        }
        if !self.in_flight.is_empty() {
            let unfinished = self.in_flight.values().map(|blocks| blocks.len()).sum::<usize>();
            log::warn!("failed to finish {unfinished} active try-catch block(s)");
            dropped += unfinished;
            self.in_flight.clear();
        }
        self.active = false;

        FinishedMethodBlocks { blocks: std::mem::take(&mut self.finished), dropped }
    }

    fn pending_block(&mut self, start: Label, end: Label) -> &mut TryCatchBlockBuilder {
        self.pending.entry(start).or_default().entry(end).or_default()
    }

    fn finalize_lineless_label(&mut self, label: Label) {
        // blocks starting at a lineless label never had a reachable
        // instruction with a source position
        self.pending.remove(&label);
        self.finish_ending_blocks(label);
    }

    fn promote_starting_blocks(&mut self, start: Label, line: u32) {
        let Some(blocks_by_end) = self.pending.remove(&start) else {
            return;
        };
        for (end, mut block) in blocks_by_end {
            block.line_number = Some(line);
            self.in_flight.entry(end).or_default().push(block);
        }
    }

    fn finish_ending_blocks(&mut self, end: Label) {
        if let Some(blocks) = self.in_flight.remove(&end) {
            self.finished.extend(blocks.into_iter().filter_map(TryCatchBlockBuilder::freeze));
        }

        if self.pending.is_empty() && self.in_flight.is_empty() {
            self.active = false;
        }
    }
}
