//! Streaming parse: a producer thread feeds chunks while the parser runs
//!
//! The two sides share exactly two synchronization points: a single-slot
//! channel carrying byte deliveries (producer to parser) and a result
//! channel on which the finished [`Document`] is sent exactly once (parser
//! to consumer). The parser blocks only inside its bounds check; the
//! producer never blocks except in [`ChunkFeeder::finish`].
//!
//! `feed` is non-blocking: bytes that cannot be handed over because the
//! parser has not consumed the previous delivery are retained and go out
//! with the next send, so cumulative delivery makes the drop-on-full policy
//! lossless. Dropping the feeder without `finish` closes the channel and
//! the parser treats the truncation as end-of-input, returning the partial
//! tree.

use crate::core::cursor::ChunkHook;
use crate::core::tokenizer::ParseState;
use crate::document::Document;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;
use tracing::debug;

/// Producer-side handle of a streaming parse
pub struct ChunkFeeder {
    tx: SyncSender<Vec<u8>>,
    complete: Arc<AtomicBool>,
    pending: Vec<u8>,
}

impl ChunkFeeder {
    /// Hand bytes to the parser without blocking. If the parser has not
    /// consumed the previous delivery yet, the bytes are retained and sent
    /// with the next call.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        if self.pending.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.pending);
        match self.tx.try_send(batch) {
            Ok(()) => {}
            Err(TrySendError::Full(batch)) | Err(TrySendError::Disconnected(batch)) => {
                self.pending = batch;
            }
        }
    }

    /// Deliver any retained bytes, mark the stream complete and close the
    /// channel. The parser finishes with everything that was fed.
    pub fn finish(mut self) {
        let batch = std::mem::take(&mut self.pending);
        if !batch.is_empty() {
            let _ = self.tx.send(batch);
        }
        self.complete.store(true, Ordering::Release);
        debug!("stream complete");
    }
}

/// Consumer-side handle resolving to the finished document
pub struct ParseHandle {
    rx: Receiver<Document>,
}

impl ParseHandle {
    /// Block until the parser reaches end of input
    pub fn wait(self) -> Document {
        self.rx
            .recv()
            .expect("parser task terminated without a result")
    }
}

/// Start a streaming parse (standard literal dialect).
///
/// The parser task starts immediately with `initial` in its buffer and
/// suspends whenever it needs bytes past the current end. `hook`, if given,
/// runs on the parser task after each delivery and may read the partial
/// tree and indices.
pub fn parse_streaming(
    initial: impl Into<Vec<u8>>,
    hook: Option<ChunkHook>,
) -> (ChunkFeeder, ParseHandle) {
    let (tx, rx) = sync_channel(1);
    let (done_tx, done_rx) = sync_channel(1);
    let complete = Arc::new(AtomicBool::new(false));

    let state = ParseState::new_streaming(initial.into(), rx, Arc::clone(&complete), hook);
    thread::spawn(move || {
        let document = state.run();
        let _ = done_tx.send(document);
    });

    (
        ChunkFeeder {
            tx,
            complete,
            pending: Vec::new(),
        },
        ParseHandle { rx: done_rx },
    )
}
