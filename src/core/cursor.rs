//! Streaming bounds check
//!
//! The parser asks one question of its input: is byte `i` available yet?
//! In whole-buffer mode that is a length compare. In streaming mode a miss
//! blocks on the producer channel, appends the delivered bytes (the buffer
//! only ever grows) and fires the chunk-arrival hook once per delivery.
//! The first delivery observed after the completion flag is set rebinds the
//! source to the whole-buffer variant for the rest of the parse.

use super::tokenizer::ParseState;
use crate::index::Dom;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::debug;

/// Callback run on the parser task after each buffer append. The partial
/// tree and indices are safe to read here; nothing else mutates them while
/// the hook runs. It must not block indefinitely.
pub type ChunkHook = Box<dyn FnMut(&[u8], &Dom) + Send>;

/// Where bytes come from, picked once at parser construction.
pub(crate) enum Source {
    /// All input is already in the buffer
    Whole,
    /// A producer is still delivering chunks
    Streaming {
        rx: Receiver<Vec<u8>>,
        complete: Arc<AtomicBool>,
        hook: Option<ChunkHook>,
    },
}

impl ParseState {
    /// True iff byte `index` is available. May block in streaming mode;
    /// never blocks once the stream has completed.
    pub(crate) fn in_bound(&mut self, index: usize) -> bool {
        loop {
            if index < self.buf.len() {
                return true;
            }
            if matches!(self.source, Source::Whole) {
                return false;
            }
            self.refill();
        }
    }

    /// Pull the next delivery from the producer, or rebind to whole-buffer
    /// mode when the stream is done. Each call either appends bytes or
    /// makes the source `Whole`, so `in_bound` always terminates.
    fn refill(&mut self) {
        let source = std::mem::replace(&mut self.source, Source::Whole);
        let Source::Streaming {
            rx,
            complete,
            mut hook,
        } = source
        else {
            return;
        };

        if complete.load(Ordering::Acquire) {
            // completion observed: drain whatever is still queued, then
            // stay in whole-buffer mode
            while let Ok(chunk) = rx.try_recv() {
                self.append_chunk(&chunk, &mut hook);
            }
            return;
        }

        match rx.recv() {
            Ok(chunk) => {
                self.append_chunk(&chunk, &mut hook);
                if complete.load(Ordering::Acquire) {
                    while let Ok(chunk) = rx.try_recv() {
                        self.append_chunk(&chunk, &mut hook);
                    }
                } else {
                    self.source = Source::Streaming { rx, complete, hook };
                }
            }
            Err(_) => {
                // producer went away without finishing: truncation is
                // end-of-input, the partial tree stands
                complete.store(true, Ordering::Release);
                debug!(len = self.buf.len(), "chunk channel closed, finishing");
            }
        }
    }

    fn append_chunk(&mut self, chunk: &[u8], hook: &mut Option<ChunkHook>) {
        self.buf.extend_from_slice(chunk);
        debug!(
            chunk = chunk.len(),
            len = self.buf.len(),
            "buffer swap"
        );
        if let Some(hook) = hook.as_mut() {
            hook(&self.buf, &self.dom);
        }
    }
}
