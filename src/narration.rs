//! Spoken prompts.
//!
//! A narrator receives text plus a [`Completion`] it must fire when the
//! utterance ends. Flows that wait on narration poll the completion with a
//! timeout, so a narrator that never fires cannot stall them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Minimum time a prompt is assumed to take
pub const MIN_NARRATION_MS: u64 = 2000;
/// Assumed speaking time per character
pub const NARRATION_MS_PER_CHAR: u64 = 80;

/// Expected speaking time for `text`
///
/// Used as the upper bound when waiting for a narrator to finish.
pub fn estimated_duration(text: &str) -> Duration {
    let chars = text.chars().count() as u64;
    Duration::from_millis((chars * NARRATION_MS_PER_CHAR).max(MIN_NARRATION_MS))
}

/// One-shot completion signal handed to a narrator
#[derive(Debug)]
pub struct Completion {
    done: Arc<AtomicBool>,
}

/// Observer side of a [`Completion`]
#[derive(Debug, Clone)]
pub struct CompletionHandle {
    done: Arc<AtomicBool>,
}

impl Completion {
    /// Create a completion and the handle that observes it
    pub fn new() -> (Self, CompletionHandle) {
        let done = Arc::new(AtomicBool::new(false));
        (
            Self {
                done: Arc::clone(&done),
            },
            CompletionHandle { done },
        )
    }

    /// Completion nobody waits on
    pub fn detached() -> Self {
        Self::new().0
    }

    pub fn complete(self) {
        self.done.store(true, Ordering::Release);
    }
}

impl CompletionHandle {
    pub fn is_complete(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

/// Speaks prompts to the user
pub trait Narrator: Send {
    /// Start speaking `text`; fire `done` when finished
    ///
    /// Implementations may fire `done` from another thread, late, or never.
    fn speak(&mut self, text: &str, done: Completion);
}

/// Narrator that says nothing and finishes immediately
#[derive(Debug, Default)]
pub struct SilentNarrator;

impl Narrator for SilentNarrator {
    fn speak(&mut self, _text: &str, done: Completion) {
        done.complete();
    }
}

/// Narrator that prints prompts and finishes immediately
#[derive(Debug, Default)]
pub struct ConsoleNarrator;

impl Narrator for ConsoleNarrator {
    fn speak(&mut self, text: &str, done: Completion) {
        println!("🗣  {}", text);
        log::info!("[Narrator] {}", text);
        done.complete();
    }
}
