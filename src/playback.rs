// Copyright (C) 2025  Tom Waddington
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Playback engine for codetyper task lists
//!
//! Drives a [`CodeTyper`] in real time, sleeping between ticks

use anyhow::Result;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::time::sleep;
use tracing::info;

use crate::interpreter::{CodeTyper, Step};

type Gate = Box<dyn FnMut() -> bool>;

pub struct PlaybackEngine {
    running: Arc<AtomicBool>,
    gate: Gate,
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackEngine {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            gate: Box::new(|| true),
        }
    }

    /// Like [`PlaybackEngine::new`], but Ctrl-C stops playback.
    ///
    /// Only one handler can be installed per process.
    pub fn with_interrupt() -> Result<Self> {
        let engine = Self::new();

        let r = engine.running.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nReceived Ctrl-C, stopping playback...");
            r.store(false, Ordering::SeqCst);
        })?;

        Ok(engine)
    }

    /// Only advance while `gate` returns true; a closed gate pauses playback.
    pub fn with_gate(mut self, gate: impl FnMut() -> bool + 'static) -> Self {
        self.gate = Box::new(gate);
        self
    }

    /// Handle that stops playback when set to false.
    pub fn running(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    fn should_continue(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Steps `typer` until it finishes or playback is stopped, returning the
    /// buffer text at that point.
    pub async fn execute(&mut self, typer: &mut CodeTyper) -> Result<String> {
        loop {
            if !self.should_continue() {
                info!(task_index = typer.task_index(), "playback stopped");
                break;
            }

            match typer.step((self.gate)())? {
                Step::Ready => {}
                Step::Sleep(delay) => sleep(delay).await,
                Step::Done => break,
            }
        }
        Ok(typer.text().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::*;
    use crate::interpreter::Callbacks;
    use crate::tasks;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_wait_takes_its_duration() {
        let mut typer = CodeTyper::new(wait(Duration::from_millis(1000)));
        let start = Instant::now();
        PlaybackEngine::new().execute(&mut typer).await.unwrap();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1000));
        assert!(elapsed < Duration::from_millis(1001));
    }

    #[tokio::test(start_paused = true)]
    async fn test_instant_wait_completes_early() {
        let complete = Rc::new(Cell::new(false));
        let flag = Rc::clone(&complete);
        let mut typer = CodeTyper::new(tasks![
            set_instant_mode(true),
            wait(Duration::from_millis(1000)),
        ])
        .with_callbacks(Callbacks::new().on_complete(move |_| flag.set(true)));

        let start = Instant::now();
        PlaybackEngine::new().execute(&mut typer).await.unwrap();

        assert!(complete.get());
        assert!(start.elapsed() < Duration::from_millis(999));
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_takes_keystroke_per_char() {
        let mut typer = CodeTyper::new(tasks![
            change_typing_speed(Duration::from_millis(10)),
            type_text("hello"),
        ]);
        let start = Instant::now();
        let text = PlaybackEngine::new().execute(&mut typer).await.unwrap();

        assert_eq!(text, "hello");
        // the first keystroke lands one period after the action starts
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_gate_delays_playback() {
        let polls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&polls);
        let mut engine = PlaybackEngine::new().with_gate(move || {
            counter.set(counter.get() + 1);
            counter.get() > 3
        });
        let mut typer = CodeTyper::new(tasks![set_instant_mode(true), type_text("ok")]);

        let start = Instant::now();
        let text = engine.execute(&mut typer).await.unwrap();

        assert_eq!(text, "ok");
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(310));
        assert_eq!(polls.get(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_engine_leaves_run_unfinished() {
        let mut engine = PlaybackEngine::new();
        engine.running().store(false, Ordering::SeqCst);

        let mut typer = CodeTyper::new(type_text("never"));
        let text = engine.execute(&mut typer).await.unwrap();

        assert_eq!(text, "");
        assert!(!typer.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_abort_playback() {
        let mut typer = CodeTyper::new(tasks![type_text("a"), goto_marker("nowhere")]);
        let err = PlaybackEngine::new().execute(&mut typer).await.unwrap_err();
        assert_eq!(err.to_string(), "no cursor marker named \"nowhere\"");
        assert_eq!(typer.text(), "a");
    }
}
