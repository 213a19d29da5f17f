use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::Arc;
use std::thread;

use super::capture::{AveragingCapture, CancelToken, CaptureConfig};
use super::session::Action;
use crate::data::model::Spectrum;
use crate::error::{AcquisitionError, Result};

// ---------------------------------------------------------------------------
// Background capture worker
// ---------------------------------------------------------------------------

/// Messages sent from the capture thread to the UI thread.
#[derive(Debug)]
pub enum WorkerMessage {
    Progress(f32),
    Finished {
        action: Action,
        result: Result<Spectrum>,
    },
}

/// Runs one capture at a time off the UI thread.
///
/// Only the acquisition happens on the worker; the caller commits the
/// returned spectrum through `Session::apply`.
pub struct CaptureWorker {
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
    running: Option<(Action, CancelToken)>,
}

impl Default for CaptureWorker {
    fn default() -> Self {
        let (tx, rx) = channel();
        Self {
            tx,
            rx,
            running: None,
        }
    }
}

impl CaptureWorker {
    pub fn is_busy(&self) -> bool {
        self.running.is_some()
    }

    /// The action currently being captured.
    pub fn current(&self) -> Option<Action> {
        self.running.as_ref().map(|(action, _)| *action)
    }

    /// Spawn a capture thread. Fails with `Busy` while one is running.
    pub fn start(
        &mut self,
        capture: Arc<AveragingCapture>,
        action: Action,
        config: CaptureConfig,
    ) -> Result<()> {
        if self.running.is_some() {
            return Err(AcquisitionError::Busy);
        }
        let tx = self.tx.clone();
        let token = CancelToken::default();
        let worker_token = token.clone();

        thread::Builder::new()
            .name(format!("capture-{}", action.label()))
            .spawn(move || {
                let progress_tx = tx.clone();
                let progress = move |fraction: f32| {
                    let _ = progress_tx.send(WorkerMessage::Progress(fraction));
                };
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    capture.acquire(&config, &progress, Some(&worker_token))
                }))
                .unwrap_or_else(|payload| {
                    let reason = panic_message(payload.as_ref());
                    log::error!("{} capture panicked: {reason}", action.label());
                    Err(AcquisitionError::Device(format!("capture aborted: {reason}")))
                });
                let _ = tx.send(WorkerMessage::Finished { action, result });
            })?;

        log::debug!("Started {} capture", action.label());
        self.running = Some((action, token));
        Ok(())
    }

    /// Ask the running capture to stop after its current sample.
    pub fn cancel(&self) {
        if let Some((_, token)) = &self.running {
            token.cancel();
        }
    }

    /// Drain pending messages without blocking.
    pub fn poll(&mut self) -> Vec<WorkerMessage> {
        let messages: Vec<WorkerMessage> = self.rx.try_iter().collect();
        if messages
            .iter()
            .any(|m| matches!(m, WorkerMessage::Finished { .. }))
        {
            self.running = None;
        }
        messages
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
