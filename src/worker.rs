//! Background execution of generation requests.
//!
//! At most one request is in flight. The request runs on its own thread and
//! reports back over a channel; the owning (control) thread drains events and
//! applies successful completions to the registry itself, so the registry
//! only ever has one writer.

use crate::archive::save_generation_archive;
use crate::error::{Result, StudioError};
use crate::nai_api::NaiClient;
use crate::registry::ImageRegistry;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Anything that can turn a prompt into a generation archive.
pub trait ArchiveSource: Send + Sync + 'static {
    fn fetch_archive(&self, prompt: &str) -> Result<Vec<u8>>;
}

impl ArchiveSource for NaiClient {
    fn fetch_archive(&self, prompt: &str) -> Result<Vec<u8>> {
        self.generate_blocking(prompt)
    }
}

#[derive(Debug)]
pub enum GenerationEvent {
    Sending { prompt: String },
    Succeeded { prompt: String, image_path: PathBuf },
    Failed { prompt: String, error: StudioError },
}

impl GenerationEvent {
    pub fn prompt(&self) -> &str {
        match self {
            Self::Sending { prompt }
            | Self::Succeeded { prompt, .. }
            | Self::Failed { prompt, .. } => prompt,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Sending { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    Sending { prompt: String },
}

struct InFlight {
    prompt: String,
    events: Receiver<GenerationEvent>,
    finished: bool,
}

pub struct GenerationWorker {
    source: Arc<dyn ArchiveSource>,
    output_dir: PathBuf,
    in_flight: Option<InFlight>,
}

impl GenerationWorker {
    pub fn new(source: Arc<dyn ArchiveSource>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            output_dir: output_dir.into(),
            in_flight: None,
        }
    }

    pub fn state(&self) -> GenerationState {
        match &self.in_flight {
            Some(in_flight) => GenerationState::Sending {
                prompt: in_flight.prompt.clone(),
            },
            None => GenerationState::Idle,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Starts a request on a background thread. Fails with `GenerationBusy`
    /// while another request is still in flight.
    pub fn submit(&mut self, prompt: &str) -> Result<()> {
        if let Some(in_flight) = &self.in_flight {
            return Err(StudioError::GenerationBusy(in_flight.prompt.clone()));
        }

        let (tx, rx) = channel::unbounded();
        let source = Arc::clone(&self.source);
        let output_dir = self.output_dir.clone();
        let request_prompt = prompt.to_string();

        std::thread::Builder::new()
            .name("generation-worker".to_string())
            .spawn(move || {
                let prompt = request_prompt;
                let _ = tx.send(GenerationEvent::Sending {
                    prompt: prompt.clone(),
                });
                let outcome = source
                    .fetch_archive(&prompt)
                    .and_then(|bytes| save_generation_archive(&bytes, &output_dir));
                let event = match outcome {
                    Ok(image_path) => GenerationEvent::Succeeded { prompt, image_path },
                    Err(error) => {
                        log::error!("Image generation failed: {}", error);
                        GenerationEvent::Failed { prompt, error }
                    }
                };
                let _ = tx.send(event);
            })
            .map_err(|error| {
                StudioError::TransportFailure(format!(
                    "failed to start generation worker: {}",
                    error
                ))
            })?;

        self.in_flight = Some(InFlight {
            prompt: prompt.to_string(),
            events: rx,
            finished: false,
        });
        Ok(())
    }

    /// Returns the next pending event without blocking.
    pub fn try_next_event(&mut self) -> Option<GenerationEvent> {
        let in_flight = self.in_flight.as_mut().filter(|in_flight| !in_flight.finished)?;
        let event = match in_flight.events.try_recv() {
            Ok(event) => event,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => worker_lost(&in_flight.prompt),
        };
        in_flight.finished = event.is_terminal();
        Some(event)
    }

    /// Waits up to `timeout` for the next event.
    pub fn next_event_timeout(&mut self, timeout: Duration) -> Option<GenerationEvent> {
        let in_flight = self.in_flight.as_mut().filter(|in_flight| !in_flight.finished)?;
        let event = match in_flight.events.recv_timeout(timeout) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => worker_lost(&in_flight.prompt),
        };
        in_flight.finished = event.is_terminal();
        Some(event)
    }

    /// Applies an event on the control thread. A success is recorded in the
    /// registry; if recording fails the event becomes a failure. Terminal
    /// events return the worker to idle.
    pub fn apply(
        &mut self,
        event: GenerationEvent,
        registry: &mut ImageRegistry,
    ) -> GenerationEvent {
        if event.is_terminal() {
            self.in_flight = None;
        }

        match event {
            GenerationEvent::Succeeded { prompt, image_path } => {
                match registry.record(&prompt, &image_path) {
                    Ok(()) => GenerationEvent::Succeeded { prompt, image_path },
                    Err(error) => {
                        log::error!("Failed to save registry: {}", error);
                        GenerationEvent::Failed { prompt, error }
                    }
                }
            }
            other => other,
        }
    }
}

fn worker_lost(prompt: &str) -> GenerationEvent {
    GenerationEvent::Failed {
        prompt: prompt.to_string(),
        error: StudioError::TransportFailure(
            "generation worker stopped without reporting a result".to_string(),
        ),
    }
}
