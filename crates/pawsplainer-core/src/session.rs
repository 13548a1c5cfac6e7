//! UI-agnostic request controller
//!
//! The session owns everything a front-end shows for one explain request: the
//! question, the slides that have arrived, and the current [`RequestState`].
//! Front-ends call [`ExplainSession::submit`], run the returned request on a
//! background task, and feed the task's [`ExplainEvent`]s back through
//! [`ExplainSession::apply`].

use tracing::{info, warn};

use crate::error::{extract_error_message, TransitionError};
use crate::fragment::Slide;
use crate::prompt::build_prompt;
use crate::request::RequestState;

/// A validated question ready to be streamed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainRequest {
    pub question: String,
    pub prompt: String,
}

impl ExplainRequest {
    pub fn new(question: &str) -> Self {
        Self {
            question: question.to_string(),
            prompt: build_prompt(question),
        }
    }
}

/// Progress reported by a running request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplainEvent {
    StreamStarted,
    Slide(Slide),
    Finished,
    /// Raw failure text; the session extracts the readable part
    Failed(String),
}

impl ExplainEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExplainEvent::Finished | ExplainEvent::Failed(_))
    }
}

#[derive(Debug, Default)]
pub struct ExplainSession {
    state: RequestState,
    transcript: Vec<String>,
    slides: Vec<Slide>,
}

impl ExplainSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request for `question`.
    ///
    /// Blank questions are ignored (`Ok(None)`) and a request already in
    /// flight rejects the call; neither case touches the session.
    pub fn submit(&mut self, question: &str) -> Result<Option<ExplainRequest>, TransitionError> {
        if question.trim().is_empty() {
            return Ok(None);
        }
        self.state.begin()?;

        self.transcript.clear();
        self.slides.clear();
        self.transcript.push(question.to_string());

        info!(chars = question.chars().count(), "explain request submitted");
        Ok(Some(ExplainRequest::new(question)))
    }

    pub fn apply(&mut self, event: ExplainEvent) {
        let result = match event {
            ExplainEvent::StreamStarted => self.state.start_streaming(),
            ExplainEvent::Slide(slide) => {
                if self.state.is_in_flight() {
                    self.slides.push(slide);
                    Ok(())
                } else {
                    Err(TransitionError::NotInFlight)
                }
            }
            ExplainEvent::Finished => {
                info!(slides = self.slides.len(), "explain request finished");
                self.state.complete()
            }
            ExplainEvent::Failed(raw) => {
                let message = extract_error_message(&raw);
                warn!(error = %raw, "explain request failed");
                self.state.fail(message)
            }
        };

        if let Err(e) = result {
            warn!("ignoring stale explain event: {}", e);
        }
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    /// The input surface is usable whenever no request is running
    pub fn input_enabled(&self) -> bool {
        self.state.can_begin()
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error_message()
    }
}
