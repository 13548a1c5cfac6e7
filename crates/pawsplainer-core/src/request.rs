use crate::error::TransitionError;

/// Progress of an in-flight request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Request sent, waiting for the response to start
    Sending,
    /// Fragments are arriving
    Streaming,
}

/// Lifecycle of the single explain request a session can hold
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    InFlight(Phase),
    Error(String),
}

impl RequestState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, RequestState::InFlight(_))
    }

    /// Whether a new request may start from here
    pub fn can_begin(&self) -> bool {
        !self.is_in_flight()
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            RequestState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Idle or Error -> InFlight(Sending)
    pub fn begin(&mut self) -> Result<(), TransitionError> {
        if self.is_in_flight() {
            return Err(TransitionError::RequestInFlight);
        }
        *self = RequestState::InFlight(Phase::Sending);
        Ok(())
    }

    /// InFlight(_) -> InFlight(Streaming)
    pub fn start_streaming(&mut self) -> Result<(), TransitionError> {
        if !self.is_in_flight() {
            return Err(TransitionError::NotInFlight);
        }
        *self = RequestState::InFlight(Phase::Streaming);
        Ok(())
    }

    /// InFlight(_) -> Idle
    pub fn complete(&mut self) -> Result<(), TransitionError> {
        if !self.is_in_flight() {
            return Err(TransitionError::NotInFlight);
        }
        *self = RequestState::Idle;
        Ok(())
    }

    /// InFlight(_) -> Error(message)
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        if !self.is_in_flight() {
            return Err(TransitionError::NotInFlight);
        }
        *self = RequestState::Error(message.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = RequestState::default();
        assert_eq!(state, RequestState::Idle);
        state.begin().unwrap();
        assert_eq!(state, RequestState::InFlight(Phase::Sending));
        state.start_streaming().unwrap();
        assert_eq!(state, RequestState::InFlight(Phase::Streaming));
        state.complete().unwrap();
        assert_eq!(state, RequestState::Idle);
    }

    #[test]
    fn test_begin_rejected_while_in_flight() {
        let mut state = RequestState::default();
        state.begin().unwrap();
        assert_eq!(state.begin(), Err(TransitionError::RequestInFlight));
        state.start_streaming().unwrap();
        assert_eq!(state.begin(), Err(TransitionError::RequestInFlight));
        assert_eq!(state, RequestState::InFlight(Phase::Streaming));
    }

    #[test]
    fn test_retry_after_error() {
        let mut state = RequestState::default();
        state.begin().unwrap();
        state.fail("boom").unwrap();
        assert_eq!(state.error_message(), Some("boom"));
        assert!(state.can_begin());
        state.begin().unwrap();
        assert!(state.is_in_flight());
    }

    #[test]
    fn test_terminal_transitions_need_a_request() {
        let mut state = RequestState::Idle;
        assert_eq!(state.complete(), Err(TransitionError::NotInFlight));
        assert_eq!(state.fail("x"), Err(TransitionError::NotInFlight));
        assert_eq!(state.start_streaming(), Err(TransitionError::NotInFlight));
        assert_eq!(state, RequestState::Idle);
    }
}
