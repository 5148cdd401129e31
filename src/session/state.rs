//! Session state machine states and the notices sent to the front end.
//!
//! ```text
//! Idle ──start──▶ Starting ──chain built──▶ Live ──stop──▶ Stopping ──▶ Idle
//!                    │
//!                    └──failure / stop──▶ Idle
//! ```

use std::fmt;

use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No chain, no microphone.  Parameters may still be edited.
    #[default]
    Idle,

    /// Waiting for the microphone and building the chain.
    Starting,

    /// Audio is flowing through a constructed chain.
    Live,

    /// Tearing the chain down.
    Stopping,
}

impl SessionState {
    /// `true` in every state but `Idle`.
    ///
    /// The UI shows the stop button while the session is active.
    ///
    /// ```
    /// use sound_amplifier::session::SessionState;
    ///
    /// assert!(!SessionState::Idle.is_active());
    /// assert!(SessionState::Starting.is_active());
    /// assert!(SessionState::Live.is_active());
    /// assert!(SessionState::Stopping.is_active());
    /// ```
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionState::Idle)
    }

    pub fn is_live(&self) -> bool {
        matches!(self, SessionState::Live)
    }

    /// A short human-readable label for the status line.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Stopped",
            SessionState::Starting => "Starting…",
            SessionState::Live => "Live",
            SessionState::Stopping => "Stopping…",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// User-facing notices produced by the session core.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(SessionState),

    /// A start attempt failed; the session is back to `Idle`.
    StartFailed { message: String },

    /// Output gain went above the hearing-safety threshold while live.
    HighGainWarning { output_gain: f32 },
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Create the channel carrying [`SessionEvent`]s to the front end.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- SessionState ---

    #[test]
    fn default_state_is_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
    }

    #[test]
    fn only_live_is_live() {
        assert!(SessionState::Live.is_live());
        assert!(!SessionState::Starting.is_live());
        assert!(!SessionState::Stopping.is_live());
        assert!(!SessionState::Idle.is_live());
    }

    #[test]
    fn labels() {
        assert_eq!(SessionState::Idle.label(), "Stopped");
        assert_eq!(SessionState::Live.label(), "Live");
    }

    #[test]
    fn display_uses_variant_name() {
        assert_eq!(SessionState::Starting.to_string(), "Starting");
    }

    // ---- Events ---

    #[test]
    fn events_cross_the_channel() {
        let (tx, mut rx) = event_channel();
        tx.send(SessionEvent::StateChanged(SessionState::Live))
            .expect("receiver alive");
        assert_eq!(
            rx.try_recv().ok(),
            Some(SessionEvent::StateChanged(SessionState::Live))
        );
    }

    #[test]
    fn event_sender_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EventSender>();
    }
}
