//! Refill lifecycle notifications.
//!
//! A one-way observability channel from the bank to whatever presentation
//! layer is listening. Emission never blocks and never fails; events sent
//! with no subscribers are simply dropped.

use tokio::sync::broadcast;

use quizsmith_domain::GameCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillPhase {
    Start,
    End,
    Error,
    Retry,
}

/// Where a completed refill got its stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillSource {
    /// Fresh batch from the generative backend.
    Generated,
    /// Local recycle because no credential is configured.
    Local,
    /// Local recycle because the category is cooling down.
    LocalCooldown,
    /// Local recycle after a failed generation attempt.
    LocalFallback,
}

#[derive(Debug, Clone)]
pub struct RefillEvent {
    pub category: GameCategory,
    pub phase: RefillPhase,
    pub source: Option<RefillSource>,
    /// Model that produced a generated batch.
    pub model: Option<String>,
    /// 1-based attempt about to run (retry events only).
    pub attempt: Option<u32>,
    pub total_attempts: Option<u32>,
    pub cooldown: bool,
    pub error: Option<String>,
}

impl RefillEvent {
    pub fn start(category: GameCategory, cooldown: bool) -> Self {
        Self {
            category,
            phase: RefillPhase::Start,
            source: None,
            model: None,
            attempt: None,
            total_attempts: None,
            cooldown,
            error: None,
        }
    }

    pub fn end(category: GameCategory, source: RefillSource, model: Option<String>) -> Self {
        Self {
            category,
            phase: RefillPhase::End,
            source: Some(source),
            model,
            attempt: None,
            total_attempts: None,
            cooldown: source == RefillSource::LocalCooldown,
            error: None,
        }
    }

    pub fn error(category: GameCategory, error: String) -> Self {
        Self {
            category,
            phase: RefillPhase::Error,
            source: None,
            model: None,
            attempt: None,
            total_attempts: None,
            cooldown: false,
            error: Some(error),
        }
    }

    pub fn retry(category: GameCategory, attempt: u32, total_attempts: u32) -> Self {
        Self {
            category,
            phase: RefillPhase::Retry,
            source: None,
            model: None,
            attempt: Some(attempt),
            total_attempts: Some(total_attempts),
            cooldown: false,
            error: None,
        }
    }
}

pub(crate) struct RefillEvents {
    sender: broadcast::Sender<RefillEvent>,
}

impl RefillEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefillEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: RefillEvent) {
        let _ = self.sender.send(event);
    }
}
