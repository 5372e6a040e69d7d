//! Assistant chat engine.
//!
//! Headless state machine behind the chat panel: loading → ready →
//! generating ⇄ ready. The UI renders snapshots; all transitions happen
//! here. Inference runs on a spawned task so the transcript repaints before
//! the potentially slow call, and a single-flight guard rejects sends while
//! a generation is already in flight.

pub mod generator;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info};

pub use self::generator::{GenerateParams, Generator, OllamaGenerator};

pub const GREETING: &str = "Hello! I am your AI assistant. How can I help you today?";
pub const STILL_LOADING_REPLY: &str = "I'm still loading my brain... please wait a moment!";
pub const GENERATION_FAILED_REPLY: &str = "Sorry, I encountered an error processing your request.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

/// One transcript entry. Ephemeral — never persisted.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    fn bot(text: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            text: text.into(),
        }
    }
}

struct Inner {
    transcript: Vec<ChatMessage>,
    /// True until acquisition finishes — success or failure. A failed
    /// acquisition clears this flag but never sets `acquired`, so the widget
    /// degrades to the still-loading reply for the rest of the session.
    loading: bool,
    acquired: bool,
    generating: bool,
}

/// Point-in-time view of the widget, for rendering.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub transcript: Vec<ChatMessage>,
    pub loading: bool,
    pub generating: bool,
    pub progress: u8,
}

pub struct Assistant {
    generator: Arc<dyn Generator>,
    params: GenerateParams,
    inner: Mutex<Inner>,
    progress: AtomicU8,
}

impl Assistant {
    pub fn new(generator: Arc<dyn Generator>, params: GenerateParams) -> Arc<Self> {
        Arc::new(Self {
            generator,
            params,
            inner: Mutex::new(Inner {
                transcript: vec![ChatMessage::bot(GREETING)],
                loading: true,
                acquired: false,
                generating: false,
            }),
            progress: AtomicU8::new(0),
        })
    }

    /// Begin asynchronous model acquisition. Progress lands in the snapshot
    /// as a 0-100 percentage. Acquisition failure is logged and leaves the
    /// widget silently degraded — no retry is attempted.
    pub fn start(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let cb = {
                let this = Arc::clone(&this);
                move |pct: u8| this.progress.store(pct, Ordering::Relaxed)
            };
            let result = this.generator.acquire(&cb).await;
            let mut inner = this.inner.lock().await;
            inner.loading = false;
            match result {
                Ok(()) => {
                    inner.acquired = true;
                    this.progress.store(100, Ordering::Relaxed);
                    info!("assistant model ready");
                }
                Err(e) => {
                    let err = format!("{e:#}");
                    error!(err = %err, "assistant model acquisition failed — assistant disabled for this session");
                }
            }
        });
    }

    /// Submit a message. Returns `false` when the input trims empty or a
    /// generation is already in flight (single-flight guard) — the transcript
    /// is untouched in both cases.
    ///
    /// While the model is unavailable the user message still lands in the
    /// transcript, followed immediately by the fixed still-loading reply.
    pub async fn send(self: &Arc<Self>, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        let mut inner = self.inner.lock().await;
        if inner.generating {
            return false;
        }

        inner.transcript.push(ChatMessage::user(text));

        if !inner.acquired {
            inner.transcript.push(ChatMessage::bot(STILL_LOADING_REPLY));
            return true;
        }

        inner.generating = true;
        drop(inner);

        let this = Arc::clone(self);
        let prompt = text.to_string();
        tokio::spawn(async move {
            // Yield once so the just-appended user message paints before
            // inference occupies the executor.
            tokio::task::yield_now().await;

            let reply = match this.generator.generate(&prompt, &this.params).await {
                Ok(text) => text,
                Err(e) => {
                    let err = format!("{e:#}");
                    error!(err = %err, "assistant generation failed");
                    GENERATION_FAILED_REPLY.to_string()
                }
            };

            // No cancellation: a reset mid-generation still receives the
            // reply into whatever transcript exists now.
            let mut inner = this.inner.lock().await;
            inner.transcript.push(ChatMessage::bot(reply));
            inner.generating = false;
        });

        true
    }

    /// Clear the transcript back to the single greeting. Does not reload the
    /// model and does not cancel an in-flight generation.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.transcript = vec![ChatMessage::bot(GREETING)];
    }

    pub async fn snapshot(&self) -> Snapshot {
        let inner = self.inner.lock().await;
        Snapshot {
            transcript: inner.transcript.clone(),
            loading: inner.loading,
            generating: inner.generating,
            progress: self.progress.load(Ordering::Relaxed),
        }
    }
}
