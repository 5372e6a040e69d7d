//! Assistant engine tests — the widget state machine against mock generators.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use taskdeck::assistant::{
    Assistant, ChatMessage, GenerateParams, Generator, Role, Snapshot, GENERATION_FAILED_REPLY,
    GREETING, STILL_LOADING_REPLY,
};
use tokio::sync::Notify;

fn params() -> GenerateParams {
    GenerateParams {
        max_new_tokens: 100,
        temperature: 0.7,
        repetition_penalty: 1.2,
    }
}

/// Poll the snapshot until `cond` holds or the test times out.
async fn wait_for(
    assistant: &Arc<Assistant>,
    cond: impl Fn(&Snapshot) -> bool,
) -> Snapshot {
    for _ in 0..400 {
        let snap = assistant.snapshot().await;
        if cond(&snap) {
            return snap;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("snapshot condition not met within 2s");
}

fn texts(transcript: &[ChatMessage]) -> Vec<(Role, &str)> {
    transcript.iter().map(|m| (m.role, m.text.as_str())).collect()
}

// ─── Mock generators ──────────────────────────────────────────────────────────

/// Acquires instantly; each generate waits for a release signal, then echoes.
struct GatedEcho {
    release: Notify,
}

#[async_trait]
impl Generator for GatedEcho {
    async fn acquire(&self, progress: &(dyn Fn(u8) + Send + Sync)) -> Result<()> {
        progress(100);
        Ok(())
    }

    async fn generate(&self, prompt: &str, _params: &GenerateParams) -> Result<String> {
        self.release.notified().await;
        Ok(format!("echo: {prompt}"))
    }
}

/// Never finishes acquiring — reports partial progress and stalls.
struct StalledAcquire;

#[async_trait]
impl Generator for StalledAcquire {
    async fn acquire(&self, progress: &(dyn Fn(u8) + Send + Sync)) -> Result<()> {
        progress(37);
        std::future::pending::<()>().await;
        unreachable!()
    }

    async fn generate(&self, _prompt: &str, _params: &GenerateParams) -> Result<String> {
        panic!("generate must not be called while loading");
    }
}

/// Acquisition fails outright.
struct BrokenAcquire;

#[async_trait]
impl Generator for BrokenAcquire {
    async fn acquire(&self, _progress: &(dyn Fn(u8) + Send + Sync)) -> Result<()> {
        bail!("model server unreachable")
    }

    async fn generate(&self, _prompt: &str, _params: &GenerateParams) -> Result<String> {
        panic!("generate must not be called after a failed acquisition");
    }
}

/// Acquires fine; every generate call errors.
struct FailingGenerate;

#[async_trait]
impl Generator for FailingGenerate {
    async fn acquire(&self, progress: &(dyn Fn(u8) + Send + Sync)) -> Result<()> {
        progress(100);
        Ok(())
    }

    async fn generate(&self, _prompt: &str, _params: &GenerateParams) -> Result<String> {
        bail!("inference exploded")
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn starts_with_the_greeting() {
    let assistant = Assistant::new(Arc::new(GatedEcho { release: Notify::new() }), params());
    let snap = assistant.snapshot().await;
    assert!(snap.loading);
    assert_eq!(texts(&snap.transcript), vec![(Role::Bot, GREETING)]);
}

#[tokio::test]
async fn send_while_loading_appends_fixed_reply_without_inference() {
    let assistant = Assistant::new(Arc::new(StalledAcquire), params());
    assistant.start();

    assert!(assistant.send("hello?").await);
    let snap = assistant.snapshot().await;
    assert!(!snap.generating);
    assert_eq!(
        texts(&snap.transcript),
        vec![
            (Role::Bot, GREETING),
            (Role::User, "hello?"),
            (Role::Bot, STILL_LOADING_REPLY),
        ]
    );
}

#[tokio::test]
async fn acquisition_progress_surfaces_in_the_snapshot() {
    let assistant = Assistant::new(Arc::new(StalledAcquire), params());
    assistant.start();
    let snap = wait_for(&assistant, |s| s.progress == 37).await;
    assert!(snap.loading);
}

#[tokio::test]
async fn empty_or_whitespace_input_is_rejected() {
    let assistant = Assistant::new(Arc::new(GatedEcho { release: Notify::new() }), params());
    assert!(!assistant.send("").await);
    assert!(!assistant.send("   ").await);
    assert_eq!(assistant.snapshot().await.transcript.len(), 1);
}

#[tokio::test]
async fn second_send_is_rejected_while_generating() {
    let generator = Arc::new(GatedEcho { release: Notify::new() });
    let assistant = Assistant::new(generator.clone(), params());
    assistant.start();
    wait_for(&assistant, |s| !s.loading).await;

    assert!(assistant.send("one").await);
    assert!(assistant.snapshot().await.generating);

    // Single-flight guard: the transcript gains nothing from this attempt.
    assert!(!assistant.send("two").await);
    assert_eq!(assistant.snapshot().await.transcript.len(), 2);

    generator.release.notify_one();
    let snap = wait_for(&assistant, |s| !s.generating).await;
    assert_eq!(
        texts(&snap.transcript),
        vec![
            (Role::Bot, GREETING),
            (Role::User, "one"),
            (Role::Bot, "echo: one"),
        ]
    );

    // Once idle again, sending works.
    assert!(assistant.send("two").await);
    generator.release.notify_one();
    let snap = wait_for(&assistant, |s| !s.generating).await;
    assert_eq!(snap.transcript.last().unwrap().text, "echo: two");
}

#[tokio::test]
async fn generation_failure_appends_the_apology() {
    let assistant = Assistant::new(Arc::new(FailingGenerate), params());
    assistant.start();
    wait_for(&assistant, |s| !s.loading).await;

    assert!(assistant.send("boom").await);
    let snap = wait_for(&assistant, |s| !s.generating).await;
    assert_eq!(snap.transcript.last().unwrap().text, GENERATION_FAILED_REPLY);
}

#[tokio::test]
async fn failed_acquisition_degrades_silently_for_the_session() {
    let assistant = Assistant::new(Arc::new(BrokenAcquire), params());
    assistant.start();
    let snap = wait_for(&assistant, |s| !s.loading).await;
    assert!(!snap.generating);

    // Every send for the rest of the session hits the still-loading branch.
    assert!(assistant.send("anyone there?").await);
    let snap = assistant.snapshot().await;
    assert_eq!(snap.transcript.last().unwrap().text, STILL_LOADING_REPLY);
}

#[tokio::test]
async fn reset_restores_the_greeting_without_reloading() {
    let generator = Arc::new(GatedEcho { release: Notify::new() });
    let assistant = Assistant::new(generator.clone(), params());
    assistant.start();
    wait_for(&assistant, |s| !s.loading).await;

    assistant.send("one").await;
    generator.release.notify_one();
    wait_for(&assistant, |s| !s.generating).await;

    assistant.reset().await;
    let snap = assistant.snapshot().await;
    assert_eq!(texts(&snap.transcript), vec![(Role::Bot, GREETING)]);

    // Model state survived the reset — no still-loading branch.
    assert!(assistant.send("again").await);
    generator.release.notify_one();
    let snap = wait_for(&assistant, |s| !s.generating).await;
    assert_eq!(snap.transcript.last().unwrap().text, "echo: again");
}

#[tokio::test]
async fn in_flight_reply_lands_in_the_transcript_after_a_reset() {
    let generator = Arc::new(GatedEcho { release: Notify::new() });
    let assistant = Assistant::new(generator.clone(), params());
    assistant.start();
    wait_for(&assistant, |s| !s.loading).await;

    assistant.send("slow one").await;
    assistant.reset().await;

    // No cancellation: the late reply appends to the fresh transcript.
    generator.release.notify_one();
    let snap = wait_for(&assistant, |s| !s.generating).await;
    assert_eq!(
        texts(&snap.transcript),
        vec![(Role::Bot, GREETING), (Role::Bot, "echo: slow one")]
    );
}
