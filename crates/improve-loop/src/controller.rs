use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pagepilot_core_types::RunId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::model::{GeneratedFile, ImprovePhase, ImproveReport, ImproveStatus, PromptRecord};
use crate::ports::{CredentialStore, GenerationService, HostView, PromptSurface};
use crate::services::detect_services;

pub const DEFAULT_DWELL_MS: u64 = 1200;
pub const DEFAULT_PER_CHAR_MS: u64 = 45;
pub const DEFAULT_POLL_MS: u64 = 1500;
pub const DEFAULT_REVIEW_PROBABILITY: f64 = 0.5;

#[derive(Clone, Copy, Debug)]
pub struct ImproveConfig {
    /// Pause on the source view during a review pass.
    pub dwell: Duration,
    /// Keystroke cadence for the host prompt field.
    pub per_char: Duration,
    /// Interval between credential re-checks.
    pub poll_interval: Duration,
    /// Chance a cycle opens with a source-view review.
    pub review_probability: f64,
    /// Cycle budget; `None` keeps going until stopped.
    pub max_cycles: Option<u32>,
}

impl Default for ImproveConfig {
    fn default() -> Self {
        Self {
            dwell: Duration::from_millis(DEFAULT_DWELL_MS),
            per_char: Duration::from_millis(DEFAULT_PER_CHAR_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            review_probability: DEFAULT_REVIEW_PROBABILITY,
            max_cycles: None,
        }
    }
}

/// Start the improvement loop against the given collaborators. `files` is
/// the generated app the service sees; `seed` pins the review coin flips.
pub fn spawn_improve(
    config: ImproveConfig,
    service: Arc<dyn GenerationService>,
    credentials: Arc<dyn CredentialStore>,
    surface: Arc<dyn PromptSurface>,
    files: Vec<GeneratedFile>,
    seed: Option<u64>,
) -> ImproveHandle {
    let run_id = RunId::new();
    let (status_tx, status_rx) = watch::channel(ImproveStatus::default());
    let build_finished = Arc::new(Notify::new());
    let cancel = CancellationToken::new();
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let driver = LoopDriver {
        run_id: run_id.clone(),
        config,
        service,
        credentials,
        surface,
        files,
        rng,
        status: status_tx,
        build_finished: build_finished.clone(),
        cancel: cancel.clone(),
        history: Vec::new(),
        cycle: 0,
    };
    let task = tokio::spawn(driver.run());

    ImproveHandle {
        run_id,
        cancel,
        status: status_rx,
        build_finished,
        task: Some(task),
    }
}

/// Host-held handle for one improvement run.
pub struct ImproveHandle {
    run_id: RunId,
    cancel: CancellationToken,
    status: watch::Receiver<ImproveStatus>,
    build_finished: Arc<Notify>,
    task: Option<JoinHandle<ImproveReport>>,
}

impl ImproveHandle {
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn status(&self) -> ImproveStatus {
        self.status.borrow().clone()
    }

    pub fn status_stream(&self) -> watch::Receiver<ImproveStatus> {
        self.status.clone()
    }

    /// External signal that the build triggered by the last submit is done;
    /// re-arms the loop for its next cycle. Safe to call early, the permit
    /// is retained.
    pub fn notify_build_finished(&self) {
        self.build_finished.notify_one();
    }

    /// Cancel the run wherever it is suspended.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the loop to wind down and collect its report.
    pub async fn join(mut self) -> ImproveReport {
        if let Some(task) = self.task.take() {
            if let Ok(report) = task.await {
                return report;
            }
        }
        let now = Utc::now();
        ImproveReport {
            run: self.run_id.clone(),
            started_at: now,
            finished_at: now,
            completed: false,
            cycles: 0,
            prompts: Vec::new(),
            failure: None,
        }
    }
}

impl Drop for ImproveHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

enum Outcome {
    Completed,
    Stopped,
    Failed(String),
}

struct LoopDriver {
    run_id: RunId,
    config: ImproveConfig,
    service: Arc<dyn GenerationService>,
    credentials: Arc<dyn CredentialStore>,
    surface: Arc<dyn PromptSurface>,
    files: Vec<GeneratedFile>,
    rng: StdRng,
    status: watch::Sender<ImproveStatus>,
    build_finished: Arc<Notify>,
    cancel: CancellationToken,
    history: Vec<PromptRecord>,
    cycle: u32,
}

impl LoopDriver {
    async fn run(mut self) -> ImproveReport {
        let started_at = Utc::now();
        debug!(target: "improve.run", run = %self.run_id, "loop.started");

        let outcome = self.drive().await;

        let (completed, failure) = match outcome {
            Outcome::Completed => (true, None),
            Outcome::Stopped => (false, None),
            Outcome::Failed(message) => (false, Some(message)),
        };
        debug!(
            target: "improve.run",
            run = %self.run_id,
            completed,
            cycles = self.cycle,
            "loop.finished"
        );

        ImproveReport {
            run: self.run_id.clone(),
            started_at,
            finished_at: Utc::now(),
            completed,
            cycles: self.cycle,
            prompts: self.history,
            failure,
        }
    }

    async fn drive(&mut self) -> Outcome {
        loop {
            // 1. Probabilistic review pass.
            let review_probability = self.config.review_probability.clamp(0.0, 1.0);
            if self.rng.gen_bool(review_probability) {
                self.publish(ImprovePhase::Reviewing, None, "reviewing the generated app");
                self.surface.switch_view(HostView::Source).await;
                if !self.pause(self.config.dwell).await {
                    return Outcome::Stopped;
                }
                self.surface.switch_view(HostView::Preview).await;
            }

            // 2. Ask for the next change request.
            self.publish(ImprovePhase::Analyzing, None, "asking for the next improvement");
            let call = self.service.next_change(&self.files, &self.history);
            let request = tokio::select! {
                _ = self.cancel.cancelled() => return Outcome::Stopped,
                result = call => match result {
                    Ok(request) => request,
                    Err(error) => {
                        let message = error.to_string();
                        warn!(
                            target: "improve.run",
                            run = %self.run_id,
                            %error,
                            "generation.failed"
                        );
                        self.publish(ImprovePhase::Analyzing, None, &message);
                        return Outcome::Failed(message);
                    }
                }
            };
            debug!(
                target: "improve.run",
                run = %self.run_id,
                chars = request.chars().count(),
                "request.generated"
            );

            // 3. Gate on every credential the request implies.
            for service_key in detect_services(&request) {
                if !self.wait_for_credential(service_key).await {
                    return Outcome::Stopped;
                }
            }

            // 4. Type the request into the host prompt field.
            self.publish(ImprovePhase::Typing, None, &request);
            let mut chars = request.chars().peekable();
            while let Some(ch) = chars.next() {
                self.surface.append_char(ch).await;
                if chars.peek().is_some() && !self.pause(self.config.per_char).await {
                    return Outcome::Stopped;
                }
            }

            // 5. Submit and record.
            self.publish(ImprovePhase::Submitting, None, &request);
            self.surface.submit().await;
            self.history.push(PromptRecord {
                text: request,
                at: Utc::now(),
            });
            self.cycle += 1;
            debug!(
                target: "improve.run",
                run = %self.run_id,
                cycle = self.cycle,
                "prompt.submitted"
            );

            if let Some(max) = self.config.max_cycles {
                if self.cycle >= max {
                    return Outcome::Completed;
                }
            }

            // 6. Yield until the external build-finished signal re-arms us.
            self.publish(ImprovePhase::Building, None, "waiting for the build to finish");
            tokio::select! {
                _ = self.cancel.cancelled() => return Outcome::Stopped,
                _ = self.build_finished.notified() => {}
            }
        }
    }

    /// Block until the credential for `key` is present, re-checking on the
    /// poll interval. False means the run was stopped while waiting.
    async fn wait_for_credential(&mut self, key: &str) -> bool {
        if self.credentials.present(key).await {
            return true;
        }
        self.publish(
            ImprovePhase::AwaitingCredential,
            Some(key),
            &format!("waiting for a {key} credential"),
        );
        debug!(
            target: "improve.run",
            run = %self.run_id,
            service = key,
            "credential.missing"
        );
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return false,
                _ = sleep(self.config.poll_interval) => {}
            }
            if self.credentials.present(key).await {
                debug!(
                    target: "improve.run",
                    run = %self.run_id,
                    service = key,
                    "credential.present"
                );
                return true;
            }
        }
    }

    /// False when the run was stopped during the pause.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = sleep(duration) => true,
        }
    }

    fn publish(&self, phase: ImprovePhase, missing: Option<&str>, message: &str) {
        self.status.send_replace(ImproveStatus {
            phase,
            missing_credential: missing.map(str::to_string),
            message: message.to_string(),
            cycle: self.cycle,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{MemoryCredentialStore, RecordingSurface, ScriptedGenerationService};
    use tokio::time::timeout;

    fn fast_config() -> ImproveConfig {
        ImproveConfig {
            dwell: Duration::from_millis(2),
            per_char: Duration::from_millis(1),
            poll_interval: Duration::from_millis(5),
            review_probability: 0.0,
            max_cycles: Some(1),
        }
    }

    async fn wait_for_phase(stream: &mut watch::Receiver<ImproveStatus>, phase: ImprovePhase) {
        timeout(Duration::from_secs(2), async {
            loop {
                if stream.borrow().phase == phase {
                    return;
                }
                stream.changed().await.expect("loop alive");
            }
        })
        .await
        .expect("phase within deadline");
    }

    #[tokio::test]
    async fn a_cycle_types_and_submits_the_request() {
        let service = Arc::new(ScriptedGenerationService::new(["add a contact form"]));
        let credentials = Arc::new(MemoryCredentialStore::new());
        let surface = Arc::new(RecordingSurface::new());

        let handle = spawn_improve(
            fast_config(),
            service,
            credentials,
            surface.clone(),
            Vec::new(),
            Some(1),
        );
        let report = handle.join().await;

        assert!(report.completed);
        assert_eq!(report.cycles, 1);
        assert_eq!(surface.submissions(), vec!["add a contact form".to_string()]);
        assert_eq!(report.prompts[0].text, "add a contact form");
        assert!(surface.prompt().is_empty());
    }

    #[tokio::test]
    async fn missing_credentials_block_until_supplied_without_regenerating() {
        let service = Arc::new(ScriptedGenerationService::new(["wire up stripe payments"]));
        let credentials = Arc::new(MemoryCredentialStore::new());
        let surface = Arc::new(RecordingSurface::new());

        let handle = spawn_improve(
            fast_config(),
            service.clone(),
            credentials.clone(),
            surface.clone(),
            Vec::new(),
            Some(1),
        );
        let mut stream = handle.status_stream();
        wait_for_phase(&mut stream, ImprovePhase::AwaitingCredential).await;
        let status = handle.status();
        assert_eq!(status.missing_credential.as_deref(), Some("stripe"));
        assert!(surface.submissions().is_empty());

        // It keeps re-checking rather than moving on.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(handle.status().phase, ImprovePhase::AwaitingCredential);

        credentials.insert("stripe", "sk_test_1");
        let report = handle.join().await;

        assert!(report.completed);
        assert_eq!(surface.submissions(), vec!["wire up stripe payments".to_string()]);
        // The request was never regenerated while waiting.
        assert_eq!(service.remaining(), 0);
    }

    #[tokio::test]
    async fn stopping_mid_typing_never_submits() {
        let request = "please restyle the dashboard with a calmer palette and bigger charts";
        let service = Arc::new(ScriptedGenerationService::new([request]));
        let credentials = Arc::new(MemoryCredentialStore::new());
        let surface = Arc::new(RecordingSurface::new());
        let config = ImproveConfig {
            per_char: Duration::from_millis(10),
            ..fast_config()
        };

        let handle =
            spawn_improve(config, service, credentials, surface.clone(), Vec::new(), Some(1));
        let mut stream = handle.status_stream();
        wait_for_phase(&mut stream, ImprovePhase::Typing).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop();
        let report = handle.join().await;

        assert!(!report.completed);
        assert!(report.failure.is_none());
        assert!(surface.submissions().is_empty());
        let partial = surface.prompt();
        assert!(!partial.is_empty());
        assert!(partial.len() < request.len());

        // A stopped run makes no further transitions.
        let settled = stream.borrow().clone();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*stream.borrow(), settled);
    }

    #[tokio::test]
    async fn generation_failures_surface_verbatim_and_halt() {
        let service = Arc::new(
            ScriptedGenerationService::new(Vec::<String>::new())
                .with_failure("the model is overloaded"),
        );
        let credentials = Arc::new(MemoryCredentialStore::new());
        let surface = Arc::new(RecordingSurface::new());

        let handle = spawn_improve(
            fast_config(),
            service,
            credentials,
            surface.clone(),
            Vec::new(),
            Some(1),
        );
        let stream = handle.status_stream();
        let report = handle.join().await;

        assert!(!report.completed);
        assert_eq!(report.failure.as_deref(), Some("the model is overloaded"));
        assert_eq!(stream.borrow().message, "the model is overloaded");
        assert!(surface.submissions().is_empty());
    }

    #[tokio::test]
    async fn build_finished_rearms_the_next_cycle() {
        let service = Arc::new(ScriptedGenerationService::new(["first change", "second change"]));
        let credentials = Arc::new(MemoryCredentialStore::new());
        let surface = Arc::new(RecordingSurface::new());
        let config = ImproveConfig {
            max_cycles: Some(2),
            ..fast_config()
        };

        let handle =
            spawn_improve(config, service, credentials, surface.clone(), Vec::new(), Some(1));
        let mut stream = handle.status_stream();
        wait_for_phase(&mut stream, ImprovePhase::Building).await;
        assert_eq!(surface.submissions(), vec!["first change".to_string()]);

        handle.notify_build_finished();
        let report = handle.join().await;

        assert!(report.completed);
        assert_eq!(report.cycles, 2);
        assert_eq!(
            surface.submissions(),
            vec!["first change".to_string(), "second change".to_string()]
        );
    }

    #[tokio::test]
    async fn review_passes_visit_the_source_view_and_return() {
        let service = Arc::new(ScriptedGenerationService::new(["tweak the colors"]));
        let credentials = Arc::new(MemoryCredentialStore::new());
        let surface = Arc::new(RecordingSurface::new());
        let config = ImproveConfig {
            review_probability: 1.0,
            ..fast_config()
        };

        let handle =
            spawn_improve(config, service, credentials, surface.clone(), Vec::new(), Some(1));
        let report = handle.join().await;

        assert!(report.completed);
        assert_eq!(surface.views(), vec![HostView::Source, HostView::Preview]);
    }
}
