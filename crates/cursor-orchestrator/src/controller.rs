use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pagepilot_core_types::{
    ActionCommand, ActionType, ElementId, InteractiveElement, Inventory, Point, RunId,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::model::{
    ActionRecord, AgentRunState, RunPhase, RunReport, StepAction, TestPlan, TestStep,
};
use crate::plan::match_step;
use crate::pointer::PointerState;
use crate::ports::ActionPort;

pub const DEFAULT_TRAVEL_MS: u64 = 300;
pub const DEFAULT_HOLD_MS: u64 = 120;
pub const DEFAULT_RESCAN_WAIT_MS: u64 = 250;
pub const DEFAULT_RESCAN_LIMIT: u32 = 3;

/// Phrases typed into inputs when neither the plan nor the element suggests
/// anything better.
const SAMPLE_PHRASES: &[&str] = &[
    "hello from the walkthrough",
    "quick brown fox",
    "checking this field",
    "sample entry",
    "lorem ipsum dolor",
    "first pass",
    "does this stick",
    "automated visit",
];

const SCROLL_FALLBACK: f64 = 320.0;

#[derive(Clone, Copy, Debug)]
pub struct CursorConfig {
    /// Pointer flight time before an action lands.
    pub travel: Duration,
    /// How long the pressed state lingers after dispatch.
    pub hold: Duration,
    /// Grace period before re-using an inventory the sandbox has not
    /// refreshed in the meantime.
    pub rescan_wait: Duration,
    /// Inventories a plan step may consume before it is skipped.
    pub rescan_limit: u32,
    /// Random-walk action budget; `None` keeps going until stopped.
    pub max_actions: Option<u32>,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            travel: Duration::from_millis(DEFAULT_TRAVEL_MS),
            hold: Duration::from_millis(DEFAULT_HOLD_MS),
            rescan_wait: Duration::from_millis(DEFAULT_RESCAN_WAIT_MS),
            rescan_limit: DEFAULT_RESCAN_LIMIT,
            max_actions: None,
        }
    }
}

/// Start a cursor run over the given inventory stream.
///
/// With a plan the run walks its steps in order; without one it roams
/// uniformly at random. `seed` pins the random choices for reproducible
/// runs.
pub fn spawn_run(
    config: CursorConfig,
    port: Arc<dyn ActionPort>,
    inventory: watch::Receiver<Inventory>,
    plan: Option<TestPlan>,
    seed: Option<u64>,
) -> CursorHandle {
    let run_id = RunId::new();
    let (state_tx, state_rx) = watch::channel(AgentRunState::default());
    let (pointer_tx, pointer_rx) = watch::channel(PointerState::parked());
    let cancel = CancellationToken::new();
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let driver = RunDriver {
        run_id: run_id.clone(),
        config,
        port,
        inventory,
        plan,
        rng,
        state: state_tx,
        pointer: pointer_tx,
        cancel: cancel.clone(),
        last_seq: 0,
        actions: Vec::new(),
        skipped: Vec::new(),
    };
    let task = tokio::spawn(driver.run());

    CursorHandle {
        run_id,
        cancel,
        state: state_rx,
        pointer: pointer_rx,
        task: Some(task),
    }
}

/// Host-held handle for one cursor run.
pub struct CursorHandle {
    run_id: RunId,
    cancel: CancellationToken,
    state: watch::Receiver<AgentRunState>,
    pointer: watch::Receiver<PointerState>,
    task: Option<JoinHandle<RunReport>>,
}

impl CursorHandle {
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn state(&self) -> AgentRunState {
        *self.state.borrow()
    }

    pub fn pointer(&self) -> PointerState {
        *self.pointer.borrow()
    }

    pub fn state_stream(&self) -> watch::Receiver<AgentRunState> {
        self.state.clone()
    }

    pub fn pointer_stream(&self) -> watch::Receiver<PointerState> {
        self.pointer.clone()
    }

    /// Cancel every pending timer and return the loop to idle.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the loop to wind down and collect its report.
    pub async fn join(mut self) -> RunReport {
        if let Some(task) = self.task.take() {
            if let Ok(report) = task.await {
                return report;
            }
        }
        // The task panicked or was already reaped; report an empty failure.
        let now = Utc::now();
        RunReport {
            run: self.run_id.clone(),
            started_at: now,
            finished_at: now,
            completed: false,
            actions: Vec::new(),
            skipped_steps: Vec::new(),
        }
    }
}

impl Drop for CursorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct RunDriver {
    run_id: RunId,
    config: CursorConfig,
    port: Arc<dyn ActionPort>,
    inventory: watch::Receiver<Inventory>,
    plan: Option<TestPlan>,
    rng: StdRng,
    state: watch::Sender<AgentRunState>,
    pointer: watch::Sender<PointerState>,
    cancel: CancellationToken,
    last_seq: u64,
    actions: Vec<ActionRecord>,
    skipped: Vec<usize>,
}

impl RunDriver {
    async fn run(mut self) -> RunReport {
        let started_at = Utc::now();
        debug!(
            target: "cursor.run",
            run = %self.run_id,
            scripted = self.plan.is_some(),
            "run.started"
        );

        let completed = self.drive().await;

        self.pointer.send_replace(PointerState::parked());
        let phase = if completed { RunPhase::Complete } else { RunPhase::Idle };
        self.publish(phase, None);
        debug!(
            target: "cursor.run",
            run = %self.run_id,
            completed,
            actions = self.actions.len(),
            skipped = self.skipped.len(),
            "run.finished"
        );

        RunReport {
            run: self.run_id.clone(),
            started_at,
            finished_at: Utc::now(),
            completed,
            actions: self.actions,
            skipped_steps: self.skipped,
        }
    }

    /// Returns true when the run ended naturally, false when it was stopped
    /// or lost its port.
    async fn drive(&mut self) -> bool {
        match self.plan.take() {
            Some(plan) => self.drive_plan(plan).await,
            None => self.drive_random().await,
        }
    }

    async fn drive_plan(&mut self, plan: TestPlan) -> bool {
        for (index, step) in plan.steps.iter().enumerate() {
            if step.action == StepAction::Scroll {
                // Scroll steps have no target to wait for.
                self.publish(RunPhase::Acting, None);
                let command = ActionCommand::scroll(step.amount.unwrap_or(SCROLL_FALLBACK));
                if !self.act(None, command, Some(index)).await {
                    return false;
                }
                continue;
            }

            let mut attempts = 0u32;
            let matched = loop {
                self.publish(RunPhase::Scanning, None);
                let Some(inventory) = self.next_inventory().await else {
                    return false;
                };
                self.publish(RunPhase::AwaitingTarget, None);
                if let Some(id) = match_step(step, &inventory.elements) {
                    break Some((id, inventory));
                }
                attempts += 1;
                if attempts > self.config.rescan_limit {
                    debug!(
                        target: "cursor.run",
                        run = %self.run_id,
                        step = index,
                        attempts,
                        "step.skipped"
                    );
                    self.skipped.push(index);
                    break None;
                }
            };
            let Some((id, inventory)) = matched else {
                continue;
            };
            let Some(element) = inventory.find(id).cloned() else {
                continue;
            };

            let command = self.command_for_step(step, &element);
            self.publish(RunPhase::Acting, Some(id));
            if !self.animate_to(element.geometry.center()).await {
                return false;
            }
            if !self.act(Some(id), command, Some(index)).await {
                return false;
            }
        }
        true
    }

    async fn drive_random(&mut self) -> bool {
        loop {
            if let Some(max) = self.config.max_actions {
                if self.actions.len() as u32 >= max {
                    return true;
                }
            }

            self.publish(RunPhase::Scanning, None);
            let Some(inventory) = self.next_inventory().await else {
                return false;
            };
            self.publish(RunPhase::AwaitingTarget, None);

            let index = self.rng.gen_range(0..inventory.elements.len());
            let element = inventory.elements[index].clone();
            debug!(
                target: "cursor.run",
                run = %self.run_id,
                id = %element.id,
                kind = %element.action_type,
                "target.acquired"
            );

            let command = self.command_for_element(&element);
            self.publish(RunPhase::Acting, Some(element.id));
            if !self.animate_to(element.geometry.center()).await {
                return false;
            }
            if !self.act(Some(element.id), command, None).await {
                return false;
            }
        }
    }

    /// Block until a non-empty inventory is available. Prefers a fresh scan;
    /// after the grace period the previous one is reused so the loop keeps
    /// moving even when the sandbox has nothing new to say.
    async fn next_inventory(&mut self) -> Option<Inventory> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            let snapshot = self.inventory.borrow_and_update().clone();
            if snapshot.is_empty() {
                // Nothing to aim at; rest off-screen in awaiting-target until
                // the picture changes.
                self.pointer.send_replace(PointerState::parked());
                self.publish(RunPhase::AwaitingTarget, None);
                debug!(
                    target: "cursor.run",
                    run = %self.run_id,
                    seq = snapshot.seq,
                    "inventory.empty"
                );
                tokio::select! {
                    _ = self.cancel.cancelled() => return None,
                    changed = self.inventory.changed() => changed.ok()?,
                }
            } else if snapshot.seq != self.last_seq {
                self.last_seq = snapshot.seq;
                return Some(snapshot);
            } else {
                tokio::select! {
                    _ = self.cancel.cancelled() => return None,
                    changed = self.inventory.changed() => changed.ok()?,
                    _ = sleep(self.config.rescan_wait) => return Some(snapshot),
                }
            }
        }
    }

    fn command_for_element(&mut self, element: &InteractiveElement) -> ActionCommand {
        match element.action_type {
            ActionType::Input => ActionCommand::type_text(element.id, self.sample_phrase()),
            ActionType::Click | ActionType::Navigate => ActionCommand::click(element.id),
        }
    }

    fn command_for_step(&mut self, step: &TestStep, element: &InteractiveElement) -> ActionCommand {
        match step.action {
            StepAction::Click => ActionCommand::click(element.id),
            StepAction::Type => {
                let text = match &step.text {
                    Some(text) => text.clone(),
                    None => self.sample_phrase(),
                };
                ActionCommand::type_text(element.id, text)
            }
            StepAction::Scroll => ActionCommand::scroll(step.amount.unwrap_or(SCROLL_FALLBACK)),
        }
    }

    fn sample_phrase(&mut self) -> String {
        SAMPLE_PHRASES[self.rng.gen_range(0..SAMPLE_PHRASES.len())].to_string()
    }

    /// Fly the pointer to its target. False means the run was stopped
    /// mid-flight and nothing was dispatched.
    async fn animate_to(&mut self, point: Point) -> bool {
        self.pointer.send_modify(|pointer| {
            pointer.visible = true;
            pointer.pressed = false;
        });
        tokio::select! {
            _ = self.cancel.cancelled() => return false,
            _ = sleep(self.config.travel) => {}
        }
        self.pointer.send_replace(PointerState::aimed(point));
        true
    }

    async fn act(
        &mut self,
        target: Option<ElementId>,
        command: ActionCommand,
        step: Option<usize>,
    ) -> bool {
        let verb = command.verb;
        self.pointer.send_modify(|pointer| pointer.pressed = true);
        if let Err(error) = self.port.dispatch(command).await {
            warn!(
                target: "cursor.run",
                run = %self.run_id,
                %error,
                "action.dispatch_failed"
            );
            return false;
        }
        self.actions.push(ActionRecord {
            verb,
            target,
            step,
            at: Utc::now(),
        });
        debug!(
            target: "cursor.run",
            run = %self.run_id,
            %verb,
            target = ?target,
            "action.dispatched"
        );
        tokio::select! {
            _ = self.cancel.cancelled() => return false,
            _ = sleep(self.config.hold) => {}
        }
        self.pointer.send_modify(|pointer| pointer.pressed = false);
        true
    }

    fn publish(&self, phase: RunPhase, target: Option<ElementId>) {
        self.state.send_replace(AgentRunState { phase, target });
    }
}
