//! The autoplay controller.
//!
//! One [`Autoplay`] drives one [`GameSession`]:
//!
//! ```text
//! while not stopped: decide (deadline, abandoned on stop) -> apply -> pause
//! ```
//!
//! A failed or late decision becomes a move followed by an extra backoff
//! pause, so the loop never stalls on the decision service. The run ends
//! when the agent reaches the gateway, gets stuck, hits the step limit, or
//! the [`StopSignal`] fires.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use wander_core::{GameSession, ItemOutcome, SessionError, SessionStatus};
use wander_types::{Decision, DecisionAction};

use crate::decision::DecisionSource;
use crate::error::RunnerError;

#[derive(Debug, Default)]
struct StopState {
    stopped: AtomicBool,
    notify: Notify,
}

/// Cloneable handle that ends an autoplay run at its next await point.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    state: Arc<StopState>,
}

impl StopSignal {
    /// A signal that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Idempotent.
    pub fn stop(&self) {
        self.state.stopped.store(true, Ordering::Release);
        self.state.notify.notify_waiters();
    }

    /// Whether the signal has fired.
    pub fn is_stopped(&self) -> bool {
        self.state.stopped.load(Ordering::Acquire)
    }

    /// Resolve once the signal has fired.
    pub async fn stopped(&self) {
        loop {
            // Registered before the check so a concurrent stop is not missed.
            let notified = self.state.notify.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }
}

/// Pacing and limits for one run.
#[derive(Debug, Clone)]
pub struct AutoplaySettings {
    /// Deadline for one decision.
    pub decision_timeout: Duration,
    /// Pause after every turn.
    pub interval: Duration,
    /// Extra pause after a failed or late decision.
    pub retry_backoff: Duration,
    /// Stop once the session has taken this many steps.
    pub max_steps: u64,
    /// Objective sent with every request.
    pub goal: String,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoplayEnd {
    /// The agent arrived at the sink.
    ReachedGateway,
    /// The agent is on a dead end that is not the sink.
    Stuck,
    /// The step limit was reached.
    StepLimit,
    /// The stop signal fired.
    Stopped,
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoplaySummary {
    /// Why the run ended.
    pub end: AutoplayEnd,
    /// Steps the session has taken.
    pub steps: u64,
    /// Decisions requested.
    pub turns: u64,
    /// Items that were consumed.
    pub items_used: u64,
    /// Decisions replaced by a fallback move.
    pub fallbacks: u64,
}

#[derive(Debug, Default)]
struct Tally {
    turns: u64,
    items_used: u64,
    fallbacks: u64,
}

/// Drives one session with decisions from `S`.
pub struct Autoplay<S> {
    session: GameSession,
    source: S,
    settings: AutoplaySettings,
    stop: StopSignal,
}

impl<S: DecisionSource> Autoplay<S> {
    /// Set up a run. Nothing happens until [`Autoplay::run`].
    pub fn new(session: GameSession, source: S, settings: AutoplaySettings) -> Self {
        Self {
            session,
            source,
            settings,
            stop: StopSignal::new(),
        }
    }

    /// A handle that stops this run.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// The session being played.
    pub const fn session(&self) -> &GameSession {
        &self.session
    }

    /// Play until the game ends, the step limit is hit, or stop fires.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Session`] only for session failures other
    /// than reaching a dead end. Decision failures never surface here.
    pub async fn run(&mut self) -> Result<AutoplaySummary, RunnerError> {
        let mut tally = Tally::default();
        info!(
            source = self.source.name(),
            start = %self.session.current(),
            max_steps = self.settings.max_steps,
            "autoplay started"
        );

        let end = loop {
            if let Some(end) = self.finished() {
                break end;
            }
            tally.turns = tally.turns.saturating_add(1);
            let request = self.session.decision_request(&self.settings.goal);

            let reply = tokio::select! {
                biased;
                () = self.stop.stopped() => {
                    info!(turn = tally.turns, "stop requested, abandoning in-flight decision");
                    break AutoplayEnd::Stopped;
                }
                reply = timeout(self.settings.decision_timeout, self.source.decide(&request)) => {
                    reply.unwrap_or_else(|_elapsed| Err(RunnerError::Timeout))
                }
            };

            let (decision, degraded) = match reply {
                Ok(decision) => (decision, false),
                Err(e) => {
                    warn!(turn = tally.turns, source = self.source.name(), error = %e, "decision unavailable, moving");
                    tally.fallbacks = tally.fallbacks.saturating_add(1);
                    (Decision::fallback_move(&e.to_string()), true)
                }
            };

            if let Some(end) = self.apply(&decision, &mut tally)? {
                break end;
            }

            let pause = if degraded {
                self.settings.interval.saturating_add(self.settings.retry_backoff)
            } else {
                self.settings.interval
            };
            tokio::select! {
                biased;
                () = self.stop.stopped() => break AutoplayEnd::Stopped,
                () = sleep(pause) => {}
            }
        };

        let summary = AutoplaySummary {
            end,
            steps: self.session.steps(),
            turns: tally.turns,
            items_used: tally.items_used,
            fallbacks: tally.fallbacks,
        };
        info!(
            end = ?summary.end,
            steps = summary.steps,
            turns = summary.turns,
            items_used = summary.items_used,
            fallbacks = summary.fallbacks,
            at = %self.session.current(),
            "autoplay finished"
        );
        Ok(summary)
    }

    fn finished(&self) -> Option<AutoplayEnd> {
        if self.stop.is_stopped() {
            return Some(AutoplayEnd::Stopped);
        }
        if let Some(end) = end_for(self.session.status()) {
            return Some(end);
        }
        (self.session.steps() >= self.settings.max_steps).then_some(AutoplayEnd::StepLimit)
    }

    /// Carry out a decision. An item that changes nothing is kept and the
    /// turn becomes a move.
    fn apply(&mut self, decision: &Decision, tally: &mut Tally) -> Result<Option<AutoplayEnd>, RunnerError> {
        if decision.action == DecisionAction::UseItem
            && let Some(index) = decision.item_index
            && self.use_item(index)?
        {
            tally.items_used = tally.items_used.saturating_add(1);
            return Ok(None);
        }
        self.take_step()
    }

    /// Returns whether the item was consumed.
    fn use_item(&mut self, index: u32) -> Result<bool, RunnerError> {
        let slot = usize::try_from(index).unwrap_or(usize::MAX);
        match self.session.use_item(slot) {
            Ok(outcome @ (ItemOutcome::Applied { .. } | ItemOutcome::Changed { .. } | ItemOutcome::Drained { .. })) => {
                debug!(index, outcome = ?outcome, "item used");
                Ok(true)
            }
            Ok(outcome) => {
                warn!(index, outcome = ?outcome, "item kept, moving instead");
                Ok(false)
            }
            Err(SessionError::NoSuchItem(slot)) => {
                warn!(index = slot, "no item at index, moving instead");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn take_step(&mut self) -> Result<Option<AutoplayEnd>, RunnerError> {
        match self.session.step() {
            Ok(report) => {
                debug!(
                    step = report.step,
                    from = %report.from,
                    to = %report.to,
                    entropy = report.entropy.current,
                    "autoplay step"
                );
                Ok(end_for(report.status))
            }
            Err(SessionError::NoOutgoingEdges(at)) => {
                warn!(at = %at, "dead end");
                Ok(end_for(self.session.status()).or(Some(AutoplayEnd::Stuck)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

const fn end_for(status: SessionStatus) -> Option<AutoplayEnd> {
    match status {
        SessionStatus::Wandering => None,
        SessionStatus::ReachedGateway => Some(AutoplayEnd::ReachedGateway),
        SessionStatus::Stuck => Some(AutoplayEnd::Stuck),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use wander_core::{Artifact, GameConfig};
    use wander_types::{BiomeKind, DecisionRequest};
    use wander_world::BiomeGraph;

    use super::*;

    /// Replays canned replies, then moves.
    struct Scripted {
        replies: Mutex<VecDeque<Result<Decision, RunnerError>>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<Decision, RunnerError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    impl DecisionSource for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn decide(&self, _request: &DecisionRequest) -> Result<Decision, RunnerError> {
            let next = self.replies.lock().ok().and_then(|mut q| q.pop_front());
            next.unwrap_or_else(|| Ok(Decision::moving("script exhausted")))
        }
    }

    /// Never answers.
    struct Stalled;

    impl DecisionSource for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn decide(&self, _request: &DecisionRequest) -> Result<Decision, RunnerError> {
            std::future::pending().await
        }
    }

    fn use_item(index: u32) -> Decision {
        Decision {
            action: DecisionAction::UseItem,
            item_index: Some(index),
            reasoning: "test".to_owned(),
        }
    }

    fn settings() -> AutoplaySettings {
        AutoplaySettings {
            decision_timeout: Duration::from_secs(1),
            interval: Duration::from_millis(10),
            retry_backoff: Duration::from_millis(100),
            max_steps: 50,
            goal: "Find the Gateway".to_owned(),
        }
    }

    fn graph(edges: &[(BiomeKind, BiomeKind)], sink: Option<BiomeKind>) -> BiomeGraph {
        let mut g = BiomeGraph::new();
        for biome in [BiomeKind::Forest, BiomeKind::Desert, BiomeKind::Tundra] {
            g.add_node(biome).unwrap();
        }
        if let Some(sink) = sink {
            g.add_sink(sink).unwrap();
        }
        for &(from, to) in edges {
            g.add_edge(from, to, 1.0).unwrap();
        }
        g
    }

    fn chain() -> BiomeGraph {
        graph(
            &[(BiomeKind::Forest, BiomeKind::Desert), (BiomeKind::Desert, BiomeKind::Tundra)],
            None,
        )
    }

    fn cycle() -> BiomeGraph {
        graph(
            &[(BiomeKind::Forest, BiomeKind::Desert), (BiomeKind::Desert, BiomeKind::Forest)],
            None,
        )
    }

    fn session_with(graph: BiomeGraph, items: Vec<Artifact>) -> GameSession {
        let mut config = GameConfig::default();
        config.inventory.starting_items = items;
        GameSession::with_graph(graph, BiomeKind::Forest, &config, StdRng::seed_from_u64(1)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn walks_a_chain_until_stuck() {
        let mut autoplay = Autoplay::new(session_with(chain(), Vec::new()), Scripted::new(Vec::new()), settings());
        let summary = autoplay.run().await.unwrap();
        assert_eq!(summary.end, AutoplayEnd::Stuck);
        assert_eq!(summary.steps, 2);
        assert_eq!(summary.turns, 3);
        assert_eq!(summary.fallbacks, 0);
        assert_eq!(autoplay.session().current(), BiomeKind::Tundra);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_the_gateway() {
        let g = graph(&[(BiomeKind::Forest, BiomeKind::Gateway)], Some(BiomeKind::Gateway));
        let mut autoplay = Autoplay::new(session_with(g, Vec::new()), Scripted::new(Vec::new()), settings());
        let summary = autoplay.run().await.unwrap();
        assert_eq!(summary.end, AutoplayEnd::ReachedGateway);
        assert_eq!(summary.steps, 1);
        assert_eq!(summary.turns, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn late_decisions_fall_back_to_moves() {
        let mut autoplay = Autoplay::new(session_with(chain(), Vec::new()), Stalled, settings());
        let summary = autoplay.run().await.unwrap();
        assert_eq!(summary.end, AutoplayEnd::Stuck);
        assert_eq!(summary.steps, 2);
        assert_eq!(summary.fallbacks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn backend_errors_fall_back_to_moves_and_back_off() {
        let source = Scripted::new(vec![
            Err(RunnerError::LlmBackend("connection refused".to_owned())),
            Err(RunnerError::Parse("garbage".to_owned())),
        ]);
        let mut autoplay = Autoplay::new(session_with(chain(), Vec::new()), source, settings());
        let started = tokio::time::Instant::now();
        let summary = autoplay.run().await.unwrap();
        assert_eq!(summary.end, AutoplayEnd::Stuck);
        assert_eq!(summary.steps, 2);
        assert_eq!(summary.fallbacks, 2);
        // Two degraded turns each pause for interval plus backoff.
        assert!(started.elapsed() >= Duration::from_millis(220));
    }

    #[tokio::test(start_paused = true)]
    async fn step_limit_ends_the_run() {
        let mut config = settings();
        config.max_steps = 3;
        let mut autoplay = Autoplay::new(session_with(cycle(), Vec::new()), Scripted::new(Vec::new()), config);
        let summary = autoplay.run().await.unwrap();
        assert_eq!(summary.end, AutoplayEnd::StepLimit);
        assert_eq!(summary.steps, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn using_an_item_takes_the_turn() {
        let mut config = settings();
        config.max_steps = 1;
        let source = Scripted::new(vec![Ok(use_item(0))]);
        let mut autoplay = Autoplay::new(session_with(cycle(), vec![Artifact::Anchor]), source, config);
        let summary = autoplay.run().await.unwrap();
        assert_eq!(summary.items_used, 1);
        assert_eq!(summary.turns, 2);
        assert_eq!(summary.steps, 1);
        assert!(autoplay.session().inventory().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_item_becomes_a_move() {
        let mut config = settings();
        config.max_steps = 1;
        let source = Scripted::new(vec![Ok(use_item(7))]);
        let mut autoplay = Autoplay::new(session_with(cycle(), Vec::new()), source, config);
        let summary = autoplay.run().await.unwrap();
        assert_eq!(summary.items_used, 0);
        assert_eq!(summary.turns, 1);
        assert_eq!(summary.steps, 1);
        assert_eq!(summary.end, AutoplayEnd::StepLimit);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_run_does_nothing() {
        let mut autoplay = Autoplay::new(session_with(cycle(), Vec::new()), Scripted::new(Vec::new()), settings());
        autoplay.stop_signal().stop();
        let summary = autoplay.run().await.unwrap();
        assert_eq!(summary.end, AutoplayEnd::Stopped);
        assert_eq!(summary.turns, 0);
        assert_eq!(summary.steps, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_abandons_an_in_flight_decision() {
        let mut config = settings();
        config.decision_timeout = Duration::from_secs(3600);
        let mut autoplay = Autoplay::new(session_with(cycle(), Vec::new()), Stalled, config);
        let stop = autoplay.stop_signal();

        let handle = tokio::spawn(async move { autoplay.run().await });
        sleep(Duration::from_secs(1)).await;
        stop.stop();

        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.end, AutoplayEnd::Stopped);
        assert_eq!(summary.turns, 1);
        assert_eq!(summary.steps, 0);
        assert_eq!(summary.fallbacks, 0);
    }

    #[tokio::test]
    async fn stopped_resolves_for_every_clone() {
        let signal = StopSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.stopped().await });
        signal.stop();
        signal.stop();
        handle.await.unwrap();
        assert!(signal.is_stopped());
    }
}
