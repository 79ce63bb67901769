//! Async calculation driver.
//!
//! Runs the calculator inline and the insight fetch as a spawned task. A new
//! submission aborts the previous fetch before starting its own.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::task::JoinHandle;

use crate::insight::{InsightUnavailable, TextGenerator, fetch_historical_insight};
use crate::session::{Cycle, Session};
use crate::validate::InvalidBirthDate;

type InsightTask = JoinHandle<Result<String, InsightUnavailable>>;

pub struct App<G> {
    session: Session,
    generator: Arc<G>,
    in_flight: Option<(u64, InsightTask)>,
}

impl<G> App<G> {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn has_pending_insight(&self) -> bool {
        self.in_flight.is_some()
    }
}

impl<G> App<G>
where
    G: TextGenerator + Send + Sync + 'static,
{
    pub fn new(generator: G) -> Self {
        Self {
            session: Session::new(),
            generator: Arc::new(generator),
            in_flight: None,
        }
    }

    /// Calculates the age for `input` and starts the insight fetch for it.
    pub fn submit(&mut self, input: &str, now: NaiveDateTime) -> Result<Cycle, InvalidBirthDate> {
        if let Some((generation, task)) = self.in_flight.take() {
            task.abort();
            tracing::debug!(generation, "superseded in-flight insight fetch");
        }

        let cycle = self.session.submit(input, now)?;

        if !self.generator.is_available() {
            self.session.resolve_insight(cycle.generation, Err(InsightUnavailable));
            tracing::debug!(generation = cycle.generation, "insight generation disabled");
            return Ok(cycle);
        }

        let generator = Arc::clone(&self.generator);
        let birth_date = cycle.birth_date;
        let task = tokio::spawn(async move {
            fetch_historical_insight(generator.as_ref(), birth_date).await
        });
        self.in_flight = Some((cycle.generation, task));

        tracing::info!(generation = cycle.generation, %birth_date, "calculation shown, insight loading");
        Ok(cycle)
    }

    /// Waits for the outstanding insight and records it in the session.
    ///
    /// Returns `false` if nothing was pending or the outcome was stale.
    /// Dropping the returned future leaves the fetch pending.
    pub async fn wait_insight(&mut self) -> bool {
        let Some((generation, task)) = self.in_flight.as_mut() else {
            return false;
        };

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::warn!(%error, "insight task did not complete");
                Err(InsightUnavailable)
            }
        };
        let generation = *generation;
        self.in_flight = None;

        self.session.resolve_insight(generation, outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use anyhow::Result;
    use chrono::NaiveDate;
    use tokio::sync::{mpsc, oneshot};

    use super::*;
    use crate::session::InsightSlot;

    /// Each `generate` call reports that it started, then waits on the next
    /// gate the test releases.
    struct GatedGenerator {
        gates: Mutex<VecDeque<oneshot::Receiver<Result<String>>>>,
        started: mpsc::UnboundedSender<()>,
    }

    struct Gates {
        senders: VecDeque<oneshot::Sender<Result<String>>>,
        started: mpsc::UnboundedReceiver<()>,
    }

    impl GatedGenerator {
        fn new(count: usize) -> (Self, Gates) {
            let (senders, receivers): (VecDeque<_>, VecDeque<_>) =
                (0..count).map(|_| oneshot::channel()).unzip();
            let (started_tx, started_rx) = mpsc::unbounded_channel();
            (
                Self {
                    gates: Mutex::new(receivers),
                    started: started_tx,
                },
                Gates {
                    senders,
                    started: started_rx,
                },
            )
        }
    }

    impl Gates {
        fn next(&mut self) -> oneshot::Sender<Result<String>> {
            self.senders.pop_front().unwrap()
        }

        async fn wait_started(&mut self) {
            self.started.recv().await.unwrap();
        }
    }

    impl TextGenerator for GatedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            let gate = self.gates.lock().unwrap().pop_front();
            let _ = self.started.send(());
            match gate {
                Some(gate) => gate
                    .await
                    .unwrap_or_else(|_| Err(anyhow::anyhow!("gate dropped"))),
                None => Err(anyhow::anyhow!("no gate left")),
            }
        }
    }

    struct OfflineGenerator;

    impl TextGenerator for OfflineGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            panic!("disabled generator must not be called");
        }

        fn is_available(&self) -> bool {
            false
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 20)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn result_is_shown_before_insight_resolves() {
        let (generator, mut gates) = GatedGenerator::new(1);
        let mut app = App::new(generator);

        app.submit("2000-01-15", now()).unwrap();

        assert_eq!(app.session().result().unwrap().years, 24);
        assert_eq!(app.session().insight(), &InsightSlot::Loading);
        assert!(app.has_pending_insight());

        gates.next().send(Ok("A fact.".to_string())).unwrap();
        assert!(app.wait_insight().await);
        assert_eq!(app.session().insight(), &InsightSlot::Ready("A fact.".to_string()));
        assert!(!app.has_pending_insight());
    }

    #[tokio::test]
    async fn network_failure_leaves_result_displayed() {
        let (generator, mut gates) = GatedGenerator::new(1);
        let mut app = App::new(generator);
        app.submit("2000-01-15", now()).unwrap();

        gates
            .next()
            .send(Err(anyhow::anyhow!("connection reset")))
            .unwrap();

        assert!(app.wait_insight().await);
        assert_eq!(app.session().insight(), &InsightSlot::Unavailable);
        assert_eq!(app.session().result().unwrap().total_months, 293);
    }

    #[tokio::test]
    async fn new_submission_cancels_previous_fetch() {
        let (generator, mut gates) = GatedGenerator::new(2);
        let mut first_gate = gates.next();
        let second_gate = gates.next();
        let mut app = App::new(generator);

        app.submit("2000-01-15", now()).unwrap();
        gates.wait_started().await;
        let second = app.submit("1990-07-09", now()).unwrap();

        // The aborted task drops its gate receiver.
        first_gate.closed().await;

        second_gate.send(Ok("second".to_string())).unwrap();
        assert!(app.wait_insight().await);
        assert_eq!(app.session().generation(), second.generation);
        assert_eq!(app.session().insight(), &InsightSlot::Ready("second".to_string()));
        assert_eq!(app.session().result().unwrap().years, 33);
    }

    #[tokio::test]
    async fn invalid_submission_cancels_fetch_and_shows_no_result() {
        let (generator, mut gates) = GatedGenerator::new(1);
        let mut first_gate = gates.next();
        let mut app = App::new(generator);

        app.submit("2000-01-15", now()).unwrap();
        gates.wait_started().await;
        let err = app.submit("not-a-date", now()).unwrap_err();

        assert!(matches!(err, InvalidBirthDate::Malformed { .. }));
        first_gate.closed().await;
        assert!(!app.has_pending_insight());
        assert!(!app.wait_insight().await);
        assert!(app.session().result().is_none());
    }

    #[tokio::test]
    async fn disabled_generator_resolves_unavailable_without_a_fetch() {
        let mut app = App::new(OfflineGenerator);

        app.submit("2000-01-15", now()).unwrap();

        assert!(!app.has_pending_insight());
        assert_eq!(app.session().insight(), &InsightSlot::Unavailable);
        assert_eq!(app.session().result().unwrap().years, 24);
        assert!(!app.wait_insight().await);
    }
}
