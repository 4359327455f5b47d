//! Orchestrator: discovery over a date range, then a worker pool that drains
//! the task queue.
//!
//! Every entry point runs one full cycle per call (all-years runs one cycle
//! per season): discover the range month by month with at most N days in
//! flight, push one sentinel per worker, start N fetch workers bound to
//! sessions `0..N`, and wait for all of them. Discovery and fetch never
//! overlap, so a session is only ever used by one stage at a time.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Datelike;
use futures::stream::{self, StreamExt};
use gd_harvest_core::{ArchiveLayout, CalendarDay, GameTask, MonthSpec, months_of_year, year_range};
use gd_harvest_lib::{TaskQueue, WorkerPool};
use tokio::sync::mpsc;
use tokio::time::Duration;

use crate::circuit::{CircuitControl, Rotator};
use crate::client::{HttpSession, SessionPool, Transport};
use crate::config::{HarvestConfig, RetryPolicy};
use crate::discovery::discover_day;
use crate::error::HarvestError;
use crate::log::{HarvestLog, LogEntry};
use crate::store::GameStore;
use crate::worker::fetch_game;

/// Progress events emitted during a harvest, consumed by the CLI.
#[derive(Debug, Clone)]
pub enum HarvestEvent {
    /// Discovery of a month is starting.
    DiscoveryStarted { month: MonthSpec, days: usize },
    /// A day's listing is being fetched.
    DayStarted { day: CalendarDay, session: usize },
    /// A day's listing was parsed.
    DayDiscovered {
        day: CalendarDay,
        found: usize,
        queued: usize,
    },
    /// A day's listing could not be fetched (non-fatal).
    DayFailed { day: CalendarDay, message: String },
    /// Discovery finished; workers are starting.
    FetchStarted { workers: usize, queued: usize },
    /// A worker picked up a game.
    GameStarted { worker: usize, game: GameTask },
    /// Both documents of a game were persisted.
    GameCompleted { worker: usize, game: GameTask },
    /// A game could not be harvested (non-fatal).
    GameFailed {
        worker: usize,
        game: GameTask,
        message: String,
    },
    /// A worker task died.
    WorkerCrashed { worker: usize },
    /// The entry point returned.
    Done,
}

/// Drives harvest runs over one session pool and one output tree.
pub struct Harvester<T: Transport = HttpSession, C: CircuitControl = Rotator> {
    pool: Arc<SessionPool<T, C>>,
    store: Arc<GameStore>,
    layout: ArchiveLayout,
    policy: RetryPolicy,
    item_timeout: Duration,
    events: Option<mpsc::UnboundedSender<HarvestEvent>>,
}

impl Harvester<HttpSession, Rotator> {
    pub fn from_config(config: &HarvestConfig) -> Result<Self, HarvestError> {
        let pool = SessionPool::from_config(config)?;
        Ok(Self::new(
            pool,
            GameStore::new(config.output_root()),
            ArchiveLayout::new(config.home.as_str()),
        )
        .with_retry(config.retry.clone())
        .with_item_timeout(config.item_timeout))
    }
}

impl<T: Transport, C: CircuitControl> Harvester<T, C> {
    pub fn new(pool: SessionPool<T, C>, store: GameStore, layout: ArchiveLayout) -> Self {
        Self {
            pool: Arc::new(pool),
            store: Arc::new(store),
            layout,
            policy: RetryPolicy::default(),
            item_timeout: Duration::from_secs(300),
            events: None,
        }
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Safety timeout for one game, retries included.
    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = timeout;
        self
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<HarvestEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn pool(&self) -> &SessionPool<T, C> {
        &self.pool
    }

    /// Every season from `start_year` through the current one, one
    /// discovery + fetch cycle per season.
    pub async fn run_all_years(&self, start_year: i32) -> Result<HarvestLog, HarvestError> {
        let current = chrono::Local::now().year();
        let mut log = HarvestLog::new();
        for year in year_range(start_year, current)? {
            log::info!("Harvesting {}", year);
            log.merge(self.cycle(months_of_year(year)?).await?);
        }
        self.emit(HarvestEvent::Done);
        Ok(log)
    }

    pub async fn run_year(&self, year: i32) -> Result<HarvestLog, HarvestError> {
        let log = self.cycle(months_of_year(year)?).await?;
        self.emit(HarvestEvent::Done);
        Ok(log)
    }

    pub async fn run_month(&self, month: MonthSpec) -> Result<HarvestLog, HarvestError> {
        let log = self.cycle(vec![month]).await?;
        self.emit(HarvestEvent::Done);
        Ok(log)
    }

    pub async fn run_day(&self, day: CalendarDay) -> Result<HarvestLog, HarvestError> {
        let log = self.harvest(vec![(day.month_spec(), vec![day])]).await?;
        self.emit(HarvestEvent::Done);
        Ok(log)
    }

    async fn cycle(&self, months: Vec<MonthSpec>) -> Result<HarvestLog, HarvestError> {
        let months = months
            .into_iter()
            .map(|m| (m, m.days().collect::<Vec<_>>()))
            .collect();
        self.harvest(months).await
    }

    async fn harvest(
        &self,
        months: Vec<(MonthSpec, Vec<CalendarDay>)>,
    ) -> Result<HarvestLog, HarvestError> {
        if self.pool.is_empty() {
            return Err(HarvestError::config("session pool is empty"));
        }

        let queue = TaskQueue::new();
        let mut log = HarvestLog::new();
        let mut queued = HashSet::new();

        for (month, days) in months {
            self.discover_month(month, days, &queue, &mut queued, &mut log)
                .await?;
        }

        self.fetch_all(&queue, queued.len(), &mut log).await?;

        let summary = log.summary();
        log::info!(
            "Cycle finished: {} fetched, {} skipped, {} failed",
            summary.games_fetched,
            summary.games_skipped,
            summary.games_failed + summary.days_failed
        );
        Ok(log)
    }

    /// Discover one month's days, at most N listings in flight, day `k`
    /// using session `k mod N`.
    async fn discover_month(
        &self,
        month: MonthSpec,
        days: Vec<CalendarDay>,
        queue: &TaskQueue,
        queued: &mut HashSet<GameTask>,
        log: &mut HarvestLog,
    ) -> Result<(), HarvestError> {
        let sessions = self.pool.len();
        let producer = queue.producer();
        self.emit(HarvestEvent::DiscoveryStarted {
            month,
            days: days.len(),
        });
        log::debug!("Discovering {} ({} days)", month, days.len());

        let mut listings = stream::iter(days.into_iter().enumerate())
            .map(|(position, day)| {
                let session = position % sessions;
                async move {
                    self.emit(HarvestEvent::DayStarted { day, session });
                    let result =
                        discover_day(&self.pool, &self.layout, day, session, &self.policy).await;
                    (day, result)
                }
            })
            .buffer_unordered(sessions);

        while let Some((day, result)) = listings.next().await {
            let games = match result {
                Ok(games) => games,
                Err(e) => {
                    log::warn!("{}: {}", day, e);
                    self.emit(HarvestEvent::DayFailed {
                        day,
                        message: e.to_string(),
                    });
                    log.add(LogEntry::DayFailed {
                        day,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let found = games.len();
            let mut day_queued = 0;
            for game in games {
                if !self.store.is_new(&game) {
                    log.add(LogEntry::Skipped { game });
                    continue;
                }
                if !queued.insert(game.clone()) {
                    continue;
                }
                producer.push(game)?;
                day_queued += 1;
            }

            self.emit(HarvestEvent::DayDiscovered {
                day,
                found,
                queued: day_queued,
            });
            log.add(LogEntry::DayScanned {
                day,
                found,
                queued: day_queued,
            });
        }
        Ok(())
    }

    /// Start one worker per session and wait until the queue is drained.
    async fn fetch_all(
        &self,
        queue: &TaskQueue,
        queued: usize,
        log: &mut HarvestLog,
    ) -> Result<(), HarvestError> {
        let workers = self.pool.len();
        queue.push_sentinels(workers)?;
        self.emit(HarvestEvent::FetchStarted { workers, queued });
        log::info!("Fetching {} games with {} workers", queued, workers);

        let pool = self.pool.clone();
        let store = self.store.clone();
        let policy = self.policy.clone();
        let events = self.events.clone();
        let mut running = WorkerPool::<Result<PathBuf, HarvestError>>::start(
            workers,
            queue,
            self.item_timeout,
            move |worker, task| {
                let pool = pool.clone();
                let store = store.clone();
                let policy = policy.clone();
                let events = events.clone();
                async move {
                    if let Some(tx) = &events {
                        let _ = tx.send(HarvestEvent::GameStarted {
                            worker,
                            game: task.clone(),
                        });
                    }
                    fetch_game(&pool, &store, worker, &task, &policy).await
                }
            },
        );

        while let Some(outcome) = running.recv().await {
            let game = outcome.task;
            let worker = outcome.worker;
            let failure = match outcome.result {
                Ok(Ok(dir)) => {
                    log::info!("Fetched {}", game.game_id());
                    self.emit(HarvestEvent::GameCompleted {
                        worker,
                        game: game.clone(),
                    });
                    log.add(LogEntry::Fetched { game, dir });
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(item) => item.to_string(),
            };

            log::warn!("{}: {}", game, failure);
            self.emit(HarvestEvent::GameFailed {
                worker,
                game: game.clone(),
                message: failure.clone(),
            });
            log.add(LogEntry::GameFailed {
                game,
                message: failure,
            });
        }

        for worker in running.join().await {
            self.emit(HarvestEvent::WorkerCrashed { worker });
            log.add(LogEntry::WorkerCrashed { worker });
        }
        Ok(())
    }

    fn emit(&self, event: HarvestEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
