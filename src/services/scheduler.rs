use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::database::models::Post;
use crate::services::publishing;
use crate::utils::errors::BotError;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use teloxide::Bot;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};
use uuid::Uuid;

/// External job handle for a post, stored on the post row. Deterministic,
/// so re-scheduling the same post replaces rather than duplicates its job.
pub fn job_id(post_id: i64) -> String {
    format!("publish-post-{post_id}")
}

/// Durable timer service: one pending one-shot job per scheduled post.
///
/// The in-memory job table maps post ids to timer guids; it is rebuilt from
/// the store on startup, so timers survive restarts as long as posts do.
/// Duplicate fire signals for the same post are coalesced through the
/// in-flight set.
pub struct PostScheduler {
    scheduler: JobScheduler,
    bot: Bot,
    db: Arc<DatabaseManager>,
    config: Arc<Config>,
    jobs: Arc<Mutex<HashMap<i64, Uuid>>>,
    in_flight: Arc<Mutex<HashSet<i64>>>,
}

impl PostScheduler {
    pub async fn new(
        bot: Bot,
        db: Arc<DatabaseManager>,
        config: Arc<Config>,
    ) -> Result<Self, BotError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| BotError::Scheduler(e.to_string()))?;

        Ok(Self {
            scheduler,
            bot,
            db,
            config,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    pub async fn start(&self) -> Result<(), BotError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| BotError::Scheduler(e.to_string()))?;
        info!("Post scheduler started");
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<(), BotError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| BotError::Scheduler(e.to_string()))?;
        info!("Post scheduler stopped");
        Ok(())
    }

    /// Register (or replace) the pending job for a post. Instants in the
    /// past fire immediately.
    pub async fn schedule_post(
        &self,
        post_id: i64,
        at: DateTime<Utc>,
    ) -> Result<String, BotError> {
        let previous = { self.jobs.lock().await.remove(&post_id) };
        if let Some(guid) = previous {
            if let Err(e) = self.scheduler.remove(&guid).await {
                warn!("Failed to remove previous job for post {}: {}", post_id, e);
            }
        }

        let delay = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let fire_at = Instant::now() + delay;

        let bot = self.bot.clone();
        let db = self.db.clone();
        let config = self.config.clone();
        let jobs = self.jobs.clone();
        let in_flight = self.in_flight.clone();

        let job = Job::new_one_shot_at_instant_async(fire_at, move |_uuid, _lock| {
            let bot = bot.clone();
            let db = db.clone();
            let config = config.clone();
            let jobs = jobs.clone();
            let in_flight = in_flight.clone();
            Box::pin(async move {
                // At most one execution per post even if the timer
                // mechanism delivers duplicate fire signals
                {
                    let mut running = in_flight.lock().await;
                    if !running.insert(post_id) {
                        warn!("Duplicate fire for post {} suppressed", post_id);
                        return;
                    }
                }
                jobs.lock().await.remove(&post_id);

                publishing::publish_scheduled_post(&bot, &db, &config, post_id).await;

                in_flight.lock().await.remove(&post_id);
            })
        })
        .map_err(|e| BotError::Scheduler(e.to_string()))?;

        let guid = self
            .scheduler
            .add(job)
            .await
            .map_err(|e| BotError::Scheduler(e.to_string()))?;
        self.jobs.lock().await.insert(post_id, guid);

        info!("Scheduled post {} for {}", post_id, at);
        Ok(job_id(post_id))
    }

    /// Remove the pending job for a post. Returns whether anything was
    /// removed; a missing job is a normal outcome, not an error.
    pub async fn cancel_post(&self, post_id: i64) -> bool {
        let guid = { self.jobs.lock().await.remove(&post_id) };
        match guid {
            Some(guid) => match self.scheduler.remove(&guid).await {
                Ok(()) => {
                    info!("Cancelled scheduled job for post {}", post_id);
                    true
                }
                Err(e) => {
                    warn!("Failed to cancel job for post {}: {}", post_id, e);
                    false
                }
            },
            None => {
                warn!("No pending job for post {} to cancel", post_id);
                false
            }
        }
    }

    /// Rebuild the timer table from the store after a restart: one job per
    /// post in scheduled status, at its stored instant. Overdue posts fire
    /// immediately once the scheduler starts.
    pub async fn restore_from_store(&self) -> Result<usize, BotError> {
        let scheduled = Post::list_scheduled(&self.db.pool).await?;
        let mut restored = 0;

        for post in scheduled {
            let Some(at) = post.scheduled_at_utc() else {
                warn!(
                    "Scheduled post {} has no valid scheduled_at, skipping restore",
                    post.id
                );
                continue;
            };
            self.schedule_post(post.id, at).await?;
            restored += 1;
        }

        info!("Restored {} scheduled job(s) from the store", restored);
        Ok(restored)
    }

    /// Number of pending jobs in the table.
    pub async fn pending_jobs(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Whether a pending job exists for the given post.
    pub async fn has_job(&self, post_id: i64) -> bool {
        self.jobs.lock().await.contains_key(&post_id)
    }
}
