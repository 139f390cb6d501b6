// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use alloy::primitives::Address;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::{IngestionOutcome, IngestionService};
use crate::{db::Campaign, error::ServiceError};

#[derive(Error, Debug)]
pub enum SupervisorErr {
    /// Restart the task after a delay
    #[error("Recoverable error: {0}")]
    Recover(ServiceError),
    /// Give up on the task
    #[error("Hard failure: {0}")]
    Fault(ServiceError),
}

impl From<ServiceError> for SupervisorErr {
    fn from(err: ServiceError) -> Self {
        if err.is_recoverable() {
            SupervisorErr::Recover(err)
        } else {
            SupervisorErr::Fault(err)
        }
    }
}

pub type RetryRes =
    Pin<Box<dyn Future<Output = Result<IngestionOutcome, SupervisorErr>> + Send + 'static>>;

pub trait RetryTask {
    /// Defines how to spawn a task to be monitored for restarts
    fn spawn(&self) -> RetryRes;
}

/// Configuration for retry behavior in the supervisor
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Initial delay between retry attempts
    pub delay: Duration,
    /// Multiplier applied to the delay after each retry
    pub backoff_multiplier: f64,
    /// Maximum delay between retries, regardless of backoff
    pub max_delay: Duration,
    /// Maximum number of consecutive retries before giving up (None for unlimited)
    pub max_retries: Option<usize>,
    /// Reset the retry counter when a failing attempt had run at least this long
    pub reset_after: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            max_retries: Some(10),
            reset_after: Some(Duration::from_secs(60 * 5)),
        }
    }
}

/// Final state of one supervised pool.
#[derive(Debug)]
pub enum PoolOutcome {
    /// The campaign ended and ingestion stopped on its own.
    Finished,
    Cancelled,
    /// Chain errors persisted past the retry budget.
    Degraded { retries: usize, error: ServiceError },
    /// A non-recoverable error stopped ingestion.
    Failed(ServiceError),
}

/// Restarts a task on recoverable failures with exponential backoff.
pub struct Supervisor<T: RetryTask> {
    task: Arc<T>,
    retry_policy: RetryPolicy,
    cancel: CancellationToken,
}

impl<T> Supervisor<T>
where
    T: RetryTask + Send + Sync,
{
    pub fn new(task: Arc<T>) -> Self {
        Self { task, retry_policy: RetryPolicy::default(), cancel: CancellationToken::new() }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Stop waiting between retries once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Calculate the delay for a specific retry attempt
    fn calculate_retry_delay(&self, retry_count: usize) -> Duration {
        if retry_count == 0 {
            return self.retry_policy.delay;
        }

        let backoff = self.retry_policy.delay.as_millis() as f64
            * self.retry_policy.backoff_multiplier.powi(retry_count as i32);

        let backoff_ms = backoff.min(self.retry_policy.max_delay.as_millis() as f64) as u64;

        Duration::from_millis(backoff_ms)
    }

    pub async fn run(self) -> PoolOutcome {
        let mut retry_count = 0;

        loop {
            let started = std::time::Instant::now();
            let err = match self.task.spawn().await {
                Ok(IngestionOutcome::Finished) => return PoolOutcome::Finished,
                Ok(IngestionOutcome::Cancelled) => return PoolOutcome::Cancelled,
                Err(SupervisorErr::Fault(err)) => {
                    tracing::error!("FAULT: Hard failure detected: {err:?}");
                    return PoolOutcome::Failed(err);
                }
                Err(SupervisorErr::Recover(err)) => err,
            };

            if let Some(reset_duration) = self.retry_policy.reset_after {
                let task_duration = started.elapsed();
                if task_duration >= reset_duration && retry_count > 0 {
                    tracing::info!(
                        "Task ran for {:?} before failing, resetting retry counter from {}",
                        task_duration,
                        retry_count
                    );
                    retry_count = 0;
                }
            }

            if let Some(max) = self.retry_policy.max_retries {
                if retry_count >= max {
                    tracing::error!("Exceeded maximum retries ({max}) for task: {err}");
                    return PoolOutcome::Degraded { retries: retry_count, error: err };
                }
            }

            let delay = self.calculate_retry_delay(retry_count);
            tracing::warn!(
                "Recoverable failure detected: {err}, restarting in {:?} (retry {}/{})",
                delay,
                retry_count + 1,
                self.retry_policy.max_retries.map_or("∞".to_string(), |m| m.to_string())
            );

            tokio::select! {
                _ = self.cancel.cancelled() => return PoolOutcome::Cancelled,
                _ = tokio::time::sleep(delay) => {}
            }
            retry_count += 1;
        }
    }
}

struct PoolTask {
    service: Arc<IngestionService>,
    campaign: Campaign,
}

impl RetryTask for PoolTask {
    fn spawn(&self) -> RetryRes {
        let service = self.service.clone();
        let campaign = self.campaign.clone();
        Box::pin(async move { service.run_ingestion(&campaign).await.map_err(SupervisorErr::from) })
    }
}

#[derive(Debug)]
pub struct PoolReport {
    pub campaign_id: String,
    pub pool: Option<Address>,
    pub outcome: PoolOutcome,
}

/// Runs one supervised ingestion pipeline per share-pool campaign.
pub struct IngestionSupervisor {
    service: Arc<IngestionService>,
}

impl IngestionSupervisor {
    pub fn new(service: Arc<IngestionService>) -> Self {
        Self { service }
    }

    /// Ingest every campaign concurrently and wait until all pipelines stop.
    ///
    /// A pool that fails is reported and does not affect the others.
    pub async fn run(&self, campaigns: Vec<Campaign>) -> Vec<PoolReport> {
        let mut tasks = JoinSet::new();

        for campaign in campaigns {
            let campaign_id = campaign.id.clone();
            let pool = campaign.pool_address;
            let supervisor =
                Supervisor::new(Arc::new(PoolTask { service: self.service.clone(), campaign }))
                    .with_retry_policy(self.service.config().retry.clone())
                    .with_cancellation(self.service.cancellation_token().clone());

            tracing::debug!("Spawning ingestion for campaign {campaign_id}");
            tasks.spawn(async move {
                let outcome = supervisor.run().await;
                PoolReport { campaign_id, pool, outcome }
            });
        }

        let mut reports = Vec::new();
        while let Some(res) = tasks.join_next().await {
            match res {
                Ok(report) => {
                    match &report.outcome {
                        PoolOutcome::Finished => {
                            tracing::info!("Ingestion for campaign {} finished", report.campaign_id)
                        }
                        PoolOutcome::Cancelled => {
                            tracing::info!("Ingestion for campaign {} cancelled", report.campaign_id)
                        }
                        PoolOutcome::Degraded { retries, error } => tracing::error!(
                            "Campaign {} degraded after {retries} retries: {error}",
                            report.campaign_id
                        ),
                        PoolOutcome::Failed(error) => {
                            tracing::error!("Campaign {} failed: {error}", report.campaign_id)
                        }
                    }
                    reports.push(report);
                }
                Err(err) => {
                    tracing::error!("ABORT: ingestion task join failed: {err}");
                }
            }
        }

        reports
    }
}
