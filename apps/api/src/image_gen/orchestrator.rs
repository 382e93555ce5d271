//! Job orchestration: submit a generation job, poll it to a terminal state, normalise output.
//!
//! State machine:
//!
//! ```text
//! SUBMITTED ──terminal on create──▶ settle
//!     │
//!     └─▶ poll #1 ─▶ poll #2 ─▶ … ─▶ poll #max ─▶ TIMEOUT
//!          │           │               │
//!          └───────────┴── terminal ───┴─▶ SUCCEEDED | FAILED | CANCELED
//! ```
//!
//! Between non-terminal polls the orchestrator pauses for `PollPolicy::interval`. It never
//! pauses after a terminal fetch or after the last allowed fetch, and it never cancels the
//! remote job on timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::image_gen::normalizer::{normalize, NormalizationError, RawOutput};
use crate::image_gen::{
    GenerationError, GenerationJob, GenerationRequest, GenerationService, JobStatus,
};
use crate::imaging::source::ImageSource;

/// Fixed pause between status checks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Maximum number of status checks (~60s worst case at the default interval).
pub const MAX_POLL_ATTEMPTS: u32 = 30;
/// Reported when the service marks a job failed without saying why.
pub const DEFAULT_FAILURE_MESSAGE: &str = "image generation failed";
pub const CANCELED_MESSAGE: &str = "job canceled";

/// The wait primitive between polls. Swapped for a recording fake in tests.
#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Real pause backed by the tokio timer.
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_attempts: MAX_POLL_ATTEMPTS,
        }
    }
}

/// Terminal outcome of driving one job.
#[derive(Debug)]
pub enum JobOutcome {
    Succeeded {
        job_id: String,
        output: Option<RawOutput>,
    },
    Failed {
        job_id: String,
        message: String,
    },
    Canceled {
        job_id: String,
    },
    TimedOut {
        job_id: String,
        attempts: u32,
    },
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("generation job {job_id} failed: {message}")]
    UpstreamJob { job_id: String, message: String },

    #[error("generation job {job_id} did not finish after {attempts} status checks")]
    Timeout { job_id: String, attempts: u32 },

    #[error("generation job {job_id} returned unusable output: {source}")]
    Normalization {
        job_id: String,
        #[source]
        source: NormalizationError,
    },

    #[error("generation service error: {0}")]
    Service(#[from] GenerationError),
}

impl OrchestrationError {
    pub fn job_id(&self) -> Option<&str> {
        match self {
            OrchestrationError::UpstreamJob { job_id, .. }
            | OrchestrationError::Timeout { job_id, .. }
            | OrchestrationError::Normalization { job_id, .. } => Some(job_id),
            OrchestrationError::Service(_) => None,
        }
    }
}

/// A successfully generated, normalised image and the job that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub job_id: String,
    pub image: ImageSource,
}

#[derive(Clone)]
pub struct JobOrchestrator {
    service: Arc<dyn GenerationService>,
    pause: Arc<dyn Pause>,
    policy: PollPolicy,
}

impl JobOrchestrator {
    pub fn new(service: Arc<dyn GenerationService>, pause: Arc<dyn Pause>) -> Self {
        Self {
            service,
            pause,
            policy: PollPolicy::default(),
        }
    }

    #[cfg(test)]
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Submits `request` and drives it to exactly one terminal outcome.
    pub async fn run(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedImage, OrchestrationError> {
        let job = self.service.create_job(request).await?;
        info!(job_id = %job.id, status = ?job.status, model = %request.model, "Generation job submitted");

        match self.drive(job).await? {
            JobOutcome::Succeeded { job_id, output } => {
                let normalized = match output {
                    Some(raw) => normalize(raw).await,
                    None => Err(NormalizationError::MissingOutput),
                };
                match normalized {
                    Ok(image) => {
                        info!(job_id = %job_id, image = %image.describe(), "Generation job succeeded");
                        Ok(GeneratedImage { job_id, image })
                    }
                    Err(source) => {
                        warn!(job_id = %job_id, "Generation output could not be normalized: {source}");
                        Err(OrchestrationError::Normalization { job_id, source })
                    }
                }
            }
            JobOutcome::Failed { job_id, message } => {
                warn!(job_id = %job_id, "Generation job failed: {message}");
                Err(OrchestrationError::UpstreamJob { job_id, message })
            }
            JobOutcome::Canceled { job_id } => {
                warn!(job_id = %job_id, "Generation job was canceled upstream");
                Err(OrchestrationError::UpstreamJob {
                    job_id,
                    message: CANCELED_MESSAGE.to_string(),
                })
            }
            JobOutcome::TimedOut { job_id, attempts } => {
                warn!(job_id = %job_id, attempts, "Generation job timed out; abandoning");
                Err(OrchestrationError::Timeout { job_id, attempts })
            }
        }
    }

    /// Polls a submitted job until it is terminal or the attempt budget runs out.
    ///
    /// A transport error on any status check ends the loop immediately.
    pub async fn drive(&self, job: GenerationJob) -> Result<JobOutcome, GenerationError> {
        let job_id = job.id.clone();
        if let Some(outcome) = settle(&job_id, job) {
            return Ok(outcome);
        }

        let max_attempts = self.policy.max_attempts;
        for attempt in 1..=max_attempts {
            let current = self.service.get_job(&job_id).await?;
            debug!(job_id = %job_id, attempt, status = ?current.status, "Polled generation job");

            if let Some(outcome) = settle(&job_id, current) {
                return Ok(outcome);
            }
            if attempt < max_attempts {
                self.pause.pause(self.policy.interval).await;
            }
        }

        Ok(JobOutcome::TimedOut {
            job_id,
            attempts: max_attempts,
        })
    }
}

/// Converts a job snapshot into an outcome, or `None` while it is still running.
fn settle(job_id: &str, job: GenerationJob) -> Option<JobOutcome> {
    let job_id = job_id.to_string();
    let outcome = match job.status {
        JobStatus::Pending | JobStatus::Processing => return None,
        JobStatus::Succeeded => JobOutcome::Succeeded {
            job_id,
            output: job.raw_output,
        },
        JobStatus::Failed => JobOutcome::Failed {
            job_id,
            message: job
                .error_message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
        },
        JobStatus::Canceled => JobOutcome::Canceled { job_id },
    };
    Some(outcome)
}
