use chrono::{TimeDelta, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::core::audit::{
    AuditCategory, AuditDetail, AuditRecord, AuditStore, format_elapsed, format_rfc1123,
};
use crate::core::deploy::Deployer;
use crate::core::github::comment::{self, Timing};
use crate::core::github::{ReviewResponse, ReviewSink, WebhookEvent};

/// Review -> deploy -> review -> audit, for one merged pull request.
pub struct Pipeline {
    reviewer: Arc<dyn ReviewSink>,
    deployer: Arc<Deployer>,
    audit: AuditStore,
    hide_error_reason: bool,
}

impl Pipeline {
    pub fn new(
        reviewer: Arc<dyn ReviewSink>,
        deployer: Arc<Deployer>,
        audit: AuditStore,
        hide_error_reason: bool,
    ) -> Self {
        Self {
            reviewer,
            deployer,
            audit,
            hide_error_reason,
        }
    }

    /// Start the run on its own task. The handle resolves to the persisted record.
    pub fn dispatch(self: &Arc<Self>, event: WebhookEvent) -> JoinHandle<AuditRecord> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.run(&event).await })
    }

    pub async fn run(&self, event: &WebhookEvent) -> AuditRecord {
        let mut detail = AuditDetail::new(&event.owner, &event.repository, &event.base_branch);

        self.notify(
            event,
            &comment::approval_notice(event),
            &mut detail.github_api_responses,
        )
        .await;

        let started_at = Utc::now();
        let clock = Instant::now();
        let run = self
            .deployer
            .deploy(&event.owner, &event.repository, &event.base_branch)
            .await;
        let elapsed = clock.elapsed();
        let ended_at = started_at + TimeDelta::from_std(elapsed).unwrap_or(TimeDelta::zero());

        let started = format_rfc1123(&started_at);
        let ended = format_rfc1123(&ended_at);
        let time_elapsed = format_elapsed(elapsed);
        let timing = Timing {
            started_at: &started,
            ended_at: &ended,
            elapsed: &time_elapsed,
        };

        let failure = run.error.as_ref().map(|e| e.to_string());
        let notice = match &failure {
            None => comment::success_notice(event, &timing),
            Some(reason) => {
                let shown = (!self.hide_error_reason).then_some(reason.as_str());
                comment::failure_notice(event, &timing, shown)
            }
        };
        self.notify(event, &notice, &mut detail.github_api_responses)
            .await;

        let success = run.succeeded();
        detail.executable_logs = run.steps;
        let record = AuditRecord {
            success,
            started_at,
            ended_at,
            time_elapsed,
            error: failure,
            data: Some(detail),
        };

        if let Err(e) = self
            .audit
            .append(AuditCategory::GitHub, record.clone())
            .await
        {
            error!("Failed to write audit record: {:#}", e);
        }
        info!(
            "Recorded {} deployment of [{}] {}/{}",
            if record.success { "successful" } else { "failed" },
            event.base_branch,
            event.owner,
            event.repository
        );
        record
    }

    /// Post a review; failures are logged and never stop the run.
    async fn notify(
        &self,
        event: &WebhookEvent,
        comment: &str,
        responses: &mut Vec<ReviewResponse>,
    ) {
        match self.reviewer.post_review(event, comment).await {
            Ok(Some(response)) => responses.push(response),
            Ok(None) => {}
            Err(e) => warn!(
                "Could not post review on PR #{} [{}/{}]: {}",
                event.pull_request_number, event.owner, event.repository, e
            ),
        }
    }
}
