//! Report orchestrator implementation.
//!
//! One run is strictly sequential:
//! - Collect: store -> ticketing -> ticket contexts (ticket mode only)
//! - Generate: one appliance job per report user, written to disk
//! - Reconcile: claim, attach and accept per ticket, then mark work items processed

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::appliance::{ReportAppliance, ReportSession, ReportSettings, Sleeper, TokioSleeper};
use crate::artifact::ArtifactWriter;
use crate::directory::{DirectoryError, DirectoryResolver};
use crate::report::{ReportUser, TicketAggregate, WorkSource};
use crate::store::{ProcessedStatus, WorkItemStore};
use crate::ticketing::{TicketContext, TicketingSystem};

use super::config::OrchestratorConfig;
use super::types::{OrchestratorError, RunInput, RunSummary};

/// Collaborators only needed in ticket mode.
struct TicketingDeps {
    ticketing: Arc<dyn TicketingSystem>,
    store: Arc<dyn WorkItemStore>,
    resolution_text: String,
}

/// Sequences directory, appliance, artifact writer and ticketing for one run.
pub struct ReportOrchestrator {
    config: OrchestratorConfig,
    settings: ReportSettings,
    appliance: Arc<dyn ReportAppliance>,
    directory: Arc<dyn DirectoryResolver>,
    writer: ArtifactWriter,
    sleeper: Arc<dyn Sleeper>,
    ticketing: Option<TicketingDeps>,
    clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl ReportOrchestrator {
    /// Create an orchestrator able to run in flat-list mode.
    pub fn new(
        config: OrchestratorConfig,
        settings: ReportSettings,
        appliance: Arc<dyn ReportAppliance>,
        directory: Arc<dyn DirectoryResolver>,
        writer: ArtifactWriter,
    ) -> Self {
        Self {
            config,
            settings,
            appliance,
            directory,
            writer,
            sleeper: Arc::new(TokioSleeper),
            ticketing: None,
            clock: local_now,
        }
    }

    /// Enable ticket mode.
    pub fn with_ticketing(
        mut self,
        ticketing: Arc<dyn TicketingSystem>,
        store: Arc<dyn WorkItemStore>,
        resolution_text: impl Into<String>,
    ) -> Self {
        self.ticketing = Some(TicketingDeps {
            ticketing,
            store,
            resolution_text: resolution_text.into(),
        });
        self
    }

    /// Replace the sleeper used while polling report jobs.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the clock used for processed timestamps.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Execute one complete run.
    pub async fn run(&self, input: RunInput) -> Result<RunSummary, OrchestratorError> {
        let started = Instant::now();
        let mut summary = RunSummary::default();
        let mut aggregate = TicketAggregate::new(self.config.aggregate_policy);

        let source = match input {
            RunInput::Tickets => {
                let deps = self.ticket_deps()?;
                let contexts = self.collect_tickets(deps, &mut summary).await?;
                if summary.work_items == 0 {
                    info!("No unprocessed work items, nothing to do");
                    summary.elapsed = started.elapsed();
                    return Ok(summary);
                }
                for ctx in &contexts {
                    aggregate.register(&ctx.ticket_id, &ctx.sub_request_id, &ctx.work_item_id);
                }
                WorkSource::Tickets(contexts)
            }
            RunInput::FlatList(users) => WorkSource::FlatList(users),
        };

        let users = source.report_users();
        summary.users = users.len();

        if !users.is_empty() {
            self.generate_reports(&users, &mut aggregate, &mut summary)
                .await?;
        } else {
            warn!("No report users to process");
        }

        if source.is_ticket_mode() {
            let deps = self.ticket_deps()?;
            self.log_aggregate(&aggregate);
            self.reconcile(deps, &aggregate, &mut summary).await?;
        }

        summary.elapsed = started.elapsed();
        info!(
            elapsed_secs = summary.elapsed.as_secs_f64(),
            artifacts = summary.artifacts.len(),
            users_skipped = summary.users_skipped.len(),
            work_items_reconciled = summary.reconciled_work_items.len(),
            "Run finished"
        );
        Ok(summary)
    }

    fn ticket_deps(&self) -> Result<&TicketingDeps, OrchestratorError> {
        self.ticketing
            .as_ref()
            .ok_or(OrchestratorError::MissingDependency(
                "a ticketing system and a work item store",
            ))
    }

    /// Read unprocessed work items and turn each into a ticket context.
    async fn collect_tickets(
        &self,
        deps: &TicketingDeps,
        summary: &mut RunSummary,
    ) -> Result<Vec<TicketContext>, OrchestratorError> {
        let items = deps.store.unprocessed()?;
        summary.work_items = items.len();
        info!(
            count = items.len(),
            ids = ?items.iter().map(|w| w.id.as_str()).collect::<Vec<_>>(),
            "Unprocessed work items"
        );

        let mut contexts = Vec::with_capacity(items.len());
        for item in items {
            let keys = deps
                .ticketing
                .fetch_sum_description_and_keys(&item.id)
                .await?;
            let ticket_id = keys.ticket_id.clone();

            match TicketContext::from_keys(&item.id, keys) {
                Ok(ctx) => {
                    debug!(
                        work_item = %item.id,
                        ticket = %ctx.ticket_id,
                        sub_request = %ctx.sub_request_id,
                        assignees = ?ctx.assignees,
                        "Ticket request extracted"
                    );
                    contexts.push(ctx);
                }
                Err(e) => {
                    warn!(
                        work_item = %item.id,
                        ticket = %ticket_id,
                        error = %e,
                        "Ticket request is unusable, marking work item failed"
                    );
                    deps.store
                        .mark_processed(&item.id, ProcessedStatus::Failed, (self.clock)())?;
                    summary.skipped_work_items.push(item.id);
                }
            }
        }
        Ok(contexts)
    }

    /// Produce one artifact per user. Users without a directory account are skipped.
    async fn generate_reports(
        &self,
        users: &[ReportUser],
        aggregate: &mut TicketAggregate,
        summary: &mut RunSummary,
    ) -> Result<(), OrchestratorError> {
        let session = ReportSession::open(
            Arc::clone(&self.appliance),
            Arc::clone(&self.sleeper),
            self.settings.clone(),
        )
        .await?;
        let mut written = HashSet::new();

        for user in users {
            let account = match self.directory.resolve(&user.display_name).await {
                Ok(account) => account,
                Err(DirectoryError::NoMatch(name)) => {
                    warn!(user = %name, "No directory account, skipping user");
                    summary.users_skipped.push(name);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            info!(
                user = %user.display_name,
                account = %account,
                start = %user.window.appliance_start(),
                end = %user.window.appliance_end(),
                "Generating report"
            );
            let payload = session.generate(&account, &user.window).await?;
            let path = self.writer.unique_path_for(user, &written);
            if written.contains(&self.writer.path_for(user)) {
                warn!(
                    user = %user.display_name,
                    path = %path.display(),
                    "Artifact name already used in this run, writing under a suffixed name"
                );
            }
            let artifact = self.writer.write_to(path, user, &payload).await?;
            written.insert(artifact.path.clone());

            if let Some(origin) = &artifact.origin {
                if !aggregate.record_artifact(
                    &origin.ticket_id,
                    &origin.sub_request_id,
                    artifact.path.clone(),
                ) {
                    return Err(OrchestratorError::UnregisteredGroup {
                        ticket_id: origin.ticket_id.clone(),
                        sub_request_id: origin.sub_request_id.clone(),
                    });
                }
            }
            summary.artifacts.push(artifact);
        }
        Ok(())
    }

    fn log_aggregate(&self, aggregate: &TicketAggregate) {
        for (ticket_id, subs) in aggregate.tickets() {
            for (sub_request_id, group) in subs {
                info!(
                    ticket = %ticket_id,
                    sub_request = %sub_request_id,
                    work_items = ?group.work_item_ids,
                    artifacts = group.artifacts.len(),
                    "Collected ticket group"
                );
            }
        }
    }

    /// Claim each ticket once, attach and accept each non-empty sub-request,
    /// then mark its work items processed.
    async fn reconcile(
        &self,
        deps: &TicketingDeps,
        aggregate: &TicketAggregate,
        summary: &mut RunSummary,
    ) -> Result<(), OrchestratorError> {
        for (ticket_id, subs) in aggregate.tickets() {
            if subs.values().all(|group| group.is_empty()) {
                warn!(ticket = %ticket_id, "No artifacts for ticket, leaving it unclaimed");
                continue;
            }

            deps.ticketing.claim_ticket(ticket_id).await?;
            summary.tickets_claimed += 1;

            for (sub_request_id, group) in subs {
                if group.is_empty() {
                    warn!(
                        ticket = %ticket_id,
                        sub_request = %sub_request_id,
                        work_items = ?group.work_item_ids,
                        "No artifacts for sub-request, leaving work items unprocessed"
                    );
                    continue;
                }

                deps.ticketing
                    .attach_artifacts_and_accept(ticket_id, &deps.resolution_text, &group.artifacts)
                    .await?;

                let now = (self.clock)();
                for work_item_id in &group.work_item_ids {
                    deps.store
                        .mark_processed(work_item_id, ProcessedStatus::Succeeded, now)?;
                    info!(work_item = %work_item_id, ticket = %ticket_id, "Work item processed");
                    summary.reconciled_work_items.push(work_item_id.clone());
                }
            }
        }
        Ok(())
    }
}
