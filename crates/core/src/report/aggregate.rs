//! Per-run grouping of artifacts by ticket and sub-request.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How repeated registrations of the same (ticket, sub-request) pair behave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregatePolicy {
    /// A later work item replaces the recorded work item id of the group.
    /// The replaced item is not marked processed and is picked up again on
    /// the next run.
    #[default]
    LastWriteWins,
    /// Every registered work item id is kept and marked processed together.
    Accumulate,
}

/// Artifacts collected for one sub-request, plus the work items that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubRequestGroup {
    pub work_item_ids: Vec<String>,
    pub artifacts: Vec<PathBuf>,
}

impl SubRequestGroup {
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Ticket id -> sub-request id -> group. Rebuilt from scratch every run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TicketAggregate {
    policy: AggregatePolicy,
    tickets: BTreeMap<String, BTreeMap<String, SubRequestGroup>>,
}

impl TicketAggregate {
    pub fn new(policy: AggregatePolicy) -> Self {
        Self {
            policy,
            tickets: BTreeMap::new(),
        }
    }

    pub fn policy(&self) -> AggregatePolicy {
        self.policy
    }

    /// Record that `work_item_id` contributes to `ticket_id`/`sub_request_id`.
    pub fn register(&mut self, ticket_id: &str, sub_request_id: &str, work_item_id: &str) {
        let group = self
            .tickets
            .entry(ticket_id.to_string())
            .or_default()
            .entry(sub_request_id.to_string())
            .or_default();

        match self.policy {
            AggregatePolicy::LastWriteWins => {
                group.work_item_ids.clear();
                group.work_item_ids.push(work_item_id.to_string());
            }
            AggregatePolicy::Accumulate => {
                if !group.work_item_ids.iter().any(|id| id == work_item_id) {
                    group.work_item_ids.push(work_item_id.to_string());
                }
            }
        }
    }

    /// Append an artifact path to a registered group.
    ///
    /// Returns `false` when the group was never registered.
    pub fn record_artifact(
        &mut self,
        ticket_id: &str,
        sub_request_id: &str,
        path: PathBuf,
    ) -> bool {
        match self
            .tickets
            .get_mut(ticket_id)
            .and_then(|subs| subs.get_mut(sub_request_id))
        {
            Some(group) => {
                group.artifacts.push(path);
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn ticket_count(&self) -> usize {
        self.tickets.len()
    }

    /// Iterate tickets in a stable order, each with its sub-request groups.
    pub fn tickets(
        &self,
    ) -> impl Iterator<Item = (&str, &BTreeMap<String, SubRequestGroup>)> {
        self.tickets.iter().map(|(id, subs)| (id.as_str(), subs))
    }

    pub fn group(&self, ticket_id: &str, sub_request_id: &str) -> Option<&SubRequestGroup> {
        self.tickets.get(ticket_id)?.get(sub_request_id)
    }
}
