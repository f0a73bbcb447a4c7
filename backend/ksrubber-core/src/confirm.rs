// src/confirm.rs

use std::fmt;
use tracing::{info, warn};

use crate::ksrubber_client::{ApiError, ProductionApi};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeletionTarget {
    Die(String),
    /// A daily production record, by `sno`.
    Production(String),
}

impl fmt::Display for DeletionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletionTarget::Die(id) => write!(f, "die {}", id),
            DeletionTarget::Production(sno) => write!(f, "production record {}", sno),
        }
    }
}

/// A destructive action waiting for the user's answer. It cannot reach the
/// backend until [`PendingDeletion::confirm`] turns it into a
/// [`ConfirmedDeletion`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a pending deletion does nothing until confirmed"]
pub struct PendingDeletion {
    target: DeletionTarget,
    label: String,
}

impl PendingDeletion {
    pub fn die(die_id: impl Into<String>, die_name: impl Into<String>) -> Self {
        Self {
            target: DeletionTarget::Die(die_id.into()),
            label: die_name.into(),
        }
    }

    pub fn production(sno: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            target: DeletionTarget::Production(sno.into()),
            label: date.into(),
        }
    }

    pub fn target(&self) -> &DeletionTarget {
        &self.target
    }

    pub fn prompt(&self) -> String {
        match &self.target {
            DeletionTarget::Die(_) => format!("Delete die '{}'? This cannot be undone.", self.label),
            DeletionTarget::Production(_) => {
                format!("Delete the production record for {}? This cannot be undone.", self.label)
            }
        }
    }

    pub fn confirm(self) -> ConfirmedDeletion {
        ConfirmedDeletion {
            target: self.target,
        }
    }

    /// Declining drops the request without touching the backend.
    pub fn cancel(self) -> DeletionTarget {
        info!("Deletion of {} cancelled", self.target);
        self.target
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedDeletion {
    target: DeletionTarget,
}

impl ConfirmedDeletion {
    pub fn target(&self) -> &DeletionTarget {
        &self.target
    }

    pub async fn execute(&self, api: &dyn ProductionApi) -> Result<(), ApiError> {
        info!("Deleting {}", self.target);
        let outcome = match &self.target {
            DeletionTarget::Die(id) => api.delete_die(id).await,
            DeletionTarget::Production(sno) => api.delete_production(sno).await,
        };
        if let Err(e) = &outcome {
            warn!("Deleting {} failed: {}", self.target, e);
        }
        outcome
    }
}
