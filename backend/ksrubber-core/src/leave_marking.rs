// src/leave_marking.rs

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{error, info};

use crate::ksrubber_client::{ApiError, ProductionApi};
use crate::ksrubber_data::DailyProductionEntry;
use crate::production_flow::ProductionComputeFlow;

#[derive(Error, Debug)]
pub enum LeaveError {
    #[error("Cannot {action} while the day is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error("Failed to mark {date} as leave: {source}")]
    Persist {
        date: NaiveDate,
        #[source]
        source: ApiError,
    },
}

/// Lifecycle of an empty calendar day.
///
/// `Empty -> PromptingChoice -> NavigatingToEntry` when the user wants to
/// enter production, or `PromptingChoice -> PersistingLeave -> MarkedLeave`
/// when they mark it as leave. A failed leave post falls back to `Empty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveState {
    Empty,
    PromptingChoice,
    NavigatingToEntry,
    PersistingLeave,
    MarkedLeave,
}

impl LeaveState {
    fn name(&self) -> &'static str {
        match self {
            LeaveState::Empty => "empty",
            LeaveState::PromptingChoice => "waiting for a choice",
            LeaveState::NavigatingToEntry => "opened for entry",
            LeaveState::PersistingLeave => "being marked as leave",
            LeaveState::MarkedLeave => "marked as leave",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveMarking {
    date: NaiveDate,
    state: LeaveState,
    last_error: Option<String>,
}

impl LeaveMarking {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            state: LeaveState::Empty,
            last_error: None,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn state(&self) -> LeaveState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn expect_state(&self, expected: LeaveState, action: &'static str) -> Result<(), LeaveError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LeaveError::InvalidTransition {
                action,
                state: self.state.name(),
            })
        }
    }

    /// The user clicked the empty day.
    pub fn interact(&mut self) -> Result<(), LeaveError> {
        self.expect_state(LeaveState::Empty, "open the day")?;
        self.state = LeaveState::PromptingChoice;
        self.last_error = None;
        Ok(())
    }

    /// Dismissing the prompt leaves the day empty.
    pub fn dismiss(&mut self) -> Result<(), LeaveError> {
        self.expect_state(LeaveState::PromptingChoice, "dismiss the prompt")?;
        self.state = LeaveState::Empty;
        Ok(())
    }

    /// Hands the day to the production entry form, prefilled with its date.
    pub fn choose_entry(&mut self) -> Result<ProductionComputeFlow, LeaveError> {
        self.expect_state(LeaveState::PromptingChoice, "enter production")?;
        self.state = LeaveState::NavigatingToEntry;
        Ok(ProductionComputeFlow::new(self.date))
    }

    /// `PromptingChoice -> PersistingLeave`. Returns the record to post.
    pub fn begin_persist(&mut self) -> Result<DailyProductionEntry, LeaveError> {
        self.expect_state(LeaveState::PromptingChoice, "mark leave")?;
        self.state = LeaveState::PersistingLeave;
        Ok(DailyProductionEntry::leave(self.date))
    }

    pub fn finish_persist(&mut self, outcome: Result<(), ApiError>) -> Result<(), LeaveError> {
        self.expect_state(LeaveState::PersistingLeave, "finish marking leave")?;
        match outcome {
            Ok(()) => {
                info!("Marked {} as leave", self.date);
                self.state = LeaveState::MarkedLeave;
                self.last_error = None;
                Ok(())
            }
            Err(source) => {
                error!("Failed to mark {} as leave: {}", self.date, source);
                self.state = LeaveState::Empty;
                self.last_error = Some(source.to_string());
                Err(LeaveError::Persist {
                    date: self.date,
                    source,
                })
            }
        }
    }

    /// Posts the leave record for this day.
    pub async fn mark_leave(&mut self, api: &dyn ProductionApi) -> Result<(), LeaveError> {
        let entry = self.begin_persist()?;
        let outcome = api.add_daily_production(&entry).await;
        self.finish_persist(outcome)
    }
}
