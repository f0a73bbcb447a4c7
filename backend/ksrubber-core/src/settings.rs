// src/settings.rs

use rust_decimal::Decimal;
use std::fmt::Debug;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::ksrubber_client::{ApiError, ProductionApi};
use crate::ksrubber_data::Expenses;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error("Save failed: {0}")]
    SaveFailed(String),
}

/// `Viewing -> Editing -> Saving -> Viewing`. The draft only exists while
/// editing or saving, and the committed value changes only when the backend
/// confirms a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState<T> {
    Viewing,
    Editing { draft: T },
    Saving { draft: T },
}

impl<T> EditState<T> {
    fn name(&self) -> &'static str {
        match self {
            EditState::Viewing => "viewing",
            EditState::Editing { .. } => "editing",
            EditState::Saving { .. } => "saving",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableSetting<T> {
    committed: T,
    state: EditState<T>,
    last_error: Option<String>,
}

impl<T: Clone + Debug> EditableSetting<T> {
    pub fn new(committed: T) -> Self {
        Self {
            committed,
            state: EditState::Viewing,
            last_error: None,
        }
    }

    pub fn committed(&self) -> &T {
        &self.committed
    }

    pub fn state(&self) -> &EditState<T> {
        &self.state
    }

    pub fn draft(&self) -> Option<&T> {
        match &self.state {
            EditState::Viewing => None,
            EditState::Editing { draft } | EditState::Saving { draft } => Some(draft),
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_viewing(&self) -> bool {
        matches!(self.state, EditState::Viewing)
    }

    pub fn is_saving(&self) -> bool {
        matches!(self.state, EditState::Saving { .. })
    }

    fn invalid(&self, action: &'static str) -> SettingsError {
        SettingsError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    /// `Viewing -> Editing`, seeding the draft with the committed value.
    pub fn begin_edit(&mut self) -> Result<(), SettingsError> {
        match self.state {
            EditState::Viewing => {
                self.state = EditState::Editing {
                    draft: self.committed.clone(),
                };
                self.last_error = None;
                Ok(())
            }
            _ => Err(self.invalid("start editing")),
        }
    }

    pub fn update_draft(&mut self, value: T) -> Result<(), SettingsError> {
        match &mut self.state {
            EditState::Editing { draft } => {
                *draft = value;
                Ok(())
            }
            _ => Err(self.invalid("change the draft")),
        }
    }

    /// `Editing -> Viewing`, dropping the draft.
    pub fn cancel(&mut self) -> Result<(), SettingsError> {
        match self.state {
            EditState::Editing { .. } => {
                self.state = EditState::Viewing;
                self.last_error = None;
                Ok(())
            }
            _ => Err(self.invalid("cancel")),
        }
    }

    /// `Editing -> Saving`. Returns the draft to send.
    pub fn begin_save(&mut self) -> Result<T, SettingsError> {
        match std::mem::replace(&mut self.state, EditState::Viewing) {
            EditState::Editing { draft } => {
                self.state = EditState::Saving {
                    draft: draft.clone(),
                };
                Ok(draft)
            }
            other => {
                self.state = other;
                Err(self.invalid("save"))
            }
        }
    }

    /// Ends a save. Success commits the backend's value and returns to
    /// `Viewing`. Failure keeps the committed value, returns to `Editing` with
    /// the draft intact and reports [`SettingsError::SaveFailed`].
    pub fn finish_save(&mut self, outcome: Result<T, ApiError>) -> Result<&T, SettingsError> {
        let draft = match std::mem::replace(&mut self.state, EditState::Viewing) {
            EditState::Saving { draft } => draft,
            other => {
                self.state = other;
                return Err(self.invalid("finish a save"));
            }
        };

        match outcome {
            Ok(saved) => {
                self.committed = saved;
                self.last_error = None;
                Ok(&self.committed)
            }
            Err(e) => {
                warn!("Save failed, keeping committed value {:?}: {}", self.committed, e);
                let message = e.to_string();
                self.last_error = Some(message.clone());
                self.state = EditState::Editing { draft };
                Err(SettingsError::SaveFailed(message))
            }
        }
    }

    /// Replaces the committed value from a fresh fetch. An open draft is left
    /// alone.
    pub fn reload(&mut self, value: T) {
        self.committed = value;
    }
}

/// Editable base income and current-month expenses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsReconciler {
    pub income: EditableSetting<Decimal>,
    pub expenses: EditableSetting<Expenses>,
}

impl Default for SettingsReconciler {
    fn default() -> Self {
        Self {
            income: EditableSetting::new(Decimal::ZERO),
            expenses: EditableSetting::new(Expenses::default()),
        }
    }
}

impl SettingsReconciler {
    pub fn new(base_income: Decimal, expenses: Expenses) -> Self {
        Self {
            income: EditableSetting::new(base_income),
            expenses: EditableSetting::new(expenses),
        }
    }

    pub fn base_income(&self) -> Decimal {
        *self.income.committed()
    }

    pub fn committed_expenses(&self) -> Expenses {
        *self.expenses.committed()
    }

    pub async fn save_income(&mut self, api: &dyn ProductionApi) -> Result<Decimal, SettingsError> {
        let draft = self.income.begin_save()?;
        info!("Saving base income {}", draft);
        let outcome = api.update_base_income(draft).await;
        if let Err(e) = &outcome {
            error!("Failed to update base income: {}", e);
        }
        self.income.finish_save(outcome).map(|saved| *saved)
    }

    pub async fn save_expenses(&mut self, api: &dyn ProductionApi) -> Result<Expenses, SettingsError> {
        let draft = self.expenses.begin_save()?;
        info!("Saving expenses tea={} water={}", draft.tea, draft.water);
        let outcome = api.update_current_expenses(&draft).await;
        if let Err(e) = &outcome {
            error!("Failed to update expenses: {}", e);
        }
        self.expenses.finish_save(outcome).map(|saved| *saved)
    }
}
