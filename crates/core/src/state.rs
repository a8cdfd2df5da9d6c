//! The single owned selection cell shared by the estimator and the chat
//! advisor.
//!
//! Every write is a whole-record replacement through `SelectionStore`, so a
//! reader never observes a partially updated `Selections`. Concurrent
//! writers resolve as last-writer-wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::domain::selections::{SelectionField, Selections, SelectionsPatch};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    Initial,
    User,
    Agent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub selections: Selections,
    pub revision: u64,
    pub origin: ChangeOrigin,
    /// Fields that differ from the previous revision.
    pub changed: Vec<SelectionField>,
    pub updated_at: DateTime<Utc>,
}

impl SelectionState {
    fn initial(selections: Selections) -> Self {
        Self {
            selections,
            revision: 0,
            origin: ChangeOrigin::Initial,
            changed: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SelectionStore {
    sender: Arc<watch::Sender<SelectionState>>,
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self::new(Selections::default())
    }
}

impl SelectionStore {
    pub fn new(initial: Selections) -> Self {
        let (sender, _receiver) = watch::channel(SelectionState::initial(initial));
        Self { sender: Arc::new(sender) }
    }

    pub fn snapshot(&self) -> SelectionState {
        self.sender.borrow().clone()
    }

    pub fn selections(&self) -> Selections {
        self.sender.borrow().selections.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SelectionState> {
        self.sender.subscribe()
    }

    /// Swaps the whole record. A replacement equal to the current value
    /// still bumps the revision so observers can tell the write happened.
    pub fn replace(&self, selections: Selections, origin: ChangeOrigin) -> SelectionState {
        let mut written = None;
        self.sender.send_modify(|state| {
            let changed = state.selections.diff(&selections);
            *state = SelectionState {
                selections: selections.clone(),
                revision: state.revision + 1,
                origin,
                changed,
                updated_at: Utc::now(),
            };
            written = Some(state.clone());
        });
        written.unwrap_or_else(|| self.snapshot())
    }

    /// Applies a strict user edit over the current record. Invalid edits
    /// leave the store untouched.
    pub fn update(&self, patch: &SelectionsPatch) -> Result<SelectionState, DomainError> {
        let mut outcome = None;
        self.sender.send_if_modified(|state| match patch.apply_to(&state.selections) {
            Ok(next) => {
                let changed = state.selections.diff(&next);
                *state = SelectionState {
                    selections: next,
                    revision: state.revision + 1,
                    origin: ChangeOrigin::User,
                    changed,
                    updated_at: Utc::now(),
                };
                outcome = Some(Ok(state.clone()));
                true
            }
            Err(error) => {
                outcome = Some(Err(error));
                false
            }
        });
        outcome.unwrap_or_else(|| Ok(self.snapshot()))
    }
}
