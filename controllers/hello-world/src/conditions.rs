//! Condition tracking
//!
//! Pure helpers over the ordered condition list in `HelloWorldStatus`.
//! `lastTransitionTime` only moves when a condition's status flips.

use chrono::{DateTime, Utc};
use crds::{Condition, ConditionStatus, ConditionType};

/// Desired value of a single condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionUpdate {
    pub type_: ConditionType,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    pub observed_generation: Option<i64>,
}

impl ConditionUpdate {
    pub fn new(
        type_: ConditionType,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_,
            status,
            reason: reason.into(),
            message: message.into(),
            observed_generation: None,
        }
    }

    pub fn with_generation(mut self, generation: Option<i64>) -> Self {
        self.observed_generation = generation;
        self
    }
}

/// Returns `conditions` with `update` applied.
///
/// - type absent: appended, transition time `now`
/// - status changed: replaced, transition time `now`
/// - status unchanged: reason, message and generation refreshed, transition time kept
pub fn set_condition(conditions: &[Condition], update: ConditionUpdate, now: DateTime<Utc>) -> Vec<Condition> {
    let mut result = conditions.to_vec();
    match result.iter_mut().find(|c| c.type_ == update.type_) {
        Some(existing) if existing.status == update.status => {
            existing.reason = update.reason;
            existing.message = update.message;
            existing.observed_generation = update.observed_generation;
        }
        Some(existing) => {
            *existing = into_condition(update, now);
        }
        None => result.push(into_condition(update, now)),
    }
    result
}

/// Condition of the given type, if present
pub fn find_condition(conditions: &[Condition], type_: ConditionType) -> Option<&Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Whether the condition of the given type is present with `status`
pub fn is_condition_status(conditions: &[Condition], type_: ConditionType, status: ConditionStatus) -> bool {
    find_condition(conditions, type_).is_some_and(|c| c.status == status)
}

fn into_condition(update: ConditionUpdate, now: DateTime<Utc>) -> Condition {
    Condition {
        type_: update.type_,
        status: update.status,
        reason: update.reason,
        message: update.message,
        last_transition_time: now,
        observed_generation: update.observed_generation,
    }
}
