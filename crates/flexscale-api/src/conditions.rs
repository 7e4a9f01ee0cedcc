//! Status conditions.
//!
//! Two orthogonal dependents record why a scaling decision differed from the
//! raw recommendation:
//!
//! | AbleToScale | ScalingUnbounded | meaning                                        |
//! |-------------|------------------|------------------------------------------------|
//! | True        | True             | recommendation applied directly                |
//! | False       | True             | held back by stabilization window or rate policy |
//! | True        | False            | clamped to `[min, max]`                        |
//! | False       | False            | both                                           |
//!
//! `Ready` is derived from the dependents and never set directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    Ready,
    AbleToScale,
    ScalingUnbounded,
}

impl ConditionType {
    /// Conditions that contribute to `Ready`.
    pub const DEPENDENTS: [ConditionType; 2] = [Self::AbleToScale, Self::ScalingUnbounded];

    pub const ALL: [ConditionType; 3] = [Self::Ready, Self::AbleToScale, Self::ScalingUnbounded];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Last time `status` changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    fn unknown(condition_type: ConditionType) -> Self {
        Self {
            condition_type,
            status: ConditionStatus::Unknown,
            reason: String::new(),
            message: String::new(),
            last_transition_time: None,
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// Fixed set of conditions, one entry per `ConditionType`.
///
/// Entries are never removed; a freshly created or deserialized set always
/// contains every type, defaulting to `Unknown`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Condition>", into = "Vec<Condition>")]
pub struct Conditions {
    entries: Vec<Condition>,
}

impl Default for Conditions {
    fn default() -> Self {
        Self {
            entries: ConditionType::ALL.iter().copied().map(Condition::unknown).collect(),
        }
    }
}

impl From<Vec<Condition>> for Conditions {
    fn from(list: Vec<Condition>) -> Self {
        let mut conditions = Self::default();
        for c in list {
            if let Some(slot) = conditions.slot_mut(c.condition_type) {
                *slot = c;
            }
        }
        conditions
    }
}

impl From<Conditions> for Vec<Condition> {
    fn from(conditions: Conditions) -> Self {
        conditions.entries
    }
}

impl Conditions {
    pub fn get(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.entries.iter().find(|c| c.condition_type == condition_type)
    }

    pub fn is_true(&self, condition_type: ConditionType) -> bool {
        self.get(condition_type).is_some_and(Condition::is_true)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.entries.iter()
    }

    /// Mark a dependent condition True and recompute `Ready`.
    pub fn mark_true(
        &mut self,
        condition_type: ConditionType,
        reason: &str,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        self.set(condition_type, ConditionStatus::True, reason, message.into(), now);
        self.recompute_ready(now);
    }

    /// Mark a dependent condition False and recompute `Ready`.
    pub fn mark_false(
        &mut self,
        condition_type: ConditionType,
        reason: &str,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        self.set(condition_type, ConditionStatus::False, reason, message.into(), now);
        self.recompute_ready(now);
    }

    fn slot_mut(&mut self, condition_type: ConditionType) -> Option<&mut Condition> {
        self.entries.iter_mut().find(|c| c.condition_type == condition_type)
    }

    fn set(
        &mut self,
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: &str,
        message: String,
        now: DateTime<Utc>,
    ) {
        let Some(slot) = self.slot_mut(condition_type) else {
            return;
        };
        if slot.status != status {
            slot.last_transition_time = Some(now);
        }
        slot.status = status;
        slot.reason = reason.to_string();
        slot.message = message;
    }

    fn recompute_ready(&mut self, now: DateTime<Utc>) {
        let failing = ConditionType::DEPENDENTS
            .iter()
            .filter_map(|t| self.get(*t))
            .find(|c| c.status == ConditionStatus::False)
            .cloned();

        if let Some(dep) = failing {
            self.set(ConditionType::Ready, ConditionStatus::False, &dep.reason, dep.message, now);
        } else if ConditionType::DEPENDENTS.iter().all(|t| self.is_true(*t)) {
            self.set(ConditionType::Ready, ConditionStatus::True, "", String::new(), now);
        } else {
            self.set(ConditionType::Ready, ConditionStatus::Unknown, "", String::new(), now);
        }
    }
}
