// Registry: the capped, append-only membership set.
//
// Pure state: no I/O and no locking. The ledger owns every deployed Registry
// and applies joins one at a time, which is what makes admission atomic
// across concurrent clients.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::chain::Address;

/// Revert reason recorded when a member tries to join again.
pub const DUPLICATE_REASON: &str = "Sender has already been allowlisted";

/// Revert reason recorded when the registry is full.
pub const CAPACITY_REASON: &str = "More addresses cant be added, limit reached";

/// Why an admission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Already a member. Membership is achieved, so callers should not treat
    /// this as a failure.
    DuplicateParticipant,
    /// Every slot is taken.
    CapacityExceeded,
}

impl Rejection {
    /// Revert reason carried in the transaction receipt.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::DuplicateParticipant => DUPLICATE_REASON,
            Rejection::CapacityExceeded => CAPACITY_REASON,
        }
    }

    /// Map a receipt's revert reason back to a rejection, if it is one.
    pub fn from_reason(reason: &str) -> Option<Self> {
        match reason {
            DUPLICATE_REASON => Some(Rejection::DuplicateParticipant),
            CAPACITY_REASON => Some(Rejection::CapacityExceeded),
            _ => None,
        }
    }
}

/// Result of a single admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "rejection", rename_all = "snake_case")]
pub enum JoinOutcome {
    Accepted,
    Rejected(Rejection),
}

impl JoinOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, JoinOutcome::Accepted)
    }
}

/// Membership set bounded by an immutable capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    capacity: u64,
    members: BTreeSet<Address>,
}

impl Registry {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            members: BTreeSet::new(),
        }
    }

    /// Admit `participant`.
    ///
    /// The duplicate check runs before the capacity check, so an existing
    /// member of a full registry hears `DuplicateParticipant`.
    pub fn join(&mut self, participant: Address) -> JoinOutcome {
        if self.members.contains(&participant) {
            return JoinOutcome::Rejected(Rejection::DuplicateParticipant);
        }
        if self.is_full() {
            return JoinOutcome::Rejected(Rejection::CapacityExceeded);
        }
        self.members.insert(participant);
        JoinOutcome::Accepted
    }

    pub fn is_member(&self, participant: &Address) -> bool {
        self.members.contains(participant)
    }

    pub fn count(&self) -> u64 {
        self.members.len() as u64
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn remaining(&self) -> u64 {
        self.capacity.saturating_sub(self.count())
    }

    pub fn is_full(&self) -> bool {
        self.count() >= self.capacity
    }
}
