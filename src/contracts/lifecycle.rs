//! Contract status transitions.
//!
//! ```text
//! pending --accept--> active --deliver--> completed
//!    |                  |
//!    +--decline/cancel--+--> cancelled        (pay: active, status unchanged)
//! ```
//!
//! Only the transitions in [`plan`] exist; terminal contracts accept nothing.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{Contract, ContractStatus, ContractUpdate, PaymentStatus};
use crate::profiles::repo_types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractAction {
    Accept,
    Decline,
    Deliver,
    Pay,
    Cancel,
}

impl ContractAction {
    pub const ALL: [ContractAction; 5] = [
        ContractAction::Accept,
        ContractAction::Decline,
        ContractAction::Deliver,
        ContractAction::Pay,
        ContractAction::Cancel,
    ];

    /// The only role allowed to perform this action.
    pub fn actor(self) -> Role {
        match self {
            ContractAction::Accept | ContractAction::Decline | ContractAction::Deliver => {
                Role::Farmer
            }
            ContractAction::Pay | ContractAction::Cancel => Role::Buyer,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContractAction::Accept => "accept",
            ContractAction::Decline => "decline",
            ContractAction::Deliver => "deliver",
            ContractAction::Pay => "pay",
            ContractAction::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for ContractAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("only the {actor} may {action} a contract, not the {role}", actor = .action.actor())]
    WrongActor { action: ContractAction, role: Role },

    #[error("cannot {action} a {status} contract")]
    NotAllowed {
        action: ContractAction,
        status: ContractStatus,
    },

    #[error("payment for this contract is already completed")]
    AlreadyPaid,
}

/// Computes the write `action` performs on `contract` when done by `role`.
pub fn plan(
    contract: &Contract,
    action: ContractAction,
    role: Role,
    now: OffsetDateTime,
) -> Result<ContractUpdate, LifecycleError> {
    if action.actor() != role {
        return Err(LifecycleError::WrongActor { action, role });
    }
    if contract.status.is_terminal() {
        return Err(LifecycleError::NotAllowed {
            action,
            status: contract.status,
        });
    }

    let mut update = ContractUpdate {
        status: contract.status,
        payment_status: contract.payment_status,
        cancelled_by: None,
        cancellation_reason: None,
        delivered_at: None,
        paid_at: None,
        updated_at: now,
    };

    match (action, contract.status) {
        (ContractAction::Accept, ContractStatus::Pending) => {
            update.status = ContractStatus::Active;
        }
        (ContractAction::Decline, ContractStatus::Pending) => {
            update.status = ContractStatus::Cancelled;
            update.cancelled_by = Some(Role::Farmer);
            update.cancellation_reason = Some("Declined by farmer".into());
        }
        (ContractAction::Deliver, ContractStatus::Active) => {
            update.status = ContractStatus::Completed;
            update.delivered_at = Some(now);
        }
        (ContractAction::Pay, ContractStatus::Active) => {
            if contract.payment_status == PaymentStatus::Completed {
                return Err(LifecycleError::AlreadyPaid);
            }
            update.payment_status = PaymentStatus::Completed;
            update.paid_at = Some(now);
        }
        (ContractAction::Cancel, ContractStatus::Pending) => {
            update.status = ContractStatus::Cancelled;
            update.cancelled_by = Some(Role::Buyer);
            update.cancellation_reason = Some("Cancelled by buyer".into());
        }
        (action, status) => return Err(LifecycleError::NotAllowed { action, status }),
    }

    Ok(update)
}

/// Actions `role` may currently take on `contract`.
pub fn available_actions(contract: &Contract, role: Role) -> Vec<ContractAction> {
    let at = contract.updated_at.unwrap_or(contract.created_at);
    ContractAction::ALL
        .into_iter()
        .filter(|a| plan(contract, *a, role, at).is_ok())
        .collect()
}
