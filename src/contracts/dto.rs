use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    lifecycle::{available_actions, ContractAction},
    repo_types::Contract,
};
use crate::{error::ApiError, profiles::repo_types::Role};

/// A contract as one of its parties sees it.
#[derive(Debug, Clone, Serialize)]
pub struct ContractView {
    #[serde(flatten)]
    pub contract: Contract,
    pub total_value: Decimal,
    pub actions: Vec<ContractAction>,
}

impl ContractView {
    pub fn for_role(contract: Contract, role: Role) -> Self {
        Self {
            total_value: contract.total_value(),
            actions: available_actions(&contract, role),
            contract,
        }
    }
}

/// Optional body of a lifecycle action.
#[derive(Debug, Default, Deserialize)]
pub struct ActionRequest {
    /// Version the caller last saw; a mismatch is reported as a conflict.
    #[serde(default)]
    pub expected_version: Option<i64>,
}

impl ActionRequest {
    /// An empty body carries no version guard; any other body must parse.
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid action body: {e}")))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub active: usize,
    pub pending: usize,
    pub completed: usize,
    pub cancelled: usize,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub role: Role,
    pub total: usize,
    pub counts: StatusCounts,
    pub active: Vec<ContractView>,
    pub pending: Vec<ContractView>,
    pub completed: Vec<ContractView>,
    pub cancelled: Vec<ContractView>,
}
