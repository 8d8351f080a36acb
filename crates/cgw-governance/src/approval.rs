//! # Approval Ledger
//!
//! Newest-first history of granted approvals. The ledger owns approval id
//! uniqueness: [`ApprovalLedger::issue_id`] redraws until it finds an id
//! that is not yet recorded, and [`ApprovalLedger::record`] rejects
//! duplicates outright.

use rand::Rng;
use serde::{Deserialize, Serialize};

use cgw_core::{
    ApprovalId, ApproverName, DeploymentType, ProjectName, Region, RiskTier, Timestamp,
};

use crate::error::GovernanceError;

/// Draw limit for [`ApprovalLedger::issue_id`].
const MAX_ID_ATTEMPTS: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ApprovalStatus {
    #[default]
    Approved,
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => f.write_str("Approved"),
        }
    }
}

/// One row of the approval history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub id: ApprovalId,
    pub project: ProjectName,
    pub approver: ApproverName,
    pub region: Region,
    pub deployment_type: DeploymentType,
    pub risk_tier: RiskTier,
    pub date: Timestamp,
    pub status: ApprovalStatus,
    pub checks_passed: usize,
    pub checks_total: usize,
}

/// In-memory approval history.
#[derive(Debug, Clone, Default)]
pub struct ApprovalLedger {
    records: Vec<ApprovalRecord>,
}

impl ApprovalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw an approval id not present in the ledger.
    pub fn issue_id<R: Rng>(&self, rng: &mut R) -> Result<ApprovalId, GovernanceError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = ApprovalId::generate(rng);
            if self.get(&id).is_none() {
                return Ok(id);
            }
        }
        Err(GovernanceError::ApprovalIdsExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    /// Prepend a record.
    pub fn record(&mut self, record: ApprovalRecord) -> Result<(), GovernanceError> {
        if self.get(&record.id).is_some() {
            return Err(GovernanceError::DuplicateApproval(record.id));
        }
        tracing::info!(
            approval_id = %record.id,
            project = %record.project,
            approver = %record.approver,
            region = %record.region,
            "approval recorded"
        );
        self.records.insert(0, record);
        Ok(())
    }

    /// All records, newest first.
    pub fn history(&self) -> &[ApprovalRecord] {
        &self.records
    }

    pub fn get(&self, id: &ApprovalId) -> Option<&ApprovalRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
