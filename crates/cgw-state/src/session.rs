//! # Session: One Pass Through the Gateway
//!
//! Holds the deployment form, the current stage, and one [`CheckResult`]
//! per check of the active plan, kept in plan order.
//!
//! ## Stage Rules
//!
//! | Operation       | Allowed in          |
//! |-----------------|---------------------|
//! | `update_config` | CONFIG              |
//! | `set_approver`  | CONFIG, REVIEW      |
//! | `start_scan`    | CONFIG              |
//! | `mark_running`  | SCANNING            |
//! | `settle`        | SCANNING            |
//! | `approve`       | REVIEW              |
//! | `reset`         | any                 |
//!
//! The move from SCANNING to REVIEW is not an operation of its own: it
//! happens inside the `settle` call that settles the last check.

use serde::{Deserialize, Serialize};

use cgw_core::{
    ApprovalId, ApproverName, CheckCatalog, CheckDefinition, CheckId, DeploymentConfig,
    DeploymentConfigPatch, DeploymentType, ProjectName, Region, RiskTier, ScanId, SessionId,
    Timestamp,
};

use crate::stage::{Stage, StageError, StageTransition};

/// Progress of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Pending,
    Running,
    Passed,
    Failed,
}

impl CheckStatus {
    /// Whether the check has a final outcome.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Final outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckOutcome {
    Passed,
    Failed,
}

impl From<CheckOutcome> for CheckStatus {
    fn from(outcome: CheckOutcome) -> Self {
        match outcome {
            CheckOutcome::Passed => CheckStatus::Passed,
            CheckOutcome::Failed => CheckStatus::Failed,
        }
    }
}

/// One row of the results table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check: CheckDefinition,
    pub status: CheckStatus,
    /// Simulated run time, set when the check settles.
    pub duration_ms: Option<u64>,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
}

impl CheckResult {
    fn pending(check: CheckDefinition) -> Self {
        Self {
            check,
            status: CheckStatus::Pending,
            duration_ms: None,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Counts of check statuses in the current plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub passed: usize,
    pub failed: usize,
}

impl ScanSummary {
    /// Every check has a final outcome and the plan is non-empty.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.passed + self.failed == self.total
    }
}

/// Handed out by [`Session::start_scan`]: the scan to run and its plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTicket {
    pub scan_id: ScanId,
    pub plan: Vec<CheckDefinition>,
}

/// Everything known about an approval at the moment it is granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalReceipt {
    pub session_id: SessionId,
    pub approval_id: ApprovalId,
    pub project: ProjectName,
    pub approver: ApproverName,
    pub region: Region,
    pub deployment_type: DeploymentType,
    pub risk_tier: RiskTier,
    pub checks_passed: usize,
    pub checks_total: usize,
    pub approved_at: Timestamp,
}

/// A deployment's walk through the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    config: DeploymentConfig,
    stage: Stage,
    scan_id: Option<ScanId>,
    results: Vec<CheckResult>,
    approval_id: Option<ApprovalId>,
    transitions: Vec<StageTransition>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Session {
    /// A fresh session in CONFIG.
    pub fn new(config: DeploymentConfig) -> Self {
        let now = Timestamp::now();
        Self {
            id: SessionId::new(),
            config,
            stage: Stage::Config,
            scan_id: None,
            results: Vec::new(),
            approval_id: None,
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The scan whose events are currently accepted.
    pub fn scan_id(&self) -> Option<ScanId> {
        self.scan_id
    }

    /// Results in plan order.
    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn approval_id(&self) -> Option<&ApprovalId> {
        self.approval_id.as_ref()
    }

    /// Every stage change, oldest first.
    pub fn transitions(&self) -> &[StageTransition] {
        &self.transitions
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    // ── Form ─────────────────────────────────────────────────────────

    /// Patch the deployment form.
    pub fn update_config(&mut self, patch: DeploymentConfigPatch) -> Result<(), StageError> {
        if self.stage != Stage::Config {
            return Err(StageError::ConfigLocked { stage: self.stage });
        }
        self.config.apply(patch)?;
        self.touch();
        Ok(())
    }

    /// Set the approver. Allowed while configuring and while reviewing,
    /// so the name can be supplied at approval time.
    pub fn set_approver(&mut self, name: ApproverName) -> Result<(), StageError> {
        if !matches!(self.stage, Stage::Config | Stage::Review) {
            return Err(StageError::WrongStage {
                action: "set approver",
                stage: self.stage,
            });
        }
        self.config.approver_name = Some(name);
        self.touch();
        Ok(())
    }

    // ── Scan ─────────────────────────────────────────────────────────

    /// Begin a scan of the plan for the configured region.
    pub fn start_scan(&mut self) -> Result<ScanTicket, StageError> {
        self.require_stage(Stage::Config, "start a scan")?;
        self.config.require_ready()?;

        let plan = CheckCatalog::plan_for(self.config.region);
        let scan_id = ScanId::new();
        self.scan_id = Some(scan_id);
        self.results = plan.iter().cloned().map(CheckResult::pending).collect();
        self.approval_id = None;
        self.do_transition(
            Stage::Scanning,
            format!("scan started with {} checks", plan.len()),
        );
        Ok(ScanTicket { scan_id, plan })
    }

    /// Mark a pending check as running.
    pub fn mark_running(&mut self, scan_id: ScanId, check_id: &CheckId) -> Result<(), StageError> {
        self.require_current_scan(scan_id, "mark a check running")?;
        let result = self.result_mut(check_id)?;
        if result.status != CheckStatus::Pending {
            return Err(StageError::NotPending(check_id.clone()));
        }
        result.status = CheckStatus::Running;
        result.started_at = Some(Timestamp::now());
        self.touch();
        Ok(())
    }

    /// Record a check's outcome. Returns `true` when this was the last
    /// unsettled check, in which case the session has moved to REVIEW.
    pub fn settle(
        &mut self,
        scan_id: ScanId,
        check_id: &CheckId,
        outcome: CheckOutcome,
        duration_ms: u64,
    ) -> Result<bool, StageError> {
        self.require_current_scan(scan_id, "settle a check")?;
        let now = Timestamp::now();
        let result = self.result_mut(check_id)?;
        if result.status.is_settled() {
            return Err(StageError::AlreadySettled(check_id.clone()));
        }
        result.status = outcome.into();
        result.duration_ms = Some(duration_ms);
        result.started_at.get_or_insert(now);
        result.finished_at = Some(now);

        let summary = self.summary();
        if summary.is_complete() {
            self.do_transition(
                Stage::Review,
                format!("{} passed, {} failed", summary.passed, summary.failed),
            );
            Ok(true)
        } else {
            self.touch();
            Ok(false)
        }
    }

    // ── Approval ─────────────────────────────────────────────────────

    /// Check whether [`approve`](Self::approve) would succeed, without
    /// changing anything. Returns the approver that would sign off.
    pub fn check_approvable(&self) -> Result<&ApproverName, StageError> {
        self.check_approvable_as(None)
    }

    /// [`check_approvable`](Self::check_approvable) with `approver`, when
    /// given, standing in for the form's approver. Lets a caller validate
    /// an approval-time name before writing it to the form.
    pub fn check_approvable_as<'a>(
        &'a self,
        approver: Option<&'a ApproverName>,
    ) -> Result<&'a ApproverName, StageError> {
        self.require_stage(Stage::Review, "approve")?;
        let summary = self.summary();
        if summary.failed > 0 {
            return Err(StageError::FailedChecks {
                failed: summary.failed,
                total: summary.total,
            });
        }
        approver
            .or(self.config.approver_name.as_ref())
            .ok_or(StageError::MissingApprover)
    }

    /// Approve the deployment under `approval_id`.
    pub fn approve(&mut self, approval_id: ApprovalId) -> Result<ApprovalReceipt, StageError> {
        let approver = self.check_approvable()?.clone();
        let project = self.config.require_ready()?.clone();
        let summary = self.summary();

        self.approval_id = Some(approval_id.clone());
        self.do_transition(Stage::Approved, format!("approved as {approval_id} by {approver}"));

        Ok(ApprovalReceipt {
            session_id: self.id,
            approval_id,
            project,
            approver,
            region: self.config.region,
            deployment_type: self.config.deployment_type,
            risk_tier: self.config.risk_tier,
            checks_passed: summary.passed,
            checks_total: summary.total,
            approved_at: self.updated_at,
        })
    }

    // ── Reset ────────────────────────────────────────────────────────

    /// Return to CONFIG from any stage. The form is kept; results, the
    /// scan id and the approval id are discarded.
    pub fn reset(&mut self) {
        self.scan_id = None;
        self.results.clear();
        self.approval_id = None;
        if self.stage == Stage::Config {
            self.touch();
        } else {
            self.do_transition(Stage::Config, "reset".to_string());
        }
    }

    /// Status counts over the current plan.
    pub fn summary(&self) -> ScanSummary {
        let mut summary = ScanSummary {
            total: self.results.len(),
            ..ScanSummary::default()
        };
        for result in &self.results {
            match result.status {
                CheckStatus::Pending => summary.pending += 1,
                CheckStatus::Running => summary.running += 1,
                CheckStatus::Passed => summary.passed += 1,
                CheckStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn require_stage(&self, expected: Stage, action: &'static str) -> Result<(), StageError> {
        if self.stage != expected {
            return Err(StageError::WrongStage {
                action,
                stage: self.stage,
            });
        }
        Ok(())
    }

    fn require_current_scan(&self, scan_id: ScanId, action: &'static str) -> Result<(), StageError> {
        if self.scan_id != Some(scan_id) {
            return Err(StageError::StaleScan {
                current: self.scan_id,
                got: scan_id,
            });
        }
        self.require_stage(Stage::Scanning, action)
    }

    fn result_mut(&mut self, check_id: &CheckId) -> Result<&mut CheckResult, StageError> {
        self.results
            .iter_mut()
            .find(|r| &r.check.id == check_id)
            .ok_or_else(|| StageError::UnknownCheck(check_id.clone()))
    }

    fn do_transition(&mut self, to: Stage, reason: String) {
        let at = Timestamp::now();
        tracing::info!(session_id = %self.id, from = %self.stage, %to, %reason, "stage transition");
        self.transitions.push(StageTransition {
            from: self.stage,
            to,
            at,
            reason,
        });
        self.stage = to;
        self.updated_at = at;
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_config(region: Region) -> DeploymentConfig {
        DeploymentConfig {
            project_name: Some(ProjectName::new("payments-service").unwrap()),
            approver_name: Some(ApproverName::new("Dana Reviewer").unwrap()),
            region,
            ..DeploymentConfig::default()
        }
    }

    fn settle_all(session: &mut Session, ticket: &ScanTicket, fail: &[&str]) {
        for check in &ticket.plan {
            session.mark_running(ticket.scan_id, &check.id).unwrap();
            let outcome = if fail.contains(&check.id.as_str()) {
                CheckOutcome::Failed
            } else {
                CheckOutcome::Passed
            };
            session.settle(ticket.scan_id, &check.id, outcome, 10).unwrap();
        }
    }

    fn approval_id() -> ApprovalId {
        ApprovalId::parse("APP-424242").unwrap()
    }

    // ── Happy path ───────────────────────────────────────────────────

    #[test]
    fn new_session_starts_in_config() {
        let session = Session::new(DeploymentConfig::default());
        assert_eq!(session.stage(), Stage::Config);
        assert!(session.results().is_empty());
        assert!(session.scan_id().is_none());
        assert_eq!(session.summary(), ScanSummary::default());
    }

    #[test]
    fn full_lifecycle_reaches_approved() {
        let mut session = Session::new(ready_config(Region::Uk));
        let ticket = session.start_scan().unwrap();
        assert_eq!(session.stage(), Stage::Scanning);
        assert_eq!(ticket.plan, CheckCatalog::plan_for(Region::Uk));
        assert_eq!(session.summary().pending, ticket.plan.len());

        settle_all(&mut session, &ticket, &[]);
        assert_eq!(session.stage(), Stage::Review);

        let receipt = session.approve(approval_id()).unwrap();
        assert_eq!(session.stage(), Stage::Approved);
        assert_eq!(session.approval_id(), Some(&approval_id()));
        assert_eq!(receipt.project.as_str(), "payments-service");
        assert_eq!(receipt.approver.as_str(), "Dana Reviewer");
        assert_eq!(receipt.region, Region::Uk);
        assert_eq!(receipt.checks_passed, receipt.checks_total);

        let stages: Vec<_> = session.transitions().iter().map(|t| (t.from, t.to)).collect();
        assert_eq!(
            stages,
            vec![
                (Stage::Config, Stage::Scanning),
                (Stage::Scanning, Stage::Review),
                (Stage::Review, Stage::Approved),
            ]
        );
    }

    #[test]
    fn results_follow_plan_order() {
        let mut session = Session::new(ready_config(Region::Apac));
        let ticket = session.start_scan().unwrap();
        let ids: Vec<_> = session.results().iter().map(|r| r.check.id.clone()).collect();
        let plan_ids: Vec<_> = ticket.plan.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, plan_ids);
    }

    #[test]
    fn settle_reports_completion_only_on_last_check() {
        let mut session = Session::new(ready_config(Region::Eu));
        let ticket = session.start_scan().unwrap();
        let (last, rest) = ticket.plan.split_last().unwrap();
        for check in rest {
            let done = session
                .settle(ticket.scan_id, &check.id, CheckOutcome::Passed, 5)
                .unwrap();
            assert!(!done);
        }
        assert!(session
            .settle(ticket.scan_id, &last.id, CheckOutcome::Passed, 5)
            .unwrap());
        assert_eq!(session.stage(), Stage::Review);
    }

    #[test]
    fn settled_results_record_timing() {
        let mut session = Session::new(ready_config(Region::Eu));
        let ticket = session.start_scan().unwrap();
        let first = &ticket.plan[0].id;
        session.mark_running(ticket.scan_id, first).unwrap();
        assert_eq!(session.results()[0].status, CheckStatus::Running);
        assert!(session.results()[0].started_at.is_some());

        session.settle(ticket.scan_id, first, CheckOutcome::Passed, 812).unwrap();
        let row = &session.results()[0];
        assert_eq!(row.status, CheckStatus::Passed);
        assert_eq!(row.duration_ms, Some(812));
        assert!(row.finished_at.is_some());
    }

    #[test]
    fn approver_can_be_supplied_during_review() {
        let mut config = ready_config(Region::Us);
        config.approver_name = None;
        let mut session = Session::new(config);
        let ticket = session.start_scan().unwrap();
        settle_all(&mut session, &ticket, &[]);

        assert_eq!(session.approve(approval_id()), Err(StageError::MissingApprover));
        session.set_approver(ApproverName::new("Late Approver").unwrap()).unwrap();
        let receipt = session.approve(approval_id()).unwrap();
        assert_eq!(receipt.approver.as_str(), "Late Approver");
    }

    #[test]
    fn refused_approval_check_leaves_form_alone() {
        let mut config = ready_config(Region::Eu);
        config.approver_name = None;
        let mut session = Session::new(config);
        let ticket = session.start_scan().unwrap();
        let failing = ticket.plan[0].id.as_str().to_string();
        settle_all(&mut session, &ticket, &[failing.as_str()]);

        let late = ApproverName::new("Late Approver").unwrap();
        assert!(matches!(
            session.check_approvable_as(Some(&late)),
            Err(StageError::FailedChecks { failed: 1, .. })
        ));
        assert!(session.config().approver_name.is_none());
    }

    #[test]
    fn approval_time_name_overrides_missing_approver() {
        let mut config = ready_config(Region::Uk);
        config.approver_name = None;
        let mut session = Session::new(config);
        let ticket = session.start_scan().unwrap();
        settle_all(&mut session, &ticket, &[]);

        assert_eq!(session.check_approvable(), Err(StageError::MissingApprover));
        let late = ApproverName::new("Late Approver").unwrap();
        assert_eq!(session.check_approvable_as(Some(&late)), Ok(&late));
    }

    #[test]
    fn running_check_cannot_start_again() {
        let mut session = Session::new(ready_config(Region::Eu));
        let ticket = session.start_scan().unwrap();
        let first = &ticket.plan[0].id;
        session.mark_running(ticket.scan_id, first).unwrap();
        assert_eq!(
            session.mark_running(ticket.scan_id, first),
            Err(StageError::NotPending(first.clone()))
        );
    }

    #[test]
    fn reset_keeps_form_and_clears_results() {
        let mut session = Session::new(ready_config(Region::Eu));
        let ticket = session.start_scan().unwrap();
        settle_all(&mut session, &ticket, &[]);
        session.approve(approval_id()).unwrap();

        session.reset();
        assert_eq!(session.stage(), Stage::Config);
        assert!(session.results().is_empty());
        assert!(session.scan_id().is_none());
        assert!(session.approval_id().is_none());
        assert_eq!(session.config(), &ready_config(Region::Eu));
        assert_eq!(session.transitions().last().unwrap().reason, "reset");
    }

    #[test]
    fn reset_in_config_records_no_transition() {
        let mut session = Session::new(DeploymentConfig::default());
        session.reset();
        assert!(session.transitions().is_empty());
    }

    // ── Invalid transitions ──────────────────────────────────────────

    #[test]
    fn start_requires_project_name() {
        let mut session = Session::new(DeploymentConfig::default());
        let err = session.start_scan().unwrap_err();
        assert!(matches!(err, StageError::Validation(_)));
        assert_eq!(session.stage(), Stage::Config);
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut session = Session::new(ready_config(Region::Eu));
        session.start_scan().unwrap();
        assert_eq!(
            session.start_scan().unwrap_err(),
            StageError::WrongStage { action: "start a scan", stage: Stage::Scanning }
        );
    }

    #[test]
    fn config_is_locked_outside_config_stage() {
        let mut session = Session::new(ready_config(Region::Eu));
        session.start_scan().unwrap();
        let patch = DeploymentConfigPatch {
            region: Some(Region::Us),
            ..DeploymentConfigPatch::default()
        };
        assert_eq!(
            session.update_config(patch),
            Err(StageError::ConfigLocked { stage: Stage::Scanning })
        );
        assert_eq!(session.config().region, Region::Eu);
    }

    #[test]
    fn invalid_patch_is_a_validation_error() {
        let mut session = Session::new(DeploymentConfig::default());
        let patch = DeploymentConfigPatch {
            project_name: Some("has spaces!".into()),
            ..DeploymentConfigPatch::default()
        };
        assert!(matches!(
            session.update_config(patch),
            Err(StageError::Validation(_))
        ));
    }

    #[test]
    fn approval_rejected_with_failures() {
        let mut session = Session::new(ready_config(Region::Eu));
        let ticket = session.start_scan().unwrap();
        settle_all(&mut session, &ticket, &["secrets-scan", "gdpr-dpia"]);
        assert_eq!(session.stage(), Stage::Review);

        let err = session.approve(approval_id()).unwrap_err();
        assert_eq!(err, StageError::FailedChecks { failed: 2, total: ticket.plan.len() });
        assert_eq!(session.stage(), Stage::Review);
        assert!(session.approval_id().is_none());
    }

    #[test]
    fn approve_outside_review_is_rejected() {
        let mut session = Session::new(ready_config(Region::Eu));
        assert!(matches!(
            session.approve(approval_id()),
            Err(StageError::WrongStage { stage: Stage::Config, .. })
        ));
        session.start_scan().unwrap();
        assert!(matches!(
            session.approve(approval_id()),
            Err(StageError::WrongStage { stage: Stage::Scanning, .. })
        ));
    }

    #[test]
    fn set_approver_rejected_while_scanning() {
        let mut session = Session::new(ready_config(Region::Eu));
        session.start_scan().unwrap();
        assert!(session
            .set_approver(ApproverName::new("Someone").unwrap())
            .is_err());
    }

    #[test]
    fn stale_scan_events_are_rejected_after_reset() {
        let mut session = Session::new(ready_config(Region::Eu));
        let old = session.start_scan().unwrap();
        session.reset();
        let new = session.start_scan().unwrap();

        let check = &old.plan[0].id;
        let err = session
            .settle(old.scan_id, check, CheckOutcome::Passed, 1)
            .unwrap_err();
        assert_eq!(
            err,
            StageError::StaleScan { current: Some(new.scan_id), got: old.scan_id }
        );
        assert_eq!(session.summary().pending, new.plan.len());
    }

    #[test]
    fn unknown_and_double_settled_checks_are_rejected() {
        let mut session = Session::new(ready_config(Region::Eu));
        let ticket = session.start_scan().unwrap();

        let foreign = CheckId::new("ico-registration").unwrap();
        assert_eq!(
            session.settle(ticket.scan_id, &foreign, CheckOutcome::Passed, 1),
            Err(StageError::UnknownCheck(foreign))
        );

        let first = &ticket.plan[0].id;
        session.settle(ticket.scan_id, first, CheckOutcome::Passed, 1).unwrap();
        assert_eq!(
            session.settle(ticket.scan_id, first, CheckOutcome::Failed, 1),
            Err(StageError::AlreadySettled(first.clone()))
        );
        assert_eq!(
            session.mark_running(ticket.scan_id, first),
            Err(StageError::NotPending(first.clone()))
        );
    }

    #[test]
    fn session_serializes_stage_and_results() {
        let mut session = Session::new(ready_config(Region::Eu));
        session.start_scan().unwrap();
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["stage"], "SCANNING");
        assert_eq!(json["results"][0]["status"], "PENDING");
        assert_eq!(json["config"]["region"], "eu");
    }
}
