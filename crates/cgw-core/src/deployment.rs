//! # Deployment Metadata
//!
//! The form an operator fills in before a scan: project, approver,
//! deployment type, risk tier and region.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const MAX_NAME_LEN: usize = 128;

/// Prefix shown in front of project names.
pub const PROJECT_PREFIX: &str = "api/";

// ─── Region ──────────────────────────────────────────────────────────

/// Deployment region. Selects the regional half of the check plan.
///
/// Serializes as its id; deserializes through [`FromStr`](std::str::FromStr),
/// so any casing is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Region {
    /// European Union.
    #[default]
    Eu,
    /// United Kingdom.
    Uk,
    /// United States.
    Us,
    /// Asia-Pacific.
    Apac,
}

impl Region {
    /// All regions in display order.
    pub const ALL: [Region; 4] = [Region::Eu, Region::Uk, Region::Us, Region::Apac];

    /// Short identifier (`eu`, `uk`, ...).
    pub fn id(&self) -> &'static str {
        match self {
            Self::Eu => "eu",
            Self::Uk => "uk",
            Self::Us => "us",
            Self::Apac => "apac",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Eu => "European Union",
            Self::Uk => "United Kingdom",
            Self::Us => "United States",
            Self::Apac => "APAC",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for Region {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.id() == needle)
            .ok_or_else(|| ValidationError::UnknownRegion(s.to_string()))
    }
}

impl TryFrom<String> for Region {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ─── Deployment type / risk tier ─────────────────────────────────────

/// Target environment of the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum DeploymentType {
    /// Customer-facing production rollout.
    #[default]
    Production,
    /// Pre-production staging.
    Staging,
    /// Development environment.
    Development,
}

impl DeploymentType {
    /// Display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "Production",
            Self::Staging => "Staging",
            Self::Development => "Development",
        }
    }
}

impl std::fmt::Display for DeploymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeploymentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" | "dev" => Ok(Self::Development),
            _ => Err(ValidationError::UnknownDeploymentType(s.to_string())),
        }
    }
}

impl TryFrom<String> for DeploymentType {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Risk tier declared by the operator. Recorded with the approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum RiskTier {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskTier {
    /// Display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ValidationError::UnknownRiskTier(s.to_string())),
        }
    }
}

impl TryFrom<String> for RiskTier {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ─── Names ───────────────────────────────────────────────────────────

/// Project name without the `api/` display prefix.
///
/// Trimmed, non-empty, at most 128 characters from `[A-Za-z0-9-_./]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectName(String);

impl ProjectName {
    /// Validate a project name. A leading `api/` is stripped.
    pub fn new(s: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = s.as_ref().trim();
        let name = trimmed.strip_prefix(PROJECT_PREFIX).unwrap_or(trimmed).trim();
        let field = "project_name";
        if name.is_empty() {
            return Err(ValidationError::Empty { field });
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::TooLong { field, max: MAX_NAME_LEN });
        }
        if let Some(ch) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/')))
        {
            return Err(ValidationError::InvalidCharacter { field, ch });
        }
        Ok(Self(name.to_string()))
    }

    /// The stored name (no prefix).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name as displayed in the form, `api/<name>`.
    pub fn display_path(&self) -> String {
        format!("{PROJECT_PREFIX}{}", self.0)
    }
}

impl std::fmt::Display for ProjectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProjectName {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ProjectName> for String {
    fn from(p: ProjectName) -> Self {
        p.0
    }
}

/// Name of the human approver. Trimmed, non-empty, at most 128 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApproverName(String);

impl ApproverName {
    /// Validate an approver name.
    pub fn new(s: impl AsRef<str>) -> Result<Self, ValidationError> {
        let name = s.as_ref().trim();
        let field = "approver_name";
        if name.is_empty() {
            return Err(ValidationError::Empty { field });
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::TooLong { field, max: MAX_NAME_LEN });
        }
        if let Some(ch) = name.chars().find(|c| c.is_control()) {
            return Err(ValidationError::InvalidCharacter { field, ch });
        }
        Ok(Self(name.to_string()))
    }

    /// Borrow the name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApproverName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ApproverName {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ApproverName> for String {
    fn from(a: ApproverName) -> Self {
        a.0
    }
}

// ─── Form ────────────────────────────────────────────────────────────

/// The deployment form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub project_name: Option<ProjectName>,
    #[serde(default)]
    pub approver_name: Option<ApproverName>,
    #[serde(default)]
    pub deployment_type: DeploymentType,
    #[serde(default)]
    pub risk_tier: RiskTier,
    #[serde(default)]
    pub region: Region,
}

impl DeploymentConfig {
    /// The project name, or an error if the form is not ready to scan.
    pub fn require_ready(&self) -> Result<&ProjectName, ValidationError> {
        self.project_name
            .as_ref()
            .ok_or(ValidationError::Empty { field: "project_name" })
    }

    /// Apply a patch. Validation happens before anything is written, so a
    /// rejected patch leaves the form untouched.
    pub fn apply(&mut self, patch: DeploymentConfigPatch) -> Result<(), ValidationError> {
        let project_name = match patch.project_name.as_deref().map(str::trim) {
            None => None,
            Some("") => Some(None),
            Some(s) => Some(Some(ProjectName::new(s)?)),
        };
        let approver_name = match patch.approver_name.as_deref().map(str::trim) {
            None => None,
            Some("") => Some(None),
            Some(s) => Some(Some(ApproverName::new(s)?)),
        };

        if let Some(p) = project_name {
            self.project_name = p;
        }
        if let Some(a) = approver_name {
            self.approver_name = a;
        }
        if let Some(t) = patch.deployment_type {
            self.deployment_type = t;
        }
        if let Some(r) = patch.risk_tier {
            self.risk_tier = r;
        }
        if let Some(r) = patch.region {
            self.region = r;
        }
        Ok(())
    }
}

/// Partial update of a [`DeploymentConfig`]. Absent fields are left alone;
/// an empty string clears a name field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfigPatch {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub approver_name: Option<String>,
    #[serde(default)]
    pub deployment_type: Option<DeploymentType>,
    #[serde(default)]
    pub risk_tier: Option<RiskTier>,
    #[serde(default)]
    pub region: Option<Region>,
}

impl DeploymentConfigPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
