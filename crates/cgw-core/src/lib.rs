//! # cgw-core: Foundational Types for the Compliance Gateway
//!
//! Every other crate in the workspace depends on `cgw-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for form inputs.** `ProjectName`, `ApproverName`,
//!    `CheckId`, `ApprovalId`: validated constructors, no bare strings.
//!
//! 2. **Closed enums for selectors.** `Region`, `DeploymentType` and
//!    `RiskTier` are exhaustive; adding a region forces the catalog to
//!    declare its checks.
//!
//! 3. **Static check catalog.** The ordered plan for a region is technical
//!    checks followed by that region's checks. Nothing is loaded at runtime.
//!
//! 4. **UTC-only timestamps** truncated to seconds, and **canonical bytes**
//!    as the only input to audit digests.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cgw-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod catalog;
pub mod config;
pub mod deployment;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use catalog::{CheckCatalog, CheckCategory, CheckDefinition};
pub use config::{GatewayConfig, GovernanceSettings, ScanMode, ScanSettings};
pub use deployment::{
    ApproverName, DeploymentConfig, DeploymentConfigPatch, DeploymentType, ProjectName, Region,
    RiskTier,
};
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, ConfigError, ValidationError};
pub use identity::{ApprovalId, CheckId, FeedbackId, ScanId, SessionId};
pub use temporal::Timestamp;
