//! # Check Catalog
//!
//! The static, ordered list of compliance checks. A scan plan for a region is
//! every technical check followed by the checks of that region:
//!
//! ```text
//! plan(eu) = technical ++ regional(eu)
//! ```
//!
//! Check ids are unique across the whole catalog, so a result map keyed by
//! [`CheckId`] never collides between the two halves of a plan.

use serde::{Deserialize, Serialize};

use crate::deployment::Region;
use crate::identity::CheckId;

/// Which half of the plan a check belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "region", rename_all = "snake_case")]
pub enum CheckCategory {
    /// Applies to every deployment.
    Technical,
    /// Applies to deployments in one region.
    Regional(Region),
}

/// A named compliance check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckDefinition {
    pub id: CheckId,
    pub name: String,
    pub description: String,
    pub category: CheckCategory,
}

type Entry = (&'static str, &'static str, &'static str);

const TECHNICAL: &[Entry] = &[
    ("encryption-in-transit", "Encryption in transit", "All external endpoints terminate TLS 1.2 or later."),
    ("encryption-at-rest", "Encryption at rest", "Data stores are encrypted with managed keys."),
    ("secrets-scan", "Secrets scan", "No credentials or private keys are committed to the repository."),
    ("dependency-vulnerabilities", "Dependency vulnerabilities", "No known critical CVEs in the dependency tree."),
    ("access-control", "Least-privilege access", "Service accounts hold only the roles they use."),
    ("audit-logging", "Audit logging", "Security-relevant events are logged and retained."),
    ("backup-recovery", "Backup and recovery", "Backups are scheduled and a restore has been tested."),
    ("container-hardening", "Container hardening", "Base images are pinned and processes run as non-root."),
];

const EU: &[Entry] = &[
    ("gdpr-data-residency", "GDPR data residency", "Personal data is stored and processed inside the EEA."),
    ("gdpr-records-of-processing", "Records of processing", "The processing activity is listed in the Article 30 register."),
    ("gdpr-dpia", "Data protection impact assessment", "A DPIA exists for high-risk processing."),
    ("nis2-incident-reporting", "NIS2 incident reporting", "An incident reporting runbook meets the 24-hour notice window."),
];

const UK: &[Entry] = &[
    ("uk-gdpr-data-residency", "UK GDPR data residency", "Transfers outside the UK rely on an adequacy decision or IDTA."),
    ("ico-registration", "ICO registration", "The controller is registered with the Information Commissioner's Office."),
    ("fca-operational-resilience", "FCA operational resilience", "Important business services have mapped impact tolerances."),
    ("uk-transfer-risk-assessment", "Transfer risk assessment", "A transfer risk assessment covers every third-country processor."),
];

const US: &[Entry] = &[
    ("soc2-controls", "SOC 2 controls", "The service is inside the current SOC 2 Type II scope."),
    ("ccpa-consumer-rights", "CCPA consumer rights", "Access and deletion requests are routed to the privacy queue."),
    ("glba-safeguards", "GLBA safeguards", "Customer financial data is covered by the safeguards programme."),
    ("state-breach-notification", "State breach notification", "Breach notification contacts are defined for every state served."),
];

const APAC: &[Entry] = &[
    ("sg-pdpa-consent", "Singapore PDPA consent", "Collection purposes are notified and consent is recorded."),
    ("au-privacy-principles", "Australian Privacy Principles", "Cross-border disclosure follows APP 8."),
    ("jp-appi-transfers", "APPI third-party transfers", "Transfers out of Japan are logged with recipient details."),
    ("apac-data-localisation", "Data localisation", "Regulated records stay in-country where local law requires."),
];

/// Accessor for the static catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckCatalog;

impl CheckCatalog {
    /// Technical checks in plan order.
    pub fn technical() -> Vec<CheckDefinition> {
        build(TECHNICAL, CheckCategory::Technical)
    }

    /// Checks specific to `region`, in plan order.
    pub fn regional(region: Region) -> Vec<CheckDefinition> {
        build(regional_entries(region), CheckCategory::Regional(region))
    }

    /// The full ordered plan for a region: technical checks, then regional.
    pub fn plan_for(region: Region) -> Vec<CheckDefinition> {
        let mut plan = Self::technical();
        plan.extend(Self::regional(region));
        plan
    }

    /// Every check in the catalog, technical first, then each region in
    /// [`Region::ALL`] order.
    pub fn all() -> Vec<CheckDefinition> {
        let mut all = Self::technical();
        for region in Region::ALL {
            all.extend(Self::regional(region));
        }
        all
    }

    /// Look up a check by id.
    pub fn find(id: &CheckId) -> Option<CheckDefinition> {
        Self::all().into_iter().find(|c| &c.id == id)
    }
}

fn regional_entries(region: Region) -> &'static [Entry] {
    match region {
        Region::Eu => EU,
        Region::Uk => UK,
        Region::Us => US,
        Region::Apac => APAC,
    }
}

fn build(entries: &'static [Entry], category: CheckCategory) -> Vec<CheckDefinition> {
    entries
        .iter()
        .map(|&(id, name, description)| CheckDefinition {
            id: CheckId::from_static(id),
            name: name.to_string(),
            description: description.to_string(),
            category,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_catalog_id_is_valid() {
        for check in CheckCatalog::all() {
            assert!(
                CheckId::new(check.id.as_str()).is_ok(),
                "catalog id {} is not kebab-case",
                check.id
            );
        }
    }

    #[test]
    fn ids_are_unique_across_catalog() {
        let all = CheckCatalog::all();
        let unique: HashSet<_> = all.iter().map(|c| c.id.clone()).collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn plan_is_technical_then_regional() {
        for region in Region::ALL {
            let plan = CheckCatalog::plan_for(region);
            let technical = CheckCatalog::technical();
            assert_eq!(plan.len(), technical.len() + CheckCatalog::regional(region).len());
            assert_eq!(&plan[..technical.len()], technical.as_slice());
            assert!(plan[technical.len()..]
                .iter()
                .all(|c| c.category == CheckCategory::Regional(region)));
        }
    }

    #[test]
    fn plan_order_is_stable() {
        let plan = CheckCatalog::plan_for(Region::Eu);
        assert_eq!(plan[0].id.as_str(), "encryption-in-transit");
        assert_eq!(plan.last().unwrap().id.as_str(), "nis2-incident-reporting");
    }

    #[test]
    fn find_returns_definition() {
        let id = CheckId::new("ico-registration").unwrap();
        let found = CheckCatalog::find(&id).unwrap();
        assert_eq!(found.category, CheckCategory::Regional(Region::Uk));
        assert!(CheckCatalog::find(&CheckId::new("no-such-check").unwrap()).is_none());
    }

    #[test]
    fn category_serializes_with_region() {
        let json = serde_json::to_value(CheckCategory::Regional(Region::Apac)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "regional", "region": "apac"}));
        let json = serde_json::to_value(CheckCategory::Technical).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "technical"}));
    }
}
