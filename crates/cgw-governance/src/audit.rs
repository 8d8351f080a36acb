//! # Audit Trail
//!
//! Append-only, hash-chained record of gateway mutations.
//!
//! ```text
//! digest(n) = sha256(JCS({sequence, kind, subject, metadata, recorded_at, previous_digest}))
//! previous_digest(n) = digest(n - 1)
//! ```
//!
//! The first entry links to [`ContentDigest::GENESIS`]. The trail is bounded:
//! when it exceeds capacity the oldest 10% is trimmed, and the digest the
//! oldest retained entry links to is kept as the chain anchor so
//! [`AuditTrail::verify`] still covers what remains.

use serde::{Deserialize, Serialize};

use cgw_core::{sha256_digest, CanonicalBytes, ContentDigest, Timestamp};

use crate::error::{AuditError, GovernanceError};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    SessionCreated,
    ConfigUpdated,
    ScanStarted,
    CheckSettled,
    ScanCompleted,
    ApprovalRecorded,
    ApprovalRejected,
    SessionReset,
    FeedbackSubmitted,
    ReviewCompleted,
}

impl AuditEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionCreated => "session_created",
            Self::ConfigUpdated => "config_updated",
            Self::ScanStarted => "scan_started",
            Self::CheckSettled => "check_settled",
            Self::ScanCompleted => "scan_completed",
            Self::ApprovalRecorded => "approval_recorded",
            Self::ApprovalRejected => "approval_rejected",
            Self::SessionReset => "session_reset",
            Self::FeedbackSubmitted => "feedback_submitted",
            Self::ReviewCompleted => "review_completed",
        }
    }
}

impl std::fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One link of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Monotonic, never reused even after trimming.
    pub sequence: u64,
    pub kind: AuditEventKind,
    /// Identifier of the session, approval or record concerned.
    pub subject: String,
    pub metadata: serde_json::Value,
    pub recorded_at: Timestamp,
    pub previous_digest: ContentDigest,
    pub digest: ContentDigest,
}

/// The hashed portion of an entry.
#[derive(Serialize)]
struct EntryBody<'a> {
    sequence: u64,
    kind: AuditEventKind,
    subject: &'a str,
    metadata: &'a serde_json::Value,
    recorded_at: Timestamp,
    previous_digest: &'a ContentDigest,
}

impl AuditEntry {
    fn body(&self) -> EntryBody<'_> {
        EntryBody {
            sequence: self.sequence,
            kind: self.kind,
            subject: &self.subject,
            metadata: &self.metadata,
            recorded_at: self.recorded_at,
            previous_digest: &self.previous_digest,
        }
    }

    /// Recompute the digest from content.
    pub fn compute_digest(&self) -> Option<ContentDigest> {
        match CanonicalBytes::new(&self.body()) {
            Ok(bytes) => Some(sha256_digest(&bytes)),
            Err(e) => {
                tracing::warn!(sequence = self.sequence, error = %e, "audit entry canonicalization failed");
                None
            }
        }
    }
}

/// Bounded, hash-chained audit log.
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
    max_entries: usize,
    next_sequence: u64,
    anchor: ContentDigest,
}

impl AuditTrail {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: max_entries.max(1),
            next_sequence: 0,
            anchor: ContentDigest::GENESIS,
        }
    }

    /// Append an entry linked to the current head.
    ///
    /// Metadata must canonicalize: floats are rejected.
    pub fn append(
        &mut self,
        kind: AuditEventKind,
        subject: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Result<&AuditEntry, GovernanceError> {
        let subject = subject.into();
        let recorded_at = Timestamp::now();
        let previous_digest = self.head();
        let body = EntryBody {
            sequence: self.next_sequence,
            kind,
            subject: &subject,
            metadata: &metadata,
            recorded_at,
            previous_digest: &previous_digest,
        };
        let digest = sha256_digest(&CanonicalBytes::new(&body)?);

        tracing::debug!(sequence = self.next_sequence, %kind, %subject, "audit entry appended");
        self.entries.push(AuditEntry {
            sequence: self.next_sequence,
            kind,
            subject,
            metadata,
            recorded_at,
            previous_digest,
            digest,
        });
        self.next_sequence += 1;
        self.trim();

        let last = self.entries.len() - 1;
        Ok(&self.entries[last])
    }

    fn trim(&mut self) {
        if self.entries.len() <= self.max_entries {
            return;
        }
        let trim_count = (self.max_entries / 10).max(1);
        if let Some(last_dropped) = self.entries.get(trim_count - 1) {
            self.anchor = last_dropped.digest;
        }
        self.entries.drain(..trim_count);
        tracing::debug!(trimmed = trim_count, retained = self.entries.len(), "audit trail trimmed");
    }

    /// Digest of the newest entry, or the anchor when empty.
    pub fn head(&self) -> ContentDigest {
        self.entries.last().map_or(self.anchor, |e| e.digest)
    }

    /// Recompute every digest and check every link.
    pub fn verify(&self) -> Result<(), AuditError> {
        let mut expected_previous = self.anchor;
        for entry in &self.entries {
            if entry.previous_digest != expected_previous {
                return Err(AuditError::BrokenLink {
                    sequence: entry.sequence,
                });
            }
            let recomputed = entry.compute_digest().ok_or(AuditError::Unhashable {
                sequence: entry.sequence,
            })?;
            if recomputed != entry.digest {
                return Err(AuditError::DigestMismatch {
                    sequence: entry.sequence,
                });
            }
            expected_previous = entry.digest;
        }
        Ok(())
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn entries_for(&self, subject: &str) -> Vec<&AuditEntry> {
        self.entries.iter().filter(|e| e.subject == subject).collect()
    }

    /// The last `n` entries, or all of them if fewer exist.
    pub fn last_n(&self, n: usize) -> &[AuditEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("entries", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .field("head", &self.head())
            .finish()
    }
}
