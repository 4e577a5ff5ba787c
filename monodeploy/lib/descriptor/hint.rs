use std::{
    fmt::{self, Display},
    sync::Mutex,
};

use getset::Getters;
use serde::{Deserialize, Serialize};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A problem found while discovering descriptors.
///
/// Hints never abort discovery. They are attached to the offending descriptor and handed to a
/// [`HintSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[getset(get = "pub with_prefix")]
pub struct ValidationHint {
    /// What kind of problem was found.
    kind: HintKind,

    /// How severe the problem is.
    severity: HintSeverity,

    /// The kind of descriptor the hint is attached to.
    subject_kind: DescriptorKind,

    /// The name of the descriptor the hint is attached to.
    subject: String,

    /// A human-readable description.
    message: String,
}

/// The kinds of problem discovery can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintKind {
    /// A required declaration is missing.
    MissingDeclaration,

    /// Two descriptors of the same kind share a name.
    DuplicateName,

    /// An endpoint cannot be exposed with its declared signature.
    UnsupportedEndpointSignature,
}

/// How severe a hint is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintSeverity {
    /// The descriptor is still deployable.
    Warning,

    /// The descriptor must not be deployed.
    Error,
}

/// The kinds of descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    /// A [`ServiceDescriptor`](super::ServiceDescriptor).
    Service,

    /// A [`StorageDescriptor`](super::StorageDescriptor).
    Storage,
}

/// Receives validation hints as they are collected.
pub trait HintSink: Send + Sync {
    /// Reports a single hint.
    fn report(&self, hint: &ValidationHint);
}

/// A [`HintSink`] that logs every hint through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHintSink;

/// A [`HintSink`] that keeps every hint it receives.
#[derive(Debug, Default)]
pub struct CollectingHintSink {
    hints: Mutex<Vec<ValidationHint>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ValidationHint {
    /// Creates a new hint.
    pub fn new(
        kind: HintKind,
        severity: HintSeverity,
        subject_kind: DescriptorKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            subject_kind,
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if the hint is an error.
    pub fn is_error(&self) -> bool {
        self.severity == HintSeverity::Error
    }
}

impl CollectingHintSink {
    /// Returns the hints received so far.
    pub fn hints(&self) -> Vec<ValidationHint> {
        self.hints
            .lock()
            .map(|hints| hints.clone())
            .unwrap_or_default()
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl HintSink for TracingHintSink {
    fn report(&self, hint: &ValidationHint) {
        match hint.severity {
            HintSeverity::Error => tracing::error!(
                kind = ?hint.kind,
                subject = %hint.subject,
                "{}",
                hint.message
            ),
            HintSeverity::Warning => tracing::warn!(
                kind = ?hint.kind,
                subject = %hint.subject,
                "{}",
                hint.message
            ),
        }
    }
}

impl HintSink for CollectingHintSink {
    fn report(&self, hint: &ValidationHint) {
        if let Ok(mut hints) = self.hints.lock() {
            hints.push(hint.clone());
        }
    }
}

impl Display for ValidationHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            HintSeverity::Error => "error",
            HintSeverity::Warning => "warning",
        };
        let kind = match self.subject_kind {
            DescriptorKind::Service => "service",
            DescriptorKind::Storage => "storage",
        };
        write!(f, "{severity}: {kind} '{}': {}", self.subject, self.message)
    }
}
