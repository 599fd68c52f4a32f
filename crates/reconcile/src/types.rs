//! Core types for configuration reconciliation

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Flavor of a Windows Information Protection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WipFlavor {
    /// Policy for MDM-enrolled devices
    Managed,
    /// Policy for devices without enrollment
    Unmanaged,
}

/// Kind of configuration object the engine knows how to import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    CompliancePolicy,
    DeviceConfiguration,
    ManagementScript,
    AutopilotDeploymentProfile,
    IosAppProtection,
    AndroidAppProtection,
    TargetedAppConfiguration,
    MobileAppConfiguration,
    WindowsInformationProtection(WipFlavor),
    ScopeTag,
}

impl EntityKind {
    /// Stable kebab-case identifier, used in reports and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Self::CompliancePolicy => "compliance-policy",
            Self::DeviceConfiguration => "device-configuration",
            Self::ManagementScript => "management-script",
            Self::AutopilotDeploymentProfile => "autopilot-profile",
            Self::IosAppProtection => "ios-app-protection",
            Self::AndroidAppProtection => "android-app-protection",
            Self::TargetedAppConfiguration => "targeted-app-configuration",
            Self::MobileAppConfiguration => "mobile-app-configuration",
            Self::WindowsInformationProtection(WipFlavor::Managed) => "wip-managed",
            Self::WindowsInformationProtection(WipFlavor::Unmanaged) => "wip-unmanaged",
            Self::ScopeTag => "scope-tag",
        }
    }

    /// All kinds, in classification order
    pub fn all() -> &'static [EntityKind] {
        &[
            Self::CompliancePolicy,
            Self::DeviceConfiguration,
            Self::ManagementScript,
            Self::AutopilotDeploymentProfile,
            Self::IosAppProtection,
            Self::AndroidAppProtection,
            Self::TargetedAppConfiguration,
            Self::MobileAppConfiguration,
            Self::WindowsInformationProtection(WipFlavor::Managed),
            Self::WindowsInformationProtection(WipFlavor::Unmanaged),
            Self::ScopeTag,
        ]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| format!("unknown configuration kind: '{}'", s))
    }
}

impl Serialize for EntityKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// How to resolve an incoming object against existing remote objects.
///
/// Fixed for the lifetime of one import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverwritePolicy {
    /// Skip objects whose id or name already exists
    #[default]
    Discard,
    /// Always create, never look at the remote inventory
    ImportAsDuplicate,
    /// Patch the remote object with the same id
    OverwriteById,
    /// Patch the remote object with the same display name
    OverwriteByName,
}

impl OverwritePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Discard => "discard",
            Self::ImportAsDuplicate => "import-as-duplicate",
            Self::OverwriteById => "overwrite-by-id",
            Self::OverwriteByName => "overwrite-by-name",
        }
    }

    /// Whether this policy needs the remote inventory to decide
    pub fn consults_inventory(&self) -> bool {
        !matches!(self, Self::ImportAsDuplicate)
    }

    /// Whether this policy may modify objects that already exist remotely
    pub fn overwrites(&self) -> bool {
        matches!(self, Self::OverwriteById | Self::OverwriteByName)
    }
}

impl fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for OverwritePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discard" => Ok(Self::Discard),
            "import-as-duplicate" => Ok(Self::ImportAsDuplicate),
            "overwrite-by-id" => Ok(Self::OverwriteById),
            "overwrite-by-name" => Ok(Self::OverwriteByName),
            other => Err(format!("unknown overwrite policy: '{}'", other)),
        }
    }
}

/// An object that already exists in the remote tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntitySummary {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_built_in: Option<bool>,
}

impl RemoteEntitySummary {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            is_built_in: None,
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Why an incoming object was not written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// A remote object's id contains the incoming id
    IdExists,
    /// A remote object's name contains the incoming name
    NameExists,
    /// A scope tag with the same name exists
    ScopeTagNameExists,
    /// Built-in scope tags (and tags not flagged as custom) are never recreated
    BuiltInScopeTag,
}

impl SkipReason {
    /// Human-readable message sent to the notification sink
    pub fn message(&self, display_name: &str, id: &str) -> String {
        match self {
            Self::IdExists => {
                format!("Discarding configuration '{}' ({}) already exists!", display_name, id)
            }
            Self::NameExists => format!(
                "Discarding configuration '{}' - configuration with this name already exists!",
                display_name
            ),
            Self::ScopeTagNameExists => format!(
                "Discarding configuration '{}' - scope tag with this name already exists!",
                display_name
            ),
            Self::BuiltInScopeTag => format!(
                "Skipping scope tag '{}' - built-in scope tags are not recreated",
                display_name
            ),
        }
    }
}

/// What to do with one incoming object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "target", rename_all = "kebab-case")]
pub enum ImportDecision {
    /// Create a new remote object
    Create,
    /// Patch the remote object addressed by the incoming id
    PatchById(String),
    /// Patch the remote object with the same name, under its remote id
    PatchByName(String),
    /// Leave the remote tenant untouched
    Skip(SkipReason),
}

impl ImportDecision {
    /// Check if the decision results in a remote write
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Skip(_))
    }

    /// Check if the decision patches an existing object
    pub fn is_patch(&self) -> bool {
        matches!(self, Self::PatchById(_) | Self::PatchByName(_))
    }
}

/// Result of reconciling one payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub kind: EntityKind,
    pub display_name: Option<String>,
    /// Id carried by the incoming payload
    pub source_id: Option<String>,
    pub decision: ImportDecision,
    /// Id assigned by the remote tenant when an object was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_id: Option<String>,
}

impl ImportOutcome {
    /// Short label for display, falling back to the id
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.source_id.as_deref())
            .unwrap_or("<unnamed>")
    }
}

/// Summary of an import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub patched: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ImportSummary {
    /// Total number of remote writes
    pub fn total_changes(&self) -> usize {
        self.created + self.patched
    }

    /// Check if no payload failed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of payloads processed
    pub fn total(&self) -> usize {
        self.created + self.patched + self.skipped + self.failed
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ImportSummary) {
        self.created += other.created;
        self.patched += other.patched;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    /// Count a successful outcome
    pub fn add_outcome(&mut self, outcome: &ImportOutcome) {
        match outcome.decision {
            ImportDecision::Create => self.created += 1,
            ImportDecision::PatchById(_) | ImportDecision::PatchByName(_) => self.patched += 1,
            ImportDecision::Skip(_) => self.skipped += 1,
        }
    }

    /// Count a failed payload
    pub fn add_failure(&mut self) {
        self.failed += 1;
    }
}
