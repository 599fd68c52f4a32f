//! Kind registry
//!
//! One row per [`EntityKind`], in classification order. Each row says how to
//! recognise the kind, where its objects live remotely, and how an incoming
//! document is turned into a write body.
//!
//! Two resend strategies exist side by side:
//!
//! - [`Resend::Typed`]: the document is read into a [`TypedEntity`], run
//!   through the kind's hooks, and serialized again. Null properties and
//!   OData annotations other than `@odata.type` do not survive the trip.
//! - [`Resend::Raw`]: the document goes out exactly as exported. The only
//!   edit ever made is replacing `id` when patching by name.

use crate::error::Result;
use crate::payload::{ConfigurationPayload, ODATA_TYPE};
use crate::types::{EntityKind, WipFlavor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// How a kind is recognised from a discriminator
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// Discriminator contains the string
    Contains(&'static str),
    /// Discriminator equals one of the strings
    OneOf(&'static [&'static str]),
}

impl Matcher {
    pub fn matches(&self, discriminator: &str) -> bool {
        match self {
            Self::Contains(needle) => discriminator.contains(needle),
            Self::OneOf(list) => list.iter().any(|t| *t == discriminator),
        }
    }
}

/// Hook applied to a typed entity before a write
pub type EntityHook = fn(&mut TypedEntity);

/// How an incoming document is resent
#[derive(Debug, Clone, Copy)]
pub enum Resend {
    /// Deserialize, adjust, re-serialize
    Typed {
        /// Applied before any write
        sanitize: EntityHook,
        /// Applied before a create
        prepare_create: EntityHook,
        /// Applied before a patch (fields the remote rejects on update)
        prepare_update: EntityHook,
    },
    /// Send the exported document unmodified
    Raw,
}

impl Resend {
    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw)
    }
}

/// Registry row for one kind
#[derive(Debug, Clone, Copy)]
pub struct KindSpec {
    pub kind: EntityKind,
    /// Human-readable name
    pub label: &'static str,
    /// Remote collection path, relative to the API root
    pub resource: &'static str,
    pub matcher: Matcher,
    pub resend: Resend,
}

/// Device configuration types, per platform.
///
/// Listed explicitly so device configurations are never mistaken for the
/// broader substring rules further down the registry.
pub const DEVICE_CONFIGURATION_TYPES: &[&str] = &[
    // Windows 10
    "#microsoft.graph.windows10GeneralConfiguration",
    "#microsoft.graph.windowsDeliveryOptimizationConfiguration",
    "#microsoft.graph.windowsUpdateForBusinessConfiguration",
    "#microsoft.graph.windows10EndpointProtectionConfiguration",
    "#microsoft.graph.windows10CustomConfiguration",
    "#microsoft.graph.windowsKioskConfiguration",
    "#microsoft.graph.windowsDefenderAdvancedThreatProtectionConfiguration",
    "#microsoft.graph.windows10PkcsCertificateProfile",
    "#microsoft.graph.windowsHealthMonitoringConfiguration",
    "#microsoft.graph.windows10TeamGeneralConfiguration",
    "#microsoft.graph.windowsDomainJoinConfiguration",
    "#microsoft.graph.editionUpgradeConfiguration",
    "#microsoft.graph.windows10EasEmailProfileConfiguration",
    "#microsoft.graph.windowsIdentityProtectionConfiguration",
    "#microsoft.graph.windows10NetworkBoundaryConfiguration",
    "#microsoft.graph.sharedPCConfiguration",
    "#microsoft.graph.windowsWifiConfiguration",
    // Android Enterprise Device Owner
    "#microsoft.graph.androidDeviceOwnerGeneralDeviceConfiguration",
    "#microsoft.graph.androidDeviceOwnerEnterpriseWiFiConfiguration",
    "#microsoft.graph.androidDeviceOwnerWiFiConfiguration",
    "#microsoft.graph.androidDeviceOwnerTrustedRootCertificate",
    "#microsoft.graph.androidDeviceOwnerImportedPFXCertificateProfile",
    // Android Enterprise Work Profile
    "#microsoft.graph.androidWorkProfileGeneralDeviceConfiguration",
    "#microsoft.graph.androidWorkProfileCustomConfiguration",
    "#microsoft.graph.androidWorkProfileNineWorkEasConfiguration",
    "#microsoft.graph.androidWorkProfileTrustedRootCertificate",
    // iOS
    "#microsoft.graph.iosTrustedRootCertificate",
    "#microsoft.graph.iosPkcsCertificateProfile",
    "#microsoft.graph.iosWiFiConfiguration",
    "#microsoft.graph.iosCustomConfiguration",
    "#microsoft.graph.iosGeneralDeviceConfiguration",
    "#microsoft.graph.iosEasEmailProfileConfiguration",
    "#microsoft.graph.iosDeviceFeaturesConfiguration",
    "#microsoft.graph.iosEnterpriseWiFiConfiguration",
    // macOS
    "#microsoft.graph.macOSWiFiConfiguration",
    "#microsoft.graph.macOSEndpointProtectionConfiguration",
    "#microsoft.graph.macOSGeneralDeviceConfiguration",
    "#microsoft.graph.macOSDeviceFeaturesConfiguration",
];

const fn typed(sanitize: EntityHook, prepare_update: EntityHook) -> Resend {
    Resend::Typed {
        sanitize,
        prepare_create: no_op,
        prepare_update,
    }
}

/// The registry, in classification order. First match wins.
pub static REGISTRY: &[KindSpec] = &[
    KindSpec {
        kind: EntityKind::CompliancePolicy,
        label: "Compliance policy",
        resource: "deviceManagement/deviceCompliancePolicies",
        matcher: Matcher::Contains("CompliancePolicy"),
        resend: typed(inject_default_rule_actions, clear_rule_actions),
    },
    KindSpec {
        kind: EntityKind::DeviceConfiguration,
        label: "Device configuration",
        resource: "deviceManagement/deviceConfigurations",
        matcher: Matcher::OneOf(DEVICE_CONFIGURATION_TYPES),
        resend: typed(strip_scope_tag_fields, no_op),
    },
    KindSpec {
        kind: EntityKind::ManagementScript,
        label: "Device management script",
        resource: "deviceManagement/deviceManagementScripts",
        matcher: Matcher::Contains("deviceManagementScripts"),
        resend: typed(no_op, no_op),
    },
    KindSpec {
        kind: EntityKind::AutopilotDeploymentProfile,
        label: "Autopilot deployment profile",
        resource: "deviceManagement/windowsAutopilotDeploymentProfiles",
        matcher: Matcher::Contains("WindowsAutopilotDeploymentProfile"),
        resend: typed(no_op, no_op),
    },
    KindSpec {
        kind: EntityKind::IosAppProtection,
        label: "iOS app protection policy",
        resource: "deviceAppManagement/iosManagedAppProtections",
        matcher: Matcher::Contains("iosManagedAppProtection"),
        resend: Resend::Raw,
    },
    KindSpec {
        kind: EntityKind::AndroidAppProtection,
        label: "Android app protection policy",
        resource: "deviceAppManagement/androidManagedAppProtections",
        matcher: Matcher::Contains("androidManagedAppProtection"),
        resend: Resend::Raw,
    },
    KindSpec {
        kind: EntityKind::TargetedAppConfiguration,
        label: "Targeted app configuration",
        resource: "deviceAppManagement/targetedManagedAppConfigurations",
        matcher: Matcher::Contains("targetedManagedAppConfiguration"),
        resend: Resend::Raw,
    },
    KindSpec {
        kind: EntityKind::MobileAppConfiguration,
        label: "Mobile app configuration",
        resource: "deviceAppManagement/mobileAppConfigurations",
        matcher: Matcher::Contains("MobileAppConfiguration"),
        resend: typed(no_op, no_op),
    },
    // Must precede the unmanaged rule below.
    KindSpec {
        kind: EntityKind::WindowsInformationProtection(WipFlavor::Managed),
        label: "Windows Information Protection policy (MDM)",
        resource: "deviceAppManagement/mdmWindowsInformationProtectionPolicies",
        matcher: Matcher::Contains("mdmWindowsInformationProtectionPolicy"),
        resend: typed(no_op, no_op),
    },
    KindSpec {
        kind: EntityKind::WindowsInformationProtection(WipFlavor::Unmanaged),
        label: "Windows Information Protection policy",
        resource: "deviceAppManagement/windowsInformationProtectionPolicies",
        matcher: Matcher::Contains("windowsInformationProtectionPolicy"),
        resend: typed(no_op, no_op),
    },
    KindSpec {
        kind: EntityKind::ScopeTag,
        label: "Scope tag",
        resource: "deviceManagement/roleScopeTags",
        matcher: Matcher::Contains("roleScopeTag"),
        resend: Resend::Typed {
            sanitize: no_op,
            prepare_create: clear_scope_tag_identity,
            prepare_update: no_op,
        },
    },
];

impl EntityKind {
    /// Registry row for this kind
    pub fn spec(&self) -> &'static KindSpec {
        &REGISTRY[self.index()]
    }

    /// Position of this kind in the registry
    pub(crate) const fn index(self) -> usize {
        match self {
            Self::CompliancePolicy => 0,
            Self::DeviceConfiguration => 1,
            Self::ManagementScript => 2,
            Self::AutopilotDeploymentProfile => 3,
            Self::IosAppProtection => 4,
            Self::AndroidAppProtection => 5,
            Self::TargetedAppConfiguration => 6,
            Self::MobileAppConfiguration => 7,
            Self::WindowsInformationProtection(WipFlavor::Managed) => 8,
            Self::WindowsInformationProtection(WipFlavor::Unmanaged) => 9,
            Self::ScopeTag => 10,
        }
    }

    /// Remote collection path for this kind
    pub fn resource(&self) -> &'static str {
        self.spec().resource
    }

    pub fn label(&self) -> &'static str {
        self.spec().label
    }
}

// ============================================================================
// Typed entity model
// ============================================================================

/// Typed view of a configuration object.
///
/// Only the properties the hooks touch are modelled; everything else rides
/// along in `properties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedEntity {
    #[serde(rename = "@odata.type", default, skip_serializing_if = "Option::is_none")]
    pub odata_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_scope_tags: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_scope_tag_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_actions_for_rule: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_built_in: Option<bool>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl TypedEntity {
    /// Read an exported document into the typed model
    pub fn from_payload(payload: &ConfigurationPayload) -> Result<Self> {
        let document: Map<String, Value> = payload
            .document()
            .iter()
            .filter(|(key, value)| !value.is_null() && !is_foreign_annotation(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(serde_json::from_value(Value::Object(document))?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// OData annotations are read-only; `@odata.type` is the one the remote
/// needs to pick the concrete type on write.
fn is_foreign_annotation(key: &str) -> bool {
    key.starts_with('@') && key != ODATA_TYPE
}

// ============================================================================
// Hooks
// ============================================================================

fn no_op(_entity: &mut TypedEntity) {}

/// Compliance policies must carry at least one rule action on create
fn inject_default_rule_actions(entity: &mut TypedEntity) {
    if entity.scheduled_actions_for_rule.is_none() {
        entity.scheduled_actions_for_rule = Some(default_rule_actions());
    }
}

/// Rule actions are rejected on update
fn clear_rule_actions(entity: &mut TypedEntity) {
    entity.scheduled_actions_for_rule = None;
}

/// Writes fail when these are set
fn strip_scope_tag_fields(entity: &mut TypedEntity) {
    entity.supports_scope_tags = None;
    entity.role_scope_tag_ids = None;
}

/// New tags get their id from the remote
fn clear_scope_tag_identity(entity: &mut TypedEntity) {
    entity.id = None;
    entity.is_built_in = None;
}

/// Rule block added to compliance policies exported without one
pub fn default_rule_actions() -> Value {
    json!([{
        "ruleName": "PasswordRequired",
        "scheduledActionConfigurations": [{
            "actionType": "block",
            "gracePeriodHours": 0,
            "notificationTemplateId": "",
            "notificationMessageCCList": []
        }]
    }])
}
