//! Network custom resource
//!
//! `Network` is the resource this controller owns. The spec is opaque to the
//! reconciliation core; the status carries the Available / Progressing /
//! Degraded conditions.

use chrono::{DateTime, Utc};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ObjectKey;
use super::conditions::{
    Condition, ConditionStatus, ConditionType, INITIALIZING_MESSAGE, reason, set_condition,
};

/// API group of the Network resource
pub const NETWORK_GROUP: &str = "network.tbnco.github.io";

/// API version of the Network resource
pub const NETWORK_VERSION: &str = "v1alpha1";

/// Desired state of a Network
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "network.tbnco.github.io",
    version = "v1alpha1",
    kind = "Network",
    plural = "networks",
    shortname = "net",
    namespaced,
    status = "NetworkStatus",
    printcolumn = r#"{"name":"Available","type":"string","jsonPath":".status.conditions[?(@.type==\"Available\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
pub struct NetworkSpec {}

/// Observed state of a Network
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl NetworkStatus {
    /// Give every known condition type a defined initial value.
    ///
    /// Conditions already present are left alone, so this is safe to apply on
    /// every reconcile.
    pub fn with_condition_defaults(mut self, now: DateTime<Utc>) -> Self {
        for type_ in ConditionType::all() {
            if self.condition(*type_).is_some() {
                continue;
            }
            let status = match type_ {
                ConditionType::Progressing => ConditionStatus::True,
                ConditionType::Available | ConditionType::Degraded => ConditionStatus::False,
            };
            set_condition(
                &mut self.conditions,
                Condition::new(
                    *type_,
                    status,
                    reason::INITIALIZING,
                    INITIALIZING_MESSAGE,
                    now,
                ),
            );
        }
        self
    }

    /// Mark the network fully usable: Available=True, Progressing and
    /// Degraded False.
    pub fn with_available(mut self, now: DateTime<Utc>) -> Self {
        set_condition(
            &mut self.conditions,
            Condition::new(
                ConditionType::Available,
                ConditionStatus::True,
                reason::NETWORK_AVAILABLE,
                "Network configured and ready to use",
                now,
            ),
        );
        set_condition(
            &mut self.conditions,
            Condition::new(
                ConditionType::Progressing,
                ConditionStatus::False,
                reason::NETWORK_AVAILABLE,
                "",
                now,
            ),
        );
        set_condition(
            &mut self.conditions,
            Condition::new(
                ConditionType::Degraded,
                ConditionStatus::False,
                reason::NETWORK_AVAILABLE,
                "",
                now,
            ),
        );
        self
    }

    /// Set Progressing=True. Other conditions are not touched.
    pub fn with_progressing(mut self, reason: &str, message: &str, now: DateTime<Utc>) -> Self {
        set_condition(
            &mut self.conditions,
            Condition::new(
                ConditionType::Progressing,
                ConditionStatus::True,
                reason,
                message,
                now,
            ),
        );
        self
    }

    /// Set Degraded=True. Other conditions are not touched.
    pub fn with_degraded(mut self, reason: &str, message: &str, now: DateTime<Utc>) -> Self {
        set_condition(
            &mut self.conditions,
            Condition::new(
                ConditionType::Degraded,
                ConditionStatus::True,
                reason,
                message,
                now,
            ),
        );
        self
    }

    pub fn condition(&self, type_: ConditionType) -> Option<&Condition> {
        super::conditions::find_condition(&self.conditions, type_)
    }

    pub fn is_condition_true(&self, type_: ConditionType) -> bool {
        self.condition(type_)
            .is_some_and(|c| c.status == ConditionStatus::True)
    }
}

impl Network {
    /// Namespace/name identity of this object
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace().unwrap_or_default(), self.name_any())
    }

    /// True once deletion has been requested
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Current status, or an empty one if none was ever written
    pub fn status_or_default(&self) -> NetworkStatus {
        self.status.clone().unwrap_or_default()
    }
}
