//! Field mapping from inventory assets to MDM device records.
//!
//! The mapper is a pure, total function over its inputs: the asset, the
//! status-label snapshot taken at run start, and the MDM user profile the
//! orchestrator resolved (or failed to resolve) for the assignee. Same
//! inputs always produce the same record.

use ar_connectors::traits::{
    Assignee, DevicePayload, DeviceRecord, ExtensionAttributes, GeneralSection, InventoryAsset,
    LocationSection, MdmUserProfile, PurchasingSection, StatusLabel, StatusLabelMap,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Category name selecting the mobile-device record shape (case-sensitive).
const MOBILE_DEVICE_CATEGORY: &str = "Tablet";

/// The usage value assigned to devices in a pre-deployment state.
const ON_HOLD_USAGE: &str = "On Hold";

/// Identity written into a record's location when a device is checked out to
/// something other than a person (a room, another asset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackIdentity {
    pub username: String,
    pub realname: String,
    pub email_address: String,
    pub phone: Option<String>,
}

/// Site-specific mapping knobs: the email domain, the fallback identities,
/// and the status labels that count as on-hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingProfile {
    /// Domain appended to assignee usernames to form the record email.
    #[serde(default = "default_email_domain")]
    pub email_domain: String,
    /// Identity representing the owning support team, used for non-user
    /// assignments.
    #[serde(default = "default_shared_team")]
    pub shared_team: FallbackIdentity,
    /// Status labels whose assets are classified as "On Hold".
    #[serde(default = "default_on_hold_labels")]
    pub on_hold_labels: Vec<String>,
    /// Custom field carrying the building name.
    #[serde(default = "default_building_field")]
    pub building_field: String,
    /// Custom field carrying the room. The source schema spells this key
    /// with a trailing space; lookups here use the trimmed name.
    #[serde(default = "default_room_field")]
    pub room_field: String,
}

fn default_email_domain() -> String {
    "example.edu".to_string()
}

fn default_shared_team() -> FallbackIdentity {
    FallbackIdentity {
        username: "supportdesk".to_string(),
        realname: "IT Support".to_string(),
        email_address: "supportdesk@example.edu".to_string(),
        phone: None,
    }
}

fn default_on_hold_labels() -> Vec<String> {
    vec![
        "ready to deploy".to_string(),
        "received".to_string(),
        "30 day hold".to_string(),
    ]
}

fn default_building_field() -> String {
    "Building".to_string()
}

fn default_room_field() -> String {
    "Room".to_string()
}

impl Default for MappingProfile {
    fn default() -> Self {
        Self {
            email_domain: default_email_domain(),
            shared_team: default_shared_team(),
            on_hold_labels: default_on_hold_labels(),
            building_field: default_building_field(),
            room_field: default_room_field(),
        }
    }
}

/// Maps one inventory asset to one MDM device record.
pub struct FieldMapper {
    labels: StatusLabelMap,
    on_hold_ids: HashSet<i64>,
    profile: MappingProfile,
    digits: Regex,
}

impl FieldMapper {
    /// Builds a mapper over an immutable status-label snapshot.
    ///
    /// On-hold labels named in the profile but absent from the snapshot are
    /// skipped with a warning; their assets then classify by status name
    /// like any other.
    pub fn new(labels: StatusLabelMap, profile: MappingProfile) -> Self {
        let on_hold_ids = profile
            .on_hold_labels
            .iter()
            .filter_map(|name| {
                let id = labels.id_of(name);
                if id.is_none() {
                    warn!(label = %name, "configured on-hold label is not in the status snapshot");
                }
                id
            })
            .collect();

        Self {
            labels,
            on_hold_ids,
            profile,
            digits: Regex::new(r"\d+").expect("Invalid asset tag pattern"),
        }
    }

    /// Transforms an asset into the record shape the MDM expects.
    ///
    /// `user` is the MDM profile the caller resolved for the assignee;
    /// `None` both when the asset is not checked out to a person and when
    /// the lookup missed (the synthesized fallback applies then).
    pub fn map_one(&self, asset: &InventoryAsset, user: Option<&MdmUserProfile>) -> DeviceRecord {
        debug!(name = %asset.name, serial = %asset.serial, "mapping asset");

        let general = GeneralSection {
            name: asset.name.clone(),
            asset_tag: asset
                .asset_tag
                .clone()
                .or_else(|| self.extract_asset_tag(&asset.name)),
        };

        let purchasing = PurchasingSection {
            po_number: asset.order_number.as_ref().map(|n| n.trim().to_string()),
            po_date: asset
                .purchase_date
                .as_ref()
                .and_then(|d| d.formatted.clone()),
            purchase_price: asset.purchase_cost.clone(),
            warranty_expires: asset
                .warranty_expires
                .as_ref()
                .and_then(|d| d.formatted.clone()),
            vendor: asset.supplier.as_ref().map(|s| s.name.clone()),
        };

        let mut location = self.resolve_location(asset, user);

        if !asset.custom_fields.is_empty() {
            location.building = asset
                .custom_fields
                .get(&self.profile.building_field)
                .cloned()
                .flatten();
            location.room = asset
                .custom_fields
                .get(&self.profile.room_field)
                .cloned()
                .flatten();
        }

        if let Some(company) = &asset.company {
            location.department = Some(company.name.clone());
        }

        let extension_attributes = self
            .classify_usage(&asset.status_label)
            .map(ExtensionAttributes::usage);

        let payload = DevicePayload {
            general,
            purchasing,
            location,
            extension_attributes,
        };

        if asset.category.name == MOBILE_DEVICE_CATEGORY {
            DeviceRecord::MobileDevice(payload)
        } else {
            DeviceRecord::Computer(payload)
        }
    }

    /// Pulls an asset tag out of a device name, e.g. "HIDA-4121212" →
    /// "4121212". Returns the first run of digits, or nothing.
    fn extract_asset_tag(&self, name: &str) -> Option<String> {
        self.digits.find(name).map(|m| m.as_str().to_string())
    }

    /// Builds the location section for an asset's assignment.
    fn resolve_location(
        &self,
        asset: &InventoryAsset,
        user: Option<&MdmUserProfile>,
    ) -> LocationSection {
        match &asset.assigned_to {
            None => LocationSection::default(),

            Some(Assignee::User { username, name }) => {
                // The record email is always synthesized from the inventory
                // username, even when the MDM profile carries its own.
                let email_address = Some(format!("{}@{}", username, self.profile.email_domain));
                match user {
                    Some(profile) => LocationSection {
                        username: Some(profile.username.clone()),
                        realname: profile.full_name.clone(),
                        real_name: profile.full_name.clone(),
                        email_address,
                        position: profile.position.clone(),
                        phone: profile.phone.clone(),
                        phone_number: profile.phone.clone(),
                        ..LocationSection::default()
                    },
                    // Lookup missed; synthesize from the assignment data.
                    None => LocationSection {
                        username: Some(username.clone()),
                        realname: Some(name.clone()),
                        real_name: Some(name.clone()),
                        email_address,
                        ..LocationSection::default()
                    },
                }
            }

            // Checked out to a location or another asset: the owning support
            // team is the contact.
            Some(Assignee::Location { .. }) | Some(Assignee::Asset { .. }) => {
                let team = &self.profile.shared_team;
                LocationSection {
                    username: Some(team.username.clone()),
                    realname: Some(team.realname.clone()),
                    real_name: Some(team.realname.clone()),
                    email_address: Some(team.email_address.clone()),
                    phone: team.phone.clone(),
                    phone_number: team.phone.clone(),
                    ..LocationSection::default()
                }
            }
        }
    }

    /// Derives the "Usage" classification for a status label.
    ///
    /// Pending/received/on-hold states collapse to "On Hold"; any other
    /// label known to the snapshot passes through verbatim; unknown labels
    /// produce nothing.
    fn classify_usage(&self, status: &StatusLabel) -> Option<String> {
        if self.on_hold_ids.contains(&status.id) {
            Some(ON_HOLD_USAGE.to_string())
        } else if self.labels.contains_name(&status.name) {
            Some(status.name.clone())
        } else {
            debug!(status = %status.name, "couldn't match usage information");
            None
        }
    }
}
