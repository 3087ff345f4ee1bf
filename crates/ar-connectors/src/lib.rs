//! # ar-connectors
//!
//! API connectors for Asset Relay: the inventory system of record and the
//! MDM receiving updates.
//!
//! This crate provides the client trait definitions the sync pipeline is
//! written against, the concrete connectors, and in-memory mocks for tests.

pub mod http;
pub mod inventory;
pub mod mdm;
pub mod secure_string;
pub mod testing;
pub mod traits;

pub use secure_string::SecureString;

// Re-export traits and shared record types
pub use traits::{
    Assignee,
    AuthConfig,
    Connector,
    ConnectorConfig,
    ConnectorError,
    ConnectorHealth,
    ConnectorResult,
    DevicePayload,
    DeviceRecord,
    ExtensionAttribute,
    ExtensionAttributes,
    FormattedDate,
    GeneralSection,
    InventoryAsset,
    // Inventory side
    InventoryClient,
    LocationSection,
    // MDM side
    MdmClient,
    MdmUserProfile,
    NamedRef,
    PurchasingSection,
    StatusLabel,
    StatusLabelMap,
};

// Re-export connector implementations
pub use inventory::{MockInventoryClient, SnipeItConfig, SnipeItConnector};
pub use mdm::{JamfConnector, MockMdmClient};
