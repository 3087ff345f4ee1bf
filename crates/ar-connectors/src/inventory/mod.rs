//! Inventory-side connectors.

pub mod mock;
pub mod snipeit;

pub use mock::MockInventoryClient;
pub use snipeit::{SnipeItConfig, SnipeItConnector};
