//! MDM-side connectors.

pub mod jamf;
pub mod mock;

pub use jamf::JamfConnector;
pub use mock::MockMdmClient;
