//! Per-run MDM user resolution with a lookup cache.
//!
//! Many assets in a batch are typically checked out to the same few people;
//! the cache keeps one MDM round-trip per username per run. A lookup miss is
//! a legitimate outcome (the mapper then synthesizes a location from the
//! inventory's own assignment data), so resolution never fails: it yields a
//! profile or nothing.

use ar_connectors::traits::{ConnectorError, MdmClient, MdmUserProfile};
use moka::future::Cache;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct UserResolver {
    mdm: Arc<dyn MdmClient>,
    cache: Cache<String, Option<MdmUserProfile>>,
}

impl UserResolver {
    pub fn new(mdm: Arc<dyn MdmClient>) -> Self {
        Self {
            mdm,
            cache: Cache::new(1024),
        }
    }

    /// Resolves a username to its MDM profile, or `None` when the MDM does
    /// not know the user or the lookup fails. Results (including misses) are
    /// cached for the resolver's lifetime, which is one run.
    pub async fn resolve(&self, username: &str) -> Option<MdmUserProfile> {
        let mdm = Arc::clone(&self.mdm);
        let key = username.to_string();
        self.cache
            .get_with(key.clone(), async move {
                match mdm.user_by_username(&key).await {
                    Ok(profile) => Some(profile),
                    Err(ConnectorError::NotFound(_)) => {
                        debug!(username = %key, "user not in MDM; will synthesize location");
                        None
                    }
                    Err(e) => {
                        warn!(username = %key, error = %e, "user lookup failed; will synthesize location");
                        None
                    }
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ar_connectors::mdm::MockMdmClient;

    #[tokio::test]
    async fn test_resolves_known_user() {
        let mdm = Arc::new(MockMdmClient::with_sample_users("mdm"));
        let resolver = UserResolver::new(mdm);

        let profile = resolver.resolve("jdoe").await.unwrap();
        assert_eq!(profile.username, "jdoe");
        assert_eq!(profile.full_name.as_deref(), Some("John Doe"));
    }

    #[tokio::test]
    async fn test_unknown_user_resolves_to_none() {
        let mdm = Arc::new(MockMdmClient::new("mdm"));
        let resolver = UserResolver::new(mdm);
        assert!(resolver.resolve("ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_lookup_miss_is_cached() {
        let mdm = Arc::new(MockMdmClient::new("mdm"));
        let resolver = UserResolver::new(Arc::clone(&mdm) as Arc<dyn MdmClient>);

        assert!(resolver.resolve("jdoe").await.is_none());

        // The user appearing mid-run is not observed: the run keeps the
        // snapshot it started with.
        mdm.add_user(MdmUserProfile {
            username: "jdoe".into(),
            full_name: None,
            email: None,
            phone: None,
            position: None,
        })
        .await;
        assert!(resolver.resolve("jdoe").await.is_none());
    }
}
