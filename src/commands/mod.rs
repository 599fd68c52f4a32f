pub mod classify;
pub mod config;
pub mod import;
pub mod inventory;
pub mod kinds;

use crate::config::AppConfig;
use anyhow::{Context, Result};
use graphkit::GraphClient;

/// Build a Graph client from the effective configuration
pub(crate) fn connect(config: &AppConfig) -> Result<GraphClient> {
    let token = config.token()?;
    let client = GraphClient::new(&config.graph_config(), token)
        .context("Failed to create Graph client")?
        .with_retry(config.retry_config());
    log::debug!("Using Graph API at {}", client.base_url());
    Ok(client)
}

/// Print advice for a failure, when the remote error carries a category
pub(crate) fn remote_advice(err: &reconcile::Error) -> Option<&'static str> {
    match err {
        reconcile::Error::Remote(inner) => inner
            .downcast_ref::<graphkit::Error>()
            .map(|e| e.category().advice()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;

    #[test]
    fn test_remote_advice_from_graph_error() {
        let graph_err = graphkit::Error::from_response(401, "", None);
        let wrapped: anyhow::Result<()> = Err(graph_err).context("Failed to list existing Scope tag objects");
        let err = reconcile::Error::from(wrapped.unwrap_err());

        assert_eq!(
            remote_advice(&err),
            Some(graphkit::ErrorCategory::Auth.advice())
        );
    }

    #[test]
    fn test_no_advice_for_classification_errors() {
        let err = reconcile::Error::MissingDiscriminator;
        assert!(remote_advice(&err).is_none());
    }
}
