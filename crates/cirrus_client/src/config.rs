//! Configuration for the Cirrus client.

/// Configuration for a [`Client`](crate::Client).
///
/// Identifies the store scope every unit of work created by the client
/// operates against.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Project all keys and transactions are scoped to.
    pub project: String,
    /// Default namespace for new keys, if any.
    pub namespace: Option<String>,
}

impl ClientConfig {
    /// Creates a configuration for the given project.
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            namespace: None,
        }
    }

    /// Sets the default namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = ClientConfig::new("proj").with_namespace("tenant-a");
        assert_eq!(config.project, "proj");
        assert_eq!(config.namespace.as_deref(), Some("tenant-a"));
    }

    #[test]
    fn namespace_defaults_to_none() {
        let config = ClientConfig::new("proj");
        assert_eq!(config.namespace, None);
    }
}
