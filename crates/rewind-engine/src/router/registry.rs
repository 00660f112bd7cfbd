//! Upload host registry
//!
//! Built once at startup and shared read-only afterwards.

use std::collections::HashSet;
use std::sync::Arc;

use rewind_core::{HostCapability, HostedId};
use rewind_hosts::UploadHost;

#[derive(Clone)]
pub struct RegisteredHost {
    pub capability: HostCapability,
    pub client: Arc<dyn UploadHost>,
}

pub struct HostRegistry {
    hosts: Vec<RegisteredHost>,
    disabled: HashSet<String>,
}

impl HostRegistry {
    /// Empty registry. Hosts named in `disabled` are never selected.
    pub fn new(disabled: impl IntoIterator<Item = String>) -> Self {
        Self {
            hosts: Vec::new(),
            disabled: disabled.into_iter().map(|h| h.to_lowercase()).collect(),
        }
    }

    pub fn with_host(self, client: Arc<dyn UploadHost>) -> Self {
        let capability = client.capability();
        self.with_host_capability(client, capability)
    }

    /// Register `client` under an explicit capability instead of the one it reports.
    pub fn with_host_capability(
        mut self,
        client: Arc<dyn UploadHost>,
        capability: HostCapability,
    ) -> Self {
        tracing::debug!(
            host = %capability.name,
            priority = capability.priority,
            disabled = self.is_disabled(&capability.name),
            "Registered upload host"
        );
        self.hosts.retain(|h| h.capability.name != capability.name);
        self.hosts.push(RegisteredHost { capability, client });
        self
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredHost> {
        self.hosts.iter().find(|h| h.capability.name == name)
    }

    /// Registered hosts in registration order.
    pub fn hosts(&self) -> &[RegisteredHost] {
        &self.hosts
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.contains(&name.to_lowercase())
    }

    /// Public URL of an upload, if its host is registered.
    pub fn url_for(&self, key: &HostedId) -> Option<String> {
        self.get(&key.host).map(|h| h.client.url_for(&key.id))
    }
}
