use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Ordinary RPC service
    #[default]
    Business,
    /// Also registered as a metrics scrape target
    Governance,
}

/// Descriptor stored as the value of an instance key
///
/// Every field is defaulted and unknown fields are ignored, so payloads
/// written by other versions still decode.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceInfo {
    pub name: String,
    pub scheme: String,
    /// `host:port`, optionally followed by `?params`
    pub address: String,
    pub kind: ServiceKind,
    pub metadata: HashMap<String, String>,
}

impl ServiceInfo {
    pub fn new(
        name: impl Into<String>,
        scheme: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            scheme: scheme.into(),
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_kind(
        mut self,
        kind: ServiceKind,
    ) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_governance(&self) -> bool {
        self.kind == ServiceKind::Governance
    }

    /// Rejects descriptors that would produce ambiguous keys
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.contains('/') {
            return Err(Error::InvalidService(format!(
                "name must be non-empty and contain no '/': {:?}",
                self.name
            )));
        }
        if self.scheme.is_empty() || self.scheme.contains(['/', ':']) {
            return Err(Error::InvalidService(format!(
                "scheme must be non-empty and contain no '/' or ':': {:?}",
                self.scheme
            )));
        }
        if self.address.is_empty() {
            return Err(Error::InvalidService(format!("address of {} is empty", self.name)));
        }
        Ok(())
    }

    /// Decodes the value stored at `key`
    pub fn decode(
        key: &str,
        value: &[u8],
    ) -> Result<Self> {
        serde_json::from_slice(value).map_err(|e| Error::Decode {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
