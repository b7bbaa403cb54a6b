use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

/// Configuration object families stored under `configurators/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigCategory {
    Routes,
    Providers,
    Consumers,
}

impl ConfigCategory {
    pub const ALL: [ConfigCategory; 3] = [
        ConfigCategory::Routes,
        ConfigCategory::Providers,
        ConfigCategory::Consumers,
    ];

    /// Key segment naming the category
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigCategory::Routes => "routes",
            ConfigCategory::Providers => "providers",
            ConfigCategory::Consumers => "consumers",
        }
    }
}

impl fmt::Display for ConfigCategory {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown configuration category: {s}"))
    }
}

/// Traffic routing rule
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RouteConfig {
    /// Stamped from the key
    pub id: String,
    /// Stamped from the key
    pub scheme: String,
    /// Stamped from the key; empty when the key names no host
    pub host: String,
    /// Deployment (group) the rule sends traffic to
    pub deployment: String,
    pub weight: i64,
}

/// Override applied to one provider instance
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderConfig {
    pub id: String,
    pub scheme: String,
    pub host: String,
    pub weight: i64,
    pub enable: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            scheme: String::new(),
            host: String::new(),
            weight: 0,
            enable: true,
        }
    }
}

/// Override applied to consumers of the service
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ConsumerConfig {
    pub id: String,
    pub scheme: String,
    pub host: String,
    pub enable: bool,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            scheme: String::new(),
            host: String::new(),
            enable: true,
        }
    }
}

/// Where a configurator key points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    pub category: ConfigCategory,
    pub id: String,
    pub host: String,
}

impl ConfigLocation {
    /// Parses the part of a configurator key after `configurators/`
    ///
    /// Accepts `{scheme}://{host}/{category}/{id}` and
    /// `{scheme}://{category}/{id}` (no host).
    pub fn parse(uri: &str) -> Result<Self, String> {
        let url = url::Url::parse(uri).map_err(|e| format!("invalid configurator uri {uri}: {e}"))?;
        let path = url.path();

        for category in ConfigCategory::ALL {
            let segment = format!("/{}/", category.as_str());
            if let Some(id) = path.strip_prefix(&segment) {
                return Self::build(category, id, authority(&url));
            }
        }

        let category: ConfigCategory = url
            .host_str()
            .unwrap_or_default()
            .parse()
            .map_err(|e| format!("{e} in {uri}"))?;
        Self::build(category, path.trim_start_matches('/'), String::new())
    }

    fn build(
        category: ConfigCategory,
        id: &str,
        host: String,
    ) -> Result<Self, String> {
        if id.is_empty() {
            return Err(format!("missing {category} id"));
        }
        Ok(Self {
            category,
            id: id.to_string(),
            host,
        })
    }
}

/// `host[:port]` of `url`, empty when it has no host
pub(crate) fn authority(url: &url::Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}
