//! Registry key builders.
//!
//! `prefix` arguments are registry namespaces with or without surrounding
//! slashes; `ego` and `/ego/` produce the same keys.

use crate::constants::CONFIGURATORS_SEGMENT;
use crate::constants::PROMETHEUS_JOB_PREFIX;
use crate::constants::PROVIDERS_SEGMENT;
use crate::ConfigCategory;
use crate::ServiceInfo;

fn namespace(prefix: &str) -> &str {
    prefix.trim_matches('/')
}

/// `/{prefix}/{name}/`, the subtree watched for one service
pub fn service_prefix(
    prefix: &str,
    name: &str,
) -> String {
    format!("/{}/{name}/", namespace(prefix))
}

/// `/{prefix}/{name}/providers/{scheme}://`, the instances of one scheme
pub fn providers_prefix(
    prefix: &str,
    name: &str,
    scheme: &str,
) -> String {
    format!("{}{PROVIDERS_SEGMENT}/{scheme}://", service_prefix(prefix, name))
}

/// Instance key of `info`
pub fn service_key(
    prefix: &str,
    info: &ServiceInfo,
) -> String {
    format!(
        "{}{}",
        providers_prefix(prefix, &info.name, &info.scheme),
        info.address
    )
}

pub fn configurator_key(
    prefix: &str,
    name: &str,
    scheme: &str,
    category: ConfigCategory,
    id: &str,
) -> String {
    format!(
        "{}{CONFIGURATORS_SEGMENT}/{scheme}://{category}/{id}",
        service_prefix(prefix, name)
    )
}

/// Governance key exposing `address` to the metrics scraper
pub fn metrics_job_key(
    name: &str,
    address: &str,
) -> String {
    format!("{PROMETHEUS_JOB_PREFIX}/{name}/{address}")
}
