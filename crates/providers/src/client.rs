use reqwest::{Client, Proxy};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Proxy inputs for one outbound endpoint.
///
/// `endpoint_proxy` comes from the provider entry: `None` defers to the global
/// proxy, `Some("")` forces a direct connection, anything else is used as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxySettings<'a> {
    pub endpoint_proxy: Option<&'a str>,
    pub global_proxy: Option<&'a str>,
    pub no_proxy: &'a [String],
}

#[derive(Debug, PartialEq, Eq)]
enum ProxyRoute {
    Via(String),
    Direct,
    /// Nothing configured; reqwest reads HTTPS_PROXY / HTTP_PROXY itself.
    Environment,
}

/// Matches a host against a no_proxy rule. Supported forms: exact host,
/// `*.suffix` (subdomains only) and `.suffix` (the domain and its subdomains).
fn rule_matches(host: &str, rule: &str) -> bool {
    let rule = rule.trim().to_ascii_lowercase();
    if rule.is_empty() {
        return false;
    }
    let host = host.to_ascii_lowercase();
    if let Some(suffix) = rule.strip_prefix("*.") {
        host.ends_with(&format!(".{suffix}"))
    } else if let Some(suffix) = rule.strip_prefix('.') {
        host == suffix || host.ends_with(&format!(".{suffix}"))
    } else {
        host == rule
    }
}

fn host_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let authority = rest.split(['/', '?', '#']).next()?;
    let authority = authority.rsplit('@').next()?;
    let host = match authority.strip_prefix('[') {
        Some(v6) => v6.split(']').next()?,
        None => authority.split(':').next()?,
    };
    (!host.is_empty()).then_some(host)
}

fn route_for(settings: &ProxySettings<'_>, endpoint: &str) -> ProxyRoute {
    match settings.endpoint_proxy {
        Some("") => return ProxyRoute::Direct,
        Some(p) => return ProxyRoute::Via(p.to_string()),
        None => {}
    }

    let Some(global) = settings.global_proxy.filter(|g| !g.is_empty()) else {
        return ProxyRoute::Environment;
    };

    let bypass = host_of(endpoint)
        .map(|h| settings.no_proxy.iter().any(|rule| rule_matches(h, rule)))
        .unwrap_or(false);
    if bypass {
        ProxyRoute::Direct
    } else {
        ProxyRoute::Via(global.to_string())
    }
}

/// Builds the shared HTTP client for an endpoint with the given timeout.
pub fn build_http_client(settings: ProxySettings<'_>, endpoint: &str, timeout: Duration) -> Client {
    let mut builder = Client::builder().timeout(timeout);

    match route_for(&settings, endpoint) {
        ProxyRoute::Via(url) => match Proxy::all(&url) {
            Ok(proxy) => {
                info!(proxy = %url, endpoint = %endpoint, "Routing requests through proxy");
                builder = builder.proxy(proxy);
            }
            Err(e) => {
                warn!(error = %e, proxy = %url, "Ignoring invalid proxy URL");
            }
        },
        ProxyRoute::Direct => {
            debug!(endpoint = %endpoint, "Proxy disabled for endpoint");
            builder = builder.no_proxy();
        }
        ProxyRoute::Environment => {}
    }

    builder.build().unwrap_or_else(|e| {
        warn!(error = %e, "Falling back to default HTTP client");
        Client::new()
    })
}
