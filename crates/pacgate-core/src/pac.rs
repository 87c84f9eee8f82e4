//! PAC (Proxy Auto-Config) script generation.
//!
//! [`generate`] turns a domain sequence into a `FindProxyForURL` program.
//! A host is proxied when it equals a listed domain or is a subdomain of
//! one (dot-suffix match). Everything else goes `DIRECT`, and an empty
//! domain set produces a script that never proxies.
//!
//! [`PacScript::route`] evaluates the same rule in Rust so callers can
//! check routing without a JavaScript engine.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Default upstream proxy host.
pub const DEFAULT_UPSTREAM_HOST: &str = "ex.mtproxier.com";

/// Default upstream proxy port.
pub const DEFAULT_UPSTREAM_PORT: u16 = 443;

/// Script installed when there is nothing to proxy.
pub const DIRECT_ONLY_SCRIPT: &str = r#"function FindProxyForURL(url, host) { return "DIRECT"; }"#;

/// The remote proxy matched traffic is sent to, over HTTPS.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Upstream {
    pub host: String,
    pub port: u16,
}

impl Upstream {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// PAC return value routing through this upstream.
    pub fn directive(&self) -> String {
        format!("HTTPS {}:{}", self.host, self.port)
    }
}

impl Default for Upstream {
    fn default() -> Self {
        Self::new(DEFAULT_UPSTREAM_HOST, DEFAULT_UPSTREAM_PORT)
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Routing decision for a single host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Direct,
    Proxy(Upstream),
}

impl Route {
    pub fn is_proxied(&self) -> bool {
        matches!(self, Self::Proxy(_))
    }
}

/// A generated PAC script together with the inputs it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacScript {
    text: String,
    domains: Vec<String>,
    upstream: Upstream,
}

impl PacScript {
    /// Script source.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Effective (deduplicated, non-empty) domains, first occurrence order.
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    /// True when the script unconditionally returns `DIRECT`.
    pub fn is_direct_only(&self) -> bool {
        self.domains.is_empty()
    }

    /// SHA-256 of the script text, lowercase hex.
    pub fn fingerprint(&self) -> String {
        format!("{:x}", Sha256::digest(self.text.as_bytes()))
    }

    /// Decides how `host` is routed, mirroring `FindProxyForURL`.
    pub fn route(&self, host: &str) -> Route {
        let host = host.to_ascii_lowercase();
        let host = host.strip_suffix('.').unwrap_or(&host);
        if host.is_empty() {
            return Route::Direct;
        }

        let matched = self.domains.iter().any(|d| {
            host == d
                || (host.len() > d.len()
                    && host.ends_with(d.as_str())
                    && host.as_bytes()[host.len() - d.len() - 1] == b'.')
        });

        if matched {
            Route::Proxy(self.upstream.clone())
        } else {
            Route::Direct
        }
    }
}

impl fmt::Display for PacScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Deduplicates, drops empty entries and lowercases, keeping first occurrence order.
fn effective_domains<I, D>(domains: I) -> Vec<String>
where
    I: IntoIterator<Item = D>,
    D: AsRef<str>,
{
    let mut seen = HashSet::new();
    domains
        .into_iter()
        .map(|d| d.as_ref().trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty())
        .filter(|d| seen.insert(d.clone()))
        .collect()
}

/// JavaScript string literal for `s`.
fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Builds the PAC script for `domains`, proxying matches to `upstream`.
///
/// ```
/// use pacgate_core::pac::{generate, Upstream, DIRECT_ONLY_SCRIPT};
///
/// let empty = generate(Vec::<String>::new(), &Upstream::default());
/// assert_eq!(empty.text(), DIRECT_ONLY_SCRIPT);
///
/// let script = generate(["telegram.org", "telegram.org", ""], &Upstream::default());
/// assert_eq!(script.domains(), ["telegram.org"]);
/// assert!(script.route("web.telegram.org").is_proxied());
/// ```
pub fn generate<I, D>(domains: I, upstream: &Upstream) -> PacScript
where
    I: IntoIterator<Item = D>,
    D: AsRef<str>,
{
    let domains = effective_domains(domains);

    if domains.is_empty() {
        return PacScript {
            text: DIRECT_ONLY_SCRIPT.to_string(),
            domains,
            upstream: upstream.clone(),
        };
    }

    let list = domains
        .iter()
        .map(|d| js_string(d))
        .collect::<Vec<_>>()
        .join(",");

    let mut text = String::with_capacity(640 + list.len());
    text.push_str("function FindProxyForURL(url, host) {\n");
    text.push_str("  if (!host) return \"DIRECT\";\n");
    text.push_str("  host = host.toLowerCase();\n");
    text.push_str("  var n = host.length;\n");
    text.push_str("  if (n && host.charCodeAt(n - 1) === 46) host = host.slice(0, n - 1);\n");
    text.push_str(&format!("  var proxy = {};\n", js_string(&upstream.directive())));
    text.push_str(&format!("  var ds = [{}];\n", list));
    text.push_str("  for (var i = 0; i < ds.length; i++) {\n");
    text.push_str("    var d = ds[i];\n");
    text.push_str("    if (host === d) return proxy;\n");
    text.push_str("    var hl = host.length, dl = d.length;\n");
    text.push_str("    if (hl > dl && host.substring(hl - dl - 1) === \".\" + d) return proxy;\n");
    text.push_str("  }\n");
    text.push_str("  return \"DIRECT\";\n");
    text.push_str("}\n");

    PacScript {
        text,
        domains,
        upstream: upstream.clone(),
    }
}
