//! Public IP detection via "echo my IP" web services.

use crate::error::{DdnsError, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use std::net::IpAddr;
use std::time::Duration;

/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_IPV4_SERVICES: [&str; 5] = [
    "https://api.ipify.org",
    "https://ipv4.icanhazip.com",
    "https://ifconfig.me/ip",
    "https://myip.ipip.net",
    "https://4.ipw.cn",
];

pub const DEFAULT_IPV6_SERVICES: [&str; 4] = [
    "https://api6.ipify.org",
    "https://ipv6.icanhazip.com",
    "https://v6.ident.me",
    "https://6.ipw.cn",
];

/// IP detector querying several services concurrently.
pub struct IpDetector {
    client: reqwest::Client,
    ipv4_services: Vec<String>,
    ipv6_services: Vec<String>,
    timeout: Duration,
}

impl IpDetector {
    /// Create a new IP detector with default services.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            ipv4_services: DEFAULT_IPV4_SERVICES.iter().map(|s| s.to_string()).collect(),
            ipv6_services: DEFAULT_IPV6_SERVICES.iter().map(|s| s.to_string()).collect(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a detector that queries `services` for both address families.
    pub fn with_services(services: Vec<String>) -> Self {
        Self {
            ipv4_services: services.clone(),
            ipv6_services: services,
            ..Self::new()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn services(&self, ipv6: bool) -> &[String] {
        if ipv6 {
            &self.ipv6_services
        } else {
            &self.ipv4_services
        }
    }

    /// Detect the public address of the requested family.
    ///
    /// All services are queried at once; the first one to answer with a
    /// valid literal wins and the rest are dropped. `None` means every
    /// service failed.
    pub async fn detect(&self, ipv6: bool) -> Option<IpAddr> {
        let mut pending: FuturesUnordered<_> = self
            .services(ipv6)
            .iter()
            .map(|service| async move { (service, self.try_service(service, ipv6).await) })
            .collect();

        while let Some((service, result)) = pending.next().await {
            match result {
                Ok(ip) => {
                    tracing::debug!("Detected {} from {}", ip, service);
                    return Some(ip);
                }
                Err(e) => tracing::debug!("Service {} failed: {}", service, e),
            }
        }

        tracing::warn!(
            "All {} IP detection services failed",
            if ipv6 { "IPv6" } else { "IPv4" }
        );
        None
    }

    /// Detect public IPv4 address.
    pub async fn detect_ipv4(&self) -> Option<IpAddr> {
        self.detect(false).await
    }

    /// Detect public IPv6 address.
    pub async fn detect_ipv6(&self) -> Option<IpAddr> {
        self.detect(true).await
    }

    /// Try a single IP detection service.
    async fn try_service(&self, url: &str, ipv6: bool) -> Result<IpAddr> {
        let response = self.client.get(url).timeout(self.timeout).send().await?;

        if !response.status().is_success() {
            return Err(DdnsError::IpDetection(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let text = response.text().await?;

        extract_ip(&text, ipv6).ok_or_else(|| {
            DdnsError::IpDetection(format!(
                "No {} address in response from {}",
                if ipv6 { "IPv6" } else { "IPv4" },
                url
            ))
        })
    }
}

impl Default for IpDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Scrape the first address literal of the requested family out of a body.
pub fn extract_ip(body: &str, ipv6: bool) -> Option<IpAddr> {
    let is_ip_char = |c: char| {
        if ipv6 {
            c.is_ascii_hexdigit() || c == ':' || c == '.'
        } else {
            c.is_ascii_digit() || c == '.'
        }
    };

    body.split(|c: char| !is_ip_char(c))
        .map(|token| token.trim_matches('.'))
        .filter(|token| !token.is_empty())
        .find_map(|token| parse_token(token, ipv6))
}

/// Parse a token, falling back to the text after each `:` so a glued-on
/// label like `IP:2001:db8::1` still yields the address.
fn parse_token(token: &str, ipv6: bool) -> Option<IpAddr> {
    std::iter::once(0)
        .chain(token.match_indices(':').map(|(i, _)| i + 1))
        .filter_map(|start| token[start..].parse::<IpAddr>().ok())
        .find(|ip| ip.is_ipv6() == ipv6)
}
