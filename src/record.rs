//! DNS record model and domain-name helpers.

use crate::error::{DdnsError, Result};
use std::fmt;
use std::net::IpAddr;

/// Host label the provider uses for the zone apex.
pub const APEX: &str = "@";

/// DNS record type. Only A and AAAA are ever written; others are carried through listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    Aaaa,
    Other(String),
}

impl RecordType {
    /// Record type for an address family.
    pub fn for_ipv6(ipv6: bool) -> Self {
        if ipv6 {
            RecordType::Aaaa
        } else {
            RecordType::A
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Other(s) => s,
        }
    }
}

impl From<String> for RecordType {
    fn from(s: String) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            _ => RecordType::Other(s),
        }
    }
}

impl From<&str> for RecordType {
    fn from(s: &str) -> Self {
        RecordType::from(s.to_string())
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record as reported by the provider. Transient copy, refetched on every listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Provider-assigned identifier.
    pub id: String,
    /// Host label, e.g. `ddns`.
    pub rr: String,
    /// Zone, e.g. `example.com`.
    pub domain: String,
    pub record_type: RecordType,
    pub value: String,
}

impl Record {
    pub fn full_name(&self) -> String {
        full_name(&self.rr, &self.domain)
    }

    /// Compare the stored value with a desired value, treating equivalent
    /// IP spellings as equal.
    pub fn value_matches(&self, desired: &str) -> bool {
        values_match(&self.value, desired)
    }
}

/// Desired state for one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredRecord {
    pub rr: String,
    pub domain: String,
    pub record_type: RecordType,
    pub value: String,
}

impl DesiredRecord {
    /// Build the desired A/AAAA record for `fqdn` pointing at `ip`.
    pub fn for_ip(fqdn: &str, ip: IpAddr) -> Result<Self> {
        let (rr, domain) = split_domain(fqdn)?;
        Ok(Self {
            rr,
            domain,
            record_type: RecordType::for_ipv6(ip.is_ipv6()),
            value: ip.to_string(),
        })
    }

    pub fn full_name(&self) -> String {
        full_name(&self.rr, &self.domain)
    }
}

/// Join host label and zone. The apex label yields the bare zone.
pub fn full_name(rr: &str, domain: &str) -> String {
    if rr == APEX {
        domain.to_string()
    } else {
        format!("{}.{}", rr, domain)
    }
}

/// Split a fully-qualified name into `(rr, domain)`.
///
/// The first label becomes `rr` and the remainder the zone. A bare zone
/// (exactly one dot) maps to the apex label.
pub fn split_domain(fqdn: &str) -> Result<(String, String)> {
    let name = fqdn.trim().trim_end_matches('.');
    let dots = name.matches('.').count();

    if dots == 0 || name.split('.').any(str::is_empty) {
        return Err(DdnsError::Config(format!("Invalid domain name: {:?}", fqdn)));
    }

    if dots == 1 {
        return Ok((APEX.to_string(), name.to_string()));
    }

    let (rr, domain) = name
        .split_once('.')
        .ok_or_else(|| DdnsError::Config(format!("Invalid domain name: {:?}", fqdn)))?;
    Ok((rr.to_string(), domain.to_string()))
}

/// Reduce a name to the zone it belongs to. Bare zones pass through.
pub fn zone_of(name: &str) -> Result<String> {
    split_domain(name).map(|(_, domain)| domain)
}

fn values_match(stored: &str, desired: &str) -> bool {
    match (stored.parse::<IpAddr>(), desired.parse::<IpAddr>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => stored == desired,
    }
}
