//! Lookup of the currently published address through public DNS upstreams.

use crate::error::{DdnsError, Result};
use crate::reconciler::PublishedLookup;
use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RData, RecordType};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;

/// Per-upstream timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_RESPONSE_LEN: usize = 4096;

/// Public recursive resolvers, queried in order.
pub fn default_upstreams() -> Vec<SocketAddr> {
    [
        Ipv4Addr::new(223, 5, 5, 5),
        Ipv4Addr::new(119, 29, 29, 29),
        Ipv4Addr::new(1, 1, 1, 1),
        Ipv4Addr::new(8, 8, 8, 8),
        Ipv4Addr::new(114, 114, 114, 114),
    ]
    .into_iter()
    .map(|ip| SocketAddr::new(IpAddr::V4(ip), 53))
    .collect()
}

/// Plain DNS-over-UDP client over a fixed upstream list.
#[derive(Debug, Clone)]
pub struct DnsResolver {
    upstreams: Vec<SocketAddr>,
    timeout: Duration,
}

impl DnsResolver {
    pub fn new() -> Self {
        Self::with_upstreams(default_upstreams())
    }

    pub fn with_upstreams(upstreams: Vec<SocketAddr>) -> Self {
        Self {
            upstreams,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn upstreams(&self) -> &[SocketAddr] {
        &self.upstreams
    }

    /// Resolve `name` to its first A (or AAAA) answer.
    ///
    /// Upstreams are tried in order until one answers; `None` when all fail
    /// or none has an answer.
    pub async fn resolve(&self, name: &str, ipv6: bool) -> Option<IpAddr> {
        let record_type = if ipv6 { RecordType::AAAA } else { RecordType::A };

        for upstream in &self.upstreams {
            match self.query(*upstream, name, record_type).await {
                Ok(Some(ip)) => {
                    tracing::debug!("{} {} -> {} via {}", name, record_type, ip, upstream);
                    return Some(ip);
                }
                Ok(None) => {
                    tracing::debug!("{} {}: no answer from {}", name, record_type, upstream)
                }
                Err(e) => tracing::debug!(
                    "{} {}: upstream {} failed: {}",
                    name,
                    record_type,
                    upstream,
                    e
                ),
            }
        }

        None
    }

    async fn query(
        &self,
        upstream: SocketAddr,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<IpAddr>> {
        let mut name = Name::from_ascii(name)?;
        name.set_fqdn(true);

        let id: u16 = rand::random();
        let mut message = Message::new();
        message
            .set_id(id)
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true)
            .add_query(Query::query(name, record_type));
        let request = message.to_vec()?;

        let bind: SocketAddr = if upstream.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(upstream).await?;
        socket.send(&request).await?;

        let mut buf = vec![0u8; MAX_RESPONSE_LEN];
        let len = tokio::time::timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| DdnsError::Dns(format!("timed out after {:?}", self.timeout)))??;

        let response = Message::from_vec(&buf[..len])?;
        if response.id() != id {
            return Err(DdnsError::Dns(format!(
                "response id {} does not match query id {}",
                response.id(),
                id
            )));
        }

        Ok(response
            .answers()
            .iter()
            .find_map(|record| match record.data() {
                RData::A(a) if record_type == RecordType::A => Some(IpAddr::V4(a.0)),
                RData::AAAA(aaaa) if record_type == RecordType::AAAA => Some(IpAddr::V6(aaaa.0)),
                _ => None,
            }))
    }
}

impl Default for DnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PublishedLookup for DnsResolver {
    async fn published(&self, name: &str, ipv6: bool) -> Option<IpAddr> {
        self.resolve(name, ipv6).await
    }
}
