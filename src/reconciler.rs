//! Record reconciliation: drive the provider to exactly one record of the
//! desired type and value for a host label.

use crate::error::{DdnsError, Result};
use crate::providers::{delete_records, list_records, DnsProvider};
use crate::record::{DesiredRecord, Record, RecordType};
use async_trait::async_trait;
use std::net::IpAddr;

/// Duplicate recoveries attempted before the conflict is surfaced.
pub const MAX_DUPLICATE_RETRIES: u32 = 2;

/// What the internet currently resolves a name to.
#[async_trait]
pub trait PublishedLookup: Send + Sync {
    async fn published(&self, name: &str, ipv6: bool) -> Option<IpAddr>;
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Public DNS already answers with the desired value; provider not contacted.
    Skipped,
    /// The single matching record already holds the desired value.
    Unchanged,
    Created,
    Updated { id: String },
}

/// Reconciles one `(rr, domain, type)` against a provider.
pub struct Reconciler<'a> {
    provider: &'a dyn DnsProvider,
    lookup: Option<&'a dyn PublishedLookup>,
    max_retries: u32,
}

impl<'a> Reconciler<'a> {
    pub fn new(provider: &'a dyn DnsProvider) -> Self {
        Self {
            provider,
            lookup: None,
            max_retries: MAX_DUPLICATE_RETRIES,
        }
    }

    /// Skip the provider entirely when public DNS already matches.
    pub fn with_published_lookup(mut self, lookup: &'a dyn PublishedLookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Make the provider hold exactly one record matching `desired`.
    pub async fn reconcile(&self, desired: &DesiredRecord) -> Result<Outcome> {
        if self.already_published(desired).await {
            tracing::debug!(
                "{} already resolves to {}, skipping provider",
                desired.full_name(),
                desired.value
            );
            return Ok(Outcome::Skipped);
        }

        let mut retries = 0;
        loop {
            match self.apply(desired).await {
                Err(e) if e.is_duplicate() && retries < self.max_retries => {
                    retries += 1;
                    tracing::warn!(
                        "{}; clearing all records for {} (retry {}/{})",
                        e,
                        desired.full_name(),
                        retries,
                        self.max_retries
                    );
                    delete_records(self.provider, &desired.rr, &desired.domain).await?;
                }
                result => return result,
            }
        }
    }

    async fn already_published(&self, desired: &DesiredRecord) -> bool {
        let Some(lookup) = self.lookup else {
            return false;
        };
        let ipv6 = match desired.record_type {
            RecordType::A => false,
            RecordType::Aaaa => true,
            RecordType::Other(_) => return false,
        };
        let Ok(wanted) = desired.value.parse::<IpAddr>() else {
            return false;
        };

        lookup.published(&desired.full_name(), ipv6).await == Some(wanted)
    }

    /// One list-decide-write pass.
    async fn apply(&self, desired: &DesiredRecord) -> Result<Outcome> {
        let records = list_records(self.provider, &desired.domain).await?;
        let candidates: Vec<&Record> = records
            .iter()
            .filter(|r| r.rr == desired.rr && r.record_type == desired.record_type)
            .collect();

        match candidates.as_slice() {
            [] => {
                self.provider
                    .create_record(
                        &desired.domain,
                        &desired.rr,
                        &desired.record_type,
                        &desired.value,
                    )
                    .await?;
                tracing::info!(
                    "Created {} {} {}",
                    desired.full_name(),
                    desired.record_type,
                    desired.value
                );
                Ok(Outcome::Created)
            }
            [existing] if existing.value_matches(&desired.value) => Ok(Outcome::Unchanged),
            [existing] => {
                // Candidates are already filtered by type; an update must never change it.
                if existing.record_type != desired.record_type {
                    return Err(DdnsError::TypeMismatch {
                        existing: existing.record_type.to_string(),
                        desired: desired.record_type.to_string(),
                    });
                }
                self.provider
                    .update_record(
                        &existing.id,
                        &existing.rr,
                        &existing.record_type,
                        &desired.value,
                    )
                    .await?;
                tracing::info!(
                    "Updated {} {} {} -> {}",
                    desired.full_name(),
                    existing.record_type,
                    existing.value,
                    desired.value
                );
                Ok(Outcome::Updated {
                    id: existing.id.clone(),
                })
            }
            _ => Err(DdnsError::DuplicateRecord {
                rr: desired.rr.clone(),
                domain: desired.domain.clone(),
            }),
        }
    }
}
