//! DNS provider abstraction and the Alibaba Cloud DNS implementation.

mod alidns;

#[cfg(test)]
mod tests;

pub use alidns::AlidnsProvider;

use crate::error::Result;
use crate::record::{Record, RecordType};
use async_trait::async_trait;

/// Records requested per listing page.
pub const PAGE_SIZE: u32 = 50;

/// Hard cap on listing pages, regardless of the reported total.
pub const MAX_PAGES: u32 = 99;

/// One page of a zone listing.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<Record>,
    /// Total number of records the provider reports for the zone.
    pub total_count: usize,
}

/// Record-level operations on a hosted zone.
///
/// Implementations wrap authentication and transport. A write that collides
/// with an existing record must fail with [`DdnsError::DuplicateRecord`].
///
/// [`DdnsError::DuplicateRecord`]: crate::DdnsError::DuplicateRecord
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &'static str;

    /// Fetch one page (1-based) of the zone's records.
    async fn list_page(&self, domain: &str, page_number: u32, page_size: u32)
        -> Result<RecordPage>;

    async fn create_record(
        &self,
        domain: &str,
        rr: &str,
        record_type: &RecordType,
        value: &str,
    ) -> Result<()>;

    async fn update_record(
        &self,
        id: &str,
        rr: &str,
        record_type: &RecordType,
        value: &str,
    ) -> Result<()>;

    async fn delete_record(&self, id: &str) -> Result<()>;
}

/// List every record in zone `domain`, following pagination.
///
/// Stops once the accumulated count reaches the reported total, or after
/// [`MAX_PAGES`] pages.
pub async fn list_records(provider: &dyn DnsProvider, domain: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();

    for page_number in 1..=MAX_PAGES {
        let page = provider.list_page(domain, page_number, PAGE_SIZE).await?;
        records.extend(page.records);

        if records.len() >= page.total_count {
            return Ok(records);
        }
    }

    tracing::warn!(
        "Stopped listing {} after {} pages ({} records)",
        domain,
        MAX_PAGES,
        records.len()
    );
    Ok(records)
}

/// Delete every record with host label `rr` in `domain`, of any type.
///
/// Returns the number of records deleted.
pub async fn delete_records(provider: &dyn DnsProvider, rr: &str, domain: &str) -> Result<usize> {
    let records = list_records(provider, domain).await?;
    let mut deleted = 0;

    for record in records.iter().filter(|r| r.rr == rr) {
        provider.delete_record(&record.id).await?;
        tracing::info!(
            "Deleted {} {} {} (id {})",
            record.full_name(),
            record.record_type,
            record.value,
            record.id
        );
        deleted += 1;
    }

    Ok(deleted)
}
