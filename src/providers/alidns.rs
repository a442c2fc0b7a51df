//! Alibaba Cloud DNS (Alidns) provider.

use super::{DnsProvider, RecordPage};
use crate::error::{DdnsError, Result};
use crate::record::{Record, RecordType};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha1::Sha1;
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://alidns.aliyuncs.com/";
const API_VERSION: &str = "2015-01-09";
const DUPLICATE_CODE: &str = "DomainRecordDuplicate";

type HmacSha1 = Hmac<Sha1>;

/// Alidns provider authenticated with an AccessKey pair.
pub struct AlidnsProvider {
    client: reqwest::Client,
    access_key_id: String,
    access_key_secret: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeResponse {
    total_count: usize,
    domain_records: DomainRecords,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DomainRecords {
    #[serde(default)]
    record: Vec<AlidnsRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AlidnsRecord {
    record_id: String,
    #[serde(rename = "RR")]
    rr: String,
    domain_name: String,
    #[serde(rename = "Type")]
    record_type: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WriteResponse {
    request_id: Option<String>,
    record_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    code: String,
    #[serde(default)]
    message: String,
}

impl From<AlidnsRecord> for Record {
    fn from(r: AlidnsRecord) -> Self {
        Record {
            id: r.record_id,
            rr: r.rr,
            domain: r.domain_name,
            record_type: RecordType::from(r.record_type),
            value: r.value,
        }
    }
}

impl AlidnsProvider {
    /// Create a new Alidns provider.
    pub fn new(access_key_id: String, access_key_secret: String) -> Self {
        Self::with_base_url(access_key_id, access_key_secret, DEFAULT_BASE_URL.to_string())
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(
        access_key_id: String,
        access_key_secret: String,
        base_url: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_key_id,
            access_key_secret,
            base_url,
            timeout: Duration::from_secs(10),
        }
    }

    /// Override the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn signed_query(&self, action: &str, params: &[(&str, &str)]) -> Result<Vec<(String, String)>> {
        let mut query: BTreeMap<String, String> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        query.insert("Action".into(), action.into());
        query.insert("Format".into(), "JSON".into());
        query.insert("Version".into(), API_VERSION.into());
        query.insert("AccessKeyId".into(), self.access_key_id.clone());
        query.insert("SignatureMethod".into(), "HMAC-SHA1".into());
        query.insert("SignatureVersion".into(), "1.0".into());
        query.insert("SignatureNonce".into(), format!("{:032x}", rand::random::<u128>()));
        query.insert(
            "Timestamp".into(),
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        );

        let signature = sign(&self.access_key_secret, &string_to_sign(&query))?;
        query.insert("Signature".into(), signature);

        Ok(query.into_iter().collect())
    }

    async fn call<T: DeserializeOwned>(&self, action: &str, params: &[(&str, &str)]) -> Result<T> {
        let query = self.signed_query(action, params)?;

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(action, params, status, &body));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Turn a non-2xx Alidns reply into a typed error.
fn api_error(
    action: &str,
    params: &[(&str, &str)],
    status: reqwest::StatusCode,
    body: &str,
) -> DdnsError {
    let param = |key: &str| {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
            .unwrap_or_default()
    };

    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) if err.code == DUPLICATE_CODE => DdnsError::DuplicateRecord {
            rr: param("RR"),
            domain: param("DomainName"),
        },
        Ok(err) => DdnsError::Provider {
            provider: "alidns".to_string(),
            message: format!("{} {}: {}", action, err.code, err.message),
        },
        Err(_) => DdnsError::Provider {
            provider: "alidns".to_string(),
            message: format!("{} HTTP {}", action, status),
        },
    }
}

/// RFC 3986 percent-encoding as Alibaba Cloud expects it.
fn percent_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace('*', "%2A")
        .replace("%7E", "~")
}

fn string_to_sign(query: &BTreeMap<String, String>) -> String {
    let canonical = query
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("GET&{}&{}", percent_encode("/"), percent_encode(&canonical))
}

fn sign(secret: &str, string_to_sign: &str) -> Result<String> {
    let mut mac = HmacSha1::new_from_slice(format!("{}&", secret).as_bytes())
        .map_err(|e| DdnsError::Config(format!("Invalid access key secret: {}", e)))?;
    mac.update(string_to_sign.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl DnsProvider for AlidnsProvider {
    fn name(&self) -> &'static str {
        "alidns"
    }

    async fn list_page(
        &self,
        domain: &str,
        page_number: u32,
        page_size: u32,
    ) -> Result<RecordPage> {
        let page_number = page_number.to_string();
        let page_size = page_size.to_string();

        let response: DescribeResponse = self
            .call(
                "DescribeDomainRecords",
                &[
                    ("DomainName", domain),
                    ("PageNumber", &page_number),
                    ("PageSize", &page_size),
                ],
            )
            .await?;

        Ok(RecordPage {
            records: response
                .domain_records
                .record
                .into_iter()
                .map(Record::from)
                .collect(),
            total_count: response.total_count,
        })
    }

    async fn create_record(
        &self,
        domain: &str,
        rr: &str,
        record_type: &RecordType,
        value: &str,
    ) -> Result<()> {
        let response: WriteResponse = self
            .call(
                "AddDomainRecord",
                &[
                    ("DomainName", domain),
                    ("RR", rr),
                    ("Type", record_type.as_str()),
                    ("Value", value),
                ],
            )
            .await?;

        tracing::debug!(
            "AddDomainRecord ok: record {:?}, request {:?}",
            response.record_id,
            response.request_id
        );
        Ok(())
    }

    async fn update_record(
        &self,
        id: &str,
        rr: &str,
        record_type: &RecordType,
        value: &str,
    ) -> Result<()> {
        let response: WriteResponse = self
            .call(
                "UpdateDomainRecord",
                &[
                    ("RecordId", id),
                    ("RR", rr),
                    ("Type", record_type.as_str()),
                    ("Value", value),
                ],
            )
            .await?;

        tracing::debug!("UpdateDomainRecord ok: request {:?}", response.request_id);
        Ok(())
    }

    async fn delete_record(&self, id: &str) -> Result<()> {
        let response: WriteResponse = self
            .call("DeleteDomainRecord", &[("RecordId", id)])
            .await?;

        tracing::debug!("DeleteDomainRecord ok: request {:?}", response.request_id);
        Ok(())
    }
}
