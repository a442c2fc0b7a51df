//! Approximate geolocation label for display next to an address.

use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://ip-api.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeoResponse {
    status: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    region_name: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    isp: String,
}

/// Best-effort IP geolocation lookup.
pub struct GeoLocator {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl GeoLocator {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            timeout: Duration::from_secs(5),
        }
    }

    /// `[country region city isp]`, or an empty string when the lookup fails.
    pub async fn label(&self, ip: IpAddr) -> String {
        match self.lookup(ip).await {
            Ok(label) => label,
            Err(e) => {
                tracing::debug!("Geolocation of {} failed: {}", ip, e);
                String::new()
            }
        }
    }

    async fn lookup(&self, ip: IpAddr) -> crate::Result<String> {
        let url = format!(
            "{}/json/{}?fields=status,country,regionName,city,isp",
            self.base_url, ip
        );
        let response: GeoResponse = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await?
            .json()
            .await?;

        if response.status != "success" {
            return Ok(String::new());
        }

        let parts: Vec<&str> = [
            response.country.as_str(),
            response.region_name.as_str(),
            response.city.as_str(),
            response.isp.as_str(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();

        Ok(format!("[{}]", parts.join(" ")))
    }
}

impl Default for GeoLocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_label_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json/203.0.113.7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "country": "China",
                "regionName": "Zhejiang",
                "city": "Hangzhou",
                "isp": ""
            })))
            .mount(&mock_server)
            .await;

        let geo = GeoLocator::with_base_url(mock_server.uri());
        assert_eq!(
            geo.label("203.0.113.7".parse().unwrap()).await,
            "[China Zhejiang Hangzhou]"
        );
    }

    #[tokio::test]
    async fn test_label_failure_is_empty() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let geo = GeoLocator::with_base_url(mock_server.uri());
        assert_eq!(geo.label("203.0.113.7".parse().unwrap()).await, "");
    }
}
