//! Provider tests with HTTP mocking.

#[cfg(test)]
mod alidns_tests {
    use crate::providers::{list_records, AlidnsProvider, DnsProvider};
    use crate::record::RecordType;
    use crate::DdnsError;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> AlidnsProvider {
        AlidnsProvider::with_base_url(
            "test-id".to_string(),
            "test-secret".to_string(),
            format!("{}/", server.uri()),
        )
    }

    fn record_json(id: &str, rr: &str, record_type: &str, value: &str) -> serde_json::Value {
        serde_json::json!({
            "RecordId": id,
            "RR": rr,
            "DomainName": "example.com",
            "Type": record_type,
            "Value": value,
            "TTL": 600,
            "Status": "ENABLE"
        })
    }

    #[tokio::test]
    async fn test_alidns_list_page() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("Action", "DescribeDomainRecords"))
            .and(query_param("DomainName", "example.com"))
            .and(query_param("AccessKeyId", "test-id"))
            .and(query_param("PageNumber", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "TotalCount": 2,
                "PageNumber": 1,
                "PageSize": 50,
                "DomainRecords": {"Record": [
                    record_json("1", "ddns", "A", "1.1.1.1"),
                    record_json("2", "www", "CNAME", "example.net"),
                ]}
            })))
            .mount(&mock_server)
            .await;

        let page = provider(&mock_server)
            .list_page("example.com", 1, 50)
            .await
            .unwrap();

        assert_eq!(page.total_count, 2);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].id, "1");
        assert_eq!(page.records[0].record_type, RecordType::A);
        assert_eq!(page.records[1].record_type, RecordType::Other("CNAME".to_string()));
        assert_eq!(page.records[1].full_name(), "www.example.com");
    }

    #[tokio::test]
    async fn test_alidns_list_records_follows_pages() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("Action", "DescribeDomainRecords"))
            .and(query_param("PageNumber", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "TotalCount": 3,
                "DomainRecords": {"Record": [
                    record_json("1", "a", "A", "1.1.1.1"),
                    record_json("2", "b", "A", "2.2.2.2"),
                ]}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(query_param("Action", "DescribeDomainRecords"))
            .and(query_param("PageNumber", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "TotalCount": 3,
                "DomainRecords": {"Record": [record_json("3", "c", "AAAA", "::1")]}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server);
        let records = list_records(&provider, "example.com").await.unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[2].rr, "c");
    }

    #[tokio::test]
    async fn test_alidns_duplicate_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("Action", "AddDomainRecord"))
            .and(query_param("RR", "ddns"))
            .and(query_param("Type", "A"))
            .and(query_param("Value", "1.2.3.4"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "RequestId": "req-1",
                "Code": "DomainRecordDuplicate",
                "Message": "The DNS record already exists."
            })))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server)
            .create_record("example.com", "ddns", &RecordType::A, "1.2.3.4")
            .await;

        match result {
            Err(DdnsError::DuplicateRecord { rr, domain }) => {
                assert_eq!(rr, "ddns");
                assert_eq!(domain, "example.com");
            }
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_alidns_auth_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "RequestId": "req-2",
                "Code": "InvalidAccessKeyId.NotFound",
                "Message": "Specified access key is not found."
            })))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server).delete_record("42").await;

        match result {
            Err(DdnsError::Provider { provider, message }) => {
                assert_eq!(provider, "alidns");
                assert!(message.contains("InvalidAccessKeyId.NotFound"));
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_alidns_update_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("Action", "UpdateDomainRecord"))
            .and(query_param("RecordId", "record-123"))
            .and(query_param("Value", "2.2.2.2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "RequestId": "req-3",
                "RecordId": "record-123"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        provider(&mock_server)
            .update_record("record-123", "ddns", &RecordType::A, "2.2.2.2")
            .await
            .unwrap();
    }
}

#[cfg(test)]
mod pagination_tests {
    use crate::providers::{
        delete_records, list_records, MockDnsProvider, RecordPage, MAX_PAGES,
    };
    use crate::record::{Record, RecordType};

    fn record(id: &str, rr: &str, record_type: RecordType) -> Record {
        Record {
            id: id.to_string(),
            rr: rr.to_string(),
            domain: "example.com".to_string(),
            record_type,
            value: "1.1.1.1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_listing_stops_at_page_cap() {
        let mut mock = MockDnsProvider::new();

        // Total keeps growing but no records ever arrive.
        mock.expect_list_page()
            .times(MAX_PAGES as usize)
            .returning(|_, page_number, _| {
                Ok(RecordPage {
                    records: Vec::new(),
                    total_count: page_number as usize * 10,
                })
            });

        let records = list_records(&mock, "example.com").await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_listing_single_page() {
        let mut mock = MockDnsProvider::new();

        mock.expect_list_page()
            .times(1)
            .withf(|domain: &str, page_number: &u32, _| {
                domain == "example.com" && *page_number == 1
            })
            .returning(|_, _, _| {
                Ok(RecordPage {
                    records: vec![record("1", "ddns", RecordType::A)],
                    total_count: 1,
                })
            });

        let records = list_records(&mock, "example.com").await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_records_matches_any_type() {
        let mut mock = MockDnsProvider::new();

        mock.expect_list_page().returning(|_, _, _| {
            Ok(RecordPage {
                records: vec![
                    record("1", "ddns", RecordType::A),
                    record("2", "ddns", RecordType::Aaaa),
                    record("3", "www", RecordType::A),
                    record("4", "ddns", RecordType::Other("TXT".to_string())),
                ],
                total_count: 4,
            })
        });
        mock.expect_delete_record()
            .times(3)
            .withf(|id: &str| id != "3")
            .returning(|_| Ok(()));

        let deleted = delete_records(&mock, "ddns", "example.com").await.unwrap();
        assert_eq!(deleted, 3);
    }
}
