use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use super::{SearchError, SearchOptions, SearchProvider, SearchResponse};

#[derive(Clone, Debug)]
pub struct HttpSearchSettings {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub timeout: Duration,
    pub retailer: Option<String>,
}

/// Client for a remote product search service exposing
/// `GET {base_url}/products/search`.
#[derive(Clone, Debug)]
pub struct HttpSearchProvider {
    client: reqwest::Client,
    settings: HttpSearchSettings,
}

impl HttpSearchProvider {
    pub fn new(settings: HttpSearchSettings) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|error| SearchError::Unavailable(error.to_string()))?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!("{}/products/search", self.settings.base_url.trim_end_matches('/'))
    }

    fn query_params(&self, query: &str, options: &SearchOptions) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.trim().to_owned()),
            ("limit", options.max_results.to_string()),
            ("min_confidence", options.min_confidence.to_string()),
        ];
        if let Some(category) = &options.category {
            params.push(("category", category.clone()));
        }
        if let Some(brand) = &options.brand {
            params.push(("brand", brand.clone()));
        }
        if let Some(retailer) = &self.settings.retailer {
            params.push(("retailer", retailer.clone()));
        }
        params
    }
}

fn transport_error(error: reqwest::Error) -> SearchError {
    if error.is_timeout() {
        SearchError::Timeout
    } else {
        SearchError::Unavailable(error.to_string())
    }
}

pub(crate) fn decode_response(body: &[u8]) -> Result<SearchResponse, SearchError> {
    let mut response: SearchResponse = serde_json::from_slice(body)
        .map_err(|error| SearchError::Malformed(error.to_string()))?;
    response.total_found = response.total_found.max(response.products.len());
    Ok(response)
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResponse, SearchError> {
        let params = self.query_params(query, options);
        let mut request = self.client.get(self.endpoint()).query(&params);
        if let Some(api_key) = &self.settings.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status { status: status.as_u16() });
        }

        let body = response.bytes().await.map_err(transport_error)?;
        let decoded = decode_response(&body)?;
        debug!(
            event_name = "matching.search.completed",
            returned = decoded.products.len(),
            total_found = decoded.total_found,
            "search backend responded"
        );
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::product::Availability;

    fn settings(base_url: &str) -> HttpSearchSettings {
        HttpSearchSettings {
            base_url: base_url.to_owned(),
            api_key: None,
            timeout: Duration::from_millis(500),
            retailer: Some("store-12".to_owned()),
        }
    }

    #[test]
    fn decodes_wire_payload() {
        let response = decode_response(
            br#"{
                "products": [
                    {"id":"p-1","name":"Whole Milk","brand":"Horizon","price":4.99,
                     "availability":"in_stock"},
                    {"id":"p-2","name":"2% Milk","availability":"discontinued"}
                ],
                "totalFound": 42
            }"#,
        )
        .expect("payload should decode");

        assert_eq!(response.total_found, 42);
        assert_eq!(response.products[0].price, Some(Decimal::new(499, 2)));
        assert_eq!(response.products[0].availability, Availability::InStock);
        assert_eq!(response.products[1].availability, Availability::Unknown);
    }

    #[test]
    fn missing_total_defaults_to_product_count() {
        let response = decode_response(br#"{"products":[{"id":"p","name":"Eggs"}]}"#)
            .expect("payload should decode");
        assert_eq!(response.total_found, 1);
    }

    #[test]
    fn malformed_payload_is_reported() {
        let error = decode_response(b"<html>502</html>").expect_err("not json");
        assert!(matches!(error, SearchError::Malformed(_)));

        let error = decode_response(br#"{"items":[]}"#).expect_err("wrong shape");
        assert!(matches!(error, SearchError::Malformed(_)));
    }

    #[test]
    fn builds_endpoint_and_query() {
        let provider = HttpSearchProvider::new(settings("https://search.example.com/api/"))
            .expect("client should build");
        let params = provider.query_params(
            " whole milk ",
            &SearchOptions { brand: Some("Horizon".to_owned()), ..SearchOptions::default() },
        );

        assert_eq!(provider.endpoint(), "https://search.example.com/api/products/search");
        assert!(params.contains(&("q", "whole milk".to_owned())));
        assert!(params.contains(&("limit", "10".to_owned())));
        assert!(params.contains(&("brand", "Horizon".to_owned())));
        assert!(params.contains(&("retailer", "store-12".to_owned())));
        assert!(!params.iter().any(|(name, _)| *name == "category"));
    }

    #[tokio::test]
    async fn unreachable_backend_surfaces_as_search_error() {
        let provider =
            HttpSearchProvider::new(settings("http://127.0.0.1:9")).expect("client should build");

        let error = provider
            .search("milk", &SearchOptions::default())
            .await
            .expect_err("nothing listens on the discard port");

        assert!(matches!(error, SearchError::Unavailable(_) | SearchError::Timeout));
    }
}
