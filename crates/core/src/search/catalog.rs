use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::product::CandidateProduct;
use crate::matching::{normalize, tokens};

use super::{SearchError, SearchOptions, SearchProvider, SearchResponse};

/// Fixed product list served as a search backend. Any product sharing a
/// normalized token with the query is a hit, in catalog order.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCatalog {
    products: Vec<CandidateProduct>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<CandidateProduct>) -> Self {
        Self { products }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    fn matches(&self, query: &str, options: &SearchOptions) -> Vec<CandidateProduct> {
        let normalized_query = normalize(query);
        let query_tokens: HashSet<&str> = tokens(&normalized_query).into_iter().collect();
        if query_tokens.is_empty() {
            return Vec::new();
        }

        self.products
            .iter()
            .filter(|product| {
                let name = normalize(&product.name);
                tokens(&name).iter().any(|token| query_tokens.contains(token))
            })
            .filter(|product| {
                qualifier_matches(options.category.as_deref(), product.category.as_deref())
                    && qualifier_matches(options.brand.as_deref(), product.brand.as_deref())
            })
            .cloned()
            .collect()
    }
}

fn qualifier_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match (wanted, actual) {
        (None, _) => true,
        (Some(wanted), Some(actual)) => normalize(wanted) == normalize(actual),
        (Some(_), None) => false,
    }
}

#[async_trait]
impl SearchProvider for InMemoryCatalog {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResponse, SearchError> {
        let mut products = self.matches(query, options);
        let total_found = products.len();
        products.truncate(options.max_results);
        Ok(SearchResponse { products, total_found })
    }
}
