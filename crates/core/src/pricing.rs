//! Optional multi-source price comparison for a best match

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::item::CartItem;
use crate::domain::product::{Availability, CandidateProduct, ProductId};

/// Source name used for the price carried on the search result itself
pub const SEARCH_PRICE_SOURCE: &str = "search";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePrice {
    pub source: String,
    pub price: Decimal,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

fn default_in_stock() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingInfo {
    pub sources: Vec<SourcePrice>,
    pub lowest: Option<SourcePrice>,
    pub highest: Option<Decimal>,
    pub average: Option<Decimal>,
    pub potential_savings: Decimal,
    pub estimated_total: Option<Decimal>,
}

impl PricingInfo {
    /// Summarizes quotes from several sources. In-stock quotes are preferred; when
    /// every source is out of stock all quotes are compared.
    pub fn from_sources(sources: Vec<SourcePrice>, quantity: Option<f64>) -> Self {
        let in_stock: Vec<&SourcePrice> = sources.iter().filter(|quote| quote.in_stock).collect();
        let considered: Vec<&SourcePrice> =
            if in_stock.is_empty() { sources.iter().collect() } else { in_stock };

        let lowest =
            considered.iter().min_by_key(|quote| quote.price).map(|quote| (*quote).clone());
        let highest = considered.iter().map(|quote| quote.price).max();
        let average = if considered.is_empty() {
            None
        } else {
            let sum: Decimal = considered.iter().map(|quote| quote.price).sum();
            Some((sum / Decimal::from(considered.len())).round_dp(2))
        };
        let potential_savings = match (&lowest, highest) {
            (Some(lowest), Some(highest)) => highest - lowest.price,
            _ => Decimal::ZERO,
        };
        let quantity = quantity.and_then(Decimal::from_f64).unwrap_or(Decimal::ONE);
        let estimated_total = lowest.as_ref().map(|lowest| (lowest.price * quantity).round_dp(2));

        Self { sources, lowest, highest, average, potential_savings, estimated_total }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("price source unavailable: {0}")]
    Unavailable(String),
    #[error("price source returned an invalid quote: {0}")]
    InvalidQuote(String),
}

#[async_trait]
pub trait PriceAggregator: Send + Sync {
    async fn multi_source_pricing(
        &self,
        item: &CartItem,
        best_match: Option<&CandidateProduct>,
    ) -> Result<Option<PricingInfo>, PricingError>;
}

/// Price table keyed by product id, merged with the price on the search result.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct StaticPriceBook {
    quotes: HashMap<ProductId, Vec<SourcePrice>>,
}

impl StaticPriceBook {
    pub fn new(quotes: HashMap<ProductId, Vec<SourcePrice>>) -> Self {
        Self { quotes }
    }

    pub fn from_json(raw: &str) -> Result<Self, PricingError> {
        serde_json::from_str(raw).map_err(|error| PricingError::InvalidQuote(error.to_string()))
    }
}

#[async_trait]
impl PriceAggregator for StaticPriceBook {
    async fn multi_source_pricing(
        &self,
        item: &CartItem,
        best_match: Option<&CandidateProduct>,
    ) -> Result<Option<PricingInfo>, PricingError> {
        let Some(best_match) = best_match else {
            return Ok(None);
        };

        let mut sources = self.quotes.get(&best_match.id).cloned().unwrap_or_default();
        if let Some(price) = best_match.price {
            sources.push(SourcePrice {
                source: SEARCH_PRICE_SOURCE.to_owned(),
                price,
                in_stock: best_match.availability != Availability::OutOfStock,
            });
        }

        if let Some(negative) = sources.iter().find(|quote| quote.price.is_sign_negative()) {
            return Err(PricingError::InvalidQuote(format!(
                "negative price from `{}`",
                negative.source
            )));
        }

        if sources.is_empty() {
            return Ok(None);
        }
        Ok(Some(PricingInfo::from_sources(sources, item.quantity)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(source: &str, cents: i64, in_stock: bool) -> SourcePrice {
        SourcePrice { source: source.to_owned(), price: Decimal::new(cents, 2), in_stock }
    }

    #[test]
    fn summarizes_in_stock_quotes() {
        let info = PricingInfo::from_sources(
            vec![quote("a", 499, true), quote("b", 399, false), quote("c", 549, true)],
            Some(2.0),
        );

        assert_eq!(info.lowest.as_ref().map(|q| q.source.as_str()), Some("a"));
        assert_eq!(info.highest, Some(Decimal::new(549, 2)));
        assert_eq!(info.average, Some(Decimal::new(524, 2)));
        assert_eq!(info.potential_savings, Decimal::new(50, 2));
        assert_eq!(info.estimated_total, Some(Decimal::new(998, 2)));
        assert_eq!(info.sources.len(), 3);
    }

    #[test]
    fn falls_back_to_all_quotes_when_nothing_is_in_stock() {
        let info =
            PricingInfo::from_sources(vec![quote("a", 300, false), quote("b", 250, false)], None);

        assert_eq!(info.lowest.map(|q| q.price), Some(Decimal::new(250, 2)));
        assert_eq!(info.estimated_total, Some(Decimal::new(250, 2)));
    }

    #[test]
    fn empty_sources_have_no_summary() {
        let info = PricingInfo::from_sources(Vec::new(), Some(3.0));
        assert_eq!(info.lowest, None);
        assert_eq!(info.average, None);
        assert_eq!(info.potential_savings, Decimal::ZERO);
        assert_eq!(info.estimated_total, None);
    }

    #[tokio::test]
    async fn price_book_merges_search_price() {
        let book = StaticPriceBook::from_json(
            r#"{"milk-1": [
                {"source": "grocer-a", "price": "4.49"},
                {"source": "grocer-b", "price": "5.19"}
            ]}"#,
        )
        .expect("price book");
        let best = CandidateProduct::new("milk-1", "Whole Milk")
            .with_price(Decimal::new(479, 2))
            .with_availability(Availability::InStock);

        let info = book
            .multi_source_pricing(&CartItem::new("1", "milk"), Some(&best))
            .await
            .expect("pricing")
            .expect("pricing info");

        assert_eq!(info.sources.len(), 3);
        assert_eq!(info.lowest.map(|q| q.source), Some("grocer-a".to_owned()));
        assert_eq!(info.potential_savings, Decimal::new(70, 2));
    }

    #[tokio::test]
    async fn no_best_match_means_no_pricing() {
        let book = StaticPriceBook::default();
        let info = book.multi_source_pricing(&CartItem::new("1", "milk"), None).await;
        assert_eq!(info, Ok(None));
    }

    #[tokio::test]
    async fn negative_quotes_are_rejected() {
        let book = StaticPriceBook::from_json(r#"{"p":[{"source":"bad","price":"-1.00"}]}"#)
            .expect("price book");
        let best = CandidateProduct::new("p", "Eggs");

        let error = book
            .multi_source_pricing(&CartItem::new("1", "eggs"), Some(&best))
            .await
            .expect_err("negative price");
        assert!(matches!(error, PricingError::InvalidQuote(_)));
    }
}
