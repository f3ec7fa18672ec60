use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use cartmatch_core::domain::matching::ValidationFlag;
use cartmatch_core::{
    parse_cart_items, ApplicationError, BatchCancellation, CandidateProduct, CartItem,
    MatchOptions, MatchingEngine, SearchError, SearchOptions, SearchProvider, SearchResponse,
};

type BatchTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

/// Echoes the query back as a single product after a random delay.
#[derive(Default)]
struct JitterySearch {
    calls: AtomicUsize,
}

#[async_trait]
impl SearchProvider for JitterySearch {
    async fn search(
        &self,
        query: &str,
        _options: &SearchOptions,
    ) -> Result<SearchResponse, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = rand::thread_rng().gen_range(0..25u64);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        if query.contains("outage") {
            return Err(SearchError::Unavailable("connection reset".to_owned()));
        }
        let product = CandidateProduct::new(format!("sku-{query}"), query.to_owned());
        Ok(SearchResponse { products: vec![product], total_found: 1 })
    }
}

fn options() -> MatchOptions {
    MatchOptions { window_size: 3, pacing_delay_ms: 0, ..MatchOptions::default() }
}

fn numbered_items(count: usize) -> Vec<CartItem> {
    (0..count).map(|n| CartItem::new(format!("item-{n}"), format!("product {n}"))).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ten_items_come_back_complete_and_in_order() -> BatchTestResult {
    let search = Arc::new(JitterySearch::default());
    let engine = MatchingEngine::new(search.clone(), &options());

    let batch = engine.validate_cart_items(numbered_items(10), &options()).await;

    require!(batch.results.len() == 10, "expected 10 results, got {}", batch.results.len());
    for (index, result) in batch.results.iter().enumerate() {
        let expected = format!("item-{index}");
        require!(
            result.original_item.id.as_str() == expected,
            "result {index} belongs to {}",
            result.original_item.id.as_str()
        );
        let best = result.best_match.as_ref().map(|product| product.name.as_str());
        require!(best == Some(result.original_item.raw_name.as_str()), "wrong match for {index}");
    }
    require!(batch.summary.total_items == 10);
    require!(batch.summary.matched == 10);
    require!(!batch.cancelled);
    require!(search.calls.load(Ordering::SeqCst) == 10);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn outage_for_one_item_does_not_sink_the_batch() -> BatchTestResult {
    let engine = MatchingEngine::new(Arc::new(JitterySearch::default()), &options());
    let mut items = numbered_items(6);
    items[4] = CartItem::new("item-4", "outage special");

    let batch = engine.validate_cart_items(items, &options()).await;

    require!(batch.results[4].has_flag(ValidationFlag::ValidationFailed));
    require!(batch.results[4].best_match.is_none());
    require!(batch.summary.failed == 1);
    require!(batch.summary.matched == 5);
    Ok(())
}

#[tokio::test]
async fn cache_is_shared_across_batches() -> BatchTestResult {
    let search = Arc::new(JitterySearch::default());
    let engine = MatchingEngine::new(search.clone(), &options());

    let first = engine.validate_cart_items(numbered_items(4), &options()).await;
    let second = engine.validate_cart_items(numbered_items(4), &options()).await;

    require!(search.calls.load(Ordering::SeqCst) == 4, "second batch should hit the cache");
    require!(engine.cache().stats().hits == 4);
    for (left, right) in first.results.iter().zip(&second.results) {
        require!(left.best_match == right.best_match);
        require!(left.confidence == right.confidence);
    }
    require!(first.batch_id != second.batch_id);
    Ok(())
}

#[tokio::test]
async fn cancelled_batch_keeps_one_result_per_item() -> BatchTestResult {
    let engine = MatchingEngine::new(Arc::new(JitterySearch::default()), &options());
    let cancellation = BatchCancellation::new();
    cancellation.cancel();

    let batch =
        engine.validate_cart_items_with(numbered_items(5), &options(), &cancellation).await;

    require!(batch.cancelled);
    require!(batch.results.len() == 5);
    require!(batch.results.iter().all(|result| result.has_flag(ValidationFlag::NotProcessed)));
    require!(batch.summary.needs_review == 5);
    Ok(())
}

#[tokio::test]
async fn parsed_payload_flows_through_the_engine() -> BatchTestResult {
    let items = parse_cart_items(
        r#"[
            {"id": "a", "name": "product 1", "quantity": 2},
            {"id": "b", "raw_name": "   "}
        ]"#,
    )
    .map_err(|err| format!("payload should parse: {err}"))?;
    let engine = MatchingEngine::new(Arc::new(JitterySearch::default()), &options());

    let batch = engine.validate_cart_items(items, &options()).await;

    require!(batch.results[0].best_match.is_some());
    require!(batch.results[1].has_flag(ValidationFlag::ValidationFailed));
    Ok(())
}

#[test]
fn non_array_payload_is_the_only_fatal_input_error() -> BatchTestResult {
    let error = parse_cart_items(r#"{"items": []}"#);
    require!(matches!(error, Err(ApplicationError::MalformedInput(_))));
    require!(matches!(parse_cart_items("[]"), Ok(ref items) if items.is_empty()));
    Ok(())
}
