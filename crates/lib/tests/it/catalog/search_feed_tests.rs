//! Overlapping, duplicated, and abandoned searches through [`SearchFeed`].

use std::sync::Arc;
use std::time::Duration;

use cinelog::{
    InMemoryCatalog, MovieDetails, RestCatalog, RestCatalogConfig, SearchFeed, SearchState,
};
use url::Url;

/// Block until the watched feed satisfies `predicate`, panicking after
/// `timeout`.
async fn wait_for_state(
    feed: &SearchFeed,
    timeout: Duration,
    predicate: impl Fn(&SearchState) -> bool,
) -> SearchState {
    let mut rx = feed.subscribe();
    tokio::time::timeout(timeout, async move {
        loop {
            let current = rx.borrow_and_update().clone();
            if predicate(&current) {
                return current;
            }
            rx.changed().await.expect("feed watch closed");
        }
    })
    .await
    .expect("search feed did not reach the expected state in time")
}

/// Twelve movies titled `Movie 01` .. `Movie 12`, so one query spans two
/// pages.
fn two_page_catalog() -> InMemoryCatalog {
    let movies = (1..=12)
        .map(|n| MovieDetails {
            id: format!("m-{n:02}"),
            title: format!("Movie {n:02}"),
            overview: String::new(),
            release_date: Some(format!("20{n:02}-01-01")),
            runtime_minutes: Some(100),
            genres: Vec::new(),
            poster_url: None,
            vote_average: 7.0,
        })
        .collect();
    InMemoryCatalog::new(movies)
}

#[tokio::test]
async fn results_arrive_for_a_submitted_query() {
    let feed = SearchFeed::new(Arc::new(InMemoryCatalog::sample()));

    feed.submit("matrix");

    let state = wait_for_state(&feed, Duration::from_secs(1), |s| {
        !s.searching && s.page.is_some()
    })
    .await;
    assert_eq!(state.query, "matrix");
    assert_eq!(state.error, None);
    let page = state.page.unwrap();
    assert_eq!(page.movies.len(), 2);
    assert!(page.movies.iter().all(|m| m.title.contains("Matrix")));
}

#[tokio::test]
async fn stale_results_lose_to_the_newest_submission() {
    let catalog = Arc::new(InMemoryCatalog::sample());
    catalog.set_latency("matrix", Duration::from_millis(150));
    let feed = SearchFeed::new(catalog.clone());

    feed.submit("matrix");
    tokio::time::sleep(Duration::from_millis(20)).await;
    feed.submit("inception");

    let state = wait_for_state(&feed, Duration::from_secs(1), |s| {
        !s.searching && s.page.is_some()
    })
    .await;
    assert_eq!(state.query, "inception");
    assert_eq!(state.page.as_ref().unwrap().movies[0].title, "Inception");

    // Let the slow matrix search land; it must change nothing.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let state = feed.snapshot();
    assert_eq!(state.query, "inception");
    assert_eq!(state.page.unwrap().movies[0].title, "Inception");
    assert_eq!(catalog.search_calls(), 2);
}

#[tokio::test]
async fn identical_resubmission_is_skipped() {
    let catalog = Arc::new(InMemoryCatalog::sample());
    let feed = SearchFeed::new(catalog.clone());

    feed.submit("matrix");
    wait_for_state(&feed, Duration::from_secs(1), |s| !s.searching).await;

    feed.submit("matrix");
    feed.submit("  matrix  ");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(catalog.search_calls(), 1);
}

#[tokio::test]
async fn blank_input_resets_and_invalidates_in_flight_work() {
    let catalog = Arc::new(InMemoryCatalog::sample());
    catalog.set_latency("matrix", Duration::from_millis(100));
    let feed = SearchFeed::new(catalog.clone());

    feed.submit("matrix");
    tokio::time::sleep(Duration::from_millis(20)).await;
    feed.submit("   ");

    // Idle right away, and still idle after the abandoned search lands.
    assert_eq!(feed.snapshot(), SearchState::default());
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(feed.snapshot(), SearchState::default());
    assert_eq!(catalog.search_calls(), 1);
}

#[tokio::test]
async fn pages_advance_under_the_same_query() {
    let feed = SearchFeed::new(Arc::new(two_page_catalog()));

    feed.submit("movie");
    let state = wait_for_state(&feed, Duration::from_secs(1), |s| s.page.is_some()).await;
    let page = state.page.unwrap();
    assert_eq!(page.page, 1);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.movies.len(), 10);

    feed.load_page(2);
    let state = wait_for_state(&feed, Duration::from_secs(1), |s| {
        s.page.as_ref().is_some_and(|p| p.page == 2)
    })
    .await;
    assert_eq!(state.query, "movie");
    assert_eq!(state.page.unwrap().movies.len(), 2);
}

#[tokio::test]
async fn load_page_without_a_query_is_ignored() {
    let catalog = Arc::new(InMemoryCatalog::sample());
    let feed = SearchFeed::new(catalog.clone());

    feed.load_page(2);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(feed.snapshot(), SearchState::default());
    assert_eq!(catalog.search_calls(), 0);
}

#[tokio::test]
async fn failures_publish_an_error_message() {
    // Nothing listens here; the connection is refused immediately.
    let config = RestCatalogConfig::new(Url::parse("http://127.0.0.1:9").unwrap(), "test-key");
    let catalog = Arc::new(RestCatalog::new(config).unwrap());
    let feed = SearchFeed::new(catalog);

    feed.submit("matrix");

    let state = wait_for_state(&feed, Duration::from_secs(5), |s| {
        !s.searching && s.error.is_some()
    })
    .await;
    assert_eq!(state.query, "matrix");
    assert!(state.page.is_none());
}
