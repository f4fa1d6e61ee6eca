//! Catalog integration tests: search feed race behavior over the
//! in-memory catalog, and the REST client against a stub movie API.

mod search_feed_tests;
