//! Provider integration tests. The in-memory provider is covered by its
//! unit tests; here the REST provider runs against an in-process stub
//! speaking the same dialect as the hosted backend.

mod rest_tests;
