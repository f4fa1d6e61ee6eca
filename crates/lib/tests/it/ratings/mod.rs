//! Rating persistence across store save/load cycles. Validation and
//! in-memory behavior are covered by the module's unit tests.
