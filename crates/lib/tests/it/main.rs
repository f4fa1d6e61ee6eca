/*!
Integration tests for Cinelog.

All integration tests live in this single binary so the suite links once and
shares one set of helpers. See
<https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html>
for the rationale.

Test areas mirror the library modules:

- `session`: the session reconciler end to end (login, registration, logout,
  hydration, provider events, the safety timeout)
- `provider`: the REST identity provider against a stub backend
- `catalog`: search feed race behavior and the REST catalog against a stub
- `ratings`: rating persistence across store reloads
*/

use tracing_subscriber::EnvFilter;

/// Initialize tracing for all tests.
///
/// Runs once before any test. Respects `RUST_LOG` when set and keeps the
/// crate's own output visible by default so failures come with context.
#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("cinelog=debug".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod catalog;
mod provider;
mod ratings;
