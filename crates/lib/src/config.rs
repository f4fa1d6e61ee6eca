//! Tuning knobs for the session reconciler.

use std::time::Duration;

/// Default attempt budget for profile reads after an explicit auth flow.
pub const DEFAULT_POST_AUTH_PROFILE_ATTEMPTS: u32 = 5;

/// Default attempt budget for profile reads during plain hydration.
pub const DEFAULT_HYDRATE_PROFILE_ATTEMPTS: u32 = 3;

/// Default fixed delay between profile read attempts.
pub const DEFAULT_PROFILE_RETRY_BACKOFF: Duration = Duration::from_millis(400);

/// Default upper bound on how long the session may report loading at startup.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration for a [`SessionManager`](crate::session::SessionManager).
///
/// Profile rows created at registration may not be immediately visible to a
/// subsequent read (replication lag in the external store), so post-auth
/// flows re-read with a bounded budget before degrading. The startup timeout
/// guarantees observers are never stuck on a loading state when the
/// provider's event stream stays silent, e.g. on an offline first launch.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Profile read attempts after login, registration, or a session event.
    pub post_auth_profile_attempts: u32,

    /// Profile read attempts during hydration of a persisted session.
    pub hydrate_profile_attempts: u32,

    /// Fixed delay between consecutive profile read attempts.
    pub profile_retry_backoff: Duration,

    /// How long the reconciler may stay in the initial unknown state before
    /// it settles to signed-out on its own.
    pub startup_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            post_auth_profile_attempts: DEFAULT_POST_AUTH_PROFILE_ATTEMPTS,
            hydrate_profile_attempts: DEFAULT_HYDRATE_PROFILE_ATTEMPTS,
            profile_retry_backoff: DEFAULT_PROFILE_RETRY_BACKOFF,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }
}
