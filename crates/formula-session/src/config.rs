//! Session manager configuration.

/// Settings for a spawned session manager.
///
/// Create one with `SessionConfig::default()` and override the fields you
/// care about.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Capacity of the command channel between handles and the manager
    /// task. When it's full, `login` / `refresh` callers wait.
    pub command_buffer: usize,

    /// Re-fetch the current session when the manager falls behind the
    /// provider's change stream and misses notifications.
    pub resync_on_lag: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_buffer: 32,
            resync_on_lag: true,
        }
    }
}
