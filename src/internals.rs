use std::time::Duration;

/// Default timeout duration for waiting for responses from the controller.
pub const FLOWBENCH_DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
