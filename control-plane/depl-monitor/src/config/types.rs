use std::time::Duration;

use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct ControllerConfig {
    /// Restrict the watch to one namespace; all namespaces when unset.
    /// Env: DEPL_MONITOR_WATCH_NAMESPACE
    #[envconfig(from = "DEPL_MONITOR_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    #[envconfig(from = "DEPL_MONITOR_FIELD_MANAGER", default = "depl-monitor")]
    pub field_manager: String,

    /// Requeue delay when a pass asks for a retry without an error.
    #[envconfig(from = "DEPL_MONITOR_RETRY_SECS", default = "1")]
    pub retry_secs: u64,

    /// Requeue delay after a failed pass.
    #[envconfig(from = "DEPL_MONITOR_ERROR_BACKOFF_SECS", default = "5")]
    pub error_backoff_secs: u64,

    /// Deadline shared by every store call of one pass.
    #[envconfig(from = "DEPL_MONITOR_PASS_TIMEOUT_SECS", default = "30")]
    pub pass_timeout_secs: u64,

    /// How many times a pass re-reads and recomputes after a write conflict.
    #[envconfig(from = "DEPL_MONITOR_MAX_CONFLICT_RETRIES", default = "3")]
    pub max_conflict_retries: u32,

    /// Republish status.active on the update path when it is missing or stale.
    /// Env: DEPL_MONITOR_HEAL_STATUS
    #[envconfig(from = "DEPL_MONITOR_HEAL_STATUS", default = "true")]
    pub heal_status: bool,

    #[envconfig(from = "DEPL_MONITOR_LOG", default = "info")]
    pub log: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            field_manager: "depl-monitor".into(),
            retry_secs: 1,
            error_backoff_secs: 5,
            pass_timeout_secs: 30,
            max_conflict_retries: 3,
            heal_status: true,
            log: "info".into(),
        }
    }
}

impl ControllerConfig {
    pub fn retry_after(&self) -> Duration {
        Duration::from_secs(self.retry_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn pass_timeout(&self) -> Duration {
        Duration::from_secs(self.pass_timeout_secs)
    }
}
