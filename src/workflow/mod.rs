pub mod fix;
pub mod install;
pub mod review;
pub mod types;

use crate::platform::Platform;
use crate::review::rules::RuleConfig;

/// Review rules for a repository, read from `branch`. A missing or
/// unreadable file leaves the defaults in force.
pub(crate) async fn load_rules(
    platform: &dyn Platform,
    repository: &str,
    branch: &str,
    config_file: &str,
) -> RuleConfig {
    match platform.get_repo_config(repository, branch, config_file).await {
        Ok(raw) => RuleConfig::resolve(raw.as_deref()),
        Err(e) => {
            tracing::warn!(repo = %repository, branch = %branch, error = %e, "Could not fetch repository config, using defaults");
            RuleConfig::default()
        }
    }
}
