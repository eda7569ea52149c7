use crate::error::Result;
use crate::server::AppState;
use crate::workflow::types::WorkflowOutcome;

/// Add newly installed repositories to the installation list.
pub async fn handle_installation_event(
    state: &AppState,
    repositories: &[String],
) -> Result<WorkflowOutcome> {
    let mut added = 0;
    for repository in repositories {
        if state.installations.insert(repository).await? {
            tracing::info!(repo = %repository, "Recorded installation");
            added += 1;
        } else {
            tracing::debug!(repo = %repository, "Installation already recorded");
        }
    }
    Ok(WorkflowOutcome::InstallationsRecorded { added })
}
