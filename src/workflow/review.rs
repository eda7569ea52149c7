use chrono::Utc;

use crate::error::Result;
use crate::review::comment_state;
use crate::review::compose::compose;
use crate::review::diff::FileChangeSet;
use crate::review::engine::StyleCheckEngine;
use crate::review::ReviewRequest;
use crate::server::AppState;
use crate::workflow::load_rules;
use crate::workflow::types::WorkflowOutcome;

/// Review the lines a pull request changes and publish the summary comment.
pub async fn handle_pull_request_event(
    state: &AppState,
    request: &ReviewRequest,
) -> Result<WorkflowOutcome> {
    if !request.action.is_reviewable() {
        return Ok(WorkflowOutcome::Skipped {
            reason: format!("action {:?} is not reviewed", request.action),
        });
    }

    let platform = state.platform.as_ref();
    let config = &state.config;

    let rules = load_rules(
        platform,
        &request.repository,
        &request.base_branch,
        &config.review.config_file,
    )
    .await;

    tracing::debug!(repo = %request.repository, pr = request.pr_number, diff_url = %request.diff_url, "Fetching diff");
    let diff = platform
        .get_pull_request_diff(&request.repository, request.pr_number)
        .await?;
    let changes = FileChangeSet::parse(&diff)?;
    let files = changes.source_files_only(&rules.exclusions());

    tracing::info!(
        repo = %request.repository,
        pr = request.pr_number,
        changed = changes.len(),
        checked = files.len(),
        "Reviewing pull request"
    );

    let engine = StyleCheckEngine::new(
        platform,
        &config.github.web_base,
        config.review.max_concurrent_files,
    );
    let outcome = engine
        .check(
            state.checker.as_ref(),
            &request.repository,
            &request.head_sha,
            &files,
            &rules,
        )
        .await;

    let artifact = compose(request.action, &request.author, &rules, &outcome.results);
    let decision = comment_state::publish(
        platform,
        &config.bot(),
        request,
        &artifact,
        rules.no_blank_comment,
        Utc::now(),
    )
    .await?;

    Ok(WorkflowOutcome::Reviewed(decision))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::AppError;
    use crate::platform::fake::FakePlatform;
    use crate::review::comment_state::{CommentDecision, SuppressReason};
    use crate::review::PrAction;
    use crate::tools::testing::{ScriptedChecker, ScriptedFormatter};
    use crate::workflow::testing::{self, APP_PY, HEAD_SHA, PR, REPO};

    fn request(action: PrAction) -> ReviewRequest {
        ReviewRequest {
            repository: REPO.to_string(),
            pr_number: PR,
            head_sha: HEAD_SHA.to_string(),
            base_branch: "main".to_string(),
            action,
            author: "alice".to_string(),
            pr_title: "Add x".to_string(),
            pr_description: String::new(),
            commits_url: format!("https://api.github.com/repos/{REPO}/pulls/{PR}/commits"),
            diff_url: format!("https://github.com/{REPO}/pull/{PR}.diff"),
        }
    }

    fn checker() -> ScriptedChecker {
        ScriptedChecker::new().output(
            APP_PY,
            "file_to_check.py:2:2: E225 missing whitespace around operator",
        )
    }

    #[tokio::test]
    async fn test_review_creates_then_updates_single_comment() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(testing::platform());
        let state = testing::state(&dir, platform.clone(), checker(), ScriptedFormatter::new(""));

        let outcome = handle_pull_request_event(&state, &request(PrAction::Opened))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            WorkflowOutcome::Reviewed(CommentDecision::Create { .. })
        ));

        let comments = platform.comments(REPO, PR);
        assert_eq!(comments.len(), 1);
        let body = &comments[0].body;
        assert!(body.starts_with("Hello @alice! Thanks for submitting the PR.\n\n"));
        assert!(body.contains(
            "[Line 2:2](https://github.com/alice/widgets/blob/abc123/app.py#L2): [E225]"
        ));
        // Excluded by the repository config, and not Python.
        assert!(!body.contains("six.py"));
        assert!(!body.contains("README"));

        let outcome = handle_pull_request_event(&state, &request(PrAction::Synchronize))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            WorkflowOutcome::Reviewed(CommentDecision::Update { .. })
        ));
        let comments = platform.comments(REPO, PR);
        assert_eq!(comments.len(), 1);
        assert!(comments[0]
            .body
            .starts_with("Hello @alice! Thanks for updating the PR."));
        assert!(comments[0].body.contains("##### Comment last updated on"));

        let calls = platform.calls();
        assert!(!calls.iter().any(|c| c.contains("vendor/six.py")));
    }

    #[tokio::test]
    async fn test_clean_pull_request_gets_no_new_comment() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(testing::platform());
        let state = testing::state(
            &dir,
            platform.clone(),
            ScriptedChecker::new(),
            ScriptedFormatter::new(""),
        );

        let outcome = handle_pull_request_event(&state, &request(PrAction::Opened))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            WorkflowOutcome::Reviewed(CommentDecision::Nothing)
        ));
        assert!(platform.comments(REPO, PR).is_empty());
    }

    #[tokio::test]
    async fn test_skip_directive_in_title() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(testing::platform());
        let state = testing::state(&dir, platform.clone(), checker(), ScriptedFormatter::new(""));

        let mut request = request(PrAction::Opened);
        request.pr_title = "WIP [skip pep8]".to_string();
        let outcome = handle_pull_request_event(&state, &request).await.unwrap();
        assert!(matches!(
            outcome,
            WorkflowOutcome::Reviewed(CommentDecision::Suppressed(SuppressReason::SkipDirective))
        ));
        assert!(platform.comments(REPO, PR).is_empty());
    }

    #[tokio::test]
    async fn test_malformed_diff_aborts_without_comment() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(testing::platform().with(|s| {
            s.diffs.insert(
                (REPO.to_string(), PR),
                "diff --git a/a.py b/a.py\n--- a/a.py\n+++ b/a.py\n@@ -1 +1,3 @@\n+only one\n"
                    .to_string(),
            );
        }));
        let state = testing::state(&dir, platform.clone(), checker(), ScriptedFormatter::new(""));

        let result = handle_pull_request_event(&state, &request(PrAction::Opened)).await;
        assert!(matches!(result, Err(AppError::DiffParse(_))));
        assert!(!platform
            .calls()
            .iter()
            .any(|c| c.starts_with("create_comment")));
    }

    #[tokio::test]
    async fn test_closed_action_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(FakePlatform::new());
        let state = testing::state(&dir, platform.clone(), checker(), ScriptedFormatter::new(""));

        let outcome = handle_pull_request_event(&state, &request(PrAction::Other))
            .await
            .unwrap();
        assert!(matches!(outcome, WorkflowOutcome::Skipped { .. }));
        assert!(platform.calls().is_empty());
    }
}
