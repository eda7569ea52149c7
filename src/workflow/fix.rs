use crate::autofix::{cleanup_previous_fork, AutoFixJob, FixTarget, ForkPollPolicy, JobState, PatchedFile};
use crate::error::Result;
use crate::platform::types::{CreateGist, GistFile};
use crate::queue::task::{FixCommand, FixTrigger};
use crate::review::diff::FileChangeSet;
use crate::review::engine::{FormattedFile, StyleCheckEngine};
use crate::server::AppState;
use crate::tools::FormatMode;
use crate::workflow::load_rules;
use crate::workflow::types::WorkflowOutcome;

/// A fix command resolved against its pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixRequest {
    pub repository: String,
    pub pr_number: u64,
    /// Where the pull request's commits live; a fork for outside contributors.
    pub head_repository: String,
    pub head_branch: String,
    pub head_sha: String,
    pub base_branch: String,
    pub requester: String,
    pub comment_url: String,
    pub command: FixCommand,
}

/// Run the formatter over the pull request and either publish the diff or
/// open a pull request with the fixes. The result is reported back on the
/// pull request either way.
pub async fn handle_fix_request(state: &AppState, trigger: &FixTrigger) -> Result<WorkflowOutcome> {
    let platform = state.platform.as_ref();
    let config = &state.config;

    let pr = platform
        .get_pull_request(&trigger.repository, trigger.pr_number)
        .await?;
    let request = FixRequest {
        repository: trigger.repository.clone(),
        pr_number: trigger.pr_number,
        head_repository: pr
            .head_repo
            .clone()
            .unwrap_or_else(|| trigger.repository.clone()),
        head_branch: pr.head_branch.clone(),
        head_sha: pr.head_sha.clone(),
        base_branch: pr.base_branch.clone(),
        requester: trigger.requester.clone(),
        comment_url: trigger.comment_url.clone(),
        command: trigger.command,
    };

    let rules = load_rules(
        platform,
        &request.repository,
        &request.base_branch,
        &config.review.config_file,
    )
    .await;
    let diff = platform
        .get_pull_request_diff(&request.repository, request.pr_number)
        .await?;
    let files = FileChangeSet::parse(&diff)?.source_files_only(&rules.exclusions());

    let mode = match request.command {
        FixCommand::SuggestDiff => FormatMode::Diff,
        FixCommand::Pep8ify => FormatMode::Rewrite,
    };
    let engine = StyleCheckEngine::new(
        platform,
        &config.github.web_base,
        config.review.max_concurrent_files,
    );
    let formatted = engine
        .format(
            state.formatter.as_ref(),
            &request.repository,
            &request.head_sha,
            &files,
            &rules,
            mode,
        )
        .await;

    let (outcome, reply) = match request.command {
        FixCommand::SuggestDiff => suggest_diff(state, &request, formatted.files).await?,
        FixCommand::Pep8ify => pep8ify(state, &request, formatted.files).await,
    };

    platform
        .create_comment(&request.repository, request.pr_number, &reply)
        .await?;

    Ok(outcome)
}

async fn suggest_diff(
    state: &AppState,
    request: &FixRequest,
    files: Vec<FormattedFile>,
) -> Result<(WorkflowOutcome, String)> {
    let gist_files: Vec<GistFile> = files
        .into_iter()
        .filter(|f| !f.output.trim().is_empty())
        .map(|f| GistFile {
            name: format!("{}.diff", basename(&f.path)),
            content: f.output,
        })
        .collect();

    if gist_files.is_empty() {
        let reply = format!(
            "@{} autopep8 has nothing to change in this Pull Request.",
            request.requester
        );
        return Ok((WorkflowOutcome::NoChanges, reply));
    }

    let gist = CreateGist {
        description: format!(
            "In response to @{}'s comment : {}",
            request.requester, request.comment_url
        ),
        public: true,
        files: gist_files,
    };
    let url = state.platform.create_gist(&gist).await?;
    tracing::info!(repo = %request.repository, pr = request.pr_number, url = %url, "Published diff gist");

    let bot = state.config.bot();
    let reply = format!(
        "Here you go with [the gist]({url}) !\n\n\
         > You can ask me to create a PR against this branch with those fixes. \
         Simply comment `{} pep8ify`.",
        bot.mention()
    );
    Ok((WorkflowOutcome::GistCreated { url }, reply))
}

async fn pep8ify(
    state: &AppState,
    request: &FixRequest,
    files: Vec<FormattedFile>,
) -> (WorkflowOutcome, String) {
    let patched: Vec<PatchedFile> = files
        .into_iter()
        .map(|f| PatchedFile {
            path: f.path,
            content: f.output,
        })
        .collect();
    if patched.is_empty() {
        let reply = format!(
            "@{} There are no Python files to fix in this Pull Request.",
            request.requester
        );
        return (WorkflowOutcome::NoChanges, reply);
    }

    let platform = state.platform.as_ref();
    let config = &state.config;

    if let Err(e) = cleanup_previous_fork(platform, &request.head_repository).await {
        tracing::warn!(repo = %request.head_repository, error = %e, "Could not remove previous fork");
    }

    let target = FixTarget {
        repository: request.head_repository.clone(),
        branch: request.head_branch.clone(),
    };
    let job = AutoFixJob::new(target)
        .run(
            platform,
            &config.github.bot_login,
            &patched,
            ForkPollPolicy::from(&config.autofix),
        )
        .await;

    let mut notes = String::new();
    for failure in &job.patch_failures {
        notes.push_str(&format!("\n- {failure}"));
    }
    for warning in &job.warnings {
        notes.push_str(&format!("\n- {warning}"));
    }
    if !notes.is_empty() {
        notes = format!("\n\nSome steps did not go through:{notes}");
    }

    match job.state {
        JobState::PrCreated { url } => {
            let reply = format!(
                "@{} I have created [a Pull Request]({url}) with the fixes suggested by autopep8 \
                 against `{}:{}`.{notes}",
                request.requester, request.head_repository, request.head_branch
            );
            (WorkflowOutcome::FixPullRequestCreated { url }, reply)
        }
        JobState::Failed(error) => {
            let reply = format!(
                "@{} Sorry, I could not open a Pull Request with the fixes ({}): {error}{notes}",
                request.requester,
                error.stage()
            );
            let outcome = WorkflowOutcome::FixFailed {
                stage: error.stage(),
                reason: error.to_string(),
            };
            (outcome, reply)
        }
        other => {
            let reply = format!(
                "@{} Sorry, the fix stopped unexpectedly.",
                request.requester
            );
            let outcome = WorkflowOutcome::FixFailed {
                stage: "pr_creation",
                reason: format!("job ended in {other:?}"),
            };
            (outcome, reply)
        }
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
