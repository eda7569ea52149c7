use crate::review::ReviewRequest;

/// What a fix-request comment asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixCommand {
    /// Publish the formatter's diff as a gist.
    SuggestDiff,
    /// Open a pull request with the formatter's fixes.
    Pep8ify,
}

impl FixCommand {
    /// Find a command in a comment body. `suggest diff` wins if both appear.
    pub fn parse(body: &str) -> Option<Self> {
        let body = body.to_lowercase();
        if body.contains("suggest diff") {
            Some(FixCommand::SuggestDiff)
        } else if body.contains("pep8ify") {
            Some(FixCommand::Pep8ify)
        } else {
            None
        }
    }
}

/// A fix command posted on a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixTrigger {
    pub repository: String,
    pub pr_number: u64,
    pub requester: String,
    pub comment_url: String,
    pub command: FixCommand,
}

/// Tasks that can be enqueued for processing.
#[derive(Debug, Clone)]
pub enum Task {
    ReviewPullRequest(ReviewRequest),
    Fix(FixTrigger),
}

impl Task {
    pub fn repo_full_name(&self) -> &str {
        match self {
            Task::ReviewPullRequest(request) => &request.repository,
            Task::Fix(trigger) => &trigger.repository,
        }
    }

    pub fn description(&self) -> String {
        match self {
            Task::ReviewPullRequest(request) => format!(
                "Review PR #{} on {} at {}",
                request.pr_number, request.repository, request.head_sha
            ),
            Task::Fix(trigger) => format!(
                "{:?} for PR #{} on {}",
                trigger.command, trigger.pr_number, trigger.repository
            ),
        }
    }
}
