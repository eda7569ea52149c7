use crate::review::comment_state::CommentDecision;

/// Outcome of a workflow execution.
#[derive(Debug)]
pub enum WorkflowOutcome {
    /// The event did not call for any work.
    Skipped { reason: String },
    /// The review ran; what happened to the summary comment.
    Reviewed(CommentDecision),
    /// Diff preview published as a gist.
    GistCreated { url: String },
    /// Fix pull request opened.
    FixPullRequestCreated { url: String },
    /// The formatter had nothing to change.
    NoChanges,
    /// The fix flow stopped at `stage`.
    FixFailed { stage: &'static str, reason: String },
    /// Repositories newly added to the installation list.
    InstallationsRecorded { added: usize },
}
