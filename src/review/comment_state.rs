use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::platform::types::Comment;
use crate::platform::Platform;
use crate::review::compose::CommentArtifact;
use crate::review::{BotIdentity, ReviewRequest};

/// Directives in a commit message, title or description that turn the
/// review off for the pull request.
pub const SKIP_DIRECTIVES: [&str; 2] = ["[skip pep8]", "[pep8 skip]"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Someone asked the bot to be quiet and has not asked it to resume.
    Quieted,
    /// A skip directive appears in a commit, the title or the description.
    SkipDirective,
}

/// What to do about the summary comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentDecision {
    Suppressed(SuppressReason),
    Create { body: String },
    Update { comment_id: u64, body: String },
    /// Edit-only was requested and there is nothing to edit.
    Nothing,
}

pub fn has_skip_directive(text: &str) -> bool {
    let text = text.to_lowercase();
    SKIP_DIRECTIVES.iter().any(|d| text.contains(d))
}

/// Scan comments newest first. Only other people's comments that mention
/// the bot count; `resume` ends the scan before `quiet` is looked at.
pub fn is_quieted(bot: &BotIdentity, comments: &[Comment]) -> bool {
    for comment in comments.iter().rev() {
        if comment.author_id == bot.id || !bot.is_mentioned_in(&comment.body) {
            continue;
        }
        let body = comment.body.to_lowercase();
        if body.contains("resume") {
            return false;
        }
        if body.contains("quiet") {
            return true;
        }
    }
    false
}

/// The bot's most recent comment, matched on account id only.
pub fn latest_bot_comment<'a>(bot: &BotIdentity, comments: &'a [Comment]) -> Option<&'a Comment> {
    comments.iter().rev().find(|c| c.author_id == bot.id)
}

/// Suffix stamped on an edited comment.
pub fn updated_stamp(now: DateTime<Utc>) -> String {
    format!(
        "\n\n##### Comment last updated on {}",
        now.format("%B %d, %Y at %H:%M Hours UTC")
    )
}

/// Everything the decision looks at, gathered up front.
#[derive(Debug, Clone)]
pub struct CommentContext<'a> {
    pub comments: &'a [Comment],
    pub commit_messages: &'a [String],
    pub title: &'a str,
    pub description: &'a str,
}

pub fn decide(
    bot: &BotIdentity,
    context: &CommentContext<'_>,
    body: &str,
    edit_only: bool,
    now: DateTime<Utc>,
) -> CommentDecision {
    if is_quieted(bot, context.comments) {
        return CommentDecision::Suppressed(SuppressReason::Quieted);
    }
    let skipped = context.commit_messages.iter().any(|m| has_skip_directive(m))
        || has_skip_directive(context.title)
        || has_skip_directive(context.description);
    if skipped {
        return CommentDecision::Suppressed(SuppressReason::SkipDirective);
    }

    match latest_bot_comment(bot, context.comments) {
        Some(existing) => CommentDecision::Update {
            comment_id: existing.id,
            body: format!("{body}{}", updated_stamp(now)),
        },
        None if edit_only => CommentDecision::Nothing,
        None => CommentDecision::Create {
            body: body.to_string(),
        },
    }
}

/// Decide and apply the decision for one review.
///
/// A clean pull request under `no_blank_comment` only ever refreshes an
/// existing comment.
pub async fn publish(
    platform: &dyn Platform,
    bot: &BotIdentity,
    request: &ReviewRequest,
    artifact: &CommentArtifact,
    no_blank_comment: bool,
    now: DateTime<Utc>,
) -> Result<CommentDecision> {
    let comments = platform
        .list_comments(&request.repository, request.pr_number)
        .await?;
    let commit_messages = platform.list_commit_messages(&request.commits_url).await?;

    let context = CommentContext {
        comments: &comments,
        commit_messages: &commit_messages,
        title: &request.pr_title,
        description: &request.pr_description,
    };
    let edit_only = no_blank_comment && !artifact.has_errors;
    let decision = decide(bot, &context, &artifact.full_body(), edit_only, now);

    match &decision {
        CommentDecision::Create { body } => {
            let created = platform
                .create_comment(&request.repository, request.pr_number, body)
                .await?;
            tracing::info!(repo = %request.repository, pr = request.pr_number, comment_id = created.id, "Created review comment");
        }
        CommentDecision::Update { comment_id, body } => {
            platform
                .update_comment(&request.repository, *comment_id, body)
                .await?;
            tracing::info!(repo = %request.repository, pr = request.pr_number, comment_id, "Updated review comment");
        }
        CommentDecision::Suppressed(reason) => {
            tracing::info!(repo = %request.repository, pr = request.pr_number, ?reason, "Review comment suppressed");
        }
        CommentDecision::Nothing => {
            tracing::debug!(repo = %request.repository, pr = request.pr_number, "Clean pull request, no comment to refresh");
        }
    }

    Ok(decision)
}
