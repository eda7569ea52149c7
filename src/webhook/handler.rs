use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::queue::task::{FixCommand, FixTrigger, Task};
use crate::server::AppState;
use crate::webhook::events::{
    InstallationEvent, InstallationRepositoriesEvent, IssueCommentEvent, PullRequestEvent,
    WebhookEvent,
};
use crate::webhook::signature::{verify_signature, SIGNATURE_HEADER};
use crate::workflow;

pub async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    if let Err(e) = verify_signature(state.config.webhook_secret(), &body, signature) {
        tracing::warn!(error = %e, "Webhook signature verification failed");
        return StatusCode::UNAUTHORIZED;
    }

    let event_type = match headers.get("x-github-event").and_then(|v| v.to_str().ok()) {
        Some(et) => et.to_string(),
        None => {
            tracing::warn!("Missing X-GitHub-Event header");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event = match WebhookEvent::parse(&event_type, &body) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, event_type = %event_type, "Failed to parse webhook event");
            return StatusCode::BAD_REQUEST;
        }
    };

    tracing::info!(event_type = %event_type, "Received webhook event");

    match event {
        WebhookEvent::PullRequest(event) => handle_pull_request_event(&state, event).await,
        WebhookEvent::IssueComment(event) => handle_issue_comment_event(&state, event).await,
        WebhookEvent::Installation(event) => handle_installation_event(&state, event).await,
        WebhookEvent::InstallationRepositories(event) => {
            handle_installation_repositories_event(&state, event).await
        }
        WebhookEvent::Ping => {
            tracing::info!("Received ping event");
            StatusCode::OK
        }
        WebhookEvent::Unsupported(event_type) => {
            tracing::debug!(event_type = %event_type, "Ignoring unsupported event");
            StatusCode::OK
        }
    }
}

async fn handle_pull_request_event(state: &AppState, event: PullRequestEvent) -> StatusCode {
    let request = event.review_request();
    if !request.action.is_reviewable() {
        tracing::debug!(action = %event.action, "Ignoring pull request action");
        return StatusCode::OK;
    }

    let mut queue = state.task_queue.write().await;
    queue.enqueue(Task::ReviewPullRequest(request));

    StatusCode::ACCEPTED
}

async fn handle_issue_comment_event(state: &AppState, event: IssueCommentEvent) -> StatusCode {
    if event.action != "created" || event.issue.pull_request.is_none() {
        return StatusCode::OK;
    }

    // Never react to our own comments.
    let bot = state.config.bot();
    if event.comment.user.id == bot.id {
        return StatusCode::OK;
    }

    let body = event.comment.body.as_deref().unwrap_or_default();
    if !bot.is_mentioned_in(body) {
        return StatusCode::OK;
    }
    let Some(command) = FixCommand::parse(body) else {
        // quiet/resume and friendly chatter are read back at review time.
        return StatusCode::OK;
    };

    tracing::info!(
        repo = %event.repository.full_name,
        pr = event.issue.number,
        requester = %event.comment.user.login,
        command = ?command,
        "Fix requested"
    );

    let mut queue = state.task_queue.write().await;
    queue.enqueue(Task::Fix(FixTrigger {
        repository: event.repository.full_name,
        pr_number: event.issue.number,
        requester: event.comment.user.login,
        comment_url: event.comment.html_url,
        command,
    }));

    StatusCode::ACCEPTED
}

async fn handle_installation_event(state: &AppState, event: InstallationEvent) -> StatusCode {
    if event.action != "created" {
        return StatusCode::OK;
    }
    record_installations(state, event.repositories).await
}

async fn handle_installation_repositories_event(
    state: &AppState,
    event: InstallationRepositoriesEvent,
) -> StatusCode {
    if event.action != "added" {
        return StatusCode::OK;
    }
    record_installations(state, event.repositories_added).await
}

async fn record_installations(
    state: &AppState,
    repositories: Vec<crate::webhook::events::InstalledRepository>,
) -> StatusCode {
    let names: Vec<String> = repositories.into_iter().map(|r| r.full_name).collect();
    match workflow::install::handle_installation_event(state, &names).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::error!(error = %e, "Failed to record installation");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
