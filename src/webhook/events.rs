use serde::Deserialize;

use crate::review::{PrAction, ReviewRequest};

/// Webhook event parsed from the payload based on the X-GitHub-Event header.
#[derive(Debug)]
pub enum WebhookEvent {
    PullRequest(PullRequestEvent),
    IssueComment(IssueCommentEvent),
    Installation(InstallationEvent),
    InstallationRepositories(InstallationRepositoriesEvent),
    Ping,
    Unsupported(String),
}

#[derive(Debug, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub pull_request: PullRequestPayload,
    pub repository: RepositoryPayload,
}

#[derive(Debug, Deserialize)]
pub struct IssueCommentEvent {
    pub action: String,
    pub issue: IssuePayload,
    pub comment: CommentPayload,
    pub repository: RepositoryPayload,
}

#[derive(Debug, Deserialize)]
pub struct InstallationEvent {
    pub action: String,
    /// Present on `created`; absent for some other actions.
    #[serde(default)]
    pub repositories: Vec<InstalledRepository>,
}

#[derive(Debug, Deserialize)]
pub struct InstallationRepositoriesEvent {
    pub action: String,
    #[serde(default)]
    pub repositories_added: Vec<InstalledRepository>,
}

#[derive(Debug, Deserialize)]
pub struct InstalledRepository {
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestPayload {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub head: PullRequestRef,
    pub base: PullRequestRef,
    pub user: UserPayload,
    pub commits_url: String,
    pub diff_url: String,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct IssuePayload {
    pub number: u64,
    pub pull_request: Option<serde_json::Value>, // Present if issue is a PR
}

#[derive(Debug, Deserialize)]
pub struct CommentPayload {
    pub body: Option<String>,
    pub html_url: String,
    pub user: UserPayload,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryPayload {
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub login: String,
    pub id: u64,
}

impl PullRequestEvent {
    /// The review this event asks for.
    pub fn review_request(&self) -> ReviewRequest {
        let pr = &self.pull_request;
        ReviewRequest {
            repository: self.repository.full_name.clone(),
            pr_number: pr.number,
            head_sha: pr.head.sha.clone(),
            base_branch: pr.base.ref_name.clone(),
            action: PrAction::parse(&self.action),
            author: pr.user.login.clone(),
            pr_title: pr.title.clone(),
            pr_description: pr.body.clone().unwrap_or_default(),
            commits_url: pr.commits_url.clone(),
            diff_url: pr.diff_url.clone(),
        }
    }
}

impl WebhookEvent {
    pub fn parse(event_type: &str, payload: &[u8]) -> Result<Self, serde_json::Error> {
        match event_type {
            "pull_request" => {
                let event: PullRequestEvent = serde_json::from_slice(payload)?;
                Ok(WebhookEvent::PullRequest(event))
            }
            "issue_comment" => {
                let event: IssueCommentEvent = serde_json::from_slice(payload)?;
                Ok(WebhookEvent::IssueComment(event))
            }
            "installation" => {
                let event: InstallationEvent = serde_json::from_slice(payload)?;
                Ok(WebhookEvent::Installation(event))
            }
            "installation_repositories" => {
                let event: InstallationRepositoriesEvent = serde_json::from_slice(payload)?;
                Ok(WebhookEvent::InstallationRepositories(event))
            }
            "ping" => Ok(WebhookEvent::Ping),
            other => Ok(WebhookEvent::Unsupported(other.to_string())),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_request_event_to_review_request() {
        let payload = serde_json::to_vec(&fixtures::pull_request("synchronize")).unwrap();
        let WebhookEvent::PullRequest(event) = WebhookEvent::parse("pull_request", &payload).unwrap()
        else {
            panic!("expected a pull request event");
        };
        let request = event.review_request();
        assert_eq!(request.repository, "alice/widgets");
        assert_eq!(request.action, PrAction::Synchronize);
        assert_eq!(request.head_sha, "abc123");
        assert_eq!(request.base_branch, "main");
        assert_eq!(request.pr_description, "");
    }

    #[test]
    fn test_issue_comment_event() {
        let payload =
            serde_json::to_vec(&fixtures::issue_comment("@pep8scout pep8ify", 7, true)).unwrap();
        let WebhookEvent::IssueComment(event) = WebhookEvent::parse("issue_comment", &payload).unwrap()
        else {
            panic!("expected an issue comment event");
        };
        assert_eq!(event.issue.number, 5);
        assert!(event.issue.pull_request.is_some());
        assert_eq!(event.comment.body.as_deref(), Some("@pep8scout pep8ify"));
        assert_eq!(event.comment.user.id, 7);
        assert_eq!(
            event.comment.html_url,
            "https://github.com/alice/widgets/pull/5#issuecomment-900"
        );
    }

    #[test]
    fn test_installation_events() {
        let payload = br#"{"action":"created","installation":{"id":1},
            "repositories":[{"full_name":"alice/widgets"},{"full_name":"alice/gears"}]}"#;
        let WebhookEvent::Installation(event) = WebhookEvent::parse("installation", payload).unwrap()
        else {
            panic!("expected an installation event");
        };
        assert_eq!(event.repositories.len(), 2);

        let payload = br#"{"action":"added","repositories_added":[{"full_name":"bob/x"}]}"#;
        assert!(matches!(
            WebhookEvent::parse("installation_repositories", payload).unwrap(),
            WebhookEvent::InstallationRepositories(_)
        ));
    }

    #[test]
    fn test_unknown_and_malformed() {
        assert!(matches!(
            WebhookEvent::parse("push", b"{}").unwrap(),
            WebhookEvent::Unsupported(name) if name == "push"
        ));
        assert!(WebhookEvent::parse("pull_request", b"{\"action\":1}").is_err());
    }
}
