use crate::platform::types;

/// Map an octocrab comment to our platform Comment type.
pub fn map_comment(comment: octocrab::models::issues::Comment) -> types::Comment {
    types::Comment {
        id: comment.id.into_inner(),
        author: comment.user.login,
        author_id: comment.user.id.into_inner(),
        body: comment.body.unwrap_or_default(),
    }
}

pub fn map_pull_request(pr: octocrab::models::pulls::PullRequest) -> types::PullRequest {
    types::PullRequest {
        number: pr.number,
        title: pr.title.clone().unwrap_or_default(),
        body: pr.body.clone().unwrap_or_default(),
        author: pr
            .user
            .as_ref()
            .map(|u| u.login.clone())
            .unwrap_or_default(),
        head_branch: pr.head.ref_field.clone(),
        head_sha: pr.head.sha.clone(),
        head_repo: pr.head.repo.as_ref().and_then(|r| r.full_name.clone()),
        base_branch: pr.base.ref_field.clone(),
        html_url: pr
            .html_url
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_default(),
    }
}
