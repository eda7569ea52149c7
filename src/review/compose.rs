use crate::review::rules::RuleConfig;
use crate::review::{FileReviewResult, PrAction, Violation};

/// The summary comment, split the way it is assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentArtifact {
    pub header: String,
    pub body: String,
    pub footer: String,
    /// At least one file has a violation.
    pub has_errors: bool,
}

impl CommentArtifact {
    pub fn full_body(&self) -> String {
        format!("{}{}{}", self.header, self.body, self.footer)
    }
}

/// Search link explaining a violation code.
pub fn code_lookup_url(code: &str) -> String {
    format!("https://duckduckgo.com/?q=pep8%20{code}")
}

/// Build the summary comment. The output depends only on the arguments.
pub fn compose(
    action: PrAction,
    author: &str,
    rules: &RuleConfig,
    results: &[FileReviewResult],
) -> CommentArtifact {
    let messages = &rules.message;

    let header = match action {
        PrAction::Opened if messages.opened.header.is_empty() => {
            format!("Hello @{author}! Thanks for submitting the PR.")
        }
        PrAction::Opened => messages.opened.header.clone(),
        PrAction::Synchronize | PrAction::Reopened if messages.updated.header.is_empty() => {
            format!("Hello @{author}! Thanks for updating the PR.")
        }
        PrAction::Synchronize | PrAction::Reopened => messages.updated.header.clone(),
        PrAction::Other => String::new(),
    };
    let header = if header.is_empty() {
        header
    } else {
        format!("{header}\n\n")
    };

    let has_errors = results.iter().any(FileReviewResult::has_violations);

    let mut body = String::new();
    for result in results {
        body.push_str(&file_section(result, rules));
    }
    if rules.only_mention_files_with_errors && !has_errors {
        body.push_str(&messages.no_errors);
    }

    let footer = match action {
        PrAction::Opened => messages.opened.footer.clone(),
        PrAction::Synchronize | PrAction::Reopened => messages.updated.footer.clone(),
        PrAction::Other => String::new(),
    };

    CommentArtifact {
        header,
        body,
        footer,
        has_errors,
    }
}

fn file_section(result: &FileReviewResult, rules: &RuleConfig) -> String {
    let mut section = String::new();

    if result.has_violations() {
        section.push_str(&format!(
            " - In the file [`{}`]({}), following are the PEP8 issues :\n",
            result.path, result.link
        ));
        for violation in ordered(&result.violations, rules.descending_issues_order) {
            section.push_str(&format!("\n> {}", violation_line(violation, &result.link)));
        }
    } else if !rules.only_mention_files_with_errors {
        section.push_str(&format!(
            " - There are no PEP8 issues in the file [`{}`]({}) !",
            result.path, result.link
        ));
    }

    if !section.is_empty() {
        section.push_str("\n\n");
    }

    if !result.extra.is_empty() {
        section.push_str(" - Complete extra results for this file :\n\n");
        section.push_str("> ");
        section.push_str(&result.extra.join("\n> "));
        section.push_str("\n\n---\n\n");
    }

    section
}

/// Violations by (line, column); the sort is stable so ties keep checker order.
fn ordered(violations: &[Violation], descending: bool) -> Vec<&Violation> {
    let mut sorted: Vec<&Violation> = violations.iter().collect();
    sorted.sort_by_key(|v| (v.line, v.column));
    if descending {
        sorted.reverse();
    }
    sorted
}

fn violation_line(v: &Violation, link: &str) -> String {
    format!(
        "[Line {line}:{column}]({link}#L{line}): [{code}]({url}) {message}",
        line = v.line,
        column = v.column,
        code = v.code,
        url = code_lookup_url(&v.code),
        message = v.message,
    )
}
