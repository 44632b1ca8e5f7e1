//! The member-facing status page.
//!
//! One template covers every state; the handler decides which [`Phase`]
//! applies. While a session is in progress the page refreshes itself.

use reval_gate::PollState;
use reval_types::{VerificationLink, VerificationRecord};

/// What the page shows below the record details.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Unverified, no session yet: offer the Verify button.
    Ready,
    /// A session is running; refresh until it resolves.
    InProgress,
    Succeeded,
    /// Starting or polling failed; offer Retry.
    Failed(String),
    /// Completion failed after a proof arrived; no retry.
    CompletionFailed,
}

impl Phase {
    pub fn from_poll(state: &PollState) -> Self {
        match state {
            PollState::InProgress => Phase::InProgress,
            PollState::Succeeded => Phase::Succeeded,
            PollState::Failed(_) | PollState::Cancelled => {
                Phase::Failed("Verification failed. Please try again.".into())
            }
            PollState::TimedOut => {
                Phase::Failed("Verification timed out. Please try again.".into())
            }
            PollState::CompletionFailed(_) => Phase::CompletionFailed,
        }
    }
}

const REFRESH_SECS: u64 = 5;

pub fn render(record: &VerificationRecord, provider: &str, phase: &Phase) -> String {
    let link = &record.verification_link;
    let status = if record.verification_status {
        "Verified"
    } else {
        "Not Verified"
    };

    let body = match phase {
        Phase::Ready => verify_form(link, "Verify with Reclaim"),
        Phase::InProgress => "<p>Verification in progress. Please wait...</p>".to_string(),
        Phase::Succeeded => {
            "<p>Verification successful! You can now join the group.</p>".to_string()
        }
        Phase::Failed(message) => format!(
            "<p>{}</p>{}",
            escape_html(message),
            verify_form(link, "Retry Verification")
        ),
        Phase::CompletionFailed => {
            "<p>Something went wrong while completing your verification.</p>".to_string()
        }
    };

    let refresh = if *phase == Phase::InProgress {
        format!(r#"<meta http-equiv="refresh" content="{REFRESH_SECS}">"#)
    } else {
        String::new()
    };

    layout(
        &refresh,
        &format!(
            "<h1>ReVal Verification</h1>\
             <p>Group ID: {group}</p>\
             <p>Verification Status: {status}</p>\
             <p>Verification Type: via {provider}</p>\
             {body}",
            group = escape_html(record.group_id.as_str()),
            provider = escape_html(provider),
        ),
    )
}

pub fn render_not_found() -> String {
    layout("", "<p>Verification link not found or expired.</p>")
}

pub fn render_error() -> String {
    layout("", "<p>Something went wrong. Please try again later.</p>")
}

fn verify_form(link: &VerificationLink, label: &str) -> String {
    format!(
        r#"<form method="post" action="/{}/start"><button type="submit">{}</button></form>"#,
        escape_html(link.as_str()),
        escape_html(label)
    )
}

fn layout(head: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>ReVal Verification</title>{head}</head><body>{body}</body></html>"
    )
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use reval_types::{GroupId, MemberId, Timestamp};

    const PROVIDER: &str = "github-username";

    fn record(group: &str) -> VerificationRecord {
        VerificationRecord::new(
            GroupId::from(group),
            MemberId::from("42"),
            VerificationLink::parse("abc123").unwrap(),
            Timestamp::new(1),
        )
    }

    #[test]
    fn ready_page_offers_verify_button() {
        let html = render(&record("-100"), PROVIDER, &Phase::Ready);
        assert!(html.contains("Group ID: -100"));
        assert!(html.contains("Not Verified"));
        assert!(html.contains(r#"action="/abc123/start""#));
        assert!(html.contains("Verify with Reclaim"));
        assert!(html.contains("Verification Type: via github-username"));
        assert!(!html.contains("GitHub"));
    }

    #[test]
    fn in_progress_page_refreshes() {
        let html = render(&record("-100"), PROVIDER, &Phase::InProgress);
        assert!(html.contains("http-equiv=\"refresh\""));
        assert!(!html.contains("<form"));
    }

    #[test]
    fn failure_offers_retry_but_completion_failure_does_not() {
        let failed = render(&record("-100"), PROVIDER, &Phase::Failed("Verification failed. Please try again.".into()));
        assert!(failed.contains("Retry Verification"));
        let broken = render(&record("-100"), PROVIDER, &Phase::CompletionFailed);
        assert!(!broken.contains("<form"));
    }

    #[test]
    fn group_id_is_escaped() {
        let html = render(&record("<script>alert(1)</script>"), PROVIDER, &Phase::Ready);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));

        let html = render(&record("-100"), "<b>x</b>", &Phase::Ready);
        assert!(html.contains("via &lt;b&gt;x&lt;/b&gt;"));
    }

    #[test]
    fn poll_states_map_to_phases() {
        assert_eq!(Phase::from_poll(&PollState::Succeeded), Phase::Succeeded);
        assert!(matches!(Phase::from_poll(&PollState::TimedOut), Phase::Failed(_)));
        assert_eq!(
            Phase::from_poll(&PollState::CompletionFailed("x".into())),
            Phase::CompletionFailed
        );
    }
}
