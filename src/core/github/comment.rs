use crate::core::config::ServerConfig;
use crate::core::github::WebhookEvent;

/// Start, finish and elapsed time as printed in the result table.
#[derive(Debug, Clone, Copy)]
pub struct Timing<'a> {
    pub started_at: &'a str,
    pub ended_at: &'a str,
    pub elapsed: &'a str,
}

/// Bot header and assigned-server footer wrapped around every review body.
#[derive(Debug, Clone)]
pub struct BotSignature {
    server_name: String,
    server_url: String,
}

impl BotSignature {
    pub fn new(server_name: impl Into<String>, server_url: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            server_url: server_url.into(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(&config.name, &config.url)
    }

    pub fn wrap(&self, comment: &str) -> String {
        format!(
            "**[Prolific Bot]**\n\n{}\n\nAssigned Server: [{}]({})",
            comment, self.server_name, self.server_url
        )
    }
}

fn stage_link(event: &WebhookEvent) -> String {
    format!(
        "[{}] stage of [{}/{}]({})",
        event.base_branch,
        event.owner,
        event.repository,
        event.repository_url()
    )
}

fn timing_table(timing: &Timing<'_>) -> String {
    let mut table = String::from("| _Key_ | _Value_ |\n|---|---|\n");
    table.push_str(&format!("| Start Time | {} |\n", timing.started_at));
    table.push_str(&format!("| Finish Time | {} |\n", timing.ended_at));
    table.push_str(&format!("| Elapsed Time | {} |\n", timing.elapsed));
    table
}

/// Posted before the deployment starts.
pub fn approval_notice(event: &WebhookEvent) -> String {
    format!(
        "This PR #{} has been **approved to [{}] stage** of [{}/{}]({}).\n\
         Prolific Deployment Tool will start the deployment process into the assigned server.",
        event.pull_request_number,
        event.base_branch,
        event.owner,
        event.repository,
        event.repository_url()
    )
}

pub fn success_notice(event: &WebhookEvent, timing: &Timing<'_>) -> String {
    format!(
        "**SUCCESS**: {} has been deployed. \n\n{}",
        stage_link(event),
        timing_table(timing)
    )
}

/// `reason` is `None` when the failure reason is hidden from the pull request.
pub fn failure_notice(event: &WebhookEvent, timing: &Timing<'_>, reason: Option<&str>) -> String {
    let mut comment = format!(
        "**ERROR**: {} failed to be deployed. \
         Manual review on the assigned server might be required.\n\n",
        stage_link(event)
    );
    if let Some(reason) = reason {
        comment.push_str(&format!("Reason: `{}`\n\n", reason));
    }
    comment.push_str(&timing_table(timing));
    comment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> WebhookEvent {
        WebhookEvent {
            action: "closed".to_string(),
            pull_request_number: 42,
            merged: true,
            base_branch: "prod".to_string(),
            repository: "site".to_string(),
            owner: "acme".to_string(),
        }
    }

    const TIMING: Timing<'static> = Timing {
        started_at: "Mon, 02 Jan 2006 15:04:05 UTC",
        ended_at: "Mon, 02 Jan 2006 15:04:09 UTC",
        elapsed: "4.000s",
    };

    #[test]
    fn signature_wraps_comment() {
        let signature = BotSignature::new("web-01", "https://web-01.example.com");
        assert_eq!(
            signature.wrap("hello"),
            "**[Prolific Bot]**\n\nhello\n\nAssigned Server: [web-01](https://web-01.example.com)"
        );
    }

    #[test]
    fn approval_names_pull_request_and_stage() {
        let comment = approval_notice(&event());
        assert!(comment.starts_with(
            "This PR #42 has been **approved to [prod] stage** of [acme/site](https://github.com/acme/site).\n"
        ));
        assert!(comment.ends_with("into the assigned server."));
    }

    #[test]
    fn success_contains_timing_table() {
        let comment = success_notice(&event(), &TIMING);
        assert!(comment.starts_with("**SUCCESS**: [prod] stage of [acme/site]"));
        assert!(comment.contains("| Start Time | Mon, 02 Jan 2006 15:04:05 UTC |\n"));
        assert!(comment.contains("| Elapsed Time | 4.000s |\n"));
    }

    #[test]
    fn failure_reason_is_optional() {
        let hidden = failure_notice(&event(), &TIMING, None);
        assert!(hidden.starts_with("**ERROR**: [prod] stage of [acme/site]"));
        assert!(!hidden.contains("Reason:"));

        let shown = failure_notice(&event(), &TIMING, Some("dependency make not available"));
        assert!(shown.contains("Reason: `dependency make not available`\n\n| _Key_ |"));
    }
}
