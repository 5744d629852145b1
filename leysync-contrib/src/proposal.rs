//! Opening merge proposals (GitHub pull requests).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use leysync_core::settings::ContributeSettings;

use crate::error::ApiError;

/// Body of `POST /repos/{owner}/{repo}/pulls`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposalRequest {
    pub title: String,
    pub body: String,
    /// Branch holding the change.
    pub head: String,
    /// Branch the change should land on.
    pub base: String,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    html_url: Option<String>,
}

/// Opens a merge proposal and returns its URL.
pub trait ProposalClient: Send + Sync {
    fn open(&self, request: &ProposalRequest, token: &str) -> Result<String, ApiError>;
}

/// GitHub REST client over `ureq`.
pub struct GitHubProposalClient {
    agent: ureq::Agent,
    api_base: String,
    owner: String,
    repo: String,
}

impl GitHubProposalClient {
    pub fn new(api_base: &str, owner: &str, repo: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("leysync/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            api_base: api_base.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    }

    pub fn from_settings(settings: &ContributeSettings) -> Self {
        Self::new(&settings.api_base, &settings.owner, &settings.repo)
    }

    pub fn endpoint(&self) -> String {
        format!("{}/repos/{}/{}/pulls", self.api_base, self.owner, self.repo)
    }
}

impl ProposalClient for GitHubProposalClient {
    #[instrument(skip_all, fields(head = %request.head, base = %request.base))]
    fn open(&self, request: &ProposalRequest, token: &str) -> Result<String, ApiError> {
        let url = self.endpoint();
        debug!(%url, "opening pull request");
        let response = self
            .agent
            .post(&url)
            .set("Authorization", &format!("token {token}"))
            .set("Accept", "application/vnd.github.v3+json")
            .send_json(request);

        match response {
            Ok(resp) => {
                let body: PullResponse = resp
                    .into_json()
                    .map_err(|e| ApiError::Decode(e.to_string()))?;
                body.html_url
                    .ok_or_else(|| ApiError::Decode("response has no html_url".to_string()))
            }
            Err(ureq::Error::Status(status, resp)) => Err(ApiError::Status {
                status,
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(t)) => Err(ApiError::Transport(t.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_trims_trailing_slash() {
        let client = GitHubProposalClient::new("https://api.example.test/", "acme", "templates");
        assert_eq!(
            client.endpoint(),
            "https://api.example.test/repos/acme/templates/pulls"
        );
    }

    #[test]
    fn request_serializes_github_fields() {
        let req = ProposalRequest {
            title: "t".into(),
            body: "b".into(),
            head: "contribution/x".into(),
            base: "main".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"title": "t", "body": "b", "head": "contribution/x", "base": "main"})
        );
    }
}
