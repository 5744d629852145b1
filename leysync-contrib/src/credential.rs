//! Access token lookup for the merge-proposal API.

use leysync_core::Notifier;

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

const PROMPT: &str =
    "Enter a GitHub personal access token with repo permissions to create pull requests";

/// Where the proposal credential comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Read this environment variable, then prompt.
    Env(String),
    /// A fixed token; `None` goes straight to the prompt.
    Fixed(Option<String>),
}

impl Default for CredentialSource {
    fn default() -> Self {
        CredentialSource::Env(TOKEN_ENV.to_string())
    }
}

impl CredentialSource {
    /// First non-empty token from the source, else from the secret prompt.
    pub fn resolve(&self, notifier: &dyn Notifier) -> Option<String> {
        let direct = match self {
            CredentialSource::Env(var) => std::env::var(var).ok(),
            CredentialSource::Fixed(token) => token.clone(),
        };
        non_empty(direct).or_else(|| non_empty(notifier.prompt_secret(PROMPT)))
    }
}

fn non_empty(token: Option<String>) -> Option<String> {
    token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use leysync_core::{NullNotifier, RecordingNotifier};

    #[test]
    fn fixed_token_wins_over_prompt() {
        let n = RecordingNotifier::with_secret("prompted");
        assert_eq!(
            CredentialSource::Fixed(Some("fixed".into())).resolve(&n),
            Some("fixed".to_string())
        );
    }

    #[test]
    fn blank_token_falls_back_to_prompt() {
        let n = RecordingNotifier::with_secret("prompted");
        assert_eq!(
            CredentialSource::Fixed(Some("  ".into())).resolve(&n),
            Some("prompted".to_string())
        );
    }

    #[test]
    fn nothing_anywhere_is_none() {
        assert_eq!(CredentialSource::Fixed(None).resolve(&NullNotifier), None);
        assert_eq!(
            CredentialSource::Env("LEYSYNC_TEST_UNSET_TOKEN_VAR".into()).resolve(&NullNotifier),
            None
        );
    }
}
