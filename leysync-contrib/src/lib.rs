//! # leysync-contrib
//!
//! Feeds local edits under `.ai-ley/shared` back to the template repository
//! as a pushed branch plus a pull request.
//!
//! [`ContributionEngine::check_and_contribute`] runs one full cycle.

pub mod branch;
pub mod changeset;
pub mod credential;
pub mod engine;
pub mod error;
pub mod pending;
pub mod proposal;

pub use branch::ContributionBranch;
pub use changeset::ChangeSet;
pub use credential::CredentialSource;
pub use engine::{ContributionEngine, ContributionOutcome};
pub use error::{ApiError, ContributionError};
pub use pending::{PendingProposal, PendingProposals};
pub use proposal::{GitHubProposalClient, ProposalClient, ProposalRequest};
