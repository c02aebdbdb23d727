//! Knowledge governance domain
//!
//! Agents propose statements, peers vote, and every peer independently
//! evaluates the same ballots to the same decision. Approved proposals
//! become versioned facts.
//!
//! ```text
//! Proposal (pending)
//!      │  votes arrive (upsert per voter)
//!      ▼
//! evaluate(proposer, pool, ballots, created_at, now, policy)
//!      │
//!      ├── pending  → re-check on next vote
//!      ├── rejected / expired → terminal
//!      └── approved → Fact { version = latest + 1 }
//!                       └── resolve_fact_write: applied / conflict / stale
//! ```

pub mod evaluator;
pub mod fact;
pub mod policy;
pub mod pool;
pub mod proposal;
pub mod vote;

pub use evaluator::{Decision, evaluate};
pub use fact::{Fact, FactKey, FactWriteOutcome, decision_source, resolve_fact_write};
pub use policy::GovernancePolicy;
pub use pool::{RosterMember, count_active, estimate_pool_size};
pub use proposal::{Proposal, ProposalId, ProposalStatus};
pub use vote::{Ballots, Vote, VoteValue, ballot_summary, ballots_from_votes};
