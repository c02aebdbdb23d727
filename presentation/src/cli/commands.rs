//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored when the terminal allows
    Text,
    /// JSON document
    Json,
}

impl From<OutputFormat> for agora_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => agora_domain::OutputFormat::Text,
            OutputFormat::Json => agora_domain::OutputFormat::Json,
        }
    }
}

/// CLI arguments for agora
#[derive(Parser, Debug)]
#[command(name = "agora")]
#[command(author, version, about = "Peer governance and cascading tasks for agent groups")]
#[command(long_about = r#"
Agora lets a group of agents propose statements, vote on them and keep the
approved ones as versioned facts. It also drives multi-stage tasks whose
stages may only start once the previous one has been released.

Configuration files are loaded from (in priority order):
1. AGORA_* environment variables (AGORA_GOVERNANCE__QUORUM_YES=3)
2. --config <path>     Explicit config file
3. ./agora.toml        Project-level config
4. ~/.config/agora/config.toml   Global config

Example:
  agora propose --group ops --title "deploy window" "Deploys happen on Tuesdays"
  agora --as scout:2 vote <proposal-id> yes
  agora cascade create --trace release-42 build --sequence 1
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output format (defaults to the configured one, then text)
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Act as this agent instead of the configured identity
    #[arg(long = "as", value_name = "AGENT", global = true)]
    pub as_agent: Option<String>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Propose a statement to a group
    Propose(ProposeArgs),

    /// Vote on a pending proposal
    Vote(VoteArgs),

    /// Evaluate one proposal, or every pending proposal of a group
    Evaluate(EvaluateArgs),

    /// List proposals
    Proposals(ProposalsArgs),

    /// List proposals that reached a decision
    Decisions(GroupArgs),

    /// List current facts, or the history of one fact
    Facts(FactsArgs),

    /// Show a group's proposals, facts and roster
    Status(GroupArgs),

    /// Announce this agent's presence (and capabilities) to a group
    Presence(PresenceArgs),

    /// Apply a JSONL file of envelopes received from peers
    Ingest(IngestArgs),

    /// Drive cascading tasks
    #[command(subcommand)]
    Cascade(CascadeCommand),
}

#[derive(Args, Debug)]
pub struct GroupArgs {
    /// Group (defaults to governance.default_group)
    #[arg(short, long)]
    pub group: Option<String>,
}

#[derive(Args, Debug)]
pub struct ProposeArgs {
    /// The statement to vote on
    pub statement: String,

    #[arg(short, long)]
    pub group: Option<String>,

    /// Title; also the subject of the fact derived on approval
    #[arg(short, long, default_value = "")]
    pub title: String,

    /// Tag (repeatable)
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Reuse an id, e.g. to retry after a failed publish
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Ballot {
    Yes,
    No,
}

impl From<Ballot> for agora_domain::VoteValue {
    fn from(ballot: Ballot) -> Self {
        match ballot {
            Ballot::Yes => agora_domain::VoteValue::Yes,
            Ballot::No => agora_domain::VoteValue::No,
        }
    }
}

#[derive(Args, Debug)]
pub struct VoteArgs {
    pub proposal_id: String,

    #[arg(value_enum)]
    pub value: Ballot,

    #[arg(short, long, default_value = "")]
    pub reason: String,

    /// Voter pool size; estimated from the roster when absent
    #[arg(long)]
    pub pool: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Proposal to evaluate; all pending proposals when absent
    pub proposal_id: Option<String>,

    #[arg(short, long)]
    pub group: Option<String>,

    #[arg(long)]
    pub pool: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ProposalsArgs {
    #[arg(short, long)]
    pub group: Option<String>,

    /// pending, approved, rejected or expired
    #[arg(short, long)]
    pub status: Option<String>,

    /// Show one proposal with its ballots
    #[arg(long, value_name = "ID")]
    pub show: Option<String>,
}

#[derive(Args, Debug)]
pub struct FactsArgs {
    #[arg(short, long)]
    pub group: Option<String>,

    /// Show every version of the fact with this subject
    #[arg(long, value_name = "SUBJECT")]
    pub history: Option<String>,

    /// Predicate of the fact line for --history
    #[arg(long, default_value = "states")]
    pub predicate: String,
}

#[derive(Args, Debug)]
pub struct PresenceArgs {
    #[arg(short, long)]
    pub group: Option<String>,

    /// Capability to advertise (repeatable)
    #[arg(long = "capability", value_name = "NAME")]
    pub capabilities: Vec<String>,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// JSONL file, one encoded envelope per line
    pub file: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum CascadeCommand {
    /// Create a task in a trace
    Create(CreateTaskArgs),

    /// Move a task from one status to another
    Advance(AdvanceArgs),

    /// Report a stage's self-test result
    SelfTest(SelfTestArgs),

    /// Fail a task from its current status
    Fail(FailArgs),

    /// List the tasks of a trace
    List(ListTasksArgs),

    /// Show the transition history of a trace
    Transitions(TransitionsArgs),
}

#[derive(Args, Debug)]
pub struct CreateTaskArgs {
    pub task_id: String,

    /// Trace to add the task to; a new trace when absent
    #[arg(long)]
    pub trace: Option<String>,

    #[arg(short, long)]
    pub sequence: u32,

    #[arg(short, long, default_value = "")]
    pub title: String,

    /// Input key the stage needs (repeatable)
    #[arg(long = "requires", value_name = "KEY")]
    pub required_input: Vec<String>,

    /// Validation rules as a JSON array, e.g. '[{"check":"present","key":"artifact"}]'
    #[arg(long, value_name = "JSON")]
    pub rules: Option<String>,
}

#[derive(Args, Debug)]
pub struct AdvanceArgs {
    #[arg(long)]
    pub trace: String,

    pub task_id: String,

    /// Expected current status
    #[arg(long)]
    pub from: String,

    #[arg(long)]
    pub to: String,

    #[arg(short, long, default_value = "")]
    pub reason: String,

    /// Explicit idempotency key; derived from the attempt when absent
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Args, Debug)]
pub struct SelfTestArgs {
    #[arg(long)]
    pub trace: String,

    pub task_id: String,

    /// Supplied input as a JSON object
    #[arg(long, value_name = "JSON", default_value = "{}")]
    pub input: String,

    /// Produced output as a JSON object
    #[arg(long, value_name = "JSON", default_value = "{}")]
    pub produced: String,
}

#[derive(Args, Debug)]
pub struct FailArgs {
    #[arg(long)]
    pub trace: String,

    pub task_id: String,

    #[arg(short, long)]
    pub reason: String,
}

#[derive(Args, Debug)]
pub struct ListTasksArgs {
    #[arg(long)]
    pub trace: String,

    /// Include released and failed tasks
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct TransitionsArgs {
    #[arg(long)]
    pub trace: String,

    /// Only this task
    pub task_id: Option<String>,
}
