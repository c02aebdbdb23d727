//! Console output formatter for agora results

use crate::output::formatter::OutputFormatter;
use agora_application::{
    AnnounceOutput, CastVoteOutput, IngestOutcome, IngestReport, ProposalView, ProposeOutput,
    Resolution, SelfTestOutcome, StatusReport,
};
use agora_domain::{
    CascadeStatus, CascadeTask, CascadeTransition, Fact, Proposal, ProposalStatus,
    TransitionOutcome,
};
use colored::{ColoredString, Colorize};
use serde::Serialize;

/// A result that has a human-readable rendering
pub trait TextView {
    fn text(&self) -> String;
}

/// Formats command results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format as JSON
    pub fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}\n", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn field(label: &str, value: impl std::fmt::Display) -> String {
        format!("  {} {}\n", format!("{}:", label).dimmed(), value)
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn proposal_status(status: ProposalStatus) -> ColoredString {
        match status {
            ProposalStatus::Pending => status.as_str().yellow(),
            ProposalStatus::Approved => status.as_str().green().bold(),
            ProposalStatus::Rejected => status.as_str().red().bold(),
            ProposalStatus::Expired => status.as_str().dimmed(),
        }
    }

    fn cascade_status(status: CascadeStatus) -> ColoredString {
        match status {
            CascadeStatus::Failed => status.as_str().red().bold(),
            CascadeStatus::ReleasedNext => status.as_str().green().bold(),
            CascadeStatus::Validated | CascadeStatus::Committed => status.as_str().green(),
            CascadeStatus::Pending => status.as_str().yellow(),
            _ => status.as_str().cyan(),
        }
    }

    fn proposal_line(proposal: &Proposal) -> String {
        let title = if proposal.title.is_empty() {
            proposal.statement.as_str()
        } else {
            proposal.title.as_str()
        };
        format!(
            "{} [{}] {} ({} yes / {} no) {}\n",
            proposal.id.as_str().bold(),
            Self::proposal_status(proposal.status),
            title,
            proposal.yes,
            proposal.no,
            format!("{} by {}", proposal.group, proposal.proposer).dimmed()
        )
    }

    fn task_line(task: &CascadeTask) -> String {
        format!(
            "#{} {} [{}] {} {}\n",
            task.sequence,
            task.task_id.bold(),
            Self::cascade_status(task.status),
            task.title,
            format!("(retries {}/{})", task.retry_count, task.max_retries).dimmed()
        )
    }

    fn transition_line(transition: &CascadeTransition) -> String {
        let mut line = format!(
            "{} {}: {} -> {} {}",
            transition.created_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            transition.task_id.bold(),
            Self::cascade_status(transition.from),
            Self::cascade_status(transition.to),
            format!("by {}", transition.actor).dimmed()
        );
        if !transition.reason.is_empty() {
            line.push_str(&format!(" ({})", transition.reason));
        }
        line.push('\n');
        line
    }

    fn resolution_text(resolution: &Resolution) -> String {
        let decision = &resolution.decision;
        let mut output = format!(
            "{} {} {} ({} yes / {} no, pool {}): {}\n",
            "Proposal".bold(),
            resolution.proposal.id,
            Self::proposal_status(decision.status),
            decision.yes,
            decision.no,
            resolution.pool_size,
            decision.reason
        );
        if let Some(write) = &resolution.fact {
            output.push_str(&Self::field(
                "fact",
                format!(
                    "{} v{} ({})",
                    write.fact.key(),
                    write.fact.version,
                    write.outcome.label()
                ),
            ));
        }
        if let Some(err) = &resolution.publish_error {
            output.push_str(&format!(
                "  {} decision not published: {}\n",
                "warning:".yellow().bold(),
                err
            ));
        }
        output
    }
}

impl<T: TextView + Serialize + ?Sized> OutputFormatter<T> for ConsoleFormatter {
    fn format(&self, value: &T) -> String {
        value.text()
    }

    fn format_json(&self, value: &T) -> String {
        Self::format_json(value)
    }
}

impl TextView for ProposeOutput {
    fn text(&self) -> String {
        let verb = if self.replayed { "re-published" } else { "created" };
        let mut output = format!(
            "{} Proposal {} {} in {}\n",
            "✓".green().bold(),
            self.proposal.id.as_str().bold(),
            verb,
            self.proposal.group
        );
        if !self.proposal.title.is_empty() {
            output.push_str(&ConsoleFormatter::field("title", &self.proposal.title));
        }
        output.push_str(&ConsoleFormatter::field("statement", &self.proposal.statement));
        if !self.proposal.tags.is_empty() {
            output.push_str(&ConsoleFormatter::field("tags", self.proposal.tags.join(", ")));
        }
        output.push_str(&ConsoleFormatter::field("topic", &self.topic));
        output.push_str(&ConsoleFormatter::field("key", &self.idempotency_key));
        output
    }
}

impl TextView for CastVoteOutput {
    fn text(&self) -> String {
        let mut output = format!(
            "{} {} voted {} on {}{}\n",
            "✓".green().bold(),
            self.vote.voter,
            self.vote.value.as_str().bold(),
            self.vote.proposal_id,
            if self.replayed { " (already recorded)" } else { "" }
        );
        output.push_str(&ConsoleFormatter::resolution_text(&self.resolution));
        output
    }
}

impl TextView for Resolution {
    fn text(&self) -> String {
        ConsoleFormatter::resolution_text(self)
    }
}

impl TextView for [Resolution] {
    fn text(&self) -> String {
        if self.is_empty() {
            return "No pending proposals\n".to_string();
        }
        self.iter().map(ConsoleFormatter::resolution_text).collect()
    }
}

impl TextView for [Proposal] {
    fn text(&self) -> String {
        if self.is_empty() {
            return "No proposals\n".to_string();
        }
        self.iter().map(ConsoleFormatter::proposal_line).collect()
    }
}

impl TextView for ProposalView {
    fn text(&self) -> String {
        let proposal = &self.proposal;
        let mut output = ConsoleFormatter::header(&format!("Proposal {}", proposal.id));
        output.push_str(&ConsoleFormatter::field("group", &proposal.group));
        output.push_str(&ConsoleFormatter::field("status", ConsoleFormatter::proposal_status(proposal.status)));
        if !proposal.title.is_empty() {
            output.push_str(&ConsoleFormatter::field("title", &proposal.title));
        }
        output.push_str(&ConsoleFormatter::field("statement", &proposal.statement));
        output.push_str(&ConsoleFormatter::field("proposer", &proposal.proposer));
        output.push_str(&ConsoleFormatter::field(
            "created",
            proposal.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        ));
        if !proposal.reason.is_empty() {
            output.push_str(&ConsoleFormatter::field("reason", &proposal.reason));
        }

        output.push_str(&ConsoleFormatter::section_header(&format!("Ballots {}", self.summary)));
        if self.votes.is_empty() {
            output.push_str("  (none)\n");
        }
        for vote in &self.votes {
            let value = if vote.value.is_yes() {
                vote.value.as_str().green()
            } else {
                vote.value.as_str().red()
            };
            output.push_str(&format!("  {} {}", vote.voter, value));
            if !vote.reason.is_empty() {
                output.push_str(&format!(" - {}", vote.reason));
            }
            output.push('\n');
        }
        output
    }
}

impl TextView for [Fact] {
    fn text(&self) -> String {
        if self.is_empty() {
            return "No facts\n".to_string();
        }
        self.iter()
            .map(|fact| {
                format!(
                    "{} {} {}\n{}\n",
                    fact.key().to_string().bold(),
                    format!("v{}", fact.version).cyan(),
                    format!("from {}", fact.source).dimmed(),
                    ConsoleFormatter::indent(&fact.object, "  ")
                )
            })
            .collect()
    }
}

impl TextView for StatusReport {
    fn text(&self) -> String {
        let mut output = ConsoleFormatter::header(&format!("Group {}", self.group));
        output.push_str(&ConsoleFormatter::field("identity", &self.identity));
        output.push_str(&ConsoleFormatter::field("policy", &self.policy));

        output.push_str(&ConsoleFormatter::section_header("Proposals"));
        let counts = &self.proposals;
        output.push_str(&format!(
            "  {} pending, {} approved, {} rejected, {} expired ({} total)\n",
            counts.pending.to_string().yellow(),
            counts.approved.to_string().green(),
            counts.rejected.to_string().red(),
            counts.expired,
            counts.total()
        ));
        output.push_str(&ConsoleFormatter::field("facts", self.facts));

        output.push_str(&ConsoleFormatter::section_header(&format!(
            "Members ({} active, pool {})",
            self.active_members, self.estimated_pool
        )));
        if self.members.is_empty() {
            output.push_str("  (no presence seen)\n");
        }
        for member in &self.members {
            output.push_str(&format!(
                "  {} {}",
                member.agent,
                format!("last seen {}", member.last_seen.format("%Y-%m-%d %H:%M:%S")).dimmed()
            ));
            if !member.capabilities.is_empty() {
                output.push_str(&format!(" [{}]", member.capabilities.join(", ")));
            }
            output.push('\n');
        }
        output
    }
}

impl TextView for AnnounceOutput {
    fn text(&self) -> String {
        let mut output = format!(
            "{} Presence of {} announced in {}\n",
            "✓".green().bold(),
            self.agent,
            self.group
        );
        for topic in &self.topics {
            output.push_str(&ConsoleFormatter::field("topic", topic));
        }
        output
    }
}

impl TextView for IngestReport {
    fn text(&self) -> String {
        let mut output = format!(
            "Applied {}, replayed {}, rejected {}\n",
            self.applied.to_string().green(),
            self.replayed,
            self.rejected.len().to_string().red()
        );
        for outcome in &self.outcomes {
            if let IngestOutcome::Applied {
                resolution: Some(resolution),
                ..
            } = outcome
                && resolution.decision.is_terminal()
            {
                output.push_str(&ConsoleFormatter::resolution_text(resolution));
            }
        }
        for (line, error) in &self.rejected {
            output.push_str(&format!("  {} line {}: {}\n", "✗".red(), line, error));
        }
        output
    }
}

impl TextView for CascadeTask {
    fn text(&self) -> String {
        let mut output = ConsoleFormatter::task_line(self);
        output.push_str(&ConsoleFormatter::field("trace", &self.trace_id));
        if !self.required_input.is_empty() {
            output.push_str(&ConsoleFormatter::field("requires", self.required_input.join(", ")));
        }
        if !self.last_reason.is_empty() {
            output.push_str(&ConsoleFormatter::field("last reason", &self.last_reason));
        }
        output
    }
}

impl TextView for [CascadeTask] {
    fn text(&self) -> String {
        if self.is_empty() {
            return "No tasks\n".to_string();
        }
        self.iter().map(ConsoleFormatter::task_line).collect()
    }
}

impl TextView for TransitionOutcome {
    fn text(&self) -> String {
        let mut output = ConsoleFormatter::transition_line(&self.transition);
        if self.replayed {
            output.push_str(&format!("  {}\n", "already applied; nothing changed".dimmed()));
        }
        output
    }
}

impl TextView for SelfTestOutcome {
    fn text(&self) -> String {
        let mut output = if self.passed {
            format!("{} Self-test passed for {}\n", "✓".green().bold(), self.task.task_id)
        } else {
            format!(
                "{} Self-test failed for {}: {}\n",
                "✗".red().bold(),
                self.task.task_id,
                self.reason.map(|r| r.as_str()).unwrap_or("unknown")
            )
        };
        for outcome in &self.transitions {
            output.push_str(&ConsoleFormatter::indent(
                &ConsoleFormatter::transition_line(&outcome.transition),
                "  ",
            ));
            output.push('\n');
        }
        if self.exhausted {
            output.push_str(&format!("  {}\n", "retry budget exhausted".red()));
        }
        output.push_str(&ConsoleFormatter::task_line(&self.task));
        output
    }
}

impl TextView for [CascadeTransition] {
    fn text(&self) -> String {
        if self.is_empty() {
            return "No transitions\n".to_string();
        }
        self.iter().map(ConsoleFormatter::transition_line).collect()
    }
}
