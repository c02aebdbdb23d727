//! CLI entrypoint for agora
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use agora_application::{
    AnnounceInput, AnnouncePresenceUseCase, AppContext, CascadeEngine, CastVoteInput,
    CastVoteUseCase, CreateTaskInput, EvaluateUseCase, GovernanceQueries, IngestUseCase,
    NoTransport, ProposeInput, ProposeUseCase, Transport,
};
use agora_domain::{
    CascadeStatus, FactKey, OutputFormat, ProposalId, ProposalStatus, TraceId, TransitionRequest,
    ValidationRule,
};
use agora_infrastructure::{
    ConfigLoader, FileConfig, JsonlAuditLogger, JsonlOutboxTransport, LocalStore,
};
use agora_presentation::cli::commands::CascadeCommand;
use agora_presentation::{Cli, Command, ConsoleFormatter, OutputConfig, OutputFormatter};
use anyhow::{Context, Result, anyhow, bail};
use clap::{CommandFactory, Parser};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        for line in ConfigLoader::describe_sources(cli.config.as_deref()) {
            println!("{}", line);
        }
        return Ok(());
    }

    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    let _log_guard = init_logging(cli.verbose, file_config.logging.file.as_deref())?;
    info!("Starting agora");

    let issues = file_config.validate();
    for issue in &issues {
        if issue.is_error() {
            error!("{}", issue.message);
        } else {
            warn!("{}", issue.message);
        }
    }
    if issues.iter().any(|issue| issue.is_error()) {
        bail!("Invalid configuration");
    }

    let output = OutputConfig::resolve(
        cli.output,
        file_config.output.format,
        file_config.output.color,
    );
    output.apply();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    // === Dependency Injection ===
    let ctx = build_context(&file_config, cli.as_agent.as_deref()).await?;
    info!("Acting as {}", ctx.config.identity());

    let rendered = run(command, ctx, output.format).await?;
    println!("{}", rendered.trim_end());
    Ok(())
}

/// Log to stderr, and additionally to `[logging] file` when configured
fn init_logging(verbose: u8, file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let (file_layer, guard) = match file {
        Some(path) => {
            let directory = path.parent().filter(|p| !p.as_os_str().is_empty());
            let directory = directory.unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(directory)
                .with_context(|| format!("Failed to create log directory {}", directory.display()))?;
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow!("Invalid log file path: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn build_context(config: &FileConfig, as_agent: Option<&str>) -> Result<AppContext> {
    let storage = &config.storage;

    let store = match &storage.state_file {
        Some(path) => Arc::new(
            LocalStore::open(path)
                .await
                .with_context(|| format!("Failed to open state file {}", path.display()))?,
        ),
        None => {
            warn!("No [storage] state_file configured; state lives only for this command");
            Arc::new(LocalStore::in_memory())
        }
    };

    let transport: Arc<dyn Transport> = match &storage.outbox_file {
        Some(path) => Arc::new(
            JsonlOutboxTransport::open(path)
                .with_context(|| format!("Failed to open outbox {}", path.display()))?,
        ),
        None => {
            debug!("No outbox configured; envelopes are not delivered");
            Arc::new(NoTransport)
        }
    };

    let mut ctx = AppContext::new(
        store.clone(),
        store,
        transport,
        config.to_agora_config(as_agent),
    );

    if let Some(path) = &storage.audit_file {
        match JsonlAuditLogger::new(path) {
            Some(logger) => ctx = ctx.with_audit_logger(Arc::new(logger)),
            None => warn!("Audit log {} could not be opened; continuing without it", path.display()),
        }
    }

    Ok(ctx)
}

async fn run(command: Command, ctx: AppContext, format: OutputFormat) -> Result<String> {
    let out = ConsoleFormatter;

    let rendered = match command {
        Command::Propose(args) => {
            let mut input = ProposeInput::new(args.title, args.statement).with_tags(args.tags);
            if let Some(group) = args.group {
                input = input.with_group(group);
            }
            if let Some(id) = args.id {
                input = input.with_id(id);
            }
            let output = ProposeUseCase::new(ctx).execute(input).await?;
            out.render(&output, format)
        }
        Command::Vote(args) => {
            let input = CastVoteInput::new(args.proposal_id, args.value.into())
                .with_reason(args.reason)
                .with_pool_size(args.pool);
            let output = CastVoteUseCase::new(ctx).execute(input).await?;
            out.render(&output, format)
        }
        Command::Evaluate(args) => {
            let evaluate = EvaluateUseCase::new(ctx);
            match args.proposal_id {
                Some(id) => {
                    let resolution = evaluate.execute(&ProposalId::new(id), args.pool).await?;
                    out.render(&resolution, format)
                }
                None => {
                    let resolutions = evaluate.sweep(args.group.as_deref(), args.pool).await?;
                    out.render(resolutions.as_slice(), format)
                }
            }
        }
        Command::Proposals(args) => {
            let queries = GovernanceQueries::new(ctx);
            if let Some(id) = args.show {
                let view = queries.proposal(&ProposalId::new(id)).await?;
                out.render(&view, format)
            } else {
                let status = args
                    .status
                    .map(|s| s.parse::<ProposalStatus>())
                    .transpose()
                    .map_err(|e| anyhow!(e))?;
                let proposals = queries.proposals(args.group.as_deref(), status).await?;
                out.render(proposals.as_slice(), format)
            }
        }
        Command::Decisions(args) => {
            let decisions = GovernanceQueries::new(ctx)
                .decisions(args.group.as_deref())
                .await?;
            out.render(decisions.as_slice(), format)
        }
        Command::Facts(args) => {
            let facts = match args.history {
                Some(subject) => {
                    let group = ctx.config.group_or_default(args.group.as_deref()).to_string();
                    let key = FactKey::new(group, subject, args.predicate);
                    GovernanceQueries::new(ctx).fact_history(&key).await?
                }
                None => GovernanceQueries::new(ctx).facts(args.group.as_deref()).await?,
            };
            out.render(facts.as_slice(), format)
        }
        Command::Status(args) => {
            let report = GovernanceQueries::new(ctx).status(args.group.as_deref()).await?;
            out.render(&report, format)
        }
        Command::Presence(args) => {
            let input = AnnounceInput {
                group: args.group,
                capabilities: (!args.capabilities.is_empty()).then_some(args.capabilities),
            };
            let output = AnnouncePresenceUseCase::new(ctx).execute(input).await?;
            out.render(&output, format)
        }
        Command::Ingest(args) => {
            let content = tokio::fs::read_to_string(&args.file)
                .await
                .with_context(|| format!("Failed to read {}", args.file.display()))?;
            let report = IngestUseCase::new(ctx).ingest_lines(&content).await;
            if !report.rejected.is_empty() {
                warn!("{} envelope(s) rejected", report.rejected.len());
            }
            out.render(&report, format)
        }
        Command::Cascade(command) => run_cascade(command, ctx, format).await?,
    };

    Ok(rendered)
}

async fn run_cascade(command: CascadeCommand, ctx: AppContext, format: OutputFormat) -> Result<String> {
    let out = ConsoleFormatter;
    let actor = ctx.config.identity().clone();
    let engine = CascadeEngine::new(ctx);

    let rendered = match command {
        CascadeCommand::Create(args) => {
            let validation_rules = match args.rules {
                Some(rules) => parse_rules(&rules)?,
                None => Vec::new(),
            };
            let task = engine
                .create_task(CreateTaskInput {
                    trace_id: args.trace.map(TraceId::new),
                    task_id: args.task_id,
                    sequence: args.sequence,
                    title: args.title,
                    required_input: args.required_input,
                    validation_rules,
                })
                .await?;
            out.render(&task, format)
        }
        CascadeCommand::Advance(args) => {
            let from: CascadeStatus = args.from.parse()?;
            let to: CascadeStatus = args.to.parse()?;
            let mut request = TransitionRequest::new(args.trace, args.task_id, from, to, actor)
                .with_reason(args.reason);
            if let Some(key) = args.key {
                request = request.with_idempotency_key(key);
            }
            let outcome = engine.advance(request).await?;
            out.render(&outcome, format)
        }
        CascadeCommand::SelfTest(args) => {
            let input = parse_object(&args.input).context("Invalid --input")?;
            let produced = parse_object(&args.produced).context("Invalid --produced")?;
            let outcome = engine
                .report_self_test(&TraceId::new(args.trace), &args.task_id, actor, input, produced)
                .await?;
            out.render(&outcome, format)
        }
        CascadeCommand::Fail(args) => {
            let outcome = engine
                .fail_task(&TraceId::new(args.trace), &args.task_id, actor, args.reason)
                .await?;
            out.render(&outcome, format)
        }
        CascadeCommand::List(args) => {
            let tasks = engine.tasks(&TraceId::new(args.trace), args.all).await?;
            out.render(tasks.as_slice(), format)
        }
        CascadeCommand::Transitions(args) => {
            let transitions = engine
                .transitions(&TraceId::new(args.trace), args.task_id.as_deref())
                .await?;
            out.render(transitions.as_slice(), format)
        }
    };

    Ok(rendered)
}

fn parse_object(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        other => bail!("expected a JSON object, got {}", other),
    }
}

fn parse_rules(raw: &str) -> Result<Vec<ValidationRule>> {
    serde_json::from_str(raw).context("Invalid --rules")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object() {
        let map = parse_object(r#"{"artifact": "app.tar"}"#).unwrap();
        assert_eq!(map["artifact"], "app.tar");
        assert!(parse_object("[1, 2]").is_err());
    }

    #[test]
    fn test_parse_rules() {
        let rules = parse_rules(r#"[{"check": "non_empty", "key": "artifact"}]"#).unwrap();
        assert_eq!(rules, vec![ValidationRule::non_empty("artifact")]);
        assert!(parse_rules(r#"[{"check": "bogus"}]"#).is_err());
    }
}
