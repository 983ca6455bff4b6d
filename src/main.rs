use std::io::Read;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use career_assist::agent::Orchestrator;
use career_assist::config::{NotifyConfig, OrchestratorConfig, PathsConfig};
use career_assist::llm::{LlmConfig, LlmJudge, create_provider};
use career_assist::notify::EmailNotifier;
use career_assist::profile::{FileProfile, ProfileSource};
use career_assist::report;
use career_assist::tools::ToolRegistry;
use career_assist::tools::builtin::register_builtin_tools;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let paths = PathsConfig::from_env();

    // Tracing: stderr plus a daily-rotated file
    std::fs::create_dir_all(&paths.log_dir)
        .with_context(|| format!("creating log dir {}", paths.log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&paths.log_dir, "career_agent.log");
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    let config = OrchestratorConfig::from_env()?;
    let worker_config = LlmConfig::from_env("CAREER_WORKER_MODEL").unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export OPENAI_API_KEY=sk-...");
        eprintln!("  or CAREER_LLM_BACKEND=anthropic with ANTHROPIC_API_KEY=...");
        std::process::exit(1);
    });
    let evaluator_config = LlmConfig::from_env("CAREER_EVALUATOR_MODEL")?;

    eprintln!("🤖 Career Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Worker model: {}", worker_config.model);
    eprintln!("   Evaluator model: {}", evaluator_config.model);
    eprintln!(
        "   Approval threshold: {} | Max revisions: {}",
        config.approval_threshold, config.max_revisions
    );

    // ── Providers ───────────────────────────────────────────────────────
    let worker_llm = create_provider(&worker_config)?;
    let judge = Arc::new(LlmJudge::new(
        create_provider(&evaluator_config)?,
        config.approval_threshold,
    ));

    // ── Notifications + tools ──────────────────────────────────────────
    let notifier = Arc::new(EmailNotifier::new(NotifyConfig::from_env()?));
    eprintln!(
        "   Notifications: {}",
        if notifier.is_configured() {
            "email"
        } else {
            "console (email not configured)"
        }
    );
    let tools = Arc::new(ToolRegistry::new());
    if !register_builtin_tools(&tools, notifier, &config.candidate_name) {
        anyhow::bail!("failed to register built-in capabilities");
    }
    eprintln!("   Tools: {} registered", tools.len());

    // ── Profile ──────────────────────────────────────────────────────────
    let profile = FileProfile::new(&paths.profile_dir).load().await?;
    eprintln!(
        "   Profile: {} ({} chars)\n",
        paths.profile_dir.display(),
        profile.text.chars().count()
    );

    // ── Incoming message: named sample or stdin ─────────────────────────
    let message = match std::env::args().nth(1) {
        Some(name) => report::samples::by_name(&name)
            .map(str::to_string)
            .with_context(|| {
                format!("unknown sample '{name}' (expected interview, technical or unknown)")
            })?,
        None => {
            eprintln!("Paste the employer message, then press Ctrl-D:");
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading message from stdin")?;
            buf
        }
    };

    let orchestrator = Orchestrator::new(worker_llm, judge, tools, profile, config)?;
    let outcome = orchestrator.run(&message).await?;

    println!("{}", report::render(&outcome));
    eprintln!(
        "\n   Tokens: {} in / {} out | Estimated cost: ${}",
        outcome.usage.input_tokens, outcome.usage.output_tokens, outcome.estimated_cost
    );

    Ok(())
}
