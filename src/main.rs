use anyhow::{anyhow, Context, Result};
use bat::PrettyPrinter;
use clap::Parser;
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use function_calling::agent::{Agent, StopReason, DEFAULT_MAX_LOOPS};
use function_calling::providers::openai::OpenAiProvider;
use function_calling::tools::weather::WeatherTool;
use function_calling::tools::ToolRegistry;

const DEFAULT_PROMPT: &str = "What's the weather in Shenzhen? Is it suitable for outdoor activities?";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Question for the model
    #[arg(default_value = DEFAULT_PROMPT)]
    prompt: String,

    /// System prompt placed before the question
    #[arg(short, long)]
    system: Option<String>,

    /// Maximum number of tool rounds before the last answer is taken as final
    #[arg(long, default_value_t = DEFAULT_MAX_LOOPS)]
    max_loops: usize,

    /// File holding DASH_SCOPE_API_KEY, DASH_SCOPE_URL and DASH_SCOPE_MODEL
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Ask the model without offering the weather tool
    #[arg(long)]
    no_tools: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = load_env(&cli.env_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let provider = OpenAiProvider::from_env()?;
    println!(
        "{} {}",
        style("function-calling").bold(),
        style(format!("- model {}", provider.model())).dim()
    );

    let tools = ToolRegistry::with_weather(WeatherTool::from_env()?);
    let mut agent = Agent::new(Arc::new(provider), tools).with_max_loops(cli.max_loops);
    if let Some(system) = cli.system {
        agent = agent.with_system_prompt(system);
    }
    if cli.no_tools {
        agent = agent.without_tools();
    }

    println!("{} {}\n", style("Prompt:").cyan(), cli.prompt);
    let outcome = agent.run(&cli.prompt).await?;

    if outcome.stop_reason == StopReason::LoopLimit {
        println!(
            "{}",
            style(format!(
                "Stopped after {} tool rounds; the model still wanted a tool.",
                outcome.rounds
            ))
            .yellow()
        );
    }
    println!(
        "{}",
        style(format!(
            "Final response from LLM ({} rounds, {} completions, {} tokens):",
            outcome.rounds,
            outcome.completions,
            outcome
                .usage
                .total_tokens
                .map(|t| t.to_string())
                .unwrap_or_else(|| "?".to_string())
        ))
        .green()
    );
    render(&outcome.content)?;
    println!();
    Ok(())
}

/// Load `env_file` into the process environment, then build the log filter so
/// a `RUST_LOG` set in the file takes effect
fn load_env(env_file: &Path) -> Result<EnvFilter> {
    dotenv::from_path(env_file)
        .with_context(|| format!("Error loading {} file", env_file.display()))?;
    Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
}

fn render(content: &str) -> Result<()> {
    PrettyPrinter::new()
        .input_from_bytes(content.as_bytes())
        .language("markdown")
        .print()
        .map_err(|e| anyhow!("failed to render response: {}", e))?;
    Ok(())
}
