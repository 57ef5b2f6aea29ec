use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use erdsync::gemini::{self, GeminiClient, GeminiConfig};
use erdsync::ingest::IngestionPipeline;
use erdsync::io::FormatRegistry;
use erdsync::parser::{DocumentShape, TextFormat};
use erdsync::prompt;
use erdsync::reconciler::{ApplyMode, Reconciler};
use erdsync::server;
use erdsync::workspace::Workspace;

/// Keep an ER schema document and its diagram in sync.
#[derive(Parser)]
#[command(name = "erdsync")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input document (.json, .yaml, .yml)
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Output file
    #[arg(short, long, global = true, default_value = "erd.html")]
    output: PathBuf,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Html)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document into a diagram (default behavior)
    Render,
    /// Generate a diagram from a natural-language description
    Generate {
        /// Description of the system to model
        #[arg(long)]
        prompt: String,
    },
    /// Start the diagram API server
    Serve {
        /// Port to run the server on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Print the system instruction sent with every generation request
    Prompt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Graph-native `{ nodes, edges }` JSON
    Graph,
    /// Schema `{ entities, relationships }` JSON
    Json,
    /// Standalone HTML page
    Html,
}

impl OutputFormat {
    fn id(self) -> &'static str {
        match self {
            OutputFormat::Graph => "graph",
            OutputFormat::Json => "json",
            OutputFormat::Html => "html",
        }
    }
}

fn write_output(
    registry: &FormatRegistry,
    reconciler: &Reconciler,
    format: OutputFormat,
    output: &Path,
) -> anyhow::Result<()> {
    let writer = registry.require_writer(format.id())?;
    writer
        .write(reconciler.graph(), output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "Wrote {} entities and {} relationships to {}",
        reconciler.nodes().len(),
        reconciler.edges().len(),
        output.display()
    );
    Ok(())
}

fn render(input: &Path, format: OutputFormat, output: &Path) -> anyhow::Result<()> {
    let registry = FormatRegistry::with_defaults();
    let shape = registry
        .reader_for_path(input)?
        .read(input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let mut reconciler = Reconciler::new();
    reconciler.apply_document(shape, ApplyMode::ReplaceAll);
    write_output(&registry, &reconciler, format, output)
}

async fn generate(prompt: &str, format: OutputFormat, output: &Path) -> anyhow::Result<()> {
    let config = GeminiConfig::from_env()?;
    let timeout = config.timeout;
    let pipeline = IngestionPipeline::new(Arc::new(GeminiClient::new(config)?)).with_timeout(timeout);

    let shape: DocumentShape = pipeline.generate_from_prompt(prompt).await?;

    let mut reconciler = Reconciler::new();
    reconciler.apply_document(shape, ApplyMode::FromIngestion);
    write_output(&FormatRegistry::with_defaults(), &reconciler, format, output)
}

async fn serve(input: Option<&Path>, port: u16) -> anyhow::Result<()> {
    let workspace = Workspace::new(gemini::pipeline_from_env());

    if let Some(input) = input {
        let text = std::fs::read_to_string(input)
            .with_context(|| format!("failed to read {}", input.display()))?;
        let format = match FormatRegistry::extension_from_path(input) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                TextFormat::Yaml
            }
            _ => TextFormat::Json,
        };
        workspace.set_text(text).await;
        let notice = workspace.render_as(format).await;
        if notice.is_error() {
            bail!("{}: {}", input.display(), notice.message);
        }
    }

    server::serve(Arc::new(workspace), port).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("erdsync=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Generate { prompt }) => {
            generate(&prompt, cli.format, &cli.output).await?;
        }
        Some(Commands::Serve { port }) => {
            serve(cli.input.as_deref(), port).await?;
        }
        Some(Commands::Prompt) => {
            println!("{}", prompt::system_instruction()?);
        }
        Some(Commands::Render) | None => {
            // Default behavior: render if input provided
            if let Some(input) = cli.input {
                render(&input, cli.format, &cli.output)?;
            } else {
                println!("erdsync: no input specified. Use --help for usage.");
            }
        }
    }

    Ok(())
}
