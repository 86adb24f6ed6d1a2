use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use speaker_roles::{
    analyze_labels, classify_speakers, format_log, read_transcript, write_json, write_text,
    AnthropicClient, AnthropicConfig, ClassifierConfig, ClassifyError, SafeguardConfig,
    TargetRoles, Transcript, MAX_ITERATIONS,
};

#[derive(Parser)]
#[command(name = "speaker-roles")]
#[command(author, version, about = "Label diarized transcript speakers with semantic roles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace speaker tags with roles using the LLM
    Classify {
        /// Input transcript file ("-" for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output file for the labeled transcript ("-" for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Comma separated target roles
        #[arg(long, default_value = "Agent,Customer")]
        roles: String,

        /// Run the tool-calling safeguard after mapping
        #[arg(long)]
        safeguard: bool,

        /// Skip mapping and only validate existing role labels (implies --safeguard)
        #[arg(long)]
        validate_only: bool,

        /// Maximum safeguard rounds
        #[arg(long, default_value_t = MAX_ITERATIONS)]
        max_iterations: usize,

        /// Write the decision log as JSON to this file
        #[arg(long)]
        log: Option<PathBuf>,

        /// Emit transcript and log together as JSON instead of plain text
        #[arg(long)]
        json: bool,

        /// Model override (defaults to ANTHROPIC_MODEL or the built-in model)
        #[arg(long)]
        model: Option<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the speaker tags of a transcript without calling the LLM
    Analyze {
        /// Input transcript file ("-" for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Comma separated target roles
        #[arg(long, default_value = "Agent,Customer")]
        roles: String,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Classify {
            input,
            output,
            roles,
            safeguard,
            validate_only,
            max_iterations,
            log,
            json,
            model,
            verbose,
        } => {
            setup_logging(verbose);
            classify_transcript(ClassifyArgs {
                input,
                output,
                roles,
                safeguard: safeguard || validate_only,
                validate_only,
                max_iterations,
                log,
                json,
                model,
            })
            .await
        }
        Commands::Analyze {
            input,
            roles,
            verbose,
        } => {
            setup_logging(verbose);
            analyze_transcript(input, &roles)
        }
    };

    if let Err(err) = result {
        eprintln!("Error: {:#}", err);
        let code = err
            .downcast_ref::<ClassifyError>()
            .map(|e| e.kind().exit_code())
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

struct ClassifyArgs {
    input: PathBuf,
    output: PathBuf,
    roles: String,
    safeguard: bool,
    validate_only: bool,
    max_iterations: usize,
    log: Option<PathBuf>,
    json: bool,
    model: Option<String>,
}

async fn classify_transcript(args: ClassifyArgs) -> Result<()> {
    let target_roles: TargetRoles = args.roles.parse()?;

    info!("Loading transcript from {:?}", args.input);
    let transcript = read_transcript(&args.input)?;

    let mut api_config = AnthropicConfig::from_env()?;
    if let Some(model) = args.model {
        api_config.model = model;
    }
    let client = AnthropicClient::new(api_config);

    let config = ClassifierConfig {
        target_roles,
        enable_safeguard: args.safeguard,
        validate_only: args.validate_only,
        safeguard: SafeguardConfig {
            max_iterations: args.max_iterations,
            ..Default::default()
        },
    };

    let result = classify_speakers(&client, &transcript, &config).await?;

    if args.json {
        write_json(&args.output, &result)?;
    } else {
        write_text(&args.output, &result.transcript)?;
    }

    if let Some(log_path) = &args.log {
        write_json(log_path, &result.log).context("Failed to write decision log")?;
        info!("Decision log written to {:?}", log_path);
    }

    eprint!("{}", format_log(&result.log));

    Ok(())
}

fn analyze_transcript(input: PathBuf, roles: &str) -> Result<()> {
    let target_roles: TargetRoles = roles.parse()?;

    info!("Analyzing transcript from {:?}", input);
    let content = read_transcript(&input)?;
    let transcript = Transcript::parse(&content)?;

    let mut log = Vec::new();
    let analysis = analyze_labels(&transcript, &target_roles, &mut log);

    println!("Transcript Analysis");
    println!("===================");
    println!("Lines: {}", transcript.line_count());
    println!("Utterances: {}", transcript.utterances().count());
    println!("Target roles: {}", target_roles.describe());
    println!();

    println!("Speaker Labels");
    println!("--------------");
    for label in &analysis.all_labels {
        let count = transcript.utterances().filter(|u| &u.tag == label).count();
        let status = if target_roles.contains(label) {
            "already a role"
        } else {
            "needs mapping"
        };
        println!("{}: {} utterances ({})", label, count, status);
    }

    Ok(())
}
