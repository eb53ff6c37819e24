//! quizforge CLI: generate quiz questions with an LLM, grade attempts and
//! track progress.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use quizforge_core::model::Difficulty;

mod commands;

#[derive(Parser)]
#[command(
    name = "quizforge",
    version,
    about = "LLM quiz question generator with offline fallback"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AnalyticsFormat {
    Table,
    Json,
    Html,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter quizforge.toml
    Init,

    /// Generate quiz questions on a topic
    Generate {
        /// Topic to generate questions about
        #[arg(long)]
        topic: String,

        /// Number of questions (non-positive means the default of 5, capped at 100)
        #[arg(long, default_value = "5", allow_negative_numbers = true)]
        count: i64,

        /// Question types, comma-separated (mcq, tf, short). Defaults to all.
        #[arg(long)]
        types: Option<String>,

        /// Difficulty: easy, medium or hard
        #[arg(long)]
        difficulty: Option<Difficulty>,

        /// Provider: gemini, openai, anthropic (alias claude)
        #[arg(long)]
        provider: Option<String>,

        /// Model override
        #[arg(long)]
        model: Option<String>,

        /// Write the questions as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format for stdout
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Grade an answers file against a questions file and record the attempt
    Grade {
        /// Questions JSON (`{"questions": [...]}` or a bare array)
        #[arg(long)]
        questions: PathBuf,

        /// Answers JSON: an array of strings, with null for skipped questions
        #[arg(long)]
        answers: PathBuf,

        /// Subject the quiz belongs to
        #[arg(long)]
        subject: String,

        /// Topic (defaults to the subject)
        #[arg(long)]
        topic: Option<String>,

        /// Difficulty the quiz was generated at
        #[arg(long)]
        difficulty: Option<Difficulty>,

        /// Time spent, in seconds
        #[arg(long, default_value = "0")]
        time_spent: u64,

        /// Also export the graded attempt as HTML to this path
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Show performance analytics for the current student
    Analytics {
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: AnalyticsFormat,

        /// Output file (html format only)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Export a recorded attempt as HTML
    Export {
        /// Attempt id, as shown by `history`
        #[arg(long)]
        attempt: Uuid,

        /// Output HTML path
        #[arg(long)]
        output: PathBuf,
    },

    /// List recorded attempts
    History {
        /// Delete all recorded attempts for the current student
        #[arg(long)]
        clear: bool,
    },

    /// Record a local student identity
    Login {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,
    },

    /// Forget the local student identity
    Logout,

    /// List available models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,
    },

    /// Send an image to a vision model with a prompt
    AnalyzeImage {
        /// Image file (png, jpeg, gif or webp)
        #[arg(long)]
        image: PathBuf,

        /// Instruction sent with the image
        #[arg(
            long,
            default_value = "Describe the educational content of this image and list its key concepts."
        )]
        prompt: String,

        /// Provider: gemini, openai, anthropic (alias claude)
        #[arg(long)]
        provider: Option<String>,

        /// Model override
        #[arg(long)]
        model: Option<String>,

        /// Maximum tokens to generate
        #[arg(long, default_value = "1024")]
        max_tokens: u32,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quizforge=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Generate {
            topic,
            count,
            types,
            difficulty,
            provider,
            model,
            output,
            format,
        } => {
            commands::generate::execute(commands::generate::GenerateArgs {
                topic,
                count,
                types,
                difficulty,
                provider,
                model,
                output,
                json: matches!(format, OutputFormat::Json),
                config,
            })
            .await
        }
        Commands::Grade {
            questions,
            answers,
            subject,
            topic,
            difficulty,
            time_spent,
            export,
        } => commands::grade::execute(commands::grade::GradeArgs {
            questions,
            answers,
            subject,
            topic,
            difficulty,
            time_spent,
            export,
            config,
        }),
        Commands::Analytics { format, output } => {
            let format = match format {
                AnalyticsFormat::Table => commands::analytics::Format::Table,
                AnalyticsFormat::Json => commands::analytics::Format::Json,
                AnalyticsFormat::Html => commands::analytics::Format::Html,
            };
            commands::analytics::execute(format, output, config)
        }
        Commands::Export { attempt, output } => commands::history::export(attempt, output, config),
        Commands::History { clear } => commands::history::execute(clear, config),
        Commands::Login { name, email } => commands::session::login(&name, &email, config),
        Commands::Logout => commands::session::logout(config),
        Commands::ListModels { provider } => commands::list_models::execute(provider, config),
        Commands::AnalyzeImage {
            image,
            prompt,
            provider,
            model,
            max_tokens,
        } => {
            commands::analyze_image::execute(image, prompt, provider, model, max_tokens, config)
                .await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
