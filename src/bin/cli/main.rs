mod output;

use clap::{Parser, Subcommand};
use output::{OutputConfig, OutputFormat, print_json};
use quizbank::App;
use quizbank::config::{self, CliArgs};
use quizbank::errors::DataError;
use quizbank::import::ImportRequest;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// CLI for inspecting and driving the quizbank data layer
#[derive(Parser, Debug)]
#[clap(name = "quizbank-cli", about = "Offline question-bank data layer CLI")]
struct Cli {
    #[command(flatten)]
    config: CliArgs,

    /// Output format
    #[clap(long, value_enum, default_value_t = OutputFormat::Human, global = true)]
    format: OutputFormat,

    /// Quiet mode: minimal output (just IDs or counts)
    #[clap(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the catalog hierarchy with totals and completion
    Catalog {
        /// Limit output to one test name
        #[clap(long)]
        test: Option<String>,
    },
    /// List the questions of one series
    Questions {
        #[clap(long)]
        test: String,
        #[clap(long)]
        subject: Option<String>,
        #[clap(long)]
        series: String,
    },
    /// Record an answer for one question of a series
    Answer {
        #[clap(long)]
        test: String,
        #[clap(long)]
        subject: Option<String>,
        #[clap(long)]
        series: String,
        /// 1-based position of the question in its series
        #[clap(long)]
        ordinal: u32,
        /// The selected option letter(s), e.g. "B" or "A,C"
        #[clap(long)]
        select: String,
    },
    /// Toggle a question's favorite (wrong-book) flag
    Favorite {
        question_id: String,
    },
    /// Show or maintain the wrong book
    #[command(subcommand)]
    Wrongbook(WrongbookCommands),
    /// Restart a series: reset its answers, keep favorites
    Reset {
        #[clap(long)]
        test: String,
        #[clap(long)]
        subject: Option<String>,
        #[clap(long)]
        series: String,
    },
    /// Import a question file into the catalog
    Import {
        /// Path to a JSON question document
        file: PathBuf,
        #[clap(long)]
        test: String,
        #[clap(long)]
        subject: Option<String>,
        #[clap(long)]
        series: String,
        /// Provenance note stored with the import
        #[clap(long)]
        source: Option<String>,
        #[clap(long)]
        display_name: Option<String>,
    },
    /// Recompute and show progress statistics
    Progress {
        /// Show the mirrored stats without recomputing
        #[clap(long)]
        no_recompute: bool,
    },
}

#[derive(Subcommand, Debug)]
enum WrongbookCommands {
    /// List wrong-book members
    List,
    /// Reset wrong-book answers for another pass (membership survives)
    Clear,
    /// Remove one question from the wrong book
    Remove { question_id: String },
}

async fn run(cli: Cli) -> Result<(), DataError> {
    let output_config = OutputConfig {
        format: cli.format,
        quiet: cli.quiet,
    };
    let app = App::open(config::get_config(cli.config)).await?;

    match cli.command {
        Commands::Catalog { test } => {
            let catalog = app.catalog().await;
            output::print_catalog(&catalog, test.as_deref(), &output_config);
        }
        Commands::Questions { test, subject, series } => {
            let questions = app.questions_for(&test, subject.as_deref(), &series).await?;
            output::print_questions(&questions, &output_config);
        }
        Commands::Answer { test, subject, series, ordinal, select } => {
            let questions = app.questions_for(&test, subject.as_deref(), &series).await?;
            let question = questions
                .iter()
                .find(|q| q.ordinal == ordinal)
                .ok_or_else(|| {
                    DataError::ImportValidation(format!(
                        "Series {} has no question at position {}",
                        series, ordinal
                    ))
                })?;

            let answer = app
                .answers()
                .record_answer(&question.id, &select, &question.correct_answer)
                .await?;

            if output_config.quiet {
                println!("{}", question.id);
            } else if answer.is_correct {
                println!("Correct.");
            } else {
                println!("Incorrect — the answer is {}.", question.correct_answer);
            }
        }
        Commands::Favorite { question_id } => {
            let answer = app.answers().toggle_favorite(&question_id).await?;
            if !output_config.quiet {
                println!(
                    "{} is {} favorited",
                    question_id,
                    if answer.is_favorite { "now" } else { "no longer" }
                );
            }
        }
        Commands::Wrongbook(cmd) => match cmd {
            WrongbookCommands::List => {
                let members = app.answers().wrong_book().await;
                output::print_wrong_book(&members, &output_config);
            }
            WrongbookCommands::Clear => {
                let cleared = app.clear_wrong_book_answers().await?;
                println!("{}", cleared);
            }
            WrongbookCommands::Remove { question_id } => {
                app.answers().remove_from_wrong_book(&question_id).await?;
                if !output_config.quiet {
                    println!("{} removed from the wrong book", question_id);
                }
            }
        },
        Commands::Reset { test, subject, series } => {
            let cleared = app
                .clear_series_answers(&test, subject.as_deref(), &series)
                .await?;
            println!("{}", cleared);
        }
        Commands::Import { file, test, subject, series, source, display_name } => {
            let text = std::fs::read_to_string(&file)
                .map_err(|e| DataError::ImportValidation(format!("Cannot read {:?}: {}", file, e)))?;
            let doc: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| DataError::ImportValidation(format!("{:?} is not JSON: {}", file, e)))?;

            let entry = app
                .import_questions(
                    &doc,
                    &ImportRequest {
                        test_name: test,
                        subject,
                        series_no: series,
                        source,
                        display_name,
                    },
                )
                .await?;

            if output_config.quiet {
                println!("{}", entry.file_ref.file_path);
            } else {
                println!(
                    "Imported {} questions as {}",
                    entry.file_ref.count, entry.file_ref.file_path
                );
            }
        }
        Commands::Progress { no_recompute } => {
            if !no_recompute {
                let report = app.recompute_progress().await?;
                if let OutputFormat::Json = output_config.format {
                    print_json(&report);
                    return Ok(());
                }
            }
            let catalog = app.catalog().await;
            output::print_catalog(&catalog, None, &output_config);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
