use clap::ValueEnum;
use quizbank::models::{CatalogIndex, Question, UserAnswer};
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

/// Bundled output configuration passed to all print functions
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    /// The output format
    pub format: OutputFormat,
    /// When true, print minimal output (just IDs or counts)
    pub quiet: bool,
}

/// Prints any serializable value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: could not serialize output: {}", e),
    }
}

/// Prints the catalog hierarchy in the specified format
pub fn print_catalog(catalog: &CatalogIndex, filter_test: Option<&str>, config: &OutputConfig) {
    if let OutputFormat::Json = config.format {
        print_json(catalog);
        return;
    }

    for test in &catalog.test_names {
        if filter_test.is_some_and(|f| f != test.name) {
            continue;
        }
        if config.quiet {
            println!("{}", test.name);
            continue;
        }
        println!(
            "{} — {}/{} answered ({}%)",
            test.display_name.as_deref().unwrap_or(&test.name),
            test.completed_questions,
            test.total_questions,
            test.completion_percentage
        );

        for series in catalog
            .series
            .iter()
            .filter(|s| s.test_name == test.name)
        {
            let subject = series.subject.as_deref().unwrap_or("");
            let score = series
                .score
                .map(|s| format!(", score {}", s))
                .unwrap_or_default();
            println!(
                "  {}{}{} — {}/{} ({}%{})",
                if subject.is_empty() { String::new() } else { format!("{} / ", subject) },
                series.series_no,
                series
                    .display_name
                    .as_deref()
                    .map(|d| format!(" [{}]", d))
                    .unwrap_or_default(),
                series.completed_questions,
                series.total_questions,
                series.completion_percentage,
                score
            );
        }
    }
}

/// Prints a question list in the specified format
pub fn print_questions(questions: &[Question], config: &OutputConfig) {
    if let OutputFormat::Json = config.format {
        print_json(&questions);
        return;
    }

    for q in questions {
        if config.quiet {
            println!("{}", q.id);
            continue;
        }
        println!("{}. {}", q.ordinal, q.content);
        for (letter, text) in q.options() {
            println!("   {}. {}", letter, text);
        }
        println!("   -> {}", q.correct_answer);
    }
}

/// Prints wrong-book members in the specified format
pub fn print_wrong_book(members: &[UserAnswer], config: &OutputConfig) {
    if let OutputFormat::Json = config.format {
        print_json(&members);
        return;
    }

    if members.is_empty() {
        if !config.quiet {
            println!("The wrong book is empty.");
        }
        return;
    }
    for member in members {
        if config.quiet {
            println!("{}", member.question_id);
        } else {
            println!("{} (missed {} times)", member.question_id, member.wrong_count);
        }
    }
}
