//! The `quizforge generate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use quizforge_core::engine::{GenerationReport, QuestionGenerator};
use quizforge_core::model::{
    parse_type_list, Difficulty, GenerationOutput, GenerationRequest, Question,
};
use quizforge_providers::{create_provider, load_config_from};

pub struct GenerateArgs {
    pub topic: String,
    pub count: i64,
    pub types: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub output: Option<PathBuf>,
    pub json: bool,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: GenerateArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;

    let types = match &args.types {
        Some(list) => parse_type_list(list).map_err(anyhow::Error::msg)?,
        None => Vec::new(),
    };
    let request = GenerationRequest::new(&args.topic, args.count, &types, args.difficulty)?;

    let provider_name = args.provider.as_deref().unwrap_or(&config.default_provider);
    let (provider_name, provider_config) = config.provider(provider_name)?;
    let generator_config = config.generator_config(&provider_config, args.model.as_deref());
    let model = generator_config.model.clone();
    let generator = QuestionGenerator::new(create_provider(&provider_config), generator_config);

    eprintln!(
        "quizforge v{}: {} {} question(s) on \"{}\" via {provider_name}/{model}",
        env!("CARGO_PKG_VERSION"),
        request.question_count,
        request.difficulty,
        request.topic,
    );

    let (questions, report) = generator.generate_with_report(&request).await;
    print_report(&report);

    let output = GenerationOutput { questions };
    if let Some(path) = &args.output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&output)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("Questions saved to: {}", path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", questions_table(&output.questions));
    }

    Ok(())
}

fn print_report(report: &GenerationReport) {
    eprintln!(
        "Done: {} from provider, {} fallback ({} call(s), {} failed, {:.1}s)",
        report.ai_questions,
        report.fallback_questions,
        report.provider_calls,
        report.failed_batches,
        report.duration_ms as f64 / 1000.0,
    );
}

fn questions_table(questions: &[Question]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Type", "Question", "Choices", "Answer"]);

    for (i, q) in questions.iter().enumerate() {
        let choices = q
            .choices
            .as_ref()
            .map(|c| c.join("\n"))
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(q.kind),
            Cell::new(&q.text),
            Cell::new(choices),
            Cell::new(q.answer.as_deref().unwrap_or("-")),
        ]);
    }
    table
}
