//! Table rendering of evaluation results

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use eval_engine::EvaluationResult;

const MAX_VALUE_CHARS: usize = 60;

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().copied());
    table
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_VALUE_CHARS {
        return text.to_string();
    }
    let mut short: String = text.chars().take(MAX_VALUE_CHARS - 3).collect();
    short.push_str("...");
    short
}

fn number(value: f64) -> Cell {
    Cell::new(format!("{value:.2}")).set_alignment(CellAlignment::Right)
}

/// Render the result as a recommendation line followed by score, field and
/// agent-run tables
pub fn tables(result: &EvaluationResult) -> String {
    let recommendation = &result.recommendation;
    let mut out = format!(
        "{} | verdict: {} | score: {:.1} | investment score: {}/5 | confidence: {:.2}\n{}\n",
        result.company_name.as_deref().unwrap_or("(unnamed)"),
        recommendation.verdict,
        recommendation.aggregate_score,
        recommendation.investment_score,
        recommendation.confidence,
        recommendation.summary,
    );

    out.push_str(&format!("{}\n", recommendation.justification));
    for (label, findings) in [
        ("Strengths", &recommendation.strengths),
        ("Weaknesses", &recommendation.weaknesses),
    ] {
        if !findings.is_empty() {
            out.push_str(&format!("\n{label}\n"));
            for finding in findings {
                out.push_str(&format!("  - {finding}\n"));
            }
        }
    }

    let mut scores = table(&["Score", "Value", "Confidence", "Completeness", "Rationale"]);
    for score in &result.scores {
        scores.add_row(vec![
            Cell::new(score.kind),
            number(score.score),
            number(score.confidence),
            number(score.completeness),
            Cell::new(&score.rationale),
        ]);
    }
    out.push_str(&format!("\nScores\n{scores}\n"));

    let mut fields = table(&["Field", "Value", "Confidence", "Resolution", "Source"]);
    for (field, resolved) in result.record.fields() {
        let source = resolved
            .selected()
            .map_or_else(String::new, |c| c.agent.clone());
        fields.add_row(vec![
            Cell::new(field),
            Cell::new(truncate(&resolved.value().to_string())),
            number(resolved.confidence()),
            Cell::new(resolved.resolution()),
            Cell::new(source),
        ]);
    }
    out.push_str(&format!(
        "\nFields ({:.0}% complete)\n{fields}\n",
        result.evidence.field_completeness * 100.0
    ));

    let mut runs = table(&["Agent", "Source", "Status", "Fields", "Elapsed (ms)", "Failure"]);
    for report in result.record.sources() {
        runs.add_row(vec![
            Cell::new(&report.agent),
            Cell::new(report.source),
            Cell::new(report.status),
            Cell::new(report.fields.len()).set_alignment(CellAlignment::Right),
            Cell::new(report.elapsed_ms).set_alignment(CellAlignment::Right),
            Cell::new(report.failure.as_deref().unwrap_or("")),
        ]);
    }
    out.push_str(&format!("\nAgent runs\n{runs}"));

    if !result.evidence.follow_up_agents.is_empty() {
        out.push_str(&format!(
            "\nFollow-up runs: {}",
            result.evidence.follow_up_agents.join(", ")
        ));
    }
    out
}
