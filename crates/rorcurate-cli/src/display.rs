//! Plain-text rendering of the aggregation view and pending corrections.

use rorcurate_core::{Aggregation, Correction, RorAction, RorSummary};

const ID_WIDTH: usize = 11;
const NAME_WIDTH: usize = 40;

// ── Aggregation ──

/// Render the cross-selection ROR table, one row per id.
pub fn render_aggregation(aggregation: &Aggregation) -> String {
    let total = aggregation.selection_size();
    let mut out = format!("Selected affiliations: {total}\n");
    if aggregation.is_empty() {
        out.push_str("  (no ROR linked)\n");
        return out;
    }

    out.push_str(&format!(
        "  {:<ID_WIDTH$} {:<NAME_WIDTH$} {:>9} {:>5} {:>7}\n",
        "ROR", "Name", "Count", "Added", "Removed"
    ));
    for summary in aggregation.entries() {
        out.push_str(&summary_line(summary, total));
        out.push('\n');
    }
    out
}

fn summary_line(summary: &RorSummary, total: usize) -> String {
    let mut name = summary.ror.ror_name.clone();
    if !summary.ror.ror_country.is_empty() {
        name.push_str(&format!(" ({})", summary.ror.ror_country));
    }
    let coverage = format!("{}/{}", summary.holders(), total);
    let marker = if summary.holders() < total { "+" } else { " " };
    format!(
        "{marker} {:<ID_WIDTH$} {:<NAME_WIDTH$} {:>9} {:>5} {:>7}",
        summary.ror.ror_id,
        truncate(&name, NAME_WIDTH),
        coverage,
        summary.added_by,
        summary.removed_by,
    )
}

// ── Corrections ──

/// One line per corrected affiliation: `-id` removed, `+id` added.
pub fn render_corrections(corrections: &[Correction]) -> String {
    let mut out = format!("Corrected affiliations: {}\n", corrections.len());
    for correction in corrections {
        let changes: Vec<String> = correction
            .corrected_rors
            .iter()
            .filter_map(|c| match c.action {
                RorAction::Add => Some(format!("+{}", c.ror_id())),
                RorAction::Remove => Some(format!("-{}", c.ror_id())),
                RorAction::None => None,
            })
            .collect();
        out.push_str(&format!(
            "  {:<12} {} [{}]\n",
            correction.affiliation_id,
            truncate(&correction.raw_affiliation_string, NAME_WIDTH),
            changes.join(" ")
        ));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
