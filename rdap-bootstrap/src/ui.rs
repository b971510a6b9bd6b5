//! Text-mode display logic for the rdap-bootstrap CLI.
//!
//! Colored answer lines, the TLD listing, download notices and the run
//! summary. Uses only the `console` crate.

use console::{pad_str, style, Alignment, Style};
use rdap_bootstrap_lib::RegistryType;

use crate::QueryOutcome;

const QUERY_WIDTH: usize = 30;

// ── Answers ──────────────────────────────────────────────────────────────────

/// Print every outcome, then a summary line when there was more than one.
pub fn print_outcomes(outcomes: &[QueryOutcome]) {
    for outcome in outcomes {
        print_outcome(outcome);
    }

    if outcomes.len() > 1 {
        print_summary(outcomes);
    }
}

/// Print one outcome: a status line, then one line per server or query URL.
pub fn print_outcome(outcome: &QueryOutcome) {
    let query = pad_str(&outcome.query, QUERY_WIDTH, Alignment::Left, Some(".."));
    let registry = outcome
        .registry_type
        .map(|t| format!("  {}", style(format!("[{}]", t)).dim()))
        .unwrap_or_default();

    if let Some(error) = &outcome.error {
        println!(
            "  {}  {}{}  {}",
            style(&query).white(),
            style("ERROR").red().bold(),
            registry,
            style(error).dim(),
        );
        return;
    }

    if !outcome.is_match() {
        println!(
            "  {}  {}{}",
            style(&query).white(),
            style("NO MATCH").yellow().bold(),
            registry,
        );
        return;
    }

    let entry = outcome
        .answer
        .as_ref()
        .filter(|a| !a.entry.is_empty())
        .map(|a| format!("  {}", style(&a.entry).cyan()))
        .unwrap_or_default();

    println!(
        "  {}  {}{}{}",
        style(&query).white(),
        style("FOUND").green().bold(),
        registry,
        entry,
    );

    // Full query URLs when there are any, otherwise the registry's servers.
    if outcome.urls.is_empty() {
        if let Some(answer) = &outcome.answer {
            for url in &answer.urls {
                println!("      {}", style(url).green());
            }
        }
    } else {
        for url in &outcome.urls {
            println!("      {}", style(url).green());
        }
    }
}

fn print_summary(outcomes: &[QueryOutcome]) {
    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    let matched = outcomes.iter().filter(|o| o.is_match()).count();
    let unmatched = outcomes.len() - failed - matched;

    println!();
    println!(
        "{} {} matched, {} no match, {} failed",
        style("Summary:").bold(),
        style(matched).green(),
        style(unmatched).yellow(),
        style(failed).red(),
    );
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// Print the DNS registry's top-level domains, several to a line.
pub fn print_tlds(tlds: &[&str]) {
    let heading = Style::new().yellow().bold();
    let count_style = Style::new().cyan();

    println!();
    println!(
        "{} {}",
        heading.apply_to("DNS bootstrap registry TLDs"),
        count_style.apply_to(format!("({})", tlds.len())),
    );
    println!();

    for row in tlds.chunks(8) {
        let line: Vec<String> = row
            .iter()
            .map(|tld| pad_str(tld, 14, Alignment::Left, None).into_owned())
            .collect();
        println!("  {}", line.join(" ").trim_end());
    }

    println!();
}

/// Note a completed download on stderr so stdout stays clean.
pub fn print_downloaded(registry_type: RegistryType, url: &str) {
    eprintln!(
        "{} {} {}",
        style("Downloaded").green(),
        style(registry_type.filename()).bold(),
        style(format!("from {}", url)).dim(),
    );
}
