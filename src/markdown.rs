use chrono::{Local, TimeZone};

use crate::session::{CorrelationData, SearchResult, SearchSession};

/// Escape characters that break Markdown link syntax: `[`, `]`, `(`, `)`.
pub(crate) fn escape_md_link(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '[' | ']' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Sanitize user input for embedding in a Markdown heading.
/// Replaces newlines (which would break heading structure) with spaces.
pub(crate) fn sanitize_heading(s: &str) -> String {
    s.chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

/// Host of `url` without a leading `www.`, or `N/A`.
fn domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| "N/A".to_string())
}

fn format_timestamp(timestamp: i64) -> String {
    Local
        .timestamp_millis_opt(timestamp)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Full session view: summary, numbered sources, and thematic clusters.
pub fn format_session(session: &SearchSession, current_year: i32) -> String {
    let mut out = format!("# {}\n\n", sanitize_heading(&session.query));
    out.push_str(&format!(
        "_Session {} · {}_\n\n",
        session.timestamp,
        format_timestamp(session.timestamp)
    ));
    out.push_str(&session.summary);
    out.push_str("\n\n");

    if session.results.is_empty() {
        return out;
    }

    out.push_str(&format!("## Sources ({})\n\n", session.results.len()));
    if session.selection_mode {
        let selected = session.selected().len();
        out.push_str(&format!("> Selection mode: {selected} selected\n\n"));
    }
    for (i, result) in session.results.iter().enumerate() {
        format_result(i + 1, result, session.selection_mode, current_year, &mut out);
    }

    if let Some(ref correlation) = session.correlation_data {
        format_correlation(correlation, &session.results, &mut out);
    }

    out
}

fn format_result(
    number: usize,
    result: &SearchResult,
    selection_mode: bool,
    current_year: i32,
    out: &mut String,
) {
    let marker = match (selection_mode, result.selected) {
        (true, true) => "[x] ",
        (true, false) => "[ ] ",
        _ => "",
    };
    out.push_str(&format!(
        "### {number}. {marker}[{}]({})\n\n",
        escape_md_link(&sanitize_heading(&result.title)),
        escape_md_link(&result.url)
    ));

    let mut facts = vec![domain(&result.url)];
    if let Some(rating) = result.rating.filter(|r| *r > 0.0) {
        facts.push(format!("★ {rating:.1}/5"));
    }
    if let Some(year) = result.publication_year.filter(|y| *y > 0) {
        facts.push(year.to_string());
    }
    if result.is_recent_and_valid(current_year)
        && let Some(ref grade) = result.validity_rating
    {
        facts.push(format!("Qualis {grade}"));
    }
    if !result.has_cover() {
        facts.push("no cover".to_string());
    }
    out.push_str(&facts.join(" · "));
    out.push_str("\n\n");

    if let Some(ref summary) = result.brief_summary {
        out.push_str(&format!("> {}\n\n", sanitize_heading(summary)));
    }
    if let Some(tags) = result.tags.as_deref().filter(|t| !t.is_empty()) {
        let tags: Vec<String> = tags.iter().map(|t| format!("`{t}`")).collect();
        out.push_str(&format!("Tags: {}\n\n", tags.join(" ")));
    }
}

fn format_correlation(data: &CorrelationData, results: &[SearchResult], out: &mut String) {
    if data.clusters.is_empty() {
        return;
    }
    out.push_str("## Thematic Connections\n\n");
    for cluster in &data.clusters {
        out.push_str(&format!("### {}\n\n", sanitize_heading(&cluster.theme)));
        out.push_str(&format!("{}\n\n", cluster.description));
        for node in &cluster.nodes {
            let title = results
                .get(node.result_index)
                .map_or(node.title.as_str(), |r| r.title.as_str());
            out.push_str(&format!("- [{}] {}\n", node.result_index + 1, title));
        }
        out.push('\n');
    }
}

/// One line per saved session, most recent first.
pub fn format_history(sessions: &[SearchSession]) -> String {
    if sessions.is_empty() {
        return "No saved searches yet.\n".to_string();
    }

    let mut out = format!("# Recent Searches ({})\n\n", sessions.len());
    out.push_str("| Timestamp | Date | Query | Sources |\n|-----------|------|-------|---------|\n");
    for session in sessions {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            session.timestamp,
            format_timestamp(session.timestamp),
            sanitize_heading(&session.query).replace('|', "\\|"),
            session.results.len()
        ));
    }
    out
}
