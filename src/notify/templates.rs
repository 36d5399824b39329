use chrono::NaiveDateTime;

use crate::types::{Phase, RunReport};

pub const SUCCESS_SUBJECT: &str = "MLB Pipeline Update";
pub const ERROR_SUBJECT: &str = "MLB Pipeline ERROR";

pub fn success_html(report: &RunReport, now: NaiveDateTime) -> String {
    format!(
        r#"<h1 id="mlb-pipeline-today-">MLB Pipeline {date}</h1>
<h2 id="games-updated">Games Updated</h2>
<p>There were {n_updated} games updated:</p>
<p><ul>{updated}</ul></p>
<h2 id="games-prepared">Games Prepared</h2>
<p>There were {n_prepared} games added:</p>
<p><ul>{prepared}</ul></p>
<p><em>Email sent {sent}</em></p>
"#,
        date = now.format("%m/%d/%Y"),
        n_updated = report.updated.len(),
        updated = list_items(&report.updated),
        n_prepared = report.prepared.len(),
        prepared = list_items(&report.prepared),
        sent = now.format("%m/%d/%Y %H:%M:%S"),
    )
}

pub fn error_html(phase: Phase, error: &str, now: NaiveDateTime) -> String {
    format!(
        r#"<h1 id="mlb-pipeline-today-">MLB Pipeline {date}</h1>
<p>There was an error when trying to run the pipeline. Please see below:</p>
<h2 id="where">Where</h2>
<p>The error occurred in {phase}</p>
<h2 id="what">What</h2>
<p>Error message: <br/> {error}</p>
<h2 id="when">When</h2>
<p>The error occurred at {at}</p>
"#,
        date = now.format("%m/%d/%Y"),
        phase = phase.label(),
        error = escape(error),
        at = now.format("%Y-%m-%d %H:%M:%S"),
    )
}

fn list_items(lines: &[String]) -> String {
    lines
        .iter()
        .map(|l| format!("<li>{}</li>", escape(l)))
        .collect()
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
