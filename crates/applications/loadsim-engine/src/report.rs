//! Plain-text benchmark table

use crate::experiment::{Experiment, ExperimentReport};
use crate::sampler::secs_to_duration;
use std::fmt::Write;

/// Spaces between columns
const PADDING: usize = 3;

const HEADER: [&str; 6] = ["BALANCER", "AVG_WAIT", "AVG_SERV", "AVG_RESP", "TIME", "CUSTOMERS"];

fn fmt_secs(secs: f64) -> String {
    format!("{:?}", secs_to_duration(secs))
}

/// Render one experiment's rows as an aligned table plus a parameter line
pub fn render_table(report: &ExperimentReport) -> String {
    let mut rows: Vec<Vec<String>> = vec![HEADER.iter().map(|h| h.to_string()).collect()];

    for row in &report.rows {
        let cells = match &row.summary {
            Some(s) => vec![
                row.label.clone(),
                fmt_secs(s.avg_waiting_secs),
                fmt_secs(s.avg_service_secs),
                fmt_secs(s.avg_response_secs),
                fmt_secs(s.total_span_secs),
                s.customers.to_string(),
            ],
            None => vec![
                row.label.clone(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                "0".to_string(),
            ],
        };
        rows.push(cells);
    }

    let widths: Vec<usize> = (0..HEADER.len())
        .map(|col| rows.iter().map(|r| r[col].chars().count()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for cells in &rows {
        for (cell, width) in cells.iter().zip(&widths) {
            let _ = write!(out, "{:<w$}", cell, w = width + PADDING);
        }
        out.truncate(out.trim_end().len());
        out.push('\n');
    }
    out.push_str(&parameter_line(&report.experiment));
    out.push('\n');
    out
}

fn parameter_line(exp: &Experiment) -> String {
    let time_limit = exp
        .time_limit_secs
        .map(fmt_secs)
        .unwrap_or_else(|| "none".to_string());
    let customer_limit = exp
        .customer_limit
        .map(|m| m.to_string())
        .unwrap_or_else(|| "none".to_string());

    format!(
        "(λ={:.3}, μ={:.3}, serverCount={}, timeLimit={}, customersLimit={})",
        exp.lambda, exp.mu, exp.server_count, time_limit, customer_limit
    )
}
