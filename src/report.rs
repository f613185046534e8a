//! Rendering of hop table snapshots
//!
//! All renderers take the records returned by
//! [`HopTable::snapshot`](crate::HopTable::snapshot), where index 0 is hop 1.

use crate::trace::HopRecord;
use serde::Serialize;
use std::fmt::Write;
use std::net::IpAddr;
use std::time::Duration;

/// Host column text for hops that never answered
pub const NO_RESPONSE: &str = "No response from host";

const HOST_WIDTH: usize = 40;

fn host(hop: &HopRecord) -> String {
    let name = hop.display_name();
    if name.is_empty() {
        NO_RESPONSE.to_string()
    } else {
        name
    }
}

fn millis(d: Duration) -> u128 {
    d.as_millis()
}

fn millis_f64(d: Duration) -> f64 {
    d.as_micros() as f64 / 1000.0
}

/// Plain-text table, one line per hop.
pub fn render_text(hops: &[HopRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:<HOST_WIDTH$} {:>5} {:>5} {:>5} {:>5} {:>5} {:>5} {:>5}",
        "Nr", "Host", "Loss%", "Sent", "Recv", "Best", "Avg", "Worst", "Last"
    );
    for (i, hop) in hops.iter().enumerate() {
        let mut name = host(hop);
        if name.chars().count() > HOST_WIDTH {
            name = name.chars().take(HOST_WIDTH - 1).collect::<String>() + "~";
        }
        let _ = writeln!(
            out,
            "{:>3}  {:<HOST_WIDTH$} {:>5} {:>5} {:>5} {:>5} {:>5} {:>5} {:>5}",
            i + 1,
            name,
            hop.loss_percent(),
            hop.sent,
            hop.received,
            millis(hop.best_rtt),
            millis(hop.avg_rtt()),
            millis(hop.worst_rtt),
            millis(hop.last_rtt),
        );
    }
    out
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Standalone HTML page with one table row per hop.
pub fn render_html(target: &str, hops: &[HopRecord]) -> String {
    let target = escape_html(target);
    let mut out = String::new();
    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(out, "<html>");
    let _ = writeln!(out, "<head><meta charset=\"utf-8\"><title>rmtr: {target}</title></head>");
    let _ = writeln!(out, "<body>");
    let _ = writeln!(out, "<h1>rmtr statistics for {target}</h1>");
    let _ = writeln!(out, "<table border=\"1\" cellspacing=\"0\" cellpadding=\"2\">");
    let _ = writeln!(
        out,
        "<tr><th>Nr</th><th>Host</th><th>Loss %</th><th>Sent</th><th>Recv</th>\
         <th>Best</th><th>Avg</th><th>Worst</th><th>Last</th></tr>"
    );
    for (i, hop) in hops.iter().enumerate() {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            i + 1,
            escape_html(&host(hop)),
            hop.loss_percent(),
            hop.sent,
            hop.received,
            millis(hop.best_rtt),
            millis(hop.avg_rtt()),
            millis(hop.worst_rtt),
            millis(hop.last_rtt),
        );
    }
    let _ = writeln!(out, "</table>");
    let _ = writeln!(out, "</body>");
    let _ = writeln!(out, "</html>");
    out
}

/// JSON output structure for a single hop
#[derive(Debug, Serialize)]
struct JsonHop {
    hop: usize,
    address: Option<IpAddr>,
    host: String,
    loss_percent: u32,
    sent: u32,
    received: u32,
    best_ms: f64,
    avg_ms: f64,
    worst_ms: f64,
    last_ms: f64,
}

/// JSON output structure for a whole report
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    target: &'a str,
    hops: Vec<JsonHop>,
}

/// Pretty-printed JSON document.
pub fn render_json(target: &str, hops: &[HopRecord]) -> serde_json::Result<String> {
    let report = JsonReport {
        version: env!("CARGO_PKG_VERSION"),
        target,
        hops: hops
            .iter()
            .enumerate()
            .map(|(i, hop)| JsonHop {
                hop: i + 1,
                address: hop.address,
                host: host(hop),
                loss_percent: hop.loss_percent(),
                sent: hop.sent,
                received: hop.received,
                best_ms: millis_f64(hop.best_rtt),
                avg_ms: millis_f64(hop.avg_rtt()),
                worst_ms: millis_f64(hop.worst_rtt),
                last_ms: millis_f64(hop.last_rtt),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&report)
}
