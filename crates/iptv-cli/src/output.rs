//! Output formatting for CLI

use iptv_core::{Channel, ProbeReport};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// Serialize `data` for display. Text falls back to the JSON value's debug form;
/// callers with a dedicated text layout handle that format themselves.
pub fn format_output<T: Serialize>(data: &T, format: &str) -> String {
    match OutputFormat::from(format) {
        OutputFormat::Json => {
            serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table | OutputFormat::Text => {
            format!("{:?}", serde_json::to_value(data).unwrap_or_default())
        }
    }
}

#[derive(Tabled)]
struct ChannelRow<'a> {
    #[tabled(rename = "#")]
    number: usize,
    name: &'a str,
    group: &'a str,
    kind: String,
    url: &'a str,
}

pub fn channel_table(channels: &[(usize, &Channel)]) -> String {
    let rows = channels.iter().map(|(idx, channel)| ChannelRow {
        number: idx + 1,
        name: &channel.name,
        group: channel.group.as_deref().unwrap_or("-"),
        kind: channel.stream_kind().to_string(),
        url: &channel.url,
    });
    Table::new(rows).with(Style::modern()).to_string()
}

#[derive(Tabled)]
struct ProbeRow<'a> {
    name: &'a str,
    kind: String,
    status: String,
    levels: String,
    error: &'a str,
}

pub fn probe_table(reports: &[ProbeReport]) -> String {
    let rows = reports.iter().map(|report| ProbeRow {
        name: &report.name,
        kind: report.kind.to_string(),
        status: report
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string()),
        levels: quality_summary(report),
        error: report.error.as_deref().unwrap_or(""),
    });
    Table::new(rows).with(Style::modern()).to_string()
}

/// `360p, 720p, 1080p` or `-`
pub fn quality_summary(report: &ProbeReport) -> String {
    if report.quality_levels.is_empty() {
        return "-".to_string();
    }
    report
        .quality_levels
        .iter()
        .map(|l| format!("{}p", l.height))
        .collect::<Vec<_>>()
        .join(", ")
}
