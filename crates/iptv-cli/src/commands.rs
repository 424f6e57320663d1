//! CLI command implementations

use crate::config::CliConfig;
use crate::output::{self, OutputFormat};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use iptv_core::{parser, Channel, Playlist, PlaylistLoader, StreamKind, StreamProbe};
use serde::Serialize;
use tracing::info;

/// Load a playlist from an HTTP(S) URL or a local path
async fn load(config: &CliConfig, source: &str) -> iptv_core::Result<Playlist> {
    let loader = PlaylistLoader::new(&config.loader)?;
    if source.starts_with("http://") || source.starts_with("https://") {
        loader.load_from_url(source).await
    } else {
        loader.load_from_file(source).await
    }
}

/// Channels in `group` (all when `None`), with their playlist positions
fn select<'a>(playlist: &'a Playlist, group: Option<&str>) -> Vec<(usize, &'a Channel)> {
    playlist
        .channels
        .iter()
        .enumerate()
        .filter(|(_, c)| group.map_or(true, |g| c.group.as_deref() == Some(g)))
        .collect()
}

#[derive(Serialize)]
struct GroupCount {
    name: String,
    channels: usize,
}

#[derive(Serialize)]
struct PlaylistSummary {
    id: String,
    name: String,
    source: String,
    channels: usize,
    adaptive: usize,
    direct: usize,
    groups: Vec<GroupCount>,
    epg_url: Option<String>,
}

impl PlaylistSummary {
    fn new(playlist: &Playlist, source: &str) -> Self {
        let adaptive = playlist
            .channels
            .iter()
            .filter(|c| c.stream_kind() == StreamKind::Adaptive)
            .count();

        let groups = parser::groups(&playlist.channels)
            .into_iter()
            .map(|name| GroupCount {
                name: name.to_string(),
                channels: playlist
                    .channels
                    .iter()
                    .filter(|c| c.group.as_deref() == Some(name))
                    .count(),
            })
            .collect();

        Self {
            id: playlist.id.to_string(),
            name: playlist.name.clone(),
            source: source.to_string(),
            channels: playlist.len(),
            adaptive,
            direct: playlist.len() - adaptive,
            groups,
            epg_url: playlist.epg_url.clone(),
        }
    }
}

/// Summarize a playlist
pub async fn inspect(config: &CliConfig, source: &str, format: &str) -> anyhow::Result<()> {
    let playlist = load(config, source).await?;
    let summary = PlaylistSummary::new(&playlist, source);

    if OutputFormat::from(format) == OutputFormat::Json {
        println!("{}", output::format_output(&summary, format));
        return Ok(());
    }

    println!("Playlist: {}", summary.name);
    println!("  Source: {}", summary.source);
    println!("  Channels: {}", summary.channels);
    println!("  Adaptive (HLS): {}", summary.adaptive);
    println!("  Direct: {}", summary.direct);
    if let Some(epg) = &summary.epg_url {
        println!("  EPG: {}", epg);
    }

    if !summary.groups.is_empty() {
        println!("\nGroups:");
        for group in &summary.groups {
            println!("  {} ({})", group.name, group.channels);
        }
    }

    Ok(())
}

/// Validate that a playlist loads
pub async fn validate(config: &CliConfig, source: &str, format: &str) -> anyhow::Result<()> {
    let result = load(config, source).await;
    let json = OutputFormat::from(format) == OutputFormat::Json;

    match result {
        Ok(playlist) => {
            if json {
                let report = serde_json::json!({
                    "source": source,
                    "valid": true,
                    "channels": playlist.len(),
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} {} ({} channels)",
                    style("VALID").green().bold(),
                    source,
                    playlist.len()
                );
            }
            Ok(())
        }
        Err(e) => {
            if json {
                let report = serde_json::json!({
                    "source": source,
                    "valid": false,
                    "code": e.error_code(),
                    "error": e.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} {} [{}] {}",
                    style("INVALID").red().bold(),
                    source,
                    e.error_code(),
                    e
                );
            }
            std::process::exit(1);
        }
    }
}

/// List channels
pub async fn channels(
    config: &CliConfig,
    source: &str,
    group: Option<&str>,
    limit: Option<usize>,
    format: &str,
) -> anyhow::Result<()> {
    let playlist = load(config, source).await?;
    let mut selected = select(&playlist, group);
    if let Some(limit) = limit {
        selected.truncate(limit);
    }

    match OutputFormat::from(format) {
        OutputFormat::Json => {
            let list: Vec<&Channel> = selected.iter().map(|(_, c)| *c).collect();
            println!("{}", output::format_output(&list, format));
        }
        OutputFormat::Table => println!("{}", output::channel_table(&selected)),
        OutputFormat::Text => {
            for (idx, channel) in &selected {
                match &channel.group {
                    Some(g) => println!("{:>4}. {} [{}]", idx + 1, channel.name, g),
                    None => println!("{:>4}. {}", idx + 1, channel.name),
                }
                println!("      {}", style(&channel.url).dim());
            }
            println!("\n{} of {} channels", selected.len(), playlist.len());
        }
    }

    Ok(())
}

/// Probe channel streams
pub async fn check(
    config: &CliConfig,
    source: &str,
    group: Option<&str>,
    limit: usize,
    concurrency: usize,
    format: &str,
) -> anyhow::Result<()> {
    let playlist = load(config, source).await?;
    let channels: Vec<Channel> = select(&playlist, group)
        .into_iter()
        .take(limit)
        .map(|(_, c)| c.clone())
        .collect();

    info!(channels = channels.len(), concurrency, "Checking streams");
    let probe = StreamProbe::new(&config.loader)?;
    let output_format = OutputFormat::from(format);

    let progress = if output_format == OutputFormat::Json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(channels.len() as u64)
    };
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")?.progress_chars("=> "),
    );

    let reports = probe
        .probe_all_with(&channels, concurrency, |report| {
            progress.set_message(report.name.clone());
            progress.inc(1);
        })
        .await;
    progress.finish_and_clear();

    let failed = reports.iter().filter(|r| !r.reachable).count();

    match output_format {
        OutputFormat::Json => println!("{}", output::format_output(&reports, format)),
        OutputFormat::Table => println!("{}", output::probe_table(&reports)),
        OutputFormat::Text => {
            for report in &reports {
                let status = if report.reachable {
                    style("OK  ").green()
                } else {
                    style("FAIL").red()
                };
                print!("  {} {}", status, report.name);
                match &report.error {
                    Some(e) => println!(" ({})", e),
                    None if report.kind == StreamKind::Adaptive => {
                        println!(" [{}]", output::quality_summary(report))
                    }
                    None => println!(),
                }
            }
            println!(
                "\nResults: {} reachable, {} failed",
                reports.len() - failed,
                failed
            );
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
