//! Stream reachability probe
//!
//! Issues one GET per channel. Adaptive manifests are downloaded and parsed
//! so master-playlist renditions can be listed; direct streams are only
//! checked for a successful status (the body is never read, live transport
//! streams do not end).

use crate::{
    config::LoaderConfig,
    types::{Channel, QualityLevel, StreamKind},
    Error, Result,
};
use reqwest::Client;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};
use url::Url;

/// Outcome of probing one channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub name: String,
    pub url: String,
    pub kind: StreamKind,
    /// HTTP status, if a response arrived
    pub status: Option<u16>,
    pub reachable: bool,
    /// Master-playlist renditions, lowest bitrate first
    pub quality_levels: Vec<QualityLevel>,
    pub error: Option<String>,
}

impl ProbeReport {
    fn new(channel: &Channel) -> Self {
        Self {
            name: channel.name.clone(),
            url: channel.url.clone(),
            kind: channel.stream_kind(),
            status: None,
            reachable: false,
            quality_levels: Vec::new(),
            error: None,
        }
    }

    fn failed(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// HTTP prober for channel streams
#[derive(Clone)]
pub struct StreamProbe {
    client: Client,
}

impl StreamProbe {
    pub fn new(config: &LoaderConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Probe a single channel. Failures are reported, never returned.
    #[instrument(skip(self, channel), fields(name = %channel.name))]
    pub async fn probe(&self, channel: &Channel) -> ProbeReport {
        let report = ProbeReport::new(channel);

        if let Err(e) = Url::parse(&channel.url) {
            return report.failed(Error::InvalidUrl(e));
        }

        let response = match self.client.get(&channel.url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "Stream unreachable");
                return report.failed(Error::Network(e));
            }
        };

        let status = response.status();
        let mut report = ProbeReport {
            status: Some(status.as_u16()),
            ..report
        };
        if !status.is_success() {
            return report.failed(Error::HttpStatus {
                status: status.as_u16(),
                url: channel.url.clone(),
            });
        }
        report.reachable = true;

        if report.kind == StreamKind::Direct {
            return report;
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return report.failed(Error::Network(e)),
        };

        match quality_levels_from_manifest(&body) {
            Ok(levels) => {
                debug!(levels = levels.len(), "Manifest parsed");
                report.quality_levels = levels;
                report
            }
            Err(e) => {
                warn!(error = %e, "Unparseable manifest");
                report.failed(e)
            }
        }
    }

    /// Probe `channels` with at most `concurrency` requests in flight.
    /// Reports come back in channel order.
    pub async fn probe_all(&self, channels: &[Channel], concurrency: usize) -> Vec<ProbeReport> {
        self.probe_all_with(channels, concurrency, |_| {}).await
    }

    /// Like [`probe_all`](Self::probe_all), calling `on_report` once per
    /// channel as its report becomes available
    pub async fn probe_all_with<F>(
        &self,
        channels: &[Channel],
        concurrency: usize,
        mut on_report: F,
    ) -> Vec<ProbeReport>
    where
        F: FnMut(&ProbeReport),
    {
        let concurrency = concurrency.max(1);
        let mut reports: Vec<Option<ProbeReport>> = vec![None; channels.len()];
        let mut pending = channels.iter().cloned().enumerate();
        let mut tasks = JoinSet::new();

        loop {
            while tasks.len() < concurrency {
                let Some((idx, channel)) = pending.next() else {
                    break;
                };
                let probe = self.clone();
                tasks.spawn(async move { (idx, probe.probe(&channel).await) });
            }

            match tasks.join_next().await {
                Some(Ok((idx, report))) => {
                    on_report(&report);
                    reports[idx] = Some(report);
                }
                Some(Err(e)) => warn!(error = %e, "Probe task failed"),
                None => break,
            }
        }

        reports
            .into_iter()
            .zip(channels)
            .map(|(report, channel)| {
                report.unwrap_or_else(|| {
                    let report = ProbeReport::new(channel).failed("probe aborted");
                    on_report(&report);
                    report
                })
            })
            .collect()
    }
}

/// Renditions listed by an HLS manifest. Media playlists have none.
pub fn quality_levels_from_manifest(content: &[u8]) -> Result<Vec<QualityLevel>> {
    let playlist = m3u8_rs::parse_playlist_res(content)
        .map_err(|e| Error::ManifestParse(format!("{:?}", e)))?;

    let master = match playlist {
        m3u8_rs::Playlist::MasterPlaylist(master) => master,
        m3u8_rs::Playlist::MediaPlaylist(_) => return Ok(Vec::new()),
    };

    let mut variants: Vec<(u32, u64)> = master
        .variants
        .iter()
        .filter(|v| !v.is_i_frame)
        .map(|v| (v.resolution.map(|r| r.height as u32).unwrap_or(0), v.bandwidth))
        .collect();
    variants.sort_by_key(|&(height, bitrate)| (bitrate, height));

    Ok(variants
        .into_iter()
        .enumerate()
        .map(|(index, (height, bitrate))| QualityLevel {
            index,
            height,
            bitrate,
        })
        .collect())
}
