//! Piped API provider

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::{quality_rank, ResolveTarget, StreamProvider};
use crate::domain::errors::*;
use crate::domain::model::StreamDescriptor;
use crate::network::FallbackFetcher;
use crate::ports::HttpRequest;

pub const PIPED_INSTANCES: [&str; 17] = [
    "https://pipedapi.kavin.rocks",
    "https://api.piped.privacydev.net",
    "https://pipedapi.drgns.space",
    "https://pipedapi.sq.r4fo.com",
    "https://api.piped.yt",
    "https://pipedapi.frontendfriendly.xyz",
    "https://api.piped.projectsegfau.lt",
    "https://pipedapi.moomoo.me",
    "https://pipedapi.smnz.de",
    "https://pipedapi.adminforge.de",
    "https://pipedapi.lunar.icu",
    "https://pipedapi.leptons.xyz",
    "https://pipedapi.ducks.party",
    "https://pa.il.ax",
    "https://api.piped.r4fo.com",
    "https://pipedapi.kavin.rocks",
    "https://piped-api.lunar.icu",
];

#[derive(Debug, Deserialize)]
pub struct PipedStreams {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "videoStreams", default)]
    pub video_streams: Option<Vec<PipedVideoStream>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipedVideoStream {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(rename = "videoOnly", default)]
    pub video_only: Option<bool>,
}

pub struct PipedProvider {
    instances: Vec<String>,
}

impl PipedProvider {
    pub fn new(instances: Vec<String>) -> Self {
        Self { instances }
    }

    /// Best stream by the muxed-first, quality-ladder policy
    pub fn select(streams: &PipedStreams) -> Option<StreamDescriptor> {
        let all: Vec<&PipedVideoStream> = streams
            .video_streams
            .as_deref()?
            .iter()
            .filter(|s| s.url.as_deref().map_or(false, |u| !u.is_empty()))
            .collect();

        let muxed: Vec<&PipedVideoStream> = all
            .iter()
            .copied()
            .filter(|s| s.video_only == Some(false))
            .collect();

        let (mut candidates, is_muxed) = if muxed.is_empty() {
            (all, false)
        } else {
            (muxed, true)
        };
        candidates.sort_by_key(|s| quality_rank(s.quality.as_deref()));

        let best = candidates.first()?;
        let title = streams
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("video");

        Some(StreamDescriptor {
            url: best.url.clone()?,
            filename: format!("{}.mp4", title),
            muxed: is_muxed,
            provider: "Piped".to_string(),
        })
    }
}

impl Default for PipedProvider {
    fn default() -> Self {
        Self::new(PIPED_INSTANCES.iter().map(|s| s.to_string()).collect())
    }
}

#[async_trait]
impl StreamProvider for PipedProvider {
    fn name(&self) -> &str {
        "Piped"
    }

    fn instances(&self) -> &[String] {
        &self.instances
    }

    async fn query(
        &self,
        fetcher: &FallbackFetcher,
        instance: &str,
        target: &ResolveTarget,
    ) -> DomainResult<Option<StreamDescriptor>> {
        let url = format!("{}/streams/{}", instance.trim_end_matches('/'), target.video_id);
        let outcome = fetcher.fetch_with_fallback(&HttpRequest::get(url)).await?;
        let streams: PipedStreams = outcome.response.json()?;

        let descriptor = Self::select(&streams);
        if let Some(d) = &descriptor {
            if !d.muxed {
                warn!(instance, "Only video-only streams available; the clip may be silent");
            }
        }
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: serde_json::Value) -> PipedStreams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_select_prefers_muxed_then_quality() {
        let streams = parse(serde_json::json!({
            "title": "Talk",
            "videoStreams": [
                { "url": "https://s/1080-video-only", "quality": "1080p", "videoOnly": true },
                { "url": "https://s/360", "quality": "360p", "videoOnly": false },
                { "url": "https://s/720", "quality": "720p", "videoOnly": false }
            ]
        }));
        let d = PipedProvider::select(&streams).unwrap();
        assert_eq!(d.url, "https://s/720");
        assert_eq!(d.filename, "Talk.mp4");
        assert!(d.muxed);
    }

    #[test]
    fn test_select_falls_back_to_video_only() {
        let streams = parse(serde_json::json!({
            "videoStreams": [
                { "url": "https://s/480", "quality": "480p", "videoOnly": true },
                { "url": "https://s/1080", "quality": "1080p", "videoOnly": true }
            ]
        }));
        let d = PipedProvider::select(&streams).unwrap();
        assert_eq!(d.url, "https://s/1080");
        assert_eq!(d.filename, "video.mp4");
        assert!(!d.muxed);
    }

    #[test]
    fn test_select_empty_or_missing_streams() {
        assert!(PipedProvider::select(&parse(serde_json::json!({ "videoStreams": [] }))).is_none());
        assert!(PipedProvider::select(&parse(serde_json::json!({ "error": "x" }))).is_none());
    }
}
