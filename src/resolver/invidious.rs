//! Invidious API provider

use async_trait::async_trait;
use serde::Deserialize;

use super::{ResolveTarget, StreamProvider};
use crate::domain::errors::*;
use crate::domain::model::StreamDescriptor;
use crate::network::FallbackFetcher;
use crate::ports::HttpRequest;

pub const INVIDIOUS_INSTANCES: [&str; 17] = [
    "https://inv.tux.pizza",
    "https://invidious.projectsegfau.lt",
    "https://invidious.jing.rocks",
    "https://vid.puffyan.us",
    "https://invidious.nerdvpn.de",
    "https://inv.zzls.xyz",
    "https://invidious.perennialte.ch",
    "https://yt.artemislena.eu",
    "https://invidious.privacyredirect.com",
    "https://invidious.drgns.space",
    "https://invidious.lunar.icu",
    "https://invidious.fdn.fr",
    "https://invidious.io.lol",
    "https://invidious.private.coffee",
    "https://iv.ggtyler.dev",
    "https://invidious.flokinet.to",
    "https://invidious.privacydev.net",
];

#[derive(Debug, Deserialize)]
pub struct InvidiousVideo {
    #[serde(default)]
    pub title: Option<String>,
    /// Pre-muxed formats; `adaptiveFormats` is never read
    #[serde(rename = "formatStreams", default)]
    pub format_streams: Option<Vec<InvidiousFormat>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvidiousFormat {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub container: Option<String>,
}

pub struct InvidiousProvider {
    instances: Vec<String>,
}

impl InvidiousProvider {
    pub fn new(instances: Vec<String>) -> Self {
        Self { instances }
    }

    /// First mp4 format, else the first format with a URL
    pub fn select(video: &InvidiousVideo) -> Option<StreamDescriptor> {
        let formats: Vec<&InvidiousFormat> = video
            .format_streams
            .as_deref()?
            .iter()
            .filter(|f| f.url.as_deref().map_or(false, |u| !u.is_empty()))
            .collect();

        let chosen = formats
            .iter()
            .find(|f| f.container.as_deref() == Some("mp4"))
            .or_else(|| formats.first())?;

        let title = video
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("video");
        let container = chosen
            .container
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or("mp4");

        Some(StreamDescriptor {
            url: chosen.url.clone()?,
            filename: format!("{}.{}", title, container),
            muxed: true,
            provider: "Invidious".to_string(),
        })
    }
}

impl Default for InvidiousProvider {
    fn default() -> Self {
        Self::new(INVIDIOUS_INSTANCES.iter().map(|s| s.to_string()).collect())
    }
}

#[async_trait]
impl StreamProvider for InvidiousProvider {
    fn name(&self) -> &str {
        "Invidious"
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
        let url = format!(
            "{}/api/v1/videos/{}",
            instance.trim_end_matches('/'),
            target.video_id
        );
        let outcome = fetcher.fetch_with_fallback(&HttpRequest::get(url)).await?;
        let video: InvidiousVideo = outcome.response.json()?;
        Ok(Self::select(&video))
    }
}
