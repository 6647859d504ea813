//! Cobalt API provider

use async_trait::async_trait;
use serde::Deserialize;

use super::{ResolveTarget, StreamProvider};
use crate::domain::errors::*;
use crate::domain::model::StreamDescriptor;
use crate::network::FallbackFetcher;
use crate::ports::HttpRequest;

pub const COBALT_INSTANCES: [&str; 17] = [
    "https://cobalt.kwiatekmiki.pl",
    "https://api.tiklydown.eu",
    "https://cobalt.arms.nu",
    "https://cobalt.xyzen.dev",
    "https://api.doubutsu.wtf",
    "https://cobalt.q1.pm",
    "https://cobalt.pladys.me",
    "https://cobalt.club",
    "https://cobalt.datasync.pw",
    "https://cobalt.kinsh.uk",
    "https://cobalt.run",
    "https://api.cobalt.tools",
    "https://cobalt.grid.cl",
    "https://cobalt.nerds.pw",
    "https://cobalt.anishapps.com",
    "https://cobalt.200021.xyz",
    "https://cobalt.slpy.one",
];

#[derive(Debug, Deserialize)]
pub struct CobaltResponse {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub picker: Option<Vec<CobaltPickerItem>>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CobaltPickerItem {
    #[serde(default)]
    pub url: Option<String>,
}

pub struct CobaltProvider {
    instances: Vec<String>,
}

impl CobaltProvider {
    pub fn new(instances: Vec<String>) -> Self {
        Self { instances }
    }

    /// `{base}/api/json`, whether or not the base ends in a slash
    pub fn endpoint(instance: &str) -> String {
        if instance.ends_with('/') {
            format!("{}api/json", instance)
        } else {
            format!("{}/api/json", instance)
        }
    }

    pub fn select(response: &CobaltResponse) -> Option<StreamDescriptor> {
        let url = response
            .url
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| {
                response
                    .picker
                    .as_ref()?
                    .first()?
                    .url
                    .clone()
                    .filter(|u| !u.is_empty())
            })?;

        Some(StreamDescriptor {
            url,
            filename: response
                .filename
                .clone()
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| "video.mp4".to_string()),
            muxed: true,
            provider: "Cobalt".to_string(),
        })
    }
}

impl Default for CobaltProvider {
    fn default() -> Self {
        Self::new(COBALT_INSTANCES.iter().map(|s| s.to_string()).collect())
    }
}

#[async_trait]
impl StreamProvider for CobaltProvider {
    fn name(&self) -> &str {
        "Cobalt"
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
        let body = serde_json::json!({ "url": target.canonical_url });
        let request = HttpRequest::post_json(Self::endpoint(instance), &body);
        let outcome = fetcher.fetch_with_fallback(&request).await?;
        let response: CobaltResponse = outcome.response.json()?;
        Ok(Self::select(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_tolerates_trailing_slash() {
        assert_eq!(CobaltProvider::endpoint("https://c.run"), "https://c.run/api/json");
        assert_eq!(CobaltProvider::endpoint("https://c.run/"), "https://c.run/api/json");
    }

    #[test]
    fn test_select_direct_url_or_picker() {
        let direct: CobaltResponse = serde_json::from_value(serde_json::json!({
            "status": "stream", "url": "https://c/dl", "filename": "talk.mp4"
        }))
        .unwrap();
        let d = CobaltProvider::select(&direct).unwrap();
        assert_eq!((d.url.as_str(), d.filename.as_str()), ("https://c/dl", "talk.mp4"));

        let picker: CobaltResponse = serde_json::from_value(serde_json::json!({
            "status": "picker", "picker": [{ "url": "https://c/p0" }, { "url": "https://c/p1" }]
        }))
        .unwrap();
        let d = CobaltProvider::select(&picker).unwrap();
        assert_eq!((d.url.as_str(), d.filename.as_str()), ("https://c/p0", "video.mp4"));
    }

    #[test]
    fn test_select_error_body_is_unusable() {
        let error: CobaltResponse =
            serde_json::from_value(serde_json::json!({ "status": "error", "text": "nope" })).unwrap();
        assert!(CobaltProvider::select(&error).is_none());
    }
}
