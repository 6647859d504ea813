//! Locator normalization and video identifier extraction

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::domain::errors::*;
use crate::domain::model::Locator;

/// Query parameters that only carry tracking or playback-offset state
const TRACKING_PARAMS: [&str; 4] = ["feature", "t", "si", "pp"];

const VIDEO_ID_LEN: usize = 11;

lazy_static! {
    static ref WATCH_QUERY: Regex = Regex::new(r"[?&]v=([^#&?]*)").unwrap();
    static ref SHORT_LINK: Regex = Regex::new(r"youtu\.be/([^#&?/]*)").unwrap();
    static ref EMBED_PATH: Regex = Regex::new(r"/(?:embed|v|shorts|live)/([^#&?/]*)").unwrap();
}

/// Whether the URL host belongs to the main video-sharing domain
fn is_watch_host(host: &str) -> bool {
    host == "youtube.com" || host.ends_with(".youtube.com")
}

fn is_short_host(host: &str) -> bool {
    host == "youtu.be" || host.ends_with(".youtu.be")
}

/// Whether the input points at the video-sharing platform rather than a direct file
pub fn is_video_sharing(input: &str) -> bool {
    match Url::parse(input.trim()) {
        Ok(url) => url
            .host_str()
            .map(|host| is_watch_host(host) || is_short_host(host))
            .unwrap_or(false),
        Err(_) => input.contains("youtube.com") || input.contains("youtu.be"),
    }
}

/// Canonical form of a locator.
///
/// Recognized video-sharing links lose their tracking parameters, watch links
/// keep only `v` on `www.youtube.com`, `/shorts/<id>` and `/live/<id>` become
/// watch links and short links lose their whole query. Anything else comes
/// back trimmed and otherwise untouched.
pub fn normalize(input: &str) -> String {
    let trimmed = input.trim();
    let mut url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) => return trimmed.to_string(),
    };
    let host = match url.host_str() {
        Some(host) => host.to_ascii_lowercase(),
        None => return trimmed.to_string(),
    };

    if is_short_host(&host) {
        return format!("{}://{}{}", url.scheme(), host, url.path());
    }
    if !is_watch_host(&host) {
        return trimmed.to_string();
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if url.path() == "/watch" {
        if let Some((_, v)) = kept.iter().find(|(key, _)| key == "v") {
            if !v.is_empty() {
                return watch_url(v);
            }
        }
    }

    let segments: Vec<&str> = url.path().trim_matches('/').split('/').collect();
    if let [kind, id] = segments.as_slice() {
        if (*kind == "shorts" || *kind == "live") && !id.is_empty() {
            return watch_url(id);
        }
    }

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept.iter());
    }
    url.to_string()
}

fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

/// The 11-character identifier, trying watch-query, short-link and embed shapes in order
pub fn extract_id(locator: &str) -> Option<String> {
    [&*WATCH_QUERY, &*SHORT_LINK, &*EMBED_PATH]
        .iter()
        .find_map(|pattern| {
            pattern
                .captures(locator)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
                .filter(|token| is_video_id(token))
                .map(str::to_string)
        })
}

fn is_video_id(token: &str) -> bool {
    token.len() == VIDEO_ID_LEN
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Parse a user-supplied locator.
///
/// Video-sharing links must yield an identifier; other input must be an
/// http(s) URL that can be fetched directly.
pub fn parse_locator(raw: &str) -> DomainResult<Locator> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Locator("Please enter a valid URL".to_string()));
    }

    let canonical = normalize(trimmed);

    if is_video_sharing(trimmed) {
        let video_id = extract_id(&canonical)
            .or_else(|| extract_id(trimmed))
            .ok_or_else(|| {
                DomainError::Locator(format!("Could not extract video ID from '{}'", trimmed))
            })?;
        return Ok(Locator {
            raw: raw.to_string(),
            canonical,
            video_id: Some(video_id),
        });
    }

    match Url::parse(&canonical) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Locator {
            raw: raw.to_string(),
            canonical,
            video_id: None,
        }),
        _ => Err(DomainError::Locator(format!(
            "'{}' is neither a video-sharing link nor an http(s) URL",
            trimmed
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_link_is_canonicalized() {
        let canonical = normalize("https://youtube.com/watch?v=ABCDEFGHIJK&feature=share");
        assert_eq!(canonical, "https://www.youtube.com/watch?v=ABCDEFGHIJK");
        assert_eq!(extract_id(&canonical).as_deref(), Some("ABCDEFGHIJK"));
    }

    #[test]
    fn test_short_link_drops_offset() {
        let canonical = normalize("https://youtu.be/ABCDEFGHIJK?t=30");
        assert_eq!(canonical, "https://youtu.be/ABCDEFGHIJK");
        assert!(!canonical.contains("t=30"));
        assert_eq!(extract_id(&canonical).as_deref(), Some("ABCDEFGHIJK"));
    }

    #[test]
    fn test_shorts_and_live_paths_become_watch_links() {
        assert_eq!(
            normalize("https://www.youtube.com/shorts/ABCDEFGHIJK?si=xyz"),
            "https://www.youtube.com/watch?v=ABCDEFGHIJK"
        );
        assert_eq!(
            normalize("https://m.youtube.com/live/ABCDEFGHIJK"),
            "https://www.youtube.com/watch?v=ABCDEFGHIJK"
        );
    }

    #[test]
    fn test_embed_link_keeps_path_and_yields_id() {
        let canonical = normalize("https://www.youtube.com/embed/ABCDEFGHIJK?si=abc&start=5");
        assert_eq!(canonical, "https://www.youtube.com/embed/ABCDEFGHIJK?start=5");
        assert_eq!(extract_id(&canonical).as_deref(), Some("ABCDEFGHIJK"));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in [
            "https://youtube.com/watch?v=ABCDEFGHIJK&feature=share",
            "https://youtu.be/ABCDEFGHIJK?t=30",
            "https://www.youtube.com/shorts/ABCDEFGHIJK",
            "https://www.youtube.com/embed/ABCDEFGHIJK?pp=1&start=5",
            "https://example.com/video.mp4?token=1",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {}", input);
        }
    }

    #[test]
    fn test_non_url_input_is_trimmed_only() {
        assert_eq!(normalize("  not a url  "), "not a url");
    }

    #[test]
    fn test_extract_id_requires_exact_length() {
        assert_eq!(extract_id("https://www.youtube.com/watch?v=SHORT"), None);
        assert_eq!(extract_id("https://www.youtube.com/watch?v=ABCDEFGHIJKL"), None);
        assert_eq!(extract_id("https://example.com/file.mp4"), None);
    }

    #[test]
    fn test_parse_locator_classifies_input() {
        let sharing = parse_locator("https://youtu.be/ABCDEFGHIJK?t=30").unwrap();
        assert_eq!(sharing.video_id.as_deref(), Some("ABCDEFGHIJK"));

        let direct = parse_locator("https://cdn.example.com/clip.mp4").unwrap();
        assert_eq!(direct.video_id, None);
        assert_eq!(direct.canonical, "https://cdn.example.com/clip.mp4");

        assert!(matches!(
            parse_locator("https://www.youtube.com/watch?v=bad"),
            Err(DomainError::Locator(_))
        ));
        assert!(matches!(parse_locator("   "), Err(DomainError::Locator(_))));
        assert!(matches!(parse_locator("ftp://host/file"), Err(DomainError::Locator(_))));
    }
}
