//! Analysis document produced by the external analysis collaborator.
//!
//! Only the parts the export pipeline reads are strongly typed; optional
//! descriptive metadata defaults when absent so partially filled documents
//! still load.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub video_transcription: VideoTranscription,
    #[serde(default)]
    pub topic_map: TopicMap,
    #[serde(default)]
    pub clip_catalog: Vec<CatalogClip>,
    /// Clip numbers, best first
    #[serde(default, rename = "top_10_clips")]
    pub top_clips: Vec<u32>,
    #[serde(default)]
    pub stats: Option<AnalysisStats>,
}

impl AnalysisResult {
    /// Find a catalog entry by its clip number
    pub fn clip(&self, number: u32) -> Option<&CatalogClip> {
        self.clip_catalog.iter().find(|c| c.clip_number == number)
    }

    /// Catalog entries in ranked order, skipping numbers with no entry
    pub fn ranked_clips(&self) -> Vec<&CatalogClip> {
        self.top_clips.iter().filter_map(|n| self.clip(*n)).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoTranscription {
    #[serde(default)]
    pub full_text: String,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub timestamp: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicMap {
    #[serde(default)]
    pub primary_themes: Vec<String>,
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub storytelling_arc: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub theme: String,
    #[serde(default)]
    pub subtopics: Vec<String>,
    #[serde(default)]
    pub emotional_tone: String,
}

/// One clip candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogClip {
    pub clip_number: u32,
    #[serde(default)]
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub engagement_score: f64,
    #[serde(default)]
    pub importance_level: String,
    #[serde(default)]
    pub reason_for_engagement: String,
    #[serde(default)]
    pub transcript_excerpt: String,
    #[serde(default)]
    pub ai_description: String,
    #[serde(default)]
    pub social_titles: Option<SocialTitles>,
    #[serde(default)]
    pub thumbnail_suggestions: Vec<ThumbnailSuggestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialTitles {
    #[serde(default)]
    pub youtube_shorts: String,
    #[serde(default)]
    pub tiktok: String,
    #[serde(default)]
    pub instagram_reels: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailSuggestion {
    pub description: String,
    #[serde(default)]
    pub style: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub highest_emotional_impact_clip_id: u32,
    pub most_educational_clip_id: u32,
    pub highest_viral_potential_clip_id: u32,
}
