// YouTube Data API v3 client for channel lookups, upload listings and video uploads
// Docs: https://developers.google.com/youtube/v3

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio_util::io::ReaderStream;

use crate::utils::escape_html;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com";

/// videos.list accepts at most 50 ids per call.
const MAX_IDS_PER_REQUEST: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum YouTubeError {
    #[error("YouTube request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("YouTube API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("the authenticated account has no YouTube channel")]
    NoChannel,
    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode video metadata: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrivacyStatus {
    Public,
    #[default]
    Private,
    Unlisted,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid privacy status '{0}', expected public, private or unlisted")]
pub struct InvalidPrivacyStatus(pub String);

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyStatus::Public => "public",
            PrivacyStatus::Private => "private",
            PrivacyStatus::Unlisted => "unlisted",
        }
    }
}

impl FromStr for PrivacyStatus {
    type Err = InvalidPrivacyStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(PrivacyStatus::Public),
            "private" => Ok(PrivacyStatus::Private),
            "unlisted" => Ok(PrivacyStatus::Unlisted),
            _ => Err(InvalidPrivacyStatus(s.to_string())),
        }
    }
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Channel Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelItem {
    pub id: String,
    pub snippet: Option<ChannelSnippet>,
    #[serde(rename = "contentDetails")]
    pub content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChannelContentDetails {
    #[serde(rename = "relatedPlaylists")]
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
pub struct RelatedPlaylists {
    pub uploads: Option<String>,
}

// ============================================================================
// Playlist and Video Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PlaylistItemListResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItemSnippet {
    #[serde(rename = "resourceId")]
    pub resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
pub struct ResourceId {
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<Video>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub id: String,
    pub snippet: VideoSnippet,
    pub statistics: Option<VideoStatistics>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoSnippet {
    pub title: String,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
}

// Counts arrive as decimal strings; dislikeCount is only returned to the video owner
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    pub view_count: Option<String>,
    pub like_count: Option<String>,
    pub dislike_count: Option<String>,
    pub comment_count: Option<String>,
}

// ============================================================================
// Video Upload Structures
// ============================================================================

#[derive(Debug, Serialize)]
pub struct UploadSnippet {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct UploadStatus {
    #[serde(rename = "privacyStatus")]
    pub privacy_status: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResource {
    pub snippet: UploadSnippet,
    pub status: UploadStatus,
}

#[derive(Debug, Deserialize)]
pub struct VideoInsertResponse {
    pub id: String,
}

// ============================================================================
// YouTube Client Implementation
// ============================================================================

#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: Client,
    api_base: String,
    privacy_status: PrivacyStatus,
}

impl YouTubeClient {
    pub fn new(client: Client, api_base: &str, privacy_status: PrivacyStatus) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            privacy_status,
        }
    }

    fn data_url(&self, resource: &str) -> String {
        format!("{}/youtube/v3/{}", self.api_base, resource)
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/youtube/v3/videos", self.api_base)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<T, YouTubeError> {
        let response = self
            .client
            .get(self.data_url(resource))
            .query(query)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            tracing::error!("YouTube {} request failed ({}): {}", resource, status, body);
            return Err(YouTubeError::Api { status, body });
        }

        Ok(response.json().await?)
    }

    /// Description of the authenticated user's first channel
    pub async fn channel_description(&self, access_token: &str) -> Result<String, YouTubeError> {
        let response: ChannelListResponse = self
            .get_json(access_token, "channels", &[("part", "snippet"), ("mine", "true")])
            .await?;

        let channel = response
            .items
            .into_iter()
            .next()
            .ok_or(YouTubeError::NoChannel)?;

        Ok(channel.snippet.map(|s| s.description).unwrap_or_default())
    }

    /// ID of the uploads playlist, or None when the account has no channel
    pub async fn uploads_playlist_id(&self, access_token: &str) -> Result<Option<String>, YouTubeError> {
        let response: ChannelListResponse = self
            .get_json(access_token, "channels", &[("part", "contentDetails"), ("mine", "true")])
            .await?;

        Ok(response
            .items
            .into_iter()
            .next()
            .and_then(|channel| channel.content_details)
            .and_then(|details| details.related_playlists.uploads))
    }

    pub async fn playlist_video_ids(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> Result<Vec<String>, YouTubeError> {
        let mut video_ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("part", "snippet"),
                ("playlistId", playlist_id),
                ("maxResults", "50"),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: PlaylistItemListResponse =
                self.get_json(access_token, "playlistItems", &query).await?;

            video_ids.extend(
                page.items
                    .into_iter()
                    .filter_map(|item| item.snippet.resource_id.video_id),
            );

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(video_ids)
    }

    pub async fn videos(&self, access_token: &str, ids: &[String]) -> Result<Vec<Video>, YouTubeError> {
        let mut videos = Vec::with_capacity(ids.len());

        for batch in ids.chunks(MAX_IDS_PER_REQUEST) {
            let joined = batch.join(",");
            let response: VideoListResponse = self
                .get_json(
                    access_token,
                    "videos",
                    &[("part", "snippet,statistics"), ("id", joined.as_str())],
                )
                .await?;
            videos.extend(response.items);
        }

        Ok(videos)
    }

    /// All videos in the authenticated user's uploads playlist
    pub async fn uploaded_videos(&self, access_token: &str) -> Result<Vec<Video>, YouTubeError> {
        let Some(playlist_id) = self.uploads_playlist_id(access_token).await? else {
            tracing::info!("No uploads playlist for the authenticated account");
            return Ok(Vec::new());
        };

        let video_ids = self.playlist_video_ids(access_token, &playlist_id).await?;
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.videos(access_token, &video_ids).await
    }

    /// Upload a video file with the configured privacy status.
    /// The file is streamed from disk rather than buffered in memory.
    pub async fn upload_video(
        &self,
        access_token: &str,
        video_path: &Path,
        title: &str,
        description: &str,
    ) -> Result<String, YouTubeError> {
        let file = tokio::fs::File::open(video_path).await?;
        let length = file.metadata().await?.len();
        let file_name = video_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .to_string();

        let metadata = UploadResource {
            snippet: UploadSnippet {
                title: title.to_string(),
                description: description.to_string(),
            },
            status: UploadStatus {
                privacy_status: self.privacy_status.as_str().to_string(),
            },
        };
        let metadata_json = serde_json::to_string(&metadata)?;

        let form = Form::new()
            .part(
                "snippet",
                Part::text(metadata_json).mime_str("application/json")?,
            )
            .part(
                "media",
                Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), length)
                    .file_name(file_name)
                    .mime_str("video/*")?,
            );

        tracing::info!("Uploading video to YouTube: {} ({} bytes, {})", title, length, self.privacy_status);

        let response = self
            .client
            .post(self.upload_url())
            .query(&[("part", "snippet,status"), ("uploadType", "multipart")])
            .bearer_auth(access_token)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            tracing::error!("YouTube upload failed ({}): {}", status, body);
            return Err(YouTubeError::Api { status, body });
        }

        let inserted: VideoInsertResponse = response.json().await?;
        tracing::info!("Video uploaded to YouTube (ID: {})", inserted.id);

        Ok(format!("Video Uploaded Successfully. Video ID is {}", inserted.id))
    }
}

/// Render videos as HTML paragraphs, one block per video separated by `<hr>`.
pub fn format_video_list(videos: &[Video]) -> String {
    let mut html = String::new();

    for video in videos {
        let stats = video.statistics.clone().unwrap_or_default();
        let count = |value: &Option<String>| value.clone().unwrap_or_else(|| "0".to_string());

        html.push_str(&format!("<p>Video ID: {}</p>", escape_html(&video.id)));
        html.push_str(&format!("<p>Title: {}</p>", escape_html(&video.snippet.title)));
        html.push_str(&format!(
            "<p>Published At: {}</p>",
            escape_html(video.snippet.published_at.as_deref().unwrap_or(""))
        ));
        html.push_str(&format!("<p>View Count: {}</p>", escape_html(&count(&stats.view_count))));
        html.push_str(&format!("<p>Like Count: {}</p>", escape_html(&count(&stats.like_count))));
        html.push_str(&format!(
            "<p>Dislike Count: {}</p>",
            escape_html(&count(&stats.dislike_count))
        ));
        html.push_str(&format!(
            "<p>Comment Count: {}</p>",
            escape_html(&count(&stats.comment_count))
        ));
        html.push_str("<hr>");
    }

    html
}
