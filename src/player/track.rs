//! Resolved tracks and their display implementations.

use std::fmt::Display;
use std::time::Duration;

use itertools::Itertools;
use serde::Deserialize;

use crate::error::ResolveError;
use crate::serenity;
use crate::serenity::{ChannelId, Mentionable, UserId};

/// Metadata of a single video as printed by `yt-dlp -J`.
/// Only the fields the bot shows or needs are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackInfo {
    pub title: String,
    pub uploader: Option<String>,
    pub uploader_url: Option<String>,
    /// In `YYYYMMDD` format.
    pub upload_date: Option<String>,
    /// In seconds, missing for live streams.
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub webpage_url: String,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub dislike_count: Option<u64>,
    /// Direct, time limited url of the selected audio format.
    pub url: Option<String>,
}

/// Tags shown in the embed.
const MAX_TAGS: usize = 8;
/// Embed fields are limited to 1024 characters.
const MAX_DESCRIPTION_CHARS: usize = 300;

/// Who asked for a track and where to talk about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub requester: UserId,
    pub channel: ChannelId,
}

/// A playable track. Immutable once resolved.
#[derive(Debug, Clone)]
pub struct Track {
    pub title: String,
    pub uploader: Option<String>,
    pub uploader_url: Option<String>,
    pub upload_date: Option<String>,
    pub duration: Option<Duration>,
    pub thumbnail_url: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub dislikes: Option<u64>,
    /// Url of the page the track was found on.
    pub url: String,
    /// Url of the audio stream.
    pub stream_url: String,
    pub requester: UserId,
    /// Text channel that gets the "now playing" message.
    pub channel: ChannelId,
}

impl Track {
    /// Build a track from extractor metadata. Fails if there is no stream to play.
    pub fn new(info: TrackInfo, origin: Origin) -> Result<Self, ResolveError> {
        let stream_url = info.url.ok_or_else(|| ResolveError::NoStream {
            url: info.webpage_url.clone(),
        })?;
        let duration = info
            .duration
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64);

        Ok(Track {
            title: info.title,
            uploader: info.uploader,
            uploader_url: info.uploader_url,
            upload_date: info.upload_date,
            duration,
            thumbnail_url: info.thumbnail,
            description: info.description,
            tags: info.tags.unwrap_or_default(),
            views: info.view_count,
            likes: info.like_count,
            dislikes: info.dislike_count,
            url: info.webpage_url,
            stream_url,
            requester: origin.requester,
            channel: origin.channel,
        })
    }

    /// Upload date as `DD.MM.YYYY`.
    pub fn upload_date_display(&self) -> Option<String> {
        let date = self.upload_date.as_deref()?;
        let (year, month, day) = (date.get(0..4)?, date.get(4..6)?, date.get(6..8)?);
        Some(format!("{day}.{month}.{year}"))
    }

    /// The first few tags, comma separated.
    pub fn tags_display(&self) -> Option<String> {
        if self.tags.is_empty() {
            return None;
        }
        Some(self.tags.iter().take(MAX_TAGS).join(", "))
    }

    /// The description cut down to fit an embed field.
    pub fn description_preview(&self) -> Option<String> {
        let description = self.description.as_deref()?.trim();
        if description.is_empty() {
            return None;
        }
        match description.char_indices().nth(MAX_DESCRIPTION_CHARS) {
            Some((cut, _)) => Some(format!("{}...", description[..cut].trim_end())),
            None => Some(description.to_string()),
        }
    }

    /// Human readable duration, `Live` if unknown.
    pub fn duration_display(&self) -> String {
        match self.duration {
            Some(dur) => DurationParts::from(dur).to_string(),
            None => "Live".to_string(),
        }
    }

    /// The embed announcing this track.
    pub fn embed(&self) -> serenity::CreateEmbed {
        let uploader = self.uploader.as_deref().unwrap_or("Unknown");
        let uploader = match &self.uploader_url {
            Some(url) => format!("[{uploader}]({url})"),
            None => uploader.to_string(),
        };

        let mut embed = serenity::CreateEmbed::new()
            .title("Now playing")
            .description(format!("```css\n{}\n```", self.title))
            .colour(serenity::Colour::BLURPLE)
            .field("Duration", self.duration_display(), true)
            .field("Requested by", self.requester.mention().to_string(), true)
            .field("Uploader", uploader, true)
            .field("URL", format!("[Click]({})", self.url), true);

        if let Some(date) = self.upload_date_display() {
            embed = embed.field("Uploaded", date, true);
        }
        if let Some(views) = self.views {
            embed = embed.field("Views", views.to_string(), true);
        }
        if let Some(likes) = self.likes {
            embed = embed.field("Likes", likes.to_string(), true);
        }
        if let Some(dislikes) = self.dislikes {
            embed = embed.field("Dislikes", dislikes.to_string(), true);
        }
        if let Some(tags) = self.tags_display() {
            embed = embed.field("Tags", tags, false);
        }
        if let Some(description) = self.description_preview() {
            embed = embed.field("Description", description, false);
        }
        if let Some(url) = &self.thumbnail_url {
            embed = embed.thumbnail(url);
        }
        embed
    }
}

/// Short form used in replies.
impl Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.uploader {
            Some(uploader) => write!(f, "**{}** by **{uploader}**", self.title),
            None => write!(f, "**{}**", self.title),
        }
    }
}

/// A duration split into days, hours, minutes and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationParts {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl From<Duration> for DurationParts {
    fn from(dur: Duration) -> Self {
        let total_secs = dur.as_secs();
        let total_mins = total_secs / 60;
        let total_hours = total_mins / 60;

        Self {
            days: total_hours / 24,
            hours: total_hours % 24,
            minutes: total_mins % 60,
            seconds: total_secs % 60,
        }
    }
}

/// Lists the non-zero parts, e.g. `1 hour, 3 minutes, 20 seconds`.
impl Display for DurationParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts = [
            (self.days, "day"),
            (self.hours, "hour"),
            (self.minutes, "minute"),
            (self.seconds, "second"),
        ];

        let mut wrote = false;
        for (amount, unit) in parts.into_iter().filter(|(amount, _)| *amount > 0) {
            if wrote {
                write!(f, ", ")?;
            }
            let plural = if amount == 1 { "" } else { "s" };
            write!(f, "{amount} {unit}{plural}")?;
            wrote = true;
        }

        if !wrote {
            write!(f, "0 seconds")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::player::testing;

    fn info() -> TrackInfo {
        serde_json::from_value(serde_json::json!({
            "title": "One Last Kiss",
            "uploader": "Hikaru Utada",
            "upload_date": "20210309",
            "duration": 252.0,
            "tags": null,
            "webpage_url": "https://www.youtube.com/watch?v=0Uhh62MUEic",
            "url": "https://rr1.example.com/audio",
            "view_count": 1000,
        }))
        .unwrap()
    }

    #[test]
    fn builds_from_info() {
        let track = Track::new(info(), testing::origin(7)).unwrap();

        assert_eq!(track.stream_url, "https://rr1.example.com/audio");
        assert_eq!(track.duration, Some(Duration::from_secs(252)));
        assert!(track.tags.is_empty());
        assert_eq!(track.requester, UserId::new(7));
        assert_eq!(track.upload_date_display().as_deref(), Some("09.03.2021"));
        assert_eq!(track.to_string(), "**One Last Kiss** by **Hikaru Utada**");
    }

    #[test]
    fn missing_stream_is_an_error() {
        let info = TrackInfo { url: None, ..info() };
        let result = Track::new(info, testing::origin(7));
        assert!(matches!(result, Err(ResolveError::NoStream { .. })));
    }

    #[test]
    fn duration_parts() {
        let parts = DurationParts::from(Duration::from_secs(90061));
        assert_eq!(
            parts,
            DurationParts {
                days: 1,
                hours: 1,
                minutes: 1,
                seconds: 1
            }
        );
        assert_eq!(parts.to_string(), "1 day, 1 hour, 1 minute, 1 second");

        let parts = DurationParts::from(Duration::from_secs(3 * 3600 + 5));
        assert_eq!(parts.to_string(), "3 hours, 5 seconds");

        assert_eq!(DurationParts::from(Duration::ZERO).to_string(), "0 seconds");
    }

    #[test]
    fn embed_shows_extra_metadata() {
        let mut track = testing::track("a", 1);
        track.likes = Some(12);
        track.tags = (0..10).map(|i| format!("tag{i}")).collect();
        track.description = Some(format!("  {}  ", "x".repeat(400)));

        let tags = track.tags_display().unwrap();
        assert!(tags.starts_with("tag0, tag1"));
        assert!(tags.ends_with("tag7"));

        let description = track.description_preview().unwrap();
        assert_eq!(description.len(), MAX_DESCRIPTION_CHARS + 3);
        assert!(description.ends_with("..."));

        let embed = serde_json::to_value(track.embed()).unwrap();
        let names: Vec<_> = embed["fields"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|field| field["name"].as_str())
            .collect();
        assert!(names.contains(&"Likes"));
        assert!(names.contains(&"Tags"));
        assert!(names.contains(&"Description"));
        assert!(!names.contains(&"Dislikes"));
    }

    #[test]
    fn short_description_is_kept() {
        let mut track = testing::track("a", 1);
        assert_eq!(track.tags_display(), None);
        assert_eq!(track.description_preview(), None);

        track.description = Some("Official audio".to_string());
        assert_eq!(track.description_preview().as_deref(), Some("Official audio"));
    }

    #[test]
    fn bad_upload_date_is_skipped() {
        let mut track = testing::track("a", 1);
        track.upload_date = Some("2021".to_string());
        assert_eq!(track.upload_date_display(), None);
    }
}
