//! Media URL extraction from comment and post text.

use regex::Regex;
use rewind_core::{AppError, HostedId, MediaReference};

pub const VREDDIT: &str = "vreddit";
pub const REDDIT_GIF: &str = "redditgif";
pub const IMGUR: &str = "imgur";
pub const GFYCAT: &str = "gfycat";
pub const STREAMABLE: &str = "streamable";
pub const CATBOX: &str = "catbox";
pub const LINK: &str = "link";

/// Recognised source hosts, in precedence order for matches at the same position.
const SOURCE_PATTERNS: [(&str, &str); 7] = [
    (VREDDIT, r"https?://v\.redd\.it/(\w+)"),
    (REDDIT_GIF, r"https?://i\.redd\.it/(\w+)\.gif"),
    (IMGUR, r"https?://(?:\w+\.)?imgur\.com/(?:(?:a|gallery)/)?([a-zA-Z0-9]{5,7})"),
    (GFYCAT, r"https?://(?:\w+\.)?gfycat\.com/(?:[^\s/]*/)*([a-zA-Z]+)"),
    (STREAMABLE, r"https?://streamable\.com/([a-z0-9]+)"),
    (CATBOX, r"https?://files\.catbox\.moe/(\w+\.(?:gif|mp4|webm))"),
    (
        LINK,
        r"(https?://[^\s()\[\]<>]+?\.(?:gif|mp4|webm)(?:\?[^\s()\[\]<>]*)?)",
    ),
];

/// Canonical URL of a source item.
pub fn source_url(host: &str, id: &str) -> Option<String> {
    match host {
        VREDDIT => Some(format!("https://v.redd.it/{}", id)),
        REDDIT_GIF => Some(format!("https://i.redd.it/{}.gif", id)),
        IMGUR => Some(format!("https://i.imgur.com/{}.mp4", id)),
        GFYCAT => Some(format!("https://gfycat.com/{}", id)),
        STREAMABLE => Some(format!("https://streamable.com/{}", id)),
        CATBOX => Some(format!("https://files.catbox.moe/{}", id)),
        LINK => Some(id.to_string()),
        _ => None,
    }
}

/// A media URL found in text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMatch {
    pub host: &'static str,
    pub id: String,
    pub url: String,
}

impl MediaMatch {
    pub fn key(&self) -> HostedId {
        HostedId::new(self.host, &self.id)
    }

    pub fn into_reference(self, sensitive: bool, depth: u32) -> MediaReference {
        MediaReference {
            host: self.host.to_string(),
            id: self.id,
            url: self.url,
            sensitive,
            depth,
        }
    }
}

pub struct MediaUrlExtractor {
    sources: Vec<(&'static str, Regex)>,
    textpost: Regex,
    sensitive: Regex,
    reupload: Regex,
    mention: Regex,
}

impl MediaUrlExtractor {
    pub fn new(bot_username: &str) -> Result<Self, AppError> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| AppError::Internal(format!("Invalid pattern {}: {}", pattern, e)))
        };

        let sources = SOURCE_PATTERNS
            .iter()
            .map(|(host, pattern)| Ok((*host, compile(pattern)?)))
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(Self {
            sources,
            textpost: compile(r"^https?://(?:\w+\.)?reddit\.com/r/.*?/comments")?,
            sensitive: compile(r"(?i)nsfw")?,
            reupload: compile(r"(?i)reupload|renew")?,
            mention: compile(&format!(r"(?i)\bu/{}\b", regex::escape(bot_username)))?,
        })
    }

    /// Earliest recognised media URL in `text`.
    pub fn extract(&self, text: &str) -> Option<MediaMatch> {
        self.sources
            .iter()
            .enumerate()
            .filter_map(|(order, (host, re))| {
                let caps = re.captures(text)?;
                let start = caps.get(0)?.start();
                let id = caps.get(1)?.as_str().to_string();
                let url = source_url(host, &id)?;
                Some(((start, order), MediaMatch { host, id, url }))
            })
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, m)| m)
    }

    /// Links to another post's comment page are never media.
    pub fn is_textpost(&self, url: &str) -> bool {
        self.textpost.is_match(url)
    }

    pub fn is_sensitive_text(&self, text: &str) -> bool {
        self.sensitive.is_match(text)
    }

    pub fn is_reupload(&self, text: &str) -> bool {
        self.reupload.is_match(text)
    }

    pub fn mentions_bot(&self, text: &str) -> bool {
        self.mention.is_match(text)
    }
}
