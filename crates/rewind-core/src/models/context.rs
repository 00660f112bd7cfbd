use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::media::MediaReference;
use super::thread::ThingRef;
use crate::error::AppError;

/// Everything the pipeline needs to know about one request after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub trigger_id: String,
    /// Where the reply goes. Starts as the trigger and is rebound past a removed automod comment.
    pub reply_target: ThingRef,
    pub author: Option<String>,
    pub subreddit: String,
    pub reference: Option<MediaReference>,
    pub sensitive: bool,
    pub rereverse: bool,
    pub reupload: bool,
    pub unnecessary_manual: bool,
    pub distinguish: bool,
    pub beta: bool,
}

impl Context {
    pub fn new(trigger_id: impl Into<String>, subreddit: impl Into<String>) -> Self {
        let trigger_id = trigger_id.into();
        Self {
            reply_target: ThingRef::Comment(trigger_id.clone()),
            trigger_id,
            author: None,
            subreddit: subreddit.into(),
            reference: None,
            sensitive: false,
            rereverse: false,
            reupload: false,
            unnecessary_manual: false,
            distinguish: false,
            beta: false,
        }
    }

    /// Flatten into a string-keyed map suitable for a queue payload.
    pub fn to_map(&self) -> Map<String, Value> {
        let record = ContextRecord::from(self);
        match serde_json::to_value(record) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Result<Self, AppError> {
        let record: ContextRecord = serde_json::from_value(Value::Object(map))?;
        record.try_into()
    }
}

#[derive(Serialize, Deserialize)]
struct ContextRecord {
    trigger_id: String,
    reply_target: String,
    author: Option<String>,
    subreddit: String,
    origin_host: Option<String>,
    origin_id: Option<String>,
    origin_url: Option<String>,
    origin_depth: Option<u32>,
    sensitive: bool,
    rereverse: bool,
    reupload: bool,
    unnecessary_manual: bool,
    distinguish: bool,
    beta: bool,
}

impl From<&Context> for ContextRecord {
    fn from(ctx: &Context) -> Self {
        let reference = ctx.reference.as_ref();
        ContextRecord {
            trigger_id: ctx.trigger_id.clone(),
            reply_target: ctx.reply_target.fullname(),
            author: ctx.author.clone(),
            subreddit: ctx.subreddit.clone(),
            origin_host: reference.map(|r| r.host.clone()),
            origin_id: reference.map(|r| r.id.clone()),
            origin_url: reference.map(|r| r.url.clone()),
            origin_depth: reference.map(|r| r.depth),
            sensitive: ctx.sensitive,
            rereverse: ctx.rereverse,
            reupload: ctx.reupload,
            unnecessary_manual: ctx.unnecessary_manual,
            distinguish: ctx.distinguish,
            beta: ctx.beta,
        }
    }
}

impl TryFrom<ContextRecord> for Context {
    type Error = AppError;

    fn try_from(record: ContextRecord) -> Result<Self, Self::Error> {
        let reply_target = record
            .reply_target
            .parse::<ThingRef>()
            .map_err(AppError::InvalidInput)?;

        let reference = match (record.origin_host, record.origin_id, record.origin_url) {
            (Some(host), Some(id), Some(url)) => Some(MediaReference {
                host,
                id,
                url,
                sensitive: record.sensitive,
                depth: record.origin_depth.unwrap_or(0),
            }),
            (None, None, None) => None,
            _ => {
                return Err(AppError::InvalidInput(
                    "Context map has a partial media reference".to_string(),
                ))
            }
        };

        Ok(Context {
            trigger_id: record.trigger_id,
            reply_target,
            author: record.author,
            subreddit: record.subreddit,
            reference,
            sensitive: record.sensitive,
            rereverse: record.rereverse,
            reupload: record.reupload,
            unnecessary_manual: record.unnecessary_manual,
            distinguish: record.distinguish,
            beta: record.beta,
        })
    }
}
