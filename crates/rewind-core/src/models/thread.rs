use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Platform object id tagged with its kind, written as a fullname (`t1_…`, `t3_…`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ThingRef {
    Comment(String),
    Submission(String),
}

impl ThingRef {
    pub fn id(&self) -> &str {
        match self {
            ThingRef::Comment(id) | ThingRef::Submission(id) => id,
        }
    }

    pub fn fullname(&self) -> String {
        match self {
            ThingRef::Comment(id) => format!("t1_{}", id),
            ThingRef::Submission(id) => format!("t3_{}", id),
        }
    }
}

impl fmt::Display for ThingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fullname())
    }
}

impl FromStr for ThingRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('_') {
            Some(("t1", id)) if !id.is_empty() => Ok(ThingRef::Comment(id.to_string())),
            Some(("t3", id)) if !id.is_empty() => Ok(ThingRef::Submission(id.to_string())),
            _ => Err(format!("Invalid fullname: {}", s)),
        }
    }
}

impl TryFrom<String> for ThingRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ThingRef> for String {
    fn from(value: ThingRef) -> Self {
        value.fullname()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    /// `None` when the account was deleted.
    pub author: Option<String>,
    pub body: String,
    pub subreddit: String,
    pub stickied: bool,
    pub removed: bool,
    pub parent: ThingRef,
    pub submission_id: String,
}

impl Comment {
    pub fn thing_ref(&self) -> ThingRef {
        ThingRef::Comment(self.id.clone())
    }

    pub fn is_authored_by(&self, name: &str) -> bool {
        self.author
            .as_deref()
            .is_some_and(|a| a.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub author: Option<String>,
    pub title: String,
    pub is_self: bool,
    pub selftext: String,
    pub url: String,
    pub over_18: bool,
    pub subreddit_over_18: bool,
    pub subreddit: String,
}

impl Submission {
    pub fn thing_ref(&self) -> ThingRef {
        ThingRef::Submission(self.id.clone())
    }
}

/// A node of the ancestry graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thing {
    Comment(Comment),
    Submission(Submission),
}

impl Thing {
    pub fn thing_ref(&self) -> ThingRef {
        match self {
            Thing::Comment(c) => c.thing_ref(),
            Thing::Submission(s) => s.thing_ref(),
        }
    }
}
