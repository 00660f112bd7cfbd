//! Reply texts and user agents.
//!
//! Templates use a single `{}` slot that receives the media link (or the link block).

pub const USER_AGENT: &str = concat!("rewind/", env!("CARGO_PKG_VERSION"));

pub const BOT_FOOTER: &str = "---\n\n^(I am a bot. Reply to this comment to report an issue.)";

pub const NSFW_REPLY_TEMPLATE: &str = "##NSFW\n\n{}\n\n";

pub const REPLY_TEMPLATE: &str = "{}\n\n";

pub const REPLY_BAN_SUBJECT: &str = "Here is your video!";

pub const REPLY_BAN_TEMPLATE: &str = "Hi! Unfortunately, I am banned in that community so I couldn't \
reply to your comment. I was still able to reverse your video though!\n{}\n\n";

pub const UNNECESSARY_MANUAL_MESSAGE: &str = "\n\nJust so you know, you don't have to manually give \
the URL if it is in a parent comment or the post. I would have known what you meant anyways :)\n\n";

/// Author name of the platform's automated moderator.
pub const AUTOMOD_AUTHOR: &str = "AutoModerator";

/// Fill the single `{}` slot of a template.
pub fn fill(template: &str, value: &str) -> String {
    template.replacen("{}", value, 1)
}
