//! In-memory social platform.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use rewind_core::{Comment, PlatformError, Submission, Thing, ThingRef};
use rewind_engine::PlatformClient;

#[derive(Default)]
pub struct FakePlatform {
    comments: Mutex<HashMap<String, Comment>>,
    submissions: Mutex<HashMap<String, Submission>>,
    moderated: Mutex<HashSet<String>>,
    reply_error: Mutex<Option<PlatformError>>,
    /// Comment whose next parent lookup fails with a structural fault.
    structural_fault: Mutex<Option<String>>,
    pub removed: Mutex<Vec<String>>,
    pub replies: Mutex<Vec<(ThingRef, String)>>,
    pub messages: Mutex<Vec<(String, String, String)>>,
    pub distinguished: Mutex<Vec<String>>,
    pub parent_calls: Mutex<usize>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_submission(&self, submission: Submission) {
        self.submissions
            .lock()
            .unwrap()
            .insert(submission.id.clone(), submission);
    }

    pub fn add_comment(&self, comment: Comment) {
        self.comments
            .lock()
            .unwrap()
            .insert(comment.id.clone(), comment);
    }

    pub fn comment(&self, id: &str) -> Comment {
        self.comments.lock().unwrap()[id].clone()
    }

    pub fn moderate(&self, subreddit: &str) {
        self.moderated
            .lock()
            .unwrap()
            .insert(subreddit.to_lowercase());
    }

    pub fn fail_replies_with(&self, error: PlatformError) {
        *self.reply_error.lock().unwrap() = Some(error);
    }

    pub fn structural_fault_on(&self, comment_id: &str) {
        *self.structural_fault.lock().unwrap() = Some(comment_id.to_string());
    }

    pub fn replies(&self) -> Vec<(ThingRef, String)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<(String, String, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn distinguished(&self) -> Vec<String> {
        self.distinguished.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn fetch_comment(&self, id: &str) -> Result<Comment, PlatformError> {
        self.comments
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("t1_{}", id)))
    }

    async fn fetch_submission(&self, id: &str) -> Result<Submission, PlatformError> {
        self.submissions
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("t3_{}", id)))
    }

    async fn parent(&self, comment: &Comment) -> Result<Thing, PlatformError> {
        *self.parent_calls.lock().unwrap() += 1;

        {
            let mut fault = self.structural_fault.lock().unwrap();
            if fault.as_deref() == Some(comment.id.as_str()) {
                *fault = None;
                return Err(PlatformError::Structural(
                    "maximum recursion depth exceeded".into(),
                ));
            }
        }

        match &comment.parent {
            ThingRef::Comment(id) => self.fetch_comment(id).await.map(Thing::Comment),
            ThingRef::Submission(id) => self.fetch_submission(id).await.map(Thing::Submission),
        }
    }

    async fn is_moderator(&self, subreddit: &str) -> Result<bool, PlatformError> {
        Ok(self
            .moderated
            .lock()
            .unwrap()
            .contains(&subreddit.to_lowercase()))
    }

    async fn remove_comment(&self, comment_id: &str) -> Result<(), PlatformError> {
        self.removed.lock().unwrap().push(comment_id.to_string());
        if let Some(comment) = self.comments.lock().unwrap().get_mut(comment_id) {
            comment.removed = true;
        }
        Ok(())
    }

    async fn post_reply(&self, target: &ThingRef, text: &str) -> Result<String, PlatformError> {
        if let Some(error) = self.reply_error.lock().unwrap().clone() {
            return Err(error);
        }
        let mut replies = self.replies.lock().unwrap();
        replies.push((target.clone(), text.to_string()));
        Ok(format!("reply{}", replies.len()))
    }

    async fn distinguish(&self, comment_id: &str, _sticky: bool) -> Result<(), PlatformError> {
        self.distinguished
            .lock()
            .unwrap()
            .push(comment_id.to_string());
        Ok(())
    }

    async fn send_message(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), PlatformError> {
        self.messages.lock().unwrap().push((
            recipient.to_string(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}
