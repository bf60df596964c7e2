use crate::Error;
use crate::services::context::{ContentInfo, TargetContent};
use crate::services::platform::{
    BanRequest, BannedUser, ModerationPlatform, PlatformUser, PrivateMessage, Subreddit,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    RemoveContent(String),
    ApproveContent(String),
    BanUser(BanRequest),
    UnbanUser(String),
    ListBannedUsers(String),
    SendPrivateMessage(PrivateMessage),
}

/// Records every mutating call and keeps a fake ban list.
pub struct MockPlatform {
    pub subreddit: String,
    pub username: String,
    calls: Mutex<Vec<PlatformCall>>,
    banned: Mutex<Vec<String>>,
    moderators: Vec<String>,
    contents: HashMap<String, TargetContent>,
    fail_content_calls: bool,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            subreddit: "test".to_string(),
            username: "mod_jane".to_string(),
            calls: Mutex::new(Vec::new()),
            banned: Mutex::new(Vec::new()),
            moderators: vec!["mod_jane".to_string()],
            contents: HashMap::new(),
            fail_content_calls: false,
        }
    }

    pub fn with_banned(self, username: &str) -> Self {
        self.banned.lock().unwrap().push(username.to_string());
        self
    }

    pub fn with_content(mut self, fullname: &str, content: TargetContent) -> Self {
        self.contents.insert(fullname.to_string(), content);
        self
    }

    pub fn without_moderators(mut self) -> Self {
        self.moderators.clear();
        self
    }

    /// Makes remove and approve calls fail.
    pub fn failing_content_calls(mut self) -> Self {
        self.fail_content_calls = true;
        self
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<PrivateMessage> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::SendPrivateMessage(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn bans(&self) -> Vec<BanRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::BanUser(ban) => Some(ban),
                _ => None,
            })
            .collect()
    }

    pub fn unbans(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::UnbanUser(username) => Some(username),
                _ => None,
            })
            .collect()
    }

    pub fn is_banned(&self, username: &str) -> bool {
        self.banned.lock().unwrap().iter().any(|u| u == username)
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn post(id: &str, author: &str) -> TargetContent {
    TargetContent::Post(ContentInfo {
        id: Some(id.to_string()),
        author: Some(author.to_string()),
        permalink: Some(format!("/r/test/comments/{id}/")),
    })
}

pub fn comment(id: &str, author: &str) -> TargetContent {
    TargetContent::Comment(ContentInfo {
        id: Some(id.to_string()),
        author: Some(author.to_string()),
        permalink: Some(format!("/r/test/comments/abc/_/{id}/")),
    })
}

#[async_trait]
impl ModerationPlatform for MockPlatform {
    async fn remove_content(&self, id: &str) -> Result<(), Error> {
        self.record(PlatformCall::RemoveContent(id.to_string()));
        if self.fail_content_calls {
            anyhow::bail!("remove failed");
        }
        Ok(())
    }

    async fn approve_content(&self, id: &str) -> Result<(), Error> {
        self.record(PlatformCall::ApproveContent(id.to_string()));
        if self.fail_content_calls {
            anyhow::bail!("approve failed");
        }
        Ok(())
    }

    async fn ban_user(&self, ban: &BanRequest) -> Result<(), Error> {
        self.record(PlatformCall::BanUser(ban.clone()));
        let mut banned = self.banned.lock().unwrap();
        if !banned.contains(&ban.username) {
            banned.push(ban.username.clone());
        }
        Ok(())
    }

    async fn unban_user(&self, _subreddit: &str, username: &str) -> Result<(), Error> {
        self.record(PlatformCall::UnbanUser(username.to_string()));
        self.banned.lock().unwrap().retain(|u| u != username);
        Ok(())
    }

    async fn list_banned_users(
        &self,
        _subreddit: &str,
        username: &str,
    ) -> Result<Vec<BannedUser>, Error> {
        self.record(PlatformCall::ListBannedUsers(username.to_string()));
        Ok(self
            .banned
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.starts_with(username))
            .map(|u| BannedUser {
                username: u.clone(),
                note: None,
                days_left: None,
            })
            .collect())
    }

    async fn send_private_message(&self, message: &PrivateMessage) -> Result<(), Error> {
        self.record(PlatformCall::SendPrivateMessage(message.clone()));
        Ok(())
    }

    async fn current_subreddit(&self) -> Result<Subreddit, Error> {
        Ok(Subreddit {
            name: self.subreddit.clone(),
        })
    }

    async fn current_user(&self) -> Result<PlatformUser, Error> {
        Ok(PlatformUser {
            username: self.username.clone(),
        })
    }

    async fn is_moderator(&self, _subreddit: &str, username: &str) -> Result<bool, Error> {
        Ok(self.moderators.iter().any(|m| m == username))
    }

    async fn fetch_content(&self, fullname: &str) -> Result<Option<TargetContent>, Error> {
        Ok(self.contents.get(fullname).cloned())
    }
}
