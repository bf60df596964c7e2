use crate::Error;
use crate::config::RedditConfig;
use crate::services::context::{ContentInfo, TargetContent};
use crate::services::platform::{
    BanRequest, BannedUser, ModerationPlatform, PlatformUser, PrivateMessage, Subreddit,
};
use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
/// Reddit truncates longer ban reasons.
const MAX_BAN_REASON: usize = 100;
const MAX_BAN_NOTE: usize = 300;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct Thing<T> {
    kind: String,
    data: T,
}

#[derive(Deserialize)]
struct Listing<T> {
    children: Vec<T>,
}

#[derive(Deserialize)]
struct SubredditAbout {
    display_name: String,
}

#[derive(Deserialize)]
struct Me {
    name: String,
}

#[derive(Deserialize)]
struct UserListEntry {
    name: String,
    note: Option<String>,
    days_left: Option<u32>,
}

#[derive(Deserialize)]
struct ContentData {
    id: Option<String>,
    author: Option<String>,
    permalink: Option<String>,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// `ModerationPlatform` backed by Reddit's OAuth API, authenticated as a
/// script app with the bot account's password.
pub struct RedditClient {
    http: Client,
    config: RedditConfig,
    token: Mutex<Option<AccessToken>>,
}

impl RedditClient {
    pub fn new(config: RedditConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            config,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, Error> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref() {
            if Instant::now() + TOKEN_REFRESH_MARGIN < current.expires_at {
                return Ok(current.value.clone());
            }
        }

        debug!("Requesting a new Reddit access token");
        let response: TokenResponse = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await
            .context("Failed to reach Reddit token endpoint")?
            .error_for_status()
            .context("Reddit rejected the token request")?
            .json()
            .await
            .context("Invalid token response from Reddit")?;

        let value = match (response.access_token, response.error) {
            (Some(value), _) => value,
            (None, Some(error)) => anyhow::bail!("Reddit authentication failed: {error}"),
            (None, None) => anyhow::bail!("Reddit token response carried no token"),
        };

        info!("Authenticated with Reddit as u/{}", self.config.username);
        *token = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(response.expires_in.unwrap_or(3600)),
        });

        Ok(value)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!("{API_BASE}{path}"))
            .bearer_auth(token)
            .query(query)
            .query(&[("raw_json", "1")])
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            anyhow::bail!("Reddit returned {status} for GET {path}: {body}");
        }

        serde_json::from_str(&body).with_context(|| format!("Unexpected response for GET {path}"))
    }

    async fn post_form(&self, path: &str, form: &[(&str, String)]) -> Result<Value, Error> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(format!("{API_BASE}{path}"))
            .bearer_auth(token)
            .form(form)
            .send()
            .await
            .with_context(|| format!("POST {path} failed"))?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            anyhow::bail!("Reddit returned {status} for POST {path}: {body}");
        }

        let value: Value = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body)
                .with_context(|| format!("Unexpected response for POST {path}"))?
        };

        if let Some(errors) = api_errors(&value) {
            anyhow::bail!("Reddit rejected POST {path}: {errors}");
        }

        Ok(value)
    }

    async fn user_list(
        &self,
        subreddit: &str,
        list: &str,
        username: &str,
    ) -> Result<Vec<UserListEntry>, Error> {
        let thing: Thing<Listing<UserListEntry>> = self
            .get_json(
                &format!("/r/{subreddit}/about/{list}"),
                &[("user", username)],
            )
            .await?;
        Ok(thing.data.children)
    }
}

/// Collects `json.errors` from an `api_type=json` response.
fn api_errors(value: &Value) -> Option<String> {
    let errors = value.pointer("/json/errors")?.as_array()?;
    if errors.is_empty() {
        return None;
    }

    let described: Vec<String> = errors
        .iter()
        .map(|error| match error.as_array() {
            Some(parts) => parts
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(": "),
            None => error.to_string(),
        })
        .collect();
    Some(described.join("; "))
}

fn content_from_listing(listing: Thing<Listing<Thing<ContentData>>>) -> Option<TargetContent> {
    let thing = listing.data.children.into_iter().next()?;

    let author = thing
        .data
        .author
        .filter(|author| author != "[deleted]");
    let info = ContentInfo {
        id: thing.data.id,
        author,
        permalink: thing.data.permalink,
    };

    match thing.kind.as_str() {
        "t3" => Some(TargetContent::Post(info)),
        "t1" => Some(TargetContent::Comment(info)),
        _ => None,
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[async_trait]
impl ModerationPlatform for RedditClient {
    async fn remove_content(&self, id: &str) -> Result<(), Error> {
        self.post_form(
            "/api/remove",
            &[("id", id.to_string()), ("spam", "false".to_string())],
        )
        .await?;
        Ok(())
    }

    async fn approve_content(&self, id: &str) -> Result<(), Error> {
        self.post_form("/api/approve", &[("id", id.to_string())])
            .await?;
        Ok(())
    }

    async fn ban_user(&self, ban: &BanRequest) -> Result<(), Error> {
        let mut form = vec![
            ("api_type", "json".to_string()),
            ("type", "banned".to_string()),
            ("name", ban.username.clone()),
            ("duration", ban.duration_days.to_string()),
            ("ban_reason", truncate(&ban.reason, MAX_BAN_REASON)),
            ("note", truncate(&ban.note, MAX_BAN_NOTE)),
        ];
        if let Some(context) = &ban.context {
            form.push(("ban_context", context.clone()));
        }

        self.post_form(&format!("/r/{}/api/friend", ban.subreddit), &form)
            .await?;
        Ok(())
    }

    async fn unban_user(&self, subreddit: &str, username: &str) -> Result<(), Error> {
        self.post_form(
            &format!("/r/{subreddit}/api/unfriend"),
            &[
                ("api_type", "json".to_string()),
                ("type", "banned".to_string()),
                ("name", username.to_string()),
            ],
        )
        .await?;
        Ok(())
    }

    async fn list_banned_users(
        &self,
        subreddit: &str,
        username: &str,
    ) -> Result<Vec<BannedUser>, Error> {
        let entries = self.user_list(subreddit, "banned", username).await?;
        Ok(entries
            .into_iter()
            .map(|entry| BannedUser {
                username: entry.name,
                note: entry.note,
                days_left: entry.days_left,
            })
            .collect())
    }

    async fn send_private_message(&self, message: &PrivateMessage) -> Result<(), Error> {
        self.post_form(
            "/api/compose",
            &[
                ("api_type", "json".to_string()),
                ("from_sr", message.from_subreddit.clone()),
                ("to", message.to.clone()),
                ("subject", message.subject.clone()),
                ("text", message.text.clone()),
            ],
        )
        .await?;
        Ok(())
    }

    async fn current_subreddit(&self) -> Result<Subreddit, Error> {
        let about: Thing<SubredditAbout> = self
            .get_json(&format!("/r/{}/about", self.config.subreddit), &[])
            .await?;
        Ok(Subreddit {
            name: about.data.display_name,
        })
    }

    async fn current_user(&self) -> Result<PlatformUser, Error> {
        let me: Me = self.get_json("/api/v1/me", &[]).await?;
        Ok(PlatformUser { username: me.name })
    }

    async fn is_moderator(&self, subreddit: &str, username: &str) -> Result<bool, Error> {
        let entries = self.user_list(subreddit, "moderators", username).await?;
        Ok(entries
            .iter()
            .any(|entry| entry.name.eq_ignore_ascii_case(username)))
    }

    async fn fetch_content(&self, fullname: &str) -> Result<Option<TargetContent>, Error> {
        let listing: Thing<Listing<Thing<ContentData>>> =
            self.get_json("/api/info", &[("id", fullname)]).await?;
        Ok(content_from_listing(listing))
    }
}
