use anyhow::Context as _;

const DEFAULT_USER_AGENT: &str = concat!("strike-warden/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    /// Subreddit the bot moderates, without the `r/` prefix.
    pub subreddit: String,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Strike counts are kept in memory only when this is unset.
    pub database_url: Option<String>,
    pub reddit: RedditConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).with_context(|| format!("{key} must be set"));

        let subreddit = require("REDDIT_SUBREDDIT")?;
        let subreddit = subreddit
            .trim()
            .trim_start_matches("/r/")
            .trim_start_matches("r/")
            .to_string();

        Ok(Self {
            database_url: get("DATABASE_URL"),
            reddit: RedditConfig {
                client_id: require("REDDIT_CLIENT_ID")?,
                client_secret: require("REDDIT_CLIENT_SECRET")?,
                username: require("REDDIT_USERNAME")?,
                password: require("REDDIT_PASSWORD")?,
                subreddit,
                user_agent: get("REDDIT_USER_AGENT")
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            },
        })
    }
}
