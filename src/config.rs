use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use std::env;
use teloxide::types::{ChatId, Recipient};

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub channel: Recipient,
    pub admin_ids: Vec<i64>,
    pub database_url: String,
    pub timezone: Tz,
    pub http_port: u16,
    pub media_group_debounce_ms: u64,
    pub misfire_grace_secs: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("BOT_TOKEN").map_err(|_| anyhow!("BOT_TOKEN must be set"))?;
        if token.trim().is_empty() {
            return Err(anyhow!("BOT_TOKEN must be set"));
        }

        let channel_raw = env::var("CHANNEL_ID").map_err(|_| anyhow!("CHANNEL_ID must be set"))?;
        let channel = parse_channel(&channel_raw)?;

        let admin_ids = parse_admin_ids(&env::var("ADMIN_IDS").unwrap_or_default())?;

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:./data/posts.db".to_string());
        let database_url = if database_url.trim().is_empty() {
            "sqlite:./data/posts.db".to_string()
        } else {
            database_url
        };

        let timezone =
            parse_timezone(&env::var("TZ").unwrap_or_else(|_| "Europe/Moscow".to_string()))?;

        let http_port = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid HTTP_PORT"))?;

        let media_group_debounce_ms = env::var("MEDIA_GROUP_DEBOUNCE_MS")
            .unwrap_or_else(|_| "500".to_string())
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid MEDIA_GROUP_DEBOUNCE_MS"))?;

        let misfire_grace_secs = env::var("MISFIRE_GRACE_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid MISFIRE_GRACE_SECS"))?;

        Ok(Config {
            bot_token: token,
            channel,
            admin_ids,
            database_url,
            timezone,
            http_port,
            media_group_debounce_ms,
            misfire_grace_secs,
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

/// Channel target: numeric chat id or a public `@username`.
pub fn parse_channel(raw: &str) -> Result<Recipient> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(anyhow!("CHANNEL_ID must be set"));
    }
    if let Some(username) = raw.strip_prefix('@') {
        if username.is_empty() {
            return Err(anyhow!("CHANNEL_ID username is empty"));
        }
        return Ok(Recipient::ChannelUsername(raw.to_string()));
    }
    let id: i64 = raw
        .parse()
        .map_err(|_| anyhow!("CHANNEL_ID must be a numeric chat id or @username"))?;
    Ok(Recipient::Id(ChatId(id)))
}

/// Comma-separated list of Telegram user ids allowed to use the bot.
pub fn parse_admin_ids(raw: &str) -> Result<Vec<i64>> {
    let mut ids = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id: i64 = part
            .parse()
            .map_err(|_| anyhow!("ADMIN_IDS contains a non-numeric entry: '{}'", part))?;
        ids.push(id);
    }
    Ok(ids)
}

pub fn parse_timezone(raw: &str) -> Result<Tz> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|_| anyhow!("TZ is not a valid IANA timezone: '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channel_numeric() {
        let channel = parse_channel("-1001234567890").unwrap();
        assert_eq!(channel, Recipient::Id(ChatId(-1001234567890)));
    }

    #[test]
    fn test_parse_channel_username() {
        let channel = parse_channel("@my_channel").unwrap();
        assert_eq!(
            channel,
            Recipient::ChannelUsername("@my_channel".to_string())
        );
    }

    #[test]
    fn test_parse_channel_invalid() {
        assert!(parse_channel("").is_err());
        assert!(parse_channel("@").is_err());
        assert!(parse_channel("not-a-number").is_err());
    }

    #[test]
    fn test_parse_admin_ids() {
        assert_eq!(parse_admin_ids("").unwrap(), Vec::<i64>::new());
        assert_eq!(parse_admin_ids("123").unwrap(), vec![123]);
        assert_eq!(
            parse_admin_ids(" 123 , 456 ,,789 ").unwrap(),
            vec![123, 456, 789]
        );
        assert!(parse_admin_ids("123,abc").is_err());
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(
            parse_timezone("Europe/Moscow").unwrap(),
            chrono_tz::Europe::Moscow
        );
        assert_eq!(parse_timezone("UTC").unwrap(), chrono_tz::UTC);
        assert!(parse_timezone("Mars/Olympus").is_err());
    }
}
