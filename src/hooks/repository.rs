//! Persistence of feeds and webhooks.
//!
//! [`HookRepository`] is the read/mutate contract the scheduler consumes.
//! [`SqlHookRepository`] implements it over SQLite and additionally offers
//! the registration write paths used by the management API.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, warn};
use uuid::Uuid;

use super::types::{
    AlmanaxFeed, AlmanaxHook, FeedKind, Interval, Mention, Mentions, NewAlmanaxHook,
    NewSocialHook, RssFeed, SocialHook, TwitterFeed, WeekdayTranslations, DEFAULT_FORMAT,
};
use crate::datetime::parse_datetime;
use crate::db::DbPool;
use crate::filter::BonusFilter;
use crate::{HookError, Result};

/// Operations the polling core needs from the store.
#[async_trait]
pub trait HookRepository: Send + Sync {
    /// List active Almanax feeds, optionally restricted to `ids`.
    async fn almanax_feeds(&self, ids: Option<&[i64]>) -> Result<Vec<AlmanaxFeed>>;

    /// List active RSS feeds, optionally restricted to `ids`.
    async fn rss_feeds(&self, ids: Option<&[i64]>) -> Result<Vec<RssFeed>>;

    /// List active Twitter feeds, optionally restricted to `ids`.
    async fn twitter_feeds(&self, ids: Option<&[i64]>) -> Result<Vec<TwitterFeed>>;

    /// Active Almanax webhooks subscribed to a feed, fully hydrated.
    async fn almanax_subscribers(&self, feed_id: i64) -> Result<Vec<AlmanaxHook>>;

    /// Active RSS or Twitter webhooks subscribed to a feed.
    async fn social_subscribers(&self, kind: FeedKind, feed_id: i64) -> Result<Vec<SocialHook>>;

    /// Fetch one Almanax webhook.
    async fn almanax_hook(&self, id: Uuid) -> Result<Option<AlmanaxHook>>;

    /// Fetch one RSS or Twitter webhook.
    async fn social_hook(&self, kind: FeedKind, id: Uuid) -> Result<Option<SocialHook>>;

    /// Stamp the last delivery time of every active webhook with this callback.
    async fn fire_stamp(&self, callback: &str) -> Result<u64>;

    /// Soft-delete every active webhook with this callback.
    async fn delete_by_callback(&self, callback: &str) -> Result<u64>;

    /// Weekday display names for all languages.
    async fn weekday_translations(&self) -> Result<WeekdayTranslations>;
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct AlmanaxFeedRow {
    id: i64,
    name: String,
    language: String,
}

impl From<AlmanaxFeedRow> for AlmanaxFeed {
    fn from(row: AlmanaxFeedRow) -> Self {
        AlmanaxFeed {
            id: row.id,
            name: row.name,
            language: row.language,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct RssFeedRow {
    id: i64,
    name: String,
    url: String,
}

impl From<RssFeedRow> for RssFeed {
    fn from(row: RssFeedRow) -> Self {
        RssFeed {
            id: row.id,
            name: row.name,
            url: row.url,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct TwitterFeedRow {
    id: i64,
    name: String,
    twitter_id: i64,
}

impl From<TwitterFeedRow> for TwitterFeed {
    fn from(row: TwitterFeedRow) -> Self {
        TwitterFeed {
            id: row.id,
            name: row.name,
            twitter_id: row.twitter_id as u64,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct AlmanaxHookRow {
    id: String,
    callback: String,
    format: String,
    created_at: String,
    updated_at: String,
    last_fired_at: Option<String>,
    timezone: String,
    midnight_offset: i64,
    intervals: String,
    weekly_weekday: Option<String>,
    wants_iso_date: bool,
    bonus_whitelist: Option<String>,
    bonus_blacklist: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SocialHookRow {
    id: String,
    callback: String,
    format: String,
    created_at: String,
    updated_at: String,
    last_fired_at: Option<String>,
    whitelist: String,
    blacklist: String,
    preview_length: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct MentionRow {
    bonus_id: String,
    discord_id: i64,
    is_role: bool,
    ping_days_before: Option<i64>,
}

const ALMANAX_HOOK_COLUMNS: &str = r#"
    w.id, w.callback, w.format, w.created_at, w.updated_at, w.last_fired_at,
    a.timezone, a.midnight_offset, a.intervals, a.weekly_weekday, a.wants_iso_date,
    a.bonus_whitelist, a.bonus_blacklist
"#;

const SOCIAL_HOOK_COLUMNS: &str = r#"
    w.id, w.callback, w.format, w.created_at, w.updated_at, w.last_fired_at,
    s.whitelist, s.blacklist, s.preview_length
"#;

/// SQLite-backed [`HookRepository`].
#[derive(Debug, Clone)]
pub struct SqlHookRepository {
    pool: DbPool,
}

impl SqlHookRepository {
    /// Create a new repository instance.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Register an Almanax feed.
    pub async fn create_almanax_feed(&self, name: &str, language: &str) -> Result<AlmanaxFeed> {
        let mut tx = self.pool.begin().await?;
        let id = insert_feed(&mut tx, FeedKind::Almanax).await?;
        sqlx::query("INSERT INTO almanax_feeds (id, human_readable_id, language) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(name)
            .bind(language)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(AlmanaxFeed {
            id,
            name: name.to_string(),
            language: language.to_string(),
        })
    }

    /// Register an RSS feed.
    pub async fn create_rss_feed(&self, name: &str, url: &str) -> Result<RssFeed> {
        let mut tx = self.pool.begin().await?;
        let id = insert_feed(&mut tx, FeedKind::Rss).await?;
        sqlx::query("INSERT INTO rss_feeds (id, human_readable_id, url) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(name)
            .bind(url)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(RssFeed {
            id,
            name: name.to_string(),
            url: url.to_string(),
        })
    }

    /// Register a Twitter feed.
    pub async fn create_twitter_feed(&self, name: &str, twitter_id: u64) -> Result<TwitterFeed> {
        if twitter_id == 0 {
            return Err(HookError::Validation("twitter id must not be 0".to_string()));
        }
        let mut tx = self.pool.begin().await?;
        let id = insert_feed(&mut tx, FeedKind::Twitter).await?;
        sqlx::query(
            "INSERT INTO twitter_feeds (id, human_readable_id, twitter_id) VALUES ($1, $2, $3)",
        )
        .bind(id)
        .bind(name)
        .bind(twitter_id as i64)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(TwitterFeed {
            id,
            name: name.to_string(),
            twitter_id,
        })
    }

    /// Soft-delete a feed.
    pub async fn delete_feed(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE feeds SET deleted_at = datetime('now') WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Register an Almanax webhook.
    pub async fn create_almanax_hook(&self, hook: &NewAlmanaxHook) -> Result<AlmanaxHook> {
        hook.validate()?;
        let subscriptions: BTreeSet<i64> = hook.subscriptions.iter().copied().collect();

        let mut tx = self.pool.begin().await?;
        check_subscriptions(&mut tx, FeedKind::Almanax, &subscriptions).await?;
        check_callback_free(&mut tx, FeedKind::Almanax, &hook.callback).await?;

        let id = Uuid::new_v4();
        insert_webhook(&mut tx, id, FeedKind::Almanax, &hook.callback).await?;

        let intervals: Vec<&str> = hook.intervals.iter().map(Interval::as_str).collect();
        let whitelist = hook
            .bonus_filter
            .allow_list()
            .map(|l| serde_json::to_string(&l))
            .transpose()?;
        let blacklist = hook
            .bonus_filter
            .deny_list()
            .map(|l| serde_json::to_string(&l))
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO almanax_webhooks
                (id, timezone, midnight_offset, intervals, weekly_weekday, wants_iso_date,
                 bonus_whitelist, bonus_blacklist)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id.to_string())
        .bind(&hook.timezone)
        .bind(hook.midnight_offset as i64)
        .bind(serde_json::to_string(&intervals)?)
        .bind(&hook.weekly_weekday)
        .bind(hook.wants_iso_date)
        .bind(whitelist)
        .bind(blacklist)
        .execute(&mut *tx)
        .await?;

        for (bonus_id, mentions) in &hook.mentions {
            for mention in mentions {
                sqlx::query(
                    r#"
                    INSERT INTO almanax_mentions
                        (webhook_id, bonus_id, discord_id, is_role, ping_days_before)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(id.to_string())
                .bind(bonus_id)
                .bind(mention.discord_id as i64)
                .bind(mention.is_role)
                .bind(mention.ping_days_before.map(i64::from))
                .execute(&mut *tx)
                .await?;
            }
        }

        insert_subscriptions(&mut tx, id, &subscriptions).await?;
        tx.commit().await?;
        debug!("Registered almanax webhook {}", id);

        self.almanax_hook(id)
            .await?
            .ok_or_else(|| HookError::NotFound("almanax webhook".into()))
    }

    /// Register an RSS or Twitter webhook.
    pub async fn create_social_hook(&self, hook: &NewSocialHook) -> Result<SocialHook> {
        hook.validate()?;
        let subscriptions: BTreeSet<i64> = hook.subscriptions.iter().copied().collect();

        let mut tx = self.pool.begin().await?;
        check_subscriptions(&mut tx, hook.kind, &subscriptions).await?;
        check_callback_free(&mut tx, hook.kind, &hook.callback).await?;

        let id = Uuid::new_v4();
        insert_webhook(&mut tx, id, hook.kind, &hook.callback).await?;

        sqlx::query(
            "INSERT INTO social_webhooks (id, whitelist, blacklist, preview_length) VALUES ($1, $2, $3, $4)",
        )
        .bind(id.to_string())
        .bind(serde_json::to_string(&hook.whitelist)?)
        .bind(serde_json::to_string(&hook.blacklist)?)
        .bind(hook.effective_preview_length() as i64)
        .execute(&mut *tx)
        .await?;

        insert_subscriptions(&mut tx, id, &subscriptions).await?;
        tx.commit().await?;
        debug!("Registered {} webhook {}", hook.kind, id);

        self.social_hook(hook.kind, id)
            .await?
            .ok_or_else(|| HookError::NotFound(format!("{} webhook", hook.kind)))
    }

    async fn subscriptions_of(&self, id: &str) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT feed_id FROM subscriptions WHERE webhook_id = $1 ORDER BY feed_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn mentions_of(&self, id: &str) -> Result<Mentions> {
        let rows = sqlx::query_as::<_, MentionRow>(
            r#"
            SELECT bonus_id, discord_id, is_role, ping_days_before
            FROM almanax_mentions
            WHERE webhook_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let mut mentions = Mentions::new();
        for row in rows {
            mentions.entry(row.bonus_id).or_default().push(Mention {
                discord_id: row.discord_id as u64,
                is_role: row.is_role,
                ping_days_before: row.ping_days_before.map(|d| d as u32),
            });
        }
        Ok(mentions)
    }

    async fn hydrate_almanax(&self, row: AlmanaxHookRow) -> Result<AlmanaxHook> {
        let id = parse_uuid(&row.id)?;
        let intervals: Vec<String> = serde_json::from_str(&row.intervals)?;
        let intervals = intervals
            .iter()
            .map(|s| {
                Interval::parse(s)
                    .ok_or_else(|| HookError::Validation(format!("unknown interval: {s}")))
            })
            .collect::<Result<Vec<_>>>()?;
        let bonus_filter = BonusFilter::from_lists(
            parse_json_list(row.bonus_whitelist.as_deref())?,
            parse_json_list(row.bonus_blacklist.as_deref())?,
        )?;

        Ok(AlmanaxHook {
            id,
            subscriptions: self.subscriptions_of(&row.id).await?,
            mentions: self.mentions_of(&row.id).await?,
            callback: row.callback,
            format: row.format,
            timezone: row.timezone,
            midnight_offset: row.midnight_offset as u32,
            intervals,
            weekly_weekday: row.weekly_weekday,
            bonus_filter,
            wants_iso_date: row.wants_iso_date,
            created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_datetime(&row.updated_at).unwrap_or_else(Utc::now),
            last_fired_at: row.last_fired_at.and_then(|s| parse_datetime(&s)),
        })
    }

    async fn hydrate_social(&self, kind: FeedKind, row: SocialHookRow) -> Result<SocialHook> {
        Ok(SocialHook {
            id: parse_uuid(&row.id)?,
            kind,
            subscriptions: self.subscriptions_of(&row.id).await?,
            callback: row.callback,
            format: row.format,
            whitelist: serde_json::from_str(&row.whitelist)?,
            blacklist: serde_json::from_str(&row.blacklist)?,
            preview_length: row.preview_length.max(1) as usize,
            created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_datetime(&row.updated_at).unwrap_or_else(Utc::now),
            last_fired_at: row.last_fired_at.and_then(|s| parse_datetime(&s)),
        })
    }
}

#[async_trait]
impl HookRepository for SqlHookRepository {
    async fn almanax_feeds(&self, ids: Option<&[i64]>) -> Result<Vec<AlmanaxFeed>> {
        let mut query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT f.id, k.human_readable_id AS name, k.language
            FROM feeds f
            JOIN almanax_feeds k ON k.id = f.id
            WHERE f.deleted_at IS NULL
            "#,
        );
        push_id_filter(&mut query, ids);
        query.push(" ORDER BY f.id ASC");

        let rows = query
            .build_query_as::<AlmanaxFeedRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(AlmanaxFeed::from).collect())
    }

    async fn rss_feeds(&self, ids: Option<&[i64]>) -> Result<Vec<RssFeed>> {
        let mut query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT f.id, k.human_readable_id AS name, k.url
            FROM feeds f
            JOIN rss_feeds k ON k.id = f.id
            WHERE f.deleted_at IS NULL
            "#,
        );
        push_id_filter(&mut query, ids);
        query.push(" ORDER BY f.id ASC");

        let rows = query
            .build_query_as::<RssFeedRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(RssFeed::from).collect())
    }

    async fn twitter_feeds(&self, ids: Option<&[i64]>) -> Result<Vec<TwitterFeed>> {
        let mut query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT f.id, k.human_readable_id AS name, k.twitter_id
            FROM feeds f
            JOIN twitter_feeds k ON k.id = f.id
            WHERE f.deleted_at IS NULL
            "#,
        );
        push_id_filter(&mut query, ids);
        query.push(" ORDER BY f.id ASC");

        let rows = query
            .build_query_as::<TwitterFeedRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(TwitterFeed::from).collect())
    }

    async fn almanax_subscribers(&self, feed_id: i64) -> Result<Vec<AlmanaxHook>> {
        let query = format!(
            r#"
            SELECT {ALMANAX_HOOK_COLUMNS}
            FROM subscriptions sub
            JOIN webhooks w ON w.id = sub.webhook_id
            JOIN almanax_webhooks a ON a.id = w.id
            JOIN feeds f ON f.id = sub.feed_id
            WHERE sub.feed_id = $1 AND w.deleted_at IS NULL AND f.deleted_at IS NULL
            ORDER BY w.created_at ASC, w.id ASC
            "#
        );
        let rows = sqlx::query_as::<_, AlmanaxHookRow>(&query)
            .bind(feed_id)
            .fetch_all(&self.pool)
            .await?;

        let mut hooks = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            match self.hydrate_almanax(row).await {
                Ok(hook) => hooks.push(hook),
                Err(HookError::Database(e)) => return Err(HookError::Database(e)),
                Err(e) => warn!("Skipping malformed almanax webhook {}: {}", id, e),
            }
        }
        Ok(hooks)
    }

    async fn social_subscribers(&self, kind: FeedKind, feed_id: i64) -> Result<Vec<SocialHook>> {
        let query = format!(
            r#"
            SELECT {SOCIAL_HOOK_COLUMNS}
            FROM subscriptions sub
            JOIN webhooks w ON w.id = sub.webhook_id
            JOIN social_webhooks s ON s.id = w.id
            JOIN feeds f ON f.id = sub.feed_id
            WHERE sub.feed_id = $1 AND w.kind = $2
              AND w.deleted_at IS NULL AND f.deleted_at IS NULL
            ORDER BY w.created_at ASC, w.id ASC
            "#
        );
        let rows = sqlx::query_as::<_, SocialHookRow>(&query)
            .bind(feed_id)
            .bind(kind.as_str())
            .fetch_all(&self.pool)
            .await?;

        let mut hooks = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            match self.hydrate_social(kind, row).await {
                Ok(hook) => hooks.push(hook),
                Err(HookError::Database(e)) => return Err(HookError::Database(e)),
                Err(e) => warn!("Skipping malformed {} webhook {}: {}", kind, id, e),
            }
        }
        Ok(hooks)
    }

    async fn almanax_hook(&self, id: Uuid) -> Result<Option<AlmanaxHook>> {
        let query = format!(
            r#"
            SELECT {ALMANAX_HOOK_COLUMNS}
            FROM webhooks w
            JOIN almanax_webhooks a ON a.id = w.id
            WHERE w.id = $1 AND w.deleted_at IS NULL
            "#
        );
        let row = sqlx::query_as::<_, AlmanaxHookRow>(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate_almanax(row).await?)),
            None => Ok(None),
        }
    }

    async fn social_hook(&self, kind: FeedKind, id: Uuid) -> Result<Option<SocialHook>> {
        let query = format!(
            r#"
            SELECT {SOCIAL_HOOK_COLUMNS}
            FROM webhooks w
            JOIN social_webhooks s ON s.id = w.id
            WHERE w.id = $1 AND w.kind = $2 AND w.deleted_at IS NULL
            "#
        );
        let row = sqlx::query_as::<_, SocialHookRow>(&query)
            .bind(id.to_string())
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate_social(kind, row).await?)),
            None => Ok(None),
        }
    }

    async fn fire_stamp(&self, callback: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE webhooks SET last_fired_at = datetime('now')
            WHERE callback = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(callback)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_by_callback(&self, callback: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE webhooks SET deleted_at = datetime('now'), updated_at = datetime('now')
            WHERE callback = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(callback)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn weekday_translations(&self) -> Result<WeekdayTranslations> {
        let rows = sqlx::query_as::<_, (String, String, String)>(
            "SELECT language, weekday, translation FROM weekday_translations",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut translations = WeekdayTranslations::new();
        for (language, weekday, translation) in rows {
            translations.insert(language, weekday, translation);
        }
        Ok(translations)
    }
}

fn push_id_filter(query: &mut QueryBuilder<'_, Sqlite>, ids: Option<&[i64]>) {
    if let Some(ids) = ids {
        if ids.is_empty() {
            query.push(" AND 0");
            return;
        }
        query.push(" AND f.id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| HookError::Validation(format!("invalid webhook id {s}: {e}")))
}

fn parse_json_list(s: Option<&str>) -> Result<Option<Vec<String>>> {
    s.map(serde_json::from_str::<Vec<String>>)
        .transpose()
        .map_err(HookError::from)
}

async fn insert_feed(tx: &mut sqlx::Transaction<'_, Sqlite>, kind: FeedKind) -> Result<i64> {
    let id: i64 = sqlx::query_scalar("INSERT INTO feeds (kind) VALUES ($1) RETURNING id")
        .bind(kind.as_str())
        .fetch_one(&mut **tx)
        .await?;
    Ok(id)
}

async fn insert_webhook(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    id: Uuid,
    kind: FeedKind,
    callback: &str,
) -> Result<()> {
    sqlx::query("INSERT INTO webhooks (id, kind, callback, format) VALUES ($1, $2, $3, $4)")
        .bind(id.to_string())
        .bind(kind.as_str())
        .bind(callback)
        .bind(DEFAULT_FORMAT)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn insert_subscriptions(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    id: Uuid,
    subscriptions: &BTreeSet<i64>,
) -> Result<()> {
    for feed_id in subscriptions {
        sqlx::query("INSERT INTO subscriptions (webhook_id, feed_id) VALUES ($1, $2)")
            .bind(id.to_string())
            .bind(feed_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn check_subscriptions(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    kind: FeedKind,
    subscriptions: &BTreeSet<i64>,
) -> Result<()> {
    let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM feeds f WHERE f.kind = ");
    query.push_bind(kind.as_str());
    query.push(" AND f.deleted_at IS NULL");
    let ids: Vec<i64> = subscriptions.iter().copied().collect();
    push_id_filter(&mut query, Some(&ids));

    let known = query
        .build_query_scalar::<i64>()
        .fetch_one(&mut **tx)
        .await?;
    if known as usize != subscriptions.len() {
        return Err(HookError::Validation(format!(
            "unknown {kind} subscription in {ids:?}"
        )));
    }
    Ok(())
}

async fn check_callback_free(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    kind: FeedKind,
    callback: &str,
) -> Result<()> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM webhooks WHERE kind = $1 AND callback = $2 AND deleted_at IS NULL)",
    )
    .bind(kind.as_str())
    .bind(callback)
    .fetch_one(&mut **tx)
    .await?;
    if taken {
        return Err(HookError::Validation(format!(
            "callback already registered for {kind}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    const CALLBACK: &str = "https://discord.com/api/webhooks/1/abc";

    async fn setup() -> (Database, SqlHookRepository) {
        let db = Database::open_in_memory().await.unwrap();
        let repo = SqlHookRepository::new(db.pool().clone());
        (db, repo)
    }

    #[tokio::test]
    async fn test_feeds_listed_by_kind() {
        let (_db, repo) = setup().await;
        let alm = repo.create_almanax_feed("almanax_fr", "fr").await.unwrap();
        let rss = repo
            .create_rss_feed("dofus2-fr-news", "https://example.com/rss")
            .await
            .unwrap();
        let tw = repo.create_twitter_feed("DOFUSfr", 72272795).await.unwrap();

        assert_ne!(alm.id, rss.id);
        assert_eq!(repo.almanax_feeds(None).await.unwrap(), vec![alm]);
        assert_eq!(repo.rss_feeds(None).await.unwrap(), vec![rss]);
        assert_eq!(repo.twitter_feeds(None).await.unwrap(), vec![tw]);
    }

    #[tokio::test]
    async fn test_feeds_filtered_by_ids() {
        let (_db, repo) = setup().await;
        let fr = repo.create_almanax_feed("almanax_fr", "fr").await.unwrap();
        let de = repo.create_almanax_feed("almanax_de", "de").await.unwrap();

        let only_de = repo.almanax_feeds(Some(&[de.id])).await.unwrap();
        assert_eq!(only_de, vec![de.clone()]);
        assert!(repo.almanax_feeds(Some(&[])).await.unwrap().is_empty());

        assert!(repo.delete_feed(fr.id).await.unwrap());
        assert_eq!(repo.almanax_feeds(None).await.unwrap(), vec![de]);
    }

    #[tokio::test]
    async fn test_twitter_feed_rejects_zero_id() {
        let (_db, repo) = setup().await;
        assert!(repo.create_twitter_feed("nobody", 0).await.is_err());
    }

    #[tokio::test]
    async fn test_create_and_hydrate_almanax_hook() {
        let (_db, repo) = setup().await;
        let feed = repo.create_almanax_feed("almanax_en", "en").await.unwrap();

        let new_hook = NewAlmanaxHook::new(CALLBACK, vec![feed.id])
            .with_timezone("Europe/Berlin")
            .with_midnight_offset(6)
            .with_intervals(vec![Interval::Daily, Interval::Weekly])
            .with_weekly_weekday("monday")
            .with_bonus_filter(
                BonusFilter::from_lists(Some(vec!["experience".to_string()]), None).unwrap(),
            )
            .with_mention("experience", Mention::role(99).with_days_before(2))
            .with_iso_date(true);

        let hook = repo.create_almanax_hook(&new_hook).await.unwrap();
        assert_eq!(hook.callback, CALLBACK);
        assert_eq!(hook.format, "discord");
        assert_eq!(hook.timezone, "Europe/Berlin");
        assert_eq!(hook.midnight_offset, 6);
        assert_eq!(hook.intervals, vec![Interval::Daily, Interval::Weekly]);
        assert_eq!(hook.weekly_weekday.as_deref(), Some("monday"));
        assert!(hook.bonus_filter.keeps("experience"));
        assert!(!hook.bonus_filter.keeps("kamas"));
        assert_eq!(hook.mentions["experience"][0], Mention::role(99).with_days_before(2));
        assert!(hook.wants_iso_date);
        assert_eq!(hook.subscriptions, vec![feed.id]);
        assert!(hook.last_fired_at.is_none());

        let subscribers = repo.almanax_subscribers(feed.id).await.unwrap();
        assert_eq!(subscribers.len(), 1);
        assert_eq!(subscribers[0].id, hook.id);
    }

    #[tokio::test]
    async fn test_create_hook_rejects_unknown_subscription() {
        let (_db, repo) = setup().await;
        let rss = repo
            .create_rss_feed("dofus2-fr-news", "https://example.com/rss")
            .await
            .unwrap();

        // rss feed id is not an almanax feed
        let result = repo
            .create_almanax_hook(&NewAlmanaxHook::new(CALLBACK, vec![rss.id]))
            .await;
        assert!(matches!(result, Err(HookError::Validation(_))));
    }

    #[tokio::test]
    async fn test_callback_unique_per_kind() {
        let (_db, repo) = setup().await;
        let rss = repo
            .create_rss_feed("dofus2-fr-news", "https://example.com/rss")
            .await
            .unwrap();
        let tw = repo.create_twitter_feed("DOFUSfr", 72272795).await.unwrap();

        repo.create_social_hook(&NewSocialHook::new(FeedKind::Rss, CALLBACK, vec![rss.id]))
            .await
            .unwrap();
        let duplicate = repo
            .create_social_hook(&NewSocialHook::new(FeedKind::Rss, CALLBACK, vec![rss.id]))
            .await;
        assert!(matches!(duplicate, Err(HookError::Validation(_))));

        // same callback on another kind is fine
        repo.create_social_hook(&NewSocialHook::new(
            FeedKind::Twitter,
            CALLBACK,
            vec![tw.id],
        ))
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_social_subscribers() {
        let (_db, repo) = setup().await;
        let rss = repo
            .create_rss_feed("dofus2-fr-news", "https://example.com/rss")
            .await
            .unwrap();
        let hook = repo
            .create_social_hook(
                &NewSocialHook::new(FeedKind::Rss, CALLBACK, vec![rss.id])
                    .with_whitelist(vec!["Loot".to_string()])
                    .with_blacklist(vec!["hello".to_string()]),
            )
            .await
            .unwrap();

        assert_eq!(hook.preview_length, 2000);
        assert_eq!(hook.whitelist, vec!["loot".to_string()]);

        let subs = repo.social_subscribers(FeedKind::Rss, rss.id).await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].blacklist, vec!["hello".to_string()]);
        assert!(repo
            .social_subscribers(FeedKind::Twitter, rss.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_fire_stamp() {
        let (_db, repo) = setup().await;
        let feed = repo.create_almanax_feed("almanax_en", "en").await.unwrap();
        let hook = repo
            .create_almanax_hook(&NewAlmanaxHook::new(CALLBACK, vec![feed.id]))
            .await
            .unwrap();

        assert_eq!(repo.fire_stamp(CALLBACK).await.unwrap(), 1);
        let stamped = repo.almanax_hook(hook.id).await.unwrap().unwrap();
        assert!(stamped.last_fired_at.is_some());

        assert_eq!(repo.fire_stamp("https://unknown.example").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_callback() {
        let (_db, repo) = setup().await;
        let feed = repo.create_almanax_feed("almanax_en", "en").await.unwrap();
        let hook = repo
            .create_almanax_hook(&NewAlmanaxHook::new(CALLBACK, vec![feed.id]))
            .await
            .unwrap();

        assert_eq!(repo.delete_by_callback(CALLBACK).await.unwrap(), 1);
        assert!(repo.almanax_hook(hook.id).await.unwrap().is_none());
        assert!(repo.almanax_subscribers(feed.id).await.unwrap().is_empty());
        assert_eq!(repo.delete_by_callback(CALLBACK).await.unwrap(), 0);

        // tombstoned callbacks can be registered again
        repo.create_almanax_hook(&NewAlmanaxHook::new(CALLBACK, vec![feed.id]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_malformed_subscriber_is_skipped() {
        let (db, repo) = setup().await;
        let feed = repo.create_almanax_feed("almanax_en", "en").await.unwrap();
        let hook = repo
            .create_almanax_hook(&NewAlmanaxHook::new(CALLBACK, vec![feed.id]))
            .await
            .unwrap();

        sqlx::query(
            "UPDATE almanax_webhooks SET bonus_whitelist = '[\"a\"]', bonus_blacklist = '[\"b\"]' WHERE id = $1",
        )
        .bind(hook.id.to_string())
        .execute(db.pool())
        .await
        .unwrap();

        assert!(repo.almanax_subscribers(feed.id).await.unwrap().is_empty());
        assert!(matches!(
            repo.almanax_hook(hook.id).await,
            Err(HookError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_weekday_translations() {
        let (_db, repo) = setup().await;
        let translations = repo.weekday_translations().await.unwrap();
        assert_eq!(translations.get("de", "Saturday"), Some("Samstag"));
        assert_eq!(translations.get("fr", "Monday"), Some("Lundi"));
        assert_eq!(translations.get("en", "Sunday"), Some("Sunday"));
    }
}
