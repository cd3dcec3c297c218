//! Database schema and migrations.
//!
//! Migrations are applied in order when the database is opened. The
//! `schema_version` table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: feeds
    r#"
-- One row per feed regardless of kind; ids are unique across kinds
CREATE TABLE feeds (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    kind        TEXT NOT NULL,                 -- 'almanax', 'rss', 'twitter'
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    deleted_at  TEXT
);

CREATE TABLE almanax_feeds (
    id                  INTEGER PRIMARY KEY REFERENCES feeds(id),
    human_readable_id   TEXT NOT NULL UNIQUE,
    language            TEXT NOT NULL
);

CREATE TABLE rss_feeds (
    id                  INTEGER PRIMARY KEY REFERENCES feeds(id),
    human_readable_id   TEXT NOT NULL UNIQUE,
    url                 TEXT NOT NULL
);

CREATE TABLE twitter_feeds (
    id                  INTEGER PRIMARY KEY REFERENCES feeds(id),
    human_readable_id   TEXT NOT NULL UNIQUE,
    twitter_id          INTEGER NOT NULL
);

CREATE INDEX idx_feeds_kind ON feeds(kind);
"#,
    // v2: webhooks and their settings
    r#"
CREATE TABLE webhooks (
    id              TEXT PRIMARY KEY,          -- UUID v4
    kind            TEXT NOT NULL,             -- 'almanax', 'rss', 'twitter'
    callback        TEXT NOT NULL,
    format          TEXT NOT NULL DEFAULT 'discord',
    created_at      TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at      TEXT NOT NULL DEFAULT (datetime('now')),
    last_fired_at   TEXT,
    deleted_at      TEXT
);

-- A callback is registered at most once per kind while active
CREATE UNIQUE INDEX idx_webhooks_kind_callback
    ON webhooks(kind, callback) WHERE deleted_at IS NULL;
CREATE INDEX idx_webhooks_callback ON webhooks(callback);

CREATE TABLE almanax_webhooks (
    id                  TEXT PRIMARY KEY REFERENCES webhooks(id),
    timezone            TEXT NOT NULL,
    midnight_offset     INTEGER NOT NULL DEFAULT 0,
    intervals           TEXT NOT NULL DEFAULT '["daily"]',   -- JSON array
    weekly_weekday      TEXT,
    wants_iso_date      INTEGER NOT NULL DEFAULT 0,
    bonus_whitelist     TEXT,                                -- JSON array
    bonus_blacklist     TEXT                                 -- JSON array
);

CREATE TABLE social_webhooks (
    id                  TEXT PRIMARY KEY REFERENCES webhooks(id),
    whitelist           TEXT NOT NULL DEFAULT '[]',          -- JSON array
    blacklist           TEXT NOT NULL DEFAULT '[]',          -- JSON array
    preview_length      INTEGER NOT NULL
);

CREATE TABLE almanax_mentions (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    webhook_id          TEXT NOT NULL REFERENCES webhooks(id) ON DELETE CASCADE,
    bonus_id            TEXT NOT NULL,
    discord_id          INTEGER NOT NULL,
    is_role             INTEGER NOT NULL DEFAULT 0,
    ping_days_before    INTEGER
);

CREATE INDEX idx_almanax_mentions_webhook_id ON almanax_mentions(webhook_id);

CREATE TABLE subscriptions (
    webhook_id  TEXT NOT NULL REFERENCES webhooks(id) ON DELETE CASCADE,
    feed_id     INTEGER NOT NULL REFERENCES feeds(id),
    PRIMARY KEY (webhook_id, feed_id)
);

CREATE INDEX idx_subscriptions_feed_id ON subscriptions(feed_id);
"#,
    // v3: weekday display names
    r#"
CREATE TABLE weekday_translations (
    language    TEXT NOT NULL,
    weekday     TEXT NOT NULL,     -- English weekday name, e.g. 'Monday'
    translation TEXT NOT NULL,
    PRIMARY KEY (language, weekday)
);

INSERT INTO weekday_translations (language, weekday, translation) VALUES
    ('en', 'Monday', 'Monday'), ('en', 'Tuesday', 'Tuesday'), ('en', 'Wednesday', 'Wednesday'),
    ('en', 'Thursday', 'Thursday'), ('en', 'Friday', 'Friday'), ('en', 'Saturday', 'Saturday'),
    ('en', 'Sunday', 'Sunday'),
    ('fr', 'Monday', 'Lundi'), ('fr', 'Tuesday', 'Mardi'), ('fr', 'Wednesday', 'Mercredi'),
    ('fr', 'Thursday', 'Jeudi'), ('fr', 'Friday', 'Vendredi'), ('fr', 'Saturday', 'Samedi'),
    ('fr', 'Sunday', 'Dimanche'),
    ('de', 'Monday', 'Montag'), ('de', 'Tuesday', 'Dienstag'), ('de', 'Wednesday', 'Mittwoch'),
    ('de', 'Thursday', 'Donnerstag'), ('de', 'Friday', 'Freitag'), ('de', 'Saturday', 'Samstag'),
    ('de', 'Sunday', 'Sonntag'),
    ('es', 'Monday', 'Lunes'), ('es', 'Tuesday', 'Martes'), ('es', 'Wednesday', 'Miércoles'),
    ('es', 'Thursday', 'Jueves'), ('es', 'Friday', 'Viernes'), ('es', 'Saturday', 'Sábado'),
    ('es', 'Sunday', 'Domingo'),
    ('it', 'Monday', 'Lunedì'), ('it', 'Tuesday', 'Martedì'), ('it', 'Wednesday', 'Mercoledì'),
    ('it', 'Thursday', 'Giovedì'), ('it', 'Friday', 'Venerdì'), ('it', 'Saturday', 'Sabato'),
    ('it', 'Sunday', 'Domenica');
"#,
];
