//! Calendar firing decisions.
//!
//! Decisions are pure functions of the tick time, the subscriber settings and
//! the fetched calendar. Only ticks on minute 0 can fire.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use super::client::{AlmanaxCalendar, AlmanaxClient, AlmanaxEntry};
use super::render::render_job;
use crate::config::AlmanaxConfig;
use crate::datetime::{
    add_days, is_last_day_of_month, is_new_hour, last_day_of_month, local_date, parse_timezone,
    weekday_name,
};
use crate::discord::PreparedHook;
use crate::hooks::{
    AlmanaxFeed, AlmanaxHook, FeedKind, HookRepository, Interval, Mention, WeekdayTranslations,
};
use crate::scheduler::FeedHandler;
use crate::Result;

/// Days rendered by a weekly summary.
pub const WEEK_SPAN_DAYS: u64 = 7;

/// A future day a subscriber asked to be reminded of.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub days_ahead: u32,
    pub entry: AlmanaxEntry,
    pub mentions: Vec<Mention>,
}

/// One subscriber, one interval.
#[derive(Debug, Clone)]
pub struct AlmanaxJob {
    pub hook: AlmanaxHook,
    pub interval: Interval,
    /// Today's bonus was filtered out; render the previews only.
    pub only_preview: bool,
    /// Today for daily jobs, the summary span otherwise.
    pub days: Vec<AlmanaxEntry>,
    pub previews: Vec<Preview>,
    pub translations: Arc<WeekdayTranslations>,
}

/// Intervals due for `hook` at `tick`, evaluated in the hook's timezone.
pub fn firing_intervals(hook: &AlmanaxHook, tick: DateTime<Utc>) -> Result<Vec<Interval>> {
    let tz = parse_timezone(&hook.timezone)?;
    Ok(fires_in(hook, tz, tick))
}

fn fires_in(hook: &AlmanaxHook, tz: Tz, tick: DateTime<Utc>) -> Vec<Interval> {
    let local = tick.with_timezone(&tz);
    if local.hour() != hook.midnight_offset {
        return Vec::new();
    }

    let mut due = Vec::new();
    if hook.has_interval(Interval::Daily) {
        due.push(Interval::Daily);
    }
    if hook.has_interval(Interval::Weekly) {
        let weekday = weekday_name(local.weekday()).to_lowercase();
        if hook.weekly_weekday.as_deref() == Some(weekday.as_str()) {
            due.push(Interval::Weekly);
        }
    }
    if hook.has_interval(Interval::Monthly) && is_last_day_of_month(local.date_naive()) {
        due.push(Interval::Monthly);
    }
    due
}

/// Inclusive date span of a weekly or monthly summary sent on `today`.
///
/// Weekly covers the next seven days, monthly the rest of tomorrow's month.
pub fn summary_span(interval: Interval, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let start = add_days(today, 1);
    match interval {
        Interval::Daily => None,
        Interval::Weekly => Some((start, add_days(today, WEEK_SPAN_DAYS))),
        Interval::Monthly => Some((start, last_day_of_month(start))),
    }
}

/// Mentions whose bonus shows up exactly their days-before ahead of `today`.
pub fn preview_mentions(
    hook: &AlmanaxHook,
    calendar: &AlmanaxCalendar,
    today: NaiveDate,
) -> Vec<Preview> {
    let mut previews: Vec<Preview> = Vec::new();

    for (bonus_id, mentions) in &hook.mentions {
        for mention in mentions {
            let Some(days) = mention.ping_days_before else {
                continue;
            };
            let Some(entry) = calendar.get(&add_days(today, days as u64)) else {
                continue;
            };
            if &entry.bonus.kind.id != bonus_id {
                continue;
            }

            match previews.iter_mut().find(|p| p.days_ahead == days) {
                Some(preview) => preview.mentions.push(mention.clone()),
                None => previews.push(Preview {
                    days_ahead: days,
                    entry: entry.clone(),
                    mentions: vec![mention.clone()],
                }),
            }
        }
    }

    previews.sort_by_key(|p| p.days_ahead);
    previews
}

/// Send jobs for one subscriber at `tick`.
pub fn plan(
    hook: &AlmanaxHook,
    calendar: &AlmanaxCalendar,
    tick: DateTime<Utc>,
    translations: &Arc<WeekdayTranslations>,
) -> Result<Vec<AlmanaxJob>> {
    let tz = parse_timezone(&hook.timezone)?;
    let due = fires_in(hook, tz, tick);
    if due.is_empty() {
        return Ok(Vec::new());
    }

    let today = local_date(tick, tz);
    let previews = preview_mentions(hook, calendar, today);
    let mut jobs = Vec::new();

    for interval in due {
        let job = match summary_span(interval, today) {
            None => {
                let Some(entry) = calendar.get(&today) else {
                    warn!("No almanax data for {} (webhook {})", today, hook.id);
                    continue;
                };
                let filtered_out = !hook.bonus_filter.keeps(&entry.bonus.kind.id);
                if filtered_out && previews.is_empty() {
                    debug!("Webhook {} filtered out {}", hook.id, entry.bonus.kind.id);
                    continue;
                }
                AlmanaxJob {
                    hook: hook.clone(),
                    interval,
                    only_preview: filtered_out,
                    days: vec![entry.clone()],
                    previews: previews.clone(),
                    translations: Arc::clone(translations),
                }
            }
            Some((start, end)) => {
                let days: Vec<AlmanaxEntry> = start
                    .iter_days()
                    .take_while(|d| *d <= end)
                    .filter_map(|d| {
                        let entry = calendar.get(&d);
                        if entry.is_none() {
                            warn!("No almanax data for {} (webhook {})", d, hook.id);
                        }
                        entry
                    })
                    .filter(|e| !previews.is_empty() || hook.bonus_filter.keeps(&e.bonus.kind.id))
                    .cloned()
                    .collect();
                if days.is_empty() {
                    continue;
                }
                AlmanaxJob {
                    hook: hook.clone(),
                    interval,
                    only_preview: false,
                    days,
                    previews: Vec::new(),
                    translations: Arc::clone(translations),
                }
            }
        };
        jobs.push(job);
    }

    Ok(jobs)
}

/// [`FeedHandler`] for Almanax feeds.
pub struct AlmanaxHandler {
    client: AlmanaxClient,
    source_tz: Tz,
    range_size: u32,
    avatar_url: String,
}

impl AlmanaxHandler {
    pub fn new(config: &AlmanaxConfig) -> Result<Self> {
        Ok(Self {
            client: AlmanaxClient::new(config)?,
            source_tz: parse_timezone(&config.source_timezone)?,
            range_size: config.range_size,
            avatar_url: config.avatar_url.clone(),
        })
    }
}

#[async_trait]
impl FeedHandler for AlmanaxHandler {
    type Feed = AlmanaxFeed;
    type State = ();
    type Job = AlmanaxJob;

    fn kind(&self) -> FeedKind {
        FeedKind::Almanax
    }

    async fn decide(
        &self,
        feed: &AlmanaxFeed,
        _state: &mut (),
        tick: DateTime<Utc>,
        _interval: Duration,
        repo: &dyn HookRepository,
    ) -> Result<Vec<AlmanaxJob>> {
        if !is_new_hour(tick) {
            return Ok(Vec::new());
        }

        let subscribers = repo.almanax_subscribers(feed.id).await?;
        let due: Vec<AlmanaxHook> = subscribers
            .into_iter()
            .filter(|hook| match firing_intervals(hook, tick) {
                Ok(intervals) => !intervals.is_empty(),
                Err(e) => {
                    warn!("Skipping webhook {}: {}", hook.id, e);
                    false
                }
            })
            .collect();
        if due.is_empty() {
            return Ok(Vec::new());
        }

        let source_today = local_date(tick, self.source_tz);
        let from = source_today.pred_opt().unwrap_or(source_today);
        let calendar = self
            .client
            .fetch_range(&feed.language, from, self.range_size, self.source_tz.name())
            .await?;
        let translations = Arc::new(repo.weekday_translations().await?);

        let mut jobs = Vec::new();
        for hook in &due {
            match plan(hook, &calendar, tick, &translations) {
                Ok(mut planned) => jobs.append(&mut planned),
                Err(e) => warn!("Skipping webhook {}: {}", hook.id, e),
            }
        }
        Ok(jobs)
    }

    fn render(&self, feed: &AlmanaxFeed, job: &AlmanaxJob) -> Result<Vec<PreparedHook>> {
        let webhook = render_job(&feed.language, job, &self.avatar_url)?;
        Ok(vec![PreparedHook::discord(&job.hook.callback, &webhook)?])
    }
}
