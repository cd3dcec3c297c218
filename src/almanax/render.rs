//! Discord rendering of calendar jobs.

use super::client::AlmanaxEntry;
use super::decision::{AlmanaxJob, Preview};
use super::locale::{date_label, hint_title, preview_title, summary_content, total_title};
use crate::discord::{Embed, EmbedField, Image, Webhook, COLOR_DARK, MAX_FIELDS_PER_EMBED};
use crate::hooks::{Interval, Mention};
use crate::{HookError, Result};

/// Display name of calendar messages.
pub const USERNAME: &str = "Almanax";

/// Render a job for a feed in `language`.
pub fn render_job(language: &str, job: &AlmanaxJob, avatar_url: &str) -> Result<Webhook> {
    let mut webhook = match job.interval {
        Interval::Daily => render_daily(language, job)?,
        Interval::Weekly | Interval::Monthly => render_summary(language, job)?,
    };
    webhook.username = USERNAME.to_string();
    webhook.avatar_url = avatar_url.to_string();
    Ok(webhook)
}

/// Kamas amount with space-grouped thousands, e.g. "1 000 000 K".
pub fn format_kamas(kamas: i64) -> String {
    let digits = kamas.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 3);
    if kamas < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out.push_str(" K");
    out
}

/// Discord tags for mentions, one per id.
pub fn mention_tags(mentions: &[Mention]) -> String {
    let mut seen = Vec::new();
    let mut tags = Vec::new();
    for mention in mentions {
        if seen.contains(&mention.discord_id) {
            continue;
        }
        seen.push(mention.discord_id);
        tags.push(mention.tag());
    }
    tags.join(" ")
}

fn preview_fields(language: &str, previews: &[Preview]) -> Vec<EmbedField> {
    previews
        .iter()
        .map(|p| {
            EmbedField::new(
                preview_title(language, &p.entry.bonus.kind.name, p.days_ahead),
                format!("{}\n{}", mention_tags(&p.mentions), p.entry.bonus.description),
                false,
            )
        })
        .collect()
}

/// Split `fields` into pages of at most [`MAX_FIELDS_PER_EMBED`].
fn paginate(fields: Vec<EmbedField>) -> Vec<Vec<EmbedField>> {
    let mut pages = Vec::with_capacity(fields.len().div_ceil(MAX_FIELDS_PER_EMBED));
    let mut fields = fields.into_iter().peekable();
    while fields.peek().is_some() {
        pages.push(fields.by_ref().take(MAX_FIELDS_PER_EMBED).collect());
    }
    pages
}

/// `title` with an "(i/n)" suffix when the message spans several embeds.
fn page_title(title: &str, page: usize, pages: usize) -> String {
    if pages > 1 {
        format!("{} ({}/{})", title, page + 1, pages)
    } else {
        title.to_string()
    }
}

/// Embeds sharing one title, paginated over `fields`.
fn titled_embeds(title: &str, fields: Vec<EmbedField>) -> Vec<Embed> {
    let pages = paginate(fields);
    let count = pages.len();
    pages
        .into_iter()
        .enumerate()
        .map(|(page, fields)| {
            Embed::new(COLOR_DARK)
                .with_title(page_title(title, page, count))
                .with_fields(fields)
        })
        .collect()
}

fn render_daily(language: &str, job: &AlmanaxJob) -> Result<Webhook> {
    let entry = job
        .days
        .first()
        .ok_or_else(|| HookError::NotFound("almanax day".to_string()))?;
    let previews = preview_fields(language, &job.previews);

    if job.only_preview {
        return Ok(Webhook {
            content: None,
            embeds: titled_embeds(hint_title(language), previews),
            ..Default::default()
        });
    }

    let content = job
        .hook
        .mentions
        .get(&entry.bonus.kind.id)
        .map(|m| mention_tags(m))
        .filter(|s| !s.is_empty());

    let mut fields = vec![EmbedField::new(
        format!(":zap: {}", entry.bonus.kind.name),
        format!(
            "*{}*\n\n:moneybag: {}\n\n:pray: {}x **{}**",
            entry.bonus.description,
            format_kamas(entry.reward_kamas),
            entry.tribute.quantity,
            entry.tribute.item.name
        ),
        false,
    )];
    fields.extend(previews);

    let title = date_label(
        language,
        entry.date,
        job.hook.wants_iso_date,
        &job.translations,
    );
    let mut embeds = titled_embeds(&title, fields);
    let image = entry.tribute.item.best_image();
    if let Some(first) = embeds.first_mut().filter(|_| !image.is_empty()) {
        first.thumbnail = Some(Image::new(image));
    }

    Ok(Webhook {
        content,
        embeds,
        ..Default::default()
    })
}

fn render_summary(language: &str, job: &AlmanaxJob) -> Result<Webhook> {
    if job.days.is_empty() {
        return Err(HookError::NotFound("almanax span".to_string()));
    }

    let labels: Vec<String> = job
        .days
        .iter()
        .map(|e| date_label(language, e.date, job.hook.wants_iso_date, &job.translations))
        .collect();

    let mut fields: Vec<EmbedField> = job
        .days
        .iter()
        .zip(&labels)
        .enumerate()
        .map(|(i, (entry, label))| day_field(label, entry, i % MAX_FIELDS_PER_EMBED % 2 != 0))
        .collect();
    fields.push(EmbedField::new(
        total_title(language),
        tribute_total(&job.days),
        false,
    ));

    // A page holding only the total repeats the last day's label.
    let last_day = labels.len() - 1;
    let pages = paginate(fields);
    let count = pages.len();
    let embeds = pages
        .into_iter()
        .enumerate()
        .map(|(page, fields)| {
            let first = (page * MAX_FIELDS_PER_EMBED).min(last_day);
            let last = (page * MAX_FIELDS_PER_EMBED + fields.len() - 1).min(last_day);
            let span = format!("{} - {}", labels[first], labels[last]);
            Embed::new(COLOR_DARK)
                .with_title(page_title(&span, page, count))
                .with_fields(fields)
        })
        .collect();

    Ok(Webhook {
        content: summary_content(language, job.interval).map(str::to_string),
        embeds,
        ..Default::default()
    })
}

fn day_field(label: &str, entry: &AlmanaxEntry, inline: bool) -> EmbedField {
    EmbedField::new(
        format!("{} – {}", label, entry.bonus.kind.name),
        format!(
            "*{}*\n{}\n{}x **{}**",
            entry.bonus.description,
            format_kamas(entry.reward_kamas),
            entry.tribute.quantity,
            entry.tribute.item.name
        ),
        inline,
    )
}

/// Tribute quantities summed per item, in first-seen order.
fn tribute_total(days: &[AlmanaxEntry]) -> String {
    let mut totals: Vec<(&str, u64)> = Vec::new();
    for entry in days {
        let name = entry.tribute.item.name.as_str();
        let quantity = entry.tribute.quantity as u64;
        match totals.iter_mut().find(|(n, _)| *n == name) {
            Some((_, sum)) => *sum += quantity,
            None => totals.push((name, quantity)),
        }
    }

    totals
        .iter()
        .map(|(name, quantity)| format!("{quantity}x **{name}**\n"))
        .collect()
}
