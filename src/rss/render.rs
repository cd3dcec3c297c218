use regex::Regex;

use super::decision::RssJob;
use super::fetcher::strip_html;
use crate::discord::{truncate_text, Embed, Image, PreparedHook, Webhook, COLOR_WHITE};
use crate::hooks::RssFeed;
use crate::Result;

/// Display name for feeds whose name has no `game-language` shape.
const FALLBACK_USERNAME: &str = "Ankama";

/// First image referenced by an HTML body.
pub fn find_image_url(re: &Regex, html: &str) -> Option<String> {
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Sender name derived from the feed name, `dofus2-fr` becomes `Dofus2 Fr`.
pub fn username(feed_name: &str) -> String {
    let parts: Vec<&str> = feed_name.split('-').collect();
    match (parts.first(), parts.last()) {
        (Some(first), Some(last)) if parts.len() >= 2 => {
            format!("{} {}", title_case(first), title_case(last))
        }
        _ => FALLBACK_USERNAME.to_string(),
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Render one item for every recipient, honoring each preview length.
pub fn render_item(
    feed: &RssFeed,
    job: &RssJob,
    avatar_url: &str,
    image_re: &Regex,
) -> Result<Vec<PreparedHook>> {
    let item = &job.item;
    let image = find_image_url(image_re, &item.description).map(Image::new);
    let text = strip_html(&item.description);
    let name = username(&feed.name);

    job.recipients
        .iter()
        .map(|hook| {
            let description = truncate_text(&text, hook.preview_length);
            let embed = Embed {
                title: Some(item.title.clone()),
                url: item.link.clone(),
                image: image.clone(),
                description: (!description.is_empty()).then_some(description),
                ..Embed::new(COLOR_WHITE)
            };
            let webhook = Webhook {
                content: None,
                embeds: vec![embed],
                username: name.clone(),
                avatar_url: avatar_url.to_string(),
            };
            PreparedHook::discord(&hook.callback, &webhook)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{FeedKind, SocialHook};
    use crate::rss::FeedItem;
    use chrono::Utc;
    use uuid::Uuid;

    fn image_re() -> Regex {
        Regex::new(r#"(?i)<img[^>]+src="([^">]+)""#).unwrap()
    }

    fn hook(callback: &str, preview_length: usize) -> SocialHook {
        SocialHook {
            id: Uuid::new_v4(),
            kind: FeedKind::Rss,
            callback: callback.to_string(),
            format: "discord".to_string(),
            whitelist: Vec::new(),
            blacklist: Vec::new(),
            preview_length,
            subscriptions: vec![1],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_fired_at: None,
        }
    }

    fn feed() -> RssFeed {
        RssFeed {
            id: 1,
            name: "dofus2-fr".to_string(),
            url: "https://www.dofus.com/fr/rss/news.xml".to_string(),
        }
    }

    #[test]
    fn test_username() {
        assert_eq!(username("dofus2-fr"), "Dofus2 Fr");
        assert_eq!(username("dofus-touch-en"), "Dofus En");
        assert_eq!(username("ankama"), "Ankama");
    }

    #[test]
    fn test_find_image_url() {
        let re = image_re();
        assert_eq!(
            find_image_url(&re, r#"<p><IMG class="x" src="https://a/b.png"/></p>"#).as_deref(),
            Some("https://a/b.png")
        );
        assert_eq!(find_image_url(&re, "<p>no image</p>"), None);
    }

    #[test]
    fn test_render_item_per_recipient() {
        let job = RssJob {
            item: FeedItem {
                guid: "1".to_string(),
                title: "Update".to_string(),
                link: Some("https://www.dofus.com/news/1".to_string()),
                description: r#"<p><img src="https://img/1.jpg"/>Lots of new content here</p>"#
                    .to_string(),
                published_at: None,
            },
            recipients: vec![hook("https://a", 2000), hook("https://b", 10)],
        };

        let hooks = render_item(&feed(), &job, "https://avatar", &image_re()).unwrap();
        assert_eq!(hooks.len(), 2);

        let full = hooks[0].webhook().unwrap();
        assert_eq!(hooks[0].callback, "https://a");
        assert_eq!(full.username, "Dofus2 Fr");
        assert_eq!(full.avatar_url, "https://avatar");
        assert_eq!(full.content, None);
        let embed = &full.embeds[0];
        assert_eq!(embed.title.as_deref(), Some("Update"));
        assert_eq!(embed.color, COLOR_WHITE);
        assert_eq!(embed.url.as_deref(), Some("https://www.dofus.com/news/1"));
        assert_eq!(embed.image, Some(Image::new("https://img/1.jpg")));
        assert_eq!(embed.description.as_deref(), Some("Lots of new content here"));

        let short = hooks[1].webhook().unwrap();
        assert_eq!(short.embeds[0].description.as_deref(), Some("Lots of ..."));
    }

    #[test]
    fn test_render_item_without_description() {
        let job = RssJob {
            item: FeedItem {
                guid: "1".to_string(),
                title: "Bare".to_string(),
                link: None,
                description: String::new(),
                published_at: None,
            },
            recipients: vec![hook("https://a", 2000)],
        };

        let hooks = render_item(&feed(), &job, "https://avatar", &image_re()).unwrap();
        let embed = &hooks[0].webhook().unwrap().embeds[0];
        assert_eq!(embed.description, None);
        assert_eq!(embed.image, None);
        assert_eq!(embed.url, None);
    }
}
