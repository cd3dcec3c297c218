use super::decision::TwitterJob;
use crate::discord::{truncate_text, Embed, Image, PreparedHook, Webhook, COLOR_DARK};
use crate::Result;

/// Render one post for every recipient, honoring each preview length.
///
/// The post text is the message content. The first photo, if any, is shown
/// in a single embed.
pub fn render_tweet(job: &TwitterJob) -> Result<Vec<PreparedHook>> {
    let tweet = &job.tweet;
    let embeds = match tweet.attachments.first() {
        Some(url) => vec![Embed {
            image: Some(Image::new(url)),
            ..Embed::new(COLOR_DARK)
        }],
        None => Vec::new(),
    };

    job.recipients
        .iter()
        .map(|hook| {
            let webhook = Webhook {
                content: Some(truncate_text(&tweet.text, hook.preview_length)),
                embeds: embeds.clone(),
                username: format!("@{}", tweet.author.username),
                avatar_url: tweet.author.profile_image_url.clone(),
            };
            PreparedHook::discord(&hook.callback, &webhook)
        })
        .collect()
}
