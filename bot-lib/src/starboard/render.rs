use super::gateway::{StarAttachment, StarMessage};
use chrono::{DateTime, Utc};

/// Discord rejects embed descriptions longer than this.
pub const MAX_DESCRIPTION_CHARS: usize = 4096;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline,
        }
    }
}

/// A rendered repost. Kept separate from serenity's builder so it can be compared in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarEmbed {
    pub author_name: String,
    pub author_icon_url: String,
    pub description: String,
    pub image_url: Option<String>,
    pub fields: Vec<EmbedField>,
    pub colour: u32,
    pub timestamp: DateTime<Utc>,
}

impl StarEmbed {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }
}

pub fn render_repost(message: &StarMessage, count: u64, emoji: &str, threshold: u64) -> StarEmbed {
    let mut fields = Vec::new();
    let mut image_url = None;

    if let Some(attachment) = message.attachments.first() {
        match attachment_display(attachment, message.channel_nsfw) {
            AttachmentDisplay::Inline => image_url = Some(attachment.url.clone()),
            AttachmentDisplay::Field(value) => {
                fields.push(EmbedField::new("Attachment", value, false))
            }
        }
    }

    fields.push(EmbedField::new(
        "Original",
        format!("[Jump!]({})", message.link()),
        false,
    ));
    fields.push(EmbedField::new("Stars", format!("{emoji} {count}"), true));
    fields.push(EmbedField::new(
        "Channel",
        format!("<#{}>", message.channel_id),
        true,
    ));

    StarEmbed {
        author_name: message.author.display_name.clone(),
        author_icon_url: message.author.avatar_url.clone(),
        description: truncate(&message.content, MAX_DESCRIPTION_CHARS),
        image_url,
        fields,
        colour: star_colour(count, threshold),
        timestamp: message.timestamp,
    }
}

enum AttachmentDisplay {
    Inline,
    Field(String),
}

fn attachment_display(attachment: &StarAttachment, nsfw: bool) -> AttachmentDisplay {
    let link = format!("[{}]({})", attachment.filename, attachment.url);

    if nsfw {
        AttachmentDisplay::Field(format!("NSFW: {link}"))
    } else if is_spoiler(attachment) {
        AttachmentDisplay::Field(format!("||{link}||"))
    } else if is_image(attachment) {
        AttachmentDisplay::Inline
    } else {
        AttachmentDisplay::Field(link)
    }
}

fn is_spoiler(attachment: &StarAttachment) -> bool {
    attachment.filename.starts_with("SPOILER_")
}

fn is_image(attachment: &StarAttachment) -> bool {
    if let Some(content_type) = &attachment.content_type {
        return content_type.starts_with("image");
    }

    attachment
        .filename
        .rsplit_once('.')
        .is_some_and(|(_, extension)| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|image| image.eq_ignore_ascii_case(extension))
        })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }

    let mut truncated: String = text.chars().take(max_chars - 1).collect();
    truncated.push('…');
    truncated
}

/// Pale yellow at the threshold, deep gold at twice the threshold and beyond.
fn star_colour(count: u64, threshold: u64) -> u32 {
    const PALE: (u32, u32, u32) = (0xff, 0xf7, 0xc4);
    const GOLD: (u32, u32, u32) = (0xff, 0xc2, 0x0c);

    let threshold = threshold.max(1);
    let progress = count.saturating_sub(threshold).min(threshold);
    let blend = |from: u32, to: u32| -> u32 {
        let from = i64::from(from);
        let to = i64::from(to);
        let step = (to - from) * progress as i64 / threshold as i64;
        (from + step) as u32
    };

    (blend(PALE.0, GOLD.0) << 16) | (blend(PALE.1, GOLD.1) << 8) | blend(PALE.2, GOLD.2)
}
