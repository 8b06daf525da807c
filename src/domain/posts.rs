use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

use crate::domain::entities::PostRecord;

/// Number of characters used when a post is shown by its text alone.
pub const HEADLINE_CHARS: usize = 15;

/// Maximum length of a group title.
pub const GROUP_TITLE_MAX_CHARS: usize = 200;

const DISPLAY_DATE: &[FormatItem<'static>] =
    format_description!("[day] [month repr:short] [year], [hour]:[minute]");

impl PostRecord {
    /// Short label for the post: the first characters of its text.
    pub fn headline(&self) -> String {
        headline(&self.text)
    }
}

pub fn headline(text: &str) -> String {
    text.chars().take(HEADLINE_CHARS).collect()
}

pub fn format_display_date(value: OffsetDateTime) -> String {
    value
        .format(DISPLAY_DATE)
        .unwrap_or_else(|_| value.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn headline_truncates_on_char_boundaries() {
        assert_eq!(headline("Тестовый пост для проверки"), "Тестовый пост д");
        assert_eq!(headline("short"), "short");
    }

    #[test]
    fn display_date_is_human_readable() {
        let formatted = format_display_date(datetime!(2022-10-06 08:18 UTC));
        assert_eq!(formatted, "06 Oct 2022, 08:18");
    }
}
