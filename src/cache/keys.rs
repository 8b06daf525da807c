//! Cache keys for the main feed.

/// Fixed key under which the main feed is stored.
pub const FEED_CACHE_KEY: &str = "index_page";

/// Build the storage key for one variant of the main feed.
///
/// The raw `page` query value and the signed-in username (if any) are part
/// of the key so that page links and the navigation chrome stay correct.
pub fn feed_key(page: Option<&str>, viewer: Option<&str>) -> String {
    format!(
        "{FEED_CACHE_KEY}:page={}:viewer={}",
        page.unwrap_or(""),
        viewer.unwrap_or("")
    )
}

/// Pull the raw `page` parameter out of a query string.
pub fn page_param(query: Option<&str>) -> Option<String> {
    let query = query?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name == "page")
        .map(|(_, value)| value.into_owned())
}
