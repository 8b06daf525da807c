use crate::application::error::{ErrorReport, HttpError};
use crate::application::forms::FormErrors;
use crate::application::pagination::PageMeta;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};
use crate::domain::posts::format_display_date;
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;

/// Pages on either side of the current one that get a direct link.
const PAGE_LINK_RADIUS: u64 = 2;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Render the shared error page for `error`, keeping its diagnostic report.
pub fn render_error_response(chrome: LayoutChrome, error: HttpError) -> Response {
    let status = error.status();
    let content = ErrorPageView::for_status(status, error.public_message());
    let view = LayoutContext::new(chrome, content.title.clone(), content);
    let mut response = render_template_response(ErrorTemplate { view }, status);
    error.into_report().attach(&mut response);
    response
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let content = ErrorPageView::not_found();
    let view = LayoutContext::new(chrome, content.title.clone(), content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct ViewerView {
    pub username: String,
    pub profile_href: String,
}

impl ViewerView {
    pub fn from_user(user: &UserRecord) -> Self {
        Self {
            username: user.username.clone(),
            profile_href: profile_href(&user.username),
        }
    }
}

/// Site-wide parts of every page.
#[derive(Clone)]
pub struct LayoutChrome {
    pub site_title: String,
    pub login_url: String,
    pub media_base_url: String,
    pub viewer: Option<ViewerView>,
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site_title: String,
    pub page_title: String,
    pub login_url: String,
    pub viewer: Option<ViewerView>,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, page_title: impl Into<String>, content: T) -> Self {
        Self {
            site_title: chrome.site_title,
            page_title: page_title.into(),
            login_url: chrome.login_url,
            viewer: chrome.viewer,
            content,
        }
    }
}

#[derive(Clone)]
pub struct GroupLinkView {
    pub title: String,
    pub href: String,
}

#[derive(Clone, Template)]
#[template(path = "partials/post_card.html")]
pub struct PostCard {
    pub id: i64,
    pub text: String,
    pub author: String,
    pub author_href: String,
    pub group: Option<GroupLinkView>,
    pub published: String,
    pub iso_date: String,
    pub image_url: Option<String>,
    pub detail_href: String,
}

impl PostCard {
    pub fn from_record(post: &PostRecord, media_base_url: &str) -> Self {
        Self {
            id: post.id,
            text: post.text.clone(),
            author: post.author.username.clone(),
            author_href: profile_href(&post.author.username),
            group: post.group.as_ref().map(|group| GroupLinkView {
                title: group.title.clone(),
                href: group_href(&group.slug),
            }),
            published: format_display_date(post.pub_date),
            iso_date: post.pub_date.format(&Rfc3339).unwrap_or_default(),
            image_url: post
                .image
                .as_deref()
                .map(|path| media_url(media_base_url, path)),
            detail_href: post_href(post.id),
        }
    }
}

#[derive(Clone)]
pub struct PageLinkView {
    pub number: u64,
    pub href: String,
    pub is_current: bool,
    /// Pages were skipped between this link and the previous one.
    pub gap_before: bool,
}

#[derive(Clone, Template)]
#[template(path = "partials/paginator.html")]
pub struct PaginationView {
    pub number: u64,
    pub page_count: u64,
    pub total: u64,
    pub start_index: u64,
    pub end_index: u64,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
    pub links: Vec<PageLinkView>,
}

impl PaginationView {
    pub fn new(base_path: &str, meta: &PageMeta) -> Self {
        let href = |number: u64| format!("{base_path}?page={number}");

        let window_start = meta.number.saturating_sub(PAGE_LINK_RADIUS).max(1);
        let window_end = meta
            .number
            .saturating_add(PAGE_LINK_RADIUS)
            .min(meta.page_count);

        let mut numbers = Vec::new();
        if window_start > 1 {
            numbers.push(1);
        }
        numbers.extend(window_start..=window_end);
        if window_end < meta.page_count {
            numbers.push(meta.page_count);
        }

        let mut previous = 0;
        let links = numbers
            .into_iter()
            .map(|number| {
                let link = PageLinkView {
                    number,
                    href: href(number),
                    is_current: number == meta.number,
                    gap_before: previous != 0 && number > previous + 1,
                };
                previous = number;
                link
            })
            .collect();

        Self {
            number: meta.number,
            page_count: meta.page_count,
            total: meta.total,
            start_index: meta.start_index(),
            end_index: meta.end_index(),
            previous_href: meta.previous_number().map(href),
            next_href: meta.next_number().map(href),
            links,
        }
    }

    pub fn is_paginated(&self) -> bool {
        self.page_count > 1
    }
}

#[derive(Template)]
#[template(path = "partials/feed.html")]
pub struct FeedView {
    pub heading: String,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
    pub empty_message: &'static str,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<FeedView>,
}

pub struct GroupPageView {
    pub title: String,
    pub description: String,
    pub feed: FeedView,
}

impl GroupPageView {
    pub fn new(group: &GroupRecord, feed: FeedView) -> Self {
        Self {
            title: group.title.clone(),
            description: group.description.clone(),
            feed,
        }
    }
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupPageView>,
}

pub struct FollowActionView {
    pub following: bool,
    pub action: String,
    pub label: &'static str,
}

impl FollowActionView {
    pub fn new(username: &str, following: bool) -> Self {
        if following {
            Self {
                following,
                action: format!("{}unfollow/", profile_href(username)),
                label: "Unfollow",
            }
        } else {
            Self {
                following,
                action: format!("{}follow/", profile_href(username)),
                label: "Follow",
            }
        }
    }
}

pub struct ProfileView {
    pub username: String,
    pub post_count: u64,
    pub follower_count: u64,
    /// Absent for anonymous viewers and on one's own profile.
    pub follow_action: Option<FollowActionView>,
    pub feed: FeedView,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

pub struct CommentView {
    pub author: String,
    pub author_href: String,
    pub text: String,
    pub created: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            author: comment.author.username.clone(),
            author_href: profile_href(&comment.author.username),
            text: comment.text.clone(),
            created: format_display_date(comment.created),
        }
    }
}

pub struct CommentFormView {
    pub action: String,
    pub text: String,
    pub errors: Vec<String>,
}

impl CommentFormView {
    pub fn empty(post_id: i64) -> Self {
        Self {
            action: format!("{}comment/", post_href(post_id)),
            text: String::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_errors(post_id: i64, text: String, errors: &FormErrors) -> Self {
        Self {
            text,
            errors: errors.for_field("text"),
            ..Self::empty(post_id)
        }
    }
}

pub struct PostDetailView {
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub edit_href: Option<String>,
    /// Only offered to signed-in viewers.
    pub comment_form: Option<CommentFormView>,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

pub struct GroupOption {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

pub struct PostFormView {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub current_image_url: Option<String>,
    pub text_errors: Vec<String>,
    pub group_errors: Vec<String>,
    pub image_errors: Vec<String>,
}

impl PostFormView {
    pub fn create(groups: &[GroupRecord]) -> Self {
        Self {
            is_edit: false,
            action: "/create/".to_string(),
            text: String::new(),
            groups: group_options(groups, None),
            current_image_url: None,
            text_errors: Vec::new(),
            group_errors: Vec::new(),
            image_errors: Vec::new(),
        }
    }

    pub fn edit(post: &PostRecord, groups: &[GroupRecord], media_base_url: &str) -> Self {
        Self {
            is_edit: true,
            action: format!("{}edit/", post_href(post.id)),
            text: post.text.clone(),
            groups: group_options(groups, post.group.as_ref().map(|group| group.id)),
            current_image_url: post
                .image
                .as_deref()
                .map(|path| media_url(media_base_url, path)),
            text_errors: Vec::new(),
            group_errors: Vec::new(),
            image_errors: Vec::new(),
        }
    }

    /// Put the submitted values and their messages back into the form.
    pub fn with_submission(
        self,
        text: String,
        group_id: Option<i64>,
        groups: &[GroupRecord],
        errors: &FormErrors,
    ) -> Self {
        Self {
            text,
            groups: group_options(groups, group_id),
            text_errors: errors.for_field("text"),
            group_errors: errors.for_field("group"),
            image_errors: errors.for_field("image"),
            ..self
        }
    }

    pub fn title(&self) -> &'static str {
        if self.is_edit { "Edit post" } else { "New post" }
    }

    pub fn submit_label(&self) -> &'static str {
        if self.is_edit { "Save" } else { "Publish" }
    }
}

fn group_options(groups: &[GroupRecord], selected: Option<i64>) -> Vec<GroupOption> {
    groups
        .iter()
        .map(|group| GroupOption {
            id: group.id,
            title: group.title.clone(),
            selected: selected == Some(group.id),
        })
        .collect()
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page not found".to_string(),
            message: "The page you requested does not exist.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }

    pub fn forbidden() -> Self {
        Self {
            title: "Access denied".to_string(),
            message: "You do not have permission to do that.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }

    pub fn for_status(status: StatusCode, public_message: &str) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::not_found(),
            StatusCode::FORBIDDEN => Self::forbidden(),
            _ => Self {
                title: public_message.to_string(),
                message: "Something went wrong on our side. Please try again later.".to_string(),
                primary_action: Some(ErrorAction::home()),
            },
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to home".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

/// Usernames arrive unchecked from the proxy header, so they are encoded as one path segment.
pub fn profile_href(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

pub fn group_href(slug: &str) -> String {
    format!("/group/{}/", urlencoding::encode(slug))
}

pub fn post_href(id: i64) -> String {
    format!("/posts/{id}/")
}

pub fn media_url(base_url: &str, path: &str) -> String {
    format!("{base_url}{}", path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pagination::{PageNumber, Paginator};

    fn links(view: &PaginationView) -> Vec<(u64, bool, bool)> {
        view.links
            .iter()
            .map(|link| (link.number, link.is_current, link.gap_before))
            .collect()
    }

    #[test]
    fn short_feeds_link_every_page() {
        let meta = Paginator::default().locate(13, PageNumber::new(2));
        let view = PaginationView::new("/group/test-slug/", &meta);

        assert!(view.is_paginated());
        assert_eq!(links(&view), vec![(1, false, false), (2, true, false)]);
        assert_eq!(view.previous_href.as_deref(), Some("/group/test-slug/?page=1"));
        assert_eq!(view.next_href, None);
        assert_eq!((view.start_index, view.end_index), (11, 13));
    }

    #[test]
    fn long_feeds_collapse_distant_pages() {
        let meta = Paginator::default().locate(200, PageNumber::new(10));
        let view = PaginationView::new("/", &meta);

        assert_eq!(
            links(&view),
            vec![
                (1, false, false),
                (8, false, true),
                (9, false, false),
                (10, true, false),
                (11, false, false),
                (12, false, false),
                (20, false, true),
            ]
        );
    }

    #[test]
    fn single_page_is_not_paginated() {
        let meta = Paginator::default().locate(0, PageNumber::FIRST);
        let view = PaginationView::new("/", &meta);
        assert!(!view.is_paginated());
        assert_eq!(links(&view), vec![(1, true, false)]);
    }

    #[test]
    fn follow_action_targets_matching_route() {
        let follow = FollowActionView::new("author", false);
        assert_eq!(follow.action, "/profile/author/follow/");
        let unfollow = FollowActionView::new("author", true);
        assert_eq!(unfollow.action, "/profile/author/unfollow/");
    }

    #[test]
    fn profile_links_keep_reserved_characters_in_one_segment() {
        assert_eq!(profile_href("team/alpha"), "/profile/team%2Falpha/");
        assert_eq!(profile_href("a b?c#d"), "/profile/a%20b%3Fc%23d/");
        assert_eq!(
            FollowActionView::new("team/alpha", false).action,
            "/profile/team%2Falpha/follow/"
        );
    }

    #[test]
    fn media_urls_join_without_double_slash() {
        assert_eq!(
            media_url("/media/", "posts/abc-cat.gif"),
            "/media/posts/abc-cat.gif"
        );
    }
}
