use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::Response,
};
use tracing::warn;

use crate::{
    application::{
        error::HttpError,
        feed::{FeedFilter, FeedPage, FeedSubject},
        pagination::PageNumber,
        posts::PostDetail,
    },
    cache::page_param,
    domain::{entities::UserRecord, error::DomainError},
    presentation::views::{
        CommentFormView, CommentView, FeedView, FollowActionView, GroupPageView, GroupTemplate,
        IndexTemplate, LayoutContext, PaginationView, PostCard, PostDetailTemplate,
        PostDetailView, ProfileTemplate, ProfileView, render_not_found_response,
        render_template_response,
    },
};

use super::{CurrentUser, HttpState, Viewer, auth::error_page};

const SOURCE: &str = "infra::http::public";

pub(super) async fn index(
    State(state): State<HttpState>,
    viewer: Viewer,
    RawQuery(query): RawQuery,
) -> Response {
    let filter = FeedFilter::All;
    match state.feed.page(&filter, requested_page(query)).await {
        Ok(page) => {
            let feed = feed_view(&state, &filter, page, "Latest updates", "No posts yet.");
            let view = LayoutContext::new(state.chrome(viewer.user()), "Home", feed);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => error_page(&state, viewer.user(), err.into()),
    }
}

pub(super) async fn follow_index(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    RawQuery(query): RawQuery,
) -> Response {
    let filter = FeedFilter::Following(user.id);
    match state.feed.page(&filter, requested_page(query)).await {
        Ok(page) => {
            let feed = feed_view(
                &state,
                &filter,
                page,
                "Posts from authors you follow",
                "Authors you follow have not posted yet.",
            );
            let view = LayoutContext::new(state.chrome(Some(&user)), "Following", feed);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => error_page(&state, Some(&user), err.into()),
    }
}

pub(super) async fn group_posts(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let filter = FeedFilter::Group(slug);
    let page = match state.feed.page(&filter, requested_page(query)).await {
        Ok(page) => page,
        Err(err) => return error_page(&state, viewer.user(), err.into()),
    };

    let FeedSubject::Group(group) = page.subject.clone() else {
        return error_page(
            &state,
            viewer.user(),
            HttpError::internal(SOURCE, &subject_mismatch("group")),
        );
    };

    let feed = feed_view(&state, &filter, page, "", "No posts in this group yet.");
    let content = GroupPageView::new(&group, feed);
    let view = LayoutContext::new(state.chrome(viewer.user()), group.title.clone(), content);
    render_template_response(GroupTemplate { view }, StatusCode::OK)
}

pub(super) async fn profile(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(username): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let filter = FeedFilter::Author(username);
    let page = match state.feed.page(&filter, requested_page(query)).await {
        Ok(page) => page,
        Err(err) => return error_page(&state, viewer.user(), err.into()),
    };

    let FeedSubject::Author(author) = page.subject.clone() else {
        return error_page(
            &state,
            viewer.user(),
            HttpError::internal(SOURCE, &subject_mismatch("author")),
        );
    };

    let follower_count = match state.follows.follower_count(author.id).await {
        Ok(count) => count,
        Err(err) => return error_page(&state, viewer.user(), err.into()),
    };
    let follow_action = match follow_action(&state, viewer.user(), &author).await {
        Ok(action) => action,
        Err(err) => return error_page(&state, viewer.user(), err),
    };

    let post_count = page.posts.meta.total;
    let feed = feed_view(&state, &filter, page, "", "No posts yet.");
    let content = ProfileView {
        username: author.username.clone(),
        post_count,
        follower_count,
        follow_action,
        feed,
    };
    let title = format!("Profile of {}", author.username);
    let view = LayoutContext::new(state.chrome(viewer.user()), title, content);
    render_template_response(ProfileTemplate { view }, StatusCode::OK)
}

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Response {
    let Ok(id) = id.parse::<i64>() else {
        return render_not_found_response(state.chrome(viewer.user()));
    };

    match state.posts.detail(id).await {
        Ok(detail) => {
            let comment_form = viewer.user().map(|_| CommentFormView::empty(id));
            render_post_detail(&state, viewer.user(), detail, comment_form, StatusCode::OK)
        }
        Err(err) => error_page(&state, viewer.user(), err.into()),
    }
}

pub(super) async fn not_found(State(state): State<HttpState>, viewer: Viewer) -> Response {
    render_not_found_response(state.chrome(viewer.user()))
}

pub(super) fn render_post_detail(
    state: &HttpState,
    viewer: Option<&UserRecord>,
    detail: PostDetail,
    comment_form: Option<CommentFormView>,
    status: StatusCode,
) -> Response {
    let PostDetail {
        post,
        comments,
        author_post_count,
    } = detail;

    let edit_href = viewer
        .filter(|user| user.id == post.author.id)
        .map(|_| format!("/posts/{}/edit/", post.id));
    let content = PostDetailView {
        post: PostCard::from_record(&post, &state.site.media_base_url),
        author_post_count,
        comments: comments.iter().map(CommentView::from).collect(),
        edit_href,
        comment_form,
    };
    let view = LayoutContext::new(state.chrome(viewer), post.headline(), content);
    render_template_response(PostDetailTemplate { view }, status)
}

fn requested_page(query: Option<String>) -> PageNumber {
    PageNumber::parse(page_param(query.as_deref()).as_deref())
}

fn feed_view(
    state: &HttpState,
    filter: &FeedFilter,
    page: FeedPage,
    heading: &str,
    empty_message: &'static str,
) -> FeedView {
    let media_base_url = state.site.media_base_url.as_str();
    FeedView {
        heading: heading.to_string(),
        pagination: PaginationView::new(&filter.base_path(), &page.posts.meta),
        posts: page
            .posts
            .items
            .iter()
            .map(|post| PostCard::from_record(post, media_base_url))
            .collect(),
        empty_message,
    }
}

async fn follow_action(
    state: &HttpState,
    viewer: Option<&UserRecord>,
    author: &UserRecord,
) -> Result<Option<FollowActionView>, HttpError> {
    let Some(user) = viewer.filter(|user| user.id != author.id) else {
        return Ok(None);
    };
    let following = state.follows.is_following(user.id, author.id).await?;
    Ok(Some(FollowActionView::new(&author.username, following)))
}

fn subject_mismatch(expected: &'static str) -> DomainError {
    warn!(target = SOURCE, expected, "feed resolved to an unexpected subject");
    DomainError::invariant(format!("feed subject is not a {expected}"))
}
