mod auth;
mod follows;
mod middleware;
mod posts;
mod public;

pub use auth::{CurrentUser, Viewer};

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderName,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use crate::{
    application::{
        feed::FeedService,
        follows::FollowService,
        pagination::Paginator,
        posts::PostService,
        repos::{
            CommentsRepo, FollowsRepo, GroupsRepo, ImageStore, PostsRepo, PostsWriteRepo, UsersRepo,
        },
    },
    cache::{CacheConfig, CacheState, response_cache_layer},
    config::Settings,
    domain::entities::UserRecord,
    infra::error::InfraError,
    presentation::views::{LayoutChrome, ViewerView},
};

use middleware::trace_requests;

/// Room for the text fields and multipart framing on top of the image itself.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Storage handles the HTTP services are built from.
#[derive(Clone)]
pub struct AppRepositories {
    pub users: Arc<dyn UsersRepo>,
    pub groups: Arc<dyn GroupsRepo>,
    pub posts: Arc<dyn PostsRepo>,
    pub posts_writer: Arc<dyn PostsWriteRepo>,
    pub comments: Arc<dyn CommentsRepo>,
    pub follows: Arc<dyn FollowsRepo>,
    pub images: Arc<dyn ImageStore>,
}

#[derive(Clone)]
pub struct SiteContext {
    pub title: String,
    pub media_base_url: String,
    pub max_upload_bytes: usize,
}

#[derive(Clone)]
pub struct AuthContext {
    pub user_header: HeaderName,
    pub login_url: String,
}

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub users: Arc<dyn UsersRepo>,
    pub site: SiteContext,
    pub auth: AuthContext,
    pub cache: Option<CacheState>,
}

impl HttpState {
    pub fn new(
        repos: AppRepositories,
        settings: &Settings,
    ) -> Result<Self, InfraError> {
        let user_header = HeaderName::from_str(&settings.auth.user_header)
            .map_err(|err| InfraError::configuration(format!("auth.user_header: {err}")))?;

        let feed = FeedService::new(
            repos.posts.clone(),
            repos.groups.clone(),
            repos.users.clone(),
            Paginator::new(settings.feed.page_size),
        );
        let posts = PostService::new(
            repos.posts.clone(),
            repos.posts_writer.clone(),
            repos.groups.clone(),
            repos.comments.clone(),
            repos.images.clone(),
        );
        let follows = FollowService::new(repos.users.clone(), repos.follows.clone());

        let cache_config = CacheConfig::from(&settings.cache);
        let cache = cache_config
            .enabled
            .then(|| CacheState::new(cache_config, user_header.clone()));

        Ok(Self {
            feed: Arc::new(feed),
            posts: Arc::new(posts),
            follows: Arc::new(follows),
            users: repos.users,
            site: SiteContext {
                title: settings.server.site_title.clone(),
                media_base_url: settings.media.base_url.clone(),
                max_upload_bytes: settings.media.max_upload_bytes,
            },
            auth: AuthContext {
                user_header,
                login_url: settings.auth.login_url.clone(),
            },
            cache,
        })
    }

    pub fn chrome(&self, viewer: Option<&UserRecord>) -> LayoutChrome {
        LayoutChrome {
            site_title: self.site.title.clone(),
            login_url: self.auth.login_url.clone(),
            media_base_url: self.site.media_base_url.clone(),
            viewer: viewer.map(ViewerView::from_user),
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    let feed_routes: Router<HttpState> = Router::new().route("/", get(public::index));
    let feed_routes = match state.cache.clone() {
        Some(cache_state) => {
            feed_routes.layer(from_fn_with_state(cache_state, response_cache_layer))
        }
        None => feed_routes,
    };

    let form_routes: Router<HttpState> = Router::new()
        .route("/create/", get(posts::create_form).post(posts::create_post))
        .route(
            "/posts/{id}/edit/",
            get(posts::edit_form).post(posts::update_post),
        )
        .layer(DefaultBodyLimit::max(
            state.site.max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES),
        ));

    Router::new()
        .merge(feed_routes)
        .merge(form_routes)
        .route("/group/{slug}/", get(public::group_posts))
        .route("/profile/{username}/", get(public::profile))
        .route("/profile/{username}/follow/", post(follows::follow))
        .route("/profile/{username}/unfollow/", post(follows::unfollow))
        .route("/posts/{id}/", get(public::post_detail))
        .route("/posts/{id}/comment/", post(posts::add_comment))
        .route("/follow/", get(public::follow_index))
        .fallback(public::not_found)
        .layer(from_fn_with_state(state.auth.clone(), trace_requests))
        .with_state(state)
}
