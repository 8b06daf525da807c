#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use tempfile::TempDir;
use time::{Duration, OffsetDateTime, macros::datetime};
use tokio::sync::Mutex;
use tower::ServiceExt;

use yatube::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, FollowsRepo, GroupsRepo, ImageStore,
    PageWindow, PostQueryFilter, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
    UsersRepo,
};
use yatube::config::Settings;
use yatube::domain::entities::{
    AuthorRef, CommentRecord, FollowRecord, GroupRecord, GroupRef, PostRecord, UserRecord,
};
use yatube::infra::http::{AppRepositories, HttpState, build_router};
use yatube::infra::uploads::UploadStorage;

pub const USER_HEADER: &str = "x-remote-user";

/// Fixed starting point for seeded timestamps.
const EPOCH: OffsetDateTime = datetime!(2022-10-01 12:00 UTC);

#[derive(Debug, Clone)]
struct StoredPost {
    id: i64,
    text: String,
    pub_date: OffsetDateTime,
    author_id: i64,
    group_id: Option<i64>,
    image: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredComment {
    id: i64,
    post_id: Option<i64>,
    author_id: i64,
    text: String,
    created: OffsetDateTime,
}

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<StoredPost>,
    comments: Vec<StoredComment>,
    follows: Vec<FollowRecord>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn author(&self, id: i64) -> Result<AuthorRef, RepoError> {
        self.users
            .iter()
            .find(|user| user.id == id)
            .map(|user| AuthorRef {
                id: user.id,
                username: user.username.clone(),
            })
            .ok_or_else(|| RepoError::InvalidInput {
                message: format!("user {id} does not exist"),
            })
    }

    fn post_record(&self, post: &StoredPost) -> Result<PostRecord, RepoError> {
        let group = post.group_id.and_then(|id| {
            self.groups.iter().find(|g| g.id == id).map(|g| GroupRef {
                id: g.id,
                slug: g.slug.clone(),
                title: g.title.clone(),
            })
        });
        Ok(PostRecord {
            id: post.id,
            text: post.text.clone(),
            pub_date: post.pub_date,
            author: self.author(post.author_id)?,
            group,
            image: post.image.clone(),
        })
    }

    fn comment_record(&self, comment: &StoredComment) -> Result<CommentRecord, RepoError> {
        Ok(CommentRecord {
            id: comment.id,
            post_id: comment.post_id,
            author: self.author(comment.author_id)?,
            text: comment.text.clone(),
            created: comment.created,
        })
    }

    fn matches(&self, post: &StoredPost, filter: &PostQueryFilter) -> bool {
        match *filter {
            PostQueryFilter::All => true,
            PostQueryFilter::Group(id) => post.group_id == Some(id),
            PostQueryFilter::Author(id) => post.author_id == id,
            PostQueryFilter::FollowedBy(user_id) => self
                .follows
                .iter()
                .any(|f| f.user_id == user_id && f.author_id == post.author_id),
        }
    }

    fn ordered(&self, filter: &PostQueryFilter) -> Vec<&StoredPost> {
        let mut posts: Vec<&StoredPost> = self
            .posts
            .iter()
            .filter(|post| self.matches(post, filter))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        posts
    }
}

/// Repository double backed by plain vectors.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub async fn add_user(&self, username: &str) -> UserRecord {
        self.ensure_user(username).await.expect("user")
    }

    pub async fn add_group(&self, title: &str, slug: &str, description: &str) -> GroupRecord {
        let mut tables = self.tables.lock().await;
        let group = GroupRecord {
            id: tables.next_id(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: description.to_string(),
        };
        tables.groups.push(group.clone());
        group
    }

    /// Insert a post published `minutes` after a fixed epoch.
    pub async fn add_post_at(
        &self,
        author: &UserRecord,
        group: Option<&GroupRecord>,
        text: &str,
        minutes: i64,
    ) -> i64 {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        tables.posts.push(StoredPost {
            id,
            text: text.to_string(),
            pub_date: EPOCH + Duration::minutes(minutes),
            author_id: author.id,
            group_id: group.map(|g| g.id),
            image: None,
        });
        id
    }

    pub async fn add_follow(&self, user: &UserRecord, author: &UserRecord) {
        self.create_follow(user.id, author.id).await.expect("follow");
    }

    pub async fn follow_rows(&self, user_id: i64, author_id: i64) -> usize {
        let tables = self.tables.lock().await;
        tables
            .follows
            .iter()
            .filter(|f| f.user_id == user_id && f.author_id == author_id)
            .count()
    }

    pub async fn post(&self, id: i64) -> Option<PostRecord> {
        self.find_post_by_id(id).await.expect("lookup")
    }

    pub async fn post_count(&self) -> usize {
        self.tables.lock().await.posts.len()
    }

    pub async fn comments_for(&self, post_id: i64) -> Vec<CommentRecord> {
        self.list_comments_for_post(post_id).await.expect("comments")
    }

    pub async fn orphaned_comments(&self) -> usize {
        let tables = self.tables.lock().await;
        tables.comments.iter().filter(|c| c.post_id.is_none()).count()
    }
}

#[async_trait]
impl UsersRepo for InMemoryStore {
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn ensure_user(&self, username: &str) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if let Some(user) = tables.users.iter().find(|u| u.username == username) {
            return Ok(user.clone());
        }
        let user = UserRecord {
            id: tables.next_id(),
            username: username.to_string(),
            created_at: EPOCH,
        };
        tables.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl GroupsRepo for InMemoryStore {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups = self.tables.lock().await.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.groups.iter().find(|g| g.slug == slug).cloned())
    }

    async fn find_group_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.groups.iter().find(|g| g.id == id).cloned())
    }
}

#[async_trait]
impl PostsRepo for InMemoryStore {
    async fn count_posts(&self, filter: &PostQueryFilter) -> Result<u64, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.ordered(filter).len() as u64)
    }

    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        window: PageWindow,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let tables = self.tables.lock().await;
        tables
            .ordered(filter)
            .into_iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .map(|post| tables.post_record(post))
            .collect()
    }

    async fn find_post_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let tables = self.tables.lock().await;
        tables
            .posts
            .iter()
            .find(|p| p.id == id)
            .map(|post| tables.post_record(post))
            .transpose()
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        let latest = tables.posts.iter().map(|p| p.pub_date).max().unwrap_or(EPOCH);
        let post = StoredPost {
            id,
            text: params.text,
            pub_date: latest + Duration::minutes(1),
            author_id: params.author_id,
            group_id: params.group_id,
            image: params.image,
        };
        tables.posts.push(post.clone());
        tables.post_record(&post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let post = tables
            .posts
            .iter_mut()
            .find(|p| p.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        post.image = params.image;
        let post = post.clone();
        tables.post_record(&post)
    }

    async fn delete_post(&self, id: i64) -> Result<bool, RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.posts.len();
        tables.posts.retain(|p| p.id != id);
        let removed = tables.posts.len() != before;
        for comment in tables.comments.iter_mut() {
            if comment.post_id == Some(id) {
                comment.post_id = None;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl CommentsRepo for InMemoryStore {
    async fn list_comments_for_post(
        &self,
        post_id: i64,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        let tables = self.tables.lock().await;
        let mut comments: Vec<&StoredComment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == Some(post_id))
            .collect();
        comments.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        comments
            .into_iter()
            .map(|comment| tables.comment_record(comment))
            .collect()
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let comment = StoredComment {
            id: tables.next_id(),
            post_id: Some(params.post_id),
            author_id: params.author_id,
            text: params.text,
            created: EPOCH,
        };
        tables.comments.push(comment.clone());
        tables.comment_record(&comment)
    }
}

#[async_trait]
impl FollowsRepo for InMemoryStore {
    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }

    async fn create_follow(
        &self,
        user_id: i64,
        author_id: i64,
    ) -> Result<FollowRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if user_id == author_id {
            return Err(RepoError::Integrity {
                message: "follows_prevent_self_follow".to_string(),
            });
        }
        if tables
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id)
        {
            return Err(RepoError::Duplicate {
                constraint: "unique_follows".to_string(),
            });
        }
        let follow = FollowRecord {
            id: tables.next_id(),
            user_id,
            author_id,
            created: EPOCH,
        };
        tables.follows.push(follow.clone());
        Ok(follow)
    }

    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<u64, RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|f| !(f.user_id == user_id && f.author_id == author_id));
        Ok((before - tables.follows.len()) as u64)
    }

    async fn count_followers(&self, author_id: i64) -> Result<u64, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.follows.iter().filter(|f| f.author_id == author_id).count() as u64)
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    /// Number of post cards rendered on the page.
    pub fn post_cards(&self) -> usize {
        self.text().matches("class=\"post-card\"").count()
    }
}

pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub state: HttpState,
    pub media: TempDir,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(|_| {})
    }

    pub fn with_settings(configure: impl FnOnce(&mut Settings)) -> Self {
        Self::build(configure, None)
    }

    /// Swap the filesystem image store for another implementation.
    pub fn with_images(images: Arc<dyn ImageStore>) -> Self {
        Self::build(|_| {}, Some(images))
    }

    fn build(
        configure: impl FnOnce(&mut Settings),
        images: Option<Arc<dyn ImageStore>>,
    ) -> Self {
        let media = tempfile::tempdir().expect("media dir");
        let mut settings = Settings::defaults().expect("default settings");
        settings.media.root = media.path().to_path_buf();
        configure(&mut settings);

        let images: Arc<dyn ImageStore> = match images {
            Some(images) => images,
            None => Arc::new(UploadStorage::new(settings.media.root.clone()).expect("uploads")),
        };

        let store = Arc::new(InMemoryStore::default());
        let repos = AppRepositories {
            users: store.clone(),
            groups: store.clone(),
            posts: store.clone(),
            posts_writer: store.clone(),
            comments: store.clone(),
            follows: store.clone(),
            images,
        };
        let state = HttpState::new(repos, &settings).expect("http state");
        let router = build_router(state.clone());

        Self {
            store,
            state,
            media,
            router,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let (parts, body) = response.into_parts();
        let body = body.collect().await.expect("body").to_bytes();
        TestResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    pub async fn get(&self, path: &str, user: Option<&str>) -> TestResponse {
        let mut request = Request::builder().method(Method::GET).uri(path);
        if let Some(user) = user {
            request = request.header(USER_HEADER, user);
        }
        self.send(request.body(Body::empty()).expect("request"))
            .await
    }

    pub async fn post_form(&self, path: &str, user: Option<&str>, form: &str) -> TestResponse {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(user) = user {
            request = request.header(USER_HEADER, user);
        }
        self.send(request.body(Body::from(form.to_string())).expect("request"))
            .await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        user: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> TestResponse {
        const BOUNDARY: &str = "yatube-test-boundary";
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(USER_HEADER, user)
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }
}

/// Position of `needle` in `haystack`, for ordering assertions.
pub fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("`{needle}` not rendered"))
}
