use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::domain::entities::{CommentRecord, FollowRecord, GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates `{constraint}`")]
    Duplicate { constraint: String },
    #[error("record not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity violation: {message}")]
    Integrity { message: String },
    #[error("operation timed out")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Candidate set of posts for a feed, expressed in storage identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostQueryFilter {
    All,
    Group(i64),
    Author(i64),
    /// Posts whose author is followed by the given user.
    FollowedBy(i64),
}

/// Slice of an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone)]
pub struct CreateGroupParams {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author_id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    /// Exact, case-sensitive lookup.
    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<UserRecord>, RepoError>;

    /// Return the user with this username, creating the row on first sight.
    async fn ensure_user(&self, username: &str) -> Result<UserRecord, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError>;

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;

    async fn find_group_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError>;
}

#[async_trait]
pub trait GroupsWriteRepo: Send + Sync {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn count_posts(&self, filter: &PostQueryFilter) -> Result<u64, RepoError>;

    /// Posts matching `filter`, newest `pub_date` first with ties broken by
    /// descending id, restricted to `window`.
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        window: PageWindow,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_post_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// Returns `false` when no post had this id.
    async fn delete_post(&self, id: i64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments under a post, newest first.
    async fn list_comments_for_post(&self, post_id: i64)
    -> Result<Vec<CommentRecord>, RepoError>;

    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError>;

    /// Plain insert; an existing pair surfaces as [`RepoError::Duplicate`].
    async fn create_follow(&self, user_id: i64, author_id: i64)
    -> Result<FollowRecord, RepoError>;

    /// Returns the number of rows removed (zero or one).
    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<u64, RepoError>;

    async fn count_followers(&self, author_id: i64) -> Result<u64, RepoError>;
}

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An image written to the media store.
#[derive(Debug, Clone)]
pub struct StoredImage {
    /// Path relative to the media root, always using `/` separators.
    pub stored_path: String,
    pub checksum: String,
    pub size_bytes: u64,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Write a post image under a collision-free name.
    async fn store_post_image(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<StoredImage, ImageStoreError>;

    /// Remove a stored image. A file that is already gone counts as removed.
    async fn delete_image(&self, stored_path: &str) -> Result<(), ImageStoreError>;
}
