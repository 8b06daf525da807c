use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::application::forms::{
    CreateCommentInput, CreatePostInput, FormErrors, INVALID_GROUP_MESSAGE,
};
use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, ImageStore, ImageStoreError,
    PostQueryFilter, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post not found")]
    NotFound,
    #[error("only the author may change this post")]
    PermissionDenied,
    #[error("invalid submission: {0}")]
    Invalid(FormErrors),
    #[error(transparent)]
    Upload(#[from] ImageStoreError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Everything the post detail page shows.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    pub comments: Vec<CommentRecord>,
    pub author_post_count: u64,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    images: Arc<dyn ImageStore>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            posts,
            writer,
            groups,
            comments,
            images,
        }
    }

    /// Groups offered by the post form.
    pub async fn groups(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn detail(&self, id: i64) -> Result<PostDetail, PostError> {
        let post = self.find(id).await?;
        let comments = self.comments.list_comments_for_post(post.id).await?;
        let author_post_count = self
            .posts
            .count_posts(&PostQueryFilter::Author(post.author.id))
            .await?;

        Ok(PostDetail {
            post,
            comments,
            author_post_count,
        })
    }

    #[instrument(skip_all, fields(author = %author.username))]
    pub async fn create(
        &self,
        author: &UserRecord,
        input: CreatePostInput,
    ) -> Result<PostRecord, PostError> {
        self.validate(&input).await?;

        let image = self.store_image(&input).await?;
        let params = CreatePostParams {
            author_id: author.id,
            text: input.normalized_text(),
            group_id: input.group_id,
            image: image.clone(),
        };

        match self.writer.create_post(params).await {
            Ok(post) => {
                info!(post_id = post.id, "post created");
                Ok(post)
            }
            Err(err) => {
                self.discard_image(image.as_deref()).await;
                Err(err.into())
            }
        }
    }

    /// Load a post for editing; only its author gets it back.
    pub async fn editable(&self, actor: &UserRecord, id: i64) -> Result<PostRecord, PostError> {
        let post = self.find(id).await?;
        if post.author.id != actor.id {
            return Err(PostError::PermissionDenied);
        }
        Ok(post)
    }

    /// Replace text and group. The stored image is kept unless a new one is uploaded.
    #[instrument(skip_all, fields(actor = %actor.username, post_id = id))]
    pub async fn update(
        &self,
        actor: &UserRecord,
        id: i64,
        input: CreatePostInput,
    ) -> Result<PostRecord, PostError> {
        let existing = self.editable(actor, id).await?;
        self.validate(&input).await?;

        let image = match self.store_image(&input).await? {
            Some(path) => Some(path),
            None => existing.image.clone(),
        };
        let replaced = input.image.is_some();
        let params = UpdatePostParams {
            id: existing.id,
            text: input.normalized_text(),
            group_id: input.group_id,
            image: image.clone(),
        };

        match self.writer.update_post(params).await {
            Ok(post) => {
                if replaced {
                    self.discard_image(existing.image.as_deref()).await;
                }
                info!("post updated");
                Ok(post)
            }
            Err(err) => {
                if replaced {
                    self.discard_image(image.as_deref()).await;
                }
                Err(err.into())
            }
        }
    }

    pub async fn add_comment(
        &self,
        author: &UserRecord,
        post_id: i64,
        input: CreateCommentInput,
    ) -> Result<CommentRecord, PostError> {
        let post = self.find(post_id).await?;
        input.validate().map_err(PostError::Invalid)?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: author.id,
                text: input.normalized_text(),
            })
            .await?;
        info!(
            post_id = post.id,
            comment_id = comment.id,
            author = %author.username,
            "comment added"
        );
        Ok(comment)
    }

    async fn find(&self, id: i64) -> Result<PostRecord, PostError> {
        self.posts
            .find_post_by_id(id)
            .await?
            .ok_or(PostError::NotFound)
    }

    async fn validate(&self, input: &CreatePostInput) -> Result<(), PostError> {
        let mut errors = match input.validate() {
            Ok(()) => FormErrors::default(),
            Err(errors) => errors,
        };

        if let Some(group_id) = input.group_id
            && self.groups.find_group_by_id(group_id).await?.is_none()
        {
            errors.push("group", INVALID_GROUP_MESSAGE);
        }

        errors.into_result().map_err(PostError::Invalid)
    }

    async fn store_image(&self, input: &CreatePostInput) -> Result<Option<String>, PostError> {
        match input.image.as_ref() {
            Some(image) => {
                let stored = self
                    .images
                    .store_post_image(&image.file_name, image.bytes.clone())
                    .await?;
                info!(
                    path = %stored.stored_path,
                    size_bytes = stored.size_bytes,
                    checksum = %stored.checksum,
                    "post image stored"
                );
                Ok(Some(stored.stored_path))
            }
            None => Ok(None),
        }
    }

    async fn discard_image(&self, path: Option<&str>) {
        if let Some(path) = path
            && let Err(err) = self.images.delete_image(path).await
        {
            warn!(path, error = %err, "failed to remove post image");
        }
    }
}
