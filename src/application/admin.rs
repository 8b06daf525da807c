//! Operator actions exposed through the command line.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{
    CreateGroupParams, GroupsRepo, GroupsWriteRepo, PostsWriteRepo, RepoError,
};
use crate::domain::entities::GroupRecord;
use crate::domain::posts::GROUP_TITLE_MAX_CHARS;
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug_async, validate_slug};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("group title must be between 1 and {GROUP_TITLE_MAX_CHARS} characters")]
    InvalidTitle,
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error("a group with slug `{0}` already exists")]
    SlugTaken(String),
    #[error("post {0} does not exist")]
    PostNotFound(i64),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<SlugAsyncError<RepoError>> for AdminError {
    fn from(err: SlugAsyncError<RepoError>) -> Self {
        match err {
            SlugAsyncError::Slug(err) => AdminError::Slug(err),
            SlugAsyncError::Predicate(err) => AdminError::Repo(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateGroupCommand {
    pub title: String,
    pub slug: Option<String>,
    pub description: String,
}

#[derive(Clone)]
pub struct AdminService {
    groups: Arc<dyn GroupsRepo>,
    groups_writer: Arc<dyn GroupsWriteRepo>,
    posts_writer: Arc<dyn PostsWriteRepo>,
}

impl AdminService {
    pub fn new(
        groups: Arc<dyn GroupsRepo>,
        groups_writer: Arc<dyn GroupsWriteRepo>,
        posts_writer: Arc<dyn PostsWriteRepo>,
    ) -> Self {
        Self {
            groups,
            groups_writer,
            posts_writer,
        }
    }

    pub async fn create_group(&self, command: CreateGroupCommand) -> Result<GroupRecord, AdminError> {
        let title = command.title.trim().to_string();
        let title_len = title.chars().count();
        if title_len == 0 || title_len > GROUP_TITLE_MAX_CHARS {
            return Err(AdminError::InvalidTitle);
        }

        let slug = match command.slug {
            Some(slug) => {
                let slug = slug.trim().to_string();
                validate_slug(&slug)?;
                if self.groups.find_group_by_slug(&slug).await?.is_some() {
                    return Err(AdminError::SlugTaken(slug));
                }
                slug
            }
            None => {
                let groups = self.groups.clone();
                generate_unique_slug_async(&title, move |candidate| {
                    let groups = groups.clone();
                    let candidate = candidate.to_string();
                    async move {
                        groups
                            .find_group_by_slug(&candidate)
                            .await
                            .map(|found| found.is_none())
                    }
                })
                .await?
            }
        };

        let group = self
            .groups_writer
            .create_group(CreateGroupParams {
                title,
                slug: slug.clone(),
                description: command.description.trim().to_string(),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AdminError::SlugTaken(slug),
                other => AdminError::Repo(other),
            })?;

        info!(group_id = group.id, slug = %group.slug, "group created");
        Ok(group)
    }

    /// Delete a post. Its comments remain, detached from any post.
    pub async fn delete_post(&self, id: i64) -> Result<(), AdminError> {
        if !self.posts_writer.delete_post(id).await? {
            return Err(AdminError::PostNotFound(id));
        }
        info!(post_id = id, "post deleted");
        Ok(())
    }
}
