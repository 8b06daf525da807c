use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use crate::application::pagination::{Page, PageNumber, Paginator};
use crate::application::repos::{GroupsRepo, PostQueryFilter, PostsRepo, RepoError, UsersRepo};
use crate::domain::entities::{GroupRecord, PostRecord, UserRecord};

/// Which posts a feed shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedFilter {
    All,
    Group(String),
    Author(String),
    /// Posts by authors the user with this id follows.
    Following(i64),
}

impl FeedFilter {
    /// Path of the first page; usernames and slugs are percent-encoded.
    pub fn base_path(&self) -> String {
        match self {
            FeedFilter::All => "/".to_string(),
            FeedFilter::Group(slug) => format!("/group/{}/", urlencoding::encode(slug)),
            FeedFilter::Author(username) => {
                format!("/profile/{}/", urlencoding::encode(username))
            }
            FeedFilter::Following(_) => "/follow/".to_string(),
        }
    }
}

/// The resolved subject of a feed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSubject {
    All,
    Group(GroupRecord),
    Author(UserRecord),
    Following,
}

#[derive(Debug, Clone)]
pub struct FeedPage {
    pub subject: FeedSubject,
    pub posts: Page<PostRecord>,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no group has slug `{0}`")]
    UnknownGroup(String),
    #[error("no user is named `{0}`")]
    UnknownAuthor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    paginator: Paginator,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        paginator: Paginator,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            paginator,
        }
    }

    /// Load one page of the feed. The page number is clamped into range.
    #[instrument(skip_all, fields(filter = ?filter, page = page.get()))]
    pub async fn page(&self, filter: &FeedFilter, page: PageNumber) -> Result<FeedPage, FeedError> {
        let (query, subject) = self.resolve(filter).await?;

        let total = self.posts.count_posts(&query).await?;
        let meta = self.paginator.locate(total, page);
        let items = if total == 0 {
            Vec::new()
        } else {
            self.posts.list_posts(&query, meta.window()).await?
        };

        Ok(FeedPage {
            subject,
            posts: Page { items, meta },
        })
    }

    async fn resolve(
        &self,
        filter: &FeedFilter,
    ) -> Result<(PostQueryFilter, FeedSubject), FeedError> {
        match filter {
            FeedFilter::All => Ok((PostQueryFilter::All, FeedSubject::All)),
            FeedFilter::Group(slug) => {
                let group = self
                    .groups
                    .find_group_by_slug(slug)
                    .await?
                    .ok_or_else(|| FeedError::UnknownGroup(slug.clone()))?;
                Ok((PostQueryFilter::Group(group.id), FeedSubject::Group(group)))
            }
            FeedFilter::Author(username) => {
                let author = self
                    .users
                    .find_user_by_username(username)
                    .await?
                    .ok_or_else(|| FeedError::UnknownAuthor(username.clone()))?;
                Ok((
                    PostQueryFilter::Author(author.id),
                    FeedSubject::Author(author),
                ))
            }
            FeedFilter::Following(user_id) => Ok((
                PostQueryFilter::FollowedBy(*user_id),
                FeedSubject::Following,
            )),
        }
    }
}
