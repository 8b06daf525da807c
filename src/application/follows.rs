//! Follow relationships between readers and authors.
//!
//! Both transitions are idempotent. A repeated follow hits the store's unique
//! constraint on `(user, author)`, which is reported as
//! [`FollowOutcome::AlreadyFollowing`] instead of an error; there is no
//! check-then-insert window.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::{debug, info};

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Unfollowed,
    NotFollowing,
}

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("users cannot follow themselves")]
    SelfFollowDenied,
    #[error("no user is named `{0}`")]
    UnknownAuthor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    pub async fn follow(
        &self,
        actor: &UserRecord,
        author_username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self.resolve_author(author_username).await?;
        if author.id == actor.id {
            return Err(FollowError::SelfFollowDenied);
        }

        match self.follows.create_follow(actor.id, author.id).await {
            Ok(_) => {
                counter!("yatube_follow_changes_total", "action" => "follow").increment(1);
                info!(
                    target = "yatube::application::follows",
                    user = %actor.username,
                    author = %author.username,
                    "follow created"
                );
                Ok(FollowOutcome::Followed)
            }
            Err(RepoError::Duplicate { constraint }) => {
                debug!(
                    target = "yatube::application::follows",
                    user = %actor.username,
                    author = %author.username,
                    constraint = %constraint,
                    "follow already present"
                );
                Ok(FollowOutcome::AlreadyFollowing)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn unfollow(
        &self,
        actor: &UserRecord,
        author_username: &str,
    ) -> Result<UnfollowOutcome, FollowError> {
        let author = self.resolve_author(author_username).await?;
        let removed = self.follows.delete_follow(actor.id, author.id).await?;
        if removed == 0 {
            Ok(UnfollowOutcome::NotFollowing)
        } else {
            counter!("yatube_follow_changes_total", "action" => "unfollow").increment(1);
            info!(
                target = "yatube::application::follows",
                user = %actor.username,
                author = %author.username,
                "follow removed"
            );
            Ok(UnfollowOutcome::Unfollowed)
        }
    }

    pub async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        if user_id == author_id {
            return Ok(false);
        }
        self.follows.is_following(user_id, author_id).await
    }

    pub async fn follower_count(&self, author_id: i64) -> Result<u64, RepoError> {
        self.follows.count_followers(author_id).await
    }

    async fn resolve_author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor(username.to_string()))
    }
}
