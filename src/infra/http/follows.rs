use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};

use crate::presentation::views::profile_href;

use super::{CurrentUser, HttpState, auth::error_page};

pub(super) async fn follow(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Response {
    match state.follows.follow(&user, &username).await {
        Ok(_) => Redirect::to(&profile_href(&username)).into_response(),
        Err(err) => error_page(&state, Some(&user), err.into()),
    }
}

pub(super) async fn unfollow(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Response {
    match state.follows.unfollow(&user, &username).await {
        Ok(_) => Redirect::to(&profile_href(&username)).into_response(),
        Err(err) => error_page(&state, Some(&user), err.into()),
    }
}
