//! Identity handed over by the authenticating reverse proxy.
//!
//! The proxy puts the signed-in username in a trusted header. Users are
//! provisioned on first sight so that posts and follows can reference them.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderName, Uri, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use url::form_urlencoded;

use crate::application::error::HttpError;
use crate::domain::entities::UserRecord;
use crate::presentation::views::render_error_response;

use super::HttpState;

/// The signed-in user, if any.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<UserRecord>);

impl Viewer {
    pub fn user(&self) -> Option<&UserRecord> {
        self.0.as_ref()
    }
}

/// A signed-in user; anonymous requests are sent to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

impl FromRequestParts<HttpState> for Viewer {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(viewer) = parts.extensions.get::<Viewer>() {
            return Ok(viewer.clone());
        }

        let viewer = match header_username(&parts.headers, &state.auth.user_header) {
            Some(username) => match state.users.ensure_user(username).await {
                Ok(user) => Viewer(Some(user)),
                Err(err) => return Err(render_error_response(state.chrome(None), err.into())),
            },
            None => Viewer(None),
        };

        parts.extensions.insert(viewer.clone());
        Ok(viewer)
    }
}

impl FromRequestParts<HttpState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        match Viewer::from_request_parts(parts, state).await? {
            Viewer(Some(user)) => Ok(CurrentUser(user)),
            Viewer(None) => Err(login_redirect(&state.auth.login_url, &parts.uri)),
        }
    }
}

pub(super) fn header_username<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Redirect to `login_url`, asking it to come back to `uri` afterwards.
pub fn login_redirect(login_url: &str, uri: &Uri) -> Response {
    let target = uri
        .path_and_query()
        .map(|value| value.as_str())
        .unwrap_or("/");
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", target)
        .finish();
    Redirect::to(&format!("{login_url}?{query}")).into_response()
}

/// Shorthand used by handlers that already know the viewer.
pub(super) fn error_page(state: &HttpState, viewer: Option<&UserRecord>, error: HttpError) -> Response {
    render_error_response(state.chrome(viewer), error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode, header::LOCATION};

    #[test]
    fn login_redirect_keeps_return_path() {
        let uri: Uri = "/posts/3/edit/".parse().expect("uri");
        let response = login_redirect("/auth/login/", &uri);

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION),
            Some(&HeaderValue::from_static(
                "/auth/login/?next=%2Fposts%2F3%2Fedit%2F"
            ))
        );
    }

    #[test]
    fn blank_header_is_anonymous() {
        let name = HeaderName::from_static("x-remote-user");
        let mut headers = HeaderMap::new();
        headers.insert(name.clone(), HeaderValue::from_static("   "));
        assert_eq!(header_username(&headers, &name), None);

        headers.insert(name.clone(), HeaderValue::from_static(" leo "));
        assert_eq!(header_username(&headers, &name), Some("leo"));
    }
}
