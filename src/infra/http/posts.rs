use axum::{
    Form,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Redirect, Response},
};
use bytes::Bytes;
use serde::Deserialize;

use crate::{
    application::{
        error::HttpError,
        forms::{CreateCommentInput, CreatePostInput, FormErrors, ImageUpload, parse_group_choice},
        posts::PostError,
    },
    domain::entities::{GroupRecord, PostRecord, UserRecord},
    presentation::views::{
        CommentFormView, LayoutContext, PostFormTemplate, PostFormView, post_href, profile_href,
        render_not_found_response, render_template_response,
    },
};

use super::{CurrentUser, HttpState, auth::error_page, public::render_post_detail};

const SOURCE: &str = "infra::http::posts";

/// Raw post form fields as submitted, before validation.
#[derive(Debug, Default)]
struct PostSubmission {
    text: String,
    group: String,
    image: Option<ImageUpload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PostFields {
    text: String,
    group: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentFields {
    text: String,
}

pub(super) async fn create_form(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
) -> Response {
    match state.posts.groups().await {
        Ok(groups) => render_form(&state, &user, PostFormView::create(&groups), StatusCode::OK),
        Err(err) => error_page(&state, Some(&user), err.into()),
    }
}

pub(super) async fn create_post(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    request: Request,
) -> Response {
    let submission = match read_submission(request, &state).await {
        Ok(submission) => submission,
        Err(err) => return error_page(&state, Some(&user), err),
    };

    let (input, errors) = into_input(submission);
    let result = match errors {
        Some(errors) => Err(PostError::Invalid(errors)),
        None => state.posts.create(&user, input.clone()).await,
    };

    match result {
        Ok(post) => Redirect::to(&profile_href(&post.author.username)).into_response(),
        Err(PostError::Invalid(errors)) => {
            let groups = match state.posts.groups().await {
                Ok(groups) => groups,
                Err(err) => return error_page(&state, Some(&user), err.into()),
            };
            let form = PostFormView::create(&groups).with_submission(
                input.text,
                input.group_id,
                &groups,
                &errors,
            );
            render_form(&state, &user, form, StatusCode::OK)
        }
        Err(err) => error_page(&state, Some(&user), err.into()),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Response {
    let Ok(id) = id.parse::<i64>() else {
        return render_not_found_response(state.chrome(Some(&user)));
    };

    let (post, groups) = match load_editable(&state, &user, id).await {
        Ok(found) => found,
        Err(err) => return error_page(&state, Some(&user), err),
    };
    let form = PostFormView::edit(&post, &groups, &state.site.media_base_url);
    render_form(&state, &user, form, StatusCode::OK)
}

pub(super) async fn update_post(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    request: Request,
) -> Response {
    let Ok(id) = id.parse::<i64>() else {
        return render_not_found_response(state.chrome(Some(&user)));
    };

    let submission = match read_submission(request, &state).await {
        Ok(submission) => submission,
        Err(err) => return error_page(&state, Some(&user), err),
    };

    let (input, errors) = into_input(submission);
    let result = match errors {
        Some(errors) => match state.posts.editable(&user, id).await {
            Ok(_) => Err(PostError::Invalid(errors)),
            Err(err) => Err(err),
        },
        None => state.posts.update(&user, id, input.clone()).await,
    };

    match result {
        Ok(post) => Redirect::to(&post_href(post.id)).into_response(),
        Err(PostError::Invalid(errors)) => {
            let (post, groups) = match load_editable(&state, &user, id).await {
                Ok(found) => found,
                Err(err) => return error_page(&state, Some(&user), err),
            };
            let form = PostFormView::edit(&post, &groups, &state.site.media_base_url)
                .with_submission(input.text, input.group_id, &groups, &errors);
            render_form(&state, &user, form, StatusCode::OK)
        }
        Err(err) => error_page(&state, Some(&user), err.into()),
    }
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Form(fields): Form<CommentFields>,
) -> Response {
    let Ok(id) = id.parse::<i64>() else {
        return render_not_found_response(state.chrome(Some(&user)));
    };

    let input = CreateCommentInput { text: fields.text };
    match state.posts.add_comment(&user, id, input.clone()).await {
        Ok(_) => Redirect::to(&post_href(id)).into_response(),
        Err(PostError::Invalid(errors)) => match state.posts.detail(id).await {
            Ok(detail) => {
                let form = CommentFormView::with_errors(id, input.text, &errors);
                render_post_detail(&state, Some(&user), detail, Some(form), StatusCode::OK)
            }
            Err(err) => error_page(&state, Some(&user), err.into()),
        },
        Err(err) => error_page(&state, Some(&user), err.into()),
    }
}

fn render_form(
    state: &HttpState,
    user: &UserRecord,
    form: PostFormView,
    status: StatusCode,
) -> Response {
    let title = form.title();
    let view = LayoutContext::new(state.chrome(Some(user)), title, form);
    render_template_response(PostFormTemplate { view }, status)
}

async fn load_editable(
    state: &HttpState,
    user: &UserRecord,
    id: i64,
) -> Result<(PostRecord, Vec<GroupRecord>), HttpError> {
    let post = state.posts.editable(user, id).await?;
    let groups = state.posts.groups().await?;
    Ok((post, groups))
}

/// Split a submission into the typed input plus any errors found while parsing it.
fn into_input(submission: PostSubmission) -> (CreatePostInput, Option<FormErrors>) {
    let PostSubmission { text, group, image } = submission;
    match parse_group_choice(&group) {
        Ok(group_id) => (
            CreatePostInput {
                text,
                group_id,
                image,
            },
            None,
        ),
        Err(mut errors) => {
            let input = CreatePostInput {
                text,
                group_id: None,
                image,
            };
            if let Err(other) = input.validate() {
                errors.extend(other);
            }
            (input, Some(errors))
        }
    }
}

/// Accept both `multipart/form-data` and urlencoded post forms.
async fn read_submission(request: Request, state: &HttpState) -> Result<PostSubmission, HttpError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    if !is_multipart {
        let Form(fields) = Form::<PostFields>::from_request(request, state)
            .await
            .map_err(|rejection| {
                HttpError::new(
                    SOURCE,
                    StatusCode::BAD_REQUEST,
                    "Invalid form submission",
                    rejection.body_text(),
                )
            })?;
        return Ok(PostSubmission {
            text: fields.text,
            group: fields.group,
            image: None,
        });
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|rejection| {
            HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Invalid form submission",
                rejection.body_text(),
            )
        })?;

    let mut submission = PostSubmission::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("text") => submission.text = field.text().await.map_err(multipart_error)?,
            Some("group") => submission.group = field.text().await.map_err(multipart_error)?,
            Some("image") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes: Bytes = field.bytes().await.map_err(multipart_error)?;
                if !(file_name.is_empty() && bytes.is_empty()) {
                    submission.image = Some(ImageUpload { file_name, bytes });
                }
            }
            _ => {}
        }
    }

    Ok(submission)
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> HttpError {
    HttpError::new(
        SOURCE,
        err.status(),
        "Invalid form submission",
        err.body_text(),
    )
}
