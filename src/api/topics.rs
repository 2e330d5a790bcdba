//! Topic pages and form endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tera::Context;
use validator::Validate;

use super::{take_flash, with_flash};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{Topic, TopicForm, TopicOrder, TopicRecord, User};
use crate::policy;
use crate::views::{self, time_ago, Flash, Pager, TopicListEntry};
use crate::AppState;

/// Window and size of the "active users" sidebar.
const ACTIVE_USER_DAYS: i64 = 7;
const ACTIVE_USER_LIMIT: i64 = 6;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub order: Option<String>,
    pub page: Option<u32>,
}

/// Form values echoed back into the create/edit template.
#[derive(Debug, Serialize)]
struct FormValues<'a> {
    title: &'a str,
    body: &'a str,
    category_id: Option<i64>,
}

impl<'a> From<&'a TopicForm> for FormValues<'a> {
    fn from(form: &'a TopicForm) -> Self {
        Self {
            title: &form.title,
            body: &form.body,
            category_id: form.category(),
        }
    }
}

/// GET / - Send visitors to the topic list.
pub async fn root() -> Redirect {
    Redirect::to("/topics")
}

/// GET /topics - Paginated topic list.
pub async fn list_topics(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let order = TopicOrder::from_param(query.order.as_deref());
    let page = query.page.unwrap_or(1).max(1);

    let topics = state
        .repo
        .paginate_topics(order, page, state.config.topics_per_page)
        .await?;
    let active_users = state
        .repo
        .active_users(Utc::now() - Duration::days(ACTIVE_USER_DAYS), ACTIVE_USER_LIMIT)
        .await?;
    let links = state.links.get_all(&state.repo).await?;

    let now = Utc::now();
    let entries: Vec<TopicListEntry> = topics
        .items
        .iter()
        .map(|topic| TopicListEntry::new(topic, now))
        .collect();

    let (jar, flash) = take_flash(jar);
    let mut context = Context::new();
    context.insert("flash", &flash);
    context.insert("topics", &entries);
    context.insert("pager", &Pager::new(&topics, order.as_str()));
    context.insert("order", order.as_str());
    context.insert("active_users", &active_users);
    context.insert("links", &links);

    let html = views::render(&state.templates, "topics/index.html", &context)?;
    Ok((jar, html).into_response())
}

/// GET /topics/{id} - Topic detail.
pub async fn show_topic(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    show(state, id, None, jar).await
}

/// GET /topics/{id}/{slug} - Topic detail; stale slugs redirect permanently.
pub async fn show_topic_with_slug(
    State(state): State<AppState>,
    Path((id, slug)): Path<(i64, String)>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    show(state, id, Some(slug), jar).await
}

async fn show(
    state: AppState,
    id: i64,
    slug: Option<String>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let topic = find_topic(&state, id).await?;

    if let Some(requested) = slug {
        if !topic.slug.is_empty() && topic.slug != requested {
            return Ok(permanent_redirect(&topic.link()));
        }
    }

    let author = state
        .repo
        .get_user(topic.user_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Author of topic {} is missing", id)))?;
    let category = state
        .repo
        .get_category(topic.category_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Category of topic {} is missing", id)))?;

    let (jar, flash) = take_flash(jar);
    let mut context = Context::new();
    context.insert("flash", &flash);
    context.insert("topic", &topic);
    context.insert("author", &author);
    context.insert("category", &category);
    context.insert("created_ago", &time_ago(&topic.created_at, Utc::now()));

    let html = views::render(&state.templates, "topics/show.html", &context)?;
    Ok((jar, html).into_response())
}

/// GET /topics/create - Empty topic form.
pub async fn create_topic_form(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> Result<Response, AppError> {
    render_form(&state, &TopicForm::default(), None, &[], StatusCode::OK).await
}

/// POST /topics - Create a topic authored by the current user.
pub async fn store_topic(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
    Form(form): Form<TopicForm>,
) -> Result<Response, AppError> {
    let (errors, category_id) = check_form(&state, &form).await?;
    let Some(category_id) = category_id.filter(|_| errors.is_empty()) else {
        return render_form(&state, &form, None, &errors, StatusCode::UNPROCESSABLE_ENTITY).await;
    };

    let topic = state
        .repo
        .create_topic(TopicRecord {
            title: form.title,
            body: form.body,
            category_id,
            user_id: user.id,
            ..Default::default()
        })
        .await?;

    tracing::info!("User {} created topic {} ({})", user.id, topic.id, topic.slug);

    let jar = with_flash(jar, Flash::TopicCreated);
    Ok((jar, Redirect::to(&topic.link())).into_response())
}

/// GET /topics/{id}/edit - Prefilled topic form.
pub async fn edit_topic_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let topic = find_topic(&state, id).await?;
    authorize(policy::can_update(&user, &topic), "update", &user, &topic)?;

    let form = TopicForm {
        title: topic.title.clone(),
        body: topic.body.clone(),
        category_id: Some(topic.category_id.to_string()),
    };
    render_form(&state, &form, Some(topic.id), &[], StatusCode::OK).await
}

/// PUT|PATCH|POST /topics/{id} - Save edits to a topic.
pub async fn update_topic(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    jar: CookieJar,
    Form(form): Form<TopicForm>,
) -> Result<Response, AppError> {
    let topic = find_topic(&state, id).await?;
    authorize(policy::can_update(&user, &topic), "update", &user, &topic)?;

    let (errors, category_id) = check_form(&state, &form).await?;
    let Some(category_id) = category_id.filter(|_| errors.is_empty()) else {
        return render_form(
            &state,
            &form,
            Some(topic.id),
            &errors,
            StatusCode::UNPROCESSABLE_ENTITY,
        )
        .await;
    };

    let topic = state
        .repo
        .update_topic(
            id,
            TopicRecord {
                title: form.title,
                body: form.body,
                category_id,
                user_id: topic.user_id,
                ..Default::default()
            },
        )
        .await?;

    tracing::info!("User {} updated topic {}", user.id, topic.id);

    let jar = with_flash(jar, Flash::TopicUpdated);
    Ok((jar, Redirect::to(&topic.link())).into_response())
}

/// DELETE /topics/{id} - Remove a topic.
pub async fn destroy_topic(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let topic = find_topic(&state, id).await?;
    authorize(policy::can_destroy(&user, &topic), "destroy", &user, &topic)?;

    state.repo.delete_topic(id).await?;
    tracing::info!("User {} deleted topic {}", user.id, id);

    let jar = with_flash(jar, Flash::TopicDeleted);
    Ok((jar, Redirect::to("/topics")).into_response())
}

async fn find_topic(state: &AppState, id: i64) -> Result<Topic, AppError> {
    state
        .repo
        .get_topic(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Topic {} not found", id)))
}

fn authorize(allowed: bool, action: &str, user: &User, topic: &Topic) -> Result<(), AppError> {
    if allowed {
        return Ok(());
    }
    tracing::warn!(
        "User {} denied {} on topic {} owned by {}",
        user.id,
        action,
        topic.id,
        topic.user_id
    );
    Err(AppError::Forbidden("This action is unauthorized.".to_string()))
}

/// Field errors in display order, and the category id when it names a real category.
async fn check_form(
    state: &AppState,
    form: &TopicForm,
) -> Result<(Vec<String>, Option<i64>), AppError> {
    let mut messages = Vec::new();

    if let Err(errors) = form.validate() {
        let fields = errors.field_errors();
        for field in ["title", "body", "category_id"] {
            for error in fields.get(field).into_iter().flat_map(|errs| errs.iter()) {
                messages.push(
                    error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field)),
                );
            }
        }
    }

    let mut category_id = None;
    if form.category_id.is_some() {
        let known = match form.category() {
            Some(id) => state.repo.get_category(id).await?,
            None => None,
        };
        match known {
            Some(category) => category_id = Some(category.id),
            None => messages.push("分类不存在。".to_string()),
        }
    }

    Ok((messages, category_id))
}

async fn render_form(
    state: &AppState,
    form: &TopicForm,
    topic_id: Option<i64>,
    errors: &[String],
    status: StatusCode,
) -> Result<Response, AppError> {
    let categories = state.repo.list_categories().await?;

    let mut context = Context::new();
    context.insert("flash", &None::<&str>);
    context.insert("form", &FormValues::from(form));
    context.insert("topic_id", &topic_id);
    context.insert("errors", errors);
    context.insert("categories", &categories);

    let html = views::render(&state.templates, "topics/create_and_edit.html", &context)?;
    Ok((status, html).into_response())
}

fn permanent_redirect(location: &str) -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location.to_string())]).into_response()
}
