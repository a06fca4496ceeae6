use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use threadline_api::{Comment, CommentId, ListQuery, NewComment};

use crate::{
    db::PostgresDb,
    extractors::PgConn,
    service::{CommentService, ServiceConfig},
    Error,
};

/// Raw listing parameters, anything unparseable falls back to its default
#[derive(Debug, serde::Deserialize)]
pub struct ListParams {
    search: Option<String>,
    page: Option<String>,
    page_size: Option<String>,
    sort: Option<String>,
}

fn service(conn: &mut PgConn, config: ServiceConfig) -> CommentService<PostgresDb<'_>> {
    CommentService::new(
        PostgresDb {
            conn: &mut **conn,
            exists_policy: config.exists_policy,
        },
        config.query_timeout,
    )
}

pub async fn create_comment(
    State(config): State<ServiceConfig>,
    mut conn: PgConn,
    data: Result<Json<NewComment>, JsonRejection>,
) -> Result<(StatusCode, Json<CommentId>), Error> {
    let Json(data) = data.map_err(|err| {
        tracing::debug!(?err, "rejecting undecodable comment");
        Error::invalid_request("invalid request body")
    })?;
    let id = service(&mut conn, config).save_comment(data).await?;
    Ok((StatusCode::CREATED, Json(id)))
}

pub async fn fetch_tree(
    State(config): State<ServiceConfig>,
    mut conn: PgConn,
    Path(id): Path<String>,
) -> Result<Json<Vec<Comment>>, Error> {
    let id = id.parse::<CommentId>()?;
    Ok(Json(
        service(&mut conn, config).get_comments_by_parent(id).await?,
    ))
}

pub async fn list_comments(
    State(config): State<ServiceConfig>,
    mut conn: PgConn,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Comment>>, Error> {
    let q = ListQuery::sanitize(
        params.search.as_deref(),
        params.page.as_deref(),
        params.page_size.as_deref(),
        params.sort.as_deref(),
    );
    Ok(Json(service(&mut conn, config).get_comments(&q).await?))
}

pub async fn delete_comment(
    State(config): State<ServiceConfig>,
    mut conn: PgConn,
    Path(id): Path<String>,
) -> Result<(), Error> {
    let id = id.parse::<CommentId>()?;
    service(&mut conn, config).delete_comment(id).await
}
