use anyhow::{anyhow, Context};
use serde_json::json;

use crate::CommentId;

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid comment id {0:?}")]
    InvalidCommentId(String),

    #[error("Invalid user id {0}")]
    InvalidUserId(i64),

    #[error("Comment text must not be empty")]
    EmptyText,

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Parent comment {0} not found")]
    ParentNotFound(CommentId),

    #[error("Comment {0} not found")]
    CommentNotFound(CommentId),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::InvalidCommentId(_) => StatusCode::BAD_REQUEST,
            Error::InvalidUserId(_) => StatusCode::BAD_REQUEST,
            Error::EmptyText => StatusCode::BAD_REQUEST,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
            Error::ParentNotFound(_) => StatusCode::NOT_FOUND,
            Error::CommentNotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::InvalidRequest(msg) => json!({
                "message": msg,
                "type": "invalid-request",
            }),
            Error::InvalidCommentId(id) => json!({
                "message": "invalid id, must be integer",
                "type": "invalid-comment-id",
                "id": id,
            }),
            Error::InvalidUserId(id) => json!({
                "message": "user id must be a positive integer",
                "type": "invalid-user-id",
                "id": id,
            }),
            Error::EmptyText => json!({
                "message": "comment text must not be empty",
                "type": "empty-text",
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
            Error::ParentNotFound(id) => json!({
                "message": "parent with such id not found",
                "type": "parent-not-found",
                "id": id,
            }),
            Error::CommentNotFound(id) => json!({
                "message": "comment with such id not found",
                "type": "comment-not-found",
                "id": id,
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let message = || {
            String::from(
                data.get("message")
                    .and_then(|msg| msg.as_str())
                    .unwrap_or(""),
            )
        };
        let comment_id = || {
            data.get("id")
                .and_then(|id| id.as_i64())
                .map(CommentId)
                .ok_or_else(|| anyhow!("error is about a comment but has no integer id"))
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(message()),
                "invalid-request" => Error::InvalidRequest(message()),
                "invalid-comment-id" => Error::InvalidCommentId(String::from(
                    data.get("id")
                        .and_then(|id| id.as_str())
                        .ok_or_else(|| anyhow!("error is an invalid id without the id"))?,
                )),
                "invalid-user-id" => Error::InvalidUserId(
                    data.get("id")
                        .and_then(|id| id.as_i64())
                        .ok_or_else(|| anyhow!("error is an invalid user id without the id"))?,
                ),
                "empty-text" => Error::EmptyText,
                "null-byte" => Error::NullByteInString(String::from(
                    data.get("string").and_then(|s| s.as_str()).ok_or_else(|| {
                        anyhow!("error is a null-byte-in-string without a string")
                    })?,
                )),
                "parent-not-found" => Error::ParentNotFound(comment_id()?),
                "comment-not-found" => Error::CommentNotFound(comment_id()?),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}
