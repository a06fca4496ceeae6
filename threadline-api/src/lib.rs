use std::{fmt, str::FromStr};

use bolero::generator::{bolero_generator, TypeGenerator};
use chrono::Utc;

mod db;
mod error;
mod query;

pub use db::Db;
pub use error::Error;
pub use query::{
    tokenize, ListQuery, SortDirection, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};

pub type Time = chrono::DateTime<Utc>;

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(transparent)]
pub struct CommentId(pub i64);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CommentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<CommentId, Error> {
        s.parse()
            .map(CommentId)
            .map_err(|_| Error::InvalidCommentId(String::from(s)))
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// A stored comment, as returned by tree and list queries
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,

    /// `None` for the root of a discussion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,

    pub user_id: UserId,
    pub text: String,
    pub created_at: Time,

    /// Soft-delete marker, deleted comments stay in their tree
    #[serde(default)]
    pub deleted: bool,
}

#[derive(
    Clone,
    Debug,
    Eq,
    PartialEq,
    TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
pub struct NewComment {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,

    pub user_id: UserId,
}

impl NewComment {
    pub fn new(user_id: UserId, parent_id: Option<CommentId>, text: String) -> NewComment {
        NewComment {
            text,
            parent_id,
            user_id,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.text.is_empty() {
            return Err(Error::EmptyText);
        }
        validate_string(&self.text)?;
        if self.user_id.0 <= 0 {
            return Err(Error::InvalidUserId(self.user_id.0));
        }
        Ok(())
    }
}

pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}

/// Whether a soft-deleted comment still counts as existing when it is named
/// as the parent of a new comment
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExistsPolicy {
    /// Any stored row exists, deleted or not
    #[default]
    Structural,

    /// Only rows that are not soft-deleted exist
    Visible,
}

impl ExistsPolicy {
    pub fn counts(&self, deleted: bool) -> bool {
        match self {
            ExistsPolicy::Structural => true,
            ExistsPolicy::Visible => !deleted,
        }
    }
}

impl FromStr for ExistsPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<ExistsPolicy> {
        match s.to_ascii_lowercase().as_str() {
            "structural" => Ok(ExistsPolicy::Structural),
            "visible" => Ok(ExistsPolicy::Visible),
            _ => Err(anyhow::anyhow!(
                "unknown exists policy {s:?}, expected \"structural\" or \"visible\""
            )),
        }
    }
}
