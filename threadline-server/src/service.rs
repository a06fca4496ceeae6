use std::{future::Future, time::Duration};

use anyhow::{anyhow, Context};
use threadline_api::{Comment, CommentId, Db, ExistsPolicy, ListQuery, NewComment};

use crate::Error;

#[derive(Clone, Copy, Debug)]
pub struct ServiceConfig {
    /// Deadline for every single store operation
    pub query_timeout: Duration,
    pub exists_policy: ExistsPolicy,
}

pub struct CommentService<D> {
    db: D,
    query_timeout: Duration,
}

async fn with_deadline<T>(
    timeout: Duration,
    fut: impl Future<Output = anyhow::Result<T>>,
) -> anyhow::Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| anyhow!("store operation timed out after {timeout:?}"))?
}

impl<D: Db + Send> CommentService<D> {
    pub fn new(db: D, query_timeout: Duration) -> CommentService<D> {
        CommentService { db, query_timeout }
    }

    /// Stores a new comment, after checking that its parent exists
    ///
    /// The check and the insertion are not atomic: a parent deleted in
    /// between still gets the reply.
    pub async fn save_comment(&mut self, c: NewComment) -> Result<CommentId, Error> {
        c.validate()?;
        if let Some(parent) = c.parent_id {
            let exists = with_deadline(self.query_timeout, self.db.comment_exists(parent))
                .await
                .with_context(|| format!("checking parent of new comment {c:?}"))?;
            if !exists {
                return Err(Error::parent_not_found(parent));
            }
        }
        let id = with_deadline(self.query_timeout, self.db.create_comment(&c))
            .await
            .context("saving comment")?;
        tracing::debug!(?id, parent = ?c.parent_id, "created comment");
        Ok(id)
    }

    /// Returns `id` with all its replies, or nothing if there is no such comment
    pub async fn get_comments_by_parent(&mut self, id: CommentId) -> Result<Vec<Comment>, Error> {
        Ok(with_deadline(self.query_timeout, self.db.fetch_subtree(id))
            .await
            .with_context(|| format!("fetching comment tree of {id}"))?)
    }

    pub async fn get_comments(&mut self, q: &ListQuery) -> Result<Vec<Comment>, Error> {
        q.validate()?;
        Ok(with_deadline(self.query_timeout, self.db.list_comments(q))
            .await
            .context("listing comments")?)
    }

    pub async fn delete_comment(&mut self, id: CommentId) -> Result<(), Error> {
        match with_deadline(self.query_timeout, self.db.delete_comment(id)).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::comment_not_found(id)),
            Err(e) => Err(Error::Anyhow(
                e.context(format!("deleting comment {id}")),
            )),
        }
    }
}
