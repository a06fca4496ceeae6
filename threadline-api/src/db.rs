use async_trait::async_trait;

use crate::{Comment, CommentId, ListQuery, NewComment};

/// Persistence primitives for comments
///
/// Implementations never enforce business rules: the parent of a new comment
/// is checked by the caller through `comment_exists` before `create_comment`.
#[async_trait]
pub trait Db {
    async fn create_comment(&mut self, c: &NewComment) -> anyhow::Result<CommentId>;

    /// Existence is subject to the implementation's `ExistsPolicy`
    async fn comment_exists(&mut self, id: CommentId) -> anyhow::Result<bool>;

    /// Returns `root` and all its transitive replies, oldest first, or nothing
    /// if `root` does not exist
    async fn fetch_subtree(&mut self, root: CommentId) -> anyhow::Result<Vec<Comment>>;

    async fn list_comments(&mut self, q: &ListQuery) -> anyhow::Result<Vec<Comment>>;

    /// Marks the comment as deleted, returning false if there is no such comment
    async fn delete_comment(&mut self, id: CommentId) -> anyhow::Result<bool>;
}

#[async_trait]
impl<T: Db + Send + ?Sized> Db for &mut T {
    async fn create_comment(&mut self, c: &NewComment) -> anyhow::Result<CommentId> {
        (**self).create_comment(c).await
    }

    async fn comment_exists(&mut self, id: CommentId) -> anyhow::Result<bool> {
        (**self).comment_exists(id).await
    }

    async fn fetch_subtree(&mut self, root: CommentId) -> anyhow::Result<Vec<Comment>> {
        (**self).fetch_subtree(root).await
    }

    async fn list_comments(&mut self, q: &ListQuery) -> anyhow::Result<Vec<Comment>> {
        (**self).list_comments(q).await
    }

    async fn delete_comment(&mut self, id: CommentId) -> anyhow::Result<bool> {
        (**self).delete_comment(id).await
    }
}
