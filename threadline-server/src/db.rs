use anyhow::Context;
use async_trait::async_trait;
use futures::TryStreamExt;
use threadline_api::{
    Comment, CommentId, Db, ExistsPolicy, ListQuery, NewComment, Time, UserId,
};

/// Must match the configuration the `document` column is generated with
pub const TEXT_SEARCH_CONFIG: &str = "english";

const COMMENT_FIELDS: &str = "id, parent_id, user_id, text, created_at, deleted";

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    parent_id: Option<i64>,
    user_id: i64,
    text: String,
    created_at: Time,
    deleted: bool,
}

impl From<CommentRow> for Comment {
    fn from(r: CommentRow) -> Comment {
        Comment {
            id: CommentId(r.id),
            parent_id: r.parent_id.map(CommentId),
            user_id: UserId(r.user_id),
            text: r.text,
            created_at: r.created_at,
            deleted: r.deleted,
        }
    }
}

pub struct PostgresDb<'a> {
    pub conn: &'a mut sqlx::PgConnection,
    pub exists_policy: ExistsPolicy,
}

#[async_trait]
impl<'a> Db for PostgresDb<'a> {
    async fn create_comment(&mut self, c: &NewComment) -> anyhow::Result<CommentId> {
        let id = sqlx::query_scalar::<_, i64>(
            "
                INSERT INTO comments (text, parent_id, user_id)
                VALUES ($1, $2, $3)
                RETURNING id
            ",
        )
        .bind(&c.text)
        .bind(c.parent_id.map(|p| p.0))
        .bind(c.user_id.0)
        .fetch_one(&mut *self.conn)
        .await
        .with_context(|| format!("inserting comment {c:?}"))?;
        Ok(CommentId(id))
    }

    async fn comment_exists(&mut self, id: CommentId) -> anyhow::Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM comments WHERE id = $1 AND ($2 OR NOT deleted))",
        )
        .bind(id.0)
        .bind(self.exists_policy == ExistsPolicy::Structural)
        .fetch_one(&mut *self.conn)
        .await
        .with_context(|| format!("checking whether comment {id} exists"))
    }

    async fn fetch_subtree(&mut self, root: CommentId) -> anyhow::Result<Vec<Comment>> {
        // UNION rather than UNION ALL stops the recursion even on a cyclic table
        let query = format!(
            "
                WITH RECURSIVE tree AS (
                    SELECT {COMMENT_FIELDS}
                        FROM comments
                    WHERE id = $1
                    UNION
                    SELECT c.id, c.parent_id, c.user_id, c.text, c.created_at, c.deleted
                        FROM comments c
                    INNER JOIN tree t
                        ON c.parent_id = t.id
                )
                SELECT {COMMENT_FIELDS}
                    FROM tree
                ORDER BY created_at, id
            "
        );
        sqlx::query_as::<_, CommentRow>(&query)
            .bind(root.0)
            .fetch(&mut *self.conn)
            .map_ok(Comment::from)
            .try_collect::<Vec<Comment>>()
            .await
            .with_context(|| format!("fetching comment tree rooted at {root}"))
    }

    async fn list_comments(&mut self, q: &ListQuery) -> anyhow::Result<Vec<Comment>> {
        let dir = q.sort.as_sql();
        let mut query = format!("SELECT {COMMENT_FIELDS} FROM comments");
        if !q.search.is_empty() {
            query.push_str(&format!(
                " WHERE document @@ plainto_tsquery('{TEXT_SEARCH_CONFIG}', $3)"
            ));
        }
        query.push_str(&format!(
            " ORDER BY created_at {dir}, id {dir} LIMIT $1 OFFSET $2"
        ));

        let mut sql = sqlx::query_as::<_, CommentRow>(&query)
            .bind(q.limit())
            .bind(q.offset());
        if !q.search.is_empty() {
            sql = sql.bind(&q.search);
        }
        sql.fetch(&mut *self.conn)
            .map_ok(Comment::from)
            .try_collect::<Vec<Comment>>()
            .await
            .with_context(|| format!("listing comments for {q:?}"))
    }

    async fn delete_comment(&mut self, id: CommentId) -> anyhow::Result<bool> {
        let res = sqlx::query("UPDATE comments SET deleted = TRUE WHERE id = $1")
            .bind(id.0)
            .execute(&mut *self.conn)
            .await
            .with_context(|| format!("marking comment {id} as deleted"))?;
        match res.rows_affected() {
            0 => Ok(false),
            1 => Ok(true),
            n => Err(anyhow::anyhow!(
                "deleting comment {id} affected {n} rows"
            )),
        }
    }
}
