use std::{
    collections::{BTreeMap, HashSet},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use threadline_api::{
    tokenize, Comment, CommentId, Db, Error, ExistsPolicy, ListQuery, NewComment, SortDirection,
    Time,
};

/// In-memory comment store
///
/// Search is whole-token and case-insensitive, without stemming nor stop
/// words, so it only agrees with postgres on texts that need neither.
#[derive(Debug)]
pub struct MockDb {
    comments: BTreeMap<CommentId, Comment>,
    last_id: i64,
    last_time: Option<Time>,
    exists_policy: ExistsPolicy,
    broken: bool,
    latency: Option<Duration>,
}

impl MockDb {
    pub fn new(exists_policy: ExistsPolicy) -> MockDb {
        MockDb {
            comments: BTreeMap::new(),
            last_id: 0,
            last_time: None,
            exists_policy,
            broken: false,
            latency: None,
        }
    }

    /// Makes every `Db` operation fail, as if the database went away
    pub fn set_broken(&mut self, broken: bool) {
        self.broken = broken;
    }

    /// Delays every `Db` operation by `latency`
    pub fn set_latency(&mut self, latency: Option<Duration>) {
        self.latency = latency;
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn insert(&mut self, c: &NewComment) -> CommentId {
        self.last_id += 1;
        let id = CommentId(self.last_id);
        // keep creation times strictly increasing, like a serial column would be
        let now = Utc::now();
        let created_at = match self.last_time {
            Some(last) if now <= last => last + chrono::Duration::microseconds(1),
            _ => now,
        };
        self.last_time = Some(created_at);
        self.comments.insert(
            id,
            Comment {
                id,
                parent_id: c.parent_id,
                user_id: c.user_id,
                text: c.text.clone(),
                created_at,
                deleted: false,
            },
        );
        id
    }

    pub fn exists(&self, id: CommentId) -> bool {
        self.comments
            .get(&id)
            .map(|c| self.exists_policy.counts(c.deleted))
            .unwrap_or(false)
    }

    /// Expands the tree one generation at a time
    pub fn subtree(&self, root: CommentId) -> Vec<Comment> {
        let mut res = match self.comments.get(&root) {
            None => return Vec::new(),
            Some(c) => vec![c.clone()],
        };
        let mut seen = HashSet::from([root]);
        let mut generation = vec![root];
        while !generation.is_empty() {
            let children = self
                .comments
                .values()
                .filter(|c| c.parent_id.map(|p| generation.contains(&p)).unwrap_or(false))
                .filter(|c| !seen.contains(&c.id))
                .cloned()
                .collect::<Vec<_>>();
            generation = children.iter().map(|c| c.id).collect();
            seen.extend(generation.iter().copied());
            res.extend(children);
        }
        res.sort_by_key(|c| (c.created_at, c.id));
        res
    }

    pub fn list(&self, q: &ListQuery) -> Vec<Comment> {
        let terms = q.search_terms();
        let mut res = self
            .comments
            .values()
            .filter(|c| {
                let words = tokenize(&c.text);
                terms.iter().all(|t| words.contains(t))
            })
            .cloned()
            .collect::<Vec<_>>();
        res.sort_by_key(|c| (c.created_at, c.id));
        if q.sort == SortDirection::Desc {
            res.reverse();
        }
        res.into_iter()
            .skip(usize::try_from(q.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(q.limit()).unwrap_or(usize::MAX))
            .collect()
    }

    pub fn mark_deleted(&mut self, id: CommentId) -> bool {
        match self.comments.get_mut(&id) {
            None => false,
            Some(c) => {
                c.deleted = true;
                true
            }
        }
    }

    async fn reach(&self) -> anyhow::Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        anyhow::ensure!(!self.broken, "mock database is unavailable");
        Ok(())
    }
}

#[async_trait]
impl Db for MockDb {
    async fn create_comment(&mut self, c: &NewComment) -> anyhow::Result<CommentId> {
        self.reach().await?;
        Ok(self.insert(c))
    }

    async fn comment_exists(&mut self, id: CommentId) -> anyhow::Result<bool> {
        self.reach().await?;
        Ok(self.exists(id))
    }

    async fn fetch_subtree(&mut self, root: CommentId) -> anyhow::Result<Vec<Comment>> {
        self.reach().await?;
        Ok(self.subtree(root))
    }

    async fn list_comments(&mut self, q: &ListQuery) -> anyhow::Result<Vec<Comment>> {
        self.reach().await?;
        Ok(self.list(q))
    }

    async fn delete_comment(&mut self, id: CommentId) -> anyhow::Result<bool> {
        self.reach().await?;
        Ok(self.mark_deleted(id))
    }
}

/// Reference model of the HTTP API, answering as the real server should
pub struct MockServer(MockDb);

impl MockServer {
    pub fn new(exists_policy: ExistsPolicy) -> MockServer {
        MockServer(MockDb::new(exists_policy))
    }

    /// Return the current number of comments
    pub fn test_num_comments(&self) -> usize {
        self.0.len()
    }

    /// Return the id of the comment created in position `idx`
    pub fn test_get_comment_id(&self, idx: usize) -> CommentId {
        *self
            .0
            .comments
            .keys()
            .nth(idx)
            .unwrap_or_else(|| panic!("getting comment {idx} among {}", self.0.len()))
    }

    pub fn save_comment(&mut self, c: NewComment) -> Result<CommentId, Error> {
        c.validate()?;
        if let Some(parent) = c.parent_id {
            if !self.0.exists(parent) {
                return Err(Error::ParentNotFound(parent));
            }
        }
        Ok(self.0.insert(&c))
    }

    pub fn fetch_tree(&self, id: CommentId) -> Result<Vec<Comment>, Error> {
        Ok(self.0.subtree(id))
    }

    pub fn list_comments(&self, q: &ListQuery) -> Result<Vec<Comment>, Error> {
        q.validate()?;
        Ok(self.0.list(q))
    }

    pub fn delete_comment(&mut self, id: CommentId) -> Result<(), Error> {
        match self.0.mark_deleted(id) {
            true => Ok(()),
            false => Err(Error::CommentNotFound(id)),
        }
    }
}
