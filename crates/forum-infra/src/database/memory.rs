//! In-memory forum store for tests and database-less runs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use forum_core::domain::{
    ALL_CATEGORIES, Category, Comment, NewComment, NewPost, PostQuery, PostRecord, VoteKey,
    VoteValue,
};
use forum_core::error::RepoError;
use forum_core::ports::{
    CategoryRepository, CommentRepository, PostRepository, VoteStore, VoteTransaction,
};

#[derive(Default)]
struct Tables {
    last_id: i64,
    usernames: HashMap<i64, String>,
    posts: BTreeMap<i64, StoredPost>,
    categories: BTreeMap<i64, Category>,
    post_categories: Vec<(i64, i64)>,
    comments: BTreeMap<i64, Comment>,
    votes: HashMap<VoteKey, VoteValue>,
}

struct StoredPost {
    user_id: i64,
    title: String,
    data: String,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn record(&self, id: i64, post: &StoredPost) -> PostRecord {
        PostRecord {
            id,
            user_id: post.user_id,
            username: self.username(post.user_id),
            title: post.title.clone(),
            data: post.data.clone(),
        }
    }

    fn username(&self, user_id: i64) -> String {
        self.usernames.get(&user_id).cloned().unwrap_or_default()
    }

    fn category_id(&mut self, name: &str) -> i64 {
        if let Some(existing) = self.categories.values().find(|c| c.name == name) {
            return existing.id;
        }
        let id = self.next_id();
        self.categories.insert(
            id,
            Category {
                id,
                name: name.to_string(),
                description: String::new(),
            },
        );
        id
    }

    fn in_category(&self, post_id: i64, name: &str) -> bool {
        self.post_categories.iter().any(|(p, c)| {
            *p == post_id && self.categories.get(c).is_some_and(|cat| cat.name == name)
        })
    }
}

/// Implements every forum port over process memory.
///
/// A vote transaction holds the table lock from `begin` until it is
/// committed or dropped, so vote read-then-write sequences are serialized.
/// Writes are buffered and only applied on commit.
#[derive(Clone, Default)]
pub struct InMemoryForumStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryForumStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a category, as the migration does for the real database.
    pub async fn add_category(&self, name: &str, description: &str) -> i64 {
        let mut tables = self.tables.lock().await;
        let id = tables.category_id(name);
        if let Some(category) = tables.categories.get_mut(&id) {
            category.description = description.to_string();
        }
        id
    }

    /// Number of stored vote rows.
    pub async fn vote_rows(&self) -> usize {
        self.tables.lock().await.votes.len()
    }
}

#[async_trait]
impl PostRepository for InMemoryForumStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.posts.get(&id).map(|post| tables.record(id, post)))
    }

    async fn list(&self, query: &PostQuery) -> Result<Vec<PostRecord>, RepoError> {
        let tables = self.tables.lock().await;
        let matching = tables.posts.iter().filter(|(id, post)| match query {
            PostQuery::Category { name, .. } => {
                name == ALL_CATEGORIES || tables.in_category(**id, name)
            }
            PostQuery::Author(user_id) => post.user_id == *user_id,
            PostQuery::VotedBy { user_id, value } => {
                tables.votes.get(&VoteKey::new(*user_id, **id)) == Some(value)
            }
        });

        let records = matching.map(|(id, post)| tables.record(*id, post));
        Ok(match query {
            PostQuery::Category { page, .. } => records
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .collect(),
            _ => records.collect(),
        })
    }

    async fn categories_of(&self, post_id: i64) -> Result<Vec<String>, RepoError> {
        let tables = self.tables.lock().await;
        let mut names: Vec<String> = tables
            .post_categories
            .iter()
            .filter(|(p, _)| *p == post_id)
            .filter_map(|(_, c)| tables.categories.get(c).map(|cat| cat.name.clone()))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn create(&self, post: NewPost) -> Result<i64, RepoError> {
        let mut tables = self.tables.lock().await;
        tables
            .usernames
            .insert(post.author.user_id, post.author.username.clone());

        let id = tables.next_id();
        tables.posts.insert(
            id,
            StoredPost {
                user_id: post.author.user_id,
                title: post.title,
                data: post.data,
            },
        );
        for name in &post.categories {
            let category_id = tables.category_id(name);
            tables.post_categories.push((id, category_id));
        }

        Ok(id)
    }

    async fn delete(&self, post_id: i64, user_id: i64) -> Result<bool, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables.posts.get(&post_id).is_none_or(|p| p.user_id != user_id) {
            return Ok(false);
        }

        tables.posts.remove(&post_id);
        tables.post_categories.retain(|(p, _)| *p != post_id);
        tables.comments.retain(|_, c| c.post_id != post_id);
        tables.votes.retain(|k, _| k.post_id != post_id);
        Ok(true)
    }
}

#[async_trait]
impl CommentRepository for InMemoryForumStore {
    async fn create(&self, comment: NewComment) -> Result<i64, RepoError> {
        let mut tables = self.tables.lock().await;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(RepoError::NotFound);
        }
        tables
            .usernames
            .insert(comment.author.user_id, comment.author.username.clone());

        let id = tables.next_id();
        tables.comments.insert(
            id,
            Comment {
                id,
                post_id: comment.post_id,
                user_id: comment.author.user_id,
                username: comment.author.username,
                data: comment.data,
            },
        );
        Ok(id)
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn count_for_post(&self, post_id: i64) -> Result<u64, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.comments.values().filter(|c| c.post_id == post_id).count() as u64)
    }
}

#[async_trait]
impl CategoryRepository for InMemoryForumStore {
    async fn list_all(&self) -> Result<Vec<Category>, RepoError> {
        Ok(self.tables.lock().await.categories.values().cloned().collect())
    }
}

#[async_trait]
impl VoteStore for InMemoryForumStore {
    async fn begin(&self) -> Result<Box<dyn VoteTransaction>, RepoError> {
        let tables = self.tables.clone().lock_owned().await;
        Ok(Box::new(InMemoryVoteTransaction {
            tables,
            pending: HashMap::new(),
        }))
    }

    async fn find(&self, key: VoteKey) -> Result<Option<VoteValue>, RepoError> {
        Ok(self.tables.lock().await.votes.get(&key).copied())
    }

    async fn count(&self, post_id: i64, value: VoteValue) -> Result<u64, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .votes
            .iter()
            .filter(|(k, v)| k.post_id == post_id && **v == value)
            .count() as u64)
    }
}

struct InMemoryVoteTransaction {
    tables: OwnedMutexGuard<Tables>,
    /// `None` marks a deleted row.
    pending: HashMap<VoteKey, Option<VoteValue>>,
}

impl InMemoryVoteTransaction {
    fn visible(&self, key: &VoteKey) -> Option<VoteValue> {
        match self.pending.get(key) {
            Some(pending) => *pending,
            None => self.tables.votes.get(key).copied(),
        }
    }
}

#[async_trait]
impl VoteTransaction for InMemoryVoteTransaction {
    async fn post_exists(&mut self, post_id: i64) -> Result<bool, RepoError> {
        Ok(self.tables.posts.contains_key(&post_id))
    }

    async fn current(&mut self, key: VoteKey) -> Result<Option<VoteValue>, RepoError> {
        Ok(self.visible(&key))
    }

    async fn insert(&mut self, key: VoteKey, value: VoteValue) -> Result<(), RepoError> {
        if self.visible(&key).is_some() {
            return Err(RepoError::Conflict(format!(
                "vote ({}, {}) already exists",
                key.user_id, key.post_id
            )));
        }
        self.pending.insert(key, Some(value));
        Ok(())
    }

    async fn update(&mut self, key: VoteKey, value: VoteValue) -> Result<(), RepoError> {
        if self.visible(&key).is_none() {
            return Err(RepoError::Conflict("vote row vanished before update".to_string()));
        }
        self.pending.insert(key, Some(value));
        Ok(())
    }

    async fn delete(&mut self, key: VoteKey) -> Result<(), RepoError> {
        if self.visible(&key).is_none() {
            return Err(RepoError::Conflict("vote row vanished before delete".to_string()));
        }
        self.pending.insert(key, None);
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), RepoError> {
        let pending = std::mem::take(&mut self.pending);
        for (key, value) in pending {
            match value {
                Some(value) => self.tables.votes.insert(key, value),
                None => self.tables.votes.remove(&key),
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forum_core::domain::{AuthenticatedUser, Page, VoteOutcome};
    use forum_core::{PostAggregator, VoteEngine};

    fn author(id: i64) -> AuthenticatedUser {
        AuthenticatedUser::new(id, format!("user{id}"))
    }

    async fn store_with_post() -> (InMemoryForumStore, i64) {
        let store = InMemoryForumStore::new();
        let post_id = PostRepository::create(
            &store,
            NewPost::new(
                author(1),
                "Hello".to_string(),
                "World".to_string(),
                vec!["rust".to_string()],
            ),
        )
        .await
        .unwrap();
        (store, post_id)
    }

    #[tokio::test]
    async fn test_aggregate_counts_from_store() {
        let (store, post_id) = store_with_post().await;
        let store = Arc::new(store);
        let engine = VoteEngine::new(store.clone());

        for user in 2..=4 {
            engine
                .apply_vote(&author(user), post_id, VoteValue::Like)
                .await
                .unwrap();
        }
        engine
            .apply_vote(&author(5), post_id, VoteValue::Dislike)
            .await
            .unwrap();
        for text in ["first", "second"] {
            CommentRepository::create(
                store.as_ref(),
                NewComment {
                    author: author(6),
                    post_id,
                    data: text.to_string(),
                },
            )
            .await
            .unwrap();
        }

        let aggregator = PostAggregator::new(store.clone(), store.clone(), store.clone());
        let agg = aggregator.aggregate(post_id).await.unwrap();

        assert_eq!((agg.likes, agg.dislikes, agg.comments_count), (3, 1, 2));
        assert_eq!(agg.post.username, "user1");
        assert_eq!(agg.categories, vec!["rust"]);
        assert_eq!(agg.comments[0].username, "user6");
    }

    #[tokio::test]
    async fn test_concurrent_identical_votes_keep_one_slot() {
        let (store, post_id) = store_with_post().await;
        let store = Arc::new(store);
        let engine = Arc::new(VoteEngine::new(store.clone()));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine
                        .apply_vote(&author(7), post_id, VoteValue::Like)
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }

        // Three serialized toggles: created, retracted, created.
        let created = outcomes
            .iter()
            .filter(|o| **o == VoteOutcome::Created)
            .count();
        assert_eq!(created, 2);
        assert_eq!(store.vote_rows().await, 1);
        assert_eq!(
            store.find(VoteKey::new(7, post_id)).await.unwrap(),
            Some(VoteValue::Like)
        );
    }

    #[tokio::test]
    async fn test_dropped_transaction_writes_nothing() {
        let (store, post_id) = store_with_post().await;
        let key = VoteKey::new(3, post_id);

        {
            let mut txn = store.begin().await.unwrap();
            txn.insert(key, VoteValue::Like).await.unwrap();
        }

        assert_eq!(store.find(key).await.unwrap(), None);
        assert_eq!(store.vote_rows().await, 0);
    }

    #[tokio::test]
    async fn test_second_insert_is_rejected() {
        let (store, post_id) = store_with_post().await;
        let key = VoteKey::new(3, post_id);

        let mut txn = store.begin().await.unwrap();
        txn.insert(key, VoteValue::Like).await.unwrap();
        let err = txn.insert(key, VoteValue::Dislike).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_list_queries() {
        let (store, first) = store_with_post().await;
        let second = PostRepository::create(
            &store,
            NewPost::new(author(2), "Other".to_string(), "Post".to_string(), vec![]),
        )
        .await
        .unwrap();
        let engine = VoteEngine::new(Arc::new(store.clone()));
        engine
            .apply_vote(&author(9), first, VoteValue::Like)
            .await
            .unwrap();
        engine
            .apply_vote(&author(9), second, VoteValue::Dislike)
            .await
            .unwrap();

        let all = store
            .list(&PostQuery::Category {
                name: ALL_CATEGORIES.to_string(),
                page: Page::default(),
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let rust = store
            .list(&PostQuery::Category {
                name: "rust".to_string(),
                page: Page::default(),
            })
            .await
            .unwrap();
        assert_eq!(rust.len(), 1);
        assert_eq!(rust[0].id, first);

        let paged = store
            .list(&PostQuery::Category {
                name: ALL_CATEGORIES.to_string(),
                page: Page { limit: 1, offset: 1 },
            })
            .await
            .unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].id, second);

        let liked = store
            .list(&PostQuery::VotedBy {
                user_id: 9,
                value: VoteValue::Like,
            })
            .await
            .unwrap();
        assert_eq!(liked.iter().map(|p| p.id).collect::<Vec<_>>(), vec![first]);

        let disliked = store
            .list(&PostQuery::VotedBy {
                user_id: 9,
                value: VoteValue::Dislike,
            })
            .await
            .unwrap();
        assert_eq!(disliked.iter().map(|p| p.id).collect::<Vec<_>>(), vec![second]);

        let authored = store.list(&PostQuery::Author(2)).await.unwrap();
        assert_eq!(authored.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_requires_owner() {
        let (store, post_id) = store_with_post().await;

        assert!(!PostRepository::delete(&store, post_id, 2).await.unwrap());
        assert!(PostRepository::delete(&store, post_id, 1).await.unwrap());
        assert!(store.find_by_id(post_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_comment_on_missing_post() {
        let store = InMemoryForumStore::new();
        let err = CommentRepository::create(
            &store,
            NewComment {
                author: author(1),
                post_id: 42,
                data: "hi".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::NotFound));
    }

    #[tokio::test]
    async fn test_categories_are_shared() {
        let store = InMemoryForumStore::new();
        store.add_category("rust", "The Rust language").await;
        PostRepository::create(
            &store,
            NewPost::new(author(1), "t".to_string(), "d".to_string(), vec!["rust".to_string()]),
        )
        .await
        .unwrap();

        let categories = store.list_all().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].description, "The Rust language");
    }
}
