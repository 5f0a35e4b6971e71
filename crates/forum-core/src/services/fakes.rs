//! Minimal in-process port implementations for service tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::{Comment, NewComment, NewPost, PostQuery, PostRecord, VoteKey, VoteValue};
use crate::error::RepoError;
use crate::ports::{CommentRepository, PostRepository, VoteStore, VoteTransaction};

#[derive(Default)]
struct VoteTable {
    posts: HashSet<i64>,
    votes: HashMap<VoteKey, VoteValue>,
    race: Option<(VoteKey, VoteValue)>,
    failing_commits: u32,
    commit_attempts: u32,
}

#[derive(Default)]
pub struct FakeVoteStore {
    state: Arc<Mutex<VoteTable>>,
}

impl FakeVoteStore {
    pub fn with_posts(posts: &[i64]) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().posts.extend(posts);
        store
    }

    pub fn seed(&self, key: VoteKey, value: VoteValue) {
        self.state.lock().unwrap().votes.insert(key, value);
    }

    /// The next insert loses a race against a committed row with this value.
    pub fn race_next_insert(&self, key: VoteKey, value: VoteValue) {
        self.state.lock().unwrap().race = Some((key, value));
    }

    pub fn fail_commits(&self, times: u32) {
        self.state.lock().unwrap().failing_commits = times;
    }

    pub fn commit_attempts(&self) -> u32 {
        self.state.lock().unwrap().commit_attempts
    }

    pub fn rows(&self) -> usize {
        self.state.lock().unwrap().votes.len()
    }
}

enum Write {
    Upsert(VoteKey, VoteValue),
    Delete(VoteKey),
}

struct FakeTransaction {
    state: Arc<Mutex<VoteTable>>,
    writes: Vec<Write>,
}

#[async_trait]
impl VoteStore for FakeVoteStore {
    async fn begin(&self) -> Result<Box<dyn VoteTransaction>, RepoError> {
        Ok(Box::new(FakeTransaction {
            state: self.state.clone(),
            writes: Vec::new(),
        }))
    }

    async fn find(&self, key: VoteKey) -> Result<Option<VoteValue>, RepoError> {
        Ok(self.state.lock().unwrap().votes.get(&key).copied())
    }

    async fn count(&self, post_id: i64, value: VoteValue) -> Result<u64, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .votes
            .iter()
            .filter(|(k, v)| k.post_id == post_id && **v == value)
            .count() as u64)
    }
}

#[async_trait]
impl VoteTransaction for FakeTransaction {
    async fn post_exists(&mut self, post_id: i64) -> Result<bool, RepoError> {
        Ok(self.state.lock().unwrap().posts.contains(&post_id))
    }

    async fn current(&mut self, key: VoteKey) -> Result<Option<VoteValue>, RepoError> {
        Ok(self.state.lock().unwrap().votes.get(&key).copied())
    }

    async fn insert(&mut self, key: VoteKey, value: VoteValue) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        if let Some((race_key, race_value)) = state.race.take() {
            state.votes.insert(race_key, race_value);
        }
        if state.votes.contains_key(&key) {
            return Err(RepoError::Conflict("duplicate vote".to_string()));
        }
        self.writes.push(Write::Upsert(key, value));
        Ok(())
    }

    async fn update(&mut self, key: VoteKey, value: VoteValue) -> Result<(), RepoError> {
        self.writes.push(Write::Upsert(key, value));
        Ok(())
    }

    async fn delete(&mut self, key: VoteKey) -> Result<(), RepoError> {
        self.writes.push(Write::Delete(key));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        state.commit_attempts += 1;
        if state.failing_commits > 0 {
            state.failing_commits -= 1;
            return Err(RepoError::Conflict("could not serialize access".to_string()));
        }
        for write in self.writes {
            match write {
                Write::Upsert(key, value) => {
                    state.votes.insert(key, value);
                }
                Write::Delete(key) => {
                    state.votes.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePostRepository {
    pub posts: Vec<PostRecord>,
    pub categories: HashMap<i64, Vec<String>>,
}

#[async_trait]
impl PostRepository for FakePostRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn list(&self, query: &PostQuery) -> Result<Vec<PostRecord>, RepoError> {
        Ok(match query {
            PostQuery::Author(user_id) => self
                .posts
                .iter()
                .filter(|p| p.user_id == *user_id)
                .cloned()
                .collect(),
            _ => self.posts.clone(),
        })
    }

    async fn categories_of(&self, post_id: i64) -> Result<Vec<String>, RepoError> {
        Ok(self.categories.get(&post_id).cloned().unwrap_or_default())
    }

    async fn create(&self, _post: NewPost) -> Result<i64, RepoError> {
        Err(RepoError::Query("read-only fake".to_string()))
    }

    async fn delete(&self, _post_id: i64, _user_id: i64) -> Result<bool, RepoError> {
        Ok(false)
    }
}

#[derive(Default)]
pub struct FakeCommentRepository {
    pub comments: Vec<Comment>,
}

#[async_trait]
impl CommentRepository for FakeCommentRepository {
    async fn create(&self, _comment: NewComment) -> Result<i64, RepoError> {
        Err(RepoError::Query("read-only fake".to_string()))
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>, RepoError> {
        Ok(self
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn count_for_post(&self, post_id: i64) -> Result<u64, RepoError> {
        Ok(self.comments.iter().filter(|c| c.post_id == post_id).count() as u64)
    }
}
