//! PostgreSQL vote store.

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ColumnTrait, DatabaseTransaction, DbConn, EntityTrait, IsolationLevel, PaginatorTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
};

use forum_core::domain::{VoteKey, VoteValue};
use forum_core::error::RepoError;
use forum_core::ports::{VoteStore, VoteTransaction};

use super::entity::{post, post_vote};
use super::postgres_base::map_db_err;

/// Vote store backed by the `post_vote` table.
///
/// Each transaction runs at SERIALIZABLE isolation and reads the current row
/// with `FOR UPDATE`. Two concurrent first votes both see no row; one of them
/// fails on the primary key or with a serialization failure, which surfaces
/// as [`RepoError::Conflict`] and is retried by the engine.
pub struct PostgresVoteStore {
    db: DbConn,
}

impl PostgresVoteStore {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

fn by_key(key: VoteKey) -> SimpleExpr {
    post_vote::Column::UserId
        .eq(key.user_id)
        .and(post_vote::Column::PostId.eq(key.post_id))
}

#[async_trait]
impl VoteStore for PostgresVoteStore {
    async fn begin(&self) -> Result<Box<dyn VoteTransaction>, RepoError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await
            .map_err(map_db_err)?;

        Ok(Box::new(PostgresVoteTransaction { txn }))
    }

    async fn find(&self, key: VoteKey) -> Result<Option<VoteValue>, RepoError> {
        post_vote::Entity::find_by_id((key.user_id, key.post_id))
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .map(|row| row.value())
            .transpose()
    }

    async fn count(&self, post_id: i64, value: VoteValue) -> Result<u64, RepoError> {
        post_vote::Entity::find()
            .filter(post_vote::Column::PostId.eq(post_id))
            .filter(post_vote::Column::Vote.eq(value.code()))
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }
}

/// Rolled back on drop unless committed.
pub struct PostgresVoteTransaction {
    txn: DatabaseTransaction,
}

#[async_trait]
impl VoteTransaction for PostgresVoteTransaction {
    async fn post_exists(&mut self, post_id: i64) -> Result<bool, RepoError> {
        let found = post::Entity::find_by_id(post_id)
            .count(&self.txn)
            .await
            .map_err(map_db_err)?;

        Ok(found > 0)
    }

    async fn current(&mut self, key: VoteKey) -> Result<Option<VoteValue>, RepoError> {
        post_vote::Entity::find_by_id((key.user_id, key.post_id))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .map(|row| row.value())
            .transpose()
    }

    async fn insert(&mut self, key: VoteKey, value: VoteValue) -> Result<(), RepoError> {
        post_vote::Entity::insert(post_vote::ActiveModel {
            user_id: Set(key.user_id),
            post_id: Set(key.post_id),
            vote: Set(value.code()),
        })
        .exec_without_returning(&self.txn)
        .await
        .map_err(map_db_err)?;

        Ok(())
    }

    async fn update(&mut self, key: VoteKey, value: VoteValue) -> Result<(), RepoError> {
        let result = post_vote::Entity::update_many()
            .col_expr(post_vote::Column::Vote, Expr::value(value.code()))
            .filter(by_key(key))
            .exec(&self.txn)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::Conflict("vote row vanished before update".to_string()));
        }
        Ok(())
    }

    async fn delete(&mut self, key: VoteKey) -> Result<(), RepoError> {
        let result = post_vote::Entity::delete_many()
            .filter(by_key(key))
            .exec(&self.txn)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::Conflict("vote row vanished before delete".to_string()));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        self.txn.commit().await.map_err(map_db_err)
    }
}
