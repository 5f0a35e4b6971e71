//! PostgreSQL repository implementations.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbConn, EntityTrait, FromQueryResult, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
    TransactionTrait,
};

use forum_core::domain::{
    ALL_CATEGORIES, Category, Comment, NewComment, NewPost, PostQuery, PostRecord, VoteValue,
};
use forum_core::error::RepoError;
use forum_core::ports::{CategoryRepository, CommentRepository, PostRepository};

use super::entity::{category, category_and_post, comment, post, post_vote, user};
use super::postgres_base::map_db_err;

#[derive(Debug, FromQueryResult)]
struct PostRow {
    id: i64,
    user_id: i64,
    username: String,
    title: String,
    data: String,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            username: row.username,
            title: row.title,
            data: row.data,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct CommentRow {
    id: i64,
    post_id: i64,
    user_id: i64,
    username: String,
    data: String,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            user_id: row.user_id,
            username: row.username,
            data: row.data,
        }
    }
}

/// Posts joined with their author's username.
fn post_rows() -> Select<post::Entity> {
    post::Entity::find()
        .select_only()
        .column(post::Column::Id)
        .column(post::Column::UserId)
        .column(post::Column::Title)
        .column(post::Column::Data)
        .column_as(user::Column::Username, "username")
        .join(JoinType::InnerJoin, post::Relation::User.def())
}

/// Posts the user voted on with the given polarity, bound as a parameter.
fn voted_by(user_id: i64, value: VoteValue) -> Select<post::Entity> {
    post_rows()
        .join(JoinType::InnerJoin, post::Relation::PostVote.def())
        .filter(post_vote::Column::UserId.eq(user_id))
        .filter(post_vote::Column::Vote.eq(value.code()))
}

/// PostgreSQL post repository.
pub struct PostgresPostRepository {
    db: DbConn,
}

impl PostgresPostRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let row = post_rows()
            .filter(post::Column::Id.eq(id))
            .into_model::<PostRow>()
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(row.map(Into::into))
    }

    async fn list(&self, query: &PostQuery) -> Result<Vec<PostRecord>, RepoError> {
        tracing::debug!(?query, "Listing posts");

        let select = match query {
            PostQuery::Category { name, page } => {
                let mut select = post_rows();
                if name != ALL_CATEGORIES {
                    select = select
                        .join(JoinType::InnerJoin, post::Relation::CategoryAndPost.def())
                        .join(JoinType::InnerJoin, category_and_post::Relation::Category.def())
                        .filter(category::Column::Name.eq(name.as_str()));
                }
                select.limit(page.limit).offset(page.offset)
            }
            PostQuery::Author(user_id) => post_rows().filter(post::Column::UserId.eq(*user_id)),
            PostQuery::VotedBy { user_id, value } => voted_by(*user_id, *value),
        };

        let rows = select
            .order_by_asc(post::Column::Id)
            .into_model::<PostRow>()
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn categories_of(&self, post_id: i64) -> Result<Vec<String>, RepoError> {
        let categories = category::Entity::find()
            .join(JoinType::InnerJoin, category::Relation::CategoryAndPost.def())
            .filter(category_and_post::Column::PostId.eq(post_id))
            .order_by_asc(category::Column::Name)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(categories.into_iter().map(|c| c.name).collect())
    }

    async fn create(&self, new_post: NewPost) -> Result<i64, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let created = post::ActiveModel {
            user_id: Set(new_post.author.user_id),
            title: Set(new_post.title),
            data: Set(new_post.data),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(map_db_err)?;

        for name in &new_post.categories {
            category::Entity::insert(category::ActiveModel {
                name: Set(name.clone()),
                description: Set(String::new()),
                ..Default::default()
            })
            .on_conflict(
                OnConflict::column(category::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
            .map_err(map_db_err)?;

            let category = category::Entity::find()
                .filter(category::Column::Name.eq(name.as_str()))
                .one(&txn)
                .await
                .map_err(map_db_err)?
                .ok_or(RepoError::NotFound)?;

            category_and_post::Entity::insert(category_and_post::ActiveModel {
                category_id: Set(category.id),
                post_id: Set(created.id),
            })
            .exec_without_returning(&txn)
            .await
            .map_err(map_db_err)?;
        }

        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(post_id = created.id, user_id = created.user_id, "Post created");
        Ok(created.id)
    }

    async fn delete(&self, post_id: i64, user_id: i64) -> Result<bool, RepoError> {
        let result = post::Entity::delete_many()
            .filter(post::Column::Id.eq(post_id))
            .filter(post::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.rows_affected > 0)
    }
}

/// PostgreSQL comment repository.
pub struct PostgresCommentRepository {
    db: DbConn,
}

impl PostgresCommentRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn create(&self, new_comment: NewComment) -> Result<i64, RepoError> {
        let exists = post::Entity::find_by_id(new_comment.post_id)
            .count(&self.db)
            .await
            .map_err(map_db_err)?;
        if exists == 0 {
            return Err(RepoError::NotFound);
        }

        let created = comment::ActiveModel {
            post_id: Set(new_comment.post_id),
            user_id: Set(new_comment.author.user_id),
            data: Set(new_comment.data),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(map_db_err)?;

        Ok(created.id)
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>, RepoError> {
        let rows = comment::Entity::find()
            .select_only()
            .column(comment::Column::Id)
            .column(comment::Column::PostId)
            .column(comment::Column::UserId)
            .column(comment::Column::Data)
            .column_as(user::Column::Username, "username")
            .join(JoinType::InnerJoin, comment::Relation::User.def())
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::Id)
            .into_model::<CommentRow>()
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_for_post(&self, post_id: i64) -> Result<u64, RepoError> {
        comment::Entity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }
}

/// PostgreSQL category repository.
pub struct PostgresCategoryRepository {
    db: DbConn,
}

impl PostgresCategoryRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn list_all(&self) -> Result<Vec<Category>, RepoError> {
        let categories = category::Entity::find()
            .order_by_asc(category::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(categories.into_iter().map(Into::into).collect())
    }
}
