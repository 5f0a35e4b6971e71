//! Vote entity for SeaORM.
//!
//! The composite primary key on `(user_id, post_id)` is what guarantees at
//! most one vote per user and post.

use sea_orm::entity::prelude::*;

use forum_core::RepoError;
use forum_core::domain::VoteValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "post_vote")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub post_id: i64,
    /// 1 like, 0 dislike.
    pub vote: i16,
}

impl Model {
    pub fn value(&self) -> Result<VoteValue, RepoError> {
        VoteValue::from_code(self.vote)
            .ok_or_else(|| RepoError::Query(format!("unexpected vote code {}", self.vote)))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Post,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
