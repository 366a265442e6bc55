use chrono::Duration;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use sha2::{Digest, Sha256};

/// Length of the plain-text token handed to clients
pub const TOKEN_LENGTH: usize = 40;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "api_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    #[sea_orm(unique)]
    pub token_hash: String,
    pub last_used_at: Option<DateTime>,
    pub expires_at: DateTime,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Tokens are stored as lowercase SHA-256 hex, never in plain text
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Store a new token for `user_id` and return its plain text
pub async fn issue<C: ConnectionTrait>(db: &C, user_id: i64, ttl: Duration) -> Result<String, DbErr> {
    Ok(issue_record(db, user_id, ttl).await?.0)
}

/// Like `issue`, also returning the stored row
pub async fn issue_record<C: ConnectionTrait>(db: &C, user_id: i64, ttl: Duration) -> Result<(String, Model), DbErr> {
    let token = generate_token();
    let now = super::now();
    let record = ActiveModel {
        user_id: Set(user_id),
        token_hash: Set(hash_token(&token)),
        last_used_at: Set(None),
        expires_at: Set(now + ttl),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok((token, record))
}
