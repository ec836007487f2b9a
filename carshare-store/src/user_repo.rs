use async_trait::async_trait;
use sqlx::PgPool;

use carshare_core::repository::UserRepository;
use carshare_core::{CoreError, CoreResult, User, UserId};

pub struct StoreUserRepository {
    pool: PgPool,
}

impl StoreUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    first_name: String,
    last_name: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
        }
    }
}

#[async_trait]
impl UserRepository for StoreUserRepository {
    async fn find_user(&self, id: UserId) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, first_name, last_name FROM users WHERE id = $1 AND NOT deleted",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        Ok(row.map(User::from))
    }
}
