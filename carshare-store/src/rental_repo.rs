use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use carshare_core::repository::RentalRepository;
use carshare_core::search::{RentalCondition, RentalFilter};
use carshare_core::{Car, CarId, CoreError, CoreResult, NewRental, Rental, RentalId, UserId};

use crate::car_repo::{CarRow, CAR_COLUMNS};

pub struct StoreRentalRepository {
    pool: PgPool,
}

impl StoreRentalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RentalRow {
    id: i64,
    rental_date: NaiveDate,
    return_date: NaiveDate,
    actual_return_date: Option<NaiveDate>,
    user_id: i64,
    car_id: i64,
}

const RENTAL_COLUMNS: &str = "id, rental_date, return_date, actual_return_date, user_id, car_id";

impl From<RentalRow> for Rental {
    fn from(row: RentalRow) -> Self {
        Rental {
            id: row.id,
            rental_date: row.rental_date,
            return_date: row.return_date,
            actual_return_date: row.actual_return_date,
            user_id: row.user_id,
            car_id: row.car_id,
        }
    }
}

/// One `AND` clause per condition; an unrestricted filter selects every live rental
fn search_query(filter: &RentalFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM rentals WHERE NOT deleted",
        RENTAL_COLUMNS
    ));

    for condition in filter.conditions() {
        match condition {
            RentalCondition::UserIdIn(ids) => {
                query.push(" AND user_id = ANY(");
                query.push_bind(ids.clone());
                query.push(")");
            }
            RentalCondition::Active => {
                query.push(" AND actual_return_date IS NULL");
            }
            RentalCondition::Returned => {
                query.push(" AND actual_return_date IS NOT NULL");
            }
        }
    }
    query.push(" ORDER BY id");
    query
}

#[async_trait]
impl RentalRepository for StoreRentalRepository {
    async fn create_rental(&self, rental: NewRental) -> CoreResult<(Rental, Car)> {
        let mut tx = self.pool.begin().await.map_err(CoreError::storage)?;

        // Row lock serialises concurrent bookings of the same car
        let locked = sqlx::query_as::<_, CarRow>(&format!(
            "SELECT {} FROM cars WHERE id = $1 AND NOT deleted FOR UPDATE",
            CAR_COLUMNS
        ))
        .bind(rental.car_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(CoreError::storage)?
        .ok_or_else(|| {
            CoreError::EntityNotFound(format!("Can't find car with id: {}", rental.car_id))
        })?;

        if locked.inventory < 1 {
            return Err(CoreError::no_available_cars(rental.car_id));
        }

        let car = sqlx::query_as::<_, CarRow>(&format!(
            "UPDATE cars SET inventory = inventory - 1 WHERE id = $1 RETURNING {}",
            CAR_COLUMNS
        ))
        .bind(rental.car_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(CoreError::storage)?;

        let row = sqlx::query_as::<_, RentalRow>(&format!(
            "INSERT INTO rentals (rental_date, return_date, user_id, car_id) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            RENTAL_COLUMNS
        ))
        .bind(rental.rental_date)
        .bind(rental.return_date)
        .bind(rental.user_id)
        .bind(rental.car_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(CoreError::storage)?;

        tx.commit().await.map_err(CoreError::storage)?;

        debug!("Rental {} created, car {} inventory now {}", row.id, car.id, car.inventory);
        Ok((Rental::from(row), Car::try_from(car)?))
    }

    async fn close_rental(&self, id: RentalId, actual_return_date: NaiveDate) -> CoreResult<Rental> {
        let mut tx = self.pool.begin().await.map_err(CoreError::storage)?;

        let row = sqlx::query_as::<_, RentalRow>(&format!(
            "UPDATE rentals SET actual_return_date = $2 \
             WHERE id = $1 AND actual_return_date IS NULL AND NOT deleted RETURNING {}",
            RENTAL_COLUMNS
        ))
        .bind(id)
        .bind(actual_return_date)
        .fetch_optional(&mut *tx)
        .await
        .map_err(CoreError::storage)?
        .ok_or_else(|| CoreError::RentalReturn("Rental cannot be returned twice".to_string()))?;

        sqlx::query("UPDATE cars SET inventory = inventory + 1 WHERE id = $1")
            .bind(row.car_id)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::storage)?;

        tx.commit().await.map_err(CoreError::storage)?;

        Ok(Rental::from(row))
    }

    async fn find_rental(&self, id: RentalId) -> CoreResult<Option<Rental>> {
        let row = sqlx::query_as::<_, RentalRow>(&format!(
            "SELECT {} FROM rentals WHERE id = $1 AND NOT deleted",
            RENTAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        Ok(row.map(Rental::from))
    }

    async fn find_by_user_and_car(&self, user_id: UserId, car_id: CarId) -> CoreResult<Option<Rental>> {
        let row = sqlx::query_as::<_, RentalRow>(&format!(
            "SELECT {} FROM rentals \
             WHERE user_id = $1 AND car_id = $2 AND NOT deleted \
             ORDER BY (actual_return_date IS NULL) DESC, id DESC LIMIT 1",
            RENTAL_COLUMNS
        ))
        .bind(user_id)
        .bind(car_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        Ok(row.map(Rental::from))
    }

    async fn find_all_by_user(&self, user_id: UserId) -> CoreResult<Vec<Rental>> {
        let rows = sqlx::query_as::<_, RentalRow>(&format!(
            "SELECT {} FROM rentals WHERE user_id = $1 AND NOT deleted ORDER BY id",
            RENTAL_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        Ok(rows.into_iter().map(Rental::from).collect())
    }

    async fn search(&self, filter: &RentalFilter) -> CoreResult<Vec<Rental>> {
        let mut query = search_query(filter);
        let rows = query
            .build_query_as::<RentalRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(CoreError::storage)?;

        Ok(rows.into_iter().map(Rental::from).collect())
    }

    async fn find_overdue(&self, today: NaiveDate) -> CoreResult<Vec<Rental>> {
        let rows = sqlx::query_as::<_, RentalRow>(&format!(
            "SELECT {} FROM rentals \
             WHERE actual_return_date IS NULL AND return_date <= $1 AND NOT deleted \
             ORDER BY return_date, id",
            RENTAL_COLUMNS
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        Ok(rows.into_iter().map(Rental::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carshare_core::search::RentalSearchParameters;

    fn sql_for(user_ids: Vec<UserId>, is_active: Option<bool>) -> String {
        let filter = RentalFilter::build(&RentalSearchParameters { user_ids, is_active });
        search_query(&filter).sql().to_string()
    }

    #[test]
    fn test_unrestricted_search_sql() {
        assert_eq!(
            sql_for(vec![], None),
            "SELECT id, rental_date, return_date, actual_return_date, user_id, car_id \
             FROM rentals WHERE NOT deleted ORDER BY id"
        );
    }

    #[test]
    fn test_search_sql_per_filter_shape() {
        assert!(sql_for(vec![1, 2], None)
            .ends_with("WHERE NOT deleted AND user_id = ANY($1) ORDER BY id"));
        assert!(sql_for(vec![], Some(true))
            .ends_with("WHERE NOT deleted AND actual_return_date IS NULL ORDER BY id"));
        assert!(sql_for(vec![], Some(false))
            .ends_with("WHERE NOT deleted AND actual_return_date IS NOT NULL ORDER BY id"));
        assert!(sql_for(vec![4], Some(true)).ends_with(
            "WHERE NOT deleted AND user_id = ANY($1) AND actual_return_date IS NULL ORDER BY id"
        ));
    }
}
