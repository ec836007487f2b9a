use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use carshare_core::repository::CarRepository;
use carshare_core::{Car, CarId, CoreError, CoreResult};

pub struct StoreCarRepository {
    pool: PgPool,
}

impl StoreCarRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CarRow {
    pub(crate) id: i64,
    pub(crate) model: String,
    pub(crate) brand: String,
    pub(crate) car_type: String,
    pub(crate) inventory: i32,
    pub(crate) daily_fee: Decimal,
}

pub(crate) const CAR_COLUMNS: &str = "id, model, brand, car_type, inventory, daily_fee";

impl TryFrom<CarRow> for Car {
    type Error = CoreError;

    fn try_from(row: CarRow) -> Result<Self, Self::Error> {
        Ok(Car {
            id: row.id,
            model: row.model,
            brand: row.brand,
            car_type: row.car_type.parse()?,
            inventory: row.inventory,
            daily_fee: row.daily_fee,
        })
    }
}

#[async_trait]
impl CarRepository for StoreCarRepository {
    async fn find_car(&self, id: CarId) -> CoreResult<Option<Car>> {
        let row = sqlx::query_as::<_, CarRow>(&format!(
            "SELECT {} FROM cars WHERE id = $1 AND NOT deleted",
            CAR_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        row.map(Car::try_from).transpose()
    }
}
