use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::debug;

use carshare_core::repository::PaymentRepository;
use carshare_core::{CoreError, CoreResult, NewPayment, Payment, PaymentId, PaymentStatus, RentalId};

pub struct StorePaymentRepository {
    pool: PgPool,
}

impl StorePaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    status: String,
    payment_type: String,
    rental_id: i64,
    session_id: String,
    session_url: String,
    amount: Decimal,
}

const PAYMENT_COLUMNS: &str = "id, status, payment_type, rental_id, session_id, session_url, amount";

impl TryFrom<PaymentRow> for Payment {
    type Error = CoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            status: row.status.parse()?,
            payment_type: row.payment_type.parse()?,
            rental_id: row.rental_id,
            session_id: row.session_id,
            session_url: row.session_url,
            amount: row.amount,
        })
    }
}

/// `idx_payments_live_rental` rejects a second live payment for a rental
fn insert_error(err: sqlx::Error, rental_id: RentalId) -> CoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => CoreError::Payment(format!(
            "Rental with ID: {} already has a payment session",
            rental_id
        )),
        _ => CoreError::storage(err),
    }
}

async fn insert_pending<'e, E>(executor: E, payment: &NewPayment) -> CoreResult<Payment>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let row = sqlx::query_as::<_, PaymentRow>(&format!(
        "INSERT INTO payments (status, payment_type, rental_id, session_id, session_url, amount) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
        PAYMENT_COLUMNS
    ))
    .bind(PaymentStatus::Pending.as_str())
    .bind(payment.payment_type.as_str())
    .bind(payment.rental_id)
    .bind(&payment.session_id)
    .bind(&payment.session_url)
    .bind(payment.amount)
    .fetch_one(executor)
    .await
    .map_err(|e| insert_error(e, payment.rental_id))?;

    Payment::try_from(row)
}

#[async_trait]
impl PaymentRepository for StorePaymentRepository {
    async fn save_payment(&self, payment: NewPayment) -> CoreResult<Payment> {
        insert_pending(&self.pool, &payment).await
    }

    async fn find_by_rental(&self, rental_id: RentalId) -> CoreResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE rental_id = $1 AND NOT deleted ORDER BY id DESC LIMIT 1",
            PAYMENT_COLUMNS
        ))
        .bind(rental_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_all_by_rentals(&self, rental_ids: &[RentalId]) -> CoreResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE rental_id = ANY($1) AND NOT deleted ORDER BY id",
            PAYMENT_COLUMNS
        ))
        .bind(rental_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn mark_paid(&self, id: PaymentId) -> CoreResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "UPDATE payments SET status = $2 \
             WHERE id = $1 AND status = $3 AND NOT deleted RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(id)
        .bind(PaymentStatus::Paid.as_str())
        .bind(PaymentStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        row.map(Payment::try_from).transpose()
    }

    async fn replace_pending(&self, old_id: PaymentId, payment: NewPayment) -> CoreResult<Payment> {
        let mut tx = self.pool.begin().await.map_err(CoreError::storage)?;

        let discarded = sqlx::query(
            "UPDATE payments SET deleted = TRUE WHERE id = $1 AND status = $2 AND NOT deleted",
        )
        .bind(old_id)
        .bind(PaymentStatus::Pending.as_str())
        .execute(&mut *tx)
        .await
        .map_err(CoreError::storage)?;

        if discarded.rows_affected() == 0 {
            return Err(CoreError::Payment(format!(
                "Payment with ID: {} is no longer pending",
                old_id
            )));
        }

        // dropping `tx` on error rolls the discard back
        let saved = insert_pending(&mut *tx, &payment).await?;
        tx.commit().await.map_err(CoreError::storage)?;

        debug!("Payment {} replaced by {} for rental {}", old_id, saved.id, saved.rental_id);
        Ok(saved)
    }
}
