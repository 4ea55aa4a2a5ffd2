use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::donations::repo_types::{Donation, Payment, STATUS_COMPLETED};

const DONATION_COLUMNS: &str = "id, donor_name, amount, status, pidx, transaction_id, created_at";
const PAYMENT_COLUMNS: &str =
    "id, donation_id, transaction_id, amount, status, payment_method, created_at";

impl Donation {
    pub async fn create(
        db: &PgPool,
        donor_name: Option<&str>,
        amount: i64,
    ) -> anyhow::Result<Donation> {
        let donation = sqlx::query_as::<_, Donation>(&format!(
            r#"
            INSERT INTO donations (donor_name, amount)
            VALUES ($1, $2)
            RETURNING {DONATION_COLUMNS}
            "#
        ))
        .bind(donor_name)
        .bind(amount)
        .fetch_one(db)
        .await?;
        Ok(donation)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Donation>> {
        let donation = sqlx::query_as::<_, Donation>(&format!(
            "SELECT {DONATION_COLUMNS} FROM donations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(donation)
    }

    pub async fn set_pidx(db: &PgPool, id: Uuid, pidx: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE donations SET pidx = $2 WHERE id = $1")
            .bind(id)
            .bind(pidx)
            .execute(db)
            .await?;
        Ok(())
    }
}

/// Mark the donation completed and record its payment in one transaction, so
/// a crash between the two cannot leave a completed donation without a
/// payment row.
pub async fn complete_donation(
    db: &PgPool,
    donation_id: Uuid,
    transaction_id: &str,
    amount: i64,
) -> anyhow::Result<Payment> {
    let mut tx = db.begin().await.context("begin tx")?;

    sqlx::query("UPDATE donations SET status = $2, transaction_id = $3 WHERE id = $1")
        .bind(donation_id)
        .bind(STATUS_COMPLETED)
        .bind(transaction_id)
        .execute(&mut *tx)
        .await
        .context("complete donation")?;

    let payment = sqlx::query_as::<_, Payment>(&format!(
        r#"
        INSERT INTO payments (donation_id, transaction_id, amount, status, payment_method)
        VALUES ($1, $2, $3, 'success', 'khalti')
        RETURNING {PAYMENT_COLUMNS}
        "#
    ))
    .bind(donation_id)
    .bind(transaction_id)
    .bind(amount)
    .fetch_one(&mut *tx)
    .await
    .context("insert payment")?;

    tx.commit().await.context("commit tx")?;
    Ok(payment)
}

pub async fn find_payment_by_donation(
    db: &PgPool,
    donation_id: Uuid,
) -> anyhow::Result<Option<Payment>> {
    let payment = sqlx::query_as::<_, Payment>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE donation_id = $1"
    ))
    .bind(donation_id)
    .fetch_optional(db)
    .await?;
    Ok(payment)
}
