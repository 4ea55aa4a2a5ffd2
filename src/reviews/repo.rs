use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::reviews::repo_types::{Review, ReviewWithAuthor};

const REVIEW_COLUMNS: &str = "id, album_id, user_id, rating, comment, created_at, updated_at";

/// Keep the album's stored mean truthful after any review mutation.
pub async fn recompute_album_rating(
    tx: &mut Transaction<'_, Postgres>,
    album_id: Uuid,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE albums
        SET average_rating = COALESCE(
            (SELECT AVG(rating)::float8 FROM reviews WHERE album_id = $1), 0)
        WHERE id = $1
        "#,
    )
    .bind(album_id)
    .execute(&mut **tx)
    .await
    .context("recompute album rating")?;
    Ok(())
}

pub async fn create(
    db: &PgPool,
    album_id: Uuid,
    user_id: Uuid,
    rating: i16,
    comment: &str,
) -> anyhow::Result<Review> {
    let mut tx = db.begin().await.context("begin tx")?;
    let review = sqlx::query_as::<_, Review>(&format!(
        r#"
        INSERT INTO reviews (album_id, user_id, rating, comment)
        VALUES ($1, $2, $3, $4)
        RETURNING {REVIEW_COLUMNS}
        "#
    ))
    .bind(album_id)
    .bind(user_id)
    .bind(rating)
    .bind(comment)
    .fetch_one(&mut *tx)
    .await
    .context("insert review")?;
    recompute_album_rating(&mut tx, album_id).await?;
    tx.commit().await.context("commit tx")?;
    Ok(review)
}

pub async fn update(
    db: &PgPool,
    review_id: Uuid,
    rating: i16,
    comment: &str,
) -> anyhow::Result<Review> {
    let mut tx = db.begin().await.context("begin tx")?;
    let review = sqlx::query_as::<_, Review>(&format!(
        r#"
        UPDATE reviews
        SET rating = $2, comment = $3, updated_at = now()
        WHERE id = $1
        RETURNING {REVIEW_COLUMNS}
        "#
    ))
    .bind(review_id)
    .bind(rating)
    .bind(comment)
    .fetch_one(&mut *tx)
    .await
    .context("update review")?;
    recompute_album_rating(&mut tx, review.album_id).await?;
    tx.commit().await.context("commit tx")?;
    Ok(review)
}

pub async fn delete(db: &PgPool, review: &Review) -> anyhow::Result<()> {
    let mut tx = db.begin().await.context("begin tx")?;
    sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(review.id)
        .execute(&mut *tx)
        .await
        .context("delete review")?;
    recompute_album_rating(&mut tx, review.album_id).await?;
    tx.commit().await.context("commit tx")?;
    Ok(())
}

pub async fn find_by_id(db: &PgPool, review_id: Uuid) -> anyhow::Result<Option<Review>> {
    let review = sqlx::query_as::<_, Review>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
    ))
    .bind(review_id)
    .fetch_optional(db)
    .await?;
    Ok(review)
}

pub async fn list_by_album(db: &PgPool, album_id: Uuid) -> anyhow::Result<Vec<ReviewWithAuthor>> {
    let rows = sqlx::query_as::<_, ReviewWithAuthor>(
        r#"
        SELECT r.id, r.album_id, r.user_id, u.username, r.rating, r.comment,
               r.created_at, r.updated_at
        FROM reviews r
        JOIN users u ON u.id = r.user_id
        WHERE r.album_id = $1
        ORDER BY r.created_at DESC
        "#,
    )
    .bind(album_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Review>> {
    let rows = sqlx::query_as::<_, Review>(&format!(
        r#"
        SELECT {REVIEW_COLUMNS}
        FROM reviews
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
