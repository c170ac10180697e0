use sqlx::{Executor, Result, Sqlite};

use super::{ArtworkRecord, DescriptorRecord};

const DB_DIM_KEY: &str = "db_dim";

/// 获取所有艺术品
pub async fn get_artworks<'c, E>(executor: E) -> Result<Vec<ArtworkRecord>>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as::<_, ArtworkRecord>(
        r#"
        SELECT id, title, artist, year, museum, location, descriptions
        FROM artworks
        "#,
    )
    .fetch_all(executor)
    .await
}

/// 获取所有描述符，按 (artwork_id, descriptor_id) 排序
pub async fn get_descriptors<'c, E>(executor: E) -> Result<Vec<DescriptorRecord>>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as::<_, DescriptorRecord>(
        r#"
        SELECT artwork_id, descriptor_id, image_path, embedding
        FROM descriptors
        ORDER BY artwork_id ASC, descriptor_id ASC
        "#,
    )
    .fetch_all(executor)
    .await
}

/// 读取数据库记录的向量维度，值无法解析时视为未设置
pub async fn get_db_dim<'c, E>(executor: E) -> Result<Option<usize>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(DB_DIM_KEY)
        .fetch_optional(executor)
        .await?;

    Ok(value.and_then(|v| v.trim().parse().ok()))
}

/// 记录向量维度，已存在时不覆盖
pub async fn ensure_db_dim<'c, E>(executor: E, dim: usize) -> Result<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT (key) DO NOTHING
        "#,
    )
    .bind(DB_DIM_KEY)
    .bind(dim.to_string())
    .execute(executor)
    .await?;

    Ok(())
}

/// 插入或更新艺术品元数据
pub async fn upsert_artwork<'c, E>(executor: E, record: &ArtworkRecord) -> Result<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO artworks (id, title, artist, year, museum, location, descriptions, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT (id) DO UPDATE SET
            title = excluded.title,
            artist = excluded.artist,
            year = excluded.year,
            museum = excluded.museum,
            location = excluded.location,
            descriptions = excluded.descriptions,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&record.id)
    .bind(&record.title)
    .bind(&record.artist)
    .bind(&record.year)
    .bind(&record.museum)
    .bind(&record.location)
    .bind(record.descriptions.as_deref().unwrap_or("{}"))
    .execute(executor)
    .await?;

    Ok(())
}

/// 插入或更新描述符
pub async fn upsert_descriptor<'c, E>(executor: E, record: &DescriptorRecord) -> Result<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO descriptors (artwork_id, descriptor_id, image_path, embedding)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (artwork_id, descriptor_id) DO UPDATE SET
            image_path = excluded.image_path,
            embedding = excluded.embedding
        "#,
    )
    .bind(&record.artwork_id)
    .bind(&record.descriptor_id)
    .bind(&record.image_path)
    .bind(&record.embedding)
    .execute(executor)
    .await?;

    Ok(())
}
