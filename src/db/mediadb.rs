use async_trait::async_trait;
use sqlx::Postgres;
use uuid::Uuid;

use super::db::DBClient;

use crate::{
    dtos::mediadtos::{ImageUploadDto, MediaUploadDto},
    models::mediamodel::{MediaFile, PropertyImage},
    service::file_store::StoredFile,
};

#[async_trait]
pub trait MediaExt {
    async fn save_media_file(
        &self,
        uploaded_by: Uuid,
        upload: &MediaUploadDto,
        stored: StoredFile,
    ) -> Result<MediaFile, sqlx::Error>;

    async fn get_media_files(&self, property_id: Uuid) -> Result<Vec<MediaFile>, sqlx::Error>;

    async fn deactivate_media_file(
        &self,
        media_id: Uuid,
        uploaded_by: Uuid,
    ) -> Result<bool, sqlx::Error>;

    async fn save_property_image(
        &self,
        uploaded_by: Uuid,
        upload: &ImageUploadDto,
        stored: StoredFile,
    ) -> Result<PropertyImage, sqlx::Error>;

    async fn get_property_images(&self, property_id: Uuid) -> Result<Vec<PropertyImage>, sqlx::Error>;

    async fn get_property_image(&self, image_id: Uuid) -> Result<Option<PropertyImage>, sqlx::Error>;

    async fn set_primary_image(&self, image: &PropertyImage) -> Result<PropertyImage, sqlx::Error>;
}

/// Locks the owning listing and clears every primary flag under it. Writers
/// for the same listing queue on the row lock.
async fn clear_primary(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    property_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT id FROM properties WHERE id = $1 FOR UPDATE")
        .bind(property_id)
        .fetch_one(&mut **tx)
        .await?;

    sqlx::query("UPDATE property_images SET is_primary = FALSE WHERE property_id = $1 AND is_primary")
        .bind(property_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

#[async_trait]
impl MediaExt for DBClient {
    async fn save_media_file(
        &self,
        uploaded_by: Uuid,
        upload: &MediaUploadDto,
        stored: StoredFile,
    ) -> Result<MediaFile, sqlx::Error> {
        sqlx::query_as::<_, MediaFile>(
            r#"
            INSERT INTO media_files (
                property_id, file_path, file_url, file_type, original_name, file_size,
                checksum, title, description, display_order, is_featured, uploaded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(upload.property_id)
        .bind(stored.path)
        .bind(stored.url)
        .bind(upload.file_type)
        .bind(&upload.file_name)
        .bind(stored.size)
        .bind(stored.checksum)
        .bind(&upload.title)
        .bind(&upload.description)
        .bind(upload.display_order)
        .bind(upload.is_featured)
        .bind(uploaded_by)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_media_files(&self, property_id: Uuid) -> Result<Vec<MediaFile>, sqlx::Error> {
        sqlx::query_as::<_, MediaFile>(
            r#"
            SELECT * FROM media_files
            WHERE property_id = $1 AND is_active
            ORDER BY file_type, display_order, created_at
            "#,
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn deactivate_media_file(
        &self,
        media_id: Uuid,
        uploaded_by: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE media_files SET is_active = FALSE
            WHERE id = $1 AND uploaded_by = $2 AND is_active
            "#,
        )
        .bind(media_id)
        .bind(uploaded_by)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn save_property_image(
        &self,
        uploaded_by: Uuid,
        upload: &ImageUploadDto,
        stored: StoredFile,
    ) -> Result<PropertyImage, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        if upload.is_primary {
            clear_primary(&mut tx, upload.property_id).await?;
        }

        let image = sqlx::query_as::<_, PropertyImage>(
            r#"
            INSERT INTO property_images (
                property_id, file_path, file_url, image_type, alt_text,
                is_primary, display_order, uploaded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(upload.property_id)
        .bind(stored.path)
        .bind(stored.url)
        .bind(upload.image_type)
        .bind(&upload.alt_text)
        .bind(upload.is_primary)
        .bind(upload.display_order)
        .bind(uploaded_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(image)
    }

    async fn get_property_images(&self, property_id: Uuid) -> Result<Vec<PropertyImage>, sqlx::Error> {
        sqlx::query_as::<_, PropertyImage>(
            r#"
            SELECT * FROM property_images
            WHERE property_id = $1
            ORDER BY is_primary DESC, display_order, created_at
            "#,
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_property_image(&self, image_id: Uuid) -> Result<Option<PropertyImage>, sqlx::Error> {
        sqlx::query_as::<_, PropertyImage>("SELECT * FROM property_images WHERE id = $1")
            .bind(image_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn set_primary_image(&self, image: &PropertyImage) -> Result<PropertyImage, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        clear_primary(&mut tx, image.property_id).await?;

        let updated = sqlx::query_as::<_, PropertyImage>(
            "UPDATE property_images SET is_primary = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(image.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{
        create_test_agent, create_test_image, create_test_listing, reference, setup_test_database,
    };

    #[tokio::test]
    #[ignore = "needs Postgres at TEST_DATABASE_URL"]
    async fn concurrent_primary_saves_leave_one_primary() {
        let db = setup_test_database().await;
        let refs = reference(&db).await;
        let (user, agent) = create_test_agent(&db).await;
        let listing = create_test_listing(&db, &agent, &refs, "rent", 90_000).await;

        let first = create_test_image(&db, &listing, user.id).await;
        let second = create_test_image(&db, &listing, user.id).await;
        let first = db.get_property_image(first).await.unwrap().unwrap();
        let second = db.get_property_image(second).await.unwrap().unwrap();

        let (a, b) = tokio::join!(db.set_primary_image(&first), db.set_primary_image(&second));
        a.unwrap();
        b.unwrap();

        let images = db.get_property_images(listing.id).await.unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images.iter().filter(|image| image.is_primary).count(), 1);
    }

    #[tokio::test]
    #[ignore = "needs Postgres at TEST_DATABASE_URL"]
    async fn setting_primary_moves_the_flag() {
        let db = setup_test_database().await;
        let refs = reference(&db).await;
        let (user, agent) = create_test_agent(&db).await;
        let listing = create_test_listing(&db, &agent, &refs, "rent", 90_000).await;

        let first = create_test_image(&db, &listing, user.id).await;
        let second = create_test_image(&db, &listing, user.id).await;

        let first = db.get_property_image(first).await.unwrap().unwrap();
        db.set_primary_image(&first).await.unwrap();
        let second = db.get_property_image(second).await.unwrap().unwrap();
        db.set_primary_image(&second).await.unwrap();

        let images = db.get_property_images(listing.id).await.unwrap();
        assert!(images[0].is_primary);
        assert_eq!(images[0].id, second.id);
        assert!(!images[1].is_primary);
    }
}
