use sqlx::SqlitePool;

use crate::errors::{AppError, AppResult};
use crate::models::category::Category;

#[derive(Debug, Clone)]
pub struct CategoryStore {
    pool: SqlitePool,
}

impl CategoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn category_by_id(&self, id: i64) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    pub async fn all(&self) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    pub async fn add(&self, name: &str) -> AppResult<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::bad_request("category name must not be empty"));
        }

        let id = sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|err| AppError::from_unique_violation(err, format!("category '{name}' already exists")))?
            .last_insert_rowid();

        tracing::info!(category_id = id, category = %name, "category created");
        Ok(Category { id, name: name.to_string() })
    }

    pub async fn remove_category(&self, name: &str) -> AppResult<bool> {
        let removed = sqlx::query("DELETE FROM categories WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if removed == 0 {
            return Err(AppError::not_found("No Category with this Name"));
        }

        tracing::info!(category = %name, "category removed");
        Ok(true)
    }
}
