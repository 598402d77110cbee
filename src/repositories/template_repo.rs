use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::{AsyncDbPool, connection};
use crate::error::{AppError, AppResult};
use crate::models::Template;
use crate::repositories::TemplateStore;

#[derive(Clone)]
pub struct TemplateRepository {
    pool: AsyncDbPool,
}

impl TemplateRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateStore for TemplateRepository {
    async fn find(&self, template_id: Uuid, template_version: i32) -> AppResult<Option<Template>> {
        use crate::schema::templates::dsl::*;
        let mut conn = connection(&self.pool).await?;

        templates
            .filter(id.eq(template_id))
            .filter(version.eq(template_version))
            .select(Template::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }
}
