//! Inbound keyword reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::InboundSmsKeyword;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct KeywordListQuery {
    pub user_number: Option<String>,
    #[validate(range(min = 1, max = 366, message = "limit_days must be between 1 and 366"))]
    pub limit_days: Option<u64>,
    #[validate(range(min = 1, max = 1000, message = "limit must be between 1 and 1000"))]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct KeywordCountQuery {
    #[validate(range(min = 1, max = 366, message = "limit_days must be between 1 and 366"))]
    pub limit_days: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordResponse {
    pub id: Uuid,
    pub service_id: Uuid,
    pub notify_short_number: String,
    pub user_number: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<InboundSmsKeyword> for KeywordResponse {
    fn from(keyword: InboundSmsKeyword) -> Self {
        Self {
            id: keyword.id,
            service_id: keyword.service_id,
            notify_short_number: keyword.notify_short_number,
            user_number: keyword.user_number,
            content: keyword.content,
            created_at: keyword.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordListResponse {
    pub data: Vec<KeywordResponse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCountResponse {
    pub count: i64,
}
