//! Inbound keyword reads for a service.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::dto::{
    KeywordCountQuery, KeywordCountResponse, KeywordListQuery, KeywordListResponse,
    KeywordResponse,
};
use crate::error::AppResult;
use crate::state::AppState;

/// - `GET /{service_id}/inbound-keywords`: newest first, filterable by
///   `user_number`, `limit_days` and `limit`
/// - `GET /{service_id}/inbound-keywords/count`
/// - `GET /{service_id}/inbound-keywords/{id}`
pub fn keyword_routes() -> Router<AppState> {
    Router::new()
        .route("/{service_id}/inbound-keywords", get(list_keywords))
        .route("/{service_id}/inbound-keywords/count", get(count_keywords))
        .route("/{service_id}/inbound-keywords/{id}", get(get_keyword))
}

pub async fn list_keywords(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
    Query(query): Query<KeywordListQuery>,
) -> AppResult<Json<KeywordListResponse>> {
    query.validate()?;
    let keywords = state
        .services
        .keywords
        .list_for_service(service_id, query.user_number, query.limit_days, query.limit)
        .await?;
    Ok(Json(KeywordListResponse {
        data: keywords.into_iter().map(KeywordResponse::from).collect(),
    }))
}

pub async fn count_keywords(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
    Query(query): Query<KeywordCountQuery>,
) -> AppResult<Json<KeywordCountResponse>> {
    query.validate()?;
    let count = state
        .services
        .keywords
        .count_for_service(service_id, query.limit_days)
        .await?;
    Ok(Json(KeywordCountResponse { count }))
}

pub async fn get_keyword(
    State(state): State<AppState>,
    Path((service_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<KeywordResponse>> {
    let keyword = state
        .services
        .keywords
        .get_by_id_and_service(id, service_id)
        .await?;
    Ok(Json(keyword.into()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, Utc};
    use serde::de::DeserializeOwned;
    use tower::ServiceExt;

    use super::*;
    use crate::models::InboundSmsKeyword;
    use crate::repositories::memory::MemoryStore;

    fn keyword(service_id: Uuid, user_number: &str, age: Duration) -> InboundSmsKeyword {
        InboundSmsKeyword {
            id: Uuid::new_v4(),
            service_id,
            content: "STOP".into(),
            notify_short_number: "38383".into(),
            user_number: user_number.into(),
            created_at: Utc::now() - age,
            provider_date: None,
            provider_reference: None,
            provider: "sinch".into(),
        }
    }

    async fn get<T: DeserializeOwned>(store: Arc<MemoryStore>, uri: &str) -> (StatusCode, Option<T>) {
        let (state, _) = AppState::for_tests(store);
        let response = keyword_routes()
            .with_state(state)
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).ok())
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_filtered() {
        let store = Arc::new(MemoryStore::new());
        let service_id = Uuid::new_v4();
        let older = keyword(service_id, "+16135550100", Duration::hours(2));
        let newer = keyword(service_id, "+16135550100", Duration::minutes(5));
        store.insert_keyword(older.clone());
        store.insert_keyword(newer.clone());
        store.insert_keyword(keyword(service_id, "+16135550199", Duration::minutes(1)));
        store.insert_keyword(keyword(Uuid::new_v4(), "+16135550100", Duration::minutes(1)));

        let (status, body) = get::<KeywordListResponse>(
            store,
            &format!("/{service_id}/inbound-keywords?user_number=%2B16135550100"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let ids: Vec<Uuid> = body.unwrap().data.into_iter().map(|k| k.id).collect();
        assert_eq!(ids, [newer.id, older.id]);
    }

    #[tokio::test]
    async fn test_count_respects_limit_days() {
        let store = Arc::new(MemoryStore::new());
        let service_id = Uuid::new_v4();
        store.insert_keyword(keyword(service_id, "+16135550100", Duration::minutes(1)));
        store.insert_keyword(keyword(service_id, "+16135550100", Duration::days(30)));

        let (_, body) = get::<KeywordCountResponse>(
            store,
            &format!("/{service_id}/inbound-keywords/count?limit_days=7"),
        )
        .await;
        assert_eq!(body.unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_out_of_range_limit_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let (status, _) = get::<serde_json::Value>(
            store,
            &format!("/{}/inbound-keywords?limit=0", Uuid::new_v4()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_keyword_of_other_service_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let row = keyword(Uuid::new_v4(), "+16135550100", Duration::minutes(1));
        store.insert_keyword(row.clone());

        let (status, _) = get::<serde_json::Value>(
            store.clone(),
            &format!("/{}/inbound-keywords/{}", Uuid::new_v4(), row.id),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get::<KeywordResponse>(
            store,
            &format!("/{}/inbound-keywords/{}", row.service_id, row.id),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap().id, row.id);
    }
}
