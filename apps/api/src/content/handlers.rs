use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::content::profession::Profession;
use crate::content::view_model::{build_view_model, ExportViewModel};
use crate::errors::AppError;
use crate::models::portfolio::ContentRecord;
use crate::state::AppState;
use crate::templates::{all_templates, TemplateInfo};

const DEFAULT_SEARCH_LIMIT: usize = 20;
const MAX_SEARCH_LIMIT: usize = 100;

/// Raw portfolio content plus an optional template override.
#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub content: ContentRecord,
    #[serde(default)]
    pub template: Option<String>,
}

impl ContentRequest {
    pub fn build(&self, state: &AppState) -> ExportViewModel {
        build_view_model(
            &self.content,
            state.professions.as_ref(),
            self.template.as_deref(),
            chrono::Local::now().date_naive(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfessionQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

/// POST /api/v1/view-model
pub async fn handle_build_view_model(
    State(state): State<AppState>,
    Json(req): Json<ContentRequest>,
) -> Result<Json<ExportViewModel>, AppError> {
    Ok(Json(req.build(&state)))
}

/// GET /api/v1/professions
pub async fn handle_search_professions(
    State(state): State<AppState>,
    Query(params): Query<ProfessionQuery>,
) -> Result<Json<Vec<Profession>>, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);
    let results = state
        .professions
        .search(params.q.trim(), limit)
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(Json(results))
}

/// GET /api/v1/templates
pub async fn handle_list_templates() -> Json<Vec<TemplateInfo>> {
    Json(all_templates())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::routes::build_router;
    use crate::state::tests::test_state;

    async fn call(request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(test_state(10)).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_view_model_endpoint_applies_fallbacks() {
        let body = json!({
            "content": {
                "profile": { "name": "Jane Doe" },
                "profession": "backend-developer",
                "skills": ["Go", { "name": "Rust" }],
                "social": { "github": "javascript:alert(1)" }
            },
            "template": "tech"
        });
        let (status, vm) = call(
            Request::post("/api/v1/view-model")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(vm["resolvedName"], "Jane Doe");
        assert_eq!(vm["resolvedProfessionTitle"], "Backend Developer");
        assert_eq!(
            vm["resolvedHeadline"],
            "Backend Developer | Building Innovative Solutions"
        );
        assert_eq!(vm["skills"], json!(["Go", "Rust"]));
        assert_eq!(vm["socialLinks"], json!([]));
        assert_eq!(vm["template"], "tech");
    }

    #[tokio::test]
    async fn test_profession_search() {
        let (status, results) = call(
            Request::get("/api/v1/professions?q=BACKEND&limit=5")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(results.as_array().unwrap().len(), 1);
        assert_eq!(results[0]["slug"], "backend-developer");
    }

    #[tokio::test]
    async fn test_template_listing() {
        let request = Request::get("/api/v1/templates").body(Body::empty()).unwrap();
        let (status, templates) = call(request).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = templates
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["modern", "classic", "creative", "minimal", "tech"]);
        assert_eq!(templates[0]["tokens"]["primaryColor"], "#6366f1");
    }
}
