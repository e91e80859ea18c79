use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::{
    classifier::DocumentClassifier,
    document::{DocumentType, FieldMap, FileKind, VerificationRequest},
    error::PreconditionError,
    evidence::VerificationResult,
    extractor,
    orchestrator::Verifier,
};

// ==========================================
// 1. 应用状态 (Shared State)
// ==========================================
// 所有请求共享。Verifier 内部的指纹库启动后只读，因此这里不需要任何锁。
pub struct AppState {
    pub verifier: Arc<Verifier>,
    pub classifier: Arc<dyn DocumentClassifier>,
    pub max_upload_bytes: usize,
    pub classifier_timeout: Duration,
}

// ==========================================
// 2. 数据传输对象 (DTOs)
// ==========================================

// 请求：提交待核验文档
#[derive(Deserialize)]
pub struct VerifyRequest {
    pub filename: String,
    pub content_base64: String,

    // 上游分类器已给出的标签；缺省时用 `text` 现场分类
    #[serde(default)]
    pub document_type: Option<String>,

    // 上游 OCR 的文本
    #[serde(default)]
    pub text: Option<String>,

    // 上游已抽取的字段；缺省时用 `text` 现场抽取
    #[serde(default)]
    pub fields: Option<FieldMap>,
}

// 响应：核验结论
#[derive(Serialize)]
pub struct VerifyResponse {
    pub received_at: i64,
    #[serde(flatten)]
    pub result: VerificationResult,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub logos: usize,
}

type ApiError = (StatusCode, String);

// ==========================================
// 3. API 路由构建
// ==========================================
pub fn app(state: Arc<AppState>) -> Router {
    // base64 膨胀约 4/3，再留一点 JSON 外壳的余量
    let body_limit = state.max_upload_bytes / 3 * 4 + 64 * 1024;

    Router::new()
        .route("/verify", post(verify_document))
        .route("/logo-hashes", get(logo_hashes))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive()) // ⚠️ 开发模式：允许所有跨域
        .with_state(state)
}

// ==========================================
// 4. 处理函数 (Handlers)
// ==========================================

/// 接口：上传文档并核验
pub async fn verify_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    info!("📥 收到核验请求: 文件={}", req.filename);

    // 1. 前置条件：类型、内容
    let kind = FileKind::from_filename(&req.filename).map_err(precondition_status)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(req.content_base64.as_bytes())
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid base64 content: {}", e)))?;

    // 2. 文档类型：优先用上游标签，否则现场分类（超时/失败一律退化为 Unknown）
    let label = match (req.document_type, req.text.as_deref()) {
        (Some(label), _) => label,
        (None, Some(text)) => classify_with_timeout(&state, text.to_string()).await,
        (None, None) => DocumentType::Unknown.label().to_string(),
    };

    // 3. 字段
    let fields = match (req.fields, req.text.as_deref()) {
        (Some(fields), _) => fields,
        (None, Some(text)) => extractor::extract_fields(text),
        (None, None) => BTreeMap::new(),
    };

    let request = VerificationRequest::new(bytes, kind, label, fields, state.max_upload_bytes)
        .map_err(precondition_status)?;

    // 4. 取证检查是 CPU 密集型 + 阻塞 I/O，移到 spawn_blocking
    let verifier = state.verifier.clone();
    let result = tokio::task::spawn_blocking(move || verifier.verify(&request))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join error: {}", e)))?;

    Ok(Json(VerifyResponse {
        received_at: chrono::Utc::now().timestamp(),
        result,
    }))
}

/// 接口：导出 logo 指纹库
pub async fn logo_hashes(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, String>> {
    Json(state.verifier.registry().export())
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        logos: state.verifier.registry().len(),
    })
}

async fn classify_with_timeout(state: &AppState, text: String) -> String {
    let classifier = state.classifier.clone();
    let task = tokio::task::spawn_blocking(move || {
        classifier.classify(&text, &DocumentType::CANDIDATE_LABELS)
    });

    match tokio::time::timeout(state.classifier_timeout, task).await {
        Ok(Ok(Ok(label))) => label,
        Ok(Ok(Err(e))) => {
            warn!("⚠️ 分类器失败，按 Unknown 处理: {}", e);
            DocumentType::Unknown.label().to_string()
        }
        Ok(Err(e)) => {
            warn!("⚠️ 分类任务异常，按 Unknown 处理: {}", e);
            DocumentType::Unknown.label().to_string()
        }
        Err(_) => {
            warn!("⚠️ 分类器超时 ({:?})，按 Unknown 处理", state.classifier_timeout);
            DocumentType::Unknown.label().to_string()
        }
    }
}

fn precondition_status(e: PreconditionError) -> ApiError {
    let status = match e {
        PreconditionError::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        PreconditionError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        PreconditionError::MissingFilename | PreconditionError::Empty => StatusCode::BAD_REQUEST,
    };
    (status, e.to_string())
}
