use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use uuid::Uuid;

use crate::config::Config;
use crate::downloader;
use crate::error::CatalogError;
use crate::filter::{self, FilterState};
use crate::i18n::{Language, Text};
use crate::loader;
use crate::pricing::{self, PricingRule};
use crate::quote::{PriceRules, QuoteRequest, QuoteResult};
use crate::record::{DETAIL_FIELDS, Field, ProductRecord};
use crate::render;
use crate::saving::TableStore;
use crate::session::{SessionContext, SessionStore};
use crate::table::ProductTable;
use crate::upsert::{self, UpsertPlan};

const SESSION_COOKIE: &str = "session";
const UPLOAD_LIMIT: usize = 20 * 1024 * 1024;

type ApiResult<T> = Result<T, CatalogError>;

pub struct AppState {
    config: Config,
    store: TableStore,
    sessions: SessionStore,
    rules: PriceRules,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        AppState {
            store: config.store(),
            config,
            sessions: SessionStore::new(),
            rules: PriceRules::default(),
        }
    }

    fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut SessionContext) -> R) -> R {
        self.sessions.with(id, self.config.default_language, f)
    }

    // The table is re-read on every request so edits made to the workbook
    // outside the app show up immediately.
    fn table(&self) -> ApiResult<ProductTable> {
        Ok(self.store.ensure()?.table)
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

#[derive(Serialize)]
struct Card {
    model: String,
    image_path: String,
    lines: Vec<String>,
}

#[derive(Serialize)]
struct ProductsResponse {
    heading: String,
    count: usize,
    language: Language,
    filter: FilterState,
    facets: BTreeMap<Field, Vec<String>>,
    products: Vec<ProductRecord>,
    cards: Vec<Card>,
}

#[derive(Deserialize)]
struct LanguageUpdate {
    language: Language,
}

#[derive(Serialize)]
struct PreviewResponse {
    inserts: usize,
    updates: usize,
    unchanged: usize,
    summary: String,
    new_models: Vec<String>,
    updated_models: Vec<String>,
}

#[derive(Serialize)]
struct ApplyResponse {
    status: String,
    message: String,
    backup: Option<String>,
    rows: usize,
}

#[derive(Serialize)]
struct QuoteResponse {
    request: QuoteRequest,
    result: QuoteResult,
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let images = state.store.base_dir().join(&state.config.images_dir);

    Router::new()
        .route("/", get(serve_landing))
        .route("/api/products", get(list_products))
        .route("/api/filter", post(update_filter))
        .route("/api/language", post(update_language))
        .route("/api/catalog.pdf", get(export_pdf))
        .route("/api/products.xlsx", get(export_xlsx))
        .route("/api/upsert/preview", post(preview_upsert))
        .route("/api/upsert/apply", post(apply_upsert))
        .route("/api/quote/products", get(quote_products))
        .route("/api/quote", post(make_quote))
        .route("/api/quotes.csv", post(export_quotes))
        .route("/api/price-sheet", post(build_price_sheet))
        .nest_service("/images", ServeDir::new(images))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
        .with_state(state)
}

/// Start the web server on the configured address
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(config));
    let ensured = state.store.ensure()?;
    if ensured.created {
        let path = state.store.path().display().to_string();
        info!("{}", state.config.default_language.text(Text::SampleCreated).replace("{f}", &path));
    }

    let listener = TcpListener::bind(state.config.bind_addr.as_str()).await?;
    info!("Listening on http://{}", state.config.bind_addr);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = match &self {
            CatalogError::MissingColumns(_) | CatalogError::FileRead { .. } | CatalogError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            CatalogError::ProductNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("request failed: {}", self);
        }
        (
            status,
            Json(StatusResponse {
                status: "error".to_string(),
                message: Some(self.to_string()),
            }),
        )
            .into_response()
    }
}

// Reuse the session cookie or mint a new one.
fn session_id(jar: CookieJar) -> (CookieJar, String) {
    if let Some(id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        return (jar, id);
    }
    let id = Uuid::new_v4().to_string();
    let mut cookie = Cookie::new(SESSION_COOKIE, id.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    (jar.add(cookie), id)
}

fn download(bytes: Vec<u8>, content_type: &str, file_name: &str) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        file_name.chars().filter(char::is_ascii).collect::<String>(),
        urlencoding::encode(file_name)
    );
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

async fn serve_landing() -> Html<&'static str> {
    Html(include_str!("./static/index.html"))
}

fn products_response(state: &AppState, id: &str) -> ApiResult<ProductsResponse> {
    let table = state.table()?;
    Ok(state.with_session(id, |ctx| {
        let language = ctx.language;
        let visible = ctx.visible(&table);
        let cards = visible
            .iter()
            .map(|r| Card {
                model: r.model.clone(),
                image_path: r.image_path.clone(),
                lines: std::iter::once(Field::Model)
                    .chain(DETAIL_FIELDS)
                    .filter(|f| !r.get(*f).trim().is_empty())
                    .map(|f| language.label_pair(f, r.get(f).trim()))
                    .collect(),
            })
            .collect();
        ProductsResponse {
            heading: language
                .text(Text::ProductList)
                .replace("{n}", &visible.len().to_string()),
            count: visible.len(),
            language,
            filter: ctx.filter.clone(),
            facets: filter::facets(&table),
            products: visible.into_iter().cloned().collect(),
            cards,
        }
    }))
}

async fn list_products(State(state): State<Arc<AppState>>, jar: CookieJar) -> ApiResult<impl IntoResponse> {
    let (jar, id) = session_id(jar);
    let body = products_response(&state, &id)?;
    Ok((jar, Json(body)))
}

async fn update_filter(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(filter): Json<FilterState>,
) -> ApiResult<impl IntoResponse> {
    let (jar, id) = session_id(jar);
    state.with_session(&id, |ctx| ctx.filter = filter);
    let body = products_response(&state, &id)?;
    Ok((jar, Json(body)))
}

async fn update_language(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(update): Json<LanguageUpdate>,
) -> impl IntoResponse {
    let (jar, id) = session_id(jar);
    state.with_session(&id, |ctx| ctx.language = update.language);
    (
        jar,
        Json(StatusResponse {
            status: "ok".to_string(),
            message: None,
        }),
    )
}

// Image decoding, PDF layout and workbook I/O run on the blocking pool.
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ApiResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CatalogError::Task(e.to_string()))?
}

async fn export_pdf(State(state): State<Arc<AppState>>, jar: CookieJar) -> ApiResult<impl IntoResponse> {
    let (jar, id) = session_id(jar);
    let (language, filter_state, marks) =
        state.with_session(&id, |ctx| (ctx.language, ctx.filter.clone(), ctx.marks.clone()));
    let options = state.config.render_options(language);
    let store = state.store.clone();

    let bytes = blocking(move || {
        let table = store.ensure()?.table;
        let visible = filter::apply(&table, &filter_state, &marks);
        render::render_catalog(&visible, &options)
    })
    .await?;
    Ok((jar, download(bytes, "application/pdf", language.text(Text::CatalogFileName))))
}

async fn export_xlsx(State(state): State<Arc<AppState>>, jar: CookieJar) -> ApiResult<impl IntoResponse> {
    let (jar, id) = session_id(jar);
    let table = state.table()?;
    let visible = state.with_session(&id, |ctx| ctx.visible(&table));

    let bytes = downloader::records_to_xlsx(&visible)?;
    Ok((
        jar,
        download(
            bytes,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "products.xlsx",
        ),
    ))
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
    fields: HashMap<String, String>,
}

async fn read_upload(mut multipart: Multipart) -> ApiResult<Upload> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CatalogError::file_read("upload", e))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload.xlsx").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| CatalogError::file_read(&file_name, e))?;
            upload = Some((file_name, bytes.to_vec()));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| CatalogError::file_read(&name, e))?;
            fields.insert(name, value);
        }
    }

    let (file_name, bytes) = upload.ok_or_else(|| CatalogError::InvalidRequest("no file received".to_string()))?;
    if bytes.is_empty() {
        return Err(CatalogError::file_read(file_name, "file is empty"));
    }
    Ok(Upload {
        file_name,
        bytes,
        fields,
    })
}

async fn preview_upsert(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    multipart: Multipart,
) -> ApiResult<Response> {
    let (jar, id) = session_id(jar);
    let language = state.with_session(&id, |ctx| ctx.language);
    let upload = read_upload(multipart).await?;

    let raw = loader::load_bytes(&upload.file_name, &upload.bytes)?;
    let table = state.table()?;
    let plan = match UpsertPlan::prepare(&table, &raw) {
        Ok(plan) => plan,
        Err(CatalogError::MissingColumns(cols)) => {
            let message = format!("{}{}", language.text(Text::MissingColumns), cols.join("、"));
            let body = StatusResponse {
                status: "error".to_string(),
                message: Some(message),
            };
            return Ok((jar, (StatusCode::BAD_REQUEST, Json(body))).into_response());
        }
        Err(e) => return Err(e),
    };

    let (inserts, updates, unchanged) = plan.preview.counts();
    let marks = plan.marks();
    state.with_session(&id, |ctx| ctx.stage(plan));

    let body = PreviewResponse {
        inserts,
        updates,
        unchanged,
        summary: language.diff_summary(inserts, updates, unchanged),
        new_models: marks.new_models,
        updated_models: marks.updated_models,
    };
    Ok((jar, Json(body)).into_response())
}

async fn apply_upsert(State(state): State<Arc<AppState>>, jar: CookieJar) -> ApiResult<impl IntoResponse> {
    let (jar, id) = session_id(jar);
    let (language, plan) = state.with_session(&id, |ctx| (ctx.language, ctx.take_pending()));
    let plan = plan.ok_or_else(|| CatalogError::InvalidRequest("no previewed upload to apply".to_string()))?;

    let store = state.store.clone();
    let outcome = blocking(move || {
        let existing = store.ensure()?.table;
        upsert::apply(&store, &existing, &plan)
    })
    .await?;

    let backup = outcome.backup.as_ref().map(|p| p.display().to_string());
    let mut message = language.text(Text::UpdateDone).to_string();
    if let Some(path) = &backup {
        message = format!("{}{}\n{}", language.text(Text::BackupCreated), path, message);
    }
    Ok((
        jar,
        Json(ApplyResponse {
            status: "ok".to_string(),
            message,
            backup,
            rows: outcome.rows,
        }),
    ))
}

async fn quote_products(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.rules.codes().map(str::to_string).collect::<Vec<_>>())
}

async fn make_quote(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QuoteRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;
    let result = state.rules.quote(&request)?;
    Ok(Json(QuoteResponse { request, result }))
}

async fn export_quotes(
    State(state): State<Arc<AppState>>,
    Json(requests): Json<Vec<QuoteRequest>>,
) -> ApiResult<impl IntoResponse> {
    let mut quotes = Vec::with_capacity(requests.len());
    for request in requests {
        request.validate()?;
        let result = state.rules.quote(&request)?;
        quotes.push((request, result));
    }
    let bytes = downloader::quotes_to_csv(&quotes)?;
    Ok(download(bytes, "text/csv; charset=utf-8", "quotes.csv"))
}

async fn build_price_sheet(multipart: Multipart) -> ApiResult<impl IntoResponse> {
    let upload = read_upload(multipart).await?;
    let defaults = PricingRule::default();
    let number = |key: &str| upload.fields.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

    let rule = PricingRule {
        markup_pct: match number("markup") {
            Some(v) => v
                .parse()
                .map_err(|_| CatalogError::InvalidRequest(format!("invalid markup: {}", v)))?,
            None => defaults.markup_pct,
        },
        rounding_step: match number("step") {
            Some(v) => v
                .parse()
                .map_err(|_| CatalogError::InvalidRequest(format!("invalid rounding step: {}", v)))?,
            None => defaults.rounding_step,
        },
    };

    let raw = loader::load_bytes(&upload.file_name, &upload.bytes)?;
    let rows = pricing::build(&raw, &rule)?;
    info!("priced {} rows from {}", rows.len(), upload.file_name);

    match upload.fields.get("format").map(String::as_str) {
        Some("md") | Some("markdown") => Ok(download(
            downloader::price_sheet_to_markdown(&rows, "Product Catalog").into_bytes(),
            "text/markdown; charset=utf-8",
            "catalog.md",
        )),
        _ => Ok(download(
            downloader::price_sheet_to_csv(&rows)?,
            "text/csv; charset=utf-8",
            "price_sheet.csv",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state(dir: &std::path::Path) -> Arc<AppState> {
        let config = Config {
            data_path: dir.join("catalog.xlsx"),
            ..Default::default()
        };
        Arc::new(AppState::new(config))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn multipart_body(boundary: &str, file_name: &str, content: &[u8], fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                    .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        body
    }

    #[tokio::test]
    async fn products_list_creates_sample_and_sets_cookie() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path()));

        let response = app
            .oneshot(Request::get("/api/products").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_some());

        let json = body_json(response).await;
        assert_eq!(json["count"], 4);
        assert_eq!(json["heading"], "產品列表（4 筆）");
        assert!(dir.path().join("catalog.xlsx").exists());
    }

    #[tokio::test]
    async fn catalog_pdf_is_served_as_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(test_state(dir.path()))
            .oneshot(Request::get("/api/catalog.pdf").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn panicking_worker_becomes_task_error() {
        let result: ApiResult<()> = blocking(|| panic!("worker died")).await;
        assert!(matches!(result, Err(CatalogError::Task(_))));
    }

    #[tokio::test]
    async fn quote_endpoint_prices_and_rejects_unknown_codes() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let request = Request::post("/api/quote")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"code":"A100","quantity":100,"fast":true,"premium":false,"discount_pct":5}"#,
            ))
            .unwrap();
        let response = router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["result"]["total"], 109250.0);
        assert_eq!(json["result"]["lead_days"], 5);

        let request = Request::post("/api/quote")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"code":"Q1","quantity":1}"#))
            .unwrap();
        let response = router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn price_sheet_missing_columns_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let boundary = "XBOUNDARY";
        let body = multipart_body(boundary, "rows.csv", b"sku,title\nS1,Shirt\n", &[("markup", "25")]);
        let request = Request::post("/api/price-sheet")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = router(test_state(dir.path())).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["message"], "missing columns: name、base_price");
    }

    #[tokio::test]
    async fn upsert_preview_then_apply_within_one_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        state.store.ensure().unwrap();

        let mut upload = ProductTable::sample();
        upload.records[0].color = "紅色".to_string();
        let xlsx = crate::saving::table_to_xlsx(&upload).unwrap();

        let boundary = "YBOUNDARY";
        let request = Request::post("/api/upsert/preview")
            .header(header::COOKIE, "session=abc")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(multipart_body(boundary, "update.xlsx", &xlsx, &[])))
            .unwrap();
        let response = router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["updates"], 1);
        assert_eq!(json["unchanged"], 3);
        assert_eq!(json["inserts"], 0);

        let request = Request::post("/api/upsert/apply")
            .header(header::COOKIE, "session=abc")
            .body(Body::empty())
            .unwrap();
        let response = router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["rows"], 4);
        assert!(json["backup"].is_string());

        let stored = state.store.load().unwrap();
        let row = stored.records.iter().find(|r| r.model == "EPX-1000").unwrap();
        assert_eq!(row.color, "紅色");

        let request = Request::post("/api/upsert/apply")
            .header(header::COOKIE, "session=abc")
            .body(Body::empty())
            .unwrap();
        let response = router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
