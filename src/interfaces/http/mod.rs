use crate::application::toolkit::Toolkit;
use crate::application::use_cases::ingestion::ImportRequest;
use crate::domain::tool_results::ToolResponse;
use actix_cors::Cors;
use actix_web::error::InternalError;
use actix_web::{dev::Server, get, post, web, App, HttpResponse, HttpServer, Responder};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Entries kept in the in-memory log ring
pub const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub toolkit: Arc<Toolkit>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Deserialize)]
pub struct StoreRequest {
    #[serde(default)]
    pub store_name: Option<String>,
}

#[derive(Deserialize)]
pub struct DescribeRequest {
    pub table_name: String,
    #[serde(default)]
    pub store_name: Option<String>,
}

#[derive(Deserialize)]
pub struct SqlRequest {
    pub query: String,
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct ReportRequest {
    pub table_name: String,
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub analysis_type: Option<String>,
}

#[derive(Deserialize)]
pub struct ExportRequest {
    pub query: String,
    pub output_path: PathBuf,
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

/// Log the outcome and answer 200 with the envelope
fn envelope<T: Serialize>(
    logs: &Mutex<Vec<LogEntry>>,
    operation: &str,
    response: ToolResponse<T>,
) -> HttpResponse {
    match response.error_message() {
        Some(message) => add_log(
            logs,
            "ERROR",
            "HttpApi",
            &format!("{} failed: {}", operation, message),
        ),
        None => add_log(logs, "INFO", "HttpApi", &format!("{} succeeded", operation)),
    }
    HttpResponse::Ok().json(response)
}

#[post("/import")]
async fn import(data: web::Data<HttpState>, req: web::Json<ImportRequest>) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!("Importing {}", req.file_path.display()),
    );

    let response = data.toolkit.import_file(req.into_inner()).await;
    envelope(&data.logs, "import", response)
}

#[post("/tables")]
async fn list_tables(data: web::Data<HttpState>, req: web::Json<StoreRequest>) -> impl Responder {
    let response = data.toolkit.list_tables(req.store_name.as_deref()).await;
    envelope(&data.logs, "list_tables", response)
}

#[post("/describe")]
async fn describe_table(
    data: web::Data<HttpState>,
    req: web::Json<DescribeRequest>,
) -> impl Responder {
    let response = data
        .toolkit
        .describe_table(&req.table_name, req.store_name.as_deref())
        .await;
    envelope(&data.logs, "describe_table", response)
}

#[post("/sql")]
async fn execute_sql(data: web::Data<HttpState>, req: web::Json<SqlRequest>) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!("Executing query: {}", req.query),
    );

    let response = data
        .toolkit
        .execute_sql(&req.query, req.store_name.as_deref(), req.limit)
        .await;
    envelope(&data.logs, "execute_sql", response)
}

#[post("/report")]
async fn generate_report(
    data: web::Data<HttpState>,
    req: web::Json<ReportRequest>,
) -> impl Responder {
    let response = data
        .toolkit
        .generate_report(
            &req.table_name,
            req.store_name.as_deref(),
            req.analysis_type.as_deref(),
        )
        .await;
    envelope(&data.logs, "generate_report", response)
}

#[post("/export")]
async fn export_query_result(
    data: web::Data<HttpState>,
    req: web::Json<ExportRequest>,
) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!("Exporting to {}", req.output_path.display()),
    );

    let response = data
        .toolkit
        .export_query_result(
            &req.query,
            &req.output_path,
            req.store_name.as_deref(),
            req.format.as_deref(),
        )
        .await;
    envelope(&data.logs, "export_query_result", response)
}

#[post("/clear")]
async fn clean_database(data: web::Data<HttpState>, req: web::Json<StoreRequest>) -> impl Responder {
    let response = data.toolkit.clean_database(req.store_name.as_deref()).await;
    envelope(&data.logs, "clean_database", response)
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data.logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    HttpResponse::Ok().json(&*logs)
}

/// Malformed bodies still get the error envelope with status 200
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let body = serde_json::json!({
            "status": "error",
            "message": format!("Invalid request body: {}", err),
        });
        InternalError::from_response(err, HttpResponse::Ok().json(body)).into()
    })
}

/// Mount the tool routes under `/api`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(json_config())
            .service(import)
            .service(list_tables)
            .service(describe_table)
            .service(execute_sql)
            .service(generate_report)
            .service(export_query_result)
            .service(clean_database)
            .service(get_logs),
    );
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

pub fn start_server(
    toolkit: Arc<Toolkit>,
    logs: Arc<Mutex<Vec<LogEntry>>>,
    host: &str,
    port: u16,
) -> std::io::Result<Server> {
    let state = web::Data::new(HttpState { toolkit, logs });

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Allow all origins for local tool

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((host, port))?
    .run();

    Ok(server)
}
