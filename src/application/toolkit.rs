//! The seven tool operations behind one facade.
//!
//! Every method returns a `ToolResponse`; failures become the error
//! envelope here and are logged once.

use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::application::use_cases::analysis::AnalysisEngine;
use crate::application::use_cases::catalog::CatalogService;
use crate::application::use_cases::export::ExportService;
use crate::application::use_cases::ingestion::{ImportRequest, IngestionService};
use crate::application::use_cases::maintenance::MaintenanceService;
use crate::application::use_cases::query_gateway::QueryGateway;
use crate::domain::error::Result;
use crate::domain::report::AnalysisTier;
use crate::domain::tool_results::{
    ClearOutcome, ExportOutcome, ImportOutcome, QueryOutcome, ReportOutcome, TableDescription,
    TableList, ToolResponse,
};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::{StoreRegistry, StoreRegistryConfig};

pub struct Toolkit {
    registry: Arc<StoreRegistry>,
    default_store: String,
    ingestion: IngestionService,
    catalog: CatalogService,
    gateway: QueryGateway,
    analysis: AnalysisEngine,
    export: ExportService,
    maintenance: MaintenanceService,
}

impl Toolkit {
    pub fn new(config: &AppConfig) -> Self {
        let registry = Arc::new(StoreRegistry::new(StoreRegistryConfig {
            storage_dir: config.storage_dir.clone(),
            max_connections: config.max_connections,
        }));
        Self::with_registry(registry, &config.default_store, config.default_limit)
    }

    pub fn with_registry(
        registry: Arc<StoreRegistry>,
        default_store: &str,
        default_limit: u32,
    ) -> Self {
        Self {
            ingestion: IngestionService::new(registry.clone(), default_store),
            catalog: CatalogService::new(registry.clone()),
            gateway: QueryGateway::new(registry.clone(), default_limit),
            analysis: AnalysisEngine::new(registry.clone()),
            export: ExportService::new(registry.clone()),
            maintenance: MaintenanceService::new(registry.clone()),
            default_store: default_store.to_string(),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<StoreRegistry> {
        &self.registry
    }

    fn store<'a>(&'a self, store_name: Option<&'a str>) -> &'a str {
        store_name.unwrap_or(&self.default_store)
    }

    pub async fn import_file(&self, request: ImportRequest) -> ToolResponse<ImportOutcome> {
        respond("import_file", self.ingestion.import(request).await)
    }

    pub async fn list_tables(&self, store_name: Option<&str>) -> ToolResponse<TableList> {
        respond(
            "list_tables",
            self.catalog.list_tables(self.store(store_name)).await,
        )
    }

    pub async fn describe_table(
        &self,
        table_name: &str,
        store_name: Option<&str>,
    ) -> ToolResponse<TableDescription> {
        respond(
            "describe_table",
            self.catalog
                .describe_table(table_name, self.store(store_name))
                .await,
        )
    }

    pub async fn execute_sql(
        &self,
        query: &str,
        store_name: Option<&str>,
        limit: Option<u32>,
    ) -> ToolResponse<QueryOutcome> {
        respond(
            "execute_sql",
            self.gateway
                .execute(query, self.store(store_name), limit)
                .await,
        )
    }

    pub async fn generate_report(
        &self,
        table_name: &str,
        store_name: Option<&str>,
        analysis_type: Option<&str>,
    ) -> ToolResponse<ReportOutcome> {
        let result = async {
            let tier = match analysis_type {
                Some(label) => label.parse::<AnalysisTier>()?,
                None => AnalysisTier::default(),
            };
            self.analysis
                .analyze(table_name, self.store(store_name), tier)
                .await
        }
        .await;
        respond("generate_report", result)
    }

    pub async fn export_query_result(
        &self,
        query: &str,
        output_path: &Path,
        store_name: Option<&str>,
        format: Option<&str>,
    ) -> ToolResponse<ExportOutcome> {
        respond(
            "export_query_result",
            self.export
                .export(
                    query,
                    output_path,
                    self.store(store_name),
                    format.unwrap_or("csv"),
                )
                .await,
        )
    }

    pub async fn clean_database(&self, store_name: Option<&str>) -> ToolResponse<ClearOutcome> {
        respond(
            "clean_database",
            self.maintenance.clear(self.store(store_name)).await,
        )
    }

    /// Close every store pool
    pub async fn shutdown(&self) {
        self.registry.close_all().await;
    }
}

fn respond<T>(operation: &str, result: Result<T>) -> ToolResponse<T> {
    if let Err(err) = &result {
        warn!(operation, error = %err, "Tool operation failed");
    }
    result.into()
}
