//! HTTP request handlers

pub mod auth;
pub mod call_record;
pub mod health;
pub mod import;

use actix_web::web;
use cdr_auth::{JwtService, PasswordService};
use cdr_core::{
    config::ImportConfig,
    traits::{CallRecordStore, UserRepository},
    AppError,
};
use cdr_services::{CallRecordService, CdrImporter, UserService};
use std::sync::Arc;

pub use call_record::*;
pub use health::health_check;
pub use import::upload_cdr;

/// Everything the handlers pull from app data
///
/// Cloned into each worker; all members are cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub records: CallRecordService,
    pub importer: CdrImporter,
    pub users: UserService,
    pub jwt: Arc<JwtService>,
    pub import: ImportConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CallRecordStore>,
        users: Arc<dyn UserRepository>,
        jwt: Arc<JwtService>,
        import: ImportConfig,
    ) -> Self {
        Self {
            records: CallRecordService::new(Arc::clone(&store)),
            importer: CdrImporter::new(store),
            users: UserService::new(users, PasswordService::new()),
            jwt,
            import,
        }
    }

    /// Register app data, extractor configs, and every route
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.records.clone()))
            .app_data(web::Data::new(self.importer.clone()))
            .app_data(web::Data::new(self.users.clone()))
            .app_data(web::Data::new(Arc::clone(&self.jwt)))
            .app_data(web::Data::new(self.import.clone()))
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .configure(configure);
    }
}

/// Route table
///
/// Paths carry no trailing slash; run behind `NormalizePath::trim()` so
/// `/cdr/` and `/cdr/1/` resolve too.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/api/token", web::post().to(auth::login))
        .service(
            web::scope("/cdr")
                .route("", web::get().to(list_call_records))
                .route("", web::post().to(create_call_record))
                .route("/upload_cdr", web::post().to(upload_cdr))
                .route("/{id}", web::get().to(get_call_record))
                .route("/{id}", web::put().to(replace_call_record))
                .route("/{id}", web::patch().to(patch_call_record))
                .route("/{id}", web::delete().to(delete_call_record)),
        );
}

/// JSON body errors rendered through [`AppError`]
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::InvalidInput(err.to_string()).into())
}

/// Query string errors rendered through [`AppError`]
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::InvalidInput(err.to_string()).into())
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| AppError::NotFound(err.to_string()).into())
}
