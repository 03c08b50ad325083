mod auth;
mod db;
mod detect;
mod history;
mod routes;
mod storage;

use std::env;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;

use auth::jwt::JwtService;
use auth::middleware::AuthMiddleware;
use db::repository::DynamoRepository;
use detect::Detector;
use detect::mock::MockDetector;
use history::service::HistoryService;
use routes::configure_routes;
use storage::image_store::ImageStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let dynamodb_client = DynamoDbClient::new(&aws_config);
    let s3_client = S3Client::new(&aws_config);

    let profiles_table = env::var("DYNAMODB_PROFILES_TABLE").unwrap().to_string();
    let results_table = env::var("DYNAMODB_RESULTS_TABLE").unwrap().to_string();
    let s3_bucket = env::var("S3_BUCKET_NAME").unwrap().to_string();

    let db_repo = DynamoRepository::new(dynamodb_client, profiles_table, results_table);
    let image_store = ImageStore::new(s3_client, s3_bucket);
    let history_service = HistoryService::new(db_repo.clone(), image_store);

    let jwt_secret = env::var("JWT_SECRET").unwrap().to_string();
    let jwt_service = JwtService::new(&jwt_secret);
    let auth_middleware = AuthMiddleware::new(jwt_service.clone());

    // The analysis backend is the random mock; a model-backed
    // implementation slots in behind the same trait.
    let detector: Arc<dyn Detector> = Arc::new(MockDetector::new());

    let static_dir = env::var("STATIC_DIR").unwrap_or_else(|_| "./static".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "8081".to_string());
    let bind_address = format!("0.0.0.0:{}", port);

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(auth_middleware.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::from(detector.clone()))
            .app_data(web::Data::new(history_service.clone()))
            .app_data(web::Data::new(db_repo.clone()))
            .app_data(web::Data::new(jwt_service.clone()))
            .configure(|cfg| configure_routes(cfg, static_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
