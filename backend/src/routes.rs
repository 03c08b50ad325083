use std::io::Write;

use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info};
use serde::Serialize;
use uuid::Uuid;

use shared::{AnalyzeResponse, FileCandidate, UploadPolicy};

use crate::auth;
use crate::auth::middleware::{AuthenticatedUser, MaybeUser};
use crate::detect::{Detector, ImageUpload};
use crate::history::service::{HistoryError, HistoryService};

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: String) {
    cfg.service(
        web::resource("/api/analyses")
            .route(web::post().to(analyze_image))
            .route(web::get().to(list_analyses)),
    )
    .service(web::resource("/api/analyses/{id}").route(web::get().to(get_analysis)))
    .service(web::resource("/api/analyses/{id}/image").route(web::get().to(get_analysis_image)))
    .service(web::resource("/auth/me").route(web::get().to(auth::routes::me)))
    .service(Files::new("/static", static_dir).index_file("index.html"));
}

/// Drain the first file field of the multipart payload.
async fn read_upload(payload: &mut Multipart) -> Result<(String, String, Vec<u8>), Error> {
    let mut file_name = String::new();
    let mut mime_type = String::new();
    let mut image_data: Vec<u8> = Vec::new();

    while let Ok(Some(mut field)) = payload.try_next().await {
        if let Some(name) = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
        {
            file_name = name.to_string();
        }
        if let Some(mime) = field.content_type() {
            mime_type = mime.to_string();
        }

        while let Some(chunk) = field.next().await {
            let data = chunk?;
            image_data.write_all(&data)?;
        }
        if !image_data.is_empty() {
            break;
        }
    }

    Ok((file_name, mime_type, image_data))
}

async fn analyze_image(
    user: MaybeUser,
    detector: web::Data<dyn Detector>,
    history: web::Data<HistoryService>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let (file_name, mime_type, image_data) = read_upload(&mut payload).await?;

    if image_data.is_empty() {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: "No image found in request".to_string(),
        }));
    }

    let candidate = FileCandidate {
        file_name: file_name.clone(),
        mime_type: mime_type.clone(),
        size_bytes: image_data.len() as u64,
    };
    if let Err(e) = UploadPolicy::default().validate(&candidate) {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: e.to_string(),
        }));
    }

    let delay = detector.processing_delay();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let upload = ImageUpload {
        file_name: &file_name,
        mime_type: &mime_type,
        bytes: &image_data,
    };
    let result = match detector.analyze(&upload) {
        Ok(result) => result,
        Err(e) => {
            // Unreachable with the mock backend, guarded anyway.
            error!("Detection failed for {}: {:?}", file_name, e);
            return Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Analysis failed".to_string(),
            }));
        }
    };

    let mut record_id = None;
    let mut saved = false;
    let mut warning = None;

    // Best effort: the result is already computed, a failed save only
    // degrades to a warning.
    if let Some(user_id) = user.0 {
        match history.archive(user_id, &image_data, &mime_type, &result).await {
            Ok(record) => {
                record_id = Some(record.id);
                saved = true;
            }
            Err(e) => {
                error!("Failed to save analysis for user {}: {}", user_id, e);
                warning = Some("The analysis could not be saved to your history.".to_string());
            }
        }
    }

    Ok(HttpResponse::Ok().json(AnalyzeResponse {
        result,
        record_id,
        saved,
        warning,
    }))
}

async fn list_analyses(
    user: AuthenticatedUser,
    history: web::Data<HistoryService>,
) -> HttpResponse {
    match history.list_for(user.0).await {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => {
            error!("Failed to list analyses for user {}: {}", user.0, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to load analysis history".to_string(),
            })
        }
    }
}

fn history_error_response(user_id: Uuid, record_id: Uuid, err: HistoryError) -> HttpResponse {
    match err {
        HistoryError::NotFound => HttpResponse::NotFound().json(ErrorResponse {
            error: "Analysis not found".to_string(),
        }),
        HistoryError::Forbidden => {
            log::warn!(
                "User {} attempted to access analysis {} owned by another user",
                user_id,
                record_id
            );
            HttpResponse::Forbidden().json(ErrorResponse {
                error: "You do not have access to this analysis".to_string(),
            })
        }
        e => {
            error!("Error retrieving analysis {}: {}", record_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Error retrieving analysis".to_string(),
            })
        }
    }
}

async fn get_analysis(
    user: AuthenticatedUser,
    history: web::Data<HistoryService>,
    path: web::Path<String>,
) -> HttpResponse {
    let record_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(uuid) => uuid,
        Err(_) => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Invalid analysis id".to_string(),
            });
        }
    };

    match history.fetch_for(user.0, record_id).await {
        Ok(record) => {
            info!("Retrieved analysis {} for user {}", record_id, user.0);
            HttpResponse::Ok().json(record)
        }
        Err(e) => history_error_response(user.0, record_id, e),
    }
}

async fn get_analysis_image(
    user: AuthenticatedUser,
    history: web::Data<HistoryService>,
    path: web::Path<String>,
) -> HttpResponse {
    let record_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(uuid) => uuid,
        Err(_) => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Invalid analysis id".to_string(),
            });
        }
    };

    let record = match history.fetch_for(user.0, record_id).await {
        Ok(record) => record,
        Err(e) => return history_error_response(user.0, record_id, e),
    };

    match history.fetch_image(&record).await {
        Ok((bytes, mime_type)) => HttpResponse::Ok().content_type(mime_type).body(bytes),
        Err(e) => {
            error!("Failed to load image for analysis {}: {}", record_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to load analysis image".to_string(),
            })
        }
    }
}
