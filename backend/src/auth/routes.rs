use actix_web::{HttpResponse, Result, web};
use log::error;

use crate::db::repository::DynamoRepository;

use super::middleware::AuthenticatedUser;

#[derive(serde::Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn me(
    user: AuthenticatedUser,
    db_repo: web::Data<DynamoRepository>,
) -> Result<HttpResponse> {
    if user.0.is_nil() {
        error!("User ID is nil - authentication middleware issue");
        return Ok(HttpResponse::Unauthorized().json(ErrorResponse {
            error: "Invalid user ID".to_string(),
        }));
    }

    match db_repo.get_profile(user.0).await {
        Ok(Some(profile)) => Ok(HttpResponse::Ok().json(profile)),
        Ok(None) => {
            log::warn!("No profile found for user ID: {}", user.0);
            Ok(HttpResponse::NotFound().json(ErrorResponse {
                error: "Profile not found".to_string(),
            }))
        }
        Err(e) => {
            error!("Failed to fetch profile for ID {}: {:?}", user.0, e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to fetch profile".to_string(),
            }))
        }
    }
}
