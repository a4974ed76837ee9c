/// Thumbnail handlers - HTTP endpoints for the resolve-or-generate pipeline
use actix_web::http::header;
use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::error::Result;
use crate::services::ThumbnailService;

/// `GET /thumbnail/{id}/{size}/`
pub async fn get_thumbnail(
    service: web::Data<Arc<ThumbnailService>>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (opaque_id, size) = path.into_inner();

    let target = service.resolve(&opaque_id, &size, None).await?;

    Ok(redirect(target.url))
}

/// `GET /thumbnail/{id}/{size}/{format}/`
pub async fn get_thumbnail_with_format(
    service: web::Data<Arc<ThumbnailService>>,
    path: web::Path<(String, String, String)>,
) -> Result<HttpResponse> {
    let (opaque_id, size, format) = path.into_inner();

    let target = service.resolve(&opaque_id, &size, Some(&format)).await?;

    Ok(redirect(target.url))
}

fn redirect(url: String) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, url))
        .finish()
}
