/// HTTP handlers for thumbnail-service
mod thumbnails;

pub use thumbnails::{get_thumbnail, get_thumbnail_with_format};
