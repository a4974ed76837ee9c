/// Data models for thumbnail-service
///
/// This module defines structures for:
/// - OwnerKind / OwnerRef: the closed set of entities that can own thumbnails
/// - ThumbnailFormat: supported derivative encodings
/// - ThumbnailRecord: one persisted derivative per (owner, size, format)
///
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ========================================
// Owner Models
// ========================================

/// Entity kinds that can own a source image and its derivatives.
///
/// Each variant carries its key discipline (UUID vs integer id), the table
/// and column holding its source image, and whether it is an icon kind with
/// a restricted output-format set. Compile-time data, no runtime dispatch
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerKind {
    User,
    Category,
    Collection,
    ProductMedia,
    App,
    AppInstallation,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Category => "Category",
            Self::Collection => "Collection",
            Self::ProductMedia => "ProductMedia",
            Self::App => "App",
            Self::AppInstallation => "AppInstallation",
        }
    }

    /// Map a decoded global-id type name to a kind, if supported.
    pub fn from_type_name(s: &str) -> Option<Self> {
        match s {
            "User" => Some(Self::User),
            "Category" => Some(Self::Category),
            "Collection" => Some(Self::Collection),
            "ProductMedia" => Some(Self::ProductMedia),
            "App" => Some(Self::App),
            "AppInstallation" => Some(Self::AppInstallation),
            _ => None,
        }
    }

    /// Whether this kind is addressed by UUID rather than integer id.
    pub fn uses_uuid(&self) -> bool {
        matches!(self, Self::User | Self::App | Self::AppInstallation)
    }

    /// Icon kinds only support the restricted {original, webp} output set.
    pub fn is_icon(&self) -> bool {
        matches!(self, Self::App | Self::AppInstallation)
    }

    /// Table holding entities of this kind.
    pub fn table(&self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Category => "categories",
            Self::Collection => "collections",
            Self::ProductMedia => "product_media",
            Self::App => "apps",
            Self::AppInstallation => "app_installations",
        }
    }

    /// Column on the owning table that stores the source image path.
    pub fn image_column(&self) -> &'static str {
        match self {
            Self::User => "avatar",
            Self::Category => "background_image",
            Self::Collection => "background_image",
            Self::ProductMedia => "image",
            Self::App => "brand_logo_default",
            Self::AppInstallation => "brand_logo_default",
        }
    }
}

/// Primary key of an owner entity, in the form its kind requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OwnerKey {
    Id(i64),
    Uuid(Uuid),
}

impl OwnerKey {
    pub fn as_id(&self) -> Option<i64> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Uuid(_) => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Id(_) => None,
            Self::Uuid(u) => Some(*u),
        }
    }
}

impl std::fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Uuid(u) => write!(f, "{}", u),
        }
    }
}

/// Tagged reference to exactly one owner entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: OwnerKind,
    pub key: OwnerKey,
}

impl OwnerRef {
    pub fn new(kind: OwnerKind, key: OwnerKey) -> Self {
        Self { kind, key }
    }
}

/// An owner entity as loaded for thumbnail generation: its reference plus
/// the source-image path its kind designates (absent when no image is set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerHandle {
    pub owner: OwnerRef,
    pub image_path: Option<String>,
}

// ========================================
// Thumbnail Models
// ========================================

/// Requested derivative encoding. A request without a format (or with
/// `original`) keeps the source encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailFormat {
    Original,
    Webp,
    Avif,
}

impl ThumbnailFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Webp => "webp",
            Self::Avif => "avif",
        }
    }

    /// Parse an already-lowercased format segment.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "original" => Some(Self::Original),
            "webp" => Some(Self::Webp),
            "avif" => Some(Self::Avif),
            _ => None,
        }
    }

    /// Whether a kind's processor variant accepts this output format.
    pub fn allowed_for(&self, kind: OwnerKind) -> bool {
        match self {
            Self::Original | Self::Webp => true,
            Self::Avif => !kind.is_icon(),
        }
    }
}

/// One generated derivative for one (owner, size, format) combination.
///
/// Exactly one of `owner_id` / `owner_uuid` is populated, per the kind's key
/// discipline. Rows are created lazily on cache miss and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ThumbnailRecord {
    pub id: Uuid,
    pub owner_type: String,
    pub owner_id: Option<i64>,
    pub owner_uuid: Option<Uuid>,
    pub size: i32,
    pub format: Option<String>,
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
}

/// Where the HTTP layer should redirect the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectTarget {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_key_discipline() {
        assert!(OwnerKind::User.uses_uuid());
        assert!(OwnerKind::App.uses_uuid());
        assert!(OwnerKind::AppInstallation.uses_uuid());
        assert!(!OwnerKind::Category.uses_uuid());
        assert!(!OwnerKind::Collection.uses_uuid());
        assert!(!OwnerKind::ProductMedia.uses_uuid());
    }

    #[test]
    fn test_icon_kinds_reject_avif() {
        assert!(!ThumbnailFormat::Avif.allowed_for(OwnerKind::App));
        assert!(!ThumbnailFormat::Avif.allowed_for(OwnerKind::AppInstallation));
        assert!(ThumbnailFormat::Avif.allowed_for(OwnerKind::User));
        assert!(ThumbnailFormat::Webp.allowed_for(OwnerKind::App));
    }

    #[test]
    fn test_unknown_type_name() {
        assert_eq!(OwnerKind::from_type_name("Order"), None);
        assert_eq!(
            OwnerKind::from_type_name("ProductMedia"),
            Some(OwnerKind::ProductMedia)
        );
    }
}
