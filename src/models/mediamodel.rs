use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "media_file_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MediaFileType {
    Image,
    Video,
    Document,
    VirtualTour,
}

impl MediaFileType {
    /// `None` means any extension is accepted.
    pub fn allowed_extensions(&self) -> Option<&'static [&'static str]> {
        match self {
            MediaFileType::Image => Some(&[".jpg", ".jpeg", ".png", ".gif", ".webp"]),
            MediaFileType::Video => Some(&[".mp4", ".avi", ".mov", ".wmv"]),
            MediaFileType::Document => Some(&[".pdf", ".doc", ".docx", ".txt"]),
            MediaFileType::VirtualTour => None,
        }
    }
}

impl FromStr for MediaFileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaFileType::Image),
            "video" => Ok(MediaFileType::Video),
            "document" => Ok(MediaFileType::Document),
            "virtual_tour" => Ok(MediaFileType::VirtualTour),
            other => Err(format!("\"{}\" is not a valid file type", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "image_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    Exterior,
    Interior,
    Bedroom,
    Bathroom,
    Kitchen,
    LivingRoom,
    Amenity,
    View,
    FloorPlan,
    Other,
}

impl FromStr for ImageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exterior" => Ok(ImageType::Exterior),
            "interior" => Ok(ImageType::Interior),
            "bedroom" => Ok(ImageType::Bedroom),
            "bathroom" => Ok(ImageType::Bathroom),
            "kitchen" => Ok(ImageType::Kitchen),
            "living_room" => Ok(ImageType::LivingRoom),
            "amenity" => Ok(ImageType::Amenity),
            "view" => Ok(ImageType::View),
            "floor_plan" => Ok(ImageType::FloorPlan),
            "other" => Ok(ImageType::Other),
            other => Err(format!("\"{}\" is not a valid image type", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct MediaFile {
    pub id: Uuid,
    pub property_id: Uuid,
    pub file_url: String,
    pub file_type: MediaFileType,
    pub original_name: String,
    pub file_size: i64,
    pub checksum: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub display_order: i32,
    pub is_featured: bool,
    pub is_active: bool,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PropertyImage {
    pub id: Uuid,
    pub property_id: Uuid,
    pub file_url: String,
    pub image_type: ImageType,
    pub alt_text: Option<String>,
    pub is_primary: bool,
    pub display_order: i32,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Checks size and extension of an upload against its declared kind and
/// returns the normalised extension.
pub fn check_upload(
    file_type: MediaFileType,
    file_name: &str,
    size: usize,
) -> Result<String, String> {
    if size == 0 {
        return Err("The submitted file is empty".to_string());
    }

    if size > MAX_UPLOAD_BYTES {
        return Err(format!(
            "File size cannot exceed {}MB",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        ));
    }

    let extension = file_name
        .rfind('.')
        .map(|i| file_name[i..].to_lowercase())
        .unwrap_or_default();

    if extension.len() > 11 || !extension.chars().skip(1).all(|c| c.is_ascii_alphanumeric()) {
        return Err("File name has an invalid extension".to_string());
    }

    if let Some(allowed) = file_type.allowed_extensions() {
        if !allowed.contains(&extension.as_str()) {
            return Err(format!(
                "Unsupported file extension. Allowed: {}",
                allowed.join(", ")
            ));
        }
    }

    Ok(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_accept_known_extensions_case_insensitively() {
        assert_eq!(check_upload(MediaFileType::Image, "front.JPG", 2048), Ok(".jpg".to_string()));
        assert!(check_upload(MediaFileType::Image, "plan.pdf", 2048).is_err());
    }

    #[test]
    fn documents_and_videos_have_their_own_lists() {
        assert!(check_upload(MediaFileType::Document, "title-deed.docx", 10).is_ok());
        assert!(check_upload(MediaFileType::Video, "walkthrough.mov", 10).is_ok());
        assert!(check_upload(MediaFileType::Video, "walkthrough.mkv", 10).is_err());
    }

    #[test]
    fn virtual_tours_accept_any_extension() {
        assert!(check_upload(MediaFileType::VirtualTour, "tour.glb", 10).is_ok());
        assert!(check_upload(MediaFileType::VirtualTour, "tour", 10).is_ok());
    }

    #[test]
    fn extensions_cannot_carry_path_segments() {
        assert!(check_upload(MediaFileType::VirtualTour, "tour.x/../../etc", 10).is_err());
        assert!(check_upload(MediaFileType::VirtualTour, "tour.a b", 10).is_err());
        assert!(check_upload(MediaFileType::VirtualTour, "tour.averyveryverylongext", 10).is_err());
    }

    #[test]
    fn stored_paths_never_reach_the_client() {
        let image: PropertyImage = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "property_id": Uuid::new_v4(),
            "file_path": "/var/makazi/media/a.png",
            "file_url": "/media/a.png",
            "image_type": "exterior",
            "alt_text": null,
            "is_primary": true,
            "display_order": 0,
            "uploaded_by": Uuid::new_v4(),
            "created_at": "2026-01-10T09:00:00Z"
        }))
        .unwrap();

        let body = serde_json::to_value(&image).unwrap();
        assert!(body.get("file_path").is_none());
        assert_eq!(body["file_url"], "/media/a.png");
    }

    #[test]
    fn size_ceiling_is_ten_megabytes() {
        assert!(check_upload(MediaFileType::Image, "a.png", MAX_UPLOAD_BYTES).is_ok());
        let err = check_upload(MediaFileType::Image, "a.png", MAX_UPLOAD_BYTES + 1).unwrap_err();
        assert!(err.contains("10MB"));
        assert!(check_upload(MediaFileType::Image, "a.png", 0).is_err());
    }
}
