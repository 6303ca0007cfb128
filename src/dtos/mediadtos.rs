use std::collections::HashMap;

use serde::Deserialize;
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::{
    models::mediamodel::{ImageType, MediaFileType},
    utils::text::sanitize,
};

/// Raw multipart content: text parts by name plus the single `file` part.
#[derive(Debug, Default)]
pub struct UploadFields {
    pub text: HashMap<String, String>,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct MediaUploadDto {
    pub property_id: Uuid,
    pub file_type: MediaFileType,
    pub title: Option<String>,
    pub description: Option<String>,
    pub display_order: i32,
    pub is_featured: bool,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct ImageUploadDto {
    pub property_id: Uuid,
    pub image_type: ImageType,
    pub alt_text: Option<String>,
    pub is_primary: bool,
    pub display_order: i32,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Deserialize)]
pub struct MediaQueryDto {
    pub property_id: Uuid,
}

fn field_error(errors: &mut ValidationErrors, field: &'static str, message: String) {
    let mut err = ValidationError::new(field);
    err.message = Some(message.into());
    errors.add(field, err);
}

struct FormReader<'a> {
    fields: &'a HashMap<String, String>,
    errors: ValidationErrors,
}

impl<'a> FormReader<'a> {
    fn new(fields: &'a HashMap<String, String>) -> Self {
        FormReader {
            fields,
            errors: ValidationErrors::new(),
        }
    }

    fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(sanitize)
    }

    fn parsed<T>(&mut self, name: &'static str, parse: impl Fn(&str) -> Result<T, String>) -> Option<T> {
        let fields: &'a HashMap<String, String> = self.fields;
        let raw = fields.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())?;
        match parse(raw) {
            Ok(v) => Some(v),
            Err(msg) => {
                field_error(&mut self.errors, name, msg);
                None
            }
        }
    }

    fn flag(&mut self, name: &'static str) -> bool {
        self.parsed(name, |v| match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "on" => Ok(true),
            "false" | "0" | "off" => Ok(false),
            _ => Err(format!("\"{}\" is not a valid boolean", v)),
        })
        .unwrap_or(false)
    }

    fn order(&mut self) -> i32 {
        self.parsed("order", |v| {
            v.parse::<i32>()
                .ok()
                .filter(|n| *n >= 0)
                .ok_or_else(|| "Order must be a non-negative whole number".to_string())
        })
        .unwrap_or(0)
    }

    fn property_id(&mut self) -> Option<Uuid> {
        let id = self.parsed("property_id", |v| {
            Uuid::parse_str(v).map_err(|_| "Must be a valid UUID".to_string())
        });
        if id.is_none() && !self.errors.field_errors().contains_key("property_id") {
            field_error(&mut self.errors, "property_id", "This field is required".to_string());
        }
        id
    }

    fn file(&mut self, upload: &UploadFields) -> Option<String> {
        match &upload.file_name {
            Some(name) => Some(name.clone()),
            None => {
                field_error(&mut self.errors, "file", "No file was submitted".to_string());
                None
            }
        }
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

impl MediaUploadDto {
    pub fn from_fields(upload: UploadFields) -> Result<Self, ValidationErrors> {
        let mut form = FormReader::new(&upload.text);
        let property_id = form.property_id();
        let file_type = form
            .parsed("file_type", |v| v.parse::<MediaFileType>())
            .unwrap_or(MediaFileType::Image);
        let title = form.text("title");
        let description = form.text("description");
        let display_order = form.order();
        let is_featured = form.flag("is_featured");
        let file_name = form.file(&upload);
        form.finish()?;

        match (property_id, file_name) {
            (Some(property_id), Some(file_name)) => Ok(MediaUploadDto {
                property_id,
                file_type,
                title,
                description,
                display_order,
                is_featured,
                file_name,
                bytes: upload.bytes,
            }),
            _ => Err(ValidationErrors::new()),
        }
    }
}

impl ImageUploadDto {
    pub fn from_fields(upload: UploadFields) -> Result<Self, ValidationErrors> {
        let mut form = FormReader::new(&upload.text);
        let property_id = form.property_id();
        let image_type = form
            .parsed("image_type", |v| v.parse::<ImageType>())
            .unwrap_or(ImageType::Other);
        let alt_text = form.text("alt_text");
        let is_primary = form.flag("is_primary");
        let display_order = form.order();
        let file_name = form.file(&upload);
        form.finish()?;

        match (property_id, file_name) {
            (Some(property_id), Some(file_name)) => Ok(ImageUploadDto {
                property_id,
                image_type,
                alt_text,
                is_primary,
                display_order,
                file_name,
                bytes: upload.bytes,
            }),
            _ => Err(ValidationErrors::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)], file: Option<&str>) -> UploadFields {
        UploadFields {
            text: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            file_name: file.map(str::to_string),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn media_upload_defaults_to_image() {
        let id = Uuid::new_v4().to_string();
        let dto = MediaUploadDto::from_fields(fields(
            &[("property_id", id.as_str()), ("title", "Front <b>view</b>")],
            Some("front.png"),
        ))
        .unwrap();
        assert_eq!(dto.file_type, MediaFileType::Image);
        assert_eq!(dto.title.as_deref(), Some("Front view"));
        assert_eq!(dto.display_order, 0);
        assert!(!dto.is_featured);
    }

    #[test]
    fn missing_property_and_file_are_reported_together() {
        let err = MediaUploadDto::from_fields(fields(&[("file_type", "hologram")], None)).unwrap_err();
        let keys = err.field_errors();
        assert!(keys.contains_key("property_id"));
        assert!(keys.contains_key("file"));
        assert!(keys.contains_key("file_type"));
    }

    #[test]
    fn image_upload_reads_flags_and_type() {
        let id = Uuid::new_v4().to_string();
        let dto = ImageUploadDto::from_fields(fields(
            &[
                ("property_id", id.as_str()),
                ("image_type", "living_room"),
                ("is_primary", "true"),
                ("order", "3"),
            ],
            Some("salon.jpg"),
        ))
        .unwrap();
        assert_eq!(dto.image_type, ImageType::LivingRoom);
        assert!(dto.is_primary);
        assert_eq!(dto.display_order, 3);
    }

    #[test]
    fn negative_order_is_rejected() {
        let id = Uuid::new_v4().to_string();
        let err = ImageUploadDto::from_fields(fields(&[("property_id", id.as_str()), ("order", "-2")], Some("a.jpg")))
            .unwrap_err();
        assert!(err.field_errors().contains_key("order"));
    }
}
