//! Typed inputs for the write operations, validated before any store access.

use std::fmt;

use bytes::Bytes;

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const INVALID_GROUP_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const EMPTY_FILE_MESSAGE: &str = "The submitted file is empty.";
pub const INVALID_IMAGE_MESSAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Field-level validation messages collected for one form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    entries: Vec<FieldError>,
}

impl FormErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.entries.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FieldError] {
        &self.entries
    }

    pub fn for_field(&self, field: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.field == field)
            .map(|entry| entry.message.clone())
            .collect()
    }

    pub fn extend(&mut self, other: FormErrors) {
        self.entries.extend(other.entries);
    }

    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for entry in &self.entries {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", entry.field, entry.message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct CreatePostInput {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<ImageUpload>,
}

impl CreatePostInput {
    /// Check everything that does not need the store. Group existence is
    /// checked by the post service.
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();

        if self.text.trim().is_empty() {
            errors.push("text", REQUIRED_MESSAGE);
        }

        if let Some(image) = self.image.as_ref() {
            if image.bytes.is_empty() {
                errors.push("image", EMPTY_FILE_MESSAGE);
            } else if imagesize::blob_size(&image.bytes).is_err() {
                errors.push("image", INVALID_IMAGE_MESSAGE);
            }
        }

        errors.into_result()
    }

    pub fn normalized_text(&self) -> String {
        self.text.trim().to_string()
    }
}

/// Parse the submitted `group` choice; a blank value means no group.
pub fn parse_group_choice(raw: &str) -> Result<Option<i64>, FormErrors> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>().map(Some).map_err(|_| {
        let mut errors = FormErrors::default();
        errors.push("group", INVALID_GROUP_MESSAGE);
        errors
    })
}

#[derive(Debug, Clone, Default)]
pub struct CreateCommentInput {
    pub text: String,
}

impl CreateCommentInput {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        if self.text.trim().is_empty() {
            errors.push("text", REQUIRED_MESSAGE);
        }
        errors.into_result()
    }

    pub fn normalized_text(&self) -> String {
        self.text.trim().to_string()
    }
}
