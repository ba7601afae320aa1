//! Multipart upload parsing and the single upload validation policy.

use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;

use crate::error::ServerError;

/// The `file` part of a multipart form plus its text fields.
pub(crate) struct Upload {
    pub data: Bytes,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub fields: HashMap<String, String>,
}

impl Upload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

pub(crate) async fn read_upload(mut multipart: Multipart) -> Result<Upload, ServerError> {
    let mut file = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let file_name = field
                .file_name()
                .map(str::to_string)
                .filter(|n| !n.is_empty());
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await?;
            file = Some((data, file_name, content_type));
        } else if !name.is_empty() {
            let value = field.text().await?;
            fields.insert(name, value);
        }
    }

    let (data, file_name, content_type) = file.ok_or_else(|| {
        ServerError::BadRequest("Missing 'file' field in multipart form".to_string())
    })?;

    Ok(Upload {
        data,
        file_name,
        content_type,
        fields,
    })
}

/// Applied by every upload entry point before anything is written.
pub(crate) fn check_upload(data: &[u8], max_size: usize) -> Result<(), ServerError> {
    if data.is_empty() {
        return Err(ServerError::Validation("File is empty".to_string()));
    }
    if data.len() > max_size {
        return Err(ServerError::Validation(format!(
            "File too large: {} bytes (max {max_size})",
            data.len()
        )));
    }
    Ok(())
}
