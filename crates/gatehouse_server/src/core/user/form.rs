use axum::extract::Multipart;
use bytes::Bytes;
use gatehouse_error::error::ServerError;
use std::collections::HashMap;

pub const IMAGE_FIELD: &str = "image";

/// Text fields and the optional image part of a multipart account form
#[derive(Debug, Default)]
pub struct UserForm {
    pub fields: HashMap<String, String>,
    pub image: Option<Bytes>,
}

impl UserForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut form = UserForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServerError::MultipartError(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == IMAGE_FIELD {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::MultipartError(e.to_string()))?;

                // browsers send an empty part when no file was picked
                if !data.is_empty() {
                    form.image = Some(data);
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ServerError::MultipartError(e.to_string()))?;
            form.fields.insert(name, value);
        }

        Ok(form)
    }

    /// Trimmed value of a field, None when absent or blank
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Raw value of a field, used for passwords which are never trimmed
    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.as_str())
            .filter(|value| !value.is_empty())
    }

    #[cfg(test)]
    pub fn with_fields(fields: &[(&str, &str)]) -> Self {
        UserForm {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            image: None,
        }
    }
}
