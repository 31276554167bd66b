use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::Deserialize;

use crate::{error::ApiError, media::UploadItem};

/// JSON body for registration. File parts are only accepted via multipart.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
}

/// Registration input as received, before any validation.
#[derive(Debug, Default)]
pub struct RegisterForm {
    pub fields: RegisterRequest,
    pub avatar: Option<UploadItem>,
    pub cover_image: Option<UploadItem>,
}

#[async_trait]
impl<S> FromRequest<S> for RegisterForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("multipart/form-data"))
            .unwrap_or(false);

        if !is_multipart {
            let Json(fields) = Json::<RegisterRequest>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            return Ok(Self {
                fields,
                ..Self::default()
            });
        }

        let mut mp = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        let mut form = Self::default();
        while let Some(field) = mp
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "avatar" | "coverImage" => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let body = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                    // an empty file input submits a zero-length part
                    if body.is_empty() {
                        continue;
                    }
                    let item = Some(UploadItem { body, content_type });
                    if name == "avatar" {
                        form.avatar = item;
                    } else {
                        form.cover_image = item;
                    }
                }
                "username" | "email" | "fullName" | "password" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                    let slot = match name.as_str() {
                        "username" => &mut form.fields.username,
                        "email" => &mut form.fields.email,
                        "fullName" => &mut form.fields.full_name,
                        _ => &mut form.fields.password,
                    };
                    *slot = Some(text);
                }
                _ => {}
            }
        }
        Ok(form)
    }
}
