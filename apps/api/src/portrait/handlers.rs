use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use image::ImageFormat;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::portrait::PortraitRow;
use crate::portrait::history::{list_portraits, record_portrait_best_effort};
use crate::portrait::pipeline::{PortraitMode, PortraitRequest};
use crate::portrait::selection::{
    Background, Clothing, Color, ColorSlot, FeatureSelection, Gender, Pose,
};
use crate::state::AppState;

/// Upload formats accepted as the source photo.
const ACCEPTED_FORMATS: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

/// Raw multipart fields, before validation.
#[derive(Debug, Default)]
pub struct PortraitForm {
    pub file: Option<Bytes>,
    pub mode: Option<String>,
    pub selection: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortraitResponse {
    pub processed_image_url: String,
    pub original_image_url: String,
    pub job_id: String,
    pub mode: PortraitMode,
    pub width: u32,
    pub height: u32,
}

/// POST /api/v1/portraits
pub async fn handle_create_portrait(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<Json<PortraitResponse>, AppError> {
    let form = read_form(multipart).await?;
    let request = build_request(form, user.user_id)?;
    info!(
        user_id = %user.user_id,
        mode = %request.mode,
        bytes = request.image.len(),
        "Portrait request accepted"
    );

    let selection = request.selection;
    let result = state.pipeline.run(request).await?;
    record_portrait_best_effort(&state.db, user.user_id, selection.as_ref(), &result).await;

    Ok(Json(PortraitResponse {
        processed_image_url: result.processed_image_url,
        original_image_url: result.original_image_url,
        job_id: result.job_id,
        mode: result.mode,
        width: result.width,
        height: result.height,
    }))
}

/// GET /api/v1/portraits
pub async fn handle_list_portraits(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<PortraitRow>>, AppError> {
    let rows = list_portraits(&state.db, user.user_id).await?;
    Ok(Json(rows))
}

/// GET /api/v1/portraits/catalog
pub async fn handle_catalog() -> Json<CatalogResponse> {
    Json(catalog())
}

async fn read_form(mut multipart: Multipart) -> Result<PortraitForm, AppError> {
    let mut form = PortraitForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_rejection)?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(multipart_rejection)?;
                form.file = Some(data);
            }
            "mode" | "selection" => {
                let text = field
                    .text()
                    .await
                    .map_err(multipart_rejection)?;
                if name == "mode" {
                    form.mode = Some(text);
                } else {
                    form.selection = Some(text);
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Oversized bodies keep their 413; every other multipart failure is a malformed request.
fn multipart_rejection(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(e.body_text())
    }
}

/// Validates the raw form into a pipeline request. Every failure here is a 400.
pub fn build_request(form: PortraitForm, user_id: Uuid) -> Result<PortraitRequest, AppError> {
    let image = form
        .file
        .ok_or_else(|| AppError::Validation("Missing required 'file' field".into()))?;
    if image.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".into()));
    }

    let format = image::guess_format(&image)
        .ok()
        .filter(|f| ACCEPTED_FORMATS.contains(f))
        .ok_or_else(|| {
            AppError::Validation("Uploaded file must be a JPEG, PNG or WebP image".into())
        })?;

    let mode: PortraitMode = form
        .mode
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Missing required 'mode' field".into()))?
        .parse()
        .map_err(AppError::Validation)?;

    let selection = match mode {
        PortraitMode::Portrait => {
            let raw = form
                .selection
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| {
                    AppError::Validation("Missing required 'selection' field".into())
                })?;
            let selection = FeatureSelection::parse(raw)
                .map_err(|e| AppError::Validation(format!("Invalid selection: {e}")))?;
            Some(selection)
        }
        PortraitMode::RemoveBackground => None,
    };

    Ok(PortraitRequest {
        user_id,
        mode,
        selection,
        image,
        content_type: format.to_mime_type().to_string(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Catalog
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    pub genders: Vec<GenderOptions>,
    pub colors: Vec<DescribedOption<Color>>,
    pub poses: Vec<DescribedOption<Pose>>,
    pub backgrounds: Vec<DescribedOption<Background>>,
}

#[derive(Debug, Serialize)]
pub struct GenderOptions {
    pub gender: Gender,
    pub clothing: Vec<ClothingOption>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClothingOption {
    pub id: Clothing,
    pub required_colors: &'static [ColorSlot],
}

#[derive(Debug, Serialize)]
pub struct DescribedOption<T> {
    pub id: T,
    pub description: &'static str,
}

pub fn catalog() -> CatalogResponse {
    CatalogResponse {
        genders: Gender::ALL
            .iter()
            .map(|&gender| GenderOptions {
                gender,
                clothing: Clothing::for_gender(gender)
                    .map(|id| ClothingOption {
                        id,
                        required_colors: id.required_slots(),
                    })
                    .collect(),
            })
            .collect(),
        colors: Color::ALL
            .iter()
            .map(|&id| DescribedOption {
                id,
                description: id.description(),
            })
            .collect(),
        poses: Pose::ALL
            .iter()
            .map(|&id| DescribedOption {
                id,
                description: id.description(),
            })
            .collect(),
        backgrounds: Background::ALL
            .iter()
            .map(|&id| DescribedOption {
                id,
                description: id.description(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::extract::DefaultBodyLimit;
    use axum::http::{header, Request};
    use axum::routing::post;
    use axum::Router;
    use image::{DynamicImage, ImageBuffer, Rgb};
    use serde_json::json;
    use std::io::Cursor;
    use tower::ServiceExt;

    const SELECTION: &str = r#"{"gender":"female","clothing":"sheath-dress",
        "colors":{"main":"burgundy"},"pose":"editorial","background":"gradient-blue"}"#;

    fn photo(format: ImageFormat) -> Bytes {
        let buffer = ImageBuffer::from_pixel(4, 4, Rgb([200u8, 180, 160]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(buffer)
            .write_to(&mut out, format)
            .unwrap();
        Bytes::from(out.into_inner())
    }

    fn form(mode: Option<&str>, selection: Option<&str>) -> PortraitForm {
        PortraitForm {
            file: Some(photo(ImageFormat::Jpeg)),
            mode: mode.map(str::to_string),
            selection: selection.map(str::to_string),
        }
    }

    fn validation_message(result: Result<PortraitRequest, AppError>) -> String {
        match result {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_build_portrait_request() {
        let request = build_request(form(Some("portrait"), Some(SELECTION)), Uuid::nil()).unwrap();
        assert_eq!(request.mode, PortraitMode::Portrait);
        assert_eq!(request.content_type, "image/jpeg");
        assert_eq!(
            request.selection.map(|s| s.clothing),
            Some(Clothing::SheathDress)
        );
    }

    #[test]
    fn test_png_upload_keeps_its_type() {
        let mut f = form(Some("remove-background"), None);
        f.file = Some(photo(ImageFormat::Png));
        let request = build_request(f, Uuid::nil()).unwrap();
        assert_eq!(request.content_type, "image/png");
        assert!(request.selection.is_none());
    }

    #[test]
    fn test_missing_file_is_rejected() {
        let mut f = form(Some("portrait"), Some(SELECTION));
        f.file = None;
        assert!(validation_message(build_request(f, Uuid::nil())).contains("'file'"));
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let mut f = form(Some("portrait"), Some(SELECTION));
        f.file = Some(Bytes::new());
        assert!(validation_message(build_request(f, Uuid::nil())).contains("empty"));
    }

    #[test]
    fn test_non_image_file_is_rejected() {
        let mut f = form(Some("portrait"), Some(SELECTION));
        f.file = Some(Bytes::from_static(b"%PDF-1.7 not a photo"));
        assert!(validation_message(build_request(f, Uuid::nil())).contains("JPEG"));
    }

    #[test]
    fn test_missing_and_unknown_mode_are_rejected() {
        let missing = build_request(form(None, Some(SELECTION)), Uuid::nil());
        assert!(validation_message(missing).contains("'mode'"));

        let unknown = build_request(form(Some("cartoon"), Some(SELECTION)), Uuid::nil());
        assert!(validation_message(unknown).contains("unknown mode"));
    }

    #[test]
    fn test_portrait_requires_selection() {
        let result = build_request(form(Some("portrait"), None), Uuid::nil());
        assert!(validation_message(result).contains("'selection'"));
    }

    #[test]
    fn test_selection_missing_required_color_is_rejected() {
        let incomplete = r#"{"gender":"male","clothing":"suit-and-tie",
            "colors":{"main":"navy","shirt":"white"},"pose":"professional","background":"studio-white"}"#;
        let result = build_request(form(Some("portrait"), Some(incomplete)), Uuid::nil());
        let message = validation_message(result);
        assert!(message.contains("requires a 'tie' color"), "{message}");
    }

    #[test]
    fn test_malformed_selection_is_rejected() {
        let result = build_request(form(Some("portrait"), Some("{not json")), Uuid::nil());
        assert!(validation_message(result).starts_with("Invalid selection"));
    }

    #[test]
    fn test_catalog_lists_required_slots() {
        let value = serde_json::to_value(catalog()).unwrap();
        let male = &value["genders"][0];
        assert_eq!(male["gender"], json!("male"));
        assert_eq!(
            male["clothing"][1],
            json!({"id": "suit-and-tie", "requiredColors": ["main", "shirt", "tie"]})
        );
        assert_eq!(value["colors"].as_array().unwrap().len(), Color::ALL.len());
        assert_eq!(
            value["backgrounds"].as_array().unwrap().len(),
            Background::ALL.len()
        );
    }

    /// Accepts a form and answers with the uploaded file's length.
    fn form_router(limit: usize) -> Router {
        Router::new()
            .route(
                "/",
                post(|multipart: Multipart| async move {
                    read_form(multipart)
                        .await
                        .map(|form| form.file.map_or(0, |f| f.len()).to_string())
                }),
            )
            .layer(DefaultBodyLimit::max(limit))
    }

    fn multipart_request(file: &[u8]) -> Request<Body> {
        let mut body = concat!(
            "--x\r\n",
            "Content-Disposition: form-data; name=\"mode\"\r\n\r\n",
            "portrait\r\n",
            "--x\r\n",
            "Content-Disposition: form-data; name=\"file\"; filename=\"me.jpg\"\r\n",
            "Content-Type: image/jpeg\r\n\r\n",
        )
        .as_bytes()
        .to_vec();
        body.extend_from_slice(file);
        body.extend_from_slice(b"\r\n--x--\r\n");

        Request::post("/")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=x")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_oversized_upload_is_payload_too_large() {
        let response = form_router(64)
            .oneshot(multipart_request(&[7u8; 512]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_upload_within_limit_is_read() {
        let response = form_router(4096)
            .oneshot(multipart_request(&[7u8; 512]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"512");
    }
}
