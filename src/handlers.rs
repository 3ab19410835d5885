// src/handlers.rs
use crate::services::image_processor::MAX_UPLOAD_BYTES;
use crate::services::prompt_builder::build_prompt;
use crate::services::ImageProcessor;
use crate::{AppState, errors::TryOnError, models::*};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, http::header, web};
use base64::{Engine as _, engine::general_purpose};
use futures_util::TryStreamExt;
use log::{debug, error, info};
use uuid::Uuid;

struct TryOnForm {
    photo: Vec<u8>,
    style: StylePreference,
    custom_prompt: String,
}

pub async fn create_session(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let session_id = data.sessions.create();
    info!("Created session {}", session_id);

    Ok(HttpResponse::Created().json(serde_json::json!({ "session_id": session_id })))
}

pub async fn delete_session(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    data.sessions.remove(&path.into_inner())?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn list_styles() -> HttpResponse {
    let styles: Vec<&str> = StylePreference::ALL.iter().map(|s| s.as_str()).collect();
    HttpResponse::Ok().json(serde_json::json!({ "styles": styles }))
}

pub async fn list_models(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let models = data.generation_client.list_models().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "models": models })))
}

pub async fn try_on(
    path: web::Path<Uuid>,
    payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    // Fail before spending a generation on a dead session.
    data.sessions.with_session(&session_id, |_| ())?;

    let form = read_tryon_form(payload).await?;

    let photo = data.image_processor.decode(&form.photo)?;
    let photo = data.image_processor.optimize(photo);
    let png = data.image_processor.encode_png(&photo)?;

    let prompt = build_prompt(form.style, &form.custom_prompt);
    let request = GenerationRequest::png(png, prompt);

    let output = data
        .generation_client
        .generate(&request)
        .await
        .inspect_err(|e| {
            error!(
                "Try-on failed for session {} ({:?}): {}",
                session_id,
                e.user_facing_kind(),
                e
            )
        })?;

    let result = GenerationResult::new(form.style, output, request.into_image_bytes());
    let result = data
        .sessions
        .with_session(&session_id, |store| store.record(result))?;

    let images = image_payloads(&data.image_processor, &result);
    let warning = result.images.is_empty().then(|| {
        "No images were generated. Please try again or check your prompt.".to_string()
    });

    Ok(HttpResponse::Ok().json(TryOnResponse {
        session_id,
        result: result.summary(),
        text: result.text.clone(),
        images,
        warning,
    }))
}

pub async fn get_history(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let (total, entries) = data.sessions.with_session(&session_id, |store| {
        let entries: Vec<_> = store.history().iter().map(|r| r.summary()).collect();
        (store.len(), entries)
    })?;

    Ok(HttpResponse::Ok().json(HistoryResponse {
        session_id,
        total,
        entries,
    }))
}

pub async fn clear_history(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    data.sessions.with_session(&session_id, |store| store.clear())?;
    info!("Cleared history for session {}", session_id);

    Ok(HttpResponse::NoContent().finish())
}

pub async fn get_latest(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let latest = data
        .sessions
        .with_session(&session_id, |store| store.latest())?
        .ok_or_else(|| TryOnError::NotFound("No result generated yet".to_string()))?;

    Ok(HttpResponse::Ok().json(latest.summary()))
}

pub async fn download_image(
    path: web::Path<(Uuid, Uuid, usize)>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (session_id, result_id, index) = path.into_inner();
    let result = find_result(&data, &session_id, &result_id)?;
    let image = result.images.get(index).ok_or_else(|| {
        TryOnError::NotFound(format!("Result {} has no image {}", result_id, index))
    })?;

    Ok(HttpResponse::Ok()
        .content_type(image.mime_type.as_str())
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", result.download_filename(index)),
        ))
        .body(image.data.clone()))
}

pub async fn download_original(
    path: web::Path<(Uuid, Uuid)>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (session_id, result_id) = path.into_inner();
    let result = find_result(&data, &session_id, &result_id)?;

    Ok(HttpResponse::Ok()
        .content_type(PNG_MIME)
        .body(result.original_png.clone()))
}

fn find_result(
    data: &AppState,
    session_id: &Uuid,
    result_id: &Uuid,
) -> Result<std::sync::Arc<GenerationResult>, TryOnError> {
    data.sessions
        .with_session(session_id, |store| store.get(result_id))?
        .ok_or_else(|| TryOnError::NotFound(format!("Result {} not found", result_id)))
}

async fn read_tryon_form(mut payload: Multipart) -> Result<TryOnForm, Error> {
    let mut photo = None;
    let mut style = StylePreference::default();
    let mut custom_prompt = String::new();

    while let Some(mut field) = payload.try_next().await? {
        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(TryOnError::Validation(format!(
                    "Field '{}' exceeds {} bytes",
                    name, MAX_UPLOAD_BYTES
                ))
                .into());
            }
            bytes.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "photo" => photo = Some(bytes),
            "style" => {
                let text = field_text(&name, bytes)?;
                if !text.trim().is_empty() {
                    style = text.parse::<StylePreference>()?;
                }
            }
            "custom_prompt" => custom_prompt = field_text(&name, bytes)?,
            other => debug!("Ignoring unexpected form field '{}'", other),
        }
    }

    let photo =
        photo.ok_or_else(|| TryOnError::Validation("Missing 'photo' file field".to_string()))?;

    Ok(TryOnForm {
        photo,
        style,
        custom_prompt,
    })
}

fn field_text(name: &str, bytes: Vec<u8>) -> Result<String, TryOnError> {
    String::from_utf8(bytes)
        .map_err(|_| TryOnError::Validation(format!("Field '{}' must be UTF-8 text", name)))
}

fn image_payloads(processor: &ImageProcessor, result: &GenerationResult) -> Vec<ImagePayload> {
    result
        .images
        .iter()
        .enumerate()
        .map(|(index, image)| {
            let mut payload = ImagePayload {
                index,
                mime_type: image.mime_type.clone(),
                size: image.data.len(),
                filename: result.download_filename(index),
                dimensions: None,
                data_base64: None,
                display_error: None,
            };

            match processor.inspect_generated(&image.data) {
                Ok(dimensions) => {
                    payload.dimensions = Some(dimensions);
                    payload.data_base64 = Some(general_purpose::STANDARD.encode(&image.data));
                }
                Err(e) => {
                    error!("Could not display image {}: {}", index + 1, e);
                    payload.display_error = Some(e.to_string());
                }
            }
            payload
        })
        .collect()
}
