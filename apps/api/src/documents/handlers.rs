//! Axum route handlers for the Documents API.

use axum::{
    extract::{Multipart, Path, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use bytes::Bytes;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::documents::extract::{detect_format, extract_text, sanitize_filename, FileFormat};
use crate::documents::store::{
    delete_document, get_document, get_document_by_filename, list_documents, save_documents,
    NewDocument,
};
use crate::errors::AppError;
use crate::models::document::{DocumentKind, DocumentSummary};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub documents: Vec<DocumentSummary>,
}

#[derive(Debug, Serialize)]
pub struct DocumentDetailResponse {
    #[serde(flatten)]
    pub document: DocumentSummary,
    pub extracted_text: String,
}

/// One multipart field, read into memory.
#[derive(Debug)]
struct FormPart {
    name: String,
    file_name: Option<String>,
    data: Bytes,
}

impl FormPart {
    /// Browsers send an empty file part when no file was picked.
    fn is_empty_file(&self) -> bool {
        self.file_name.as_deref().unwrap_or("").is_empty() && self.data.is_empty()
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// A validated upload whose text has already been extracted.
#[derive(Debug)]
struct PreparedUpload {
    filename: String,
    format: FileFormat,
    data: Bytes,
    text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Upload helpers
// ────────────────────────────────────────────────────────────────────────────

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("malformed upload: {e}"))
}

async fn read_parts(mut multipart: Multipart) -> Result<Vec<FormPart>, AppError> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;
        parts.push(FormPart {
            name,
            file_name,
            data,
        });
    }
    Ok(parts)
}

/// Files sent in the `resumes` field, in upload order.
fn resume_files(parts: Vec<FormPart>) -> Result<Vec<(String, Bytes)>, AppError> {
    let files: Vec<(String, Bytes)> = parts
        .into_iter()
        .filter(|part| part.name == "resumes" && !part.is_empty_file())
        .map(|part| (part.file_name.unwrap_or_default(), part.data))
        .collect();

    if files.is_empty() {
        return Err(AppError::Validation(
            "no resume files found in field 'resumes'".to_string(),
        ));
    }
    Ok(files)
}

/// Picks the job description to store: an uploaded `file` wins over a pasted
/// `name` + `text` pair, which is stored as `<name>.txt`.
fn job_description_source(parts: Vec<FormPart>) -> Result<(String, Bytes), AppError> {
    let mut file = None;
    let mut name = None;
    let mut text = None;

    for part in parts {
        match part.name.as_str() {
            "file" if !part.is_empty_file() => {
                file = Some((part.file_name.clone().unwrap_or_default(), part.data))
            }
            "name" => name = Some(part.text()),
            "text" => text = Some(part.text()),
            _ => {}
        }
    }

    match (file, name, text) {
        (Some(file), _, _) => Ok(file),
        (None, Some(name), Some(text)) => {
            let name = name.trim();
            let stem = name.strip_suffix(".txt").unwrap_or(name).trim();
            if stem.is_empty() {
                return Err(AppError::Validation(
                    "job description name cannot be empty".to_string(),
                ));
            }
            Ok((format!("{stem}.txt"), Bytes::from(text)))
        }
        _ => Err(AppError::Validation(
            "provide a 'file' field or both 'name' and 'text'".to_string(),
        )),
    }
}

async fn prepare_upload(raw_filename: &str, data: Bytes) -> Result<PreparedUpload, AppError> {
    let filename = sanitize_filename(raw_filename)?;
    let format = detect_format(&filename)?;
    let text = extract_text(&filename, format, data.clone()).await?;
    Ok(PreparedUpload {
        filename,
        format,
        data,
        text,
    })
}

/// Validates and extracts every file; the first failure rejects the whole batch.
async fn prepare_uploads(files: Vec<(String, Bytes)>) -> Result<Vec<PreparedUpload>, AppError> {
    let mut uploads = Vec::with_capacity(files.len());
    for (raw_filename, data) in files {
        uploads.push(prepare_upload(&raw_filename, data).await?);
    }
    Ok(uploads)
}

async fn store_uploads(
    state: &AppState,
    kind: DocumentKind,
    uploads: &[PreparedUpload],
) -> Result<Vec<DocumentSummary>, AppError> {
    let docs = uploads
        .iter()
        .map(|upload| NewDocument {
            kind,
            filename: &upload.filename,
            content_type: upload.format.content_type(),
            data: upload.data.clone(),
            extracted_text: &upload.text,
        })
        .collect();

    let rows = save_documents(&state.db, &state.objects, docs).await?;
    Ok(rows.iter().map(DocumentSummary::from).collect())
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resumes
///
/// Multipart upload of one or more `resumes` file fields. Every file is validated
/// and extracted before anything is stored.
pub async fn handle_upload_resumes(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> Result<Json<UploadResponse>, AppError> {
    let files = resume_files(read_parts(multipart).await?)?;
    let uploads = prepare_uploads(files).await?;

    let documents = store_uploads(&state, DocumentKind::Resume, &uploads).await?;
    info!("{} uploaded {} resume(s)", user.username, documents.len());
    Ok(Json(UploadResponse { documents }))
}

/// POST /api/v1/job-descriptions
///
/// Multipart upload of either a `file` field or a pasted `name` + `text` pair.
pub async fn handle_upload_job_description(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> Result<Json<UploadResponse>, AppError> {
    let (raw_filename, data) = job_description_source(read_parts(multipart).await?)?;
    let upload = prepare_upload(&raw_filename, data).await?;

    let documents = store_uploads(&state, DocumentKind::JobDescription, &[upload]).await?;
    info!("{} uploaded job description {}", user.username, upload_name(&documents));
    Ok(Json(UploadResponse { documents }))
}

fn upload_name(documents: &[DocumentSummary]) -> &str {
    documents.first().map_or("", |d| d.filename.as_str())
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentSummary>>, AppError> {
    Ok(Json(list_documents(&state.db, DocumentKind::Resume).await?))
}

/// GET /api/v1/job-descriptions
pub async fn handle_list_job_descriptions(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentSummary>>, AppError> {
    Ok(Json(
        list_documents(&state.db, DocumentKind::JobDescription).await?,
    ))
}

/// GET /api/v1/documents/:id
pub async fn handle_get_document(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<DocumentDetailResponse>, AppError> {
    let row = get_document(&state.db, id).await?;
    Ok(Json(DocumentDetailResponse {
        document: DocumentSummary::from(&row),
        extracted_text: row.extracted_text,
    }))
}

/// DELETE /api/v1/documents/:id
pub async fn handle_delete_document(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, AppError> {
    let row = delete_document(&state.db, &state.objects, id).await?;
    info!("{} deleted {} {}", user.username, row.kind, row.filename);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /original-resumes/:filename
///
/// Streams back the stored original so it opens inline in the browser.
pub async fn handle_original_resume(
    State(state): State<AppState>,
    WithRejection(Path(filename), _): WithRejection<Path<String>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let filename = sanitize_filename(&filename)?;
    let row = get_document_by_filename(&state.db, DocumentKind::Resume, &filename).await?;
    let data = state.objects.get(&row.s3_key).await?;

    Ok((
        [
            (CONTENT_TYPE, row.content_type),
            (
                CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", row.filename),
            ),
        ],
        data,
    ))
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, extract::FromRequest, http::Request};

    use super::*;

    fn file(name: &str, file_name: &str, data: &'static str) -> FormPart {
        FormPart {
            name: name.to_string(),
            file_name: Some(file_name.to_string()),
            data: Bytes::from_static(data.as_bytes()),
        }
    }

    fn field(name: &str, value: &'static str) -> FormPart {
        FormPart {
            name: name.to_string(),
            file_name: None,
            data: Bytes::from_static(value.as_bytes()),
        }
    }

    #[tokio::test]
    async fn test_read_parts_from_multipart_body() {
        let body = "--XBOUNDARY\r\n\
            Content-Disposition: form-data; name=\"resumes\"; filename=\"jane.txt\"\r\n\
            Content-Type: text/plain\r\n\r\n\
            Rust engineer\r\n\
            --XBOUNDARY\r\n\
            Content-Disposition: form-data; name=\"name\"\r\n\r\n\
            Backend\r\n\
            --XBOUNDARY--\r\n";
        let request = Request::post("/")
            .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap();
        let multipart = Multipart::from_request(request, &()).await.unwrap();

        let parts = read_parts(multipart).await.unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name, "resumes");
        assert_eq!(parts[0].file_name.as_deref(), Some("jane.txt"));
        assert_eq!(&parts[0].data[..], b"Rust engineer");
        assert_eq!(parts[1].name, "name");
        assert_eq!(parts[1].text(), "Backend");
    }

    #[test]
    fn test_resume_files_keep_upload_order() {
        let files = resume_files(vec![
            file("resumes", "b.txt", "Go developer"),
            field("note", "ignored"),
            file("resumes", "a.txt", "Rust engineer"),
        ])
        .unwrap();
        let names: Vec<&str> = files.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["b.txt", "a.txt"]);
    }

    #[test]
    fn test_no_resume_files_is_rejected() {
        let err = resume_files(vec![field("note", "hello"), file("resumes", "", "")]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_pasted_job_description_stored_as_txt() {
        let (filename, data) = job_description_source(vec![
            field("name", " Backend Engineer "),
            field("text", "Rust services"),
        ])
        .unwrap();
        assert_eq!(filename, "Backend Engineer.txt");
        assert_eq!(&data[..], b"Rust services");
    }

    #[test]
    fn test_pasted_name_with_txt_suffix_not_doubled() {
        let (filename, _) =
            job_description_source(vec![field("name", "backend.txt"), field("text", "Rust")])
                .unwrap();
        assert_eq!(filename, "backend.txt");
    }

    #[test]
    fn test_uploaded_file_wins_over_pasted_text() {
        let (filename, data) = job_description_source(vec![
            field("name", "pasted"),
            field("text", "pasted text"),
            file("file", "backend.pdf", "%PDF"),
        ])
        .unwrap();
        assert_eq!(filename, "backend.pdf");
        assert_eq!(&data[..], b"%PDF");
    }

    #[test]
    fn test_empty_file_part_falls_back_to_pasted_text() {
        let (filename, _) = job_description_source(vec![
            file("file", "", ""),
            field("name", "backend"),
            field("text", "Rust"),
        ])
        .unwrap();
        assert_eq!(filename, "backend.txt");
    }

    #[test]
    fn test_blank_job_description_name_rejected() {
        for name in ["", "   ", ".txt"] {
            let err = job_description_source(vec![field("name", name), field("text", "Rust")])
                .unwrap_err();
            assert!(
                matches!(err, AppError::Validation(ref m) if m.contains("name cannot be empty")),
                "{name:?}"
            );
        }
    }

    #[test]
    fn test_job_description_needs_file_or_name_and_text() {
        let err = job_description_source(vec![field("text", "Rust")]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_one_invalid_file_rejects_whole_batch() {
        let err = prepare_uploads(vec![
            ("jane.txt".to_string(), Bytes::from_static(b"Rust engineer")),
            ("john.docx".to_string(), Bytes::from_static(b"binary")),
        ])
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_valid_batch_is_fully_prepared() {
        let uploads = prepare_uploads(vec![
            ("Jane Doe.txt".to_string(), Bytes::from_static(b" Rust engineer ")),
            ("john.text".to_string(), Bytes::from_static(b"Go developer")),
        ])
        .await
        .unwrap();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].filename, "Jane_Doe.txt");
        assert_eq!(uploads[0].text, "Rust engineer");
        assert_eq!(uploads[1].format, FileFormat::PlainText);
    }
}
