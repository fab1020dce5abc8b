//! Upload validation and plain-text extraction.

use std::path::Path;

use tracing::warn;

use crate::errors::AppError;

/// Extensions whose text can be indexed.
const TEXT_EXTENSIONS: &[&str] = &["txt", "text"];
const PDF_EXTENSIONS: &[&str] = &["pdf"];
/// Image uploads are recognised but cannot be indexed without OCR.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    PlainText,
    Pdf,
}

impl FileFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            FileFormat::PlainText => "text/plain; charset=utf-8",
            FileFormat::Pdf => "application/pdf",
        }
    }
}

/// Reduces an uploaded filename to a safe single path component.
///
/// Drops any directory part (`/` or `\`), turns whitespace runs into `_`, keeps
/// ASCII alphanumerics plus `.`, `-`, `_`, and strips leading/trailing `.` and `_`.
pub fn sanitize_filename(name: &str) -> Result<String, AppError> {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or("");

    let mut cleaned = String::with_capacity(base.len());
    let mut in_whitespace = false;
    for c in base.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                cleaned.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            cleaned.push(c);
        }
    }

    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c == '_').to_string();
    if cleaned.is_empty() {
        return Err(AppError::Validation(format!(
            "'{name}' is not a usable filename"
        )));
    }
    Ok(cleaned)
}

/// Determines the format from the extension, rejecting what cannot be indexed.
pub fn detect_format(filename: &str) -> Result<FileFormat, AppError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    if TEXT_EXTENSIONS.contains(&extension.as_str()) {
        Ok(FileFormat::PlainText)
    } else if PDF_EXTENSIONS.contains(&extension.as_str()) {
        Ok(FileFormat::Pdf)
    } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        Err(AppError::UnprocessableEntity(format!(
            "'{filename}' is an image; only text and PDF files can be ranked"
        )))
    } else {
        Err(AppError::Validation(format!(
            "'{filename}' has an unsupported file type. Allowed: txt, text, pdf"
        )))
    }
}

/// Extracts indexable text from an uploaded file.
/// PDF parsing runs on a blocking thread; parser failures and panics surface as 422.
pub async fn extract_text(
    filename: &str,
    format: FileFormat,
    data: bytes::Bytes,
) -> Result<String, AppError> {
    let text = match format {
        FileFormat::PlainText => String::from_utf8_lossy(&data).into_owned(),
        FileFormat::Pdf => {
            let parsed = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_from_mem(&data).map_err(|e| e.to_string())
            })
            .await;
            match parsed {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    warn!("PDF extraction failed for {filename}: {e}");
                    return Err(AppError::UnprocessableEntity(format!(
                        "could not read text from '{filename}'"
                    )));
                }
                Err(e) => {
                    warn!("PDF parser aborted on {filename}: {e}");
                    return Err(AppError::UnprocessableEntity(format!(
                        "could not read text from '{filename}'"
                    )));
                }
            }
        }
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::UnprocessableEntity(format!(
            "'{filename}' contains no readable text"
        )));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(
            sanitize_filename(r"C:\Users\hr\Jane Doe CV.pdf").unwrap(),
            "Jane_Doe_CV.pdf"
        );
    }

    #[test]
    fn test_sanitize_drops_unsafe_characters() {
        assert_eq!(sanitize_filename("résumé (final)!.txt").unwrap(), "rsum_final.txt");
        assert_eq!(sanitize_filename("  spaced   out .txt").unwrap(), "spaced_out_.txt");
    }

    #[test]
    fn test_sanitize_strips_leading_dots() {
        assert_eq!(sanitize_filename(".hidden.txt").unwrap(), "hidden.txt");
    }

    #[test]
    fn test_sanitize_rejects_empty_result() {
        assert!(matches!(sanitize_filename("..."), Err(AppError::Validation(_))));
        assert!(matches!(sanitize_filename("dir/"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("cv.PDF").unwrap(), FileFormat::Pdf);
        assert_eq!(detect_format("cv.txt").unwrap(), FileFormat::PlainText);
        assert_eq!(detect_format("jd.text").unwrap(), FileFormat::PlainText);
    }

    #[test]
    fn test_images_are_unprocessable() {
        assert!(matches!(
            detect_format("scan.jpeg"),
            Err(AppError::UnprocessableEntity(_))
        ));
    }

    #[test]
    fn test_unknown_extension_is_invalid() {
        assert!(matches!(detect_format("cv.docx"), Err(AppError::Validation(_))));
        assert!(matches!(detect_format("README"), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_plain_text_extraction_trims() {
        let text = extract_text(
            "cv.txt",
            FileFormat::PlainText,
            bytes::Bytes::from_static(b"\n  Rust engineer  \n"),
        )
        .await
        .unwrap();
        assert_eq!(text, "Rust engineer");
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_decoded_lossily() {
        let text = extract_text(
            "cv.txt",
            FileFormat::PlainText,
            bytes::Bytes::from_static(b"Go \xff developer"),
        )
        .await
        .unwrap();
        assert!(text.starts_with("Go "));
        assert!(text.ends_with(" developer"));
    }

    #[tokio::test]
    async fn test_blank_file_is_unprocessable() {
        let err = extract_text("cv.txt", FileFormat::PlainText, bytes::Bytes::from_static(b"  \n"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
    }

    #[tokio::test]
    async fn test_garbage_pdf_is_unprocessable() {
        let err = extract_text(
            "cv.pdf",
            FileFormat::Pdf,
            bytes::Bytes::from_static(b"definitely not a pdf"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
    }
}
