//! Resume extraction: document text, then best-effort contact fields.
//!
//! Extraction never decides anything on its own: whatever is not found here is
//! collected later by the profile chat.

use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::candidate::{CandidateProfile, ProfileField};

/// Uploads larger than this are rejected before parsing.
pub const MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const TEXT_MIME: &str = "text/plain";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type '{0}'. Please upload a PDF, DOCX or text file.")]
    UnsupportedType(String),

    #[error("Uploaded file is empty")]
    Empty,

    #[error("File size must be less than {} MB", MAX_RESUME_BYTES / (1024 * 1024))]
    TooLarge,

    #[error("Could not read PDF: {0}")]
    Pdf(String),

    #[error("Extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

impl DocumentKind {
    /// Content type wins; the file extension is only consulted when the
    /// client sent none or a generic octet-stream.
    pub fn detect(
        content_type: Option<&str>,
        file_name: Option<&str>,
    ) -> Result<Self, ExtractError> {
        let mime = content_type
            .map(|c| c.split(';').next().unwrap_or(c).trim().to_ascii_lowercase())
            .filter(|c| !c.is_empty() && c != "application/octet-stream");

        if let Some(mime) = mime {
            return match mime.as_str() {
                PDF_MIME => Ok(DocumentKind::Pdf),
                DOCX_MIME => Ok(DocumentKind::Docx),
                TEXT_MIME => Ok(DocumentKind::Text),
                other => Err(ExtractError::UnsupportedType(other.to_string())),
            };
        }

        let ext = file_name
            .and_then(|n| n.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            "docx" => Ok(DocumentKind::Docx),
            "txt" => Ok(DocumentKind::Text),
            _ => Err(ExtractError::UnsupportedType(
                file_name.unwrap_or("unknown").to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedResume {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumeValidation {
    pub is_valid: bool,
    pub missing_fields: Vec<ProfileField>,
}

impl ExtractedResume {
    pub fn validate(&self) -> ResumeValidation {
        let missing_fields: Vec<ProfileField> = [
            (ProfileField::Name, &self.name),
            (ProfileField::Email, &self.email),
            (ProfileField::Phone, &self.phone),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(field, _)| field)
        .collect();
        ResumeValidation {
            is_valid: missing_fields.is_empty(),
            missing_fields,
        }
    }

    pub fn into_profile(self, file_name: Option<String>) -> CandidateProfile {
        let mut profile = CandidateProfile::new(self.name, self.email, self.phone);
        profile.resume_file_name = file_name;
        profile
    }
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
        .expect("invalid email pattern")
});

// North American numbers, then bare Indian mobile numbers.
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}|(?:\+91[-.\s]?)?[6-9][0-9]{9}")
        .expect("invalid phone pattern")
});

// Tried in order; first capture wins.
static NAME_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?m)^[ \t]*([A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)+)[ \t]*$",
        r"(?m)^[ \t]*([A-Z][A-Z \t]*[A-Z])[ \t]*$",
        r"(?i)\bname[ \t]*[:\-][ \t]*([A-Za-z][A-Za-z \t]*)",
        r"(?m)^[ \t]*([A-Z][a-z]+[ \t]+[A-Z][a-z]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid name pattern"))
    .collect()
});

static NON_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("invalid cleanup pattern"));

/// Reads the document text and pulls contact fields out of it.
pub async fn parse_resume(
    data: Bytes,
    content_type: Option<&str>,
    file_name: Option<&str>,
) -> Result<ExtractedResume, ExtractError> {
    if data.is_empty() {
        return Err(ExtractError::Empty);
    }
    if data.len() > MAX_RESUME_BYTES {
        return Err(ExtractError::TooLarge);
    }
    let kind = DocumentKind::detect(content_type, file_name)?;
    let text = match kind {
        DocumentKind::Pdf => {
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
                .await?
                .map_err(|e| ExtractError::Pdf(e.to_string()))?
        }
        // DOCX is read as raw text; whatever is legible is scanned.
        DocumentKind::Docx | DocumentKind::Text => String::from_utf8_lossy(&data).into_owned(),
    };
    debug!("Extracted {} characters from {:?} resume", text.len(), kind);

    let extracted = extract_fields(&text);
    info!(
        "Resume parsed: name={}, email={}, phone={}",
        extracted.name.is_some(),
        extracted.email.is_some(),
        extracted.phone.is_some()
    );
    Ok(extracted)
}

pub fn extract_fields(text: &str) -> ExtractedResume {
    let email = EMAIL_RE.find(text).map(|m| m.as_str().to_string());

    let phone = PHONE_RE
        .find(text)
        .map(|m| m.as_str().chars().filter(|c| c.is_ascii_digit() || *c == '+').collect::<String>())
        .filter(|p| !p.is_empty());

    let name = NAME_RES
        .iter()
        .find_map(|re| re.captures(text).and_then(|c| c.get(1)))
        .map(|m| NON_WORD_RE.replace_all(m.as_str(), "").trim().to_string())
        .filter(|n| !n.is_empty());

    ExtractedResume { name, email, phone }
}
