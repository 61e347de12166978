//! Template PDF loading and pre-flight inspection.

use crate::error::{Result, StampError};
use crate::form::{FormField, form_fields};
use lopdf::Document as LoDocument;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateIssue {
    Encrypted,
    NoPages,
    PageCountMismatch,
    DigestMismatch,
    HasFormFields,
}

impl TemplateIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateIssue::Encrypted => "TEMPLATE_ENCRYPTED_UNSUPPORTED",
            TemplateIssue::NoPages => "TEMPLATE_EMPTY_OR_NO_PAGES",
            TemplateIssue::PageCountMismatch => "TEMPLATE_PAGE_COUNT_MISMATCH",
            TemplateIssue::DigestMismatch => "TEMPLATE_DIGEST_MISMATCH",
            TemplateIssue::HasFormFields => "TEMPLATE_HAS_FORM_FIELDS",
        }
    }

    /// Issues that make a template unusable. Form fields only change how it
    /// is filled.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TemplateIssue::HasFormFields)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateInspection {
    pub pdf_version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub file_size_bytes: usize,
    pub sha256: String,
    /// Terminal AcroForm fields. Not read for encrypted files.
    pub form_fields: Vec<FormField>,
}

impl TemplateInspection {
    pub fn issues(&self) -> Vec<TemplateIssue> {
        let mut issues = Vec::new();
        if self.encrypted {
            issues.push(TemplateIssue::Encrypted);
        }
        if self.page_count == 0 {
            issues.push(TemplateIssue::NoPages);
        }
        if !self.form_fields.is_empty() {
            issues.push(TemplateIssue::HasFormFields);
        }
        issues
    }

    pub fn form_field_count(&self) -> usize {
        self.form_fields.len()
    }
}

pub fn inspect_template_bytes(bytes: &[u8]) -> Result<TemplateInspection> {
    let pdf = LoDocument::load_mem(bytes)
        .map_err(|err| StampError::Template(format!("unreadable template PDF: {err}")))?;
    let encrypted = pdf.is_encrypted();
    let fields = if encrypted {
        Vec::new()
    } else {
        form_fields(&pdf)
            .map_err(|err| StampError::Template(format!("unreadable form fields: {err}")))?
    };
    Ok(TemplateInspection {
        pdf_version: pdf.version.clone(),
        page_count: pdf.get_pages().len(),
        encrypted,
        file_size_bytes: bytes.len(),
        sha256: sha256_hex(bytes),
        form_fields: fields,
    })
}

pub fn inspect_template_path(path: &Path) -> Result<TemplateInspection> {
    let data = std::fs::read(path)?;
    inspect_template_bytes(&data)
}

/// A template file, optionally pinned to a digest and page count so a
/// swapped or re-exported template is caught before any coordinates are
/// applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateAsset {
    pub path: PathBuf,
    pub sha256: Option<String>,
    pub page_count: Option<usize>,
}

impl TemplateAsset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sha256: None,
            page_count: None,
        }
    }

    pub fn with_sha256(mut self, digest: impl Into<String>) -> Self {
        self.sha256 = Some(digest.into());
        self
    }

    pub fn with_page_count(mut self, page_count: usize) -> Self {
        self.page_count = Some(page_count);
        self
    }

    /// Reads the template and checks it against its pins.
    pub fn load(&self) -> Result<Vec<u8>> {
        let bytes = std::fs::read(&self.path)?;
        self.verify(&bytes)?;
        Ok(bytes)
    }

    pub fn verify(&self, bytes: &[u8]) -> Result<TemplateInspection> {
        let inspection = inspect_template_bytes(bytes)?;
        if let Some(issue) = inspection.issues().into_iter().find(TemplateIssue::is_fatal) {
            let detail = match issue {
                TemplateIssue::Encrypted => "encrypted templates are not supported",
                _ => "template has no pages",
            };
            return Err(template_err(issue, &self.path, detail.to_string()));
        }
        if let Some(expected) = &self.sha256 {
            if !expected.trim().eq_ignore_ascii_case(&inspection.sha256) {
                return Err(template_err(
                    TemplateIssue::DigestMismatch,
                    &self.path,
                    format!("expected sha256 {expected} found {}", inspection.sha256),
                ));
            }
        }
        if let Some(expected) = self.page_count {
            if expected != inspection.page_count {
                return Err(template_err(
                    TemplateIssue::PageCountMismatch,
                    &self.path,
                    format!("expected {expected} pages found {}", inspection.page_count),
                ));
            }
        }
        log::debug!(
            "template {} ok: PDF {} with {} pages, {} form fields",
            self.path.display(),
            inspection.pdf_version,
            inspection.page_count,
            inspection.form_field_count()
        );
        Ok(inspection)
    }
}

fn template_err(issue: TemplateIssue, path: &Path, detail: String) -> StampError {
    StampError::Template(format!("{} ({}): {detail}", issue.as_str(), path.display()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
