//! Upload acceptance rules for resumes, journal PDFs, and images.

pub const MAX_IMAGE_BYTES: u64 = 2 * 1024 * 1024;
pub const MAX_PDF_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
}

#[derive(Debug, Clone, Copy)]
pub struct FileRule {
    pub kind: FileKind,
    pub max_bytes: u64,
}

impl FileRule {
    pub const fn image() -> Self {
        Self {
            kind: FileKind::Image,
            max_bytes: MAX_IMAGE_BYTES,
        }
    }

    pub const fn pdf() -> Self {
        Self {
            kind: FileKind::Pdf,
            max_bytes: MAX_PDF_BYTES,
        }
    }

    /// Check an upload against this rule, returning a human-readable reason on
    /// rejection. The content type is preferred; the filename extension is the
    /// fallback when the client sent a generic type.
    pub fn check(
        &self,
        filename: &str,
        content_type: &str,
        size_bytes: u64,
    ) -> Result<(), String> {
        if size_bytes == 0 {
            return Err("file is empty".to_string());
        }
        if size_bytes > self.max_bytes {
            return Err(format!(
                "file exceeds the maximum size of {} bytes",
                self.max_bytes
            ));
        }

        let effective_type = if content_type.is_empty() || content_type == "application/octet-stream"
        {
            mime_guess::from_path(filename)
                .first_raw()
                .unwrap_or("application/octet-stream")
        } else {
            content_type
        };

        match self.kind {
            FileKind::Image if effective_type.starts_with("image/") => Ok(()),
            FileKind::Image => Err("file must be an image".to_string()),
            FileKind::Pdf if effective_type == "application/pdf" => Ok(()),
            FileKind::Pdf => Err("file must be a PDF document".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_rule_accepts_pdf_and_rejects_images() {
        let rule = FileRule::pdf();
        assert!(rule.check("resume.pdf", "application/pdf", 1024).is_ok());
        assert!(rule.check("resume.png", "image/png", 1024).is_err());
    }

    #[test]
    fn image_rule_enforces_size_ceiling() {
        let rule = FileRule::image();
        assert!(rule.check("photo.jpg", "image/jpeg", MAX_IMAGE_BYTES).is_ok());
        assert!(
            rule.check("photo.jpg", "image/jpeg", MAX_IMAGE_BYTES + 1)
                .is_err()
        );
    }

    #[test]
    fn generic_content_type_falls_back_to_extension() {
        let rule = FileRule::pdf();
        assert!(
            rule.check("report.pdf", "application/octet-stream", 10)
                .is_ok()
        );
        assert!(rule.check("report.exe", "", 10).is_err());
    }

    #[test]
    fn empty_files_are_rejected() {
        assert!(FileRule::image().check("a.png", "image/png", 0).is_err());
    }
}
