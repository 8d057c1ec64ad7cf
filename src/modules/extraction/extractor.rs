use quick_xml::events::Event;
use quick_xml::Reader;
use std::fmt;
use std::io::{Cursor, Read};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use super::ocr::OcrEngine;
use crate::shared::text::truncate_chars;

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp", "gif"];

/// How a file's content is turned into text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Pdf,
    Docx,
    Image,
    Other,
}

impl DocumentKind {
    /// Classify by extension first, then by declared MIME type
    pub fn detect(filename: &str, content_type: &str) -> Self {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "txt" => return Self::Text,
            "pdf" => return Self::Pdf,
            "docx" => return Self::Docx,
            ext if IMAGE_EXTENSIONS.contains(&ext) => return Self::Image,
            _ => {}
        }

        let content_type = content_type.to_lowercase();
        if content_type.starts_with("text") {
            Self::Text
        } else if content_type == "application/pdf" {
            Self::Pdf
        } else if content_type == DOCX_MIME {
            Self::Docx
        } else if content_type.starts_with("image") {
            Self::Image
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Text => "text",
            Self::Pdf => "PDF",
            Self::Docx => "DOCX",
            Self::Image => "image",
            Self::Other => "file",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("attachment '{filename}' is missing on disk")]
    Missing { filename: String },

    #[error("failed to read attachment '{filename}': {source}")]
    Io {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {kind} '{filename}': {reason}")]
    Parse {
        kind: DocumentKind,
        filename: String,
        reason: String,
    },
}

impl ExtractionError {
    /// Bracketed text standing in for the content in a prompt
    pub fn placeholder(&self) -> String {
        match self {
            Self::Missing { filename } => format!("[Attachment: {}] (file missing)", filename),
            Self::Parse {
                kind: kind @ (DocumentKind::Pdf | DocumentKind::Docx),
                filename,
                ..
            } => format!("[{}: {}] (unable to parse)", kind, filename),
            Self::Parse { filename, .. } | Self::Io { filename, .. } => {
                format!("[Attachment: {}] (unreadable)", filename)
            }
        }
    }
}

fn image_description(filename: &str) -> String {
    format!(
        "[Image: {}] Description: An image is attached. Possibly contains objects or scenes. \
         AI should consider this in the response.",
        filename
    )
}

fn unsupported_description(filename: &str) -> String {
    format!("[Attachment: {}] (unsupported type)", filename)
}

/// Extracts bounded text snippets from attachments
pub struct ContentExtractor {
    ocr: Box<dyn OcrEngine>,
}

impl ContentExtractor {
    pub fn new(ocr: Box<dyn OcrEngine>) -> Self {
        Self { ocr }
    }

    /// Extract text from a file stored on disk
    pub async fn extract_file(
        &self,
        path: &Path,
        filename: &str,
        content_type: &str,
        max_chars: usize,
    ) -> Result<String, ExtractionError> {
        let exists = tokio::fs::try_exists(path).await.unwrap_or(false);
        if !exists {
            return Err(ExtractionError::Missing {
                filename: filename.to_string(),
            });
        }

        if DocumentKind::detect(filename, content_type) == DocumentKind::Other {
            return Ok(unsupported_description(filename));
        }

        let data = tokio::fs::read(path)
            .await
            .map_err(|source| ExtractionError::Io {
                filename: filename.to_string(),
                source,
            })?;

        self.extract_bytes(data, filename, content_type, max_chars)
            .await
    }

    /// Extract text from file contents already in memory
    pub async fn extract_bytes(
        &self,
        data: Vec<u8>,
        filename: &str,
        content_type: &str,
        max_chars: usize,
    ) -> Result<String, ExtractionError> {
        let kind = DocumentKind::detect(filename, content_type);
        debug!("Extracting {} bytes from '{}' as {:?}", data.len(), filename, kind);

        match kind {
            DocumentKind::Text => Ok(truncate_chars(&utf8_ignoring_invalid(&data), max_chars)),
            DocumentKind::Pdf | DocumentKind::Docx => {
                let text = parse_document(kind, data).await.map_err(|reason| {
                    ExtractionError::Parse {
                        kind,
                        filename: filename.to_string(),
                        reason,
                    }
                })?;
                Ok(truncate_chars(&text, max_chars))
            }
            DocumentKind::Image => match self.ocr.recognize(&data).await {
                Ok(text) if !text.is_empty() => Ok(truncate_chars(&text, max_chars)),
                Ok(_) => Ok(image_description(filename)),
                Err(e) => {
                    debug!("OCR unavailable for '{}': {}", filename, e);
                    Ok(image_description(filename))
                }
            },
            DocumentKind::Other => Ok(unsupported_description(filename)),
        }
    }
}

/// Parse a PDF or DOCX on the blocking pool. Parser panics are reported as failures.
async fn parse_document(kind: DocumentKind, data: Vec<u8>) -> Result<String, String> {
    tokio::task::spawn_blocking(move || match kind {
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem(&data).map_err(|e| e.to_string()),
        _ => docx_text(&data),
    })
    .await
    .map_err(|e| format!("parser task failed: {}", e))?
}

/// Decode UTF-8, dropping invalid byte sequences instead of replacing them
fn utf8_ignoring_invalid(data: &[u8]) -> String {
    data.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Paragraph text of a .docx document, one paragraph per line
fn docx_text(data: &[u8]) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).map_err(|e| e.to_string())?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| e.to_string())?
        .read_to_string(&mut xml)
        .map_err(|e| e.to_string())?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs = Vec::new();
    // Open paragraphs, innermost last (text boxes nest them)
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;
    // Tab stops inside paragraph properties are not content
    let mut in_properties = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => open.push(String::new()),
                b"w:t" => in_text = true,
                b"w:pPr" => in_properties = true,
                _ => {}
            },
            Event::Empty(e) => match (e.name().as_ref(), open.last_mut()) {
                (b"w:p", _) => paragraphs.push(String::new()),
                (b"w:tab", Some(paragraph)) if !in_properties => paragraph.push('\t'),
                (b"w:br" | b"w:cr", Some(paragraph)) => paragraph.push('\n'),
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:p" => paragraphs.extend(open.pop()),
                b"w:t" => in_text = false,
                b"w:pPr" => in_properties = false,
                _ => {}
            },
            Event::Text(text) if in_text => {
                let text = text.unescape().map_err(|e| e.to_string())?;
                if let Some(paragraph) = open.last_mut() {
                    paragraph.push_str(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::extraction::ocr::{DisabledOcr, OcrError};
    use async_trait::async_trait;
    use std::io::Write;

    struct FixedOcr(&'static str);

    #[async_trait]
    impl OcrEngine for FixedOcr {
        async fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    fn extractor() -> ContentExtractor {
        ContentExtractor::new(Box::new(DisabledOcr))
    }

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(
                "word/document.xml",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_detect_prefers_extension() {
        assert_eq!(DocumentKind::detect("a.PDF", "text/plain"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::detect("scan.tif", ""), DocumentKind::Image);
        assert_eq!(DocumentKind::detect("blob", "text/csv"), DocumentKind::Text);
        assert_eq!(DocumentKind::detect("blob", DOCX_MIME), DocumentKind::Docx);
        assert_eq!(DocumentKind::detect("a.doc", "application/msword"), DocumentKind::Other);
    }

    #[test]
    fn test_placeholders() {
        let missing = ExtractionError::Missing {
            filename: "a.txt".to_string(),
        };
        assert_eq!(missing.placeholder(), "[Attachment: a.txt] (file missing)");

        let pdf = ExtractionError::Parse {
            kind: DocumentKind::Pdf,
            filename: "r.pdf".to_string(),
            reason: "bad xref".to_string(),
        };
        assert_eq!(pdf.placeholder(), "[PDF: r.pdf] (unable to parse)");

        let io = ExtractionError::Io {
            filename: "x.txt".to_string(),
            source: std::io::Error::other("denied"),
        };
        assert_eq!(io.placeholder(), "[Attachment: x.txt] (unreadable)");
    }

    #[tokio::test]
    async fn test_text_is_truncated_by_characters() {
        let text = extractor()
            .extract_bytes("ééééé".as_bytes().to_vec(), "notes.txt", "text/plain", 3)
            .await
            .unwrap();
        assert_eq!(text, "ééé");
    }

    #[tokio::test]
    async fn test_docx_paragraphs_joined_by_newline() {
        let xml = r#"<?xml version="1.0"?><w:document><w:body>
            <w:p w:rsidR="1"><w:pPr/><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p>
            <w:p/>
            <w:p><w:r><w:t>a &amp; b</w:t></w:r></w:p>
            </w:body></w:document>"#;

        let text = extractor()
            .extract_bytes(docx_bytes(xml), "doc.docx", "", 1000)
            .await
            .unwrap();
        assert_eq!(text, "Hello world\n\na & b");
    }

    #[tokio::test]
    async fn test_docx_character_references_and_attributed_breaks() {
        let xml = r#"<w:document><w:body><w:p>
            <w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr>
            <w:r><w:t>it&#8217;s &#x41;</w:t><w:br w:type="page"/><w:t>next</w:t></w:r>
            <w:r><w:tab w:val="x"/><w:t>col</w:t></w:r>
            </w:p></w:body></w:document>"#;

        let text = extractor()
            .extract_bytes(docx_bytes(xml), "doc.docx", "", 1000)
            .await
            .unwrap();
        assert_eq!(text, "it\u{2019}s A\nnext\tcol");
    }

    #[tokio::test]
    async fn test_malformed_docx_xml_is_a_parse_error() {
        let result = extractor()
            .extract_bytes(docx_bytes("<w:p><w:t>a</w:p>"), "bad.docx", "", 1000)
            .await;
        assert!(matches!(
            result,
            Err(ExtractionError::Parse { kind: DocumentKind::Docx, .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_utf8_bytes_are_dropped() {
        let text = extractor()
            .extract_bytes(b"caf\xc3\xa9 \xff\xfeok".to_vec(), "notes.txt", "text/plain", 100)
            .await
            .unwrap();
        assert_eq!(text, "caf\u{e9} ok");
    }

    #[tokio::test]
    async fn test_corrupt_documents_report_parse_errors() {
        let result = extractor()
            .extract_bytes(b"not a pdf".to_vec(), "r.pdf", "application/pdf", 1000)
            .await;
        assert!(matches!(
            result,
            Err(ExtractionError::Parse { kind: DocumentKind::Pdf, .. })
        ));

        let result = extractor()
            .extract_bytes(b"not a zip".to_vec(), "d.docx", "", 1000)
            .await;
        assert_eq!(
            result.unwrap_err().placeholder(),
            "[DOCX: d.docx] (unable to parse)"
        );
    }

    #[tokio::test]
    async fn test_image_uses_ocr_then_falls_back() {
        let with_ocr = ContentExtractor::new(Box::new(FixedOcr("STOP sign")));
        let text = with_ocr
            .extract_bytes(vec![0u8; 4], "photo.png", "image/png", 4)
            .await
            .unwrap();
        assert_eq!(text, "STOP");

        let text = extractor()
            .extract_bytes(vec![0u8; 4], "photo.png", "image/png", 1000)
            .await
            .unwrap();
        assert!(text.starts_with("[Image: photo.png] Description: An image is attached."));
    }

    #[tokio::test]
    async fn test_stored_file_missing_and_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.txt");
        let err = extractor()
            .extract_file(&missing, "gone.txt", "text/plain", 100)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Missing { .. }));
        assert_eq!(err.placeholder(), "[Attachment: gone.txt] (file missing)");

        let archive = dir.path().join("a.zip");
        std::fs::write(&archive, b"PK").unwrap();
        assert_eq!(
            extractor()
                .extract_file(&archive, "a.zip", "application/zip", 100)
                .await
                .unwrap(),
            "[Attachment: a.zip] (unsupported type)"
        );
    }
}
