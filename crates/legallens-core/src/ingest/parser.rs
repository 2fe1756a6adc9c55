use encoding_rs::Encoding;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

const PDF_HINT: &str = "The PDF may be scanned or password-protected";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Could not decode text: {0}")]
    Decode(String),
    #[error("No text could be extracted from {0} document")]
    EmptyExtraction(DocumentFormat),
    #[error("{format} parsing error: {message}")]
    ParseFailed {
        format: DocumentFormat,
        message: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    fn failed(format: DocumentFormat, message: impl ToString) -> Self {
        Self::ParseFailed {
            format,
            message: message.to_string(),
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedFormat(_) => Some("Please provide a PDF, DOCX, or TXT file"),
            Self::NotFound(_) => Some("Check the path and provide the file again"),
            Self::Decode(_) => Some("Save the file as UTF-8 text and try again"),
            Self::EmptyExtraction(DocumentFormat::Pdf)
            | Self::ParseFailed {
                format: DocumentFormat::Pdf,
                ..
            } => Some(PDF_HINT),
            Self::EmptyExtraction(DocumentFormat::Docx) => {
                Some("The document body appears to contain no text")
            }
            _ => None,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    PlainText,
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" => Some(Self::PlainText),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "TXT",
            Self::Pdf => "PDF",
            Self::Docx => "DOCX",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw text pulled out of one input file. Lives only for one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub source: Option<PathBuf>,
    pub format: DocumentFormat,
    pub full_text: String,
    pub page_count: Option<u32>,
    /// Which strategy produced the text, e.g. `pdf:page-text` or `txt:UTF-8`.
    pub method: Option<String>,
}

impl ParsedDocument {
    #[must_use]
    pub fn new(format: DocumentFormat, full_text: String) -> Self {
        Self {
            source: None,
            format,
            full_text,
            page_count: None,
            method: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, path: PathBuf) -> Self {
        self.source = Some(path);
        self
    }

    #[must_use]
    pub fn with_page_count(mut self, count: u32) -> Self {
        self.page_count = Some(count);
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
}

#[async_trait::async_trait]
pub trait Parser: Send + Sync {
    fn supported_formats(&self) -> &[DocumentFormat];

    fn can_parse(&self, format: DocumentFormat) -> bool {
        self.supported_formats().contains(&format)
    }

    async fn parse_bytes(&self, data: &[u8], format: DocumentFormat) -> ParseResult<ParsedDocument>;

    async fn parse_file(&self, path: &Path) -> ParseResult<ParsedDocument> {
        if !tokio::fs::try_exists(path).await? {
            return Err(ParseError::NotFound(path.to_path_buf()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ParseError::UnsupportedFormat("no extension".into()))?;

        let format = DocumentFormat::from_extension(ext)
            .ok_or_else(|| ParseError::UnsupportedFormat(ext.into()))?;

        if !self.can_parse(format) {
            return Err(ParseError::UnsupportedFormat(format.to_string()));
        }

        let data = tokio::fs::read(path).await?;
        tracing::debug!("Read {} bytes of {} from {}", data.len(), format, path.display());

        let document = self.parse_bytes(&data, format).await?;
        Ok(document.with_source(path.to_path_buf()))
    }
}

pub struct PlainTextParser;

impl PlainTextParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlainTextParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Tried in order when the file carries no byte-order mark.
pub const TEXT_ENCODINGS: [&Encoding; 2] = [encoding_rs::UTF_8, encoding_rs::WINDOWS_1252];

fn decode_text(data: &[u8]) -> ParseResult<(String, &'static str)> {
    // A byte-order mark is authoritative; never re-decode the marked bytes.
    if let Some((encoding, bom_len)) = Encoding::for_bom(data) {
        return match encoding.decode_without_bom_handling_and_without_replacement(&data[bom_len..]) {
            Some(text) if !text.trim().is_empty() => Ok((text.into_owned(), encoding.name())),
            Some(_) => Err(ParseError::Decode(format!(
                "{} byte-order mark is followed by no text",
                encoding.name()
            ))),
            None => Err(ParseError::Decode(format!(
                "text is not valid {} despite its byte-order mark",
                encoding.name()
            ))),
        };
    }

    for encoding in TEXT_ENCODINGS {
        match encoding.decode_without_bom_handling_and_without_replacement(data) {
            Some(text) if !text.trim().is_empty() => {
                return Ok((text.into_owned(), encoding.name()));
            }
            Some(_) => break,
            None => tracing::debug!("Text is not valid {}", encoding.name()),
        }
    }

    Err(ParseError::Decode(
        "no supported encoding produced non-empty text".into(),
    ))
}

#[async_trait::async_trait]
impl Parser for PlainTextParser {
    fn supported_formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::PlainText]
    }

    async fn parse_bytes(&self, data: &[u8], format: DocumentFormat) -> ParseResult<ParsedDocument> {
        let (text, encoding) = decode_text(data)?;
        Ok(ParsedDocument::new(format, text).with_method(format!("txt:{encoding}")))
    }
}

/// Page-by-page extraction, retried once with layout-preserving extraction
/// when the first pass yields nothing.
pub struct PdfParser;

impl PdfParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn extract_pages(data: &[u8]) -> ParseResult<(String, u32)> {
        let document = lopdf::Document::load_mem(data)
            .map_err(|e| ParseError::failed(DocumentFormat::Pdf, e))?;

        let pages: Vec<u32> = document.get_pages().keys().copied().collect();
        let mut text = String::new();

        for page in &pages {
            match document.extract_text(&[*page]) {
                Ok(page_text) if !page_text.trim().is_empty() => {
                    text.push_str(page_text.trim_end());
                    text.push('\n');
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("No text on page {}: {}", page, e),
            }
        }

        Ok((text, u32::try_from(pages.len()).unwrap_or(u32::MAX)))
    }

    fn extract_layout(data: &[u8]) -> ParseResult<String> {
        pdf_extract::extract_text_from_mem(data)
            .map_err(|e| ParseError::failed(DocumentFormat::Pdf, e))
    }

    fn extract(data: &[u8]) -> ParseResult<ParsedDocument> {
        let (text, page_count) = Self::extract_pages(data)?;
        if !text.trim().is_empty() {
            return Ok(ParsedDocument::new(DocumentFormat::Pdf, text)
                .with_page_count(page_count)
                .with_method("pdf:page-text"));
        }

        tracing::info!("Page text pass found nothing, retrying with layout extraction");
        let text = Self::extract_layout(data)?;
        if text.trim().is_empty() {
            return Err(ParseError::EmptyExtraction(DocumentFormat::Pdf));
        }

        Ok(ParsedDocument::new(DocumentFormat::Pdf, text)
            .with_page_count(page_count)
            .with_method("pdf:layout"))
    }
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Parser for PdfParser {
    fn supported_formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Pdf]
    }

    async fn parse_bytes(&self, data: &[u8], _format: DocumentFormat) -> ParseResult<ParsedDocument> {
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || Self::extract(&data))
            .await
            .map_err(|e| ParseError::failed(DocumentFormat::Pdf, e))?
    }
}

static DOCX_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab/>|<w:(?:br|cr)(?:\s[^>]*)?/>|</w:p>")
        .expect("valid docx token pattern")
});

static XML_CHAR_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x?)([0-9a-fA-F]+);").expect("valid char ref pattern"));

/// Reads the main document part of an OOXML package and flattens it to text.
pub struct DocxParser;

impl DocxParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn extract(data: &[u8]) -> ParseResult<ParsedDocument> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))
            .map_err(|e| ParseError::failed(DocumentFormat::Docx, e))?;

        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| ParseError::failed(DocumentFormat::Docx, e))?
            .read_to_string(&mut xml)?;

        let text = flatten_document_xml(&xml);
        if text.trim().is_empty() {
            return Err(ParseError::EmptyExtraction(DocumentFormat::Docx));
        }

        Ok(ParsedDocument::new(DocumentFormat::Docx, text).with_method("docx:document.xml"))
    }
}

impl Default for DocxParser {
    fn default() -> Self {
        Self::new()
    }
}

fn flatten_document_xml(xml: &str) -> String {
    let mut text = String::new();

    for token in DOCX_TOKEN.captures_iter(xml) {
        let whole = token.get(0).map_or("", |m| m.as_str());
        if let Some(run) = token.get(1) {
            text.push_str(&unescape_xml(run.as_str()));
        } else if whole == "<w:tab/>" {
            text.push('\t');
        } else {
            text.push('\n');
        }
    }

    text
}

fn unescape_xml(raw: &str) -> String {
    let with_refs = XML_CHAR_REF.replace_all(raw, |caps: &regex::Captures| {
        let radix = if caps[1].is_empty() { 10 } else { 16 };
        u32::from_str_radix(&caps[2], radix)
            .ok()
            .and_then(char::from_u32)
            .map_or_else(String::new, String::from)
    });

    with_refs
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[async_trait::async_trait]
impl Parser for DocxParser {
    fn supported_formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Docx]
    }

    async fn parse_bytes(&self, data: &[u8], _format: DocumentFormat) -> ParseResult<ParsedDocument> {
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || Self::extract(&data))
            .await
            .map_err(|e| ParseError::failed(DocumentFormat::Docx, e))?
    }
}

pub struct CompositeParser {
    parsers: Vec<Box<dyn Parser>>,
}

impl CompositeParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_parser(mut self, parser: Box<dyn Parser>) -> Self {
        self.parsers.push(parser);
        self
    }

    pub fn add_parser(&mut self, parser: Box<dyn Parser>) {
        self.parsers.push(parser);
    }

    fn find_parser(&self, format: DocumentFormat) -> Option<&dyn Parser> {
        self.parsers.iter().find(|p| p.can_parse(format)).map(AsRef::as_ref)
    }
}

impl Default for CompositeParser {
    fn default() -> Self {
        Self::new()
            .with_parser(Box::new(PdfParser::new()))
            .with_parser(Box::new(DocxParser::new()))
            .with_parser(Box::new(PlainTextParser::new()))
    }
}

#[async_trait::async_trait]
impl Parser for CompositeParser {
    fn supported_formats(&self) -> &[DocumentFormat] {
        &[
            DocumentFormat::Pdf,
            DocumentFormat::Docx,
            DocumentFormat::PlainText,
        ]
    }

    fn can_parse(&self, format: DocumentFormat) -> bool {
        self.find_parser(format).is_some()
    }

    async fn parse_bytes(&self, data: &[u8], format: DocumentFormat) -> ParseResult<ParsedDocument> {
        let parser = self
            .find_parser(format)
            .ok_or_else(|| ParseError::UnsupportedFormat(format.to_string()))?;

        parser.parse_bytes(data, format).await
    }
}
