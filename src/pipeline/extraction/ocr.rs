use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::Command;

use super::types::{OcrEngine, OcrPageResult};
use super::RecognitionError;

/// Tesseract driven through its command-line binary.
///
/// The prepared image goes to a temp file; results come back as TSV on stdout.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    lang: String,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>, lang: &str) -> Self {
        Self {
            binary: binary.into(),
            lang: lang.to_string(),
        }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image_bytes: &[u8]) -> Result<OcrPageResult, RecognitionError> {
        let mut input = tempfile::Builder::new()
            .prefix("medrecon-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| RecognitionError::Engine(format!("temp file: {e}")))?;
        input
            .write_all(image_bytes)
            .and_then(|_| input.flush())
            .map_err(|e| RecognitionError::Engine(format!("temp file: {e}")))?;

        let output = Command::new(&self.binary)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .arg("tsv")
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RecognitionError::EngineUnavailable(format!(
                    "{} not found",
                    self.binary.display()
                )),
                _ => RecognitionError::Engine(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognitionError::Engine(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        Ok(parse_tsv(&tsv))
    }
}

/// Mock OCR engine for unit testing without Tesseract.
pub struct MockOcrEngine {
    pub text: String,
    pub token_confidences: Vec<i32>,
}

impl MockOcrEngine {
    /// Every whitespace token gets the same confidence.
    pub fn new(text: &str, confidence: i32) -> Self {
        Self {
            text: text.to_string(),
            token_confidences: vec![confidence; text.split_whitespace().count()],
        }
    }

    pub fn with_confidences(text: &str, token_confidences: Vec<i32>) -> Self {
        Self {
            text: text.to_string(),
            token_confidences,
        }
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<OcrPageResult, RecognitionError> {
        Ok(OcrPageResult {
            text: self.text.clone(),
            token_confidences: self.token_confidences.clone(),
        })
    }
}

/// Engine that always fails, counting its invocations.
#[derive(Default)]
pub struct FailingOcrEngine {
    pub calls: std::sync::atomic::AtomicUsize,
}

impl OcrEngine for FailingOcrEngine {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<OcrPageResult, RecognitionError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Err(RecognitionError::Engine("simulated engine failure".into()))
    }
}

/// Parse Tesseract TSV output into text and per-word confidences.
/// TSV columns: level page_num block_num par_num line_num word_num left top width height conf text
/// Level 5 = individual word entries. Fractional confidences are truncated.
pub fn parse_tsv(tsv: &str) -> OcrPageResult {
    let mut text = String::new();
    let mut token_confidences = Vec::new();
    let mut last_line: Option<[u32; 4]> = None;

    for line in tsv.lines().skip(1) {
        // Skip header row
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 || fields[0] != "5" {
            continue;
        }

        let conf = match fields[10].trim().parse::<f32>() {
            Ok(c) => c.trunc() as i32,
            Err(_) => -1,
        };
        // Blank words still carry a confidence
        token_confidences.push(conf);

        let word = fields[11..].join("\t");
        let word = word.trim();
        if word.is_empty() {
            continue;
        }

        let mut position = [0u32; 4];
        for (slot, field) in position.iter_mut().zip(&fields[1..5]) {
            *slot = field.parse().unwrap_or(0);
        }

        match last_line {
            Some(prev) if prev == position => text.push(' '),
            // Same page and block: next line
            Some(prev) if prev[..2] == position[..2] => text.push('\n'),
            Some(_) => text.push_str("\n\n"),
            None => {}
        }
        text.push_str(word);
        last_line = Some(position);
    }

    OcrPageResult {
        text,
        token_confidences,
    }
}
