//! Lightweight language identification used to pick the OCR language.
//!
//! Two stages, both heuristic:
//!
//! 1. **Script analysis**: a CJK-dominant sample is Chinese.
//! 2. **Latin disambiguation**: stop-word hits and German-only letters
//!    (umlauts, `ß`) decide between English and German.
//!
//! Anything else (too little evidence, another script) is reported as
//! undetected and the caller falls back to its configured language.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Languages the OCR engine is set up for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrLanguage {
    English,
    German,
    ChineseSimplified,
}

impl OcrLanguage {
    /// Map a detected ISO 639-1 style code onto the supported set.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "en" => Some(OcrLanguage::English),
            "de" => Some(OcrLanguage::German),
            "zh" | "zh-cn" | "zh-tw" | "ch" => Some(OcrLanguage::ChineseSimplified),
            _ => None,
        }
    }

    /// Language code understood by tesseract.
    pub fn tesseract_code(&self) -> &'static str {
        match self {
            OcrLanguage::English => "eng",
            OcrLanguage::German => "deu",
            OcrLanguage::ChineseSimplified => "chi_sim",
        }
    }
}

impl fmt::Display for OcrLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            OcrLanguage::English => "en",
            OcrLanguage::German => "de",
            OcrLanguage::ChineseSimplified => "zh",
        };
        f.write_str(code)
    }
}

impl FromStr for OcrLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("unsupported OCR language: {}", s))
    }
}

/// Minimum number of marker hits before a Latin-script guess is trusted.
const MIN_LATIN_EVIDENCE: u32 = 2;

const ENGLISH_MARKERS: &[&str] = &[
    "the", "and", "is", "are", "of", "to", "for", "with", "this", "that", "from", "your",
    "please", "invoice", "amount", "due", "payment", "account",
];

const GERMAN_MARKERS: &[&str] = &[
    "der", "die", "das", "und", "ist", "sind", "mit", "für", "von", "zu", "nicht", "ein",
    "eine", "bitte", "rechnung", "betrag", "zahlung", "konto", "sehr", "geehrte",
];

/// Detect the language of a text sample, returning a short code
/// (`"en"`, `"de"` or `"zh"`), or `None` when the evidence is too weak.
pub fn detect_language(sample: &str) -> Option<&'static str> {
    let mut cjk = 0u32;
    let mut latin = 0u32;
    let mut alphabetic = 0u32;

    for c in sample.chars() {
        if !c.is_alphabetic() {
            continue;
        }
        alphabetic += 1;
        match c {
            '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}' => cjk += 1,
            '\u{0041}'..='\u{024F}' => latin += 1,
            _ => {}
        }
    }

    if alphabetic == 0 {
        return None;
    }

    if cjk as f32 / alphabetic as f32 > 0.3 {
        return Some("zh");
    }

    if latin as f32 / alphabetic as f32 > 0.5 {
        return detect_latin_language(sample);
    }

    None
}

fn detect_latin_language(sample: &str) -> Option<&'static str> {
    let lower = sample.to_lowercase();
    let mut english = 0u32;
    let mut german = 0u32;

    for word in lower.split(|c: char| !c.is_alphabetic()).filter(|w| !w.is_empty()) {
        if ENGLISH_MARKERS.contains(&word) {
            english += 1;
        }
        if GERMAN_MARKERS.contains(&word) {
            german += 1;
        }
        if word.contains(['ä', 'ö', 'ü', 'ß']) {
            german += 1;
        }
    }

    if english.max(german) < MIN_LATIN_EVIDENCE || english == german {
        return None;
    }

    if german > english { Some("de") } else { Some("en") }
}

/// Resolve the OCR language for a sample, defaulting to `fallback`.
pub fn resolve_ocr_language(sample: Option<&str>, fallback: OcrLanguage) -> OcrLanguage {
    sample
        .and_then(detect_language)
        .and_then(OcrLanguage::from_code)
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_german() {
        let text = "Sehr geehrte Damen und Herren, die Rechnung ist bis Freitag zu begleichen.";
        assert_eq!(detect_language(text), Some("de"));
    }

    #[test]
    fn test_detects_english() {
        let text = "Please find attached the invoice for the amount due this month.";
        assert_eq!(detect_language(text), Some("en"));
    }

    #[test]
    fn test_detects_chinese() {
        assert_eq!(detect_language("发票金额请于本月底前支付"), Some("zh"));
    }

    #[test]
    fn test_weak_evidence_is_undetected() {
        assert_eq!(detect_language("%PDF-1.7 obj stream"), None);
        assert_eq!(detect_language("12345 !!"), None);
        assert_eq!(detect_language(""), None);
    }

    #[test]
    fn test_resolution_falls_back() {
        assert_eq!(resolve_ocr_language(None, OcrLanguage::German), OcrLanguage::German);
        assert_eq!(
            resolve_ocr_language(Some("Привет, как дела?"), OcrLanguage::German),
            OcrLanguage::German
        );
        assert_eq!(
            resolve_ocr_language(Some("Please pay the amount to this account"), OcrLanguage::German),
            OcrLanguage::English
        );
    }

    #[test]
    fn test_code_mapping() {
        assert_eq!(OcrLanguage::from_code("zh-cn"), Some(OcrLanguage::ChineseSimplified));
        assert_eq!(OcrLanguage::from_code("fr"), None);
        assert_eq!("de".parse::<OcrLanguage>().unwrap().tesseract_code(), "deu");
        assert_eq!(OcrLanguage::English.to_string(), "en");
    }
}
