//! Fixtures shared by this crate's tests and, through the `test-util` feature, by `api`.

use crate::config::{Config, DEFAULT_MAX_SESSIONS};
use std::time::Duration;

/// Config pointing at `base_url` with small limits and no generation overrides.
pub fn test_config(base_url: &str) -> Config {
    Config {
        api_key: "test-key".to_string(),
        model: "gemini-2.0-flash".to_string(),
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
        addr: "127.0.0.1:0".to_string(),
        max_upload_bytes: 64 * 1024,
        temperature: None,
        max_output_tokens: None,
        session_idle_timeout: Duration::from_secs(60),
        max_sessions: DEFAULT_MAX_SESSIONS,
    }
}

/// Single-page PDF showing `line` in Helvetica, with a correct xref table.
pub fn tiny_pdf(line: &str) -> Vec<u8> {
    let stream = format!("BT /F1 24 Tf 72 720 Td ({line}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{}\nendstream", stream.len(), stream),
    ];

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }
    let xref_at = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for offset in offsets {
        pdf.push_str(&format!("{offset:010} 00000 n \n"));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    ));
    pdf.into_bytes()
}
