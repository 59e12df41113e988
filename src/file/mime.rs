//! MIME type detection.
//!
//! Content signatures win over the file name. The extension is consulted
//! next, and only then the generic text/binary check, so `data.csv` stays
//! `text/csv` instead of collapsing to `text/plain`.

/// Fallback for unrecognised binary content.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Plain text as reported by the sniffer.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Magic-number table: (offset, signature, mime type).
const SIGNATURES: &[(usize, &[u8], &str)] = &[
    (0, b"%PDF-", "application/pdf"),
    (0, b"\x89PNG\r\n\x1a\n", "image/png"),
    (0, b"\xFF\xD8\xFF", "image/jpeg"),
    (0, b"GIF87a", "image/gif"),
    (0, b"GIF89a", "image/gif"),
    (0, b"BM", "image/bmp"),
    (0, b"\x00\x00\x01\x00", "image/x-icon"),
    (0, b"PK\x03\x04", "application/zip"),
    (0, b"\x1F\x8B\x08", "application/x-gzip"),
    (0, b"Rar!\x1A\x07", "application/x-rar-compressed"),
    (0, b"7z\xBC\xAF\x27\x1C", "application/x-7z-compressed"),
    (0, b"OggS\x00", "application/ogg"),
    (0, b"ID3", "audio/mpeg"),
    (0, b"fLaC", "audio/flac"),
    (0, b"\x1A\x45\xDF\xA3", "video/webm"),
    (0, b"\x00asm", "application/wasm"),
    (4, b"ftyp", "video/mp4"),
];

/// Detect the MIME type of a file from its leading bytes and name.
///
/// ```
/// use cloudvault::file::detect_mime_type;
///
/// assert_eq!(detect_mime_type(b"%PDF-1.7", "scan"), "application/pdf");
/// assert_eq!(detect_mime_type(b"a,b\n1,2\n", "data.csv"), "text/csv");
/// assert_eq!(detect_mime_type(b"\x00\x01\x02", "blob"), "application/octet-stream");
/// ```
pub fn detect_mime_type(head: &[u8], filename: &str) -> String {
    if let Some(mime) = sniff(head) {
        return mime.to_string();
    }

    if let Some(guess) = mime_guess::from_path(filename).first() {
        return guess.essence_str().to_string();
    }

    if looks_like_text(head) {
        return TEXT_PLAIN.to_string();
    }

    OCTET_STREAM.to_string()
}

/// Match the content against known signatures.
fn sniff(head: &[u8]) -> Option<&'static str> {
    for (offset, signature, mime) in SIGNATURES {
        if head.len() >= offset + signature.len()
            && &head[*offset..offset + signature.len()] == *signature
        {
            return Some(*mime);
        }
    }

    if head.len() >= 12 && &head[0..4] == b"RIFF" {
        match &head[8..12] {
            b"WEBP" => return Some("image/webp"),
            b"WAVE" => return Some("audio/wav"),
            b"AVI " => return Some("video/avi"),
            _ => {}
        }
    }

    let text = skip_leading_whitespace(head);
    let lowered: Vec<u8> = text.iter().take(14).map(u8::to_ascii_lowercase).collect();
    if lowered.starts_with(b"<!doctype html") || lowered.starts_with(b"<html") {
        return Some("text/html; charset=utf-8");
    }
    if lowered.starts_with(b"<?xml") {
        return Some("text/xml; charset=utf-8");
    }

    None
}

fn skip_leading_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c'))
        .unwrap_or(data.len());
    &data[start..]
}

/// Whether the bytes look like UTF-8 text without control characters.
///
/// The sample may end mid-character; a truncated trailing sequence is fine.
fn looks_like_text(head: &[u8]) -> bool {
    if head.is_empty() {
        return true;
    }

    let valid = match std::str::from_utf8(head) {
        Ok(s) => s,
        Err(e) if e.error_len().is_none() => {
            // Incomplete sequence at the end of the sample.
            match std::str::from_utf8(&head[..e.valid_up_to()]) {
                Ok(s) => s,
                Err(_) => return false,
            }
        }
        Err(_) => return false,
    };

    !valid
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t' | '\x0c' | '\x1b'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signatures() {
        assert_eq!(detect_mime_type(b"\x89PNG\r\n\x1a\n....", "x"), "image/png");
        assert_eq!(detect_mime_type(b"\xFF\xD8\xFF\xE0", "x"), "image/jpeg");
        assert_eq!(detect_mime_type(b"GIF89a", "x"), "image/gif");
        assert_eq!(detect_mime_type(b"PK\x03\x04rest", "x"), "application/zip");
        assert_eq!(
            detect_mime_type(b"RIFF\x00\x00\x00\x00WEBPVP8 ", "x"),
            "image/webp"
        );
        assert_eq!(
            detect_mime_type(b"\x00\x00\x00\x18ftypmp42", "x"),
            "video/mp4"
        );
    }

    #[test]
    fn test_signature_beats_extension() {
        assert_eq!(detect_mime_type(b"%PDF-1.4", "notes.txt"), "application/pdf");
    }

    #[test]
    fn test_html_and_xml() {
        assert_eq!(
            detect_mime_type(b"  <!DOCTYPE html><html>", "page"),
            "text/html; charset=utf-8"
        );
        assert_eq!(
            detect_mime_type(b"<HTML><body>", "page"),
            "text/html; charset=utf-8"
        );
        assert_eq!(
            detect_mime_type(b"<?xml version=\"1.0\"?>", "feed"),
            "text/xml; charset=utf-8"
        );
    }

    #[test]
    fn test_extension_fallback() {
        assert_eq!(detect_mime_type(b"1234567890", "invoice.pdf"), "application/pdf");
        assert_eq!(detect_mime_type(b"{}", "data.json"), "application/json");
    }

    #[test]
    fn test_text_and_binary() {
        assert_eq!(detect_mime_type(b"hello world\n", "README"), TEXT_PLAIN);
        assert_eq!(detect_mime_type("日本語".as_bytes(), "notes"), TEXT_PLAIN);
        assert_eq!(detect_mime_type(b"\x00\x01binary", "blob"), OCTET_STREAM);
        assert_eq!(detect_mime_type(b"\xFE\xFE\xFE", "blob"), OCTET_STREAM);
    }

    #[test]
    fn test_truncated_utf8_is_text() {
        let mut data = "ok ".as_bytes().to_vec();
        data.extend_from_slice(&"é".as_bytes()[..1]);
        assert!(looks_like_text(&data));
    }

    #[test]
    fn test_empty_content() {
        assert_eq!(detect_mime_type(b"", "empty"), TEXT_PLAIN);
    }
}
