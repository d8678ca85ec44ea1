//! Attachment filename extraction from `Content-Disposition` headers.

/// Pick the download filename for an attachment response. The RFC 5987
/// `filename*=UTF-8''…` form wins over the quoted `filename="…"` form; when
/// neither parses, the caller's fallback is used.
pub fn filename_from_disposition(header: Option<&str>, fallback: &str) -> String {
    let Some(header) = header else {
        return fallback.to_string();
    };

    if let Some(encoded) = extended_filename(header) {
        let decoded = percent_decode(&encoded);
        if !decoded.trim().is_empty() {
            return decoded;
        }
    }
    if let Some(plain) = quoted_filename(header) {
        if !plain.trim().is_empty() {
            return plain;
        }
    }
    fallback.to_string()
}

fn extended_filename(header: &str) -> Option<String> {
    for part in header.split(';') {
        let part = part.trim();
        let Some(value) = part.strip_prefix("filename*=") else {
            continue;
        };
        // charset'lang'value; only the value segment is percent-encoded.
        let mut segments = value.splitn(3, '\'');
        let charset = segments.next().unwrap_or_default();
        let _lang = segments.next();
        let encoded = segments.next()?;
        if !charset.eq_ignore_ascii_case("utf-8") {
            return None;
        }
        return Some(encoded.to_string());
    }
    None
}

fn quoted_filename(header: &str) -> Option<String> {
    for part in header.split(';') {
        let part = part.trim();
        let Some(value) = part.strip_prefix("filename=") else {
            continue;
        };
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        return Some(value.to_string());
    }
    None
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' {
            if let Some(pair) = bytes.get(index + 1..index + 3) {
                if let Ok(byte) = u8::from_str_radix(&String::from_utf8_lossy(pair), 16) {
                    out.push(byte);
                    index += 3;
                    continue;
                }
            }
        }
        out.push(bytes[index]);
        index += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_extended_form_over_quoted() {
        let header = "attachment; filename=\"plain.log\"; filename*=UTF-8''j%C3%B8b%201.log";
        assert_eq!(
            filename_from_disposition(Some(header), "fallback.log"),
            "jøb 1.log"
        );
    }

    #[test]
    fn falls_back_to_quoted_form() {
        let header = "attachment; filename=\"export.json\"";
        assert_eq!(
            filename_from_disposition(Some(header), "fallback.json"),
            "export.json"
        );
    }

    #[test]
    fn accepts_unquoted_filenames() {
        let header = "attachment; filename=job.log";
        assert_eq!(filename_from_disposition(Some(header), "x"), "job.log");
    }

    #[test]
    fn uses_fallback_when_header_missing_or_empty() {
        assert_eq!(filename_from_disposition(None, "default.txt"), "default.txt");
        assert_eq!(
            filename_from_disposition(Some("attachment"), "default.txt"),
            "default.txt"
        );
        assert_eq!(
            filename_from_disposition(Some("attachment; filename=\"\""), "default.txt"),
            "default.txt"
        );
    }

    #[test]
    fn tolerates_malformed_percent_escapes() {
        let header = "attachment; filename*=UTF-8''bad%zzname";
        assert_eq!(
            filename_from_disposition(Some(header), "fallback"),
            "bad%zzname"
        );
    }
}
