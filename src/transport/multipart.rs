//! Hand-built `multipart/form-data` bodies.

/// Body for `POST /api/upload-pdf`: a `file` part and an `api_key` field.
pub(super) fn build_upload_multipart(
    boundary: &str,
    file_name: &str,
    file: &[u8],
    api_key: &str,
) -> Vec<u8> {
    let mut body = Vec::with_capacity(file.len() + 512);

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            escape_quoted(file_name)
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_for(file_name)).as_bytes());
    body.extend_from_slice(file);
    body.extend_from_slice(b"\r\n");

    append_field(&mut body, boundary, "api_key", api_key);
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    body
}

fn append_field(body: &mut Vec<u8>, boundary: &str, name: &str, value: &str) {
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(value.as_bytes());
    body.extend_from_slice(b"\r\n");
}

fn escape_quoted(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .map(|c| if c == '"' { '\'' } else { c })
        .collect()
}

fn mime_for(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    }
}
