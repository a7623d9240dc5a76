//! Minimal HTTP surface: an upload form that returns the extracted
//! workbook as a download.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tiny_http::{Header, Method, Request, Response, Server};

use crate::extraction;
use crate::extraction::pdf::PageTableReader;
use crate::report;

/// Credential pair checked against HTTP basic auth.
pub struct Credentials {
    pub username: String,
    pub password: String,
}

const UPLOAD_FORM: &str = r#"<!DOCTYPE html>
<html>
<head><title>e-VD extraction</title></head>
<body>
<h1>e-VD extraction</h1>
<form action="/extract" method="post" enctype="multipart/form-data">
<p><input type="file" name="pdf" accept="application/pdf" required></p>
<p><button type="submit">Extract XLSX</button></p>
</form>
</body>
</html>
"#;

enum Reply {
    Html(&'static str),
    Workbook { file_name: String, bytes: Vec<u8> },
    NotFound,
}

/// Serves the upload form until the process is terminated. Each upload
/// runs the extraction pipeline and replies with the workbook bytes.
pub fn run(addr: &str, credentials: &Credentials, reader: &dyn PageTableReader) -> Result<()> {
    let server =
        Server::http(addr).map_err(|err| anyhow!("binding HTTP server to {addr}: {err}"))?;
    log::info!("Listening on http://{addr}");

    for mut request in server.incoming_requests() {
        if !authorized(&request, credentials) {
            let response = Response::from_string("authentication required")
                .with_status_code(401)
                .with_header(header(
                    "WWW-Authenticate",
                    "Basic realm=\"evdtables\"",
                ));
            send(request, response);
            continue;
        }

        let method = request.method().clone();
        let url = request.url().to_string();
        match (method, url.as_str()) {
            (Method::Get, "/") => respond(request, Reply::Html(UPLOAD_FORM)),
            (Method::Post, "/extract") => match handle_extract(&mut request, reader) {
                Ok(reply) => respond(request, reply),
                Err(err) => {
                    log::warn!("Extraction request failed: {err:?}");
                    let response =
                        Response::from_string(format!("{err:#}")).with_status_code(422);
                    send(request, response);
                }
            },
            _ => respond(request, Reply::NotFound),
        }
    }

    Ok(())
}

fn respond(request: Request, reply: Reply) {
    match reply {
        Reply::Html(body) => {
            let response = Response::from_string(body)
                .with_header(header("Content-Type", "text/html; charset=utf-8"));
            send(request, response);
        }
        Reply::Workbook { file_name, bytes } => {
            let disposition = format!("attachment; filename=\"{file_name}\"");
            let response = Response::from_data(bytes)
                .with_header(header(
                    "Content-Type",
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                ))
                .with_header(header("Content-Disposition", &disposition));
            send(request, response);
        }
        Reply::NotFound => {
            let response = Response::from_string("not found").with_status_code(404);
            send(request, response);
        }
    }
}

fn send<R: Read>(request: Request, response: Response<R>) {
    if let Err(err) = request.respond(response) {
        log::warn!("Failed to send response: {err}");
    }
}

fn header(field: &str, value: &str) -> Header {
    Header::from_bytes(field.as_bytes(), value.as_bytes()).expect("static header must parse")
}

fn authorized(request: &Request, credentials: &Credentials) -> bool {
    request
        .headers()
        .iter()
        .filter(|h| h.field.equiv("Authorization"))
        .any(|h| check_basic_auth(h.value.as_str(), credentials))
}

fn check_basic_auth(header_value: &str, credentials: &Credentials) -> bool {
    let Some(encoded) = header_value.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = BASE64.decode(encoded.trim()) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((username, password)) = decoded.split_once(':') else {
        return false;
    };
    username == credentials.username && password == credentials.password
}

fn handle_extract(request: &mut Request, reader: &dyn PageTableReader) -> Result<Reply> {
    let boundary = multipart_boundary(request)
        .ok_or_else(|| anyhow!("request is not multipart/form-data"))?;

    let mut body = Vec::new();
    request
        .as_reader()
        .read_to_end(&mut body)
        .with_context(|| "reading request body")?;

    let (file_name, pdf_bytes) = parse_multipart_file(&body, &boundary)
        .ok_or_else(|| anyhow!("no file part in upload"))?;

    // Scoped to this request; removed when the handle drops.
    let mut upload = tempfile::NamedTempFile::new().with_context(|| "creating upload file")?;
    upload
        .write_all(pdf_bytes)
        .with_context(|| "writing upload file")?;

    let rows = extraction::extract_rows(reader, upload.path())?;
    log::info!("Extracted {} row(s) from {:?}", rows.len(), file_name);
    let bytes = report::build_workbook(&rows)?;

    Ok(Reply::Workbook {
        file_name: workbook_file_name(&file_name),
        bytes,
    })
}

fn multipart_boundary(request: &Request) -> Option<String> {
    let content_type = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Content-Type"))?
        .value
        .as_str()
        .to_string();
    if !content_type.starts_with("multipart/form-data") {
        return None;
    }
    content_type.split(';').find_map(|param| {
        let boundary = param.trim().strip_prefix("boundary=")?;
        Some(boundary.trim_matches('"').to_string())
    })
}

/// Pulls the first file part out of a multipart body. Returns the
/// uploaded file name and a slice of the part's content.
fn parse_multipart_file<'b>(body: &'b [u8], boundary: &str) -> Option<(String, &'b [u8])> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    let mut offset = 0;
    while let Some(start) = find(&body[offset..], delimiter) {
        let part_start = offset + start + delimiter.len();
        let Some(end) = find(&body[part_start..], delimiter) else {
            break;
        };
        let part = &body[part_start..part_start + end];

        if let Some(split) = find(part, b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&part[..split]);
            let content = &part[split + 4..];
            let content = content.strip_suffix(b"\r\n").unwrap_or(content);
            if let Some(file_name) = disposition_file_name(&headers) {
                return Some((file_name, content));
            }
        }

        offset = part_start + end;
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn disposition_file_name(part_headers: &str) -> Option<String> {
    let line = part_headers
        .lines()
        .find(|line| line.to_ascii_lowercase().starts_with("content-disposition:"))?;
    line.split(';').find_map(|param| {
        let name = param.trim().strip_prefix("filename=")?;
        Some(name.trim_matches('"').to_string())
    })
}

/// Derives the download name from the upload name, swapping the
/// extension for `.xlsx`.
fn workbook_file_name(upload_name: &str) -> String {
    let stem = Path::new(upload_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "extracted".to_string());
    format!("{stem}.xlsx")
}
