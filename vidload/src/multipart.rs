//! Byte-exact multipart/form-data body for a single title + file upload.
use rand::Rng;
use std::sync::OnceLock;
use vidload_core::{BOUNDARY_PREFIX, TEST_VIDEO_SIZE};

const CRLF: &[u8] = b"\r\n";

/// The binary field of an upload.
#[derive(Debug, Clone, Copy)]
pub struct FilePart<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub content: &'a [u8],
}

/// An encoded request body together with the boundary that delimits it.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartBody {
    boundary: String,
    bytes: Vec<u8>,
}

impl MultipartBody {
    /// Encode a text `title` field followed by `file`, delimited by `boundary`.
    ///
    /// Field contents are copied verbatim; the file bytes are never re-encoded.
    pub fn new(boundary: &str, title: &str, file: FilePart<'_>) -> Self {
        let delimiter = format!("--{boundary}");
        let mut bytes = Vec::with_capacity(file.content.len() + title.len() + 4 * delimiter.len() + 256);

        bytes.extend_from_slice(delimiter.as_bytes());
        bytes.extend_from_slice(CRLF);
        bytes.extend_from_slice(b"Content-Disposition: form-data; name=\"title\"");
        bytes.extend_from_slice(CRLF);
        bytes.extend_from_slice(CRLF);
        bytes.extend_from_slice(title.as_bytes());
        bytes.extend_from_slice(CRLF);

        bytes.extend_from_slice(delimiter.as_bytes());
        bytes.extend_from_slice(CRLF);
        bytes.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"",
                file.field, file.file_name
            )
            .as_bytes(),
        );
        bytes.extend_from_slice(CRLF);
        bytes.extend_from_slice(format!("Content-Type: {}", file.content_type).as_bytes());
        bytes.extend_from_slice(CRLF);
        bytes.extend_from_slice(CRLF);
        bytes.extend_from_slice(file.content);
        bytes.extend_from_slice(CRLF);

        bytes.extend_from_slice(delimiter.as_bytes());
        bytes.extend_from_slice(b"--");
        bytes.extend_from_slice(CRLF);

        Self {
            boundary: boundary.to_string(),
            bytes,
        }
    }

    /// Like [`MultipartBody::new`], with a fresh random boundary that does not occur in the
    /// file content.
    pub fn with_random_boundary<R: Rng>(rng: &mut R, title: &str, file: FilePart<'_>) -> Self {
        let mut boundary = random_boundary(rng);
        while contains(file.content, boundary.as_bytes()) || title.contains(&boundary) {
            boundary = random_boundary(rng);
        }
        Self::new(&boundary, title, file)
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value of the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn random_boundary<R: Rng>(rng: &mut R) -> String {
    format!("{BOUNDARY_PREFIX}{}", rng.gen::<u64>())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Deterministic filler: byte `i` is `(i * 17 + 42) mod 256`.
pub fn filler(size: usize) -> Vec<u8> {
    (0..size).map(|i| ((i * 17 + 42) % 256) as u8).collect()
}

/// The synthetic video uploaded by every virtual user, built once per process.
pub fn test_video() -> &'static [u8] {
    static VIDEO: OnceLock<Vec<u8>> = OnceLock::new();
    VIDEO.get_or_init(|| filler(TEST_VIDEO_SIZE))
}
