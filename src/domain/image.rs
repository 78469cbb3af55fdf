//! Listing image upload policy: accepted types, size ceiling, object naming.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
];

const NAME_TOKEN_LEN: usize = 13;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A file received from a multipart form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Where an uploaded image ended up.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct StoredObject {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub url: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
}

pub fn is_allowed_type(content_type: &str) -> bool {
    ALLOWED_IMAGE_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(content_type.trim()))
}

pub fn max_size_mb() -> usize {
    MAX_IMAGE_BYTES / (1024 * 1024)
}

/// `listing-<unix ms>-<13 base36 chars>.<ext>`; the extension comes from the
/// original name, lower-cased, defaulting to `jpg`.
pub fn object_name<R: Rng + ?Sized>(original: &str, now: DateTime<Utc>, rng: &mut R) -> String {
    let token: String = (0..NAME_TOKEN_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!(
        "listing-{}-{}.{}",
        now.timestamp_millis(),
        token,
        extension(original)
    )
}

fn extension(original: &str) -> String {
    original
        .rsplit_once('.')
        .map(|(_, ext)| ext.trim().to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn type_allow_list() {
        assert!(is_allowed_type("image/png"));
        assert!(is_allowed_type("IMAGE/JPEG"));
        assert!(is_allowed_type("image/jpg"));
        assert!(!is_allowed_type("text/plain"));
        assert!(!is_allowed_type("image/svg+xml"));
    }

    #[test]
    fn object_names_carry_timestamp_token_and_extension() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let name = object_name("Photo.PNG", now, &mut rng);

        let rest = name.strip_prefix("listing-1700000000123-").unwrap();
        let (token, ext) = rest.split_once('.').unwrap();
        assert_eq!(token.len(), 13);
        assert!(token.bytes().all(|b| BASE36.contains(&b)));
        assert_eq!(ext, "png");
    }

    #[test]
    fn names_differ_between_calls() {
        let now = Utc::now();
        let mut rng = rand::thread_rng();
        assert_ne!(object_name("a.jpg", now, &mut rng), object_name("a.jpg", now, &mut rng));
    }

    #[test]
    fn extension_defaults_to_jpg() {
        assert_eq!(extension("noext"), "jpg");
        assert_eq!(extension("trailing."), "jpg");
        assert_eq!(extension("archive.tar.GZ"), "gz");
    }
}
