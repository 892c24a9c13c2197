use sha2::{Digest, Sha256};

use crate::ImageId;

/// Windows-safe, deterministic file stem for a renamed image:
/// `{slugified_title}-{short_hash(id)}`. The hash suffix keeps two images
/// with the same generated title apart.
pub fn title_slug(title: &str, id: ImageId) -> String {
    let slug = slugify(title);
    let hash = short_hash(id);
    format!("{slug}-{hash}")
}

fn slugify(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    let mut prev_dash = false;
    for c in input.chars() {
        let mapped = if c.is_alphanumeric() {
            Some(c.to_ascii_lowercase())
        } else {
            // Whitespace, punctuation, and forbidden filesystem characters
            // all become separators.
            None
        };
        match mapped {
            Some(c) => {
                cleaned.push(c);
                prev_dash = false;
            }
            None => {
                // Collapse runs of separators into a single dash.
                if !prev_dash && !cleaned.is_empty() {
                    cleaned.push('-');
                }
                prev_dash = true;
            }
        }
    }
    let mut slug = cleaned.trim_matches('-').to_string();
    if slug.is_empty() {
        slug = "image".to_string();
    }
    if slug.len() > 80 {
        let mut cut = 80;
        while !slug.is_char_boundary(cut) {
            cut -= 1;
        }
        slug.truncate(cut);
        slug = slug.trim_end_matches('-').to_string();
    }
    if is_reserved_windows_name(&slug) {
        slug.push('_');
    }
    slug
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(id: ImageId) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.to_le_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
