//! Exhibit resolution: bind a referenced image to its question.
//!
//! A question whose text contains one of the configured keywords gets the
//! first unclaimed image, by page then `y`, that lies inside its block span on
//! the block's first page; failing that, inside the span on the following
//! page. When every candidate is already bound to an earlier question the
//! most recently claimed one is reused, which covers several questions
//! sharing one exhibit.
//!
//! Images with identical payloads count as one image for claiming.

use crate::model::{BlockSpan, Page, RawImage};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use tracing::debug;

/// Case-insensitive keyword test on question text.
pub fn references_exhibit(text: &str, keywords: &[String]) -> bool {
    let haystack = text.to_lowercase();
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .any(|k| !k.is_empty() && haystack.contains(&k))
}

/// MIME type guessed from the payload signature; PNG when unknown.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xFF, 0xD8]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF") {
        "image/gif"
    } else {
        "image/png"
    }
}

/// `data:<mime>;base64,<payload>` for inline embedding.
pub fn data_uri(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", sniff_mime(bytes), STANDARD.encode(bytes))
}

fn payload_key(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// Tracks which images have been bound across one document.
pub struct ExhibitResolver<'a> {
    pages: HashMap<usize, &'a Page>,
    /// Payload key → claim sequence number.
    claims: HashMap<u64, usize>,
}

impl<'a> ExhibitResolver<'a> {
    pub fn new(pages: &'a [Page]) -> Self {
        Self {
            pages: pages.iter().map(|p| (p.index, p)).collect(),
            claims: HashMap::new(),
        }
    }

    /// Images on one page, top to bottom, optionally limited to `span`.
    fn candidates_on(&self, page: usize, span: Option<&BlockSpan>) -> Vec<&'a RawImage> {
        let Some(&page) = self.pages.get(&page) else {
            return Vec::new();
        };
        let mut found: Vec<&RawImage> = page
            .images
            .iter()
            .filter(|img| span.is_none_or(|s| s.contains(img.page, img.bbox.top)))
            .collect();
        found.sort_by(|a, b| a.bbox.top.partial_cmp(&b.bbox.top).unwrap_or(Ordering::Equal));
        found
    }

    /// Find, claim and encode the exhibit for the block at `span`.
    ///
    /// Images between this header and the next win; any other image on the
    /// block's start page is the fallback.
    pub fn resolve(&mut self, span: &BlockSpan) -> Option<String> {
        let same_page = self.candidates_on(span.page, Some(span));
        let next_page = self.candidates_on(span.page + 1, Some(span));
        let whole_page = self.candidates_on(span.page, None);

        let unclaimed = same_page
            .iter()
            .chain(next_page.iter())
            .chain(whole_page.iter())
            .find(|img| !self.claims.contains_key(&payload_key(&img.bytes)))
            .copied();

        if let Some(img) = unclaimed {
            let seq = self.claims.len();
            self.claims.insert(payload_key(&img.bytes), seq);
            debug!("Exhibit bound: page {} y={:.1}", img.page + 1, img.bbox.top);
            return Some(data_uri(&img.bytes));
        }

        let reused = same_page
            .iter()
            .chain(next_page.iter())
            .chain(whole_page.iter())
            .filter_map(|img| {
                self.claims
                    .get(&payload_key(&img.bytes))
                    .map(|seq| (*seq, *img))
            })
            .max_by_key(|(seq, _)| *seq)
            .map(|(_, img)| img)?;

        debug!(
            "Exhibit reused: page {} y={:.1}",
            reused.page + 1,
            reused.bbox.top
        );
        Some(data_uri(&reused.bytes))
    }
}
