//! Layout segmentation: positioned fragments → lines → question blocks.
//!
//! ## Lines
//!
//! Fragments of a page are ordered top-to-bottom and clustered: a fragment
//! whose `y` lies within `tolerance` points of the first fragment of the open
//! cluster joins it. Each cluster is then ordered left-to-right and joined
//! with single spaces.
//!
//! ## Blocks
//!
//! A line that matches one of the [`HEADER_RULES`] opens a new block and
//! closes the previous one. Blank or short lines never close a block on their
//! own because PDF text layers routinely lose real blank lines. Lines before
//! the first header form the document preamble.

use crate::model::{BlockSpan, Page, QuestionBlock, QuestionType, RawFragment};
use crate::pipeline::clean::clean_text;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use tracing::debug;

/// One reconstructed text line.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub page: usize,
    pub y: f32,
}

/// Output of [`segment`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segmentation {
    /// Lines before the first question header.
    pub preamble: Vec<String>,
    pub blocks: Vec<QuestionBlock>,
    /// `(ordinal, 0-based page)` of headers followed by no text at all.
    pub empty_headers: Vec<(u32, usize)>,
}

impl Segmentation {
    /// First non-empty preamble line, used as the quiz title.
    pub fn title(&self) -> Option<&str> {
        self.preamble
            .iter()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
    }
}

// ── Line clustering ──────────────────────────────────────────────────────────

/// Cluster the fragments of every page into lines, pages kept in input order.
pub fn cluster_lines(pages: &[Page], tolerance: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    for page in pages {
        lines.extend(cluster_page(&page.fragments, tolerance));
    }
    debug!("Clustered {} lines from {} pages", lines.len(), pages.len());
    lines
}

fn cluster_page(fragments: &[RawFragment], tolerance: f32) -> Vec<Line> {
    let mut sorted: Vec<&RawFragment> = fragments.iter().collect();
    sorted.sort_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal));

    let mut lines = Vec::new();
    let mut cluster: Vec<&RawFragment> = Vec::new();

    for fragment in sorted {
        let joins = cluster
            .first()
            .is_some_and(|anchor| (fragment.y - anchor.y).abs() <= tolerance);
        if !joins && !cluster.is_empty() {
            lines.extend(flush_cluster(&mut cluster));
        }
        cluster.push(fragment);
    }
    lines.extend(flush_cluster(&mut cluster));
    lines
}

fn flush_cluster(cluster: &mut Vec<&RawFragment>) -> Option<Line> {
    if cluster.is_empty() {
        return None;
    }
    cluster.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
    let anchor = cluster[0];
    let text = cluster
        .iter()
        .map(|f| clean_text(&f.text))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let line = Line {
        text,
        page: anchor.page,
        y: anchor.y,
    };
    cluster.clear();
    if line.text.is_empty() {
        None
    } else {
        Some(line)
    }
}

// ── Header rules ─────────────────────────────────────────────────────────────

/// A question-start pattern. Every pattern exposes an `ordinal` group, an
/// optional `marker` group and an optional `rest` group holding the text that
/// follows the header on the same line.
pub struct HeaderRule {
    pub name: &'static str,
    pub pattern: &'static Lazy<Regex>,
}

static RE_MARKER_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i:@(?P<marker>mc|sata|tf))\s+(?P<ordinal>\d+)\)(?:\s+(?P<rest>.*))?$").unwrap()
});
static RE_NUMBERED_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<ordinal>\d+)\)(?:\s+(?P<rest>.*))?$").unwrap());
static RE_VCE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^QUESTION\s+(?P<ordinal>\d+)\b\s*(?P<rest>.*)$").unwrap());

/// Question-start patterns, checked in order; the first match wins.
pub static HEADER_RULES: [HeaderRule; 3] = [
    HeaderRule {
        name: "marker",
        pattern: &RE_MARKER_HEADER,
    },
    HeaderRule {
        name: "numbered",
        pattern: &RE_NUMBERED_HEADER,
    },
    HeaderRule {
        name: "vce",
        pattern: &RE_VCE_HEADER,
    },
];

/// A recognised header line.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub ordinal: u32,
    pub marker: Option<QuestionType>,
    pub rest: String,
}

/// Match a line against [`HEADER_RULES`].
pub fn match_header(line: &str) -> Option<Header> {
    HEADER_RULES.iter().find_map(|rule| {
        let caps = rule.pattern.captures(line)?;
        let ordinal = caps.name("ordinal")?.as_str().parse::<u32>().ok()?;
        Some(Header {
            ordinal,
            marker: caps
                .name("marker")
                .and_then(|m| QuestionType::from_marker(m.as_str())),
            rest: caps
                .name("rest")
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default(),
        })
    })
}

// ── Segmentation ─────────────────────────────────────────────────────────────

/// Group lines into question blocks.
///
/// Ordinals come from the headers themselves, so documents that start
/// mid-sequence keep their numbering.
pub fn segment(lines: &[Line]) -> Segmentation {
    let mut preamble = Vec::new();
    let mut open: Vec<(Header, &Line, Vec<String>)> = Vec::new();

    for line in lines {
        if let Some(header) = match_header(&line.text) {
            let mut body = Vec::new();
            if !header.rest.is_empty() {
                body.push(header.rest.clone());
            }
            open.push((header, line, body));
        } else if let Some((_, _, body)) = open.last_mut() {
            body.push(line.text.clone());
        } else {
            preamble.push(line.text.clone());
        }
    }

    let ends: Vec<Option<(usize, f32)>> = open
        .iter()
        .skip(1)
        .map(|(_, line, _)| Some((line.page, line.y)))
        .chain(std::iter::once(None))
        .collect();

    let mut blocks = Vec::with_capacity(open.len());
    let mut empty_headers = Vec::new();
    for ((header, line, body), end) in open.into_iter().zip(ends) {
        if body.is_empty() {
            empty_headers.push((header.ordinal, line.page));
            continue;
        }
        blocks.push(QuestionBlock {
            ordinal: header.ordinal,
            header_line: line.text.clone(),
            marker: header.marker,
            body_lines: body,
            span: BlockSpan {
                page: line.page,
                y: line.y,
                end,
            },
        });
    }

    debug!(
        "Segmented {} blocks ({} empty headers, {} preamble lines)",
        blocks.len(),
        empty_headers.len(),
        preamble.len()
    );

    Segmentation {
        preamble,
        blocks,
        empty_headers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(text: &str, page: usize, y: f32, x: f32) -> RawFragment {
        RawFragment::new(text, page, y, x)
    }

    fn line(text: &str, page: usize, y: f32) -> Line {
        Line {
            text: text.to_string(),
            page,
            y,
        }
    }

    #[test]
    fn fragments_on_one_baseline_join_left_to_right() {
        let page = Page {
            index: 0,
            fragments: vec![
                frag("world", 0, 100.4, 60.0),
                frag("hello", 0, 100.0, 10.0),
                frag("next line", 0, 114.0, 10.0),
            ],
            images: vec![],
        };
        let lines = cluster_lines(&[page], 2.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "hello world");
        assert_eq!(lines[1].text, "next line");
    }

    #[test]
    fn lines_do_not_merge_across_pages() {
        let pages = vec![
            Page {
                index: 0,
                fragments: vec![frag("end of page", 0, 700.0, 10.0)],
                images: vec![],
            },
            Page {
                index: 1,
                fragments: vec![frag("top of page", 1, 700.0, 10.0)],
                images: vec![],
            },
        ];
        let lines = cluster_lines(&pages, 2.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].page, 1);
    }

    #[test]
    fn whitespace_only_fragments_vanish() {
        let page = Page {
            index: 0,
            fragments: vec![frag("   ", 0, 10.0, 0.0), frag("\u{200B}", 0, 30.0, 0.0)],
            images: vec![],
        };
        assert!(cluster_lines(&[page], 2.0).is_empty());
    }

    #[test]
    fn header_rules_in_order() {
        let h = match_header("@tf 3) The Earth is flat.").unwrap();
        assert_eq!(h.ordinal, 3);
        assert_eq!(h.marker, Some(QuestionType::Tf));
        assert_eq!(h.rest, "The Earth is flat.");

        let h = match_header("12) Which service?").unwrap();
        assert_eq!(h.ordinal, 12);
        assert_eq!(h.marker, None);

        let h = match_header("QUESTION 7").unwrap();
        assert_eq!(h.ordinal, 7);
        assert!(h.rest.is_empty());

        assert!(match_header("a) an option").is_none());
        assert!(match_header("= a").is_none());
        assert!(match_header("See question 4) above").is_none());
        assert!(match_header("@essay 1) Discuss.").is_none());
    }

    #[test]
    fn blocks_split_only_on_headers() {
        let lines = vec![
            line("Contoso Practice Exam", 0, 20.0),
            line("QUESTION 1", 0, 60.0),
            line("Which region?", 0, 74.0),
            line("A. East", 0, 88.0),
            line("B. West", 0, 102.0),
            line("Correct Answer: B", 0, 116.0),
            line("QUESTION 2", 0, 160.0),
            line("Pick two.", 0, 174.0),
        ];
        let seg = segment(&lines);
        assert_eq!(seg.title(), Some("Contoso Practice Exam"));
        assert_eq!(seg.blocks.len(), 2);
        assert_eq!(seg.blocks[0].body_lines.len(), 4);
        assert_eq!(seg.blocks[0].span.end, Some((0, 160.0)));
        assert_eq!(seg.blocks[1].span.end, None);
    }

    #[test]
    fn first_block_keeps_its_own_ordinal() {
        let lines = vec![
            line("41) Which port does HTTPS use?", 0, 10.0),
            line("a) 443", 0, 24.0),
            line("= a", 0, 38.0),
            line("42) Second", 0, 52.0),
        ];
        let seg = segment(&lines);
        assert_eq!(seg.blocks[0].ordinal, 41);
        assert_eq!(seg.blocks[0].body_lines[0], "Which port does HTTPS use?");
        assert_eq!(seg.blocks[1].ordinal, 42);
    }

    #[test]
    fn empty_header_is_reported_not_emitted() {
        let lines = vec![
            line("QUESTION 1", 0, 10.0),
            line("QUESTION 2", 0, 30.0),
            line("Text", 0, 44.0),
        ];
        let seg = segment(&lines);
        assert_eq!(seg.blocks.len(), 1);
        assert_eq!(seg.blocks[0].ordinal, 2);
        assert_eq!(seg.empty_headers, vec![(1, 0)]);
    }

    #[test]
    fn no_headers_means_everything_is_preamble() {
        let lines = vec![line("Just a cover page", 0, 10.0)];
        let seg = segment(&lines);
        assert!(seg.blocks.is_empty());
        assert_eq!(seg.preamble.len(), 1);
    }
}
