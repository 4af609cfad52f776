//! Answer normalisation: raw answer text → set of option letters or `true`/`false`.
//!
//! Exam exports write multi-select answers either as a delimited list
//! (`A, C` / `a c`) or as one concatenated run (`ACD`). Nothing but shape
//! tells the two apart, so the shapes are an ordered rule table
//! ([`SHAPE_RULES`]): the delimited reading is tried first, which is what
//! makes a lone `A` a single answer and never a one-letter run.

use crate::error::ClassificationError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Letter runs at least this long that do not fully match the options may
/// be an all-caps word rather than letters.
const AMBIGUOUS_RUN_LEN: usize = 4;

/// The shape an answer line was recognised as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerShape {
    /// Comma/space separated single letters or `true`/`false` words, lower-cased.
    Delimited(Vec<String>),
    /// One contiguous upper-case run, split into lower-case letters.
    LetterRun(Vec<String>),
}

impl AnswerShape {
    pub fn tokens(&self) -> &[String] {
        match self {
            AnswerShape::Delimited(t) | AnswerShape::LetterRun(t) => t,
        }
    }

    /// Exactly one `true`/`false` token.
    pub fn is_true_false(&self) -> bool {
        matches!(self.tokens(), [t] if is_truth_word(t))
    }

    /// Number of distinct letter tokens.
    pub fn letter_count(&self) -> usize {
        self.tokens()
            .iter()
            .filter(|t| is_letter(t))
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// A shape recogniser.
pub struct ShapeRule {
    pub name: &'static str,
    pub recognise: fn(&str) -> Option<AnswerShape>,
}

/// Answer shapes, checked in order; the first match wins.
pub static SHAPE_RULES: [ShapeRule; 2] = [
    ShapeRule {
        name: "delimited",
        recognise: recognise_delimited,
    },
    ShapeRule {
        name: "letter-run",
        recognise: recognise_letter_run,
    },
];

fn recognise_delimited(text: &str) -> Option<AnswerShape> {
    let tokens: Vec<String> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    if tokens.is_empty() || !tokens.iter().all(|t| is_letter(t) || is_truth_word(t)) {
        return None;
    }
    Some(AnswerShape::Delimited(tokens))
}

static RE_LETTER_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2,}$").unwrap());

fn recognise_letter_run(text: &str) -> Option<AnswerShape> {
    if !RE_LETTER_RUN.is_match(text) {
        return None;
    }
    Some(AnswerShape::LetterRun(
        text.chars().map(|c| c.to_ascii_lowercase().to_string()).collect(),
    ))
}

fn is_letter(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic())
}

fn is_truth_word(token: &str) -> bool {
    token == "true" || token == "false"
}

/// Strip the `=` prefix and surrounding whitespace from an answer value.
pub fn strip_answer_prefix(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix('=').unwrap_or(trimmed).trim()
}

/// Recognise the shape of an answer value without validating it.
pub fn shape(raw: &str) -> Result<AnswerShape, ClassificationError> {
    let text = strip_answer_prefix(raw);
    SHAPE_RULES
        .iter()
        .find_map(|rule| (rule.recognise)(text))
        .ok_or_else(|| ClassificationError::UnrecognizedAnswer {
            raw: text.to_string(),
        })
}

/// Result of normalising one answer line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedAnswer {
    /// Validated answers: lower-case letters, or `true`/`false`.
    pub answers: BTreeSet<String>,
    /// Tokens dropped because no option carries that letter.
    pub dropped: Vec<String>,
    /// The value was a long letter run that did not fully match the options.
    pub ambiguous: bool,
}

/// Normalise an answer value against the option letters present.
///
/// Letters must name an existing option. `true`/`false` words are kept only
/// when the question has no options; everything else lands in `dropped`.
pub fn normalize(
    raw: &str,
    option_letters: &[char],
) -> Result<NormalizedAnswer, ClassificationError> {
    let shape = shape(raw)?;
    let mut out = NormalizedAnswer::default();

    for token in shape.tokens() {
        let valid = if is_truth_word(token) {
            option_letters.is_empty()
        } else {
            token
                .chars()
                .next()
                .is_some_and(|c| option_letters.contains(&c))
        };
        if valid {
            out.answers.insert(token.clone());
        } else if !out.dropped.contains(token) {
            out.dropped.push(token.clone());
        }
    }

    out.ambiguous = matches!(&shape, AnswerShape::LetterRun(letters)
        if letters.len() >= AMBIGUOUS_RUN_LEN && !out.dropped.is_empty());

    Ok(out)
}
