//! Question classification: QuestionBlock → typed question parts.
//!
//! A block body is read line by line against [`LINE_RULES`] (answer line,
//! option line, plain text). The resulting parts plus the shape of the
//! answer value are then run through [`CLASS_RULES`], an ordered table where
//! the first rule that fires decides the question type.

use crate::error::ClassificationError;
use crate::model::{AnswerOption, Question, QuestionBlock, QuestionType};
use crate::pipeline::answer::{self, AnswerShape};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::debug;

// ── Line rules ───────────────────────────────────────────────────────────────

/// What one body line is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// `= …` or `Correct Answer: …`; holds the value after the label.
    Answer(String),
    /// `a) text` or `A. text`; letter lower-cased.
    Option { letter: char, text: String },
    /// Anything else.
    Text(String),
}

static RE_ANSWER_EQ: Lazy<Regex> = Lazy::new(|| Regex::new(r"^=\s*(?P<value>.*)$").unwrap());
static RE_ANSWER_VCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i:correct\s+answer)\s*:\s*(?P<value>.*)$").unwrap());
static RE_OPTION_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<letter>[a-z])\)\s+(?P<text>.*)$").unwrap());
static RE_OPTION_DOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<letter>[A-Z])\.\s*(?P<text>.*)$").unwrap());

/// A line-shape pattern exposing either a `value` group (answer) or
/// `letter` + `text` groups (option).
pub struct LineRule {
    pub name: &'static str,
    pub pattern: &'static Lazy<Regex>,
}

/// Line shapes, checked in order; unmatched lines are plain text.
pub static LINE_RULES: [LineRule; 4] = [
    LineRule {
        name: "answer",
        pattern: &RE_ANSWER_EQ,
    },
    LineRule {
        name: "vce-answer",
        pattern: &RE_ANSWER_VCE,
    },
    LineRule {
        name: "option",
        pattern: &RE_OPTION_PAREN,
    },
    LineRule {
        name: "vce-option",
        pattern: &RE_OPTION_DOT,
    },
];

/// Classify a single line in isolation.
pub fn line_kind(line: &str) -> LineKind {
    let line = line.trim();
    for rule in LINE_RULES.iter() {
        let Some(caps) = rule.pattern.captures(line) else {
            continue;
        };
        if let Some(value) = caps.name("value") {
            return LineKind::Answer(value.as_str().trim().to_string());
        }
        if let (Some(letter), Some(text)) = (caps.name("letter"), caps.name("text")) {
            if let Some(c) = letter.as_str().chars().next() {
                return LineKind::Option {
                    letter: c.to_ascii_lowercase(),
                    text: text.as_str().trim().to_string(),
                };
            }
        }
    }
    LineKind::Text(line.to_string())
}

// ── Block parts ──────────────────────────────────────────────────────────────

/// A block body split into question text, options and the answer value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockParts {
    pub text: String,
    pub options: Vec<AnswerOption>,
    /// Value of the first answer line.
    pub answer: Option<String>,
    /// Lines after the answer line that were ignored.
    pub trailing_lines: usize,
}

impl BlockParts {
    pub fn option_letters(&self) -> Vec<char> {
        self.options.iter().map(|o| o.letter).collect()
    }

    /// Two options reading `True` and `False`.
    pub fn is_true_false_pair(&self) -> bool {
        true_false_pair(&self.options)
    }
}

fn true_false_pair(options: &[AnswerOption]) -> bool {
    let [a, b] = options else {
        return false;
    };
    let a = a.text.trim().to_ascii_lowercase();
    let b = b.text.trim().to_ascii_lowercase();
    (a == "true" && b == "false") || (a == "false" && b == "true")
}

/// Split a block body into its parts.
///
/// Option letters must strictly ascend; a line whose letter does not is
/// treated as continuation text of the current option. Lines that follow the
/// answer line are counted and otherwise ignored.
pub fn split_block(block: &QuestionBlock) -> BlockParts {
    let mut text: Vec<String> = Vec::new();
    let mut options: Vec<AnswerOption> = Vec::new();
    let mut answer = None;
    let mut trailing_lines = 0;

    for line in &block.body_lines {
        if answer.is_some() {
            trailing_lines += 1;
            continue;
        }
        match line_kind(line) {
            LineKind::Answer(value) => answer = Some(value),
            LineKind::Option { letter, text: body }
                if options.last().is_none_or(|prev| letter > prev.letter) =>
            {
                options.push(AnswerOption { letter, text: body });
            }
            other => {
                let continuation = match other {
                    LineKind::Option { .. } | LineKind::Answer(_) => line.trim().to_string(),
                    LineKind::Text(t) => t,
                };
                if continuation.is_empty() {
                    continue;
                }
                match options.last_mut() {
                    Some(opt) => append_text(&mut opt.text, &continuation),
                    None => text.push(continuation),
                }
            }
        }
    }

    if trailing_lines > 0 {
        debug!(
            "Question {}: ignored {} lines after the answer",
            block.ordinal, trailing_lines
        );
    }

    BlockParts {
        text: text.join(" "),
        options,
        answer,
        trailing_lines,
    }
}

fn append_text(target: &mut String, more: &str) {
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(more);
}

// ── Classification rules ─────────────────────────────────────────────────────

/// What the classification rules get to look at.
pub struct Evidence<'a> {
    pub marker: Option<QuestionType>,
    pub parts: &'a BlockParts,
    /// `None` when the answer value has no recognised shape.
    pub shape: Option<&'a AnswerShape>,
}

/// A classification rule; returns the type when it applies.
pub struct ClassRule {
    pub name: &'static str,
    pub decide: fn(&Evidence<'_>) -> Option<QuestionType>,
}

/// Classification rules, checked in order; the first match wins.
pub static CLASS_RULES: [ClassRule; 5] = [
    ClassRule {
        name: "explicit-marker",
        decide: |ev| ev.marker,
    },
    ClassRule {
        name: "true-false-answer",
        decide: |ev| {
            (ev.parts.options.is_empty() && ev.shape.is_some_and(AnswerShape::is_true_false))
                .then_some(QuestionType::Tf)
        },
    },
    ClassRule {
        name: "true-false-options",
        decide: |ev| {
            (ev.parts.is_true_false_pair() && ev.shape.is_some_and(is_single_letter))
                .then_some(QuestionType::Tf)
        },
    },
    ClassRule {
        name: "single-letter",
        decide: |ev| {
            (!ev.parts.options.is_empty() && ev.shape.is_some_and(is_single_letter))
                .then_some(QuestionType::Mc)
        },
    },
    ClassRule {
        name: "multiple-letters",
        decide: |ev| {
            (!ev.parts.options.is_empty() && ev.shape.is_some_and(is_multiple_letters))
                .then_some(QuestionType::Sata)
        },
    },
];

fn is_single_letter(shape: &AnswerShape) -> bool {
    matches!(shape, AnswerShape::Delimited(tokens) if tokens.len() == 1 && shape.letter_count() == 1)
}

fn is_multiple_letters(shape: &AnswerShape) -> bool {
    match shape {
        AnswerShape::LetterRun(_) => true,
        AnswerShape::Delimited(tokens) => tokens.len() > 1 && shape.letter_count() == tokens.len(),
    }
}

/// A block whose type has been decided.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub ordinal: u32,
    pub kind: QuestionType,
    pub parts: BlockParts,
    /// Raw answer value, label stripped.
    pub answer: String,
    /// Name of the rule that fired.
    pub rule: &'static str,
}

/// Decide the type of one block.
pub fn classify(block: &QuestionBlock) -> Result<Classified, ClassificationError> {
    let parts = split_block(block);
    let answer = parts
        .answer
        .clone()
        .ok_or(ClassificationError::NoAnswerLine)?;
    let shape = answer::shape(&answer);

    let evidence = Evidence {
        marker: block.marker,
        parts: &parts,
        shape: shape.as_ref().ok(),
    };

    let Some((rule, kind)) = CLASS_RULES
        .iter()
        .find_map(|rule| (rule.decide)(&evidence).map(|kind| (rule.name, kind)))
    else {
        return Err(match shape {
            Err(e) => e,
            Ok(_) if parts.options.is_empty() => ClassificationError::NoOptions,
            Ok(_) => ClassificationError::UnrecognizedAnswer { raw: answer },
        });
    };

    debug!("Question {}: {} via rule '{}'", block.ordinal, kind, rule);

    Ok(Classified {
        ordinal: block.ordinal,
        kind,
        parts,
        answer,
        rule,
    })
}

impl Classified {
    pub fn option_letters(&self) -> Vec<char> {
        self.parts.option_letters()
    }

    /// Build the final question from the validated answer set.
    ///
    /// A true/false question written as a `True`/`False` option pair has its
    /// chosen letter replaced by the option text and its options removed.
    pub fn into_question(
        self,
        ordinal: u32,
        answers: BTreeSet<String>,
    ) -> Result<Question, ClassificationError> {
        let (options, answers) = match self.kind {
            QuestionType::Tf if !self.parts.options.is_empty() => {
                let mapped = if self.parts.is_true_false_pair() {
                    answers
                        .iter()
                        .filter_map(|a| {
                            let letter = a.chars().next()?;
                            self.parts
                                .options
                                .iter()
                                .find(|o| o.letter == letter)
                                .map(|o| o.text.trim().to_ascii_lowercase())
                        })
                        .collect()
                } else {
                    BTreeSet::new()
                };
                (Vec::new(), mapped)
            }
            QuestionType::Tf => (Vec::new(), answers),
            QuestionType::Mc | QuestionType::Sata => {
                if self.parts.options.is_empty() {
                    return Err(ClassificationError::NoOptions);
                }
                (self.parts.options, answers)
            }
        };

        let count = answers.len();
        if count == 0 {
            return Err(ClassificationError::NoValidAnswers);
        }
        if matches!(self.kind, QuestionType::Mc | QuestionType::Tf) && count != 1 {
            return Err(ClassificationError::AnswerCount {
                kind: self.kind,
                count,
            });
        }

        Ok(Question {
            ordinal,
            kind: self.kind,
            text: self.parts.text,
            options,
            correct_answers: answers,
            exhibit_image: None,
        })
    }
}
