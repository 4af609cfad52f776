//! Markup emission: Document → FlashQuiz text.
//!
//! Output layout:
//!
//! ```text
//! ---
//! quiz-title: "Practice exam"
//! pass-score: 70
//! shuffle: true
//! show-answer: false
//! ---
//!
//! @mc 1) Question text
//!
//! ![Exhibit](data:image/png;base64,...)
//! a) First option
//! b) Second option
//! = a
//! ```

use crate::error::QuizError;
use crate::model::{Document, Frontmatter, Question, QuestionType};
use std::fmt::Write;

/// Render a whole document.
pub fn emit(document: &Document) -> Result<String, QuizError> {
    let mut out = String::new();
    write_document(&mut out, document)
        .map_err(|e| QuizError::EmissionFailed(format!("{}", e)))?;
    Ok(out)
}

fn write_document(out: &mut String, document: &Document) -> Result<(), EmitError> {
    write_frontmatter(out, &document.frontmatter)?;
    for question in &document.questions {
        writeln!(out)?;
        write_question(out, question)?;
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum EmitError {
    #[error("formatting failed: {0}")]
    Fmt(#[from] std::fmt::Error),
    #[error("string quoting failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Double-quoted scalar; JSON string syntax is valid YAML.
fn quoted(value: &str) -> Result<String, EmitError> {
    Ok(serde_json::to_string(value)?)
}

fn write_frontmatter(out: &mut String, fm: &Frontmatter) -> Result<(), EmitError> {
    writeln!(out, "---")?;
    writeln!(out, "quiz-title: {}", quoted(&fm.quiz_title)?)?;
    if let Some(minutes) = fm.time_limit {
        writeln!(out, "time-limit: {}", minutes)?;
    }
    writeln!(out, "pass-score: {}", fm.pass_score)?;
    writeln!(out, "shuffle: {}", fm.shuffle)?;
    writeln!(out, "show-answer: {}", fm.show_answer)?;
    if let Some(range) = &fm.exam_range {
        writeln!(out, "exam-range: {}", quoted(range)?)?;
    }
    writeln!(out, "---")?;
    Ok(())
}

fn write_question(out: &mut String, q: &Question) -> Result<(), EmitError> {
    let text = q.text.trim();
    if text.is_empty() {
        writeln!(out, "{} {})", q.kind.marker(), q.ordinal)?;
    } else {
        writeln!(out, "{} {}) {}", q.kind.marker(), q.ordinal, text)?;
    }

    if let Some(uri) = &q.exhibit_image {
        writeln!(out)?;
        writeln!(out, "![Exhibit]({})", uri)?;
    }

    if q.kind != QuestionType::Tf {
        for option in &q.options {
            let text = option.text.trim();
            if text.is_empty() {
                writeln!(out, "{})", option.letter)?;
            } else {
                writeln!(out, "{}) {}", option.letter, text)?;
            }
        }
    }

    let answers: Vec<&str> = q.correct_answers.iter().map(String::as_str).collect();
    writeln!(out, "= {}", answers.join(", "))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerOption;
    use std::collections::BTreeSet;

    fn answers(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> Document {
        Document {
            frontmatter: Frontmatter {
                quiz_title: "AZ-104 \"practice\"".into(),
                time_limit: Some(90),
                ..Frontmatter::default()
            },
            questions: vec![
                Question {
                    ordinal: 1,
                    kind: QuestionType::Sata,
                    text: "Pick two.".into(),
                    options: vec![
                        AnswerOption {
                            letter: 'a',
                            text: "One".into(),
                        },
                        AnswerOption {
                            letter: 'b',
                            text: "Two".into(),
                        },
                        AnswerOption {
                            letter: 'c',
                            text: "Three".into(),
                        },
                    ],
                    correct_answers: answers(&["c", "a"]),
                    exhibit_image: None,
                },
                Question {
                    ordinal: 2,
                    kind: QuestionType::Tf,
                    text: "The Earth is flat.".into(),
                    options: vec![],
                    correct_answers: answers(&["false"]),
                    exhibit_image: Some("data:image/png;base64,AAAA".into()),
                },
            ],
        }
    }

    #[test]
    fn frontmatter_block() {
        let text = emit(&sample()).unwrap();
        assert!(text.starts_with("---\nquiz-title: \"AZ-104 \\\"practice\\\"\"\ntime-limit: 90\n"));
        assert!(text.contains("pass-score: 70\nshuffle: true\nshow-answer: false\n---\n"));
        assert!(!text.contains("exam-range"));
    }

    #[test]
    fn question_templates() {
        let text = emit(&sample()).unwrap();
        assert!(text.contains("\n@sata 1) Pick two.\na) One\nb) Two\nc) Three\n= a, c\n"));
        assert!(text.contains(
            "\n@tf 2) The Earth is flat.\n\n![Exhibit](data:image/png;base64,AAAA)\n= false\n"
        ));
    }

    #[test]
    fn no_time_limit_by_default() {
        let text = emit(&Document::default()).unwrap();
        assert_eq!(
            text,
            "---\nquiz-title: \"VCE Quiz\"\npass-score: 70\nshuffle: true\nshow-answer: false\n---\n"
        );
    }
}
