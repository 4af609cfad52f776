//! FlashQuiz markup reader.
//!
//! Parses text produced by [`crate::pipeline::emit::emit`] back into a
//! [`Document`]. Used by `--check` to verify that emitted markup reproduces
//! the parsed questions, and handy for tooling that post-edits quiz files.
//!
//! The reader is strict about structure (every question needs a header and an
//! answer line) and lenient about whitespace.

use crate::error::QuizError;
use crate::model::{AnswerOption, Document, Frontmatter, Question, QuestionType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static RE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@(?P<kind>mc|sata|tf)\s+(?P<ordinal>\d+)\)(?:\s+(?P<text>.*))?$").unwrap()
});
static RE_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<letter>[a-z])\)(?:\s+(?P<text>.*))?$").unwrap());
static RE_EXHIBIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^!\[[^\]]*\]\((?P<uri>[^)]+)\)$").unwrap());

fn invalid(line: usize, detail: impl Into<String>) -> QuizError {
    QuizError::InvalidMarkup {
        line,
        detail: detail.into(),
    }
}

/// Parse FlashQuiz markup.
pub fn parse_markup(text: &str) -> Result<Document, QuizError> {
    let lines: Vec<&str> = text.lines().collect();
    let (frontmatter, body_start) = parse_frontmatter(&lines)?;

    let mut questions = Vec::new();
    let mut open: Option<(usize, Question, bool)> = None;

    for (idx, raw) in lines.iter().enumerate().skip(body_start) {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = RE_HEADER.captures(line) {
            if let Some((start, q, answered)) = open.take() {
                questions.push(close_question(start, q, answered)?);
            }
            let kind = QuestionType::from_marker(&caps["kind"])
                .ok_or_else(|| invalid(line_no, "unknown question marker"))?;
            let ordinal = caps["ordinal"]
                .parse::<u32>()
                .map_err(|e| invalid(line_no, format!("bad ordinal: {}", e)))?;
            let question = Question {
                ordinal,
                kind,
                text: caps
                    .name("text")
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
                options: Vec::new(),
                correct_answers: BTreeSet::new(),
                exhibit_image: None,
            };
            open = Some((line_no, question, false));
            continue;
        }

        let Some((_, question, answered)) = open.as_mut() else {
            return Err(invalid(line_no, "text outside of a question"));
        };
        if *answered {
            return Err(invalid(line_no, "text after the answer line"));
        }

        if let Some(value) = line.strip_prefix('=') {
            question.correct_answers = value
                .split(',')
                .map(|a| a.trim().to_ascii_lowercase())
                .filter(|a| !a.is_empty())
                .collect();
            *answered = true;
        } else if let Some(caps) = RE_EXHIBIT.captures(line) {
            question.exhibit_image = Some(caps["uri"].to_string());
        } else if let Some(caps) = RE_OPTION.captures(line) {
            let letter = caps["letter"].chars().next().unwrap_or('a');
            if question.options.last().is_some_and(|o| o.letter >= letter) {
                return Err(invalid(line_no, "option letters must ascend"));
            }
            question.options.push(AnswerOption {
                letter,
                text: caps
                    .name("text")
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
            });
        } else {
            return Err(invalid(line_no, format!("unexpected line '{}'", line)));
        }
    }

    if let Some((start, q, answered)) = open.take() {
        questions.push(close_question(start, q, answered)?);
    }

    Ok(Document {
        frontmatter,
        questions,
    })
}

fn close_question(start: usize, q: Question, answered: bool) -> Result<Question, QuizError> {
    if !answered || q.correct_answers.is_empty() {
        return Err(invalid(start, format!("question {} has no answer", q.ordinal)));
    }
    if q.kind == QuestionType::Tf && !q.options.is_empty() {
        return Err(invalid(start, "true/false question with options"));
    }
    Ok(q)
}

fn parse_frontmatter(lines: &[&str]) -> Result<(Frontmatter, usize), QuizError> {
    let mut fm = Frontmatter::default();
    let Some(first) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return Ok((fm, lines.len()));
    };
    if lines[first].trim() != "---" {
        return Ok((fm, first));
    }

    for (idx, raw) in lines.iter().enumerate().skip(first + 1) {
        let line_no = idx + 1;
        let line = raw.trim();
        if line == "---" {
            return Ok((fm, idx + 1));
        }
        if line.is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| invalid(line_no, "frontmatter line without ':'"))?;
        let value = value.trim();
        let bad = |what: &str| invalid(line_no, format!("bad {} value '{}'", what, value));

        match key.trim() {
            "quiz-title" => fm.quiz_title = unquote(value, line_no)?,
            "time-limit" => fm.time_limit = Some(value.parse().map_err(|_| bad("time-limit"))?),
            "pass-score" => fm.pass_score = value.parse().map_err(|_| bad("pass-score"))?,
            "shuffle" => fm.shuffle = value.parse().map_err(|_| bad("shuffle"))?,
            "show-answer" => fm.show_answer = value.parse().map_err(|_| bad("show-answer"))?,
            "exam-range" => fm.exam_range = Some(unquote(value, line_no)?),
            _ => {}
        }
    }

    Err(invalid(first + 1, "unterminated frontmatter"))
}

fn unquote(value: &str, line: usize) -> Result<String, QuizError> {
    if value.starts_with('"') {
        serde_json::from_str(value).map_err(|e| invalid(line, format!("bad string: {}", e)))
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::emit::emit;

    const SAMPLE: &str = "---
quiz-title: \"Security: basics\"
time-limit: 30
pass-score: 80
shuffle: false
show-answer: true
exam-range: \"1-3\"
---

@mc 1) Which port does HTTPS use?
a) 80
b) 443
= b

@sata 2) Pick the encrypted protocols.

![Exhibit](data:image/png;base64,AAAA)
a) SSH
b) Telnet
c) TLS
= a, c

@tf 3) The Earth is flat.
= false
";

    #[test]
    fn parses_sample() {
        let doc = parse_markup(SAMPLE).unwrap();
        assert_eq!(doc.frontmatter.quiz_title, "Security: basics");
        assert_eq!(doc.frontmatter.time_limit, Some(30));
        assert_eq!(doc.frontmatter.pass_score, 80);
        assert!(!doc.frontmatter.shuffle);
        assert!(doc.frontmatter.show_answer);
        assert_eq!(doc.frontmatter.exam_range.as_deref(), Some("1-3"));

        assert_eq!(doc.questions.len(), 3);
        let sata = &doc.questions[1];
        assert_eq!(sata.kind, QuestionType::Sata);
        assert_eq!(sata.options.len(), 3);
        assert_eq!(
            sata.correct_answers,
            BTreeSet::from(["a".to_string(), "c".to_string()])
        );
        assert_eq!(
            sata.exhibit_image.as_deref(),
            Some("data:image/png;base64,AAAA")
        );
        assert!(doc.questions[2].options.is_empty());
    }

    #[test]
    fn emit_then_parse_reproduces_document() {
        let doc = parse_markup(SAMPLE).unwrap();
        let again = parse_markup(&emit(&doc).unwrap()).unwrap();
        assert_eq!(again, doc);
    }

    #[test]
    fn missing_answer_is_an_error() {
        let err = parse_markup("@mc 1) Q\na) x\n").unwrap_err();
        assert!(matches!(err, QuizError::InvalidMarkup { line: 1, .. }));
    }

    #[test]
    fn stray_text_reports_line() {
        let err = parse_markup("---\nquiz-title: x\n---\nhello\n").unwrap_err();
        assert!(matches!(err, QuizError::InvalidMarkup { line: 4, .. }));
    }

    #[test]
    fn frontmatter_is_optional() {
        let doc = parse_markup("@tf 1) Sky is blue.\n= true\n").unwrap();
        assert_eq!(doc.frontmatter, Frontmatter::default());
        assert_eq!(doc.questions[0].ordinal, 1);
    }

    #[test]
    fn unterminated_frontmatter() {
        assert!(parse_markup("---\nquiz-title: x\n").is_err());
    }

    #[test]
    fn option_without_text() {
        let doc = parse_markup("@mc 1) Pick one.\na) first\nb)\n= a\n").unwrap();
        assert_eq!(doc.questions[0].options[1].letter, 'b');
        assert_eq!(doc.questions[0].options[1].text, "");
    }
}
