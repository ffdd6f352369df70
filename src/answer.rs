//! Extraction of worker answers from the marketplace's XML envelope.
//!
//! Submitted answers arrive as a small fixed-schema XML document holding a
//! single free-text field, which our question templates fill with a JSON
//! blob. The payload lives in the second element child of the envelope's
//! first child element:
//!
//! ```text
//! <QuestionFormAnswers>
//!   <Answer>
//!     <QuestionIdentifier>results</QuestionIdentifier>
//!     <FreeText>{"caption": "a dog"}</FreeText>
//!   </Answer>
//! </QuestionFormAnswers>
//! ```
//!
//! Parse failures are recoverable: callers treat an unparsable answer as an
//! unusable submission (and may reject it), never as a fatal error.

use serde_json::Value;

use crate::error::AnswerError;

/// Parse the JSON payload embedded in a raw answer envelope.
pub fn parse_answer(raw: &str) -> Result<Value, AnswerError> {
    let doc = roxmltree::Document::parse(raw)?;
    let answer = doc
        .root_element()
        .first_element_child()
        .ok_or(AnswerError::MissingAnswerField)?;
    let free_text = answer
        .children()
        .filter(|n| n.is_element())
        .nth(1)
        .ok_or(AnswerError::MissingAnswerField)?;
    let text = free_text.text().ok_or(AnswerError::MissingAnswerField)?;
    Ok(serde_json::from_str(text.trim())?)
}
