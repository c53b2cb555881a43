/// Code Extraction - pull one code artifact out of a free-form assistant reply
///
/// **Rules:**
/// - The first fenced block wins: an opening ``` with an optional language tag on the
///   same line, a newline, then everything up to the next ```
/// - `code` is the fence interior, trimmed
/// - `explanation` is the reply with that fenced span removed, trimmed
/// - No fence (or an empty first fence): the whole trimmed reply is the code and the
///   explanation is empty
///
/// Later fences are left in the explanation untouched.

use codenest_common::types::GenerationResponse;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"(?s)```([\w+#.-]*)[ \t]*\r?\n(.*?)```").expect("fence pattern is valid");
}

pub fn extract_code(raw: &str) -> GenerationResponse {
    if let Some(captures) = FENCED_BLOCK.captures(raw) {
        let (Some(span), Some(body)) = (captures.get(0), captures.get(2)) else {
            return whole_reply(raw);
        };

        let code = body.as_str().trim();
        if !code.is_empty() {
            let tag = captures
                .get(1)
                .map(|m| m.as_str())
                .filter(|tag| !tag.is_empty())
                .map(|tag| tag.to_string());

            let mut explanation = String::with_capacity(raw.len() - span.len());
            explanation.push_str(&raw[..span.start()]);
            explanation.push_str(&raw[span.end()..]);

            return GenerationResponse {
                raw: raw.to_string(),
                code: code.to_string(),
                explanation: explanation.trim().to_string(),
                language_tag: tag,
            };
        }
    }

    whole_reply(raw)
}

fn whole_reply(raw: &str) -> GenerationResponse {
    GenerationResponse {
        raw: raw.to_string(),
        code: raw.trim().to_string(),
        explanation: String::new(),
        language_tag: None,
    }
}
