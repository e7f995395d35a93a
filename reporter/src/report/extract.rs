use crate::error::ReportError;

/// Isolate the JSON object in an AI reply: the span from the first `{` to the last `}`.
///
/// This is a bracket heuristic, not a parser. Prose after the payload that itself
/// contains a `}` widens the span, and the result then fails to parse downstream.
pub fn extract_json(text: &str) -> Result<&str, ReportError> {
    let start = text
        .find('{')
        .ok_or_else(|| ReportError::Extraction("no JSON start marker '{' in reply".to_string()))?;

    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| {
            ReportError::Extraction("no JSON end marker '}' after the start marker".to_string())
        })?;

    Ok(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_surrounding_prose() {
        let reply = "Here is the data: {\"a\": {\"b\": 1}} Thank you.";
        assert_eq!(extract_json(reply).unwrap(), "{\"a\": {\"b\": 1}}");
    }

    #[test]
    fn test_markdown_fence_is_ignored() {
        let reply = "```json\n{\"overallSentiment\": \"中性\"}\n```";
        assert_eq!(extract_json(reply).unwrap(), "{\"overallSentiment\": \"中性\"}");
    }

    #[test]
    fn test_no_start_marker() {
        let err = extract_json("no json here").unwrap_err();
        assert!(matches!(err, ReportError::Extraction(_)));
    }

    #[test]
    fn test_end_before_start() {
        let err = extract_json("} then {").unwrap_err();
        assert!(matches!(err, ReportError::Extraction(ref m) if m.contains("end marker")));
    }

    #[test]
    fn test_brace_in_trailing_prose_widens_span() {
        // Known limitation of the heuristic.
        let reply = "{\"a\": 1} see {note}";
        assert_eq!(extract_json(reply).unwrap(), "{\"a\": 1} see {note}");
    }
}
