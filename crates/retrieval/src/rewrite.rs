use crate::providers::CompletionProvider;
use serde::Deserialize;

const REWRITE_SYSTEM_PROMPT: &str = "You turn a conversational question about a \
codebase into search keywords. Respond with JSON only, in the form \
{\"keywords\": [\"...\"]}. Prefer identifiers, file names, and domain terms; \
drop filler words.";

#[derive(Debug, Deserialize)]
struct KeywordResponse {
    keywords: Vec<String>,
}

/// Rewrite a conversational query into keyword form for retrieval.
///
/// Any failure (backend error, malformed JSON, empty keyword list) falls
/// back to the raw query, so a broken rewriter can never lose a turn.
pub async fn rewrite_query(completion: &dyn CompletionProvider, raw_query: &str) -> String {
    let response = match completion.complete(REWRITE_SYSTEM_PROMPT, raw_query).await {
        Ok(response) => response,
        Err(e) => {
            log::warn!("query rewrite failed, using raw query: {e}");
            return raw_query.to_string();
        }
    };

    match parse_keywords(&response) {
        Some(keywords) => keywords.join(" "),
        None => {
            log::warn!("query rewrite returned no usable keywords, using raw query");
            raw_query.to_string()
        }
    }
}

fn parse_keywords(response: &str) -> Option<Vec<String>> {
    let json = extract_json_object(response)?;
    let parsed: KeywordResponse = serde_json::from_str(json).ok()?;
    let keywords: Vec<String> = parsed
        .keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        None
    } else {
        Some(keywords)
    }
}

/// Models often wrap JSON in prose or code fences; cut out the outermost
/// object
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompletionError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct FixedCompletion(std::result::Result<String, CompletionError>);

    #[async_trait]
    impl CompletionProvider for FixedCompletion {
        async fn complete(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
        ) -> std::result::Result<String, CompletionError> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn keywords_are_joined() {
        let completion = FixedCompletion(Ok(
            r#"{"keywords": ["session", "manifest", "purge"]}"#.to_string()
        ));
        let rewritten = rewrite_query(&completion, "how do sessions get cleaned up?").await;
        assert_eq!(rewritten, "session manifest purge");
    }

    #[tokio::test]
    async fn fenced_json_is_accepted() {
        let completion = FixedCompletion(Ok(
            "```json\n{\"keywords\": [\"bm25\", \"tokenizer\"]}\n```".to_string(),
        ));
        let rewritten = rewrite_query(&completion, "what splits tokens?").await;
        assert_eq!(rewritten, "bm25 tokenizer");
    }

    #[tokio::test]
    async fn backend_failure_falls_back_to_raw_query() {
        let completion =
            FixedCompletion(Err(CompletionError::Backend("backend down".to_string())));
        let rewritten = rewrite_query(&completion, "original question").await;
        assert_eq!(rewritten, "original question");
    }

    #[tokio::test]
    async fn malformed_json_falls_back_to_raw_query() {
        let completion = FixedCompletion(Ok("sure! the keywords are: a, b".to_string()));
        let rewritten = rewrite_query(&completion, "original question").await;
        assert_eq!(rewritten, "original question");
    }

    #[tokio::test]
    async fn empty_keyword_list_falls_back() {
        let completion = FixedCompletion(Ok(r#"{"keywords": ["", "  "]}"#.to_string()));
        let rewritten = rewrite_query(&completion, "original question").await;
        assert_eq!(rewritten, "original question");
    }
}
