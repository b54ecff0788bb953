use serde_json::Value;

use carlot_core::domain::filters::{filters_from_json, FilterMap, RECOGNIZED_FILTER_KEYS};

use crate::llm::LlmClient;

/// What one analyzed utterance contributes to the conversation.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalyzerOutcome {
    pub new_filters: FilterMap,
    pub need_more_info: bool,
    pub next_question: Option<String>,
}

/// Question asked when the model reply cannot be parsed at all.
const UNPARSEABLE_FALLBACK_QUESTION: &str =
    "Could you give more details about the car you're looking for?";

/// Question substituted when a parsed reply omits `next_question`.
const DEFAULT_NEXT_QUESTION: &str = "Could you give more details?";

/// Question asked when the completion call itself fails.
const CALL_FAILURE_QUESTION: &str =
    "Sorry, I had trouble understanding your request. Could you rephrase it?";

/// Turns one user utterance plus the current filters into an
/// `AnalyzerOutcome` by asking the LLM for a structured delta.
///
/// `analyze` never fails: malformed replies and transport errors both
/// degrade to a fallback outcome that asks the user for more detail.
pub struct EntryAnalyzer<C> {
    llm: C,
}

impl<C> EntryAnalyzer<C>
where
    C: LlmClient,
{
    pub fn new(llm: C) -> Self {
        Self { llm }
    }

    pub async fn analyze(&self, utterance: &str, current_filters: &FilterMap) -> AnalyzerOutcome {
        let prompt = render_prompt(utterance, current_filters);

        match self.llm.complete(&prompt).await {
            Ok(reply) => outcome_from_reply(&reply),
            Err(error) => {
                tracing::warn!(error = %error, "text completion call failed; degrading to fallback");
                AnalyzerOutcome {
                    new_filters: FilterMap::new(),
                    need_more_info: true,
                    next_question: Some(CALL_FAILURE_QUESTION.to_string()),
                }
            }
        }
    }
}

fn render_prompt(utterance: &str, current_filters: &FilterMap) -> String {
    let serialized_filters =
        serde_json::to_string(current_filters).unwrap_or_else(|_| "{}".to_string());
    let known_keys = RECOGNIZED_FILTER_KEYS.join(", ");

    format!(
        "Extract the vehicle search criteria from the following text, updating any \
         criteria already present.\n\
         User text: {utterance}\n\
         Current criteria: {serialized_filters}\n\n\
         Reply in pure JSON, without code fences (no ```json or ```), just the JSON \
         object with the following fields:\n\
         - new_filters: object with the newly identified filters ({known_keys})\n\
         - need_more_info: boolean indicating whether you need to ask further questions\n\
         - next_question: if need_more_info is true, the question to ask next"
    )
}

/// Two-stage parse: the whole reply as JSON, then the greedy brace-delimited
/// span. Models wrap objects in prose or code fences often enough that the
/// salvage path is load-bearing.
fn outcome_from_reply(reply: &str) -> AnalyzerOutcome {
    let parsed = parse_strict_or_salvage(reply);

    let Some(Value::Object(fields)) = parsed else {
        return AnalyzerOutcome {
            new_filters: FilterMap::new(),
            need_more_info: true,
            next_question: Some(UNPARSEABLE_FALLBACK_QUESTION.to_string()),
        };
    };

    let new_filters = match fields.get("new_filters") {
        Some(Value::Object(object)) => filters_from_json(object),
        _ => FilterMap::new(),
    };

    let need_more_info = match fields.get("need_more_info") {
        Some(Value::Bool(flag)) => *flag,
        _ => true,
    };

    // Absent means "use the stock question"; present-but-falsy (null,
    // false, "") means the model had nothing to ask.
    let next_question = match fields.get("next_question") {
        None => Some(DEFAULT_NEXT_QUESTION.to_string()),
        Some(Value::String(question)) if !question.trim().is_empty() => Some(question.clone()),
        Some(_) => None,
    };

    AnalyzerOutcome { new_filters, need_more_info, next_question }
}

fn parse_strict_or_salvage(reply: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(reply) {
        return Some(value);
    }

    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&reply[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use carlot_core::domain::filters::{FilterMap, FilterValue};

    use super::{
        outcome_from_reply, EntryAnalyzer, CALL_FAILURE_QUESTION, DEFAULT_NEXT_QUESTION,
        UNPARSEABLE_FALLBACK_QUESTION,
    };
    use crate::llm::LlmClient;

    struct CannedLlm {
        reply: Option<String>,
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => bail!("connection refused"),
            }
        }
    }

    #[tokio::test]
    async fn valid_reply_passes_through_unmodified() {
        let analyzer = EntryAnalyzer::new(CannedLlm {
            reply: Some(
                r#"{"new_filters": {"brand": "Toyota", "year_min": 2020}, "need_more_info": false, "next_question": null}"#
                    .to_string(),
            ),
        });

        let outcome = analyzer.analyze("a 2020+ Toyota", &FilterMap::new()).await;

        assert!(!outcome.need_more_info);
        assert_eq!(outcome.next_question, None);
        assert_eq!(outcome.new_filters.len(), 2);
        assert_eq!(outcome.new_filters["brand"], FilterValue::Text("Toyota".to_string()));
        assert_eq!(outcome.new_filters["year_min"], FilterValue::Number(2020.0));
    }

    #[tokio::test]
    async fn json_wrapped_in_prose_is_salvaged() {
        let analyzer = EntryAnalyzer::new(CannedLlm {
            reply: Some(
                "Sure! Here is the structured answer you asked for:\n\
                 {\"new_filters\":{\"color\":\"red\"},\"need_more_info\":false,\"next_question\":null}\n\
                 Let me know if you need anything else."
                    .to_string(),
            ),
        });

        let outcome = analyzer.analyze("a red one", &FilterMap::new()).await;

        assert!(!outcome.need_more_info);
        assert_eq!(outcome.new_filters["color"], FilterValue::Text("red".to_string()));
    }

    #[tokio::test]
    async fn code_fenced_json_is_salvaged() {
        let analyzer = EntryAnalyzer::new(CannedLlm {
            reply: Some(
                "```json\n{\"new_filters\":{},\"need_more_info\":true,\"next_question\":\"Which brand?\"}\n```"
                    .to_string(),
            ),
        });

        let outcome = analyzer.analyze("something cheap", &FilterMap::new()).await;

        assert!(outcome.need_more_info);
        assert_eq!(outcome.next_question.as_deref(), Some("Which brand?"));
    }

    #[tokio::test]
    async fn unparseable_reply_degrades_to_fixed_fallback() {
        let analyzer =
            EntryAnalyzer::new(CannedLlm { reply: Some("I like cars too!".to_string()) });

        let outcome = analyzer.analyze("hmm", &FilterMap::new()).await;

        assert!(outcome.new_filters.is_empty());
        assert!(outcome.need_more_info);
        assert_eq!(outcome.next_question.as_deref(), Some(UNPARSEABLE_FALLBACK_QUESTION));
    }

    #[tokio::test]
    async fn call_failure_degrades_to_trouble_fallback() {
        let analyzer = EntryAnalyzer::new(CannedLlm { reply: None });

        let outcome = analyzer.analyze("anything", &FilterMap::new()).await;

        assert!(outcome.new_filters.is_empty());
        assert!(outcome.need_more_info);
        assert_eq!(outcome.next_question.as_deref(), Some(CALL_FAILURE_QUESTION));
    }

    #[test]
    fn missing_keys_get_documented_defaults() {
        let outcome = outcome_from_reply("{}");

        assert!(outcome.new_filters.is_empty());
        assert!(outcome.need_more_info);
        assert_eq!(outcome.next_question.as_deref(), Some(DEFAULT_NEXT_QUESTION));
    }

    #[test]
    fn falsy_next_question_is_treated_as_no_question() {
        for reply in [
            r#"{"new_filters":{},"need_more_info":true,"next_question":false}"#,
            r#"{"new_filters":{},"need_more_info":true,"next_question":null}"#,
            r#"{"new_filters":{},"need_more_info":true,"next_question":""}"#,
        ] {
            let outcome = outcome_from_reply(reply);
            assert_eq!(outcome.next_question, None, "reply: {reply}");
        }
    }

    #[test]
    fn non_object_json_counts_as_unparseable() {
        let outcome = outcome_from_reply(r#"["not", "an", "object"]"#);
        assert_eq!(outcome.next_question.as_deref(), Some(UNPARSEABLE_FALLBACK_QUESTION));
    }

    #[test]
    fn round_trip_of_embedded_object_parses_to_embedded_values() {
        let embedded = r#"{"new_filters":{},"need_more_info":false,"next_question":null}"#;
        let outcome = outcome_from_reply(&format!("prose before {embedded} prose after"));

        assert!(outcome.new_filters.is_empty());
        assert!(!outcome.need_more_info);
        assert_eq!(outcome.next_question, None);
    }
}
