//! Resume-bullet suggestions from a chat-completion service.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::models::{LogEntry, ResumeAnalysis};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const RESUME_SYSTEM_PROMPT: &str = "You are a senior career coach who helps engineers pick out \
and phrase accomplishments that belong on a resume.";

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the raw completion text. In `json_mode` the service is asked
    /// to return a single JSON object.
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        json_mode: bool,
    ) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

pub struct OpenAiClient {
    client: reqwest::Client,
    config: OpenAiConfig,
    temperature: f32,
}

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize, Debug)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            config,
            temperature: 0.7,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        json_mode: bool,
    ) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: self.temperature,
            response_format: json_mode.then_some(ResponseFormat { kind: "json_object" }),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        completion_text(&body)
    }
}

fn completion_text(body: &str) -> Result<String, GenerationError> {
    let response: ChatResponse = serde_json::from_str(body)?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(GenerationError::Empty)
}

pub fn build_resume_prompt(entries: &[LogEntry]) -> String {
    let lines = entries
        .iter()
        .map(|entry| {
            format!(
                "- {} [{}] (impact {}/5) {}",
                entry.date, entry.category, entry.impact, entry.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"This week's work log, each line self-scored for impact from 1 to 5:
{lines}

Pick out only the items that deserve a place in a yearly performance review or a resume.

Selection rules:
1. Prefer items scored 4 or 5. Lower-scored items only qualify with clear technical depth or lasting value.
2. Leave out routine work: ordinary meetings, small bug fixes, doc upkeep, dependency bumps.
3. Keep only items with a concrete outcome or a hard problem solved.

Writing rules:
1. Never invent numbers. If the log gives no percentage or duration, describe the result qualitatively.
2. Do not exaggerate.
3. Use the "action verb + context + result" form.

If nothing this week qualifies, answer with hasResumeWorthyContent set to false and no bullets.

Answer with a JSON object:
{{
  "hasResumeWorthyContent": true,
  "bullets": [
    {{
      "text": "resume bullet text",
      "category": "Achievement | Skill | Project",
      "impactLevel": "High | Medium | Low",
      "reasoning": "why this belongs on a resume"
    }}
  ]
}}"#
    )
}

pub fn parse_resume_analysis(completion: &str) -> Result<ResumeAnalysis, GenerationError> {
    Ok(serde_json::from_str(completion)?)
}

pub async fn analyze_resume_bullets(
    generator: &dyn TextGenerator,
    entries: &[LogEntry],
) -> Result<ResumeAnalysis, GenerationError> {
    let prompt = build_resume_prompt(entries);
    let completion = generator.complete(RESUME_SYSTEM_PROMPT, &prompt, true).await?;
    parse_resume_analysis(&completion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn entry(category: &str, impact: i32, content: &str) -> LogEntry {
        LogEntry {
            id: "1".to_string(),
            title: String::new(),
            content: content.to_string(),
            category: category.to_string(),
            impact,
            date: NaiveDate::from_ymd_opt(2026, 10, 13).unwrap(),
            created_at: Utc::now(),
        }
    }

    struct Canned(&'static str);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn complete(
            &self,
            _system: &str,
            prompt: &str,
            json_mode: bool,
        ) -> Result<String, GenerationError> {
            assert!(json_mode);
            assert!(prompt.contains("Migrated billing"));
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn prompt_lists_each_entry() {
        let prompt = build_resume_prompt(&[
            entry("Project", 5, "Migrated billing to the new queue"),
            entry("Learning", 2, "Read about CRDTs"),
        ]);
        assert!(
            prompt.contains("- 2026-10-13 [Project] (impact 5/5) Migrated billing to the new queue")
        );
        assert!(prompt.contains("- 2026-10-13 [Learning] (impact 2/5) Read about CRDTs"));
        assert!(prompt.contains("\"hasResumeWorthyContent\": true"));
    }

    #[test]
    fn extracts_first_choice_content() {
        let body =
            r#"{"choices":[{"message":{"role":"assistant","content":"  {\"bullets\":[]}  "}}]}"#;
        assert_eq!(completion_text(body).unwrap(), r#"{"bullets":[]}"#);
    }

    #[test]
    fn empty_choices_are_an_error() {
        assert!(matches!(completion_text(r#"{"choices":[]}"#), Err(GenerationError::Empty)));
        assert!(matches!(
            completion_text(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(GenerationError::Empty)
        ));
    }

    #[test]
    fn parses_analysis_with_optional_fields() {
        let analysis = parse_resume_analysis(
            r#"{"hasResumeWorthyContent":true,"bullets":[
                {"text":"Led migration","category":"Project",
                 "impactLevel":"High","reasoning":"Cross-team"},
                {"text":"Bare"}
            ]}"#,
        )
        .unwrap();
        assert!(analysis.has_resume_worthy_content);
        assert_eq!(analysis.bullets.len(), 2);
        assert_eq!(analysis.bullets[0].impact_level.as_deref(), Some("High"));
        assert_eq!(analysis.bullets[1].category, "");
    }

    #[test]
    fn unparsable_completion_is_rejected() {
        assert!(matches!(
            parse_resume_analysis("Here are your bullets!"),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn analyze_sends_prompt_and_parses_reply() {
        let generator = Canned(r#"{"hasResumeWorthyContent":false,"bullets":[]}"#);
        let entries = [entry("Project", 5, "Migrated billing")];
        let analysis = analyze_resume_bullets(&generator, &entries).await.unwrap();
        assert!(!analysis.has_resume_worthy_content);
        assert!(analysis.bullets.is_empty());
    }
}
