// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Chatbot proxy against Google's Gemini API.
//!
//! Thin pass-through: one user message in, one model reply out. API failures
//! degrade to a fixed apology message so the chat UI never surfaces raw
//! errors.

use serde::Deserialize;

const GEMINI_MODEL: &str = "gemini-2.5-flash";

const SYSTEM_INSTRUCTION: &str = "\
You are a helpful assistant for women's health, specifically focusing on Menopause and similar situations.

Guidelines:
1. Give small and concise answers.
2. If the client describes severe symptoms or medical emergencies, strictly advise them to consult a doctor.
3. If the question is NOT related to women's Menopause or similar women's health situations, reply exactly with: \"This is not a relevant question.\"
4. Be empathetic but professional.";

const FALLBACK_REPLY: &str = "I apologize, but I'm having trouble processing your request right now. Please try again later.";

/// Gemini chat client.
#[derive(Clone)]
pub struct ChatService {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ChatService {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key,
        }
    }

    /// Get a reply for a single user message.
    ///
    /// Any API failure returns the fixed fallback reply instead of an error.
    pub async fn get_response(&self, message: &str) -> String {
        match self.generate(message).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "Gemini request failed");
                FALLBACK_REPLY.to_string()
            }
        }
    }

    async fn generate(&self, message: &str) -> anyhow::Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, GEMINI_MODEL, self.api_key
        );

        let body = serde_json::json!({
            "system_instruction": {
                "parts": [{ "text": SYSTEM_INSTRUCTION }]
            },
            "contents": [{
                "role": "user",
                "parts": [{ "text": message }]
            }]
        });

        let response = self.http.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini HTTP {}: {}", status, body);
        }

        let reply: GenerateResponse = response.json().await?;

        reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| anyhow::anyhow!("Gemini response contained no candidates"))
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: String,
}
