use serde::{Deserialize, Serialize};

/// One reveal step shown before the decision screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    pub title: String,
    pub body: String,
}

impl FlowStep {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Copy shown on the decision screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCopy {
    pub question: String,
    pub accept_label: String,
    pub decline_label: String,
}

/// Fixed content shown once the recipient accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessCopy {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub promises: Vec<String>,
}

/// Reference to ambient media owned by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub source: String,
    #[serde(default)]
    pub looped: bool,
}

/// A complete flow configuration.
///
/// Every themed variant of the experience is the same state machine driven by
/// different data: the ordered steps, the decision and success copy, plus
/// opaque theme and media references the renderer interprets. The step order
/// is significant and the sequence is never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(default)]
    pub steps: Vec<FlowStep>,
    pub decision: DecisionCopy,
    pub success: SuccessCopy,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub media: Option<MediaRef>,
}

impl FlowConfig {
    /// The built-in variant: a short preamble, then the question.
    pub fn preset() -> Self {
        Self {
            steps: vec![
                FlowStep::new(
                    "Hai kamu :)",
                    "Aku mau ngomong sesuatu yang udah lama aku pendam.",
                ),
                FlowStep::new(
                    "WAJIB BACA SEBELUM JAWAB",
                    "Maap kalo confess nya sederhana, gak kayak orang² ngasih buket bunga atau coklat, \
                     karna aku cmn bisa buat kek gini aja hehe.",
                ),
                FlowStep::new("Jadi...", "Aku harap kamu mau terima :)"),
            ],
            decision: DecisionCopy {
                question: "Kamu mau gak jadi pacar aku?".to_string(),
                accept_label: "Iya".to_string(),
                decline_label: "Tidak".to_string(),
            },
            success: SuccessCopy {
                title: "I Love You! ❤️".to_string(),
                body: "Terima kasih sudah menerima cintaku. Aku berjanji akan selalu:".to_string(),
                promises: vec![
                    "💝 Menyayangimu sepenuh hati".to_string(),
                    "💫 Menjadi yang terbaik untukmu".to_string(),
                    "🌟 Membahagiakanmu setiap hari".to_string(),
                    "💕 Setia menemani dalam suka dan duka".to_string(),
                ],
            },
            theme: Some("rose".to_string()),
            media: None,
        }
    }

    /// Same copy as [`FlowConfig::preset`] with no reveal steps, so the flow
    /// opens directly on the decision screen.
    pub fn question_only() -> Self {
        Self {
            steps: Vec::new(),
            ..Self::preset()
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self::preset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_without_optional_sections_deserializes() {
        let json = r#"{
            "decision": { "question": "Q?", "accept_label": "Yes", "decline_label": "No" },
            "success": { "title": "Yay", "body": "Thanks" }
        }"#;
        let config: FlowConfig = serde_json::from_str(json).unwrap();
        assert!(config.steps.is_empty());
        assert!(config.success.promises.is_empty());
        assert!(config.theme.is_none());
        assert!(config.media.is_none());
    }

    #[test]
    fn question_only_keeps_preset_copy() {
        let config = FlowConfig::question_only();
        assert!(config.steps.is_empty());
        assert_eq!(config.decision, FlowConfig::preset().decision);
    }
}
