use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Coarse category of a user message; decides which path the
/// conversation takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Hello, good morning.
    Greeting,
    /// Small talk about the assistant itself.
    Chat,
    /// Asking what the assistant can do.
    Question,
    /// Something to execute.
    Command,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::Chat => "chat",
            Intent::Question => "question",
            Intent::Command => "command",
            Intent::Unknown => "unknown",
        }
    }

    /// Commands and unrecognized text both go through planning and extraction.
    pub fn is_actionable(&self) -> bool {
        matches!(self, Intent::Command | Intent::Unknown)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct IntentRule {
    intent: Intent,
    pattern: Regex,
}

fn rule(intent: Intent, pattern: &str) -> IntentRule {
    IntentRule {
        intent,
        pattern: Regex::new(pattern).expect("intent pattern is valid"),
    }
}

/// Checked in order; the first match wins.
static RULES: Lazy<Vec<IntentRule>> = Lazy::new(|| {
    vec![
        // ── Greeting ──
        rule(
            Intent::Greeting,
            r"\b(hola|buen[oa]s d[íi]as|buenas tardes|buenas noches|hey|hi|hello|good (morning|afternoon|evening))\b",
        ),
        // ── Chat (about the assistant) ──
        rule(
            Intent::Chat,
            r"\b(qui[ée]n|cre[óo]|creaste|c[óo]mo est[áa]s|contame de vos|decime|who (are|made|created|built) you|how are you|tell me about yourself)\b",
        ),
        // ── Question (capabilities / help) ──
        rule(
            Intent::Question,
            r"\b(qu[ée] (puedes|sabes|pod[ée]s) hacer|c[óo]mo funcionas|ayuda|help|funciones|cu[áa]les|what can you do|how do you work|capabilities)\b",
        ),
        // ── Command (work) ──
        rule(
            Intent::Command,
            r"\b(cre[áa]r?|migr[áa]r?|list[áa]r?|borr[áa]r?|analiz[áa]r?|configur[áa]r?|convert[íi]r?|descarg[áa]r?|comprim[íi]r?|renombr[áa]r?|hac[ée]|backup|carpeta|archivos?|create|make|migrate|list|delete|remove|analy[sz]e|configure|convert|download|compress|rename|folder|director(y|io)|files?)\b",
        ),
    ]
});

/// Pure, case-insensitive classifier over a fixed decision list.
#[derive(Debug, Default, Clone)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str) -> Intent {
        let text = text.trim().to_lowercase();
        RULES
            .iter()
            .find(|r| r.pattern.is_match(&text))
            .map(|r| r.intent)
            .unwrap_or(Intent::Unknown)
    }
}
