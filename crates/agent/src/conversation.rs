use once_cell::sync::Lazy;
use orion_core::{Error, Outcome, Plan, Result};
use orion_providers::CallExtractor;
use orion_storage::{ContextStore, HistoryLog};
use orion_tools::apply_aliases;
use regex::Regex;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::intent::{Intent, IntentClassifier};
use crate::planner::{rewrite_references, TaskPlanner};
use crate::runner::PlanRunner;

const GREETINGS: &[&str] = &[
    "¡Hola! Soy ORION, tu asistente de desarrollo. ¿Qué hacemos hoy?",
    "¡Buenas! Listo para automatizar. ¿En qué te ayudo?",
    "¡Hola! ¿En qué puedo ayudarte con tu proyecto?",
];

const HELP: &str = "ORION - guía rápida

1. Conversación
- Hola / Cómo estás / Quién te creó

2. Planes de varios pasos
- Creá proyecto web
- Migrá proyecto de Python 3.9 a 3.11
- Hacé un backup de archivos
- Creá carpeta 'mi_app' y archivo 'app.js'
- Configurá entorno de desarrollo

3. Acciones simples
- Listá archivos en data / Creá carpeta fotos
- Convertí data/ventas.csv a json / Analizá data/ventas.csv

Referencias como 'esa carpeta' o 'ese archivo' usan lo último que tocaste.";

const CREATOR: &str = "Me creó Dalmiro, un desarrollador apasionado por la automatización y la IA.";
const WELLBEING: &str = "¡Excelente! Siempre listo para ayudarte con tus proyectos.";
const ABOUT: &str = "Soy ORION: combino un modelo de lenguaje con automatización para simplificar tu desarrollo.";
const UNRESOLVED: &str = "¿Podés reformular? O decime 'qué puedes hacer' para ver mis capacidades.";

/// What `Conversation::process` produced. Front ends render on the variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationResult {
    /// Reply with no side effects.
    Message { text: String },
    /// A multi-step plan ran; `outcomes` stops at the first failure.
    Plan {
        text: String,
        plan: Plan,
        outcomes: Vec<Outcome>,
    },
    /// A single extracted call ran.
    Action { text: String, outcome: Outcome },
    /// Nothing actionable was found.
    Unresolved { text: String },
}

impl ConversationResult {
    pub fn text(&self) -> &str {
        match self {
            ConversationResult::Message { text }
            | ConversationResult::Plan { text, .. }
            | ConversationResult::Action { text, .. }
            | ConversationResult::Unresolved { text } => text,
        }
    }
}

/// Front-end facade: classify, then plan or extract, then execute.
///
/// Capability failures come back inside the result. `Err` means the context
/// or history could not be read or written.
pub struct Conversation {
    classifier: IntentClassifier,
    planner: TaskPlanner,
    runner: PlanRunner,
    extractor: Arc<dyn CallExtractor>,
    context: Arc<ContextStore>,
    history: HistoryLog,
    greeting_turn: AtomicUsize,
}

impl Conversation {
    pub fn new(
        runner: PlanRunner,
        extractor: Arc<dyn CallExtractor>,
        context: Arc<ContextStore>,
        history: HistoryLog,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            planner: TaskPlanner::new(),
            runner,
            extractor,
            context,
            history,
            greeting_turn: AtomicUsize::new(0),
        }
    }

    pub fn context(&self) -> &Arc<ContextStore> {
        &self.context
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn runner(&self) -> &PlanRunner {
        &self.runner
    }

    pub async fn process(&self, text: &str) -> Result<ConversationResult> {
        let intent = self.classifier.classify(text);
        info!(intent = %intent, "Intent classified");

        match intent {
            Intent::Greeting => Ok(self.greet()),
            Intent::Question => Ok(ConversationResult::Message {
                text: HELP.to_string(),
            }),
            Intent::Chat => Ok(chat_reply(text)),
            Intent::Command | Intent::Unknown => self.handle_command(text).await,
        }
    }

    fn greet(&self) -> ConversationResult {
        let turn = self.greeting_turn.fetch_add(1, Ordering::Relaxed);
        ConversationResult::Message {
            text: GREETINGS[turn % GREETINGS.len()].to_string(),
        }
    }

    async fn handle_command(&self, text: &str) -> Result<ConversationResult> {
        if let Some(plan) = self.planner.plan(text) {
            let outcomes = self.runner.execute(&plan, &self.context).await?;
            let failed = outcomes.iter().find(|o| !o.is_success());
            let summary = match failed {
                None => format!("Plan executed ({} steps)", plan.len()),
                Some(_) => format!(
                    "Plan stopped after {} of {} steps",
                    outcomes.len(),
                    plan.len()
                ),
            };
            let entry = match failed {
                Some(outcome) => format!("{}: {}", summary, outcome),
                None => summary.clone(),
            };
            self.history.append(text, &entry)?;
            return Ok(ConversationResult::Plan {
                text: format!("{}.", summary),
                plan,
                outcomes,
            });
        }

        let resolved = rewrite_references(text, &self.context.snapshot()?);
        if resolved != text {
            debug!(original = text, resolved = %resolved, "Context references rewritten");
        }

        let system_prompt = {
            let registry = self
                .runner
                .dispatcher()
                .registry()
                .read()
                .map_err(|e| Error::Other(format!("Registry lock error: {}", e)))?;
            registry.build_system_prompt(&self.context.context_string()?)
        };

        let extracted = match self.extractor.extract(&resolved, &system_prompt).await {
            Ok(call) => call,
            Err(e) => {
                warn!(extractor = self.extractor.name(), error = %e, "Call extraction failed");
                return Ok(ConversationResult::Unresolved {
                    text: UNRESOLVED.to_string(),
                });
            }
        };

        let Some(step) = extracted.into_step() else {
            debug!("Extractor returned no call");
            return Ok(ConversationResult::Unresolved {
                text: UNRESOLVED.to_string(),
            });
        };

        let outcome = self.runner.dispatcher().dispatch(&step.call, &step.args).await;
        if outcome.is_success() {
            self.context
                .infer_update(&step.call, &apply_aliases(&step.args))?;
        }
        self.history.append(text, &outcome.to_string())?;

        Ok(ConversationResult::Action {
            text: format!("Executed: {}", step.call),
            outcome,
        })
    }
}

static ASKS_CREATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(qui[ée]n te cre[óo]|cre[óo]|creaste|who (made|created|built) you)")
        .expect("creator pattern is valid")
});
static ASKS_WELLBEING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(c[óo]mo est[áa]s|how are you)").expect("wellbeing pattern is valid")
});

fn chat_reply(text: &str) -> ConversationResult {
    let lower = text.to_lowercase();
    let reply = if ASKS_CREATOR.is_match(&lower) {
        CREATOR
    } else if ASKS_WELLBEING.is_match(&lower) {
        WELLBEING
    } else {
        ABOUT
    };
    ConversationResult::Message {
        text: reply.to_string(),
    }
}
