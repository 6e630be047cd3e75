use orion_core::{Args, Error, Outcome, Plan, Result, Step};
use orion_storage::ContextStore;
use orion_tools::{apply_aliases, Dispatcher};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

/// Executes plans step by step through the dispatcher.
///
/// Stops at the first failure. The failing step's outcome carries the abort
/// notice, so the returned list always ends with the step that stopped the
/// plan and never contains outcomes for steps that did not run. Steps already
/// executed are not undone.
#[derive(Clone)]
pub struct PlanRunner {
    dispatcher: Dispatcher,
}

impl PlanRunner {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run `plan`, updating `context` after every successful step.
    ///
    /// `Err` is only returned when the context cannot be persisted; capability
    /// failures are part of the outcome list.
    pub async fn execute(&self, plan: &Plan, context: &ContextStore) -> Result<Vec<Outcome>> {
        let total = plan.len();
        info!(steps = total, "Executing plan");
        let mut outcomes = Vec::with_capacity(total);

        for (index, step) in plan.iter().enumerate() {
            let outcome = self.dispatcher.dispatch(&step.call, &step.args).await;
            match outcome {
                Outcome::Success { .. } => {
                    context.infer_update(&step.call, &apply_aliases(&step.args))?;
                    outcomes.push(outcome);
                }
                Outcome::Failure { kind, message } => {
                    warn!(step = index + 1, call = %step.call, kind = %kind, "Plan aborted");
                    outcomes.push(Outcome::failure(
                        kind,
                        format!(
                            "Step {}/{} ({}) failed, plan aborted: {}",
                            index + 1,
                            total,
                            step.call,
                            message
                        ),
                    ));
                    return Ok(outcomes);
                }
            }
        }

        info!(steps = total, "Plan finished");
        Ok(outcomes)
    }
}

#[derive(Debug, Deserialize)]
struct PipelineFile {
    pipeline: PipelineBody,
}

#[derive(Debug, Deserialize)]
struct PipelineBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    steps: Vec<Args>,
}

/// A named plan read from a YAML pipeline file:
///
/// ```yaml
/// pipeline:
///   name: ventas
///   steps:
///     - action: convert_csv_to_json
///       input: data/ventas.csv
///       output: output/ventas.json
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub name: String,
    pub plan: Plan,
}

impl Pipeline {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: PipelineFile = serde_yaml::from_str(content)?;
        let mut steps = Vec::with_capacity(file.pipeline.steps.len());
        for (index, mut args) in file.pipeline.steps.into_iter().enumerate() {
            let call = match args.remove("action") {
                Some(Value::String(action)) if !action.trim().is_empty() => {
                    action.trim().to_string()
                }
                _ => {
                    return Err(Error::Validation(format!(
                        "Pipeline step {} has no action",
                        index + 1
                    )))
                }
            };
            steps.push(Step { call, args });
        }
        if steps.is_empty() {
            return Err(Error::Validation("Pipeline has no steps".to_string()));
        }
        Ok(Self {
            name: file.pipeline.name,
            plan: Plan::new(steps),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use orion_core::{ArgSchema, ArgType, CapabilitySchema, FailureKind};
    use orion_storage::{Database, SLOT_LAST_ACTION, SLOT_LAST_FILE, SLOT_LAST_FOLDER};
    use orion_tools::{required_str, Capability, CapabilityContext, CapabilityRegistry};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Capability for Counting {
        fn schema(&self) -> CapabilitySchema {
            CapabilitySchema::new(
                "count",
                "Count invocations",
                ArgSchema::new().optional("path", ArgType::String),
            )
        }

        async fn execute(&self, _ctx: CapabilityContext, _args: Args) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        }
    }

    struct Missing;

    #[async_trait]
    impl Capability for Missing {
        fn schema(&self) -> CapabilitySchema {
            CapabilitySchema::new(
                "open_file",
                "Always reports the file missing",
                ArgSchema::new().required("path", ArgType::String),
            )
        }

        async fn execute(&self, _ctx: CapabilityContext, args: Args) -> Result<Value> {
            Err(Error::NotFound(format!("{} not found", required_str(&args, "path")?)))
        }
    }

    fn setup(dir: &TempDir) -> (PlanRunner, ContextStore, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = CapabilityRegistry::with_builtins();
        registry.register(Arc::new(Counting { calls: calls.clone() }));
        registry.register(Arc::new(Missing));
        let dispatcher = Dispatcher::new(
            registry.into_shared(),
            CapabilityContext::new(dir.path().to_path_buf()),
        );
        let db = Database::open(&dir.path().join("orion.db")).unwrap();
        (PlanRunner::new(dispatcher), ContextStore::load(db).unwrap(), calls)
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let dir = TempDir::new().unwrap();
        let (runner, context, calls) = setup(&dir);
        let plan = Plan::new(vec![
            Step::new("count"),
            Step::new("open_file").arg("path", "nope.txt"),
            Step::new("count"),
        ]);

        let outcomes = runner.execute(&plan, &context).await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[1].failure_kind(), Some(FailureKind::NotFound));
        assert!(outcomes[1].message().contains("Step 2/3 (open_file) failed, plan aborted"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(context.get(SLOT_LAST_ACTION).unwrap().as_deref(), Some("count"));
    }

    #[tokio::test]
    async fn test_successful_steps_update_context() {
        let dir = TempDir::new().unwrap();
        let (runner, context, _) = setup(&dir);
        let plan = Plan::new(vec![
            Step::new("create_folder").arg("path", "./proj"),
            Step::new("create_file").arg("path", "proj//notes.txt").arg("content", "hi"),
        ]);

        let outcomes = runner.execute(&plan, &context).await.unwrap();
        assert!(outcomes.iter().all(Outcome::is_success));
        assert!(dir.path().join("proj/notes.txt").is_file());
        assert_eq!(context.get(SLOT_LAST_FOLDER).unwrap().as_deref(), Some("proj"));
        assert_eq!(context.get(SLOT_LAST_FILE).unwrap().as_deref(), Some("proj/notes.txt"));

        // A fresh store over the same database sees the same values.
        let reloaded = ContextStore::load(Database::open(&dir.path().join("orion.db")).unwrap()).unwrap();
        assert_eq!(reloaded.get(SLOT_LAST_FOLDER).unwrap().as_deref(), Some("proj"));
    }

    #[tokio::test]
    async fn test_invalid_args_abort_without_running() {
        let dir = TempDir::new().unwrap();
        let (runner, context, calls) = setup(&dir);
        let plan = Plan::new(vec![Step::new("open_file"), Step::new("count")]);
        let outcomes = runner.execute(&plan, &context).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].failure_kind(), Some(FailureKind::InvalidArgs));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_pipeline_parse() {
        let yaml = r#"
pipeline:
  name: ventas
  steps:
    - action: convert_csv_to_json
      input: ./data/ventas.csv
      output: output/ventas.json
    - action: analyze_data
      input_path: data/ventas.csv
      output_path: output/analysis.json
"#;
        let pipeline = Pipeline::parse(yaml).unwrap();
        assert_eq!(pipeline.name, "ventas");
        assert_eq!(pipeline.plan.len(), 2);
        let first = &pipeline.plan.steps[0];
        assert_eq!(first.call, "convert_csv_to_json");
        assert_eq!(first.args["input"], json!("data/ventas.csv"));
        assert!(first.args.get("action").is_none());
    }

    #[test]
    fn test_pipeline_step_without_action() {
        let yaml = "pipeline:\n  name: x\n  steps:\n    - input: a.csv\n";
        assert!(matches!(Pipeline::parse(yaml), Err(Error::Validation(_))));
        assert!(Pipeline::parse("pipeline:\n  name: empty\n").is_err());
    }

    #[tokio::test]
    async fn test_pipeline_aliases_reach_context() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/v.csv"), "a,b\n1,2\n").unwrap();
        let (runner, context, _) = setup(&dir);

        let pipeline = Pipeline::parse(
            "pipeline:\n  name: p\n  steps:\n    - action: convert_csv_to_json\n      input: data/v.csv\n      output: out/v.json\n",
        )
        .unwrap();
        let outcomes = runner.execute(&pipeline.plan, &context).await.unwrap();
        assert!(outcomes[0].is_success(), "{}", outcomes[0]);
        assert_eq!(context.get(SLOT_LAST_FILE).unwrap().as_deref(), Some("out/v.json"));
    }

    #[test]
    fn test_step_args_json_shape() {
        let step = Step::new("create_folder").arg("path", "x");
        assert_eq!(serde_json::to_value(&step).unwrap(), json!({"call": "create_folder", "args": {"path": "x"}}));
    }
}
