use once_cell::sync::Lazy;
use orion_core::{Plan, Step};
use orion_storage::{SLOT_LAST_FILE, SLOT_LAST_FOLDER};
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// A deterministic rule: inspects lower-cased text, returns a plan on match.
pub struct PlanRule {
    pub name: &'static str,
    build: fn(&str) -> Option<Plan>,
}

/// Evaluated top to bottom; the first rule that yields a plan wins.
static RULES: &[PlanRule] = &[
    PlanRule {
        name: "web_project",
        build: web_project,
    },
    PlanRule {
        name: "project_migration",
        build: project_migration,
    },
    PlanRule {
        name: "folder_and_file",
        build: folder_and_file,
    },
    PlanRule {
        name: "python_migration",
        build: python_migration,
    },
    PlanRule {
        name: "dev_environment",
        build: dev_environment,
    },
    PlanRule {
        name: "file_backup",
        build: file_backup,
    },
];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("planner pattern is valid")
}

static WEB_PROJECT: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(cre[áa]r?( un)? proyecto web|create (a )?web project)\b"));
static PROJECT_MIGRATION: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(migr[áa]r?( el)? proyecto|migrate (the )?project)\b"));
static FOLDER_AND_FILE: Lazy<Regex> = Lazy::new(|| {
    compile(r#"(?:carpeta|folder) ['"](.+?)['"] (?:y|and) (?:archivo|file) ['"](.+?)['"]"#)
});
static PYTHON_MIGRATION: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?:migr[áa]r? proyecto de python (.+?) a (.+)|migrate (?:the )?project from python (.+?) to (.+))")
});
static DEV_ENVIRONMENT: Lazy<Regex> = Lazy::new(|| {
    compile(r"\b(configur[áa]r? (el )?entorno de desarrollo|set ?up (a |the )?dev(elopment)? environment)\b")
});
static FILE_BACKUP: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(backup de archivos|back ?up (the )?files|file backup)\b"));

fn create_folder(path: &str) -> Step {
    Step::new("create_folder").arg("path", path)
}

fn create_file(path: &str, content: &str) -> Step {
    Step::new("create_file").arg("path", path).arg("content", content)
}

fn web_project(text: &str) -> Option<Plan> {
    WEB_PROJECT.is_match(text).then(|| {
        Plan::new(vec![
            create_folder("proyecto_web"),
            create_file(
                "proyecto_web/index.html",
                "<html><body><h1>Hola Mundo</h1></body></html>",
            ),
            create_file("proyecto_web/style.css", "body { background-color: #f0f0f0; }"),
        ])
    })
}

fn project_migration(text: &str) -> Option<Plan> {
    if !PROJECT_MIGRATION.is_match(text) || text.contains("python") {
        return None;
    }
    Some(Plan::new(vec![
        Step::new("analyze_data")
            .arg("input_path", ".")
            .arg("output_path", "migration_report.json"),
        create_file("requirements_updated.txt", "# Updated requirements"),
    ]))
}

fn folder_and_file(text: &str) -> Option<Plan> {
    let caps = FOLDER_AND_FILE.captures(text)?;
    let folder = caps.get(1)?.as_str().trim();
    let file = caps.get(2)?.as_str().trim();
    Some(Plan::new(vec![
        create_folder(folder),
        create_file(&format!("{}/{}", folder, file), &format!("Contenido de {}", file)),
    ]))
}

fn python_migration(text: &str) -> Option<Plan> {
    let caps = PYTHON_MIGRATION.captures(text)?;
    let old = caps.get(1).or_else(|| caps.get(3))?.as_str().trim();
    let new = caps
        .get(2)
        .or_else(|| caps.get(4))?
        .as_str()
        .trim()
        .trim_end_matches(&['.', '!', '?'][..]);
    Some(Plan::new(vec![
        Step::new("analyze_data")
            .arg("input_path", ".")
            .arg("output_path", format!("migration_{}_to_{}.json", old, new)),
        create_file("requirements.txt", &format!("# Migrated to Python {}", new)),
    ]))
}

fn dev_environment(text: &str) -> Option<Plan> {
    DEV_ENVIRONMENT.is_match(text).then(|| {
        Plan::new(vec![
            create_file(".env", "DEBUG=True\nENV=development"),
            create_file(".gitignore", "*.pyc\n__pycache__/\n.env"),
            create_folder("src"),
            create_folder("tests"),
        ])
    })
}

fn file_backup(text: &str) -> Option<Plan> {
    FILE_BACKUP.is_match(text).then(|| {
        Plan::new(vec![
            create_folder("backup"),
            Step::new("list_files").arg("path", "."),
            create_file("backup/log.txt", "Backup completado"),
        ])
    })
}

/// Rule-based half of the hybrid planner. When no rule matches, callers fall
/// back to single-call extraction.
#[derive(Debug, Default, Clone)]
pub struct TaskPlanner;

impl TaskPlanner {
    pub fn new() -> Self {
        Self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        RULES.iter().map(|r| r.name).collect()
    }

    pub fn plan(&self, text: &str) -> Option<Plan> {
        let lower = text.trim().to_lowercase();
        for rule in RULES {
            if let Some(plan) = (rule.build)(&lower) {
                info!(rule = rule.name, steps = plan.len(), "Plan generated by rule");
                return Some(plan);
            }
        }
        debug!("No plan rule matched");
        None
    }
}

/// Anaphoric phrases and the context slot that resolves them.
static REFERENCES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            compile(
                r"(?i)\b(esa misma carpeta|esa carpeta|ese directorio|that folder|that directory|the same folder|all[íi]|ah[íi]|there)\b",
            ),
            SLOT_LAST_FOLDER,
        ),
        (
            compile(
                r"(?i)\b(ese mismo archivo|ese archivo|ese documento|that file|that document|the same file)\b",
            ),
            SLOT_LAST_FILE,
        ),
    ]
});

/// Replace references like "esa carpeta" or "that file" with the value of
/// the matching context slot. Phrases whose slot is empty are left alone.
pub fn rewrite_references(text: &str, context: &BTreeMap<String, Option<String>>) -> String {
    let mut out = text.to_string();
    for (pattern, slot) in REFERENCES.iter() {
        let value = context
            .get(*slot)
            .and_then(|v| v.as_deref())
            .filter(|v| !v.is_empty());
        let Some(value) = value else {
            continue;
        };
        if pattern.is_match(&out) {
            debug!(slot, value, "Resolved context reference");
            out = pattern
                .replace_all(&out, |_: &regex::Captures| value.to_string())
                .into_owned();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn steps(plan: &Plan) -> Vec<(&str, Option<&str>)> {
        plan.iter().map(|s| (s.call.as_str(), s.str_arg("path"))).collect()
    }

    #[test]
    fn test_folder_and_file_rule() {
        let plan = TaskPlanner::new()
            .plan("creá carpeta 'mi_app' y archivo 'app.js'")
            .unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(
            steps(&plan),
            vec![("create_folder", Some("mi_app")), ("create_file", Some("mi_app/app.js"))]
        );
        assert_eq!(plan.steps[1].args["content"], json!("Contenido de app.js"));
    }

    #[test]
    fn test_folder_and_file_normalizes_captures() {
        let plan = TaskPlanner::new()
            .plan(r#"create folder "./docs\\api" and file "index.md""#)
            .unwrap();
        assert_eq!(plan.steps[0].str_arg("path"), Some("docs/api"));
        assert_eq!(plan.steps[1].str_arg("path"), Some("docs/api/index.md"));
    }

    #[test]
    fn test_web_project_rule() {
        let plan = TaskPlanner::new().plan("Creá proyecto web").unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.steps[0].call, "create_folder");
        assert_eq!(plan.steps[2].str_arg("path"), Some("proyecto_web/style.css"));
    }

    #[test]
    fn test_migration_rules_are_ordered() {
        let planner = TaskPlanner::new();
        let simple = planner.plan("migrá proyecto").unwrap();
        assert_eq!(simple.steps[0].args["output_path"], json!("migration_report.json"));

        let python = planner.plan("Migrá proyecto de Python 3.9 a 3.11").unwrap();
        assert_eq!(python.steps[0].args["output_path"], json!("migration_3.9_to_3.11.json"));
        assert_eq!(python.steps[1].args["content"], json!("# Migrated to Python 3.11"));
    }

    #[test]
    fn test_dev_environment_keeps_dotfiles() {
        let plan = TaskPlanner::new().plan("configurá entorno de desarrollo").unwrap();
        assert_eq!(
            steps(&plan),
            vec![
                ("create_file", Some(".env")),
                ("create_file", Some(".gitignore")),
                ("create_folder", Some("src")),
                ("create_folder", Some("tests")),
            ]
        );
    }

    #[test]
    fn test_backup_rule() {
        let plan = TaskPlanner::new().plan("hacé un backup de archivos").unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.steps[1].call, "list_files");
    }

    #[test]
    fn test_no_rule_matches() {
        assert!(TaskPlanner::new().plan("listá archivos en data").is_none());
        assert_eq!(TaskPlanner::new().rule_names().len(), 6);
    }

    fn context(folder: Option<&str>, file: Option<&str>) -> BTreeMap<String, Option<String>> {
        let mut ctx = BTreeMap::new();
        ctx.insert(SLOT_LAST_FOLDER.to_string(), folder.map(String::from));
        ctx.insert(SLOT_LAST_FILE.to_string(), file.map(String::from));
        ctx
    }

    #[test]
    fn test_rewrite_references() {
        let ctx = context(Some("proyectos"), Some("data/ventas.csv"));
        assert_eq!(
            rewrite_references("listá archivos en esa carpeta", &ctx),
            "listá archivos en proyectos"
        );
        assert_eq!(
            rewrite_references("analizá ESE ARCHIVO", &ctx),
            "analizá data/ventas.csv"
        );
        assert_eq!(rewrite_references("list files there", &ctx), "list files proyectos");
    }

    #[test]
    fn test_rewrite_references_common_phrases() {
        let ctx = context(Some("test_folder"), Some("test_file.txt"));
        let cases = [
            ("listá archivos en esa carpeta", "listá archivos en test_folder"),
            ("ponelo ahí", "ponelo test_folder"),
            ("listá archivos en el directorio", "listá archivos en el directorio"),
            ("listá archivos en ese directorio", "listá archivos en test_folder"),
            ("borrá ese archivo", "borrá test_file.txt"),
            ("procesá ese documento", "procesá test_file.txt"),
            ("open that document", "open test_file.txt"),
        ];
        for (input, expected) in cases {
            assert_eq!(rewrite_references(input, &ctx), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_rewrite_skips_empty_slots_and_partial_words() {
        let ctx = context(None, Some("a.txt"));
        assert_eq!(
            rewrite_references("listá archivos en esa carpeta", &ctx),
            "listá archivos en esa carpeta"
        );
        assert_eq!(rewrite_references("therefore", &context(Some("x"), None)), "therefore");
    }

    #[test]
    fn test_rewrite_value_is_literal() {
        let ctx = context(Some("$1 money"), None);
        assert_eq!(rewrite_references("open that folder", &ctx), "open $1 money");
    }
}
