use orion_agent::ConversationResult;
use orion_core::{Outcome, Plan};

/// Terminal rendering of a conversation result.
pub fn result(result: &ConversationResult) -> String {
    match result {
        ConversationResult::Message { text } => format!("ORION: {}", text),
        ConversationResult::Plan {
            text,
            plan,
            outcomes,
        } => format!("ORION: {}\n{}", text, plan_outcomes(plan, outcomes)),
        ConversationResult::Action { text, outcome } => {
            format!("ORION: {}\n  {}", text, outcome)
        }
        ConversationResult::Unresolved { text } => format!("ORION: {}", text),
    }
}

/// One line per planned step; steps that never ran are marked as skipped.
pub fn plan_outcomes(plan: &Plan, outcomes: &[Outcome]) -> String {
    plan.iter()
        .enumerate()
        .map(|(i, step)| match outcomes.get(i) {
            Some(outcome) => format!("  {}. {:<22} {}", i + 1, step.call, outcome),
            None => format!("  {}. {:<22} [skipped]", i + 1, step.call),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use orion_core::{FailureKind, Step};

    #[test]
    fn test_plan_marks_skipped_steps() {
        let plan = Plan::new(vec![
            Step::new("create_folder").arg("path", "a"),
            Step::new("create_file").arg("path", "a/b"),
            Step::new("list_files").arg("path", "a"),
        ]);
        let outcomes = vec![
            Outcome::success("Folder 'a' created"),
            Outcome::failure(FailureKind::PermissionDenied, "denied"),
        ];
        let text = plan_outcomes(&plan, &outcomes);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("[ok] Folder 'a' created"));
        assert!(lines[1].ends_with("[permission_denied] denied"));
        assert!(lines[2].ends_with("[skipped]"));
    }

    #[test]
    fn test_action_shows_outcome_tag() {
        let rendered = result(&ConversationResult::Action {
            text: "Executed: list_files".to_string(),
            outcome: Outcome::failure(FailureKind::NotFound, "no such dir"),
        });
        assert_eq!(rendered, "ORION: Executed: list_files\n  [not_found] no such dir");
    }
}
