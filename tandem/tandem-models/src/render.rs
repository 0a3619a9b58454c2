//! Flattening a [`ModelContext`] into a single completion prompt.

use tandem_core::{ModelContext, ModelRole, Role, Turn};

/// Render a context as the plain-text prompt sent to a completion engine.
///
/// Layout: preamble, code memory (code role only), history, then the current
/// prompt followed by an open assistant slot.
pub fn render_prompt(context: &ModelContext) -> String {
    let mut out = String::with_capacity(context.system_preamble.len() + context.prompt.len() + 256);

    out.push_str(context.system_preamble.trim_end());
    out.push_str("\n\n");

    if context.target_model == ModelRole::Code {
        if let Some(accepted) = &context.code_memory.last_accepted {
            out.push_str("Code the user accepted earlier:\n");
            push_fenced(&mut out, accepted, context);
        }
        if let Some(rejected) = &context.code_memory.last_rejected {
            out.push_str("Code the user rejected (do not repeat it):\n");
            push_fenced(&mut out, rejected, context);
        }
    }

    for turn in &context.history_window {
        push_turn(&mut out, turn);
    }

    out.push_str("User: ");
    out.push_str(context.prompt.trim());
    out.push_str("\nAssistant:");
    out
}

fn push_turn(out: &mut String, turn: &Turn) {
    let label = match turn.role {
        Role::User => "User",
        Role::Assistant => "Assistant",
    };
    out.push_str(label);
    out.push_str(": ");
    out.push_str(turn.text.trim());
    out.push('\n');

    if let Some(code) = turn.code.as_deref().filter(|c| !c.trim().is_empty()) {
        let tag = turn.code_kind.map(|k| k.as_str()).unwrap_or_default();
        out.push_str("```");
        out.push_str(tag);
        out.push('\n');
        out.push_str(code.trim_end());
        out.push_str("\n```\n");
    }
    out.push('\n');
}

fn push_fenced(out: &mut String, code: &str, context: &ModelContext) {
    let tag = context.language_hint.map(|k| k.as_str()).unwrap_or_default();
    out.push_str("```");
    out.push_str(tag);
    out.push('\n');
    out.push_str(code.trim_end());
    out.push_str("\n```\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_core::{CodeKind, CodeMemory, SamplingHint};

    fn context(role: ModelRole) -> ModelContext {
        ModelContext {
            system_preamble: "You are a helpful assistant.".into(),
            history_window: vec![
                Turn::user("write hello"),
                Turn::assistant("Here it is", Some("print('hello')".into()), Some(CodeKind::Python)),
            ],
            prompt: "now add a loop".into(),
            target_model: role,
            code_memory: CodeMemory {
                last_accepted: None,
                last_rejected: Some("while True: pass".into()),
            },
            language_hint: Some(CodeKind::Python),
            sampling: SamplingHint::Balanced,
        }
    }

    #[test]
    fn test_render_layout() {
        let rendered = render_prompt(&context(ModelRole::Code));
        assert!(rendered.starts_with("You are a helpful assistant.\n\n"));
        assert!(rendered.contains("User: write hello\n"));
        assert!(rendered.contains("```python\nprint('hello')\n```"));
        assert!(rendered.ends_with("User: now add a loop\nAssistant:"));
    }

    #[test]
    fn test_rejected_code_only_for_code_role() {
        assert!(render_prompt(&context(ModelRole::Code)).contains("do not repeat it"));
        assert!(!render_prompt(&context(ModelRole::Dialogue)).contains("do not repeat it"));
    }
}
