//! Builds the per-model context for a generation.

use crate::classifier::{Classification, looks_like_code};
use once_cell::sync::Lazy;
use regex::Regex;
use tandem_core::config::ContextConfig;
use tandem_core::{
    CodeMemory, Intent, ModelContext, ModelRole, ReplyLanguage, Role, SamplingHint, Turn,
};

const DIALOGUE_PREAMBLE: &str = "You are Tandem, a friendly programming assistant running \
entirely on the user's machine. Answer clearly and concisely, keep a natural conversational \
tone and do not invent facts.";

const DIALOGUE_WITH_CODE_NOTE: &str = "A separate code model writes the code for this request; \
explain the approach briefly instead of writing a full listing.";

const CODE_PREAMBLE: &str = "You are a code generator. Reply with exactly one fenced code block. \
The code must be complete, runnable and follow the conventions of its language. Keep comments \
short and put no explanations outside the block.";

static SPANISH_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[ñ¿¡]|\b(usted|hola|gracias|ejemplo|explicar|escribe|qué|cómo|por favor|función)\b")
        .unwrap()
});

static PORTUGUESE_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[ãõçâêôàáéíóú]|\b(você|voce|oi|obrigad[oa]|exemplo|código|codigo|escreva|crie|gere|explique|como vai|tudo bem)\b",
    )
    .unwrap()
});

/// Detect the language the user is writing in.
pub fn detect_reply_language(prompt: &str) -> ReplyLanguage {
    let lowered = prompt.to_lowercase();
    if SPANISH_MARKERS.is_match(&lowered) {
        ReplyLanguage::Spanish
    } else if PORTUGUESE_MARKERS.is_match(&lowered) {
        ReplyLanguage::PortugueseBr
    } else {
        ReplyLanguage::English
    }
}

/// Pick a decoding temperament from the prompt wording.
pub fn detect_sampling(prompt: &str) -> SamplingHint {
    let lowered = prompt.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lowered.contains(w));

    if has(&["imagine", "crie", "creative", "criativo", "creativo", "desenhe", "design"]) {
        SamplingHint::Creative
    } else if has(&["exato", "exata", "preciso", "precisa", "exact", "precise", "exacto", "técnico", "específico"]) {
        SamplingHint::Precise
    } else {
        SamplingHint::Balanced
    }
}

/// Assembles [`ModelContext`]s within the configured history budget.
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    config: ContextConfig,
}

impl ContextAssembler {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Build the context for `target` from the prompt and trailing history.
    ///
    /// The code context carries `code_memory`; the dialogue context never does.
    pub fn assemble(
        &self,
        target: ModelRole,
        prompt: &str,
        history: &[Turn],
        classification: &Classification,
        code_memory: &CodeMemory,
    ) -> ModelContext {
        let system_preamble = match target {
            ModelRole::Dialogue => self.dialogue_preamble(prompt, classification.intent),
            ModelRole::Code => self.code_preamble(classification),
        };

        let code_memory = match target {
            ModelRole::Code => code_memory.clone(),
            ModelRole::Dialogue => CodeMemory::default(),
        };

        ModelContext {
            system_preamble,
            history_window: self.history_window(target, history),
            prompt: prompt.to_string(),
            target_model: target,
            code_memory,
            language_hint: classification.language_hint,
            sampling: detect_sampling(prompt),
        }
    }

    fn dialogue_preamble(&self, prompt: &str, intent: Intent) -> String {
        let mut preamble = format!(
            "{}\n{}",
            DIALOGUE_PREAMBLE,
            detect_reply_language(prompt).instruction()
        );
        if intent == Intent::Both {
            preamble.push('\n');
            preamble.push_str(DIALOGUE_WITH_CODE_NOTE);
        }
        preamble
    }

    fn code_preamble(&self, classification: &Classification) -> String {
        match classification.language_hint {
            Some(kind) => format!(
                "{}\nWrite the code in {} and tag the fence with `{}`.",
                CODE_PREAMBLE, kind, kind
            ),
            None => format!(
                "{}\nUse the most suitable language and tag the fence with its name.",
                CODE_PREAMBLE
            ),
        }
    }

    /// Most recent turns, clipped, oldest dropped first to fit the budget.
    fn history_window(&self, target: ModelRole, history: &[Turn]) -> Vec<Turn> {
        let start = history.len().saturating_sub(self.config.history_turns);
        let candidates = history[start..].iter().filter(|turn| match target {
            ModelRole::Dialogue => true,
            ModelRole::Code => {
                turn.role == Role::User || turn.has_code() || looks_like_code(&turn.text)
            }
        });

        let mut window: Vec<Turn> = candidates
            .map(|turn| {
                let mut clipped = turn.clone();
                clipped.text = clip(&turn.text, self.config.turn_clip_chars);
                clipped
            })
            .collect();

        let mut total: usize = window.iter().map(turn_chars).sum();
        while total > self.config.char_budget && !window.is_empty() {
            let dropped = window.remove(0);
            total -= turn_chars(&dropped);
        }

        window
    }
}

fn turn_chars(turn: &Turn) -> usize {
    turn.text.chars().count() + turn.code.as_deref().map_or(0, |c| c.chars().count())
}

fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_core::CodeKind;

    fn classification(intent: Intent, language_hint: Option<CodeKind>) -> Classification {
        Classification {
            intent,
            language_hint,
            follow_up: false,
        }
    }

    fn assembler(history_turns: usize, char_budget: usize) -> ContextAssembler {
        ContextAssembler::new(ContextConfig {
            history_turns,
            char_budget,
            turn_clip_chars: 500,
        })
    }

    #[test]
    fn test_reply_language() {
        assert_eq!(detect_reply_language("Olá, como vai?"), ReplyLanguage::PortugueseBr);
        assert_eq!(detect_reply_language("¿Cómo estás?"), ReplyLanguage::Spanish);
        assert_eq!(detect_reply_language("hola, escribe una función"), ReplyLanguage::Spanish);
        assert_eq!(detect_reply_language("Write a function"), ReplyLanguage::English);
    }

    #[test]
    fn test_sampling_hint() {
        assert_eq!(detect_sampling("imagine a story"), SamplingHint::Creative);
        assert_eq!(detect_sampling("seja preciso"), SamplingHint::Precise);
        assert_eq!(detect_sampling("write a sort"), SamplingHint::Balanced);
    }

    #[test]
    fn test_dialogue_context_has_language_instruction() {
        let ctx = ContextAssembler::default().assemble(
            ModelRole::Dialogue,
            "Olá, como vai?",
            &[],
            &classification(Intent::DialogueOnly, None),
            &CodeMemory::default(),
        );
        assert!(ctx.system_preamble.contains("português do Brasil"));
        assert!(!ctx.system_preamble.contains("separate code model"));
        assert_eq!(ctx.prompt, "Olá, como vai?");
    }

    #[test]
    fn test_code_context_carries_code_memory() {
        let memory = CodeMemory {
            last_accepted: None,
            last_rejected: Some("print('bad')".into()),
        };
        let class = classification(Intent::CodeOnly, Some(CodeKind::Python));
        let asm = ContextAssembler::default();

        let code = asm.assemble(ModelRole::Code, "fix it", &[], &class, &memory);
        assert_eq!(code.code_memory, memory);
        assert!(code.system_preamble.contains("python"));

        let dialogue = asm.assemble(ModelRole::Dialogue, "fix it", &[], &class, &memory);
        assert!(dialogue.code_memory.is_empty());
    }

    #[test]
    fn test_history_window_limits() {
        let history: Vec<Turn> = (0..20).map(|i| Turn::user(format!("message {}", i))).collect();
        let ctx = assembler(4, 10_000).assemble(
            ModelRole::Dialogue,
            "next",
            &history,
            &classification(Intent::DialogueOnly, None),
            &CodeMemory::default(),
        );
        let texts: Vec<_> = ctx.history_window.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["message 16", "message 17", "message 18", "message 19"]);
    }

    #[test]
    fn test_history_budget_drops_oldest() {
        let history = vec![
            Turn::user("a".repeat(300)),
            Turn::user("b".repeat(300)),
            Turn::user("c".repeat(300)),
        ];
        let ctx = assembler(10, 700).assemble(
            ModelRole::Dialogue,
            "next",
            &history,
            &classification(Intent::DialogueOnly, None),
            &CodeMemory::default(),
        );
        assert_eq!(ctx.history_window.len(), 2);
        assert!(ctx.history_window[0].text.starts_with('b'));
    }

    #[test]
    fn test_turns_are_clipped() {
        let history = vec![Turn::user("x".repeat(2000))];
        let ctx = ContextAssembler::default().assemble(
            ModelRole::Dialogue,
            "next",
            &history,
            &classification(Intent::DialogueOnly, None),
            &CodeMemory::default(),
        );
        assert_eq!(ctx.history_window[0].text.chars().count(), 501);
    }

    #[test]
    fn test_code_context_drops_chatty_assistant_turns() {
        let history = vec![
            Turn::user("hi"),
            Turn::assistant("Hello! How can I help?", None, None),
            Turn::user("write a sum"),
            Turn::assistant("", Some("def soma(a, b): return a + b".into()), Some(CodeKind::Python)),
        ];
        let ctx = ContextAssembler::default().assemble(
            ModelRole::Code,
            "add types",
            &history,
            &classification(Intent::CodeOnly, Some(CodeKind::Python)),
            &CodeMemory::default(),
        );
        assert_eq!(ctx.history_window.len(), 3);
        assert!(ctx.history_window.iter().all(|t| t.text != "Hello! How can I help?"));
    }
}
