//! Keyword-based routing between the Dialogue and Code models.

use once_cell::sync::Lazy;
use regex::Regex;
use tandem_core::{CodeKind, Intent, Role, Turn};
use tracing::debug;

/// Routing decision for one prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub intent: Intent,
    pub language_hint: Option<CodeKind>,
    /// The prompt continues work on code from the previous reply
    pub follow_up: bool,
}

static CODE_TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ```
        | \b(def|fn|func|function|class|struct|impl|import|return)\s+\w
        | \w+\([^)]*\)\s*[{:;]
        | \bprint\s*\(
        | console\.log
        | =>
        | </?[a-z][a-z0-9]*[\s>]
        | ;\s*$
        ",
    )
    .unwrap()
});

/// True when free text looks like it contains source code.
pub fn looks_like_code(text: &str) -> bool {
    text.lines().any(|line| CODE_TOKENS.is_match(line))
}

/// Deterministic keyword classifier (pt / en / es).
pub struct IntentClassifier {
    code_keywords: Vec<&'static str>,
    conversational_keywords: Vec<&'static str>,
    follow_up_keywords: Vec<&'static str>,
    languages: Vec<(&'static str, CodeKind)>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self {
            code_keywords: vec![
                // Portuguese
                "corrija", "gere", "escreva", "crie", "implemente", "desenvolva", "programe",
                "codifique", "refatore", "depure", "código", "codigo", "função", "funcao",
                "script", "programa", "algoritmo", "classe", "método", "metodo",
                // English
                "write", "implement", "fix", "generate", "create", "refactor", "debug", "code",
                "function", "class", "method", "program", "algorithm", "snippet", "regex",
                // Spanish
                "escribe", "genera", "implementa", "corrige", "crea", "desarrolla", "función",
                "clase",
            ],
            conversational_keywords: vec![
                // Greetings and small talk
                "olá", "ola", "oi", "hello", "hi", "hey", "hola", "bom dia", "boa tarde",
                "boa noite", "buenos días", "buenos dias", "good morning", "obrigado", "obrigada",
                "thanks", "thank you", "gracias", "como vai", "tudo bem", "how are you",
                "qué tal", "que tal",
                // Questions and explanations
                "explique", "explica", "explain", "what is", "what's", "o que é", "o que e",
                "qué es", "que es", "por que", "porque", "why", "como funciona", "how does",
                "tell me", "me fale", "me conte", "diferença", "difference", "diferencia",
            ],
            follow_up_keywords: vec![
                "continue", "continua", "adicione", "modifique", "melhore", "add", "change",
                "añade", "modifica", "mejora",
            ],
            languages: vec![
                ("python", CodeKind::Python),
                ("py", CodeKind::Python),
                ("javascript", CodeKind::JavaScript),
                ("js", CodeKind::JavaScript),
                ("node", CodeKind::JavaScript),
                ("nodejs", CodeKind::JavaScript),
                ("typescript", CodeKind::TypeScript),
                ("html", CodeKind::Html),
                ("página", CodeKind::Html),
                ("pagina", CodeKind::Html),
                ("css", CodeKind::Css),
                ("java", CodeKind::Java),
                ("c++", CodeKind::Cpp),
                ("cpp", CodeKind::Cpp),
                ("c#", CodeKind::CSharp),
                ("csharp", CodeKind::CSharp),
                ("rust", CodeKind::Rust),
                ("golang", CodeKind::Go),
                ("in go", CodeKind::Go),
                ("em go", CodeKind::Go),
                ("en go", CodeKind::Go),
                ("in c", CodeKind::C),
                ("em c", CodeKind::C),
                ("en c", CodeKind::C),
                ("bash", CodeKind::Bash),
                ("shell", CodeKind::Bash),
                ("sql", CodeKind::Sql),
                ("json", CodeKind::Json),
                ("ruby", CodeKind::Ruby),
                ("php", CodeKind::Php),
                ("kotlin", CodeKind::Kotlin),
                ("swift", CodeKind::Swift),
            ],
        }
    }

    /// Classify a prompt given the trailing conversation.
    pub fn classify(&self, prompt: &str, recent: &[Turn]) -> Classification {
        let padded = padded_words(prompt);

        let language = self.detect_language_in(&padded);
        let code_signal = language.is_some()
            || contains_any(&padded, &self.code_keywords)
            || looks_like_code(prompt);
        let conversational = contains_any(&padded, &self.conversational_keywords);

        let last_code = recent
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant)
            .filter(|t| t.has_code());
        let follow_up =
            last_code.is_some() && contains_any(&padded, &self.follow_up_keywords);

        let intent = match (code_signal, conversational) {
            (true, false) => Intent::CodeOnly,
            (false, true) if !follow_up => Intent::DialogueOnly,
            _ => Intent::Both,
        };

        let language_hint = language.or_else(|| {
            if follow_up {
                last_code.and_then(|t| t.code_kind)
            } else {
                None
            }
        });

        debug!(
            "Classified prompt: intent={}, language={:?}, follow_up={}",
            intent, language_hint, follow_up
        );

        Classification {
            intent,
            language_hint,
            follow_up,
        }
    }

    fn detect_language_in(&self, padded: &str) -> Option<CodeKind> {
        self.languages
            .iter()
            .find(|(name, _)| contains_phrase(padded, name))
            .map(|(_, kind)| *kind)
    }
}

/// Lowercase words separated by single spaces, with a leading and trailing
/// space so phrases can be matched on word boundaries.
fn padded_words(text: &str) -> String {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#' || c == '\''))
        .filter(|w| !w.is_empty())
        .collect();
    format!(" {} ", words.join(" "))
}

fn contains_phrase(padded: &str, phrase: &str) -> bool {
    padded.contains(&format!(" {} ", phrase))
}

fn contains_any(padded: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| contains_phrase(padded, p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(prompt: &str) -> Classification {
        IntentClassifier::new().classify(prompt, &[])
    }

    #[test]
    fn test_greeting_is_dialogue_only() {
        assert_eq!(classify("Olá, como vai?").intent, Intent::DialogueOnly);
        assert_eq!(classify("hello there").intent, Intent::DialogueOnly);
        assert_eq!(classify("¿Qué tal?").intent, Intent::DialogueOnly);
    }

    #[test]
    fn test_code_requests() {
        assert_eq!(classify("Write a function").intent, Intent::CodeOnly);
        assert_eq!(classify("corrija esse código").intent, Intent::CodeOnly);
        assert_eq!(classify("gere um script em python").intent, Intent::CodeOnly);
        assert_eq!(classify("escribe una función en rust").intent, Intent::CodeOnly);
    }

    #[test]
    fn test_mixed_is_both() {
        assert_eq!(classify("explique como escrever uma função").intent, Intent::Both);
        assert_eq!(classify("what is a closure in javascript").intent, Intent::Both);
    }

    #[test]
    fn test_no_signal_is_both() {
        assert_eq!(classify("tabuada do 7").intent, Intent::Both);
    }

    #[test]
    fn test_code_tokens_count_as_code() {
        assert_eq!(classify("print(1) não funciona").intent, Intent::CodeOnly);
        assert!(looks_like_code("def soma(a, b):"));
        assert!(!looks_like_code("just some prose here"));
    }

    #[test]
    fn test_language_hint() {
        assert_eq!(classify("crie uma página html").language_hint, Some(CodeKind::Html));
        assert_eq!(classify("write it in c++").language_hint, Some(CodeKind::Cpp));
        assert_eq!(classify("javascript please").language_hint, Some(CodeKind::JavaScript));
        assert_eq!(classify("write a function in go").language_hint, Some(CodeKind::Go));
        assert_eq!(classify("let's go have a chat").language_hint, None);
    }

    #[test]
    fn test_follow_up_uses_last_code() {
        let history = vec![
            Turn::user("escreva uma função de soma"),
            Turn::assistant("", Some("def soma(a, b):\n    return a + b".into()), Some(CodeKind::Python)),
        ];
        let c = IntentClassifier::new().classify("ok, thanks! now add logging", &history);
        assert_eq!(c.intent, Intent::Both);
        assert!(c.follow_up);
        assert_eq!(c.language_hint, Some(CodeKind::Python));
    }

    #[test]
    fn test_follow_up_without_prior_code() {
        let history = vec![Turn::user("hi"), Turn::assistant("hello!", None, None)];
        let c = IntentClassifier::new().classify("thanks, add more detail", &history);
        assert_eq!(c.intent, Intent::DialogueOnly);
        assert!(!c.follow_up);
    }
}
