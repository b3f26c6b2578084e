use crate::config::FallbackRule;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use std::sync::OnceLock;

/// Источник случайности для выбора шаблона
pub trait RandomSource: Send {
    /// Индекс в диапазоне `0..len`, `len > 0`
    fn pick(&mut self, len: usize) -> usize;
}

pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick(&mut self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Детерминированный источник для тестов
pub struct SeededRandom(StdRng);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for SeededRandom {
    fn pick(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}

struct ContextRule {
    needles: &'static [&'static str],
    reply: &'static str,
}

const CONTEXT_RULES: &[ContextRule] = &[
    // критика
    ContextRule {
        needles: &["not good", "bad ai", "not an good", "stupid", "dumb"],
        reply: "I'm sorry I'm not meeting your expectations. I'm here to help - what would you prefer to talk about?",
    },
    ContextRule {
        needles: &["know nothing", "dont know", "don't know"],
        reply: "I'm here to learn from our conversation! Every chat helps me improve. What would you like to discuss?",
    },
    ContextRule {
        needles: &["awesome", "great", "good", "excellent"],
        reply: "Thank you! I'm really enjoying our conversation too! 😊",
    },
    ContextRule {
        needles: &["boring", "not interesting"],
        reply: "Let's spice things up! Tell me about something you're passionate about or ask me anything!",
    },
    ContextRule {
        needles: &["sad", "angry", "upset"],
        reply: "I sense you might be feeling strong emotions. I'm here to listen and help however I can.",
    },
];

const GREETING_THERE_REPLY: &str = "Hello there! 👋 How can I help you today?";

/// "hi over there", "hey you there" и т.п.
fn is_greeting_there(input_lower: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(hello|hi|hey)[\s\w]*there").expect("Invalid greeting regex"))
        .is_match(input_lower)
}

const QUESTION_REPLIES: &[(&str, &str)] = &[
    ("what", "That's a 'what' question! I'd normally research and give you a comprehensive answer about that."),
    ("how", "That's a 'how' question! I'd provide step-by-step guidance for that."),
    ("why", "That's a 'why' question! I'd analyze the reasons and causes to give you a thorough explanation."),
    ("when", "That's a 'when' question! I'd check timelines to give you accurate timing information."),
    ("where", "That's a 'where' question! I'd use location data to provide you with precise information."),
    ("who", "That's a 'who' question! I'd search through information to find the right person or entity."),
];

pub const GENERIC_QUESTION_REPLY: &str = "That's an interesting question! I'd love to help you with that.";

/// Шаблоны с эхом исходного сообщения
fn echo_templates(message: &str) -> [String; 6] {
    [
        format!("I understand you said \"{}\". That's really interesting! Tell me more about that.", message),
        format!("Thanks for sharing: \"{}\". I find that quite fascinating!", message),
        format!("\"{}\" - that's a thoughtful point! What inspired that idea?", message),
        format!("I appreciate you saying \"{}\". It gives me insight into your perspective.", message),
        format!("That's an interesting way to put it: \"{}\". Could you elaborate?", message),
        format!("\"{}\" - that's quite insightful! How did you come to that conclusion?", message),
    ]
}

/// Локальные ответы по правилам, когда удалённый API недоступен
pub struct LocalAI {
    rules: Vec<FallbackRule>,
    random: Box<dyn RandomSource>,
}

impl LocalAI {
    pub fn new(rules: Vec<FallbackRule>, random: Box<dyn RandomSource>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| FallbackRule {
                trigger: rule.trigger.to_lowercase(),
                reply: rule.reply,
            })
            .collect();
        Self { rules, random }
    }

    pub fn get_response(&mut self, user_input: &str) -> String {
        let input_lower = user_input.to_lowercase();

        // Триггер совпадает целиком или входит подстрокой ("good" ловит и "not good")
        if let Some(rule) = self
            .rules
            .iter()
            .find(|rule| input_lower == rule.trigger || input_lower.contains(&rule.trigger))
        {
            log::debug!("Совпал триггер '{}'", rule.trigger);
            return rule.reply.clone();
        }

        if is_greeting_there(&input_lower) {
            return GREETING_THERE_REPLY.to_string();
        }

        if let Some(rule) = CONTEXT_RULES
            .iter()
            .find(|rule| rule.needles.iter().any(|needle| input_lower.contains(needle)))
        {
            return rule.reply.to_string();
        }

        if input_lower.contains('?') {
            return question_reply(&input_lower).to_string();
        }

        let templates = echo_templates(user_input);
        let index = self.random.pick(templates.len());
        templates[index].clone()
    }
}

/// Ответ по первому вопросительному слову, встреченному как отдельное слово.
/// Апостроф разделяет слова: "what's" считается вопросом "what".
fn question_reply(input_lower: &str) -> &'static str {
    input_lower
        .split(|c: char| !c.is_alphanumeric())
        .find_map(|word| {
            QUESTION_REPLIES
                .iter()
                .find(|(question, _)| *question == word)
                .map(|(_, reply)| *reply)
        })
        .unwrap_or(GENERIC_QUESTION_REPLY)
}
