//! Prompt template selection per chat command
//!
//! A leading command prefix picks the generation mode; the rest of the
//! message becomes the user prompt. No prefix means the standard mode.

use crate::config::GeneratorConfig;
use crate::quota::Tier;

/// Generation mode, selected by a leading command prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenMode {
    /// Concise default answer, no prefix required
    Standard,
    /// `/a` - long-form, in-depth answer
    Detailed,
    /// `/4` - advanced model, slower but more accurate
    Advanced,
    /// `/u` - grammar cleanup of the supplied text
    Grammar,
}

/// Command prefixes and the mode each selects
const PREFIX_MAP: &[(&str, GenMode)] = &[
    ("/a", GenMode::Detailed),
    ("/4", GenMode::Advanced),
    ("/u", GenMode::Grammar),
];

impl GenMode {
    /// Detect a leading mode prefix and strip it from the prompt
    ///
    /// Returns the selected mode and the trimmed remainder. Text without a
    /// known prefix is handed to [`GenMode::Standard`] untouched.
    #[must_use]
    pub fn parse_command(text: &str) -> (Self, &str) {
        for (prefix, mode) in PREFIX_MAP {
            if let Some(rest) = text.strip_prefix(prefix) {
                return (*mode, rest.trim());
            }
        }
        (Self::Standard, text)
    }

    /// Cost tier this mode is billed against
    #[must_use]
    pub const fn tier(self) -> Tier {
        match self {
            Self::Detailed | Self::Advanced => Tier::Pro,
            Self::Standard | Self::Grammar => Tier::Cheap,
        }
    }

    /// Model id to request for this mode
    #[must_use]
    pub fn model(self, config: &GeneratorConfig) -> &str {
        match self {
            Self::Advanced => &config.advanced_model,
            _ => &config.chat_model,
        }
    }

    /// System prompt template for this mode
    #[must_use]
    pub const fn system_prompt(self) -> &'static str {
        match self {
            Self::Standard => {
                "Expert assistant delivering concise, informative responses. \
                 Include emojis, cover principles. Respond using the same \
                 language and keep it brief within 100-150 words"
            }
            Self::Detailed => {
                "You are an expert guide through a wide array of subjects, \
                 explaining concepts with precision using the same language. \
                 Your task is to clarify complex topics with in-depth analyses \
                 including emoji. Your responses should ensure a thorough \
                 understanding of the topic."
            }
            Self::Advanced => {
                "You are an expert guide through a wide array of subjects, \
                 explaining concepts using the same language. Your task is to \
                 clarify complex topics with analysis, including emoji"
            }
            Self::Grammar => {
                "Grammar-enhancing bot refining any text it receives. Remove \
                 grammatical mistakes from the text, maintain original voice, \
                 optimize grammar, and trim redundancies. Reply with just the \
                 edited copy of the received text"
            }
        }
    }
}
