//! Tab completion.

use crate::commands::{commands_for, CommandSpec};
use crate::mode::CliMode;

/// Keywords that could come next for a partial input line.
///
/// The last token is the prefix being completed; trailing whitespace means
/// the next keyword is wanted in full. Earlier tokens may be abbreviated as
/// they can be on the command line. Results keep table order without
/// duplicates, and are empty once the keywords are exhausted (arguments
/// are not completed).
pub fn get_completions(partial: &str, mode: CliMode) -> Vec<String> {
    let mut tokens: Vec<&str> = partial.split_whitespace().collect();
    let prefix = if partial.is_empty() || partial.ends_with(char::is_whitespace) {
        String::new()
    } else {
        tokens.pop().unwrap_or_default().to_ascii_lowercase()
    };

    let mut candidates: Vec<&CommandSpec> = commands_for(mode).collect();
    for (depth, token) in tokens.iter().enumerate() {
        let token = token.to_ascii_lowercase();
        candidates.retain(|c| c.keywords.get(depth).is_some_and(|k| k.starts_with(token.as_str())));
        if candidates.iter().any(|c| c.keywords[depth] == token) {
            candidates.retain(|c| c.keywords[depth] == token);
        }
    }

    let depth = tokens.len();
    let mut words: Vec<String> = Vec::new();
    for command in candidates {
        if let Some(keyword) = command.keywords.get(depth) {
            if keyword.starts_with(prefix.as_str()) && !words.iter().any(|w| w == keyword) {
                words.push(keyword.to_string());
            }
        }
    }
    words
}

/// Complete the line in place when exactly one keyword fits.
///
/// Returns the new line with the last token expanded and a trailing space.
pub fn complete_line(partial: &str, mode: CliMode) -> Option<String> {
    let [word] = get_completions(partial, mode).try_into().ok()?;
    let kept = if partial.ends_with(char::is_whitespace) {
        partial
    } else {
        partial.trim_end_matches(|c: char| !c.is_whitespace())
    };
    Some(format!("{kept}{word} "))
}
