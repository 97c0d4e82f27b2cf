use crate::errors::CoreError;

/// Reserved character marking a destination-account override in command input.
pub const DEFAULT_DELIMITER: char = '>';

/// Lexer states. End-of-input is only legal in `Blank`, `Word`, and `Symbol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Blank,
    Word,
    Str,
    Escape,
    Symbol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Space,
    Quote,
    Backslash,
    Delim,
    Other,
}

/// Splits shorthand command input into words, honoring double-quoted strings,
/// backslash escapes, and a standalone delimiter symbol.
///
/// The tokenizer is pure and keeps no state between calls. Error positions
/// are 0-based character indices, so multi-byte input reports the position
/// the user actually sees.
#[derive(Debug, Clone, Copy)]
pub struct Tokenizer {
    delimiter: char,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl Tokenizer {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn split(&self, input: &str) -> Result<Vec<String>, CoreError> {
        let mut state = State::Blank;
        let mut words: Vec<String> = Vec::new();

        for (position, ch) in input.chars().enumerate() {
            let class = self.classify(ch);
            let next = transition(state, class).ok_or(CoreError::Syntax { position })?;
            let previous = state;
            state = next;

            // Leaving the escape state never starts a token: the escaped
            // character is appended verbatim to the current string.
            if state != previous && previous != State::Escape {
                if matches!(state, State::Word | State::Str | State::Symbol) {
                    words.push(String::new());
                }
                // The quote and backslash characters themselves are not emitted.
                if matches!(state, State::Str | State::Escape) {
                    continue;
                }
            }

            if state != State::Blank {
                if let Some(current) = words.last_mut() {
                    current.push(ch);
                }
            }
        }

        match state {
            State::Str | State::Escape => Err(CoreError::Syntax {
                position: input.chars().count(),
            }),
            _ => Ok(words),
        }
    }

    fn classify(&self, ch: char) -> CharClass {
        if ch == ' ' {
            CharClass::Space
        } else if ch == '"' {
            CharClass::Quote
        } else if ch == '\\' {
            CharClass::Backslash
        } else if ch == self.delimiter {
            CharClass::Delim
        } else {
            CharClass::Other
        }
    }
}

fn transition(state: State, class: CharClass) -> Option<State> {
    match state {
        State::Blank | State::Word => match class {
            CharClass::Space => Some(State::Blank),
            CharClass::Quote => Some(State::Str),
            CharClass::Backslash => None,
            CharClass::Delim => Some(State::Symbol),
            CharClass::Other => Some(State::Word),
        },
        State::Str => match class {
            CharClass::Quote => Some(State::Blank),
            CharClass::Backslash => Some(State::Escape),
            _ => Some(State::Str),
        },
        State::Escape => Some(State::Str),
        State::Symbol => match class {
            CharClass::Space => Some(State::Blank),
            CharClass::Quote => Some(State::Str),
            CharClass::Backslash | CharClass::Delim => None,
            CharClass::Other => Some(State::Word),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(input: &str) -> Result<Vec<String>, CoreError> {
        Tokenizer::default().split(input)
    }

    #[test]
    fn splits_words_strings_and_symbols() {
        let cases: Vec<(&str, Vec<&str>)> = vec![
            ("饮料 20", vec!["饮料", "20"]),
            ("饮料20", vec!["饮料20"]),
            (r#""饮料""20""#, vec!["饮料", "20"]),
            ("饮料 666>21", vec!["饮料", "666", ">", "21"]),
            ("饮料 20> 521", vec!["饮料", "20", ">", "521"]),
            ("饮料 0 >21", vec!["饮料", "0", ">", "21"]),
            ("饮料  201     >    21", vec!["饮料", "201", ">", "21"]),
            (r#"饮料 "201  ">  22"#, vec!["饮料", "201  ", ">", "22"]),
            (r#"饮料 "201  >"  55"#, vec!["饮料", "201  >", "55"]),
            (r#"饮料 "10\"1  >"   "#, vec!["饮料", "10\"1  >"]),
            (r#""\"""\"\"""#, vec![r#"""#, r#""""#]),
            (r#""\\"  "\\233\\""#, vec![r"\", r"\233\"]),
            ("", vec![]),
            ("   ", vec![]),
        ];

        for (input, expected) in cases {
            let words = split(input).unwrap_or_else(|err| panic!("{input:?}: {err}"));
            assert_eq!(words, expected, "input {input:?}");
        }
    }

    #[test]
    fn reports_character_positions_for_illegal_input() {
        let cases = vec![
            ("吃饭>>1", 3),
            (r"吃饭> \1", 4),
            (r#"123"2"#, 5),
            (r#""\"#, 2),
            (r#""\""#, 3),
            (r"a\b", 1),
        ];

        for (input, expected) in cases {
            match split(input) {
                Err(CoreError::Syntax { position }) => {
                    assert_eq!(position, expected, "input {input:?}");
                }
                other => panic!("expected syntax error for {input:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn custom_delimiter_is_honored() {
        let tokenizer = Tokenizer::new('<');
        assert_eq!(
            tokenizer.split("vultr < wx").unwrap(),
            vec!["vultr", "<", "wx"]
        );
        // The default delimiter is just an ordinary character here.
        assert_eq!(tokenizer.split("a>b").unwrap(), vec!["a>b"]);
    }

    #[test]
    fn tokenizer_is_restartable() {
        let tokenizer = Tokenizer::default();
        assert!(tokenizer.split(r#""unterminated"#).is_err());
        assert_eq!(tokenizer.split("ok now").unwrap(), vec!["ok", "now"]);
    }
}
