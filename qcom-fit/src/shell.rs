//! Shell-style splitting of option strings.
//!
//! Extra `mkimage` options arrive as a single string, e.g.
//! `-E -B 0x8 -n "board image"`. Splitting follows POSIX shell word rules so
//! that quoted segments survive as one argument.

use crate::error::{FitError, Result};

/// Split `input` into words.
///
/// * whitespace separates words
/// * `'...'` is taken literally
/// * `"..."` only treats `\"` and `\\` as escapes, any other backslash is kept
/// * `\x` outside quotes yields `x`
/// * adjacent segments join, so `a'b c'd` is the single word `ab cd`
pub fn split(input: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => word.push(c),
                        None => return Err(FitError::lex(format!("no closing quotation in `{input}`"))),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\')) => word.push(c),
                            Some(c) => {
                                word.push('\\');
                                word.push(c);
                            }
                            None => {
                                return Err(FitError::lex(format!(
                                    "no closing quotation in `{input}`"
                                )));
                            }
                        },
                        Some(c) => word.push(c),
                        None => return Err(FitError::lex(format!("no closing quotation in `{input}`"))),
                    }
                }
            }
            '\\' => match chars.next() {
                // line continuation
                Some('\n') => {}
                Some(c) => {
                    in_word = true;
                    word.push(c);
                }
                None => return Err(FitError::lex(format!("trailing escape character in `{input}`"))),
            },
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                word.push(c);
            }
        }
    }

    if in_word {
        words.push(word);
    }

    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_words() {
        assert_eq!(
            split("-E  -B 0x8\t-p 0x800").unwrap(),
            vec!["-E", "-B", "0x8", "-p", "0x800"]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(split("").unwrap().is_empty());
        assert!(split("   \n ").unwrap().is_empty());
    }

    #[test]
    fn test_quoted_segments_stay_whole() {
        assert_eq!(
            split(r#"-n "board image" -c 'a b  c'"#).unwrap(),
            vec!["-n", "board image", "-c", "a b  c"]
        );
    }

    #[test]
    fn test_adjacent_segments_join() {
        assert_eq!(split("a'b c'd").unwrap(), vec!["ab cd"]);
        assert_eq!(split(r#"--opt="x y""#).unwrap(), vec!["--opt=x y"]);
    }

    #[test]
    fn test_escapes() {
        assert_eq!(split(r"a\ b").unwrap(), vec!["a b"]);
        assert_eq!(split(r#""say \"hi\"""#).unwrap(), vec![r#"say "hi""#]);
        // only a few characters are special inside double quotes
        assert_eq!(split(r#""c:\dir""#).unwrap(), vec![r"c:\dir"]);
        // nothing is special inside single quotes
        assert_eq!(split(r"'a\b'").unwrap(), vec![r"a\b"]);
    }

    #[test]
    fn test_dollar_and_backtick_keep_backslash_in_double_quotes() {
        assert_eq!(split(r#""a\$b""#).unwrap(), vec![r"a\$b"]);
        assert_eq!(split(r#""a\`b""#).unwrap(), vec![r"a\`b"]);
        assert_eq!(split("\"a\\\nb\"").unwrap(), vec!["a\\\nb"]);
        assert_eq!(split(r#""a\\b""#).unwrap(), vec![r"a\b"]);
    }

    #[test]
    fn test_empty_quoted_word() {
        assert_eq!(split("'' x").unwrap(), vec!["", "x"]);
    }

    #[test]
    fn test_unterminated_quote() {
        assert!(matches!(split("-n 'open"), Err(FitError::Lex(_))));
        assert!(matches!(split("-n \"open"), Err(FitError::Lex(_))));
        assert!(matches!(split("dangling\\"), Err(FitError::Lex(_))));
    }
}
