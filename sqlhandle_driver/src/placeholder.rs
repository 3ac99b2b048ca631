use std::iter::Peekable;
use std::str::Chars;

/// Count the `?` positional placeholders in a SQL statement.
///
/// Question marks are not placeholders inside single quoted string literals, double quoted
/// strings or identifiers, backtick quoted identifiers, `#` and `-- ` line comments, or
/// `/* */` block comments. Literals may escape characters with a backslash or by doubling
/// the quote.
#[must_use]
pub fn placeholder_count(sql: &str) -> usize {
    let mut count = 0;
    let mut chars = sql.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\'' | '"' | '`' => skip_quoted(&mut chars, ch),
            '#' => skip_line(&mut chars),
            '-' if chars.peek() == Some(&'-') => {
                chars.next();
                // MySQL only treats `--` as a comment when followed by whitespace
                if chars.peek().is_none_or(|next| next.is_whitespace()) {
                    skip_line(&mut chars);
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                skip_block_comment(&mut chars);
            }
            '?' => count += 1,
            _ => {}
        }
    }
    count
}

fn skip_quoted(chars: &mut Peekable<Chars<'_>>, quote: char) {
    while let Some(ch) = chars.next() {
        if ch == '\\' && quote != '`' {
            chars.next();
        } else if ch == quote {
            if chars.peek() == Some(&quote) {
                chars.next();
            } else {
                return;
            }
        }
    }
}

fn skip_line(chars: &mut Peekable<Chars<'_>>) {
    for ch in chars.by_ref() {
        if ch == '\n' {
            return;
        }
    }
}

fn skip_block_comment(chars: &mut Peekable<Chars<'_>>) {
    let mut previous = None;
    for ch in chars.by_ref() {
        if previous == Some('*') && ch == '/' {
            return;
        }
        previous = Some(ch);
    }
}
