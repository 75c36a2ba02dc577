//! Region scanner: strips comments and masks quoted text.
//!
//! Every later transpiler stage works on the masked text, so no rewrite rule
//! can reach inside a string literal or a quoted identifier. Each quoted region
//! is replaced by `\u{1}<index>\u{2}` and restored by [`unmask`].

use once_cell::sync::Lazy;
use regex::Regex;

const MASK_OPEN: char = '\u{1}';
const MASK_CLOSE: char = '\u{2}';

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new("\u{1}(\\d+)\u{2}").expect("valid placeholder regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Scanner result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Masked {
    /// Script with comments removed and quoted regions replaced by placeholders.
    pub text: String,
    /// Quoted regions, including their quote characters, by placeholder index.
    pub literals: Vec<String>,
    /// The script ended inside a quoted region.
    pub unterminated_quote: bool,
    /// The script ended inside a block comment.
    pub unterminated_comment: bool,
}

fn placeholder(index: usize) -> String {
    format!("{}{}{}", MASK_OPEN, index, MASK_CLOSE)
}

/// Drop comments and mask quoted regions in one pass.
///
/// Line comments keep their terminating newline. A block comment becomes a
/// single space so that tokens on either side stay apart. A doubled quote
/// inside a quoted region is an escaped quote, not its end.
pub fn mask(script: &str) -> Masked {
    let mut out = Masked::default();
    let mut region = Region::Code;
    let mut literal = String::new();
    let mut chars = script.chars().peekable();

    while let Some(c) = chars.next() {
        match region {
            Region::Code => match c {
                '\'' | '"' => {
                    region = Region::Quoted(c);
                    literal.push(c);
                }
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    region = Region::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    region = Region::BlockComment;
                }
                _ => out.text.push(c),
            },
            Region::Quoted(q) => {
                literal.push(c);
                if c == q {
                    if chars.peek() == Some(&q) {
                        chars.next();
                        literal.push(q);
                    } else {
                        out.text.push_str(&placeholder(out.literals.len()));
                        out.literals.push(std::mem::take(&mut literal));
                        region = Region::Code;
                    }
                }
            }
            Region::LineComment => {
                if c == '\n' {
                    out.text.push('\n');
                    region = Region::Code;
                }
            }
            Region::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.text.push(' ');
                    region = Region::Code;
                }
            }
        }
    }

    match region {
        Region::Quoted(_) => {
            out.text.push_str(&placeholder(out.literals.len()));
            out.literals.push(literal);
            out.unterminated_quote = true;
        }
        Region::BlockComment => out.unterminated_comment = true,
        Region::Code | Region::LineComment => {}
    }

    out
}

/// Restore masked regions. Unknown placeholder indexes are left as they are.
pub fn unmask(text: &str, literals: &[String]) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &regex::Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| literals.get(i))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
