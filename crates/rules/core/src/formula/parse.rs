//! Tokenizer and recursive-descent parser.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | primary
//! primary := number | dice | reference | ident '(' expr (',' expr)* ')' | '(' expr ')'
//! ```

use super::{Formula, FormulaError};

/// Upper bound on dice count in one term.
const MAX_DICE: u32 = 1000;

/// Nesting limit for parentheses, unary signs and function calls.
pub const MAX_DEPTH: usize = 64;

/// Token limit; bounds the height of operator chains.
pub const MAX_TOKENS: usize = 512;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Dice { count: u32, faces: u32 },
    Reference(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Number(value) => value.to_string(),
            Self::Dice { count, faces } => format!("{count}d{faces}"),
            Self::Reference(path) => format!("@{path}"),
            Self::Ident(name) => name.clone(),
            Self::Plus => "+".into(),
            Self::Minus => "-".into(),
            Self::Star => "*".into(),
            Self::Slash => "/".into(),
            Self::LParen => "(".into(),
            Self::RParen => ")".into(),
            Self::Comma => ",".into(),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, FormulaError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let start = i;
        match ch {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '+' => tokens.push((Token::Plus, start)),
            '-' => tokens.push((Token::Minus, start)),
            '*' => tokens.push((Token::Star, start)),
            '/' => tokens.push((Token::Slash, start)),
            '(' => tokens.push((Token::LParen, start)),
            ')' => tokens.push((Token::RParen, start)),
            ',' => tokens.push((Token::Comma, start)),
            '@' => {
                i += 1;
                let begin = i;
                while i < chars.len() {
                    let c = chars[i];
                    let hyphenated_word =
                        c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_alphabetic());
                    if c.is_ascii_alphanumeric() || c == '_' || c == '.' || hyphenated_word {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let path: String = chars[begin..i].iter().collect();
                let path = path.trim_end_matches('.');
                if path.is_empty() {
                    return Err(FormulaError::UnexpectedChar { ch: '@', position: start });
                }
                tokens.push((Token::Reference(path.to_owned()), start));
                continue;
            }
            c if c.is_ascii_digit() || c == '.' => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();

                let dice_follows = matches!(chars.get(i), Some('d' | 'D'))
                    && chars.get(i + 1).is_some_and(char::is_ascii_digit);
                if dice_follows {
                    let count = literal
                        .parse::<u32>()
                        .map_err(|_| FormulaError::UnexpectedToken {
                            token: literal.clone(),
                            position: start,
                        })?;
                    i += 1;
                    let faces = read_integer(&chars, &mut i);
                    tokens.push((dice(count, faces)?, start));
                } else {
                    let value = literal
                        .parse::<f64>()
                        .map_err(|_| FormulaError::UnexpectedToken {
                            token: literal,
                            position: start,
                        })?;
                    tokens.push((Token::Number(value), start));
                }
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                // Bare `d8` is one die.
                let bare_die = word.len() > 1
                    && word.starts_with(['d', 'D'])
                    && word[1..].bytes().all(|b| b.is_ascii_digit());
                if bare_die {
                    let faces = word[1..].parse::<u32>().unwrap_or(0);
                    tokens.push((dice(1, faces)?, start));
                } else {
                    tokens.push((Token::Ident(word.to_ascii_lowercase()), start));
                }
                continue;
            }
            other => {
                return Err(FormulaError::UnexpectedChar {
                    ch: other,
                    position: start,
                });
            }
        }
        i += 1;
    }

    Ok(tokens)
}

fn read_integer(chars: &[char], i: &mut usize) -> u32 {
    let mut value: u32 = 0;
    while let Some(digit) = chars.get(*i).and_then(|c| c.to_digit(10)) {
        value = value.saturating_mul(10).saturating_add(digit);
        *i += 1;
    }
    value
}

fn dice(count: u32, faces: u32) -> Result<Token, FormulaError> {
    if faces == 0 || count > MAX_DICE {
        return Err(FormulaError::InvalidDice { count, faces });
    }
    Ok(Token::Dice { count, faces })
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    /// Run `step` one nesting level deeper.
    fn nested(
        &mut self,
        step: fn(&mut Self) -> Result<Formula, FormulaError>,
    ) -> Result<Formula, FormulaError> {
        if self.depth >= MAX_DEPTH {
            return Err(FormulaError::TooDeep { limit: MAX_DEPTH });
        }
        self.depth += 1;
        let result = step(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|(token, _)| token)
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), FormulaError> {
        match self.next() {
            Some((token, _)) if token == expected => Ok(()),
            Some((token, position)) => Err(FormulaError::UnexpectedToken {
                token: token.describe(),
                position,
            }),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<Formula, FormulaError> {
        let mut lhs = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.cursor += 1;
                    lhs = Formula::Sum(Box::new(lhs), Box::new(self.term()?));
                }
                Some(Token::Minus) => {
                    self.cursor += 1;
                    lhs = Formula::Difference(Box::new(lhs), Box::new(self.term()?));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn term(&mut self) -> Result<Formula, FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.cursor += 1;
                    lhs = Formula::Product(Box::new(lhs), Box::new(self.unary()?));
                }
                Some(Token::Slash) => {
                    self.cursor += 1;
                    lhs = Formula::Quotient(Box::new(lhs), Box::new(self.unary()?));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn unary(&mut self) -> Result<Formula, FormulaError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.cursor += 1;
                Ok(Formula::Negate(Box::new(self.nested(Self::unary)?)))
            }
            Some(Token::Plus) => {
                self.cursor += 1;
                self.nested(Self::unary)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Formula, FormulaError> {
        let (token, position) = self.next().ok_or(FormulaError::UnexpectedEnd)?;
        match token {
            Token::Number(value) => Ok(Formula::Constant(value)),
            Token::Dice { count, faces } => Ok(Formula::Dice { count, faces }),
            Token::Reference(path) => Ok(Formula::Reference(path)),
            Token::LParen => {
                let inner = self.nested(Self::expr)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => self.call(name),
            other => Err(FormulaError::UnexpectedToken {
                token: other.describe(),
                position,
            }),
        }
    }

    fn call(&mut self, name: String) -> Result<Formula, FormulaError> {
        if !matches!(name.as_str(), "min" | "max" | "floor" | "ceil") {
            return Err(FormulaError::UnknownFunction(name));
        }
        self.expect(Token::LParen)?;
        let mut args = vec![self.nested(Self::expr)?];
        while let Some(Token::Comma) = self.peek() {
            self.cursor += 1;
            args.push(self.nested(Self::expr)?);
        }
        self.expect(Token::RParen)?;

        match (name.as_str(), args.len()) {
            ("min", _) => Ok(Formula::Min(args)),
            ("max", _) => Ok(Formula::Max(args)),
            ("floor", 1) => Ok(Formula::Floor(Box::new(args.remove(0)))),
            ("ceil", 1) => Ok(Formula::Ceil(Box::new(args.remove(0)))),
            (_, found) => Err(FormulaError::WrongArity {
                function: name,
                found,
            }),
        }
    }
}

/// Parse a formula string into an expression tree.
pub fn parse(source: &str) -> Result<Formula, FormulaError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(FormulaError::Empty);
    }
    if tokens.len() > MAX_TOKENS {
        return Err(FormulaError::TooLong { limit: MAX_TOKENS });
    }

    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
    };
    let formula = parser.expr()?;
    match parser.next() {
        None => Ok(formula),
        Some((token, position)) => Err(FormulaError::UnexpectedToken {
            token: token.describe(),
            position,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(value: f64) -> Box<Formula> {
        Box::new(Formula::Constant(value))
    }

    #[test]
    fn precedence_and_grouping() {
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Formula::Sum(c(1.0), Box::new(Formula::Product(c(2.0), c(3.0))))
        );
        assert_eq!(
            parse("(1 + 2) * 3").unwrap(),
            Formula::Product(Box::new(Formula::Sum(c(1.0), c(2.0))), c(3.0))
        );
    }

    #[test]
    fn dice_terms() {
        assert_eq!(
            parse("2d6").unwrap(),
            Formula::Dice { count: 2, faces: 6 }
        );
        assert_eq!(parse("d8").unwrap(), Formula::Dice { count: 1, faces: 8 });
        assert_eq!(
            parse("0d6"),
            Ok(Formula::Dice { count: 0, faces: 6 })
        );
        assert_eq!(
            parse("1d0"),
            Err(FormulaError::InvalidDice { count: 1, faces: 0 })
        );
    }

    #[test]
    fn references_allow_hyphenated_words() {
        let formula = parse("@scale.berserker-rage.die-size - 1").unwrap();
        assert_eq!(formula.references(), vec!["scale.berserker-rage.die-size"]);

        let formula = parse("@prof-1").unwrap();
        assert_eq!(
            formula,
            Formula::Difference(Box::new(Formula::Reference("prof".into())), c(1.0))
        );
    }

    #[test]
    fn functions_check_arity() {
        assert!(matches!(
            parse("max(1, 2, 3)").unwrap(),
            Formula::Max(args) if args.len() == 3
        ));
        assert_eq!(
            parse("floor(1, 2)"),
            Err(FormulaError::WrongArity {
                function: "floor".into(),
                found: 2
            })
        );
        assert_eq!(
            parse("sqrt(4)"),
            Err(FormulaError::UnknownFunction("sqrt".into()))
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse("   "), Err(FormulaError::Empty));
        assert_eq!(parse("1 +"), Err(FormulaError::UnexpectedEnd));
        assert_eq!(
            parse("1 $ 2"),
            Err(FormulaError::UnexpectedChar { ch: '$', position: 2 })
        );
        assert!(matches!(
            parse("(1 + 2"),
            Err(FormulaError::UnexpectedEnd)
        ));
        assert!(matches!(
            parse("1 2"),
            Err(FormulaError::UnexpectedToken { position: 2, .. })
        ));
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = |depth: usize| format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&nested(MAX_DEPTH)), Ok(Formula::Constant(1.0)));
        assert_eq!(
            parse(&nested(MAX_DEPTH + 1)),
            Err(FormulaError::TooDeep { limit: MAX_DEPTH })
        );
        assert_eq!(
            parse(&format!("{}1", "-".repeat(200))),
            Err(FormulaError::TooDeep { limit: MAX_DEPTH })
        );
        assert_eq!(
            parse(&format!("{}1", "max(".repeat(100))),
            Err(FormulaError::TooDeep { limit: MAX_DEPTH })
        );
    }

    #[test]
    fn long_chains_are_rejected() {
        let chain = vec!["1"; 300].join(" + ");
        assert_eq!(
            parse(&chain),
            Err(FormulaError::TooLong { limit: MAX_TOKENS })
        );
        assert!(parse(&vec!["1"; 100].join(" + ")).is_ok());
    }
}
