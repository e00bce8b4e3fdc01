//! Regex-directed string generation
//!
//! Expands a regular expression into a random string that matches it.
//! Supported syntax:
//! - literals and escaped metacharacters (`\.`, `\-`, `\\`)
//! - `.` - random alphanumeric character
//! - `\d` `\w` `\s` and their negations `\D` `\W` `\S`
//! - `[abc]`, `[a-z0-9_]`, `[^...]` character classes
//! - `(...)`, `(?:...)`, `(?P<name>...)` groups with `|` alternation
//! - `*` `+` `?` `{n}` `{n,}` `{n,m}` quantifiers (lazy/possessive suffixes ignored)
//! - `^` `$` `\b` `\B` anchors (ignored while generating)
//!
//! Every generated string is checked against the compiled pattern, so an
//! unsupported construct surfaces as an error instead of a wrong value.

use rand::Rng;
use regex::Regex;
use thiserror::Error;

/// Upper bound used for open-ended quantifiers (`*`, `+`, `{n,}`)
const MAX_REPEAT: usize = 8;

/// Attempts before giving up on a pattern whose output keeps failing the check
const MAX_ATTEMPTS: usize = 8;

const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatternError {
    #[error("invalid regular expression: {0}")]
    Invalid(String),

    #[error("unsupported construct at offset {offset}: {construct}")]
    Unsupported { offset: usize, construct: String },

    #[error("no matching value produced after {0} attempts")]
    Unsatisfied(usize),
}

// ============================================================================
// Pattern AST
// ============================================================================

#[derive(Debug, Clone)]
enum Node {
    Literal(char),
    Class { ranges: Vec<(char, char)>, negated: bool },
    Any,
    Group(Vec<Vec<Node>>),
    Repeat { node: Box<Node>, min: usize, max: usize },
    Empty,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(pattern: &str) -> Self {
        Self {
            chars: pattern.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unsupported(&self, construct: &str) -> PatternError {
        PatternError::Unsupported {
            offset: self.pos,
            construct: construct.to_string(),
        }
    }

    fn parse(mut self) -> Result<Vec<Vec<Node>>, PatternError> {
        let alternatives = self.parse_alternation()?;
        if self.pos < self.chars.len() {
            return Err(self.unsupported("unbalanced ')'"));
        }
        Ok(alternatives)
    }

    fn parse_alternation(&mut self) -> Result<Vec<Vec<Node>>, PatternError> {
        let mut alternatives = vec![self.parse_sequence()?];
        while self.eat('|') {
            alternatives.push(self.parse_sequence()?);
        }
        Ok(alternatives)
    }

    fn parse_sequence(&mut self) -> Result<Vec<Node>, PatternError> {
        let mut sequence = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            let atom = self.parse_atom()?;
            sequence.push(self.parse_quantifier(atom)?);
        }
        Ok(sequence)
    }

    fn parse_atom(&mut self) -> Result<Node, PatternError> {
        let Some(c) = self.next() else {
            return Ok(Node::Empty);
        };

        match c {
            '(' => {
                if self.eat('?') {
                    match self.next() {
                        Some(':') => {}
                        Some('P') | Some('<') => {
                            if self.chars.get(self.pos - 1) == Some(&'P') && !self.eat('<') {
                                return Err(self.unsupported("group flag"));
                            }
                            if matches!(self.peek(), Some('=') | Some('!')) {
                                return Err(self.unsupported("lookbehind"));
                            }
                            while let Some(n) = self.next() {
                                if n == '>' {
                                    break;
                                }
                            }
                        }
                        Some('=') | Some('!') => return Err(self.unsupported("lookahead")),
                        _ => return Err(self.unsupported("group flag")),
                    }
                }
                let alternatives = self.parse_alternation()?;
                if !self.eat(')') {
                    return Err(self.unsupported("unclosed group"));
                }
                Ok(Node::Group(alternatives))
            }
            '[' => self.parse_class(),
            '.' => Ok(Node::Any),
            '^' | '$' => Ok(Node::Empty),
            '\\' => self.parse_escape(),
            other => Ok(Node::Literal(other)),
        }
    }

    fn parse_escape(&mut self) -> Result<Node, PatternError> {
        let Some(c) = self.next() else {
            return Err(self.unsupported("trailing backslash"));
        };
        let node = match c {
            'd' => class(digit_ranges(), false),
            'D' => class(digit_ranges(), true),
            'w' => class(word_ranges(), false),
            'W' => class(word_ranges(), true),
            's' => class(space_ranges(), false),
            'S' => class(space_ranges(), true),
            'b' | 'B' | 'A' | 'z' | 'Z' => Node::Empty,
            'n' => Node::Literal('\n'),
            't' => Node::Literal('\t'),
            'r' => Node::Literal('\r'),
            other => Node::Literal(other),
        };
        Ok(node)
    }

    fn parse_class(&mut self) -> Result<Node, PatternError> {
        let negated = self.eat('^');
        let mut ranges = Vec::new();
        let mut first = true;

        loop {
            let Some(c) = self.next() else {
                return Err(self.unsupported("unclosed character class"));
            };
            if c == ']' && !first {
                break;
            }
            first = false;

            let start = if c == '\\' {
                match self.next() {
                    Some('d') => {
                        ranges.extend(digit_ranges());
                        continue;
                    }
                    Some('w') => {
                        ranges.extend(word_ranges());
                        continue;
                    }
                    Some('s') => {
                        ranges.extend(space_ranges());
                        continue;
                    }
                    Some('D') | Some('W') | Some('S') => {
                        return Err(self.unsupported("negated escape inside class"))
                    }
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some(other) => other,
                    None => return Err(self.unsupported("trailing backslash")),
                }
            } else {
                c
            };

            // `a-z` range unless the dash is the last character of the class
            if self.peek() == Some('-') && self.chars.get(self.pos + 1).is_some_and(|n| *n != ']') {
                self.pos += 1;
                let end = match self.next() {
                    Some('\\') => self.next().unwrap_or(start),
                    Some(end) => end,
                    None => start,
                };
                if end < start {
                    return Err(self.unsupported("reversed range"));
                }
                ranges.push((start, end));
            } else {
                ranges.push((start, start));
            }
        }

        Ok(Node::Class { ranges, negated })
    }

    fn parse_quantifier(&mut self, atom: Node) -> Result<Node, PatternError> {
        let (min, max) = match self.peek() {
            Some('*') => {
                self.pos += 1;
                (0, MAX_REPEAT)
            }
            Some('+') => {
                self.pos += 1;
                (1, MAX_REPEAT)
            }
            Some('?') => {
                self.pos += 1;
                (0, 1)
            }
            Some('{') => match self.parse_braces() {
                Some(bounds) => bounds,
                None => return Ok(atom),
            },
            _ => return Ok(atom),
        };

        // Lazy and possessive suffixes do not change what matches
        if !self.eat('?') {
            self.eat('+');
        }

        Ok(Node::Repeat {
            node: Box::new(atom),
            min,
            max,
        })
    }

    /// `{n}`, `{n,}` or `{n,m}`; anything else is a literal brace
    fn parse_braces(&mut self) -> Option<(usize, usize)> {
        let close = self.chars[self.pos..].iter().position(|c| *c == '}')?;
        let body: String = self.chars[self.pos + 1..self.pos + close].iter().collect();

        let bounds = match body.split_once(',') {
            None => {
                let n = body.trim().parse::<usize>().ok()?;
                (n, n)
            }
            Some((min, max)) => {
                let min = min.trim().parse::<usize>().ok()?;
                let max = if max.trim().is_empty() {
                    min + MAX_REPEAT
                } else {
                    max.trim().parse::<usize>().ok()?
                };
                (min, max.max(min))
            }
        };

        self.pos += close + 1;
        Some(bounds)
    }
}

fn class(ranges: Vec<(char, char)>, negated: bool) -> Node {
    Node::Class { ranges, negated }
}

fn digit_ranges() -> Vec<(char, char)> {
    vec![('0', '9')]
}

fn word_ranges() -> Vec<(char, char)> {
    vec![('a', 'z'), ('A', 'Z'), ('0', '9'), ('_', '_')]
}

fn space_ranges() -> Vec<(char, char)> {
    vec![(' ', ' ')]
}

// ============================================================================
// Generation
// ============================================================================

fn emit<R: Rng + ?Sized>(node: &Node, rng: &mut R, out: &mut String) {
    match node {
        Node::Literal(c) => out.push(*c),
        Node::Any => out.push(ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())] as char),
        Node::Class { ranges, negated: false } => {
            let total: u32 = ranges.iter().map(|(a, b)| *b as u32 - *a as u32 + 1).sum();
            if total == 0 {
                return;
            }
            let mut pick = rng.gen_range(0..total);
            for (start, end) in ranges {
                let size = *end as u32 - *start as u32 + 1;
                if pick < size {
                    if let Some(c) = char::from_u32(*start as u32 + pick) {
                        out.push(c);
                    }
                    return;
                }
                pick -= size;
            }
        }
        Node::Class { ranges, negated: true } => {
            let allowed: Vec<char> = (' '..='~')
                .filter(|c| !ranges.iter().any(|(a, b)| (*a..=*b).contains(c)))
                .collect();
            if !allowed.is_empty() {
                out.push(allowed[rng.gen_range(0..allowed.len())]);
            }
        }
        Node::Group(alternatives) => {
            let branch = &alternatives[rng.gen_range(0..alternatives.len())];
            for child in branch {
                emit(child, rng, out);
            }
        }
        Node::Repeat { node, min, max } => {
            let count = if min == max {
                *min
            } else {
                rng.gen_range(*min..=*max)
            };
            for _ in 0..count {
                emit(node, rng, out);
            }
        }
        Node::Empty => {}
    }
}

/// Generate a string matching `pattern` (unanchored, as in JSON Schema)
pub fn generate<R: Rng + ?Sized>(pattern: &str, rng: &mut R) -> Result<String, PatternError> {
    let checker = Regex::new(pattern).map_err(|e| PatternError::Invalid(e.to_string()))?;
    let root = Node::Group(Parser::new(pattern).parse()?);

    for _ in 0..MAX_ATTEMPTS {
        let mut candidate = String::new();
        emit(&root, rng, &mut candidate);
        if checker.is_match(&candidate) {
            return Ok(candidate);
        }
    }

    Err(PatternError::Unsatisfied(MAX_ATTEMPTS))
}

/// Random alphanumeric string of exactly `len` characters
pub fn alphanumeric<R: Rng + ?Sized>(len: usize, rng: &mut R) -> String {
    (0..len)
        .map(|_| ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())] as char)
        .collect()
}
