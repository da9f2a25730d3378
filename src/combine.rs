//! Placeholder substitution expressions
//!
//! A combine is literal text mixed with `${key}` references. `$N` (one digit)
//! is shorthand for `${N}`. An unclosed `${` is kept as literal text.

use std::fmt;

use crate::context::Context;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Combine {
    segments: Vec<Segment>,
}

impl Combine {
    /// Parse a source string into segments. Never fails.
    pub fn parse(source: &str) -> Self {
        let bytes = source.as_bytes();
        let mut segments = Vec::new();
        let mut start = 0;
        let mut i = 0;

        // Only ASCII bytes are inspected, so every slice lands on a char boundary.
        while i < bytes.len() {
            if bytes[i] != b'$' || i + 1 >= bytes.len() {
                i += 1;
                continue;
            }
            match bytes[i + 1] {
                b'{' => match source[i + 2..].find('}') {
                    Some(offset) => {
                        let close = i + 2 + offset;
                        push_literal(&mut segments, &source[start..i]);
                        segments.push(Segment::Placeholder(source[i + 2..close].to_string()));
                        i = close + 1;
                        start = i;
                    }
                    None => i += 1,
                },
                digit @ b'0'..=b'9' => {
                    push_literal(&mut segments, &source[start..i]);
                    segments.push(Segment::Placeholder(char::from(digit).to_string()));
                    i += 2;
                    start = i;
                }
                _ => i += 1,
            }
        }
        push_literal(&mut segments, &source[start..]);

        Self { segments }
    }

    /// The default output expression: the whole match, `${0}`.
    pub fn whole_match() -> Self {
        Self {
            segments: vec![Segment::Placeholder("0".to_string())],
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Placeholder keys in order of appearance.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(key) => Some(key.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// All-or-nothing evaluation: `None` as soon as any key is missing.
    pub fn eval_strict(&self, ctx: &Context) -> Option<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(key) => out.push_str(ctx.get(key)?),
            }
        }
        Some(out)
    }

    /// Strict evaluation with a missing key collapsing the whole output to "".
    pub fn exec(&self, ctx: &Context) -> String {
        self.eval_strict(ctx).unwrap_or_default()
    }

    /// Missing keys contribute nothing; evaluation always completes.
    pub fn eval_loose(&self, ctx: &Context) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(key) => out.push_str(ctx.get(key).unwrap_or_default()),
            }
        }
        out
    }
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) {
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
}

impl From<&str> for Combine {
    fn from(source: &str) -> Self {
        Self::parse(source)
    }
}

impl fmt::Display for Combine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Placeholder(key) => write!(f, "${{{key}}}")?,
            }
        }
        Ok(())
    }
}
