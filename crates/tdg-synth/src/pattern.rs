//! Strings matching a regular expression
//!
//! Patterns are parsed into a `regex-syntax` HIR and walked to build a
//! candidate; candidates are checked against the compiled `regex` before
//! being returned. Character classes prefer printable ASCII and unbounded
//! repetitions are capped.

use rand::Rng;
use regex::Regex;
use regex_syntax::hir::{Class, Hir, HirKind};
use regex_syntax::ParserBuilder;

/// Extra repetitions allowed past the minimum for `*`, `+` and `{n,}`
const OPEN_REPEAT: u32 = 8;

/// Candidates tried before giving up
const ATTEMPTS: usize = 16;

/// A compiled generation pattern
#[derive(Debug, Clone)]
pub struct PatternGenerator {
    hir: Hir,
    validator: Regex,
}

impl PatternGenerator {
    /// Compile `pattern`
    ///
    /// # Errors
    ///
    /// Returns a description of the parse failure.
    pub fn compile(pattern: &str) -> Result<Self, String> {
        let validator = Regex::new(pattern).map_err(|e| e.to_string())?;
        let hir = ParserBuilder::new()
            .build()
            .parse(pattern)
            .map_err(|e| e.to_string())?;
        Ok(Self { hir, validator })
    }

    /// Whether `candidate` matches the pattern
    #[inline]
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.validator.is_match(candidate)
    }

    /// Generate a matching string whose length (in chars) lies in
    /// `[min_len, max_len]`, falling back to any matching string
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        min_len: usize,
        max_len: usize,
    ) -> Option<String> {
        let mut fallback = None;
        for _ in 0..ATTEMPTS {
            let mut out = String::new();
            walk(&self.hir, rng, &mut out);
            if !self.matches(&out) {
                continue;
            }
            let len = out.chars().count();
            if (min_len..=max_len).contains(&len) {
                return Some(out);
            }
            fallback.get_or_insert(out);
        }
        fallback
    }
}

fn walk<R: Rng + ?Sized>(hir: &Hir, rng: &mut R, out: &mut String) {
    match hir.kind() {
        HirKind::Empty | HirKind::Look(_) => {}
        HirKind::Literal(lit) => out.push_str(&String::from_utf8_lossy(&lit.0)),
        HirKind::Class(Class::Unicode(class)) => {
            let ranges: Vec<(u32, u32)> = class
                .ranges()
                .iter()
                .map(|r| (u32::from(r.start()), u32::from(r.end())))
                .collect();
            if let Some(c) = pick_char(&ranges, rng) {
                out.push(c);
            }
        }
        HirKind::Class(Class::Bytes(class)) => {
            let ranges: Vec<(u32, u32)> = class
                .ranges()
                .iter()
                .map(|r| (u32::from(r.start()), u32::from(r.end())))
                .filter(|(start, _)| *start < 0x80)
                .map(|(start, end)| (start, end.min(0x7f)))
                .collect();
            if let Some(c) = pick_char(&ranges, rng) {
                out.push(c);
            }
        }
        HirKind::Repetition(rep) => {
            let max = rep
                .max
                .unwrap_or_else(|| rep.min.saturating_add(OPEN_REPEAT));
            let count = rng.gen_range(rep.min..=max.max(rep.min));
            for _ in 0..count {
                walk(&rep.sub, rng, out);
            }
        }
        HirKind::Capture(cap) => walk(&cap.sub, rng, out),
        HirKind::Concat(parts) => {
            for part in parts {
                walk(part, rng, out);
            }
        }
        HirKind::Alternation(branches) => {
            let branch = &branches[rng.gen_range(0..branches.len())];
            walk(branch, rng, out);
        }
    }
}

/// Pick a char from inclusive code point ranges, preferring printable ASCII
fn pick_char<R: Rng + ?Sized>(ranges: &[(u32, u32)], rng: &mut R) -> Option<char> {
    let printable: Vec<(u32, u32)> = ranges
        .iter()
        .filter(|(start, end)| *start <= 0x7e && *end >= 0x20)
        .map(|(start, end)| ((*start).max(0x20), (*end).min(0x7e)))
        .collect();
    let pool = if printable.is_empty() {
        ranges
    } else {
        &printable[..]
    };
    let (start, end) = *pool.get(rng.gen_range(0..pool.len().max(1)))?;
    let code = rng.gen_range(start..=end);
    char::from_u32(code).or_else(|| char::from_u32(start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generate(pattern: &str) -> String {
        let generator = PatternGenerator::compile(pattern).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        generator.generate(&mut rng, 0, 100).unwrap()
    }

    #[test]
    fn test_common_patterns() {
        for pattern in [
            r"^[A-Z]{3}-\d{4}$",
            r"^[a-z0-9_]+$",
            r"^(cat|dog|bird)$",
            r"^\+?[1-9]\d{1,14}$",
            r"^[A-Za-z]+( [A-Za-z]+)*$",
            r"\w+@\w+\.com",
        ] {
            let value = generate(pattern);
            assert!(Regex::new(pattern).unwrap().is_match(&value), "{pattern} -> {value}");
        }
    }

    #[test]
    fn test_dot_prefers_ascii() {
        let value = generate("^.{5}$");
        assert_eq!(value.chars().count(), 5);
        assert!(value.chars().all(|c| c.is_ascii() && !c.is_ascii_control()));
    }

    #[test]
    fn test_length_window() {
        let generator = PatternGenerator::compile("^a{2,5}$").unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let value = generator.generate(&mut rng, 3, 4).unwrap();
        assert!((3..=4).contains(&value.len()));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(PatternGenerator::compile("([unclosed").is_err());
    }
}
