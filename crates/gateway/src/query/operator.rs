//! Operator resolution for a single decoded query pair.
//!
//! The transport decoder has already split the pair at its first `=`, so an
//! operator like `>=` arrives as key `"cpu_cores>"` and value `"4"`. Resolution
//! works on the concatenation of both halves and therefore sees `cpu_cores>4`,
//! which resolves to `>`. Existing clients depend on this, so it is kept as-is;
//! the named suffix tokens (`.gte`, `.ne`, ...) are the collision-free spelling.

use std::sync::LazyLock;

use regex::Regex;

use super::{Filter, OperatorTag};

/// Infix operators tested against `key + value`, in priority order.
///
/// `!~` is tested ahead of `~`: the reverse order would capture the `!` into
/// the field name and `!~` could never be produced.
const INFIX_OPERATORS: [(&str, OperatorTag); 8] = [
    (">=", OperatorTag::Gte),
    ("<=", OperatorTag::Lte),
    (">", OperatorTag::Gt),
    ("<", OperatorTag::Lt),
    ("!=", OperatorTag::NotEq),
    ("!~", OperatorTag::NotLike),
    ("~", OperatorTag::Like),
    ("!in", OperatorTag::NotIn),
];

/// Compiled `^(.+)<op>(.+)$` patterns.
///
/// # Panics
///
/// Panics if one of the hard-coded patterns is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static INFIX_PATTERNS: LazyLock<Vec<(Regex, OperatorTag)>> = LazyLock::new(|| {
    INFIX_OPERATORS
        .iter()
        .map(|(symbol, op)| {
            let pattern = format!("^(.+){}(.+)$", regex::escape(symbol));
            (Regex::new(&pattern).expect("valid infix pattern"), *op)
        })
        .collect()
});

/// What a key suffix maps to.
#[derive(Debug, Clone, Copy)]
enum SuffixOp {
    /// Fixed operator, value passed through.
    Plain(OperatorTag),
    /// Boolean flag: positive tag for `true`/`1`, negated tag otherwise.
    Flag {
        positive: OperatorTag,
        negative: OperatorTag,
    },
}

/// Key suffixes, checked in order after the infix patterns.
const SUFFIXES: [(&str, SuffixOp); 21] = [
    ("[]contains", SuffixOp::Plain(OperatorTag::ArrayIncludes)),
    ("[]!contains", SuffixOp::Plain(OperatorTag::NotArrayIncludes)),
    ("[]includes_any", SuffixOp::Plain(OperatorTag::ArrayIncludesAny)),
    ("[]includes_all", SuffixOp::Plain(OperatorTag::ArrayIncludesAll)),
    (".size", SuffixOp::Plain(OperatorTag::Size)),
    (".size>", SuffixOp::Plain(OperatorTag::SizeGt)),
    (".size>=", SuffixOp::Plain(OperatorTag::SizeGte)),
    (".size<", SuffixOp::Plain(OperatorTag::SizeLt)),
    (".size<=", SuffixOp::Plain(OperatorTag::SizeLte)),
    (
        ".exists",
        SuffixOp::Flag {
            positive: OperatorTag::Exists,
            negative: OperatorTag::NotExists,
        },
    ),
    (
        ".empty",
        SuffixOp::Flag {
            positive: OperatorTag::Empty,
            negative: OperatorTag::NotEmpty,
        },
    ),
    (".like", SuffixOp::Plain(OperatorTag::LikePattern)),
    (".regex", SuffixOp::Plain(OperatorTag::Regex)),
    // Named comparison tokens; these never collide with `=` or `&`.
    (".eq", SuffixOp::Plain(OperatorTag::Eq)),
    (".ne", SuffixOp::Plain(OperatorTag::NotEq)),
    (".gt", SuffixOp::Plain(OperatorTag::Gt)),
    (".gte", SuffixOp::Plain(OperatorTag::Gte)),
    (".lt", SuffixOp::Plain(OperatorTag::Lt)),
    (".lte", SuffixOp::Plain(OperatorTag::Lte)),
    (".in", SuffixOp::Plain(OperatorTag::In)),
    (".nin", SuffixOp::Plain(OperatorTag::NotIn)),
];

/// Resolve one decoded key/value pair into a [`Filter`].
///
/// Never fails: anything unrecognised degrades to equality on the raw key.
pub fn resolve_pair(key: &str, value: &str) -> Filter {
    if let Some(filter) = match_infix(key, value) {
        return filter;
    }

    if let Some(filter) = match_suffix(key, value) {
        return filter;
    }

    if value.contains(',') {
        return Filter::new(key, OperatorTag::In, value);
    }

    Filter::new(key, OperatorTag::Eq, value)
}

fn match_infix(key: &str, value: &str) -> Option<Filter> {
    let probe = format!("{key}{value}");

    INFIX_PATTERNS.iter().find_map(|(pattern, op)| {
        let captures = pattern.captures(&probe)?;
        let field = captures.get(1)?.as_str().trim();
        let operand = captures.get(2)?.as_str().trim();
        Some(Filter::new(field, *op, operand))
    })
}

fn match_suffix(key: &str, value: &str) -> Option<Filter> {
    SUFFIXES.iter().find_map(|(suffix, kind)| {
        let field = key.strip_suffix(suffix)?;
        let filter = match *kind {
            SuffixOp::Plain(op) => Filter::new(field, op, value),
            SuffixOp::Flag { positive, negative } => {
                let op = if value == "true" || value == "1" {
                    positive
                } else {
                    negative
                };
                Filter::new(field, op, "true")
            }
        };
        Some(filter)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn resolved(key: &str, value: &str) -> (String, OperatorTag, String) {
        let f = resolve_pair(key, value);
        (f.field, f.op, f.value)
    }

    fn expect(field: &str, op: OperatorTag, value: &str) -> (String, OperatorTag, String) {
        (field.to_string(), op, value.to_string())
    }

    #[test]
    fn single_character_operators_without_equals() {
        assert_eq!(
            resolved("hostname~web", ""),
            expect("hostname", OperatorTag::Like, "web")
        );
        assert_eq!(
            resolved("cpu_cores>4", ""),
            expect("cpu_cores", OperatorTag::Gt, "4")
        );
        assert_eq!(
            resolved("memory_gb<16", ""),
            expect("memory_gb", OperatorTag::Lt, "16")
        );
        assert_eq!(
            resolved("hostname!~db", ""),
            expect("hostname", OperatorTag::NotLike, "db")
        );
    }

    #[test]
    fn decoder_eats_equals_of_gte() {
        assert_eq!(
            resolved("cpu_cores>", "4"),
            expect("cpu_cores", OperatorTag::Gt, "4")
        );
        assert_eq!(
            resolved("cpu_cores<", "4"),
            expect("cpu_cores", OperatorTag::Lt, "4")
        );
    }

    #[test]
    fn decoder_eats_equals_of_not_equal() {
        assert_eq!(
            resolved("status!", "offline"),
            expect("status!", OperatorTag::Eq, "offline")
        );
    }

    #[test]
    fn equals_operators_survive_when_value_is_empty() {
        // `a>=b` only reaches us intact if the decoder saw no `=` before it,
        // which cannot happen; the patterns still resolve the literal text.
        assert_eq!(
            resolved("cpu_cores>=4", ""),
            expect("cpu_cores", OperatorTag::Gte, "4")
        );
        assert_eq!(
            resolved("status!=offline", ""),
            expect("status", OperatorTag::NotEq, "offline")
        );
    }

    #[test]
    fn infix_captures_are_trimmed() {
        assert_eq!(
            resolved(" load >", " 2 "),
            expect("load", OperatorTag::Gt, "2")
        );
    }

    #[test]
    fn not_in_infix() {
        assert_eq!(
            resolved("status!in", "offline,retired"),
            expect("status", OperatorTag::NotIn, "offline,retired")
        );
    }

    #[test]
    fn array_suffixes() {
        assert_eq!(
            resolved("tags[]contains", "prod"),
            expect("tags", OperatorTag::ArrayIncludes, "prod")
        );
        assert_eq!(
            resolved("tags[]!contains", "prod"),
            expect("tags", OperatorTag::NotArrayIncludes, "prod")
        );
        assert_eq!(
            resolved("tags[]includes_any", "a,b"),
            expect("tags", OperatorTag::ArrayIncludesAny, "a,b")
        );
        assert_eq!(
            resolved("tags[]includes_all", "a,b"),
            expect("tags", OperatorTag::ArrayIncludesAll, "a,b")
        );
    }

    #[test]
    fn size_suffixes() {
        assert_eq!(
            resolved("disks.size", "2"),
            expect("disks", OperatorTag::Size, "2")
        );
        // With a value present, `disks.size>` + `2` reads as the infix `>`.
        assert_eq!(
            resolved("disks.size>", "2"),
            expect("disks.size", OperatorTag::Gt, "2")
        );
        assert_eq!(
            resolved("disks.size>", ""),
            expect("disks", OperatorTag::SizeGt, "")
        );
        assert_eq!(
            resolved("disks.size<", ""),
            expect("disks", OperatorTag::SizeLt, "")
        );
    }

    #[test]
    fn exists_and_empty_flags() {
        assert_eq!(
            resolved("owner.exists", "true"),
            expect("owner", OperatorTag::Exists, "true")
        );
        assert_eq!(
            resolved("owner.exists", "1"),
            expect("owner", OperatorTag::Exists, "true")
        );
        assert_eq!(
            resolved("owner.exists", "false"),
            expect("owner", OperatorTag::NotExists, "true")
        );
        assert_eq!(
            resolved("notes.empty", "true"),
            expect("notes", OperatorTag::Empty, "true")
        );
        assert_eq!(
            resolved("notes.empty", ""),
            expect("notes", OperatorTag::NotEmpty, "true")
        );
    }

    #[test]
    fn pattern_suffixes() {
        assert_eq!(
            resolved("hostname.like", "web%"),
            expect("hostname", OperatorTag::LikePattern, "web%")
        );
        assert_eq!(
            resolved("hostname.regex", "^web[0-9]+$"),
            expect("hostname", OperatorTag::Regex, "^web[0-9]+$")
        );
    }

    #[test]
    fn named_comparison_suffixes() {
        assert_eq!(
            resolved("cpu_cores.gte", "4"),
            expect("cpu_cores", OperatorTag::Gte, "4")
        );
        assert_eq!(
            resolved("status.ne", "offline"),
            expect("status", OperatorTag::NotEq, "offline")
        );
        assert_eq!(
            resolved("status.in", "online,maintenance"),
            expect("status", OperatorTag::In, "online,maintenance")
        );
        assert_eq!(
            resolved("status.nin", "retired"),
            expect("status", OperatorTag::NotIn, "retired")
        );
        assert_eq!(
            resolved("uptime.lte", "30"),
            expect("uptime", OperatorTag::Lte, "30")
        );
        assert_eq!(
            resolved("status.eq", "online"),
            expect("status", OperatorTag::Eq, "online")
        );
        assert_eq!(
            resolved("cpu_cores.gt", "4"),
            expect("cpu_cores", OperatorTag::Gt, "4")
        );
        assert_eq!(
            resolved("memory_gb.lt", "16"),
            expect("memory_gb", OperatorTag::Lt, "16")
        );
    }

    #[test]
    fn named_eq_suffix_keeps_commas_literal() {
        assert_eq!(
            resolved("label.eq", "a,b"),
            expect("label", OperatorTag::Eq, "a,b")
        );
    }

    #[test]
    fn comma_value_becomes_in() {
        assert_eq!(
            resolved("status", "online,maintenance"),
            expect("status", OperatorTag::In, "online,maintenance")
        );
    }

    #[test]
    fn default_is_equality() {
        assert_eq!(
            resolved("status", "online"),
            expect("status", OperatorTag::Eq, "online")
        );
        assert_eq!(resolved("flag", ""), expect("flag", OperatorTag::Eq, ""));
    }

    #[test]
    fn greedy_left_capture() {
        assert_eq!(resolved("a>b>c", ""), expect("a>b", OperatorTag::Gt, "c"));
    }
}
