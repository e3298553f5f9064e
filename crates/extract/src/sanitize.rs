use regex::Regex;
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").expect("valid code fence pattern")
});

static PYTHON_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(None|True|False)\b").expect("valid literal pattern")
});

/// Make a structuring response parseable as JSON.
///
/// A response that already parses is returned unchanged (apart from
/// surrounding whitespace). Otherwise Markdown code fences are stripped,
/// single-quoted strings are requoted, and bare Python-style
/// `None`/`True`/`False` become `null`/`true`/`false`. String contents are
/// never rewritten.
pub fn sanitize_response(raw: &str) -> String {
    let trimmed = raw.trim();
    if is_json(trimmed) {
        return trimmed.to_string();
    }

    let unfenced = match CODE_FENCE.captures(trimmed) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => trimmed,
    };
    if is_json(unfenced) {
        return unfenced.to_string();
    }

    normalize_python_literals(unfenced)
}

fn normalize_python_literals(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut bare = String::new();
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c == '\'' || c == '"' {
            out.push_str(&replace_literals(&bare));
            bare.clear();
            copy_string(&mut chars, c, &mut out);
        } else {
            bare.push(c);
        }
    }
    out.push_str(&replace_literals(&bare));
    out
}

/// Copy one string literal opened by `quote`, emitting it double-quoted.
fn copy_string(chars: &mut std::str::Chars<'_>, quote: char, out: &mut String) {
    out.push('"');
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                // \' is not a JSON escape
                Some('\'') => out.push('\''),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            c if c == quote => break,
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn replace_literals(bare: &str) -> String {
    PYTHON_LITERAL
        .replace_all(bare, |caps: &regex::Captures| match &caps[1] {
            "None" => "null",
            "True" => "true",
            _ => "false",
        })
        .into_owned()
}

fn is_json(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text).is_ok()
}
