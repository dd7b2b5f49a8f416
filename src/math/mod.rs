//! LaTeX math rendering for the terminal.
//!
//! A small substitution renderer turns common LaTeX into Unicode text for
//! display. Rendering never fails hard: source that does not parse renders
//! as an "Invalid LaTeX" marker and the original source stays intact for
//! editing. Validation is structural only (balanced groups, known escape
//! syntax), not a full grammar.

use std::fmt;

/// Why a piece of LaTeX source failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    UnbalancedBraces,
    DanglingBackslash,
    EmptyGroup,
}

impl fmt::Display for MathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnbalancedBraces => write!(f, "unbalanced braces"),
            Self::DanglingBackslash => write!(f, "dangling backslash"),
            Self::EmptyGroup => write!(f, "empty script group"),
        }
    }
}

/// Shown in place of math that failed to render.
pub const INVALID_MARKER: &str = "Invalid LaTeX";

/// Shown for an empty math node so it stays visible and editable.
pub const EMPTY_PLACEHOLDER: &str = "(empty math)";

/// Structural check run before rendering and by the math editor.
pub fn validate(latex: &str) -> Result<(), MathError> {
    let mut depth: i32 = 0;
    let mut chars = latex.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                // An escape must be followed by something.
                if chars.next().is_none() {
                    return Err(MathError::DanglingBackslash);
                }
            }
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(MathError::UnbalancedBraces);
                }
            }
            '^' | '_' => {
                if matches!(chars.peek(), Some('}')) || chars.peek().is_none() {
                    return Err(MathError::EmptyGroup);
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(MathError::UnbalancedBraces);
    }
    Ok(())
}

/// Render LaTeX to display text. Invalid source yields [`INVALID_MARKER`],
/// empty source yields [`EMPTY_PLACEHOLDER`].
pub fn render(latex: &str) -> String {
    let trimmed = latex.trim();
    if trimmed.is_empty() {
        return EMPTY_PLACEHOLDER.to_string();
    }
    if validate(trimmed).is_err() {
        return INVALID_MARKER.to_string();
    }
    render_tokens(trimmed)
}

fn render_tokens(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphabetic() {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    // Escaped punctuation renders literally.
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else if name == "frac" {
                    let numerator = take_group(&mut chars);
                    let denominator = take_group(&mut chars);
                    out.push_str(&render_tokens(&numerator));
                    out.push('/');
                    out.push_str(&render_tokens(&denominator));
                } else {
                    out.push_str(symbol_for(&name).unwrap_or(&name));
                }
            }
            '^' => out.push_str(&script(&mut chars, SUPERSCRIPTS, '^')),
            '_' => out.push_str(&script(&mut chars, SUBSCRIPTS, '_')),
            '{' | '}' => {}
            _ => out.push(c),
        }
    }
    out
}

fn take_group(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut group = String::new();
    if chars.peek() == Some(&'{') {
        chars.next();
        let mut depth = 1;
        for c in chars.by_ref() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            group.push(c);
        }
    } else if let Some(c) = chars.next() {
        group.push(c);
    }
    group
}

fn script(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    table: &[(char, char)],
    prefix: char,
) -> String {
    let group = take_group(chars);
    let rendered = render_tokens(&group);
    let mapped: Option<String> = rendered
        .chars()
        .map(|c| table.iter().find(|(from, _)| *from == c).map(|(_, to)| *to))
        .collect();
    // Fall back to explicit notation when a char has no script form.
    mapped.unwrap_or_else(|| format!("{prefix}({rendered})"))
}

const SUPERSCRIPTS: &[(char, char)] = &[
    ('0', '⁰'),
    ('1', '¹'),
    ('2', '²'),
    ('3', '³'),
    ('4', '⁴'),
    ('5', '⁵'),
    ('6', '⁶'),
    ('7', '⁷'),
    ('8', '⁸'),
    ('9', '⁹'),
    ('+', '⁺'),
    ('-', '⁻'),
    ('n', 'ⁿ'),
    ('i', 'ⁱ'),
];

const SUBSCRIPTS: &[(char, char)] = &[
    ('0', '₀'),
    ('1', '₁'),
    ('2', '₂'),
    ('3', '₃'),
    ('4', '₄'),
    ('5', '₅'),
    ('6', '₆'),
    ('7', '₇'),
    ('8', '₈'),
    ('9', '₉'),
    ('+', '₊'),
    ('-', '₋'),
    ('n', 'ₙ'),
    ('i', 'ᵢ'),
];

fn symbol_for(name: &str) -> Option<&'static str> {
    let symbol = match name {
        "alpha" => "α",
        "beta" => "β",
        "gamma" => "γ",
        "delta" => "δ",
        "epsilon" => "ε",
        "zeta" => "ζ",
        "eta" => "η",
        "theta" => "θ",
        "lambda" => "λ",
        "mu" => "μ",
        "pi" => "π",
        "rho" => "ρ",
        "sigma" => "σ",
        "tau" => "τ",
        "phi" => "φ",
        "chi" => "χ",
        "psi" => "ψ",
        "omega" => "ω",
        "Gamma" => "Γ",
        "Delta" => "Δ",
        "Theta" => "Θ",
        "Lambda" => "Λ",
        "Pi" => "Π",
        "Sigma" => "Σ",
        "Phi" => "Φ",
        "Psi" => "Ψ",
        "Omega" => "Ω",
        "infty" => "∞",
        "int" => "∫",
        "sum" => "Σ",
        "prod" => "Π",
        "sqrt" => "√",
        "pm" => "±",
        "times" => "×",
        "cdot" => "·",
        "div" => "÷",
        "leq" | "le" => "≤",
        "geq" | "ge" => "≥",
        "neq" | "ne" => "≠",
        "approx" => "≈",
        "equiv" => "≡",
        "partial" => "∂",
        "nabla" => "∇",
        "in" => "∈",
        "notin" => "∉",
        "subset" => "⊂",
        "cup" => "∪",
        "cap" => "∩",
        "forall" => "∀",
        "exists" => "∃",
        "rightarrow" | "to" => "→",
        "leftarrow" => "←",
        "Rightarrow" => "⇒",
        "Leftrightarrow" => "⇔",
        "ldots" | "dots" => "…",
        _ => return None,
    };
    Some(symbol)
}
