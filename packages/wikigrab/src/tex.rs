//! Rendering of TeX formulas as readable plain text.
//!
//! Formulas arrive as the TeX source of their `application/x-tex` annotation, still carrying
//! the HTML escaping of the page. Control words with a Unicode counterpart become that
//! character, fractions become `a/b` with parentheses around compound parts, font and style
//! commands keep only their argument and layout commands disappear.

#![expect(
    clippy::arithmetic_side_effects,
    reason = "offsets never exceed the length of the formula being read"
)]

use std::{slice, str};

use crate::ByteBuffer;

// Rendered with a space on each side. Doubled spaces are collapsed afterwards.
const RELATIONS: &[(&str, &str)] = &[
    ("leq", "≤"),
    ("le", "≤"),
    ("geq", "≥"),
    ("ge", "≥"),
    ("neq", "≠"),
    ("ne", "≠"),
    ("approx", "≈"),
    ("equiv", "≡"),
    ("cong", "≅"),
    ("sim", "∼"),
    ("times", "×"),
    ("cdot", "·"),
    ("pm", "±"),
    ("mp", "∓"),
    ("div", "÷"),
    ("in", "∈"),
    ("notin", "∉"),
    ("ni", "∋"),
    ("subset", "⊂"),
    ("subseteq", "⊆"),
    ("supset", "⊃"),
    ("supseteq", "⊇"),
    ("cup", "∪"),
    ("cap", "∩"),
    ("setminus", "∖"),
    ("backslash", "\\"),
    ("to", "→"),
    ("rightarrow", "→"),
    ("leftarrow", "←"),
    ("Rightarrow", "⇒"),
    ("Leftarrow", "⇐"),
    ("Leftrightarrow", "⇔"),
    ("iff", "⇔"),
    ("implies", "⇒"),
    ("mapsto", "↦"),
    ("land", "∧"),
    ("wedge", "∧"),
    ("lor", "∨"),
    ("vee", "∨"),
    ("oplus", "⊕"),
    ("otimes", "⊗"),
    ("circ", "∘"),
    ("mid", "∣"),
    ("colon", ":"),
];

const SYMBOLS: &[(&str, &str)] = &[
    ("alpha", "α"),
    ("beta", "β"),
    ("gamma", "γ"),
    ("delta", "δ"),
    ("epsilon", "ε"),
    ("varepsilon", "ε"),
    ("zeta", "ζ"),
    ("eta", "η"),
    ("theta", "θ"),
    ("vartheta", "ϑ"),
    ("iota", "ι"),
    ("kappa", "κ"),
    ("lambda", "λ"),
    ("mu", "μ"),
    ("nu", "ν"),
    ("xi", "ξ"),
    ("pi", "π"),
    ("rho", "ρ"),
    ("sigma", "σ"),
    ("tau", "τ"),
    ("upsilon", "υ"),
    ("phi", "ϕ"),
    ("varphi", "φ"),
    ("chi", "χ"),
    ("psi", "ψ"),
    ("omega", "ω"),
    ("Gamma", "Γ"),
    ("Delta", "Δ"),
    ("Theta", "Θ"),
    ("Lambda", "Λ"),
    ("Xi", "Ξ"),
    ("Pi", "Π"),
    ("Sigma", "Σ"),
    ("Upsilon", "Υ"),
    ("Phi", "Φ"),
    ("Psi", "Ψ"),
    ("Omega", "Ω"),
    ("sum", "Σ"),
    ("prod", "∏"),
    ("int", "∫"),
    ("oint", "∮"),
    ("partial", "∂"),
    ("nabla", "∇"),
    ("infty", "∞"),
    ("forall", "∀"),
    ("exists", "∃"),
    ("neg", "¬"),
    ("lnot", "¬"),
    ("emptyset", "∅"),
    ("varnothing", "∅"),
    ("aleph", "ℵ"),
    ("hbar", "ℏ"),
    ("ell", "ℓ"),
    ("prime", "′"),
    ("degree", "°"),
    ("ldots", "..."),
    ("dots", "..."),
    ("cdots", "⋯"),
    ("vdots", "⋮"),
    ("ddots", "⋱"),
    ("langle", "⟨"),
    ("rangle", "⟩"),
    ("lfloor", "⌊"),
    ("rfloor", "⌋"),
    ("lceil", "⌈"),
    ("rceil", "⌉"),
    ("vert", "|"),
    ("Vert", "‖"),
    ("quad", " "),
    ("qquad", " "),
];

// Commands whose argument is shown as it is.
const TEXT_COMMANDS: &[&str] = &[
    "boldsymbol",
    "mathbf",
    "mathrm",
    "mathit",
    "mathsf",
    "mathtt",
    "mathcal",
    "mathbb",
    "mathfrak",
    "operatorname",
    "text",
    "textrm",
    "textbf",
    "textit",
    "mbox",
    "hat",
    "tilde",
    "vec",
    "dot",
    "ddot",
];

// Commands that only affect layout and produce no text.
const IGNORED: &[&str] = &[
    "displaystyle",
    "textstyle",
    "scriptstyle",
    "left",
    "right",
    "big",
    "Big",
    "bigg",
    "Bigg",
    "bigl",
    "bigr",
    "Bigl",
    "Bigr",
    "limits",
    "nolimits",
];

// An operand containing any of these is parenthesized inside a fraction or root.
const COMPOUND_MARKERS: &[u8] = b" +-*/=,";

/// Renders the TeX source of a formula as plain text.
///
/// `source` may still be HTML-escaped. `&amp;` is taken as an alignment tab and becomes a
/// space, other escapes are passed through for later decoding. Unknown control words are
/// written without their backslash. Runs of spaces are collapsed and the result is trimmed.
///
/// # Example
///
/// ```
/// use wikigrab::render_tex;
///
/// let text = render_tex(br"{\displaystyle \alpha \leq \frac{1}{2}}");
///
/// assert_eq!(text.as_bytes(), "α ≤ 1/2".as_bytes());
/// ```
#[must_use]
pub fn render_tex(source: &[u8]) -> ByteBuffer {
    let mut rendered = ByteBuffer::with_capacity(source.len());
    render_into(source, &mut rendered);

    tidy_spaces(&rendered)
}

fn render_into(source: &[u8], output: &mut ByteBuffer) {
    let mut position = 0;

    while let Some(rest) = source.get(position..).filter(|rest| !rest.is_empty()) {
        let consumed = match rest.first() {
            Some(b'\\') => command(rest, output),
            Some(b'{') => {
                let (inner, consumed) = group(rest);
                render_into(inner, output);
                consumed
            }
            Some(b'}') => 1,
            Some(b'~') => {
                output.append(b" ");
                1
            }
            _ if rest.starts_with(b"&amp;") => {
                output.append(b" ");
                5
            }
            _ => {
                output.append(rest.get(..1).unwrap_or_default());
                1
            }
        };

        position += consumed.max(1);
    }
}

/// Renders the control sequence at the start of `rest` and returns its length, arguments
/// included.
fn command(rest: &[u8], output: &mut ByteBuffer) -> usize {
    let after = rest.get(1..).unwrap_or_default();
    let name_len = after
        .iter()
        .take_while(|byte| byte.is_ascii_alphabetic())
        .count();

    if name_len == 0 {
        return match after.first() {
            None => 1,
            Some(b'\\') => {
                output.append(b"\n");
                2
            }
            Some(b',' | b':' | b';' | b' ') => {
                output.append(b" ");
                2
            }
            Some(b'!') => 2,
            Some(symbol) => {
                output.append(slice::from_ref(symbol));
                2
            }
        };
    }

    let name = after
        .get(..name_len)
        .and_then(|name| str::from_utf8(name).ok())
        .unwrap_or_default();
    // Whitespace after a control word belongs to it.
    let spaces = rest
        .iter()
        .skip(1 + name_len)
        .take_while(|byte| byte.is_ascii_whitespace())
        .count();
    let consumed = 1 + name_len + spaces;
    let tail = rest.get(consumed..).unwrap_or_default();

    match name {
        "frac" | "dfrac" | "tfrac" | "cfrac" => {
            let (numerator, numerator_len) = argument(tail);
            let (denominator, denominator_len) =
                argument(tail.get(numerator_len..).unwrap_or_default());

            write_operand(numerator, output);
            output.append(b"/");
            write_operand(denominator, output);

            consumed + numerator_len + denominator_len
        }
        "sqrt" => {
            let (radicand, radicand_len) = argument(tail);

            output.append("√".as_bytes());
            write_operand(radicand, output);

            consumed + radicand_len
        }
        "bar" | "overline" => {
            let (base, base_len) = argument(tail);

            render_into(base, output);
            output.append("\u{305}".as_bytes());

            consumed + base_len
        }
        "begin" | "end" => {
            let (_, environment_len) = argument(tail);
            consumed + environment_len
        }
        _ if TEXT_COMMANDS.contains(&name) => {
            let (text, text_len) = argument(tail);
            render_into(text, output);
            consumed + text_len
        }
        _ if IGNORED.contains(&name) => consumed,
        _ => {
            if let Some((_, relation)) = RELATIONS.iter().find(|(word, _)| *word == name) {
                output.append(b" ");
                output.append(relation.as_bytes());
                output.append(b" ");
            } else if let Some((_, symbol)) = SYMBOLS.iter().find(|(word, _)| *word == name) {
                output.append(symbol.as_bytes());
            } else {
                output.append(name.as_bytes());
            }

            consumed
        }
    }
}

/// Splits a brace group off the start of `rest`, returning its content and its length
/// including the braces. An unclosed group runs to the end.
fn group(rest: &[u8]) -> (&[u8], usize) {
    let mut depth = 0_usize;
    let mut escaped = false;

    for (offset, byte) in rest.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }

        match byte {
            b'\\' => escaped = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);

                if depth == 0 {
                    return (rest.get(1..offset).unwrap_or_default(), offset + 1);
                }
            }
            _ => {}
        }
    }

    (rest.get(1..).unwrap_or_default(), rest.len())
}

/// Reads one command argument: a brace group, a control sequence or a single character.
/// Returns the argument and how many bytes it took, leading whitespace included.
fn argument(rest: &[u8]) -> (&[u8], usize) {
    let skipped = rest
        .iter()
        .take_while(|byte| byte.is_ascii_whitespace())
        .count();
    let tail = rest.get(skipped..).unwrap_or_default();

    let length = match tail.first() {
        None => 0,
        Some(b'{') => {
            let (inner, length) = group(tail);
            return (inner, skipped + length);
        }
        Some(b'\\') => {
            let name_len = tail
                .iter()
                .skip(1)
                .take_while(|byte| byte.is_ascii_alphabetic())
                .count();

            1 + name_len.max(1)
        }
        Some(lead) => utf8_len(*lead),
    };

    let length = length.min(tail.len());

    (tail.get(..length).unwrap_or_default(), skipped + length)
}

/// Renders a fraction or root operand, parenthesized if it is more than a single term.
fn write_operand(source: &[u8], output: &mut ByteBuffer) {
    let mut rendered = ByteBuffer::new();
    render_into(source, &mut rendered);

    let tidied = tidy_spaces(&rendered);
    let operand = tidied.as_bytes();

    if operand.iter().any(|byte| COMPOUND_MARKERS.contains(byte)) || operand.contains(&b'\n') {
        output.append(b"(");
        output.append(operand);
        output.append(b")");
    } else {
        output.append(operand);
    }
}

/// Collapses runs of spaces into one and removes spaces at the ends and around line breaks.
fn tidy_spaces(rendered: &ByteBuffer) -> ByteBuffer {
    let mut tidied = ByteBuffer::with_capacity(rendered.len());
    let mut space = false;

    for byte in rendered.as_bytes() {
        match byte {
            b' ' => space = true,
            b'\n' => {
                space = false;
                tidied.append(b"\n");
            }
            _ => {
                let after_break = tidied.as_bytes().last().is_none_or(|last| *last == b'\n');

                if space && !after_break {
                    tidied.append(b" ");
                }

                space = false;
                tidied.append(slice::from_ref(byte));
            }
        }
    }

    tidied
}

fn utf8_len(lead: u8) -> usize {
    match lead.leading_ones() {
        2 => 2,
        3 => 3,
        4 => 4,
        _ => 1,
    }
}
