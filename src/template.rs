//! Template rendering for destinations, command tokens and copy sources.
//!
//! Rendering is two passes over the string. First every `{name}` or
//! `{name:spec}` placeholder is replaced from the environment. The result is
//! then split on backticks and every odd segment is evaluated as an
//! expression, so expressions can see placeholder output but not the other
//! way round.
use crate::env::Environment;
use crate::error::{GenError, GenResult};
use crate::script::{exponent_style, format_float, index_value, ScriptHook, Value};
use regex::Regex;
use std::sync::OnceLock;

const EXPR_DELIMITER: char = '`';

/// Render `template` fully: placeholders, then inline expressions.
pub fn render(template: &str, env: &Environment, hook: &mut dyn ScriptHook) -> GenResult<String> {
    let substituted = substitute(template, env)?;
    evaluate_inline(template, &substituted, env, hook)
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([^{}]*)\}|[{}]").expect("regex for template placeholders")
    })
}

/// Placeholder pass only.
pub fn substitute(template: &str, env: &Environment) -> GenResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in placeholder_re().captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        match whole.as_str() {
            "{{" => out.push('{'),
            "}}" => out.push('}'),
            "{" | "}" => {
                return Err(GenError::template(
                    template,
                    format!("single '{}' at offset {}", whole.as_str(), whole.start()),
                ))
            }
            _ => {
                let field = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let rendered =
                    render_field(field, env).map_err(|reason| GenError::template(template, reason))?;
                out.push_str(&rendered);
            }
        }
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

fn evaluate_inline(
    template: &str,
    resolved: &str,
    env: &Environment,
    hook: &mut dyn ScriptHook,
) -> GenResult<String> {
    let segments: Vec<&str> = resolved.split(EXPR_DELIMITER).collect();
    if segments.len() % 2 == 0 {
        return Err(GenError::template(
            template,
            format!("odd number of '{EXPR_DELIMITER}' delimiters"),
        ));
    }
    let mut out = String::with_capacity(resolved.len());
    for (idx, segment) in segments.iter().enumerate() {
        if idx % 2 == 0 {
            out.push_str(segment);
            continue;
        }
        let value = hook
            .evaluate(segment, env)
            .map_err(|source| GenError::CodeExecution {
                fragment: segment.to_string(),
                source,
            })?;
        out.push_str(&value.to_string());
    }
    Ok(out)
}

fn render_field(field: &str, env: &Environment) -> Result<String, String> {
    let (reference, spec) = field.split_once(':').unwrap_or((field, ""));
    let (reference, conversion) = match reference.split_once('!') {
        Some((reference, conversion)) => (reference, Some(conversion)),
        None => (reference, None),
    };
    let value = lookup(reference.trim(), env)?;
    let value = match conversion {
        None => value,
        Some("s") => Value::Str(value.to_string()),
        Some("r") => Value::Str(value.repr()),
        Some(other) => return Err(format!("unknown conversion '!{other}'")),
    };
    let spec = FormatSpec::parse(spec)?;
    spec.apply(&value)
}

/// Resolve `name` or `name[key][0]...` against the environment.
fn lookup(reference: &str, env: &Environment) -> Result<Value, String> {
    let name_end = reference.find(['[', '.']).unwrap_or(reference.len());
    let name = &reference[..name_end];
    if name.is_empty() {
        return Err("positional placeholders are not supported; name a variable".to_string());
    }
    let mut value = env
        .get(name)
        .cloned()
        .ok_or_else(|| format!("variable {name:?} is not defined"))?;
    let mut rest = &reference[name_end..];
    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('[') else {
            return Err(format!("unsupported field accessor in {reference:?}"));
        };
        let close = inner
            .find(']')
            .ok_or_else(|| format!("missing ']' in {reference:?}"))?;
        let key = &inner[..close];
        let index = match key.parse::<i64>() {
            Ok(number) => Value::Int(number),
            Err(_) => Value::Str(key.to_string()),
        };
        value = index_value(&value, &index).map_err(|err| err.to_string())?;
        rest = &inner[close + 1..];
    }
    Ok(value)
}

/// `[[fill]align][sign][#][0][width][grouping][.precision][type]`
#[derive(Debug, Default, PartialEq)]
struct FormatSpec {
    fill: Option<char>,
    align: Option<char>,
    sign: Option<char>,
    alternate: bool,
    zero: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    kind: Option<char>,
}

fn is_align(ch: char) -> bool {
    matches!(ch, '<' | '>' | '^' | '=')
}

impl FormatSpec {
    fn parse(spec: &str) -> Result<Self, String> {
        let chars: Vec<char> = spec.chars().collect();
        let mut parsed = FormatSpec::default();
        let mut pos = 0;

        if chars.len() >= 2 && is_align(chars[1]) {
            parsed.fill = Some(chars[0]);
            parsed.align = Some(chars[1]);
            pos = 2;
        } else if chars.first().copied().is_some_and(is_align) {
            parsed.align = Some(chars[0]);
            pos = 1;
        }
        if let Some(&sign @ ('+' | '-' | ' ')) = chars.get(pos) {
            parsed.sign = Some(sign);
            pos += 1;
        }
        if chars.get(pos) == Some(&'#') {
            parsed.alternate = true;
            pos += 1;
        }
        if chars.get(pos) == Some(&'0') {
            parsed.zero = true;
            pos += 1;
        }
        let (width, next) = take_number(&chars, pos);
        parsed.width = width.unwrap_or(0);
        pos = next;
        if let Some(&group @ (',' | '_')) = chars.get(pos) {
            parsed.grouping = Some(group);
            pos += 1;
        }
        if chars.get(pos) == Some(&'.') {
            let (precision, next) = take_number(&chars, pos + 1);
            parsed.precision =
                Some(precision.ok_or_else(|| format!("missing precision in {spec:?}"))?);
            pos = next;
        }
        if let Some(&kind) = chars.get(pos) {
            if !"sdxXobfFeEgG%".contains(kind) {
                return Err(format!("unknown format code '{kind}'"));
            }
            parsed.kind = Some(kind);
            pos += 1;
        }
        if pos != chars.len() {
            return Err(format!("invalid format specifier {spec:?}"));
        }
        Ok(parsed)
    }

    fn apply(&self, value: &Value) -> Result<String, String> {
        match (self.kind, value) {
            (Some('d' | 'x' | 'X' | 'o' | 'b'), Value::Int(_) | Value::Bool(_))
            | (None, Value::Int(_)) => self.format_int(value.as_index().unwrap_or_default()),
            (Some('f' | 'F' | 'e' | 'E' | 'g' | 'G' | '%'), Value::Int(_) | Value::Bool(_)) => {
                self.format_float(value.as_index().unwrap_or_default() as f64)
            }
            (Some('f' | 'F' | 'e' | 'E' | 'g' | 'G' | '%') | None, Value::Float(number)) => {
                self.format_float(*number)
            }
            (Some('s') | None, Value::Str(text)) => self.format_str(text),
            (None, other) => self.format_str(&other.to_string()),
            (Some(kind), other) => Err(format!(
                "unknown format code '{kind}' for value of type {}",
                other.type_name()
            )),
        }
    }

    fn format_int(&self, number: i64) -> Result<String, String> {
        if self.precision.is_some() {
            return Err("precision not allowed in integer format specifier".to_string());
        }
        let magnitude = number.unsigned_abs();
        let (digits, prefix, group_size) = match self.kind {
            Some('x') => (format!("{magnitude:x}"), "0x", 4),
            Some('X') => (format!("{magnitude:X}"), "0X", 4),
            Some('o') => (format!("{magnitude:o}"), "0o", 4),
            Some('b') => (format!("{magnitude:b}"), "0b", 4),
            _ => (magnitude.to_string(), "", 3),
        };
        let digits = match self.grouping {
            Some(',') if group_size == 4 => {
                return Err("cannot use ',' with a radix format".to_string());
            }
            Some(sep) => group_digits(&digits, sep, group_size),
            None => digits,
        };
        let prefix = if self.alternate { prefix } else { "" };
        Ok(self.pad_number(number < 0, prefix, &digits))
    }

    fn format_float(&self, number: f64) -> Result<String, String> {
        let negative = number.is_sign_negative() && !number.is_nan();
        let magnitude = number.abs();
        let upper = matches!(self.kind, Some('F' | 'E' | 'G'));
        let mut body = if !magnitude.is_finite() {
            if magnitude.is_nan() { "nan" } else { "inf" }.to_string()
        } else {
            match self.kind {
                Some('f' | 'F') => format!("{:.*}", self.precision.unwrap_or(6), magnitude),
                Some('e' | 'E') => {
                    exponent_style(&format!("{:.*e}", self.precision.unwrap_or(6), magnitude))
                }
                Some('%') => format!("{:.*}%", self.precision.unwrap_or(6), magnitude * 100.0),
                Some('g' | 'G') => {
                    general(magnitude, self.precision.unwrap_or(6), self.alternate, false)
                }
                _ => match self.precision {
                    Some(precision) => general(magnitude, precision, self.alternate, true),
                    None => format_float(magnitude),
                },
            }
        };
        if upper {
            body = body.to_uppercase();
        }
        if let Some(sep) = self.grouping {
            let int_end = body
                .find(|ch: char| !ch.is_ascii_digit())
                .unwrap_or(body.len());
            let grouped = group_digits(&body[..int_end], sep, 3);
            body = format!("{grouped}{}", &body[int_end..]);
        }
        Ok(self.pad_number(negative, "", &body))
    }

    fn format_str(&self, text: &str) -> Result<String, String> {
        if self.sign.is_some() {
            return Err("sign not allowed in string format specifier".to_string());
        }
        if self.align == Some('=') {
            return Err("'=' alignment not allowed in string format specifier".to_string());
        }
        let text: String = match self.precision {
            Some(precision) => text.chars().take(precision).collect(),
            None => text.to_string(),
        };
        let align = self.align.unwrap_or('<');
        Ok(pad("", &text, self.width, align, self.fill_char()))
    }

    fn fill_char(&self) -> char {
        self.fill
            .or_else(|| self.zero.then_some('0'))
            .unwrap_or(' ')
    }

    fn pad_number(&self, negative: bool, radix_prefix: &str, digits: &str) -> String {
        let sign = match (negative, self.sign) {
            (true, _) => "-",
            (false, Some('+')) => "+",
            (false, Some(' ')) => " ",
            _ => "",
        };
        let prefix = format!("{sign}{radix_prefix}");
        let default_align = if self.zero { '=' } else { '>' };
        let align = self.align.unwrap_or(default_align);
        pad(&prefix, digits, self.width, align, self.fill_char())
    }
}

fn take_number(chars: &[char], start: usize) -> (Option<usize>, usize) {
    let mut pos = start;
    let mut number: Option<usize> = None;
    while let Some(digit) = chars.get(pos).and_then(|ch| ch.to_digit(10)) {
        number = Some(number.unwrap_or(0).saturating_mul(10).saturating_add(digit as usize));
        pos += 1;
    }
    (number, pos)
}

fn pad(prefix: &str, body: &str, width: usize, align: char, fill: char) -> String {
    let len = prefix.chars().count() + body.chars().count();
    if len >= width {
        return format!("{prefix}{body}");
    }
    let missing = width - len;
    let filler = |count: usize| fill.to_string().repeat(count);
    match align {
        '<' => format!("{prefix}{body}{}", filler(missing)),
        '^' => format!(
            "{}{prefix}{body}{}",
            filler(missing / 2),
            filler(missing - missing / 2)
        ),
        '=' => format!("{prefix}{}{body}", filler(missing)),
        _ => format!("{}{prefix}{body}", filler(missing)),
    }
}

fn group_digits(digits: &str, sep: char, size: usize) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::with_capacity(digits.len() + digits.len() / size);
    for (idx, ch) in chars.iter().enumerate() {
        if idx > 0 && (chars.len() - idx) % size == 0 {
            out.push(sep);
        }
        out.push(*ch);
    }
    out
}

/// General float format; `repr_like` is the behaviour of an empty type with
/// an explicit precision.
fn general(magnitude: f64, precision: usize, alternate: bool, repr_like: bool) -> String {
    let precision = precision.max(1);
    let exponent = if magnitude == 0.0 {
        0
    } else {
        let sci = format!("{:.*e}", precision - 1, magnitude);
        sci.split_once('e')
            .and_then(|(_, exp)| exp.parse::<i64>().ok())
            .unwrap_or(0)
    };
    let limit = i64::try_from(precision).unwrap_or(i64::MAX) - i64::from(repr_like);
    if (-4..limit).contains(&exponent) {
        let decimals = usize::try_from(i64::try_from(precision).unwrap_or(0) - 1 - exponent)
            .unwrap_or(0);
        let mut fixed = format!("{magnitude:.decimals$}");
        if !alternate {
            fixed = strip_fraction_zeros(&fixed);
        }
        if repr_like && !fixed.contains('.') {
            fixed.push_str(".0");
        }
        fixed
    } else {
        let sci = exponent_style(&format!("{:.*e}", precision - 1, magnitude));
        if alternate {
            return sci;
        }
        match sci.split_once('e') {
            Some((mantissa, exp)) => format!("{}e{exp}", strip_fraction_zeros(mantissa)),
            None => sci,
        }
    }
}

fn strip_fraction_zeros(text: &str) -> String {
    if !text.contains('.') {
        return text.to_string();
    }
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
