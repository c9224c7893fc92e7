use std::fmt::Display;

/// An error that can occur during parsing.
#[derive(Copy, Clone, Debug)]
pub(crate) struct ParseError {
    pub(crate) remaining: usize,
    pub(crate) cause: ParseErrorCause,
}

impl ParseError {
    /// Given the original string, returns the 1-based position
    /// of the error in characters.
    /// If an incorrect string was given, the function may return 0.
    pub(crate) fn calculate_position(&self, original: &str) -> Option<usize> {
        calculate_position(original, self.remaining)
    }

    /// Returns the error cause.
    pub(crate) fn get_cause(&self) -> ParseErrorCause {
        self.cause
    }
}

/// Cause of the parsing error.
/// Should be lightweight so that it can be quickly discarded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ParseErrorCause {
    Expected(&'static str),
    Other(&'static str),
}

impl Display for ParseErrorCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErrorCause::Expected(e) => write!(f, "expected {:?}", e),
            ParseErrorCause::Other(e) => f.write_str(e),
        }
    }
}

pub(crate) type ParseResult<T> = Result<T, ParseError>;

/// A utility class for building simple recursive-descent parsers.
///
/// Basically, a wrapper over &str with nice methods that help with parsing.
#[derive(Clone, Copy)]
#[must_use]
pub(crate) struct ParserState<'s> {
    s: &'s str,
}

impl<'s> ParserState<'s> {
    /// Creates a new parser from given input string.
    pub(crate) fn new(s: &'s str) -> Self {
        Self { s }
    }

    /// Applies given parsing function until it returns false
    /// and returns the final parser state.
    pub(crate) fn parse_while(
        self,
        mut parser: impl FnMut(Self) -> ParseResult<(bool, Self)>,
    ) -> ParseResult<Self> {
        let mut me = self;
        loop {
            let (proceed, new_me) = parser(me)?;
            if !proceed {
                return Ok(new_me);
            }
            me = new_me;
        }
    }

    /// If the input string contains given string at the beginning,
    /// returns true and a new parser state with given string skipped.
    /// Otherwise, returns false and the unchanged state.
    pub(crate) fn accept_opt(self, part: &'static str) -> (bool, Self) {
        match self.s.strip_prefix(part) {
            Some(s) => (true, Self { s }),
            None => (false, self),
        }
    }

    /// Consumes an optional leading `+` or `-`.
    /// Returns true if the sign was negative.
    pub(crate) fn accept_sign(self) -> (bool, Self) {
        if let (true, p) = self.accept_opt("-") {
            return (true, p);
        }
        let (_, p) = self.accept_opt("+");
        (false, p)
    }

    /// Skips characters from the beginning while they satisfy given predicate
    /// and returns new parser state which
    pub(crate) fn take_while(self, mut pred: impl FnMut(char) -> bool) -> (&'s str, Self) {
        let idx = self.s.find(move |c| !pred(c)).unwrap_or(self.s.len());
        let new = Self { s: &self.s[idx..] };
        (&self.s[..idx], new)
    }

    /// Returns the unparsed rest of the input.
    pub(crate) fn rest(self) -> &'s str {
        self.s
    }

    /// Returns the number of remaining bytes to parse.
    pub(crate) fn get_remaining(self) -> usize {
        self.s.len()
    }

    /// Returns true if the input string was parsed completely.
    pub(crate) fn is_at_eof(self) -> bool {
        self.s.is_empty()
    }

    /// Returns an error with given cause, associated with given position.
    pub(crate) fn error(self, cause: ParseErrorCause) -> ParseError {
        ParseError {
            remaining: self.get_remaining(),
            cause,
        }
    }
}

fn calculate_position(original: &str, rem_len: usize) -> Option<usize> {
    if rem_len > original.len() {
        return None;
    }
    let prefix_len = original.len() - rem_len;
    let prefix = original.get(..prefix_len)?;
    Some(prefix.chars().count() + 1)
}

const NANOS_PER_UNIT: [(&str, u64); 8] = [
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000), // U+00B5 micro sign
    ("μs", 1_000), // U+03BC greek mu
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 60 * 60 * 1_000_000_000),
];

const OUT_OF_RANGE: ParseErrorCause = ParseErrorCause::Other("duration out of range");

/// Parses a duration: an optional sign followed by one or more decimal
/// numbers, each with an optional fraction and a mandatory unit, e.g.
/// `300ms`, `-1.5h`, `2h45m`.
/// A bare `0` is also accepted.
///
/// Returns the duration in signed nanoseconds.
pub(crate) fn parse_duration_nanos(s: &str) -> ParseResult<i64> {
    let (negative, p) = ParserState::new(s).accept_sign();
    if p.rest() == "0" {
        return Ok(0);
    }
    if p.is_at_eof() {
        return Err(p.error(ParseErrorCause::Expected("number")));
    }

    // -2^63 ns is representable, 2^63 ns is not.
    let limit = if negative {
        i64::MIN.unsigned_abs()
    } else {
        i64::MAX as u64
    };

    let mut total: u64 = 0;
    p.parse_while(|p| {
        if p.is_at_eof() {
            return Ok((false, p));
        }
        let (nanos, next) = parse_duration_component(p)?;
        total = total
            .checked_add(nanos)
            .filter(|t| *t <= limit)
            .ok_or_else(|| p.error(OUT_OF_RANGE))?;
        Ok((true, next))
    })?;

    Ok(if negative {
        0i64.wrapping_sub_unsigned(total)
    } else {
        total as i64
    })
}

// One `<number>[.<fraction>]<unit>` group.
fn parse_duration_component(p: ParserState<'_>) -> ParseResult<(u64, ParserState<'_>)> {
    let (whole_digits, p) = p.take_while(|c| c.is_ascii_digit());
    let (has_dot, p) = p.accept_opt(".");
    let (fraction_digits, p) = if has_dot {
        p.take_while(|c| c.is_ascii_digit())
    } else {
        ("", p)
    };
    if whole_digits.is_empty() && fraction_digits.is_empty() {
        return Err(p.error(ParseErrorCause::Expected("digit")));
    }

    let (unit, rest) = p.take_while(|c| c != '.' && !c.is_ascii_digit());
    if unit.is_empty() {
        return Err(p.error(ParseErrorCause::Other("missing unit in duration")));
    }
    let unit_nanos = NANOS_PER_UNIT
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, nanos)| *nanos)
        .ok_or_else(|| p.error(ParseErrorCause::Other("unknown unit in duration")))?;

    let whole: u64 = if whole_digits.is_empty() {
        0
    } else {
        whole_digits.parse().map_err(|_| p.error(OUT_OF_RANGE))?
    };
    let mut nanos = whole
        .checked_mul(unit_nanos)
        .ok_or_else(|| p.error(OUT_OF_RANGE))?;

    if !fraction_digits.is_empty() {
        // Digits that do not fit in a u64 cannot change the result anymore.
        let mut fraction: u64 = 0;
        let mut scale: f64 = 1.0;
        for digit in fraction_digits.bytes() {
            if fraction > (u64::MAX - 9) / 10 {
                break;
            }
            fraction = fraction * 10 + u64::from(digit - b'0');
            scale *= 10.0;
        }
        let fraction_nanos = (fraction as f64 * (unit_nanos as f64 / scale)) as u64;
        nanos = nanos
            .checked_add(fraction_nanos)
            .ok_or_else(|| p.error(OUT_OF_RANGE))?;
    }

    Ok((nanos, rest))
}

/// Parses an integer with its base taken from the prefix: `0x`
/// hexadecimal, `0o` or a bare leading `0` octal, `0b` binary, decimal
/// otherwise. A sign may precede the prefix. Underscores may separate
/// digits when a prefix is present.
pub(crate) fn parse_prefixed_int(s: &str) -> ParseResult<i64> {
    let (negative, p) = ParserState::new(s).accept_sign();

    let radix_prefixes = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)];
    let (radix, digits_state, prefixed) = radix_prefixes
        .iter()
        .find_map(|(prefix, radix)| match p.accept_opt(*prefix) {
            (true, rest) => Some((*radix, rest, true)),
            (false, _) => None,
        })
        .unwrap_or_else(|| {
            let rest = p.rest();
            if rest.len() > 1 && rest.starts_with('0') {
                (8, p, true)
            } else {
                (10, p, false)
            }
        });

    let (digits, rest) = digits_state.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
    if !rest.is_at_eof() {
        return Err(rest.error(ParseErrorCause::Other("unexpected character in integer")));
    }
    if digits.is_empty() || (!prefixed && digits.contains('_')) {
        return Err(digits_state.error(ParseErrorCause::Expected("digit")));
    }
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() {
        return Err(digits_state.error(ParseErrorCause::Expected("digit")));
    }

    let magnitude = u64::from_str_radix(&cleaned, radix)
        .map_err(|_| digits_state.error(ParseErrorCause::Other("invalid integer")))?;
    if negative {
        if magnitude > i64::MIN.unsigned_abs() {
            return Err(digits_state.error(ParseErrorCause::Other("integer out of range")));
        }
        Ok(0i64.wrapping_sub_unsigned(magnitude))
    } else {
        i64::try_from(magnitude)
            .map_err(|_| digits_state.error(ParseErrorCause::Other("integer out of range")))
    }
}
