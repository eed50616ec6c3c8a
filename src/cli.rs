//! Argument helpers shared by the binaries.

use thiserror::Error;

use crate::backend::{BenchmarkCase, Coordinates};
use crate::driver::{
    BenchmarkDriver, CaseError, CaseReport, ExecMode,
    contention::{self, ContentionError, ContentionReport},
};
use crate::error::UsageError;
use crate::scripts::Language;

/// Parses the longest numeric prefix of `text` the way C `strtod` does,
/// including hexadecimal forms such as `0x1A` or `0x1.8p3`. Text without a
/// numeric prefix parses as `0.0`.
pub fn strtod(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let negative = bytes.first() == Some(&b'-');
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    let rest = &bytes[end..];
    for (word, value) in [
        ("infinity", f64::INFINITY),
        ("inf", f64::INFINITY),
        ("nan", f64::NAN),
    ] {
        if rest.len() >= word.len() && rest[..word.len()].eq_ignore_ascii_case(word.as_bytes()) {
            return if negative { -value } else { value };
        }
    }
    if rest.len() > 2 && rest[0] == b'0' && matches!(rest[1], b'x' | b'X') {
        if let Some(value) = hex_float(&rest[2..]) {
            return if negative { -value } else { value };
        }
    }

    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();
    let int_digits = digits(end);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits(end + 1);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return 0.0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        let exponent_digits = digits(exponent);
        if exponent_digits > 0 {
            end = exponent + exponent_digits;
        }
    }
    s[..end].parse().unwrap_or(0.0)
}

/// Value of the hexadecimal digits after `0x`: an integer part, an optional
/// `.` fraction and an optional binary exponent `p[+-]n`. `None` when there
/// are no digits, leaving the `0` as the number.
fn hex_float(bytes: &[u8]) -> Option<f64> {
    let hex_digit = |at: usize| bytes.get(at).and_then(|b| char::from(*b).to_digit(16));
    let mut mantissa = 0.0_f64;
    let mut scale = 0_i32;
    let mut digits = 0;
    let mut end = 0;
    while let Some(digit) = hex_digit(end) {
        mantissa = mantissa * 16.0 + f64::from(digit);
        digits += 1;
        end += 1;
    }
    if bytes.get(end) == Some(&b'.') {
        end += 1;
        while let Some(digit) = hex_digit(end) {
            mantissa = mantissa * 16.0 + f64::from(digit);
            scale = scale.saturating_sub(4);
            digits += 1;
            end += 1;
        }
    }
    if digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'p' | b'P')) {
        let mut at = end + 1;
        let negative = bytes.get(at) == Some(&b'-');
        if matches!(bytes.get(at), Some(b'+' | b'-')) {
            at += 1;
        }
        let exponent = bytes[at.min(bytes.len())..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .fold(None, |acc: Option<i32>, b| {
                Some(acc.unwrap_or(0).saturating_mul(10).saturating_add(i32::from(b - b'0')))
            });
        if let Some(exponent) = exponent {
            scale = if negative {
                scale.saturating_sub(exponent)
            } else {
                scale.saturating_add(exponent)
            };
        }
    }
    Some(scaled(mantissa, scale))
}

/// `mantissa * 2^scale`, applied in steps so large fractions do not
/// underflow before the exponent brings them back.
fn scaled(mut mantissa: f64, mut scale: i32) -> f64 {
    while scale != 0 && mantissa != 0.0 && mantissa.is_finite() {
        let step = scale.clamp(-1000, 1000);
        mantissa *= 2f64.powi(step);
        scale -= step;
    }
    mantissa
}

/// Coordinates from four `strtod` arguments: `lat1 long1 lat2 long2`.
pub fn coordinates(args: &[String; 4]) -> Coordinates {
    let [a_lat, a_long, b_lat, b_long] = args;
    Coordinates::new(strtod(a_lat), strtod(a_long), strtod(b_lat), strtod(b_long))
}

/// Removes `flag` from `args` and returns whether it was present.
pub fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let present = args.iter().any(|arg| arg == flag);
    if present {
        args.retain(|arg| arg != flag);
    }
    present
}

/// Removes `flag <value>` from `args` and returns the value. A flag without a
/// value is an error.
pub fn take_value(args: &mut Vec<String>, flag: &str) -> Result<Option<String>, String> {
    let mut value = None;
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag {
            if i + 1 >= args.len() {
                return Err(format!("{} expects a value", flag));
            }
            value = Some(args.remove(i + 1));
            args.remove(i);
            continue;
        }
        i += 1;
    }
    Ok(value)
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error(transparent)]
    Case(#[from] CaseError),
    #[error(transparent)]
    Contention(#[from] ContentionError),
}

/// What a command line ran.
#[derive(Debug)]
pub enum CommandReport {
    Case(CaseReport),
    Contention(ContentionReport),
}

/// The positional arguments `<mode> <language> <lat1> <long1> <lat2> <long2>`.
/// The mode is checked before the language.
pub fn parse_case(positional: &[String]) -> Result<(ExecMode, BenchmarkCase), UsageError> {
    let [mode, language, a_lat, a_long, b_lat, b_long] = positional else {
        return Err(UsageError::Arguments(format!(
            "expected 6 positional arguments, got {}",
            positional.len()
        )));
    };
    let mode = ExecMode::parse(mode)?;
    let language = Language::from_tag(language)?;
    let coordinates = Coordinates::new(strtod(a_lat), strtod(a_long), strtod(b_lat), strtod(b_long));
    Ok((mode, mode.case(language, coordinates)))
}

/// Runs a command line against `driver`, or a contention run over
/// `callers` threads. Arguments are parsed before the driver creates any
/// runtime, so a usage error leaves its runtimes untouched.
pub fn run_command(
    driver: &mut BenchmarkDriver,
    positional: &[String],
    callers: Option<usize>,
) -> Result<CommandReport, CommandError> {
    let (mode, case) = parse_case(positional)?;
    match callers {
        Some(callers) => {
            let policy = mode.policy().ok_or_else(|| {
                UsageError::Arguments(format!(
                    "--contention needs a guest cache mode (1-3), got {}",
                    mode
                ))
            })?;
            let report = contention::probe(policy, case.language, callers, case.coordinates)?;
            Ok(CommandReport::Contention(report))
        }
        None => Ok(CommandReport::Case(driver.run_case(&case)?)),
    }
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod cli_test;
