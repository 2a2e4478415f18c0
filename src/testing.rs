//! Toy arithmetic compiler shared by unit tests.
//!
//! Grammar: `[sleep:<ms>;]<int> ((+|-|*) <int>)*`, evaluated left to right.
//! The literal source `panic` makes the compiler panic.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::compile::{CompileError, Compiler, Diagnostic};

#[derive(Default)]
pub(crate) struct Arith {
    /// Ignore the cancellation token while sleeping.
    pub(crate) stubborn: bool,
}

pub(crate) struct Parsed {
    delay: Duration,
    terms: Vec<(char, i64)>,
}

impl Compiler for Arith {
    type Parsed = Parsed;
    type Output = i64;

    fn parse(&self, source: &str, _ctx: &CancellationToken) -> Result<Parsed, CompileError> {
        if source == "panic" {
            panic!("arith exploded");
        }
        let (delay, expr) = match source.strip_prefix("sleep:") {
            Some(rest) => {
                let (ms, expr) = rest
                    .split_once(';')
                    .ok_or_else(|| Diagnostic::error("missing ';' after sleep"))?;
                let ms = ms
                    .parse()
                    .map_err(|_| Diagnostic::error("bad sleep duration"))?;
                (Duration::from_millis(ms), expr)
            }
            None => (Duration::ZERO, source),
        };

        let mut terms = Vec::new();
        let mut op = '+';
        let mut digits = String::new();
        for c in expr.chars().filter(|c| !c.is_whitespace()) {
            match c {
                '0'..='9' => digits.push(c),
                '+' | '-' | '*' => {
                    terms.push((op, take_int(&mut digits)?));
                    op = c;
                }
                other => return Err(Diagnostic::error(format!("unexpected '{other}'")).into()),
            }
        }
        terms.push((op, take_int(&mut digits)?));
        Ok(Parsed { delay, terms })
    }

    fn compile(&self, parsed: Parsed, ctx: &CancellationToken) -> Result<i64, CompileError> {
        let until = Instant::now() + parsed.delay;
        while Instant::now() < until {
            if !self.stubborn && ctx.is_cancelled() {
                return Err(CompileError::Canceled);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(parsed.terms.iter().fold(0, |acc, &(op, n)| match op {
            '+' => acc + n,
            '-' => acc - n,
            _ => acc * n,
        }))
    }
}

fn take_int(digits: &mut String) -> Result<i64, CompileError> {
    if digits.is_empty() {
        return Err(Diagnostic::error("unexpected end of expression").into());
    }
    let n = digits
        .parse()
        .map_err(|_| Diagnostic::error("integer literal too large"))?;
    digits.clear();
    Ok(n)
}
