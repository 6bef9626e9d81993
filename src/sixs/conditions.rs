//! Tokenizer for the conditions text stream.
//!
//! Values are whitespace separated and may wrap across lines. Once a block has
//! read its values, the rest of the current line is ignored so that the
//! traditional input files can carry trailing comments.

use std::str::FromStr;

use crate::error::SixsError;

#[derive(Debug)]
pub(crate) struct ConditionsReader<'a> {
    /// Every token with its 1-based line number
    tokens: Vec<(usize, &'a str)>,
    /// Index of the next token
    pos: usize,
    /// Line of the most recently consumed token
    line: usize,
}

impl<'a> ConditionsReader<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        let tokens = text
            .lines()
            .enumerate()
            .flat_map(|(i, line)| line.split_whitespace().map(move |tok| (i + 1, tok)))
            .collect();
        Self {
            tokens,
            pos: 0,
            line: 0,
        }
    }

    /// Next raw token.
    pub(crate) fn word(&mut self, what: &str) -> Result<&'a str, SixsError> {
        match self.tokens.get(self.pos) {
            Some(&(line, tok)) => {
                self.pos += 1;
                self.line = line;
                Ok(tok)
            }
            None => Err(SixsError::Parse {
                line: self.line + 1,
                message: format!("missing {what}"),
            }),
        }
    }

    fn parse<T: FromStr>(&mut self, what: &str) -> Result<T, SixsError> {
        let tok = self.word(what)?;
        tok.parse().map_err(|_| SixsError::Parse {
            line: self.line,
            message: format!("expected {what}, found '{tok}'"),
        })
    }

    pub(crate) fn real(&mut self, what: &str) -> Result<f64, SixsError> {
        self.parse(what)
    }

    /// Integer value; a real with no fractional part (e.g. `6.`) is accepted.
    pub(crate) fn int(&mut self, what: &str) -> Result<i32, SixsError> {
        let tok = self.word(what)?;
        if let Ok(v) = tok.parse::<i32>() {
            return Ok(v);
        }
        match tok.parse::<f64>() {
            Ok(v) if v.fract() == 0.0 && v.abs() < i32::MAX as f64 => Ok(v as i32),
            _ => Err(SixsError::Parse {
                line: self.line,
                message: format!("expected {what} (an integer), found '{tok}'"),
            }),
        }
    }

    pub(crate) fn reals<const N: usize>(&mut self, what: &str) -> Result<[f64; N], SixsError> {
        let mut out = [0.; N];
        for v in out.iter_mut() {
            *v = self.real(what)?;
        }
        Ok(out)
    }

    /// Skip the remaining tokens of the current line.
    pub(crate) fn end_line(&mut self) {
        while let Some(&(line, _)) = self.tokens.get(self.pos) {
            if line > self.line {
                break;
            }
            self.pos += 1;
        }
    }

    /// Line number of the most recently consumed token.
    pub(crate) fn line(&self) -> usize {
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_across_lines_and_skips_comments() {
        let mut r = ConditionsReader::new("0 geometry\n30.0 0.0\n 0 0 6 15 (angles)\n7\n");
        assert_eq!(r.int("igeom").unwrap(), 0);
        r.end_line();
        let v: [f64; 6] = r.reals("angles").unwrap();
        assert_eq!(v, [30., 0., 0., 0., 6., 15.]);
        r.end_line();
        assert_eq!(r.int("idatm").unwrap(), 7);
        assert_eq!(r.line(), 4);
    }

    #[test]
    fn integer_with_trailing_point() {
        let mut r = ConditionsReader::new("6.");
        assert_eq!(r.int("idatm").unwrap(), 6);
    }

    #[test]
    fn reports_line_of_bad_value() {
        let mut r = ConditionsReader::new("1\nabc\n");
        r.int("x").unwrap();
        r.end_line();
        match r.real("visibility") {
            Err(SixsError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(r.real("more"), Err(SixsError::Parse { .. })));
    }
}
