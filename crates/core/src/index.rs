//! Spectral index formulas.
//!
//! A formula is an arithmetic expression over band aliases, e.g.
//! `"(NIR - RED) / (NIR + RED)"`. An [`IndexDefinition`] binds each alias to a
//! band name of the scene collection (`NIR = B8`, `RED = B4` for Sentinel-2)
//! and names the derived band.
//!
//! The parsed [`BandExpr`] is evaluated per pixel by local sources and lowered
//! into band math by remote ones, so both see the same formula.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default NDVI formula.
pub const NDVI_FORMULA: &str = "(NIR - RED) / (NIR + RED)";

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Band(String),
    Op(char),
    LParen,
    RParen,
}

/// Binary operators supported in formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Add),
            '-' => Some(Self::Subtract),
            '*' => Some(Self::Multiply),
            '/' => Some(Self::Divide),
            _ => None,
        }
    }

    /// Apply to two pixel values. Division by exactly zero yields NaN; tiny
    /// nonzero denominators divide normally.
    pub fn apply(self, l: f64, r: f64) -> f64 {
        match self {
            Self::Add => l + r,
            Self::Subtract => l - r,
            Self::Multiply => l * r,
            Self::Divide => {
                if r == 0.0 {
                    f64::NAN
                } else {
                    l / r
                }
            }
        }
    }
}

/// Parsed formula AST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BandExpr {
    Num(f64),
    Band(String),
    Binary {
        op: BinaryOp,
        left: Box<BandExpr>,
        right: Box<BandExpr>,
    },
    Neg(Box<BandExpr>),
}

impl BandExpr {
    /// Parse a formula string.
    pub fn parse(formula: &str) -> Result<Self> {
        let tokens = tokenize(formula)?;
        let mut parser = Parser {
            formula,
            tokens,
            pos: 0,
        };
        let expr = parser.parse_expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(parser.error(format!(
                "unexpected trailing token {:?}",
                parser.tokens[parser.pos]
            )));
        }
        Ok(expr)
    }

    /// Band aliases referenced by the expression, in first-use order.
    pub fn band_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_bands(&mut names);
        names
    }

    fn collect_bands<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Band(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Self::Binary { left, right, .. } => {
                left.collect_bands(names);
                right.collect_bands(names);
            }
            Self::Neg(inner) => inner.collect_bands(names),
            Self::Num(_) => {}
        }
    }

    /// Evaluate for one pixel. Unbound aliases evaluate to NaN.
    pub fn eval(&self, bands: &HashMap<&str, f64>) -> f64 {
        match self {
            Self::Num(n) => *n,
            Self::Band(name) => bands.get(name.as_str()).copied().unwrap_or(f64::NAN),
            Self::Binary { op, left, right } => op.apply(left.eval(bands), right.eval(bands)),
            Self::Neg(inner) => -inner.eval(bands),
        }
    }
}

fn tokenize(formula: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = formula.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(chars[i]));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let num = text.parse::<f64>().map_err(|_| Error::InvalidFormula {
                    formula: formula.to_string(),
                    reason: format!("invalid number '{}'", text),
                })?;
                tokens.push(Token::Number(num));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Band(chars[start..i].iter().collect()));
            }
            c => {
                return Err(Error::InvalidFormula {
                    formula: formula.to_string(),
                    reason: format!("unexpected character '{}'", c),
                });
            }
        }
    }

    Ok(tokens)
}

/// Recursive descent over `expr = term (('+'|'-') term)*`,
/// `term = factor (('*'|'/') factor)*`.
struct Parser<'a> {
    formula: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: String) -> Error {
        Error::InvalidFormula {
            formula: self.formula.to_string(),
            reason,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_expr(&mut self) -> Result<BandExpr> {
        let mut left = self.parse_term()?;

        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            let op = *op;
            self.advance();
            let right = self.parse_term()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> Result<BandExpr> {
        let mut left = self.parse_factor()?;

        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek() {
            let op = *op;
            self.advance();
            let right = self.parse_factor()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<BandExpr> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(BandExpr::Num(n)),
            Some(Token::Band(name)) => Ok(BandExpr::Band(name)),
            Some(Token::LParen) => {
                let expr = self.parse_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(expr),
                    _ => Err(self.error("expected closing parenthesis".into())),
                }
            }
            Some(Token::Op('-')) => Ok(BandExpr::Neg(Box::new(self.parse_factor()?))),
            Some(Token::Op('+')) => self.parse_factor(),
            Some(other) => Err(self.error(format!("unexpected token {:?}", other))),
            None => Err(self.error("unexpected end of formula".into())),
        }
    }
}

fn binary(op: char, left: BandExpr, right: BandExpr) -> BandExpr {
    BandExpr::Binary {
        // Only operator characters reach here from the parser loops.
        op: BinaryOp::from_char(op).unwrap_or(BinaryOp::Add),
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// A named spectral index: formula plus alias-to-band bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    name: String,
    formula: String,
    expr: BandExpr,
    bindings: Vec<(String, String)>,
}

impl IndexDefinition {
    /// Build an index, checking that every alias in the formula is bound.
    pub fn new(name: &str, formula: &str, bindings: &[(&str, &str)]) -> Result<Self> {
        let expr = BandExpr::parse(formula)?;
        let bindings: Vec<(String, String)> = bindings
            .iter()
            .map(|(alias, band)| (alias.to_string(), band.to_string()))
            .collect();

        for alias in expr.band_names() {
            if !bindings.iter().any(|(a, _)| a == alias) {
                return Err(Error::UnknownBand {
                    name: alias.to_string(),
                    available: bindings
                        .iter()
                        .map(|(a, b)| format!("{}={}", a, b))
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            formula: formula.to_string(),
            expr,
            bindings,
        })
    }

    /// NDVI from the given NIR and red band names.
    pub fn ndvi(nir_band: &str, red_band: &str) -> Self {
        Self {
            name: "NDVI".to_string(),
            formula: NDVI_FORMULA.to_string(),
            expr: BandExpr::Binary {
                op: BinaryOp::Divide,
                left: Box::new(BandExpr::Binary {
                    op: BinaryOp::Subtract,
                    left: Box::new(BandExpr::Band("NIR".into())),
                    right: Box::new(BandExpr::Band("RED".into())),
                }),
                right: Box::new(BandExpr::Binary {
                    op: BinaryOp::Add,
                    left: Box::new(BandExpr::Band("NIR".into())),
                    right: Box::new(BandExpr::Band("RED".into())),
                }),
            },
            bindings: vec![
                ("NIR".to_string(), nir_band.to_string()),
                ("RED".to_string(), red_band.to_string()),
            ],
        }
    }

    /// Name of the derived band.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn expr(&self) -> &BandExpr {
        &self.expr
    }

    /// Collection band bound to an alias.
    pub fn band_for(&self, alias: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, b)| b.as_str())
    }

    /// `(alias, band)` pairs in declaration order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(a, b)| (a.as_str(), b.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn values<'a>(pairs: &[(&'a str, f64)]) -> HashMap<&'a str, f64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn parses_ndvi_like_the_builtin() {
        let parsed = BandExpr::parse(NDVI_FORMULA).unwrap();
        assert_eq!(&parsed, IndexDefinition::ndvi("B8", "B4").expr());
    }

    #[test]
    fn evaluates_with_precedence() {
        let expr = BandExpr::parse("2.5 * (NIR - RED) / (NIR + 6 * RED - 7.5 * BLUE + 1)").unwrap();
        let v = expr.eval(&values(&[("NIR", 0.8), ("RED", 0.2), ("BLUE", 0.1)]));
        assert_relative_eq!(v, 2.5 * 0.6 / (0.8 + 1.2 - 0.75 + 1.0), epsilon = 1e-12);
    }

    #[test]
    fn unary_minus() {
        let expr = BandExpr::parse("-A + 3").unwrap();
        assert_relative_eq!(expr.eval(&values(&[("A", 1.0)])), 2.0);
    }

    #[test]
    fn division_by_zero_is_nan() {
        let expr = BandExpr::parse(NDVI_FORMULA).unwrap();
        assert!(expr.eval(&values(&[("NIR", 0.0), ("RED", 0.0)])).is_nan());
        // Only an exact zero sum is undefined
        let v = expr.eval(&values(&[("NIR", 3e-12), ("RED", 1e-12)]));
        assert_relative_eq!(v, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn band_names_are_deduplicated_in_order() {
        let expr = BandExpr::parse(NDVI_FORMULA).unwrap();
        assert_eq!(expr.band_names(), vec!["NIR", "RED"]);
    }

    #[test]
    fn rejects_malformed_formulas() {
        assert!(BandExpr::parse("(NIR - RED").is_err());
        assert!(BandExpr::parse("NIR $ RED").is_err());
        assert!(BandExpr::parse("NIR RED").is_err());
        assert!(BandExpr::parse("").is_err());
    }

    #[test]
    fn unbound_alias_is_rejected() {
        let err = IndexDefinition::new("X", "(NIR - SWIR) / (NIR + SWIR)", &[("NIR", "B8")])
            .unwrap_err();
        assert!(matches!(err, Error::UnknownBand { ref name, .. } if name == "SWIR"));
    }

    #[test]
    fn ndvi_bindings() {
        let ndvi = IndexDefinition::ndvi("B8", "B4");
        assert_eq!(ndvi.name(), "NDVI");
        assert_eq!(ndvi.band_for("NIR"), Some("B8"));
        assert_eq!(ndvi.band_for("RED"), Some("B4"));
        assert_eq!(ndvi.band_for("SWIR"), None);
    }
}
