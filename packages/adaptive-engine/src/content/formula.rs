//! Restricted arithmetic over slot values.
//!
//! Accepts numbers, slot names, unary minus, `+ - * / %` and parentheses.
//! Anything else is rejected at parse time, so a formula can never run
//! arbitrary code.

use std::collections::BTreeSet;

use super::error::TemplateError;

const MAX_NESTING: usize = 64;
const MAX_TOKENS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Slot(String),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    root: Expr,
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(invalid(source, "empty formula"));
        }
        if tokens.len() > MAX_TOKENS {
            return Err(invalid(source, "formula too long"));
        }
        let mut parser = Parser {
            source,
            tokens: &tokens,
            pos: 0,
            depth: 0,
        };
        let root = parser.expr()?;
        if parser.pos != tokens.len() {
            return Err(invalid(source, "unexpected trailing input"));
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    pub fn slot_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        collect_slots(&self.root, &mut names);
        names
    }

    pub fn evaluate<F>(&self, lookup: F) -> Result<f64, TemplateError>
    where
        F: Fn(&str) -> Option<f64>,
    {
        let value = eval(&self.root, &lookup)?;
        if !value.is_finite() {
            return Err(TemplateError::Evaluation(format!(
                "`{}` produced a non-finite result",
                self.source
            )));
        }
        Ok(value)
    }
}

fn invalid(source: &str, message: &str) -> TemplateError {
    TemplateError::InvalidFormula {
        formula: source.to_string(),
        message: message.to_string(),
    }
}

fn collect_slots(expr: &Expr, out: &mut BTreeSet<String>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Slot(name) => {
            out.insert(name.clone());
        }
        Expr::Neg(inner) => collect_slots(inner, out),
        Expr::Binary(_, lhs, rhs) => {
            collect_slots(lhs, out);
            collect_slots(rhs, out);
        }
    }
}

fn eval<F>(expr: &Expr, lookup: &F) -> Result<f64, TemplateError>
where
    F: Fn(&str) -> Option<f64>,
{
    match expr {
        Expr::Number(v) => Ok(*v),
        Expr::Slot(name) => lookup(name).ok_or_else(|| TemplateError::UnknownSlot(name.clone())),
        Expr::Neg(inner) => Ok(-eval(inner, lookup)?),
        Expr::Binary(op, lhs, rhs) => {
            let l = eval(lhs, lookup)?;
            let r = eval(rhs, lookup)?;
            match op {
                BinaryOp::Add => Ok(l + r),
                BinaryOp::Sub => Ok(l - r),
                BinaryOp::Mul => Ok(l * r),
                BinaryOp::Div | BinaryOp::Rem if r == 0.0 => {
                    Err(TemplateError::Evaluation("division by zero".to_string()))
                }
                BinaryOp::Div => Ok(l / r),
                BinaryOp::Rem => Ok(l % r),
            }
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, TemplateError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' | '-' | '*' | '/' | '%' => {
                tokens.push(Token::Op(c));
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
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| invalid(source, &format!("bad number `{literal}`")))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(invalid(source, &format!("unexpected character `{other}`"))),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn descend(&mut self) -> Result<(), TemplateError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(invalid(self.source, "formula nested too deeply"));
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, TemplateError> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            let op = if *op == '+' { BinaryOp::Add } else { BinaryOp::Sub };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, TemplateError> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek() {
            let op = match op {
                '*' => BinaryOp::Mul,
                '/' => BinaryOp::Div,
                _ => BinaryOp::Rem,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, TemplateError> {
        if let Some(Token::Op('-')) = self.peek() {
            self.pos += 1;
            self.descend()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, TemplateError> {
        let source = self.source;
        match self.advance().cloned() {
            Some(Token::Number(v)) => Ok(Expr::Number(v)),
            Some(Token::Ident(name)) => Ok(Expr::Slot(name)),
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.expr()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(invalid(source, "unbalanced parentheses")),
                }
            }
            Some(Token::RParen) => Err(invalid(source, "unbalanced parentheses")),
            Some(Token::Op(op)) => Err(invalid(source, &format!("unexpected operator `{op}`"))),
            None => Err(invalid(source, "unexpected end of formula")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn eval_with(formula: &str, vars: &[(&str, f64)]) -> Result<f64, TemplateError> {
        let vars: HashMap<&str, f64> = vars.iter().copied().collect();
        Formula::parse(formula)?.evaluate(|name| vars.get(name).copied())
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval_with("a + b * c", &[("a", 1.0), ("b", 2.0), ("c", 3.0)]), Ok(7.0));
        assert_eq!(eval_with("(a + b) * c", &[("a", 1.0), ("b", 2.0), ("c", 3.0)]), Ok(9.0));
        assert_eq!(eval_with("10 - 4 - 3", &[]), Ok(3.0));
        assert_eq!(eval_with("17 % 5", &[]), Ok(2.0));
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(eval_with("-a + 5", &[("a", 2.0)]), Ok(3.0));
        assert_eq!(eval_with("-(a * 2)", &[("a", 2.0)]), Ok(-4.0));
    }

    #[test]
    fn test_slot_names() {
        let formula = Formula::parse("price * qty - discount").unwrap();
        let names: Vec<String> = formula.slot_names().into_iter().collect();
        assert_eq!(names, vec!["discount", "price", "qty"]);
    }

    #[test]
    fn test_rejects_unsafe_input() {
        assert!(matches!(
            Formula::parse("a; drop"),
            Err(TemplateError::InvalidFormula { .. })
        ));
        assert!(matches!(
            Formula::parse("Math.pow(a, 2)"),
            Err(TemplateError::InvalidFormula { .. })
        ));
        assert!(Formula::parse("").is_err());
        assert!(Formula::parse("(a + b").is_err());
        assert!(Formula::parse("a + b)").is_err());
        assert!(Formula::parse("a b").is_err());
        assert!(Formula::parse("1.2.3").is_err());
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let nested = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(
            Formula::parse(&nested),
            Err(TemplateError::InvalidFormula { .. })
        ));
        let nested = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        match Formula::parse(&nested) {
            Err(TemplateError::InvalidFormula { message, .. }) => {
                assert_eq!(message, "formula nested too deeply")
            }
            other => panic!("expected nesting error, got {other:?}"),
        }
        let negations = format!("{}a", "-".repeat(100));
        assert!(matches!(
            Formula::parse(&negations),
            Err(TemplateError::InvalidFormula { .. })
        ));
        let chain = vec!["1"; 5_000].join(" + ");
        assert!(matches!(
            Formula::parse(&chain),
            Err(TemplateError::InvalidFormula { .. })
        ));
    }

    #[test]
    fn test_moderate_nesting_accepted() {
        let nested = format!("{}a{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(eval_with(&nested, &[("a", 4.0)]), Ok(4.0));
        assert_eq!(eval_with("--a", &[("a", 4.0)]), Ok(4.0));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(
            eval_with("a / b", &[("a", 1.0), ("b", 0.0)]),
            Err(TemplateError::Evaluation(_))
        ));
    }

    #[test]
    fn test_unknown_slot() {
        assert_eq!(
            eval_with("a + z", &[("a", 1.0)]),
            Err(TemplateError::UnknownSlot("z".to_string()))
        );
    }
}
