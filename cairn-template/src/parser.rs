//! Label template parser
//!
//! A template is the body of a double-quoted string: literal text mixed with
//! `${...}` interpolations (and the short `$env.NAME` form). Parsing happens
//! once per render and reports every malformed construct as
//! [`ExpressionError::Syntax`] with the byte offset where it starts.
//!
//! Expression grammar inside `${...}`:
//!
//! ```text
//! expr    := concat ( '?:' concat )*
//! concat  := postfix ( '+' postfix )*
//! postfix := primary ( '[' expr ']' | '.' ident | '.' ident '(' args ')' )*
//! primary := string | number | ident | ident '(' args ')' | '(' expr ')'
//! ```

use crate::error::{ExpressionError, Result};
use crate::function::FunctionRegistry;

/// Deepest expression tree a template may build; every nested group,
/// argument list, operator and postfix link counts one level
pub const MAX_NESTING: usize = 64;

/// A parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the template has no interpolation at all
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Text(_)))
    }
}

/// Part of a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Expr(Expr),
}

/// One of the two maps a template can read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Env,
    Sys,
}

impl Binding {
    pub fn name(&self) -> &'static str {
        match self {
            Binding::Env => "env",
            Binding::Sys => "sys",
        }
    }
}

/// Interpolation expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// `${}`
    Empty,
    Str(String),
    Binding(Binding),
    /// `target[key]` or `target.key`
    Index {
        target: Box<Expr>,
        key: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Concat(Box<Expr>, Box<Expr>),
    /// `value ?: fallback`
    Elvis(Box<Expr>, Box<Expr>),
}

/// Parses `source` into a [`Template`]
///
/// Function names are checked against `functions`, so calling an unknown
/// helper is reported before anything is rendered.
///
/// # Example
/// ```
/// use cairn_template::functions::builtin_registry;
/// use cairn_template::parse_template;
///
/// let registry = builtin_registry();
/// let template = parse_template("${env['JOB_NAME']}-${date('yyyy')}", &registry)?;
/// assert_eq!(template.segments().len(), 3);
///
/// assert!(parse_template("unbalanced\"", &registry).is_err());
/// # Ok::<(), cairn_template::ExpressionError>(())
/// ```
pub fn parse_template(source: &str, functions: &FunctionRegistry) -> Result<Template> {
    Parser {
        src: source,
        pos: 0,
        depth: 0,
        functions,
    }
    .parse_template()
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
    functions: &'a FunctionRegistry,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ExpressionError::syntax(
                self.pos,
                "expression nested too deeply",
            ));
        }
        Ok(())
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn parse_template(mut self) -> Result<Template> {
        let mut segments = Vec::new();
        let mut text = String::new();

        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    let start = self.pos;
                    self.bump();
                    text.push(self.parse_escape(start)?);
                }
                '"' => {
                    return Err(ExpressionError::syntax(
                        self.pos,
                        "unbalanced quote: an unescaped '\"' ends the label string early",
                    ));
                }
                '$' if self.peek_nth(1) == Some('{') => {
                    flush_text(&mut text, &mut segments);
                    segments.push(Segment::Expr(self.parse_interpolation()?));
                }
                '$' if self.peek_nth(1).is_some_and(is_ident_start) => {
                    flush_text(&mut text, &mut segments);
                    segments.push(Segment::Expr(self.parse_short_interpolation()?));
                }
                _ => {
                    text.push(c);
                    self.bump();
                }
            }
        }

        flush_text(&mut text, &mut segments);
        Ok(Template { segments })
    }

    /// `${ expr }`
    fn parse_interpolation(&mut self) -> Result<Expr> {
        let start = self.pos;
        self.bump();
        self.bump();
        self.skip_ws();

        let expr = if self.peek() == Some('}') {
            Expr::Empty
        } else {
            self.parse_expr()?
        };

        self.skip_ws();
        match self.peek() {
            Some('}') => {
                self.bump();
                Ok(expr)
            }
            Some(other) => Err(ExpressionError::syntax(
                self.pos,
                format!("unexpected '{}' inside interpolation", other),
            )),
            None => Err(ExpressionError::syntax(
                start,
                "unbalanced brace: '${' is never closed",
            )),
        }
    }

    /// `$name` or `$name.key.key`
    fn parse_short_interpolation(&mut self) -> Result<Expr> {
        self.bump();
        let start = self.pos;
        let name = self.parse_ident();
        let mut expr = self.binding(&name, start)?;

        let depth = self.depth;
        while self.peek() == Some('.') && self.peek_nth(1).is_some_and(is_ident_start) {
            self.descend()?;
            self.bump();
            let key = self.parse_ident();
            expr = Expr::Index {
                target: Box::new(expr),
                key: Box::new(Expr::Str(key)),
            };
        }

        self.depth = depth;
        Ok(expr)
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let depth = self.depth;
        self.descend()?;
        let mut left = self.parse_concat()?;

        loop {
            self.skip_ws();
            if self.peek() == Some('?') && self.peek_nth(1) == Some(':') {
                self.descend()?;
                self.bump();
                self.bump();
                let right = self.parse_concat()?;
                left = Expr::Elvis(Box::new(left), Box::new(right));
            } else {
                self.depth = depth;
                return Ok(left);
            }
        }
    }

    fn parse_concat(&mut self) -> Result<Expr> {
        let depth = self.depth;
        let mut left = self.parse_postfix()?;

        loop {
            self.skip_ws();
            if self.peek() == Some('+') {
                self.descend()?;
                self.bump();
                let right = self.parse_postfix()?;
                left = Expr::Concat(Box::new(left), Box::new(right));
            } else {
                self.depth = depth;
                return Ok(left);
            }
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let depth = self.depth;
        let mut expr = self.parse_primary()?;

        loop {
            self.skip_ws();
            match self.peek() {
                Some('[') => {
                    self.descend()?;
                    let start = self.pos;
                    self.bump();
                    self.skip_ws();
                    let key = self.parse_expr()?;
                    self.expect(']', start, "unbalanced bracket: '[' is never closed")?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        key: Box::new(key),
                    };
                }
                Some('.') => {
                    self.descend()?;
                    self.bump();
                    self.skip_ws();
                    let start = self.pos;
                    if !self.peek().is_some_and(is_ident_start) {
                        return Err(ExpressionError::syntax(start, "expected a name after '.'"));
                    }
                    let name = self.parse_ident();
                    self.skip_ws();
                    if self.peek() == Some('(') {
                        self.check_function(&name, start)?;
                        let mut args = vec![expr];
                        args.extend(self.parse_args()?);
                        expr = Expr::Call { name, args };
                    } else {
                        expr = Expr::Index {
                            target: Box::new(expr),
                            key: Box::new(Expr::Str(name)),
                        };
                    }
                }
                _ => {
                    self.depth = depth;
                    return Ok(expr);
                }
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        self.skip_ws();
        let start = self.pos;

        match self.peek() {
            Some(quote @ ('\'' | '"')) => Ok(Expr::Str(self.parse_string(quote)?)),
            Some(c) if c.is_ascii_digit() => {
                let mut number = String::new();
                while let Some(d) = self.peek().filter(|d| d.is_ascii_digit()) {
                    number.push(d);
                    self.bump();
                }
                Ok(Expr::Str(number))
            }
            Some('(') => {
                self.bump();
                let expr = self.parse_expr()?;
                self.expect(')', start, "unbalanced parenthesis: '(' is never closed")?;
                Ok(expr)
            }
            Some(c) if is_ident_start(c) => {
                let name = self.parse_ident();
                self.skip_ws();
                if self.peek() == Some('(') {
                    self.check_function(&name, start)?;
                    let args = self.parse_args()?;
                    Ok(Expr::Call { name, args })
                } else {
                    self.binding(&name, start)
                }
            }
            Some(other) => Err(ExpressionError::syntax(
                start,
                format!("unexpected '{}' in expression", other),
            )),
            None => Err(ExpressionError::syntax(
                start,
                "unexpected end of template inside an expression",
            )),
        }
    }

    /// `( expr, expr, ... )`
    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        self.descend()?;
        let start = self.pos;
        self.bump();
        self.skip_ws();

        let mut args = Vec::new();
        if self.peek() == Some(')') {
            self.bump();
            self.depth -= 1;
            return Ok(args);
        }

        loop {
            args.push(self.parse_expr()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(')') => {
                    self.depth -= 1;
                    return Ok(args);
                }
                Some(other) => {
                    return Err(ExpressionError::syntax(
                        self.pos - other.len_utf8(),
                        format!("expected ',' or ')' but found '{}'", other),
                    ));
                }
                None => {
                    return Err(ExpressionError::syntax(
                        start,
                        "unbalanced parenthesis: '(' is never closed",
                    ));
                }
            }
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String> {
        let start = self.pos;
        self.bump();

        let mut value = String::new();
        loop {
            let escape_start = self.pos;
            match self.bump() {
                None => {
                    return Err(ExpressionError::syntax(
                        start,
                        "unbalanced quote: string literal is never closed",
                    ));
                }
                Some(c) if c == quote => return Ok(value),
                Some('\\') => value.push(self.parse_escape(escape_start)?),
                Some(c) => value.push(c),
            }
        }
    }

    /// Called after the backslash has been consumed
    fn parse_escape(&mut self, start: usize) -> Result<char> {
        match self.bump() {
            Some('"') => Ok('"'),
            Some('\'') => Ok('\''),
            Some('\\') => Ok('\\'),
            Some('$') => Ok('$'),
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some(other) => Err(ExpressionError::syntax(
                start,
                format!("unsupported escape sequence '\\{}'", other),
            )),
            None => Err(ExpressionError::syntax(
                start,
                "unbalanced quote: trailing backslash escapes the closing quote",
            )),
        }
    }

    fn parse_ident(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek().filter(|c| is_ident_char(*c)) {
            name.push(c);
            self.bump();
        }
        name
    }

    fn expect(&mut self, expected: char, open_pos: usize, unclosed: &str) -> Result<()> {
        self.skip_ws();
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(other) => Err(ExpressionError::syntax(
                self.pos,
                format!("expected '{}' but found '{}'", expected, other),
            )),
            None => Err(ExpressionError::syntax(open_pos, unclosed)),
        }
    }

    fn binding(&self, name: &str, start: usize) -> Result<Expr> {
        match name {
            "env" => Ok(Expr::Binding(Binding::Env)),
            "sys" => Ok(Expr::Binding(Binding::Sys)),
            other => Err(ExpressionError::syntax(
                start,
                format!(
                    "unknown variable '{}': only 'env' and 'sys' are available",
                    other
                ),
            )),
        }
    }

    fn check_function(&self, name: &str, start: usize) -> Result<()> {
        if self.functions.contains(name) {
            Ok(())
        } else {
            Err(ExpressionError::syntax(
                start,
                format!("unknown function '{}'", name),
            ))
        }
    }
}

fn flush_text(text: &mut String, segments: &mut Vec<Segment>) {
    if !text.is_empty() {
        segments.push(Segment::Text(std::mem::take(text)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::builtin_registry;

    fn parse(source: &str) -> Result<Template> {
        parse_template(source, &builtin_registry())
    }

    fn env_lookup(key: &str) -> Expr {
        Expr::Index {
            target: Box::new(Expr::Binding(Binding::Env)),
            key: Box::new(Expr::Str(key.to_string())),
        }
    }

    fn syntax_position(result: Result<Template>) -> usize {
        match result {
            Err(ExpressionError::Syntax { position, .. }) => position,
            other => panic!("expected a syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_literal_template() {
        let template = parse("release candidate").unwrap();
        assert!(template.is_literal());
        assert_eq!(
            template.segments(),
            &[Segment::Text("release candidate".to_string())]
        );
    }

    #[test]
    fn test_empty_template() {
        assert!(parse("").unwrap().segments().is_empty());
    }

    #[test]
    fn test_interpolations() {
        let template = parse("${env['JOB_NAME']}-${env[\"BUILD_NUMBER\"]}").unwrap();
        assert_eq!(
            template.segments(),
            &[
                Segment::Expr(env_lookup("JOB_NAME")),
                Segment::Text("-".to_string()),
                Segment::Expr(env_lookup("BUILD_NUMBER")),
            ]
        );
    }

    #[test]
    fn test_property_and_short_forms() {
        let dotted = parse("${env.JOB_NAME}").unwrap();
        let short = parse("$env.JOB_NAME").unwrap();
        assert_eq!(dotted.segments(), &[Segment::Expr(env_lookup("JOB_NAME"))]);
        assert_eq!(dotted, short);
    }

    #[test]
    fn test_lone_dollar_is_text() {
        let template = parse("cost $5").unwrap();
        assert_eq!(template.segments(), &[Segment::Text("cost $5".to_string())]);
    }

    #[test]
    fn test_calls_and_methods() {
        let template = parse("${date('yyyy')}${env['A'].upper()}").unwrap();
        assert_eq!(
            template.segments(),
            &[
                Segment::Expr(Expr::Call {
                    name: "date".to_string(),
                    args: vec![Expr::Str("yyyy".to_string())],
                }),
                Segment::Expr(Expr::Call {
                    name: "upper".to_string(),
                    args: vec![env_lookup("A")],
                }),
            ]
        );
    }

    #[test]
    fn test_operator_precedence() {
        // `+` binds tighter than `?:`
        let template = parse("${env['A'] ?: 'x' + 'y'}").unwrap();
        assert_eq!(
            template.segments(),
            &[Segment::Expr(Expr::Elvis(
                Box::new(env_lookup("A")),
                Box::new(Expr::Concat(
                    Box::new(Expr::Str("x".to_string())),
                    Box::new(Expr::Str("y".to_string())),
                )),
            ))]
        );
    }

    #[test]
    fn test_escapes() {
        let template = parse(r#"a\"b\$c\\d"#).unwrap();
        assert_eq!(template.segments(), &[Segment::Text("a\"b$c\\d".to_string())]);
    }

    #[test]
    fn test_empty_interpolation() {
        let template = parse("a${}b").unwrap();
        assert_eq!(template.segments()[1], Segment::Expr(Expr::Empty));
    }

    #[test]
    fn test_unbalanced_quote() {
        assert_eq!(syntax_position(parse("unbalanced\"")), 10);
    }

    #[test]
    fn test_trailing_backslash() {
        assert_eq!(syntax_position(parse("abc\\")), 3);
    }

    #[test]
    fn test_unclosed_brace() {
        assert_eq!(syntax_position(parse("x-${env['A']")), 2);
    }

    #[test]
    fn test_unclosed_bracket() {
        assert!(parse("${env['A'}").is_err());
        assert_eq!(syntax_position(parse("${env['A'")), 5);
    }

    #[test]
    fn test_unclosed_string() {
        assert_eq!(syntax_position(parse("${env['A]}")), 6);
    }

    #[test]
    fn test_unclosed_parenthesis() {
        assert!(parse("${date('yyyy'}").is_err());
        assert!(parse("${(env['A']}").is_err());
    }

    #[test]
    fn test_unknown_variable() {
        let err = parse("${project.name}").unwrap_err();
        assert!(err.is_syntax());
        assert!(err.to_string().contains("unknown variable 'project'"));
    }

    #[test]
    fn test_unknown_function() {
        let err = parse("${exec('rm -rf /')}").unwrap_err();
        assert!(err.to_string().contains("unknown function 'exec'"));

        let err = parse("${env['A'].execute()}").unwrap_err();
        assert!(err.to_string().contains("unknown function 'execute'"));
    }

    #[test]
    fn test_unsupported_escape() {
        assert!(parse(r"a\qb").is_err());
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let source = format!("${{{}'a'{}}}", "(".repeat(2000), ")".repeat(2000));
        let err = parse(&source).unwrap_err();
        assert!(err.is_syntax());
        assert!(err.to_string().contains("nested too deeply"));

        let source = format!("${{{}'a'}}", "'a' + ".repeat(5000));
        assert!(parse(&source).unwrap_err().to_string().contains("nested too deeply"));

        let source = format!("${{env{}}}", "['a']".repeat(5000));
        assert!(parse(&source).is_err());

        let source = format!("${{{}'a'{}}}", "upper(".repeat(2000), ")".repeat(2000));
        assert!(parse(&source).is_err());
    }

    #[test]
    fn test_moderate_nesting_is_accepted() {
        let source = format!("${{{}'a'{}}}", "(".repeat(10), ")".repeat(10));
        assert_eq!(
            parse(&source).unwrap().segments(),
            &[Segment::Expr(Expr::Str("a".to_string()))]
        );

        // depth is released between sibling groups
        let source = format!("${{{}}}", vec!["(('a'))"; 40].join(" + "));
        assert!(parse(&source).is_ok());
    }

    #[test]
    fn test_dangling_operator() {
        assert!(parse("${env['A'] +}").is_err());
        assert!(parse("${env['A'] ?}").is_err());
    }
}
