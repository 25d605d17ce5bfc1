//! Abstract Syntax Tree types for FX expressions

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Literal values that appear directly in expression source
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    /// Both `null` and `undefined` evaluate to JSON null
    Null,
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!x`
    Not,
    /// `-x`
    Neg,
    /// `+x` numeric coercion
    Plus,
}

/// Infix operators, loosest binding last
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    /// `==` loose equality
    Eq,
    /// `!=` loose inequality
    NotEq,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNotEq,
    And,
    Or,
    /// `??`
    Nullish,
}

impl BinaryOp {
    /// Source spelling, used in error messages
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Less => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Nullish => "??",
        }
    }
}

/// A parsed FX expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// Bare name resolved against the evaluation context
    Ident(String),
    Array(Vec<Expr>),
    /// Object literal with keys in source order
    Object(Vec<(String, Expr)>),
    /// `object.property` or `object?.property`
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    /// `object[index]`
    Index { object: Box<Expr>, index: Box<Expr> },
    /// `callee(args)`; only whitelisted callees evaluate
    Call { callee: Box<Expr>, args: Vec<Expr> },
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `cond ? then : otherwise`
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Dotted path of a member chain rooted at an identifier, e.g. `Math.max`
    pub fn dotted_path(&self) -> Option<String> {
        match self {
            Expr::Ident(name) => Some(name.clone()),
            Expr::Member {
                object, property, ..
            } => object
                .dotted_path()
                .map(|base| format!("{}.{}", base, property)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_path() {
        let expr = Expr::Member {
            object: Box::new(Expr::Ident("Math".to_string())),
            property: "max".to_string(),
            optional: false,
        };
        assert_eq!(expr.dotted_path().as_deref(), Some("Math.max"));
    }

    #[test]
    fn test_dotted_path_stops_at_call() {
        let expr = Expr::Member {
            object: Box::new(Expr::Call {
                callee: Box::new(Expr::Ident("f".to_string())),
                args: vec![],
            }),
            property: "x".to_string(),
            optional: false,
        };
        assert_eq!(expr.dotted_path(), None);
    }
}
