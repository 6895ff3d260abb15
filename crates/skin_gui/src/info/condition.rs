//! Boolean condition parser and evaluator
//!
//! Grammar, from loosest to tightest binding:
//!
//! ```text
//! expr   := and ('|' and)*
//! and    := unary ('+' unary)*
//! unary  := '!' unary | '[' expr ']' | term
//! term   := true | yes | false | no | Function(arg) | Flag.Name
//! ```

use thiserror::Error;

use super::ConditionContext;
use super::ControlFlags;

/// Condition parse errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConditionError {
    /// Expression (or a sub-expression) is empty
    #[error("Empty expression at position {0}")]
    Empty(usize),

    /// A `[` without `]` or the reverse
    #[error("Unbalanced bracket at position {0}")]
    UnbalancedBracket(usize),

    /// Operator where a term was expected, or trailing input
    #[error("Unexpected '{found}' at position {position}")]
    UnexpectedToken {
        /// Byte offset into the expression
        position: usize,
        /// Offending character
        found: char,
    },

    /// Function call with an unknown name
    #[error("Unknown info function: {0}")]
    UnknownFunction(String),

    /// Function argument of the wrong shape
    #[error("Invalid argument '{argument}' for {function}")]
    InvalidArgument {
        /// Function name
        function: String,
        /// Argument text
        argument: String,
    },
}

/// A leaf of a condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoTerm {
    /// Constant
    Literal(bool),
    /// Named flag held by the info manager (lowercased)
    Flag(String),
    /// `Control.IsVisible(id)`
    ControlVisible(i32),
    /// `Control.HasFocus(id)`
    ControlFocused(i32),
    /// `Control.IsSelected(id)`
    ControlSelected(i32),
    /// `Control.IsEnabled(id)`
    ControlEnabled(i32),
    /// `Window.Property(key)`: true when the property is set and truthy
    WindowProperty(String),
    /// `Window.IsActive(id)`
    WindowActive(i32),
}

/// A compiled boolean expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Leaf term
    Term(InfoTerm),
    /// Negation
    Not(Box<Condition>),
    /// Both must hold
    And(Box<Condition>, Box<Condition>),
    /// Either may hold
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// Compile an expression
    pub fn parse(expression: &str) -> Result<Self, ConditionError> {
        let mut parser = Parser {
            chars: expression.char_indices().collect(),
            pos: 0,
            len: expression.len(),
        };
        let condition = parser.parse_or()?;
        parser.skip_whitespace();
        if let Some(&(position, found)) = parser.chars.get(parser.pos) {
            return Err(if found == ']' {
                ConditionError::UnbalancedBracket(position)
            } else {
                ConditionError::UnexpectedToken { position, found }
            });
        }
        Ok(condition)
    }

    /// Condition that is always `value`
    pub fn constant(value: bool) -> Self {
        Self::Term(InfoTerm::Literal(value))
    }

    /// Constant value if the condition never depends on state
    pub fn as_constant(&self) -> Option<bool> {
        match self {
            Self::Term(InfoTerm::Literal(value)) => Some(*value),
            _ => None,
        }
    }

    /// Evaluate against the given state
    pub fn evaluate(&self, ctx: &ConditionContext<'_>) -> bool {
        match self {
            Self::Term(term) => term.evaluate(ctx),
            Self::Not(inner) => !inner.evaluate(ctx),
            Self::And(a, b) => a.evaluate(ctx) && b.evaluate(ctx),
            Self::Or(a, b) => a.evaluate(ctx) || b.evaluate(ctx),
        }
    }
}

impl InfoTerm {
    fn evaluate(&self, ctx: &ConditionContext<'_>) -> bool {
        match self {
            Self::Literal(value) => *value,
            Self::Flag(name) => ctx.info.get_bool(name),
            Self::ControlVisible(id) => ctx.control_flags(*id).contains(ControlFlags::VISIBLE),
            Self::ControlFocused(id) => ctx.control_flags(*id).contains(ControlFlags::FOCUSED),
            Self::ControlSelected(id) => ctx.control_flags(*id).contains(ControlFlags::SELECTED),
            Self::ControlEnabled(id) => ctx.control_flags(*id).contains(ControlFlags::ENABLED),
            Self::WindowProperty(key) => ctx
                .properties
                .is_some_and(|props| props.get(key).as_boolean()),
            Self::WindowActive(id) => ctx.info.is_window_active(*id),
        }
    }

    fn from_text(text: &str) -> Result<Self, ConditionError> {
        let lower = text.to_ascii_lowercase();
        match lower.as_str() {
            "true" | "yes" => return Ok(Self::Literal(true)),
            "false" | "no" => return Ok(Self::Literal(false)),
            _ => {}
        }

        let Some(open) = text.find('(') else {
            return Ok(Self::Flag(lower));
        };
        let function = lower[..open].trim().to_string();
        let argument = text[open + 1..].trim_end().trim_end_matches(')').trim().to_string();

        let id_arg = || {
            argument.parse::<i32>().map_err(|_| ConditionError::InvalidArgument {
                function: function.clone(),
                argument: argument.clone(),
            })
        };

        match function.as_str() {
            "control.isvisible" => Ok(Self::ControlVisible(id_arg()?)),
            "control.hasfocus" => Ok(Self::ControlFocused(id_arg()?)),
            "control.isselected" => Ok(Self::ControlSelected(id_arg()?)),
            "control.isenabled" => Ok(Self::ControlEnabled(id_arg()?)),
            "window.isactive" => Ok(Self::WindowActive(id_arg()?)),
            "window.property" if !argument.is_empty() => Ok(Self::WindowProperty(argument.to_ascii_lowercase())),
            "window.property" => Err(ConditionError::InvalidArgument {
                function: function.clone(),
                argument: argument.clone(),
            }),
            _ => Err(ConditionError::UnknownFunction(function.clone())),
        }
    }
}

struct Parser {
    chars: Vec<(usize, char)>,
    pos: usize,
    len: usize,
}

impl Parser {
    fn offset(&self) -> usize {
        self.chars.get(self.pos).map_or(self.len, |&(offset, _)| offset)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Condition, ConditionError> {
        let mut left = self.parse_and()?;
        while self.eat('|') {
            let right = self.parse_and()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Condition, ConditionError> {
        let mut left = self.parse_unary()?;
        while self.eat('+') {
            let right = self.parse_unary()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Condition, ConditionError> {
        self.skip_whitespace();
        let start = self.offset();
        match self.peek() {
            None => Err(ConditionError::Empty(start)),
            Some('!') => {
                self.pos += 1;
                Ok(Condition::Not(Box::new(self.parse_unary()?)))
            }
            Some('[') => {
                self.pos += 1;
                let inner = self.parse_or()?;
                if self.eat(']') {
                    Ok(inner)
                } else {
                    Err(ConditionError::UnbalancedBracket(start))
                }
            }
            Some(found @ ('+' | '|' | ']')) => Err(ConditionError::UnexpectedToken { position: start, found }),
            Some(_) => self.parse_term(),
        }
    }

    fn parse_term(&mut self) -> Result<Condition, ConditionError> {
        let start = self.offset();
        let mut depth = 0usize;
        let mut text = String::new();

        while let Some(c) = self.peek() {
            match c {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                '+' | '|' | '[' | ']' | '!' if depth == 0 => break,
                _ => {}
            }
            text.push(c);
            self.pos += 1;
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(ConditionError::Empty(start));
        }
        InfoTerm::from_text(text).map(Condition::Term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::{ControlStates, InfoManager, PropertyBag};

    #[test]
    fn test_literals() {
        let info = InfoManager::new();
        let ctx = ConditionContext::global(&info);
        assert!(Condition::parse("true").unwrap().evaluate(&ctx));
        assert!(!Condition::parse("No").unwrap().evaluate(&ctx));
        assert_eq!(Condition::parse("yes").unwrap().as_constant(), Some(true));
    }

    #[test]
    fn test_operator_precedence() {
        let info = InfoManager::new();
        info.set_bool("a", true);
        let ctx = ConditionContext::global(&info);

        // a | b + c  ==  a | (b + c)
        assert!(Condition::parse("a | b + c").unwrap().evaluate(&ctx));
        // [a | b] + c is false because c is unset
        assert!(!Condition::parse("[a | b] + c").unwrap().evaluate(&ctx));
        assert!(Condition::parse("!c + a").unwrap().evaluate(&ctx));
    }

    #[test]
    fn test_control_functions_use_snapshot() {
        let info = InfoManager::new();
        let props = PropertyBag::new();
        let mut controls = ControlStates::new();
        controls.insert(5, ControlFlags::VISIBLE | ControlFlags::SELECTED);
        let ctx = ConditionContext::for_window(&info, &props, &controls);

        assert!(Condition::parse("Control.IsVisible(5)").unwrap().evaluate(&ctx));
        assert!(Condition::parse("Control.IsSelected(5)").unwrap().evaluate(&ctx));
        assert!(!Condition::parse("Control.HasFocus(5)").unwrap().evaluate(&ctx));
        assert!(!Condition::parse("Control.IsVisible(6)").unwrap().evaluate(&ctx));
    }

    #[test]
    fn test_window_property() {
        let info = InfoManager::new();
        let mut props = PropertyBag::new();
        props.set("ShowPanel", "true");
        let controls = ControlStates::new();
        let ctx = ConditionContext::for_window(&info, &props, &controls);

        assert!(Condition::parse("Window.Property(showpanel)").unwrap().evaluate(&ctx));
        assert!(!Condition::parse("Window.Property(other)").unwrap().evaluate(&ctx));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Condition::parse(""), Err(ConditionError::Empty(0)));
        assert!(matches!(Condition::parse("[a + b"), Err(ConditionError::UnbalancedBracket(0))));
        assert!(matches!(Condition::parse("a + b]"), Err(ConditionError::UnbalancedBracket(5))));
        assert!(matches!(
            Condition::parse("+ a"),
            Err(ConditionError::UnexpectedToken { position: 0, found: '+' })
        ));
        assert!(matches!(Condition::parse("Skin.Nope(1)"), Err(ConditionError::UnknownFunction(_))));
        assert!(matches!(
            Condition::parse("Control.IsVisible(abc)"),
            Err(ConditionError::InvalidArgument { .. })
        ));
    }
}
