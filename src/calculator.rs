use crate::utils::{format_general, DISPLAY_PRECISION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Subtract),
            '*' | '×' | 'x' | 'X' => Some(Operator::Multiply),
            '/' | '÷' => Some(Operator::Divide),
            _ => None,
        }
    }

    /// Dividing by zero yields zero instead of infinity.
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Operator::Add => lhs + rhs,
            Operator::Subtract => lhs - rhs,
            Operator::Multiply => lhs * rhs,
            Operator::Divide => {
                if rhs != 0.0 {
                    lhs / rhs
                } else {
                    0.0
                }
            }
        }
    }
}

/// A single keypad action, decoded from a button label or a typed character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit(char),
    Operator(Operator),
    Equals,
    Clear,
    Backspace,
}

impl Key {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "=" => Some(Key::Equals),
            "C" => Some(Key::Clear),
            "⌫" => Some(Key::Backspace),
            _ => {
                let mut chars = label.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::from_char(c),
                    _ => None,
                }
            }
        }
    }

    /// Maps a key press by keysym name, falling back to the character it types.
    pub fn from_keypress(name: &str, text: Option<char>) -> Option<Self> {
        match name {
            "Return" | "KP_Enter" | "ISO_Enter" => Some(Key::Equals),
            "BackSpace" => Some(Key::Backspace),
            "Escape" | "Delete" => Some(Key::Clear),
            _ => text.and_then(Key::from_char),
        }
    }

    /// Keyboard mapping for typed characters; `c` clears.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0'..='9' | '.' => Some(Key::Digit(c)),
            '=' | '\r' | '\n' => Some(Key::Equals),
            'c' | 'C' => Some(Key::Clear),
            '\u{8}' => Some(Key::Backspace),
            _ => Operator::from_symbol(c).map(Key::Operator),
        }
    }
}

/// Immediate-execution calculator: no precedence, each operator folds the entry into the
/// accumulator. Malformed input never errors, it reads as zero.
#[derive(Debug, Clone, Default)]
pub struct Calculator {
    current: String,
    accumulator: f64,
    pending: Option<Operator>,
    just_evaluated: bool,
}

impl Calculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: Key) {
        match key {
            Key::Digit(c) => self.input_digit(c),
            Key::Operator(op) => self.set_operator(op),
            Key::Equals => {
                self.evaluate();
            }
            Key::Clear => self.clear(),
            Key::Backspace => self.backspace(),
        }
    }

    pub fn clear(&mut self) {
        self.current.clear();
        self.accumulator = 0.0;
        self.pending = None;
        self.just_evaluated = false;
    }

    /// Appends a digit or the decimal point. A digit right after `=` starts a new
    /// computation; a decimal point does not.
    pub fn input_digit(&mut self, token: char) {
        if !token.is_ascii_digit() && token != '.' {
            log::debug!("ignoring non-digit token {:?}", token);
            return;
        }
        if self.just_evaluated && token.is_ascii_digit() {
            self.clear();
        }
        if token == '.' && self.current.contains('.') {
            return;
        }
        self.current.push(token);
    }

    pub fn set_operator(&mut self, op: Operator) {
        if self.current.is_empty() && self.pending.is_some() {
            self.pending = Some(op);
            return;
        }
        self.apply_pending();
        self.pending = Some(op);
        self.just_evaluated = false;
    }

    pub fn evaluate(&mut self) -> f64 {
        self.apply_pending();
        self.pending = None;
        self.just_evaluated = true;
        self.accumulator
    }

    pub fn backspace(&mut self) {
        self.current.pop();
    }

    pub fn display(&self) -> String {
        if !self.current.is_empty() {
            self.current.clone()
        } else {
            format_general(self.accumulator, DISPLAY_PRECISION)
        }
    }

    #[cfg(test)]
    pub fn current_entry(&self) -> &str {
        &self.current
    }

    #[cfg(test)]
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    #[cfg(test)]
    pub fn pending_operator(&self) -> Option<Operator> {
        self.pending
    }

    #[cfg(test)]
    pub fn just_evaluated(&self) -> bool {
        self.just_evaluated
    }

    fn current_value(&self) -> f64 {
        self.current.parse().unwrap_or(0.0)
    }

    fn apply_pending(&mut self) {
        let x = self.current_value();
        self.accumulator = match self.pending {
            Some(op) => op.apply(self.accumulator, x),
            None => x,
        };
        self.current.clear();
    }
}
