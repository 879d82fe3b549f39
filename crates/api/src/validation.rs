//! Request body validation producing a list of issues.

use serde::Serialize;
use uuid::Uuid;

/// One invalid field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

/// Collects issues while a request body is converted into a command.
#[derive(Debug, Default)]
pub struct Issues {
    issues: Vec<ValidationIssue>,
}

impl Issues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Non-empty string.
    pub fn text(&mut self, path: &str, value: &str) -> Option<String> {
        if value.trim().is_empty() {
            self.push(path, "Debe tener al menos 1 carácter");
            return None;
        }
        Some(value.to_string())
    }

    /// UUID-shaped identifier.
    pub fn id<T: From<Uuid>>(&mut self, path: &str, value: &str) -> Option<T> {
        self.text(path, value)?;
        match Uuid::parse_str(value.trim()) {
            Ok(uuid) => Some(T::from(uuid)),
            Err(_) => {
                self.push(path, "Identificador inválido");
                None
            }
        }
    }

    /// Required integer greater than zero.
    pub fn positive(&mut self, path: &str, value: Option<i64>) -> Option<u32> {
        match value {
            None => {
                self.push(path, "Requerido");
                None
            }
            Some(v) if v <= 0 => {
                self.push(path, "Debe ser mayor a 0");
                None
            }
            Some(v) => match u32::try_from(v) {
                Ok(v) => Some(v),
                Err(_) => {
                    self.push(path, "Valor demasiado grande");
                    None
                }
            },
        }
    }

    /// Required number.
    pub fn number(&mut self, path: &str, value: Option<f64>) -> Option<f64> {
        if value.is_none() {
            self.push(path, "Requerido");
        }
        value
    }

    /// Parses an enumerated value.
    pub fn parse<T: std::str::FromStr>(&mut self, path: &str, value: &str, expected: &str) -> Option<T> {
        match value.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                self.push(path, format!("Valor inválido, se esperaba {expected}"));
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn into_vec(self) -> Vec<ValidationIssue> {
        self.issues
    }
}
