use serde::Serialize;
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
}

/// Result of one check: the printed messages plus an optional diagnostic payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub check: String,
    pub outcome: Outcome,
    pub messages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl Verdict {
    /// Starts a passing verdict; any `fail` flips it.
    pub fn new(check: &str) -> Self {
        Verdict {
            check: check.to_string(),
            outcome: Outcome::Pass,
            messages: Vec::new(),
            details: None,
        }
    }

    pub fn say(&mut self, message: impl Into<String>) -> &mut Self {
        self.messages.push(message.into());
        self
    }

    pub fn fail(&mut self, message: impl Into<String>) -> &mut Self {
        self.outcome = Outcome::Fail;
        self.say(message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Pass
    }

    /// Logs the final outcome and hands the verdict back.
    pub fn finish(self) -> Self {
        info!(check = %self.check, outcome = ?self.outcome, "{}", self.messages.last().map_or("", String::as_str));
        self
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, message) in self.messages.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_is_sticky() {
        let mut v = Verdict::new("4a");
        v.fail("El circuito 0 de Alice no es correcto");
        v.say("otra linea");
        assert!(!v.passed());
        assert_eq!(v.to_string(), "El circuito 0 de Alice no es correcto\notra linea");
    }

    #[test]
    fn serializes_lowercase_outcome() {
        let mut v = Verdict::new("9b");
        v.say("Felicidades, tu circuito tiene 32 cx");
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["outcome"], "pass");
        assert!(json.get("details").is_none());
    }
}
