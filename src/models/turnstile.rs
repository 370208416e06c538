use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnstileVerdict {
    pub success: bool,
    #[serde(rename = "error-codes", default)]
    pub error_codes: Vec<String>,
    #[serde(default)]
    pub challenge_ts: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

impl TurnstileVerdict {
    pub fn failure_message(&self) -> String {
        if self.error_codes.is_empty() {
            "Security check failed.".to_string()
        } else {
            format!("Security check failed. ({})", self.error_codes.join(","))
        }
    }
}
