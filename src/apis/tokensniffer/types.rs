/// TokenSniffer API response types
use serde::{Deserialize, Deserializer, Serialize};

/// Score is an integer in practice but has been seen as a float string
fn deserialize_optional_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s
            .parse::<f64>()
            .map(Some)
            .map_err(|e| Error::custom(format!("Invalid score '{}': {}", s, e))),
        Some(other) => Err(Error::custom(format!("Expected number for score, got: {}", other))),
    }
}

/// `GET /tokens/{chain}/{address}` reply, only the fields the gate needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSnifferReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_score")]
    pub score: Option<f64>,
    #[serde(default)]
    pub is_flagged: Option<bool>,
    #[serde(default, rename = "riskLevel")]
    pub risk_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply() {
        let json = r#"{
            "message": "OK",
            "status": "ready",
            "chainId": "1",
            "address": "0x6b175474e89094c44da98b954eedeac495271d0f",
            "name": "Dai Stablecoin",
            "symbol": "DAI",
            "score": 100,
            "riskLevel": "low",
            "is_flagged": false,
            "tests": []
        }"#;
        let reply: TokenSnifferReply = serde_json::from_str(json).unwrap();
        assert_eq!(reply.score, Some(100.0));
        assert_eq!(reply.is_flagged, Some(false));
        assert_eq!(reply.risk_level.as_deref(), Some("low"));
    }

    #[test]
    fn test_parse_string_score_and_missing_fields() {
        let reply: TokenSnifferReply = serde_json::from_str(r#"{"score": "42.5"}"#).unwrap();
        assert_eq!(reply.score, Some(42.5));
        assert!(reply.status.is_none());

        let reply: TokenSnifferReply = serde_json::from_str(r#"{"score": null}"#).unwrap();
        assert!(reply.score.is_none());
    }
}
