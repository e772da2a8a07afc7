use alloy_primitives::Address;
use anyhow::anyhow;
use serde::Deserialize;

/// A token whose decimals are known ahead of time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenEntry {
    pub address: Address,
    pub decimals: u8,
}

/// Load decimals overrides from a JSON `[{"address": "0x..", "decimals": 6}]`
/// array or a TOML `[[tokens]]` list. Accepts absolute or relative path.
pub fn load_token_list<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Vec<TokenEntry>> {
    let text = std::fs::read_to_string(&path)
        .map_err(|e| anyhow!("unable to read token list {}: {}", path.as_ref().display(), e))?;
    parse_token_list(&text)
        .map_err(|e| anyhow!("token list {}: {}", path.as_ref().display(), e))
}

fn parse_token_list(text: &str) -> anyhow::Result<Vec<TokenEntry>> {
    // 1. Try JSON array
    if let Ok(entries) = serde_json::from_str::<Vec<TokenEntry>>(text) {
        return Ok(entries);
    }

    // 2. Try TOML with wrapper
    #[derive(Deserialize)]
    struct Wrapper {
        tokens: Vec<TokenEntry>,
    }
    let wrapper: Wrapper =
        toml::from_str(text).map_err(|e| anyhow!("not valid JSON nor TOML: {}", e))?;
    Ok(wrapper.tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_json_list() {
        let entries = parse_token_list(
            r#"[{"address": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", "decimals": 6}]"#,
        )
        .unwrap();
        assert_eq!(
            entries,
            vec![TokenEntry {
                address: Address::from_str("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48").unwrap(),
                decimals: 6,
            }]
        );
    }

    #[test]
    fn parses_toml_list() {
        let text = r#"
[[tokens]]
address = "0xdAC17F958D2ee523a2206206994597C13D831ec7"
decimals = 6

[[tokens]]
address = "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599"
decimals = 8
"#;
        let entries = parse_token_list(text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].decimals, 8);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_token_list("tokens = 3").is_err());
    }
}
