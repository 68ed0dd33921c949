use crate::{errors::ConfigError, types::Network};
use serde::Deserialize;
use std::{collections::HashSet, path::Path};

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(alias = "chains")]
    pub networks: Vec<Network>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(raw)?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.networks.is_empty() {
            return Err(ConfigError::NoNetworks);
        }

        let mut names = HashSet::new();

        for network in &self.networks {
            if !names.insert(network.name.as_str()) {
                return Err(ConfigError::DuplicateNetwork(network.name.clone()));
            }

            if network.rpc.trim().is_empty() {
                return Err(ConfigError::MissingRpc(network.name.clone()));
            }

            let mut symbols = HashSet::new();

            if let Some(token) = network.tokens.iter().find(|t| !symbols.insert(t.symbol.as_str())) {
                return Err(ConfigError::DuplicateToken {
                    network: network.name.clone(),
                    symbol: token.symbol.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::Config;
    use crate::errors::ConfigError;

    const CONFIG: &str = r#"
networks:
  - name: Ethereum
    rpc: https://eth.llamarpc.com
    tokens:
      - symbol: ETH
        decimals: 18
      - symbol: USDC
        address: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
        decimals: 6
  - name: BSC
    rpc: https://bsc-dataseed.binance.org
    multicall: "0xcA11bde05977b3631167028862bE2a173976CA11"
    tokens:
      - symbol: BNB
        address: ""
        decimals: 18
"#;

    #[test]
    fn parse_networks_in_order() {
        let config = Config::from_yaml(CONFIG).unwrap();

        assert_eq!(
            config.networks.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(),
            vec!["Ethereum", "BSC"]
        );

        let ethereum = &config.networks[0];
        assert_eq!(ethereum.tokens.len(), 2);
        assert_eq!(ethereum.tokens[0].address, "");
        assert_eq!(ethereum.tokens[1].decimals, 6);
        assert!(ethereum.multicall.is_none());
        assert!(config.networks[1].multicall.is_some());
    }

    #[test]
    fn accept_chains_alias() {
        let config = Config::from_yaml(
            "chains:\n  - name: Polygon\n    rpc: https://polygon-rpc.com\n    tokens: []\n",
        )
        .unwrap();

        assert_eq!(config.networks[0].name, "Polygon");
    }

    #[test]
    fn reject_invalid_configs() {
        assert!(matches!(
            Config::from_yaml("networks: []"),
            Err(ConfigError::NoNetworks)
        ));
        assert!(matches!(
            Config::from_yaml(
                "networks:\n  - {name: A, rpc: http://a}\n  - {name: A, rpc: http://b}\n"
            ),
            Err(ConfigError::DuplicateNetwork(name)) if name == "A"
        ));
        assert!(matches!(
            Config::from_yaml("networks:\n  - {name: A, rpc: ' '}\n"),
            Err(ConfigError::MissingRpc(_))
        ));
        assert!(matches!(
            Config::from_yaml(
                "networks:\n  - name: A\n    rpc: http://a\n    tokens:\n      - {symbol: X, decimals: 1}\n      - {symbol: X, decimals: 2}\n"
            ),
            Err(ConfigError::DuplicateToken { symbol, .. }) if symbol == "X"
        ));
        assert!(matches!(
            Config::from_yaml("networks:\n  - {name: A, rpc: http://a, tokens: [{symbol: X, decimals: -1}]}\n"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
