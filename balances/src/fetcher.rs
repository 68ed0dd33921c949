use crate::{
    errors::FetchError,
    types::{Network, Token, Wallet, WalletBalance},
};
use async_trait::async_trait;
use providers::{
    evm::parse_address, units::format_units, Address, BalanceQuerier, Provider, ProviderError,
    MULTICALL3,
};
use std::collections::{HashMap, HashSet};

lazy_static::lazy_static! {
    static ref NATIVE_SYMBOLS: HashSet<&'static str> =
        ["ETH", "MATIC", "POL", "BNB", "AVAX", "FTM", "XDAI", "CELO"].into_iter().collect();
}

/// Native assets are read with `getEthBalance`, everything else with the
/// ERC-20 `balanceOf`. A native token's address, when set, names the contract
/// `getEthBalance` is called on.
pub fn is_native(token: &Token) -> bool {
    token.address.trim().is_empty() || NATIVE_SYMBOLS.contains(token.symbol.to_uppercase().as_str())
}

/// Looks up one token's balance for every wallet in a single batch.
///
/// The returned list follows the order of `wallets`. An `Err` aborts only this
/// (network, token) pair, per-wallet failures are carried inside
/// [`WalletBalance::balance`].
#[async_trait]
pub trait BalanceFetcher: Send + Sync {
    async fn fetch(
        &self,
        network: &Network,
        token: &Token,
        wallets: &[Wallet],
    ) -> Result<Vec<WalletBalance>, FetchError>;
}

pub struct EvmFetcher;

#[async_trait]
impl BalanceFetcher for EvmFetcher {
    async fn fetch(
        &self,
        network: &Network,
        token: &Token,
        wallets: &[Wallet],
    ) -> Result<Vec<WalletBalance>, FetchError> {
        let connection_error = |reason: String| FetchError::Connection {
            endpoint: network.rpc.clone(),
            reason,
        };

        let multicall = match &network.multicall {
            Some(address) => parse_address(address).map_err(|e| connection_error(e.to_string()))?,
            None => *MULTICALL3,
        };

        let provider =
            Provider::connect(&network.rpc, multicall).map_err(|e| connection_error(e.to_string()))?;

        let parsed = wallets
            .iter()
            .map(|w| parse_address(&w.address).map_err(|e| e.to_string()))
            .collect::<Vec<_>>();

        let user_addresses = parsed
            .iter()
            .filter_map(|p| p.as_ref().ok().copied())
            .collect::<Vec<Address>>();

        let token_address = match token.address.trim() {
            "" => None,
            address => Some(parse_address(address).map_err(|e| FetchError::Batch(e.to_string()))?),
        }
        .filter(|address| !address.is_zero());

        let response = match token_address {
            Some(token_address) if !is_native(token) => {
                provider
                    .get_fungible_balances(token_address, &user_addresses)
                    .await
            }
            Some(balance_contract) => {
                provider
                    .with_balance_contract(balance_contract)
                    .get_native_balances(&user_addresses)
                    .await
            }
            None => provider.get_native_balances(&user_addresses).await,
        }
        .map_err(|e| match e {
            ProviderError::Unreachable(reason) => connection_error(reason),
            e => FetchError::Batch(e.to_string()),
        })?;

        let by_tag = response
            .into_iter()
            .map(|(tag, balance)| {
                let balance = balance
                    .map(|raw| format_units(raw, token.decimals))
                    .map_err(|e| e.to_string());

                (tag, balance)
            })
            .collect::<HashMap<Address, Result<String, String>>>();

        Ok(wallets
            .iter()
            .zip(parsed)
            .map(|(wallet, parsed)| {
                let balance = parsed.and_then(|address| {
                    by_tag
                        .get(&address)
                        .cloned()
                        .unwrap_or_else(|| Err("missing from batch response".to_string()))
                });

                WalletBalance {
                    address: wallet.address.clone(),
                    balance: balance.map_err(|reason| FetchError::Decode {
                        address: wallet.address.clone(),
                        reason,
                    }),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::{is_native, BalanceFetcher, EvmFetcher};
    use crate::{
        errors::FetchError,
        types::{Network, Token, Wallet},
    };
    use providers::{Address, MULTICALL3};
    use serde_json::{json, Value};
    use std::{collections::HashMap, str::FromStr};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
        task::JoinHandle,
    };
    use web3::{
        ethabi::{self, ParamType, Token as AbiToken},
        types::{Bytes, U256},
    };

    const USER_1: &str = "0xE43878Ce78934fe8007748FF481f03B8Ee3b97DE";
    const USER_2: &str = "0x14DDFE8EA7FFc338015627D160ccAf99e8F16Dd3";
    const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
    const BALANCE_CONTRACT: &str = "0x2170Ed0880ac9A755fd29B2688956BD959F933F8";

    fn token(symbol: &str, address: &str) -> Token {
        Token {
            symbol: symbol.into(),
            address: address.into(),
            decimals: 18,
        }
    }

    fn network(rpc: &str, multicall: Option<&str>) -> Network {
        Network {
            name: "Test".into(),
            rpc: rpc.into(),
            multicall: multicall.map(Into::into),
            tokens: vec![],
        }
    }

    fn wallets(addresses: &[&str]) -> Vec<Wallet> {
        addresses
            .iter()
            .enumerate()
            .map(|(index, address)| Wallet {
                index,
                address: address.to_string(),
            })
            .collect()
    }

    async fn read_request(socket: &mut TcpStream) -> Value {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let read = socket.read(&mut chunk).await.unwrap();
            assert!(read > 0, "connection closed mid request");
            buf.extend_from_slice(&chunk[..read]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);

                let body = end + 4;
                if buf.len() >= body + length {
                    return serde_json::from_slice(&buf[body..body + length]).unwrap();
                }
            }
        }
    }

    /// Answers a single `tryAggregate` eth_call. Wallets in `balances` get
    /// their amount, every other sub-call reports failure. Resolves to the
    /// (target, wallet) pair of every sub-call that was sent.
    async fn serve_batch(
        balances: HashMap<Address, u64>,
    ) -> (String, JoinHandle<Vec<(Address, Address)>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let rpc = format!("http://{}", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;

            assert_eq!(request["method"], "eth_call");
            assert_eq!(
                request["params"][0]["to"].as_str().unwrap().to_lowercase(),
                format!("{:#x}", *MULTICALL3)
            );

            let data: Bytes = serde_json::from_value(request["params"][0]["data"].clone()).unwrap();
            let decoded = ethabi::decode(
                &[
                    ParamType::Bool,
                    ParamType::Array(Box::new(ParamType::Tuple(vec![
                        ParamType::Address,
                        ParamType::Bytes,
                    ]))),
                ],
                &data.0[4..],
            )
            .unwrap();

            let sub_calls = decoded[1]
                .clone()
                .into_array()
                .unwrap()
                .into_iter()
                .map(|call| match call {
                    AbiToken::Tuple(fields) => {
                        let target = fields[0].clone().into_address().unwrap();
                        let call_data = fields[1].clone().into_bytes().unwrap();
                        (target, Address::from_slice(&call_data[16..36]))
                    }
                    other => panic!("unexpected sub-call {other:?}"),
                })
                .collect::<Vec<_>>();

            let results = sub_calls
                .iter()
                .map(|(_, wallet)| match balances.get(wallet) {
                    Some(amount) => AbiToken::Tuple(vec![
                        AbiToken::Bool(true),
                        AbiToken::Bytes(ethabi::encode(&[AbiToken::Uint(U256::from(*amount))])),
                    ]),
                    None => AbiToken::Tuple(vec![AbiToken::Bool(false), AbiToken::Bytes(vec![])]),
                })
                .collect();

            let body = json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "result": Bytes(ethabi::encode(&[AbiToken::Array(results)])),
            })
            .to_string();

            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            sub_calls
        });

        (rpc, server)
    }

    fn address(address: &str) -> Address {
        Address::from_str(address).unwrap()
    }

    #[test]
    fn native_tokens_by_symbol_or_empty_address() {
        assert!(is_native(&token("ETH", "")));
        assert!(is_native(&token("bnb", "0x0000000000000000000000000000000000000000")));
        assert!(is_native(&token("GLMR", " ")));
        assert!(!is_native(&token("USDC", USDC)));
    }

    #[tokio::test]
    async fn native_batch_is_formatted_per_wallet() {
        let (rpc, server) =
            serve_batch(HashMap::from([(address(USER_1), 1_500_000_000_000_000_000)])).await;

        let results = EvmFetcher
            .fetch(
                &network(&rpc, None),
                &token("ETH", ""),
                &wallets(&[USER_1, USER_2, "0xnot-a-wallet"]),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].address, USER_1);
        assert_eq!(results[0].balance, Ok("1.5".to_string()));
        assert!(matches!(results[1].balance, Err(FetchError::Decode { .. })));
        assert!(matches!(
            &results[2].balance,
            Err(FetchError::Decode { address, .. }) if address == "0xnot-a-wallet"
        ));

        // the invalid wallet never reaches the batch
        let sub_calls = server.await.unwrap();
        assert_eq!(
            sub_calls,
            vec![(*MULTICALL3, address(USER_1)), (*MULTICALL3, address(USER_2))]
        );
    }

    #[tokio::test]
    async fn native_token_address_is_the_balance_contract() {
        let (rpc, server) = serve_batch(HashMap::from([(address(USER_1), 42)])).await;

        let results = EvmFetcher
            .fetch(
                &network(&rpc, None),
                &token("ETH", BALANCE_CONTRACT),
                &wallets(&[USER_1]),
            )
            .await
            .unwrap();

        assert_eq!(results[0].balance, Ok("0.000000000000000042".to_string()));
        assert_eq!(
            server.await.unwrap(),
            vec![(address(BALANCE_CONTRACT), address(USER_1))]
        );
    }

    #[tokio::test]
    async fn erc20_batch_targets_the_token() {
        let (rpc, server) = serve_batch(HashMap::from([
            (address(USER_1), 123_456),
            (address(USER_2), 1_000_000),
        ]))
        .await;

        let usdc = Token {
            decimals: 6,
            ..token("USDC", USDC)
        };
        let results = EvmFetcher
            .fetch(&network(&rpc, None), &usdc, &wallets(&[USER_1, USER_2]))
            .await
            .unwrap();

        assert_eq!(results[0].balance, Ok("0.123456".to_string()));
        assert_eq!(results[1].balance, Ok("1".to_string()));
        assert_eq!(
            server.await.unwrap(),
            vec![(address(USDC), address(USER_1)), (address(USDC), address(USER_2))]
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_task_only() {
        for (rpc, multicall) in [
            ("not a url", None),
            ("http://127.0.0.1:9", Some("0x1234")),
            // nothing listens on the discard port
            ("http://127.0.0.1:9", None),
        ] {
            let result = EvmFetcher
                .fetch(&network(rpc, multicall), &token("ETH", ""), &wallets(&[USER_1]))
                .await;

            assert!(
                matches!(result, Err(FetchError::Connection { .. })),
                "{rpc}: {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn invalid_token_address_fails_batch() {
        let result = EvmFetcher
            .fetch(
                &network("http://127.0.0.1:9", None),
                &token("USDC", "0xnope"),
                &wallets(&[USER_1]),
            )
            .await;

        assert!(matches!(result, Err(FetchError::Batch(_))));
    }
}
