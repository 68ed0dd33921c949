use crate::{
    evm::{
        multicall::{self, erc20_balance_call, native_balance_call, Call},
        ProviderError,
    },
    BalanceQuerier, Tagged,
};
use async_trait::async_trait;
use web3::{
    transports::Http,
    types::{Address, Bytes, CallRequest, U256},
    Web3,
};

/// An HTTP session to one EVM endpoint, batching reads through a Multicall3
/// deployment.
pub struct Provider {
    single: Web3<Http>,
    multicall: Address,
    balance_contract: Address,
}

impl Provider {
    pub fn connect(rpc_url: &str, multicall: Address) -> Result<Self, ProviderError> {
        let transport = Http::new(rpc_url)?;

        Ok(Self {
            single: Web3::new(transport),
            multicall,
            balance_contract: multicall,
        })
    }

    /// Contract native balances are read from with `getEthBalance`, the
    /// multicall deployment itself unless set.
    pub fn with_balance_contract(mut self, address: Address) -> Self {
        self.balance_contract = address;
        self
    }

    async fn aggregate(
        &self,
        calls: Vec<Call>,
    ) -> Result<Vec<Tagged<Address, U256, ProviderError>>, ProviderError> {
        if calls.is_empty() {
            return Ok(vec![]);
        }

        let request = CallRequest {
            to: Some(self.multicall),
            data: Some(Bytes(multicall::try_aggregate(&calls)?)),
            ..Default::default()
        };

        log::debug!(
            "sending {} sub-calls through multicall {:#x}",
            calls.len(),
            self.multicall
        );

        let response = self
            .single
            .eth()
            .call(request, None)
            .await
            .map_err(|e| match e {
                e @ web3::Error::Transport(_) => ProviderError::Unreachable(e.to_string()),
                e => e.into(),
            })?;

        multicall::parse_try_aggregate(&calls, &response.0)
    }
}

#[async_trait]
impl BalanceQuerier for Provider {
    type Address = Address;
    type Balance = U256;
    type Error = ProviderError;

    async fn get_native_balances(
        &self,
        user_addresses: &[Self::Address],
    ) -> Result<Vec<Tagged<Self::Address, Self::Balance, Self::Error>>, Self::Error> {
        let calls = user_addresses
            .iter()
            .map(|ua| native_balance_call(self.balance_contract, *ua))
            .collect::<Result<Vec<Call>, ProviderError>>()?;

        self.aggregate(calls).await
    }

    async fn get_fungible_balances(
        &self,
        token_address: Self::Address,
        user_addresses: &[Self::Address],
    ) -> Result<Vec<Tagged<Self::Address, Self::Balance, Self::Error>>, Self::Error> {
        let calls = user_addresses
            .iter()
            .map(|ua| erc20_balance_call(token_address, *ua))
            .collect::<Result<Vec<Call>, ProviderError>>()?;

        self.aggregate(calls).await
    }
}
