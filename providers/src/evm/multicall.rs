use crate::evm::{ProviderError, ERC20_ABI, MULTICALL_ABI};
use web3::{
    ethabi::{self, Contract, ParamType, Token},
    types::{Address, U256},
};

lazy_static::lazy_static! {
    static ref MULTICALL: Contract =
        Contract::load(MULTICALL_ABI).expect("Multicall3 ABI should be valid");
    static ref ERC20: Contract = Contract::load(ERC20_ABI).expect("ERC20 ABI should be valid");
}

/// One sub-call of a batch. `tag` is the wallet the call is made for, so
/// results can be matched back to it.
#[derive(Clone, Debug)]
pub struct Call {
    pub target: Address,
    pub call_data: Vec<u8>,
    pub tag: Address,
}

pub fn native_balance_call(multicall: Address, user_address: Address) -> Result<Call, ProviderError> {
    let call_data = MULTICALL
        .function("getEthBalance")?
        .encode_input(&[Token::Address(user_address)])?;

    Ok(Call {
        target: multicall,
        call_data,
        tag: user_address,
    })
}

pub fn erc20_balance_call(token_address: Address, user_address: Address) -> Result<Call, ProviderError> {
    let call_data = ERC20
        .function("balanceOf")?
        .encode_input(&[Token::Address(user_address)])?;

    Ok(Call {
        target: token_address,
        call_data,
        tag: user_address,
    })
}

/// Encodes `tryAggregate(false, calls)` so that a failing sub-call does not
/// revert the whole batch.
pub fn try_aggregate(calls: &[Call]) -> Result<Vec<u8>, ProviderError> {
    let calls = calls
        .iter()
        .map(|call| {
            Token::Tuple(vec![
                Token::Address(call.target),
                Token::Bytes(call.call_data.clone()),
            ])
        })
        .collect();

    Ok(MULTICALL
        .function("tryAggregate")?
        .encode_input(&[Token::Bool(false), Token::Array(calls)])?)
}

/// Decodes a `tryAggregate` response into one balance per call, tagged with
/// the call's wallet. Only a malformed envelope fails as a whole.
pub fn parse_try_aggregate(
    calls: &[Call],
    response: &[u8],
) -> Result<Vec<(Address, Result<U256, ProviderError>)>, ProviderError> {
    let results = MULTICALL
        .function("tryAggregate")?
        .decode_output(response)?
        .into_iter()
        .next()
        .and_then(Token::into_array)
        .ok_or_else(|| ProviderError::Response("missing tryAggregate result array".into()))?;

    if results.len() != calls.len() {
        return Err(ProviderError::Response(format!(
            "expected {} results, got {}",
            calls.len(),
            results.len()
        )));
    }

    Ok(calls
        .iter()
        .zip(results)
        .map(|(call, result)| (call.tag, parse_balance(call.tag, result)))
        .collect())
}

fn parse_balance(tag: Address, result: Token) -> Result<U256, ProviderError> {
    let mut fields = match result {
        Token::Tuple(fields) => fields.into_iter(),
        _ => return Err(ProviderError::Decode(tag, "result is not a tuple".into())),
    };

    let success = fields.next().and_then(Token::into_bool);
    let data = fields.next().and_then(Token::into_bytes);

    match (success, data) {
        (Some(true), Some(data)) => ethabi::decode(&[ParamType::Uint(256)], &data)
            .map_err(|e| ProviderError::Decode(tag, e.to_string()))?
            .into_iter()
            .next()
            .and_then(Token::into_uint)
            .ok_or_else(|| ProviderError::Decode(tag, "empty return data".into())),
        (Some(false), _) => Err(ProviderError::CallFailed(tag)),
        _ => Err(ProviderError::Decode(tag, "malformed result tuple".into())),
    }
}
