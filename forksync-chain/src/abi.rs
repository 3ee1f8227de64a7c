//! Contract interfaces used against the pool and its tokens.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    /// Uniswap V2 style pair. Reserves are `uint112` on chain; they are
    /// decoded through full words, which is ABI-compatible.
    interface IPair {
        function getReserves() external view returns (uint256 reserve0, uint256 reserve1, uint32 blockTimestampLast);
        function sync() external;
        function skim(address to) external;
    }

    interface IERC20 {
        function balanceOf(address account) external view returns (uint256 balance);
        function decimals() external view returns (uint8 value);
        function name() external view returns (string value);
        function symbol() external view returns (string value);
        function approve(address spender, uint256 amount) external returns (bool success);
        function transfer(address to, uint256 amount) external returns (bool success);
    }
}

pub fn get_reserves() -> Bytes {
    IPair::getReservesCall {}.abi_encode().into()
}

pub fn sync() -> Bytes {
    IPair::syncCall {}.abi_encode().into()
}

pub fn skim(to: Address) -> Bytes {
    IPair::skimCall { to }.abi_encode().into()
}

pub fn balance_of(account: Address) -> Bytes {
    IERC20::balanceOfCall { account }.abi_encode().into()
}

pub fn approve(spender: Address, amount: U256) -> Bytes {
    IERC20::approveCall { spender, amount }.abi_encode().into()
}

pub fn transfer(to: Address, amount: U256) -> Bytes {
    IERC20::transferCall { to, amount }.abi_encode().into()
}
