//! Centralized Contract Definitions
//!
//! All Solidity contract interfaces the solver speaks to, defined using
//! alloy's `sol!` macro. Each interface is annotated with `#[sol(rpc)]` so
//! call sites get a typed contract instance over any alloy `Provider`.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use alloy::sol;

// ── ERC20 ─────────────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);

        event Transfer(address indexed from, address indexed to, uint256 value);
    }
}

// ── Orderbook (v3/v4 wire format order types + quoting + clearing) ────

sol! {
    struct IO {
        address token;
        uint8 decimals;
        uint256 vaultId;
    }

    struct EvaluableV3 {
        address interpreter;
        address store;
        bytes bytecode;
    }

    struct OrderV3 {
        address owner;
        EvaluableV3 evaluable;
        IO[] validInputs;
        IO[] validOutputs;
        bytes32 nonce;
    }

    struct QuoteConfig {
        OrderV3 order;
        uint256 inputIOIndex;
        uint256 outputIOIndex;
        bytes signedContext;
    }

    struct ClearConfig {
        uint256 aliceInputIOIndex;
        uint256 aliceOutputIOIndex;
        uint256 bobInputIOIndex;
        uint256 bobOutputIOIndex;
        uint256 aliceBountyVaultId;
        uint256 bobBountyVaultId;
    }
}

sol! {
    #[sol(rpc)]
    interface IOrderbookV4 {
        function quote(QuoteConfig calldata quoteConfig) external view returns (bool exists, uint256 maxOutput, uint256 ioRatio);
        function quote2(QuoteConfig calldata quoteConfig) external view returns (bool exists, uint256 maxOutput, uint256 ioRatio);

        function clear2(
            OrderV3 calldata alice,
            OrderV3 calldata bob,
            ClearConfig calldata clearConfig,
            bytes calldata aliceSignedContext,
            bytes calldata bobSignedContext
        ) external;

        function clear3(
            OrderV3 calldata alice,
            OrderV3 calldata bob,
            ClearConfig calldata clearConfig,
            bytes calldata aliceSignedContext,
            bytes calldata bobSignedContext,
            bytes calldata externalSwapData
        ) external;

        event TakeOrder(address sender, OrderV3 config, uint256 input, uint256 output);
        event Clear(address sender, OrderV3 alice, OrderV3 bob, ClearConfig clearConfig);
        event AfterClear(address sender, uint256 aliceOutput, uint256 bobOutput, uint256 aliceInput, uint256 bobInput);
    }
}

// ── Deployer (expression parsing) ──────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IExpressionDeployerV3 {
        function parse2(bytes calldata data) external view returns (bytes memory bytecode);
    }
}

// ── Arb contracts (our bot's own on-chain executors) ──────────────────
//
// Orderbook deployments expose one of four arb entrypoints depending on
// their generation; the transaction pipeline (C7) selects which to call
// per the orderbook address it targets.

sol! {
    #[sol(rpc)]
    interface IArbV2 {
        function arb2(address orderbook, bytes calldata takeOrdersConfig, bytes calldata task) external payable;
    }
}

sol! {
    #[sol(rpc)]
    interface IArbV3 {
        function arb3(address orderbook, bytes calldata takeOrdersConfig, bytes calldata task) external payable;
    }
}

sol! {
    #[sol(rpc)]
    interface IArbV4 {
        function arb4(address orderbook, bytes calldata takeOrdersConfig, bytes calldata task) external payable;
    }
}

sol! {
    #[sol(rpc)]
    interface IArbV5 {
        function arb5(address orderbook, bytes calldata takeOrdersConfig, bytes calldata task) external payable;
    }
}

// ── External swap aggregator (the "external router" of C4) ───────────

sol! {
    #[sol(rpc)]
    interface IAggregatorRouter {
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
        function swap(bytes calldata swapData) external payable returns (uint256 amountOut);
    }
}

// ── Arbitrum NodeInterface precompile (L1 gas estimation) ─────────────

sol! {
    #[sol(rpc)]
    interface INodeInterface {
        function gasEstimateL1Component(
            address to,
            bool contractCreation,
            bytes calldata data
        ) external returns (uint64 gasEstimateForL1, uint256 baseFee, uint256 l1BaseFeeEstimate);
    }
}

/// Fixed address of the Arbitrum `NodeInterface` precompile.
pub const NODE_INTERFACE_ADDRESS: &str = "0x00000000000000000000000000000000000000C8";
