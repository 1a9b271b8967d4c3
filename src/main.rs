//! Risk core simulation.
//!
//! Wires both feed kinds to in-memory venues, then walks positions through
//! build, funding drift, partial unwind and liquidation on the ledger.
//! Set RUST_LOG=debug to see the feed and ledger traces.

use perps_risk_core::config::{ConstantProductFeedConfig, FeedAssets, WeightedFeedConfig, WindowConfig};
use perps_risk_core::feed::mock::{MockConstantProductVenue, MockWeightedVenue};
use perps_risk_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

type SimResult = Result<(), Box<dyn std::error::Error>>;

fn main() -> SimResult {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Perpetuals Risk Core Simulation");
    println!("Pooled Open Interest, Solvency-First Rounding\n");

    let config = Environment::Development.config();
    config.validate()?;
    let params = RiskParams::try_from(&config.risk)?;

    scenario_1_weighted_feed(config.windows, &params)?;
    scenario_2_constant_product_feed(config.windows)?;
    scenario_3_position_lifecycle(&params)?;
    scenario_4_funding_drift(&params)?;
    scenario_5_liquidation(&params)?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn fp(value: Decimal) -> Result<FixedPoint, MathError> {
    FixedPoint::from_decimal(value)
}

fn token(n: u64) -> Address {
    Address::from_low_u64(n)
}

// ETH/DAI market, ETH as bridge, OVL settlement
fn assets() -> FeedAssets {
    FeedAssets {
        market_pool: token(0x100),
        settlement_bridge_pool: token(0x200),
        market_base_token: token(0xe7),
        market_quote_token: token(0xda1),
        bridge_token: token(0xe7),
        settlement_token: token(0x0f1),
    }
}

/// Weighted pool snapshot and drift validity.
fn scenario_1_weighted_feed(windows: WindowConfig, params: &RiskParams) -> SimResult {
    println!("Scenario 1: Weighted Pool Feed\n");

    let a = assets();
    let mut venue = MockWeightedVenue::new();
    venue.add_pool(a.market_pool, [a.bridge_token, a.market_quote_token], vec![fp(dec!(0.5))?, fp(dec!(0.5))?]);
    venue.add_pool(a.settlement_bridge_pool, [a.settlement_token, a.bridge_token], vec![fp(dec!(0.8))?, fp(dec!(0.2))?]);
    venue.set_pair_price(a.market_pool, windows.micro_window, 0, fp(dec!(2569.09))?);
    venue.set_pair_price(a.market_pool, windows.macro_window, 0, fp(dec!(2562.68))?);
    venue.set_pair_price(a.market_pool, windows.macro_window, windows.macro_window, fp(dec!(2565.50))?);
    // 1000 ETH against 2,569,090 DAI
    venue.set_invariant(a.market_pool, windows.micro_window, 0, fp(dec!(50686.191019))?);
    venue.set_pair_price(a.settlement_bridge_pool, windows.micro_window, 0, fp(dec!(0.001))?);

    let feed = WeightedPoolFeed::new(&venue, WeightedFeedConfig { windows, assets: a })?;
    let data = feed.latest(Timestamp::now())?;

    println!("  Price over micro window: {}", data.price_over_micro_window);
    println!("  Price over macro window: {}", data.price_over_macro_window);
    println!("  Price one macro window ago: {}", data.price_one_macro_window_ago);
    println!("  Reserve over micro window: {} OVL", data.reserve_over_micro_window);
    println!("  Mid price: {}", data.mid_price()?);
    println!("  Data valid: {}", data.data_is_valid(params.price_drift_upper_limit)?);
    println!("  Front-run bound: {} OVL", data.front_run_bound(params.lmbda)?);
    println!("  Back-run bound: {} OVL", data.back_run_bound(params.delta, params.average_block_time)?);
    // 1.2x the mint target already minted: breaker trims the cap to 80%
    let minted = params.circuit_breaker_mint_target.mul_down(fp(dec!(1.2))?)?;
    println!("  Circuit breaker cap: {} OVL", params.circuit_breaker(minted, params.cap_notional)?);
    println!("  OI cap: {}\n", params.cap_oi(&data, minted)?);

    Ok(())
}

/// Constant-product pool snapshot from ticks and liquidity.
fn scenario_2_constant_product_feed(windows: WindowConfig) -> SimResult {
    println!("Scenario 2: Constant Product Feed\n");

    let a = assets();
    let mut venue = MockConstantProductVenue::new();
    venue.add_pool(a.market_pool, [a.bridge_token, a.market_quote_token], 600);
    venue.add_pool(a.settlement_bridge_pool, [a.settlement_token, a.bridge_token], 600);
    venue.set_tick(a.market_pool, windows.micro_window, 0, 78_500);
    venue.set_tick(a.market_pool, windows.macro_window, 0, 78_470);
    venue.set_tick(a.market_pool, windows.macro_window, windows.macro_window, 78_480);
    venue.set_liquidity(a.market_pool, windows.micro_window, 0, 50_000 * 10u128.pow(18));
    venue.set_tick(a.settlement_bridge_pool, windows.micro_window, 0, -69_082);

    let config = ConstantProductFeedConfig {
        windows,
        assets: a,
        min_cardinality: 600,
        average_block_time: 12,
    };
    println!("  Required cardinality: {}", config.required_cardinality()?);

    let feed = ConstantProductFeed::new(&venue, config)?;
    let data = feed.latest(Timestamp::now())?;

    println!("  Price over micro window: {}", data.price_over_micro_window);
    println!("  Price over macro window: {}", data.price_over_macro_window);
    println!("  Reserve over micro window: {} OVL\n", data.reserve_over_micro_window);

    Ok(())
}

/// Build, value and partially unwind a long and a short.
fn scenario_3_position_lifecycle(params: &RiskParams) -> SimResult {
    println!("Scenario 3: Position Lifecycle\n");

    let mut ledger = PositionLedger::new();
    let alice = token(0xa11ce);
    let bob = token(0xb0b);
    let entry = fp(dec!(2500))?;

    // 5x long: 1000 oi on 200 collateral
    ledger.build(alice, PositionId(0), Position::new(Side::Long, fp(dec!(1000))?, fp(dec!(800))?, entry))?;
    // 2x short: 1000 oi on 500 collateral
    ledger.build(bob, PositionId(0), Position::new(Side::Short, fp(dec!(1000))?, fp(dec!(500))?, entry))?;

    let pool = fp(dec!(1000))?;
    for price in [dec!(2500), dec!(2750), dec!(2250)] {
        let price = fp(price)?;
        let long = ledger.get(alice, PositionId(0)).valuation(FixedPoint::ONE, pool, pool, price, params)?;
        let short = ledger.get(bob, PositionId(0)).valuation(FixedPoint::ONE, pool, pool, price, params)?;
        println!("  Price {}: long value {}, short value {}", price, long.value, short.value);
    }

    let half = fp(dec!(0.5))?;
    let unwound = ledger.unwind(alice, PositionId(0), half)?;
    println!(
        "\n  Alice unwinds half: {} shares and {} debt removed",
        unwound.oi_shares_removed, unwound.debt_removed
    );
    println!("  Remaining shares: {}", unwound.remaining.oi_shares);
    println!("  Open positions: {}\n", ledger.open_positions().count());

    Ok(())
}

/// Funding moves pool oi while shares stay fixed.
fn scenario_4_funding_drift(params: &RiskParams) -> SimResult {
    println!("Scenario 4: Funding Drift\n");

    let pos = Position::new(Side::Long, fp(dec!(1000))?, fp(dec!(800))?, fp(dec!(2500))?);
    let shares = fp(dec!(10000))?;
    let mut oi = OpenInterest {
        long: shares,
        long_shares: shares,
        short: shares,
        short_shares: shares,
    };

    for paid in [dec!(0), dec!(250), dec!(500)] {
        oi.long = shares.sub(fp(paid)?)?;
        let (total_oi, total_shares) = oi.totals(pos.side());
        let current = pos.oi_current(FixedPoint::ONE, total_oi, total_shares)?;
        let value = pos.value(FixedPoint::ONE, total_oi, total_shares, pos.entry_price, params.cap_payoff)?;
        println!("  Long pool paid {} funding: oi {}, value {}", paid, current, value);
    }
    println!("  Maintenance margin stays at {}\n", pos.maintenance_margin(params.maintenance_margin_fraction)?);

    Ok(())
}

/// Price falls through the liquidation price.
fn scenario_5_liquidation(params: &RiskParams) -> SimResult {
    println!("Scenario 5: Liquidation\n");

    let mut ledger = PositionLedger::new();
    let carol = token(0xca401);
    let pool = fp(dec!(1000))?;
    let pos = Position::new(Side::Long, pool, fp(dec!(900))?, fp(dec!(2500))?);
    ledger.build(carol, PositionId(7), pos)?;

    let liq_price = pos.liquidation_price(pool, pool, params.maintenance_margin_fraction)?;
    println!("  10x long from 2500, liquidation price {}", liq_price);

    for price in [dec!(2400), dec!(2280), dec!(2270)] {
        let price = fp(price)?;
        let liquidatable = ledger.get(carol, PositionId(7)).is_liquidatable(
            pool,
            pool,
            price,
            params.cap_payoff,
            params.maintenance_margin_fraction,
        )?;
        println!("  Price {}: liquidatable {}", price, liquidatable);
        if liquidatable {
            ledger.liquidate(carol, PositionId(7))?;
            break;
        }
    }

    let final_pos = ledger.get(carol, PositionId(7));
    println!("  Liquidated: {}, exists: {}", final_pos.liquidated, final_pos.exists());

    Ok(())
}
