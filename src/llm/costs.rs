//! Per-model token pricing (USD per token).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Look up (input, output) cost per token for a model. Unknown models are free.
pub fn model_cost(model: &str) -> (Decimal, Decimal) {
    // Prices are per million tokens; longest prefix wins.
    let per_million = if model.starts_with("gpt-4o-mini") {
        (dec!(0.15), dec!(0.60))
    } else if model.starts_with("gpt-4o") {
        (dec!(2.50), dec!(10.00))
    } else if model.starts_with("gpt-4.1-mini") {
        (dec!(0.40), dec!(1.60))
    } else if model.starts_with("gpt-4.1") {
        (dec!(2.00), dec!(8.00))
    } else if model.starts_with("claude-3-5-haiku") {
        (dec!(0.80), dec!(4.00))
    } else if model.starts_with("claude-3-5-sonnet") || model.starts_with("claude-sonnet-4") {
        (dec!(3.00), dec!(15.00))
    } else {
        return (Decimal::ZERO, Decimal::ZERO);
    };
    let million = dec!(1_000_000);
    (per_million.0 / million, per_million.1 / million)
}
