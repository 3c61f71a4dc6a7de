//! Recomputation of derived sales measures.

/// Corrected sales measures of one order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalesMeasures {
    pub amount: i64,
    pub price: i64,
}

/// Corrects the amount, then derives the price from the corrected amount.
///
/// The amount is replaced by `quantity * |price|` when it is missing, not positive, or does
/// not match that product. The price is replaced by `amount / quantity`, rounded half away
/// from zero, when it is missing or not positive. Missing quantity or price count as zero.
pub fn correct_measures(
    amount: Option<i64>,
    quantity: Option<i64>,
    price: Option<i64>,
) -> SalesMeasures {
    let amount = correct_amount(amount, quantity, price);
    let price = derive_price(price, amount, quantity);

    SalesMeasures { amount, price }
}

fn correct_amount(amount: Option<i64>, quantity: Option<i64>, price: Option<i64>) -> i64 {
    let expected = quantity
        .unwrap_or(0)
        .saturating_mul(price.unwrap_or(0).saturating_abs());

    match amount {
        Some(amount) if amount > 0 && amount == expected => amount,
        _ => expected,
    }
}

fn derive_price(price: Option<i64>, amount: i64, quantity: Option<i64>) -> i64 {
    match price {
        Some(price) if price > 0 => price,
        _ => match quantity {
            Some(quantity) if quantity != 0 => divide_rounded(amount, quantity),
            _ => 0,
        },
    }
}

fn divide_rounded(numerator: i64, denominator: i64) -> i64 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;

    if remainder.unsigned_abs() * 2 >= denominator.unsigned_abs() {
        quotient + numerator.signum() * denominator.signum()
    } else {
        quotient
    }
}
