//! Input validation for table order mutations
//!
//! Runs before any lock is taken: a rejected request never touches the store.

use super::manager::{OrderError, OrderResult};
use rust_decimal::Decimal;
use shared::order::{OrderLine, TableNumber, lines_total};

pub fn validate_table(table: TableNumber, table_count: u32) -> OrderResult<()> {
    if !table.in_range(table_count) {
        return Err(OrderError::Validation(format!(
            "table {} is outside 1..={}",
            table, table_count
        )));
    }
    Ok(())
}

pub fn validate_line(line: &OrderLine) -> OrderResult<()> {
    if line.name.trim().is_empty() {
        return Err(OrderError::Validation(format!(
            "product {} has an empty name",
            line.product_id
        )));
    }
    if line.quantity == 0 {
        return Err(OrderError::Validation(format!(
            "{}: quantity must be positive",
            line.name
        )));
    }
    if line.unit_price <= Decimal::ZERO {
        return Err(OrderError::Validation(format!(
            "{}: unit price must be positive, got {}",
            line.name, line.unit_price
        )));
    }
    if line.line_total().is_none() {
        return Err(OrderError::Validation(format!(
            "{}: {} × {} is out of range",
            line.name, line.unit_price, line.quantity
        )));
    }
    if line.category_id <= 0 {
        return Err(OrderError::Validation(format!(
            "{}: invalid category {}",
            line.name, line.category_id
        )));
    }
    Ok(())
}

/// Lines must be non-empty and well-formed, and `total` must equal Σ line totals
pub fn validate_lines(lines: &[OrderLine], total: Decimal) -> OrderResult<()> {
    if lines.is_empty() {
        return Err(OrderError::Validation("no lines to send".to_string()));
    }
    lines.iter().try_for_each(validate_line)?;

    if total <= Decimal::ZERO {
        return Err(OrderError::Validation(format!(
            "total must be positive, got {}",
            total
        )));
    }
    let Some(expected) = lines_total(lines) else {
        return Err(OrderError::Validation(
            "lines total is out of range".to_string(),
        ));
    };
    if total != expected {
        return Err(OrderError::Validation(format!(
            "total {} does not match lines total {}",
            total, expected
        )));
    }
    Ok(())
}
