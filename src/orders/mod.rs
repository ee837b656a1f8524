// 2.0: trigger orders. increase and decrease orders wait in the book until a
// keeper finds the trigger price met, then run against the vault as one unit.

mod book;
mod types;

pub use book::{validate_position_order_price, OrderBook};
pub use types::{
    is_price_valid, DecreaseOrder, DecreaseOrderRequest, IncreaseOrder, IncreaseOrderRequest, OrderError, SwapPath,
};
