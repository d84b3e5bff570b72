mod helpers;
mod money;

pub mod op;

pub use helpers::parse_flag;
pub use money::{Money, MoneyConversionError, CURRENCY_CODE};
