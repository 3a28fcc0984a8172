mod helpers;
mod paise;
mod secret;

pub mod op;

pub use helpers::{parse_boolean_flag, parse_ip_list};
pub use paise::{Paise, PaiseConversionError, INR_CURRENCY_CODE};
pub use secret::Secret;
