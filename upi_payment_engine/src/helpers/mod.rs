mod order_ids;
mod signature;
mod timestamps;

pub use order_ids::new_order_id;
pub use signature::{
    canonical_string,
    params_from_json,
    sign,
    verify,
    SignatureCodec,
    SignatureError,
    SignedParams,
    SIGN_FIELD,
};
pub use timestamps::{gateway_timestamp, parse_gateway_timestamp, GATEWAY_TIMESTAMP_FORMAT};
