//! Odoo proxy wire types.

mod types;

pub use types::{
    JSON_RPC_VERSION, OdooAction, OdooRequest, RpcEnvelope, RpcErrorObject, TargetInstance,
};
