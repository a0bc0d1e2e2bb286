//
// src/proxy/mod.rs
//
mod backend;
mod forwarder;
mod pool;
mod proxy;

pub use backend::Backend;
pub use forwarder::{
    ForwardError, ForwardRequest, ForwardResult, Forwarder, HttpForwarder, REQUEST_ID_HEADER,
};
pub use pool::ServerPool;
pub use proxy::{Proxy, ProxyError};
