#![forbid(unsafe_code)]

//! Schema-driven source generator: consumes an AWS-style service
//! definition (operations, http bindings, and the shape graph that
//! composes them) and emits a typed PHP client library for one service.

mod error;
pub use error::{Error, Result};

pub mod config;
pub mod definition;
pub mod docs;
pub mod input_gen;
pub mod merge;
pub mod operation_gen;
pub mod php;
pub mod result_gen;
pub(crate) mod shapes;
pub mod types;
pub mod writer;

pub use operation_gen::OperationGenerator;

// re-export
pub use bytes::Bytes;
pub(crate) use bytes::BytesMut;

// common types used in this crate
pub(crate) type JsonValue = serde_json::Value;
pub(crate) type JsonMap = serde_json::Map<String, JsonValue>;

pub(crate) mod strings {
    /// re-export inflector string conversions
    pub use inflector::cases::camelcase::to_camel_case;
}
