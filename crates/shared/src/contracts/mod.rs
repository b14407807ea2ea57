pub mod bindings;
pub mod gateway;
pub mod logs;
pub mod provider;
pub mod registry;

pub use gateway::{AlloyGateway, Confirmation, ContractGateway, PendingTx, TxKind};
pub use registry::ContractAddresses;
