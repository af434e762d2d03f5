mod handler;
mod protocol_adapter;

pub use handler::GraphQlHandler;
pub use protocol_adapter::GraphQlAdapter;
