pub mod blob;
pub mod chat;
pub mod graphql;
pub mod normalize;
pub mod orderbook;
pub mod ranking;
pub mod scope;
pub mod store;
pub mod types;
