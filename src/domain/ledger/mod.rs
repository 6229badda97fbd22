pub mod gateway;

pub use gateway::{LedgerGateway, LedgerLookup, RecordOutcome};
