pub mod certificate;
pub mod ledger;
pub mod verify;
