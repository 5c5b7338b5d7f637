// Economy infrastructure - JSON file storage implementation

mod json_ledger_store;

pub use json_ledger_store::JsonLedgerStore;
