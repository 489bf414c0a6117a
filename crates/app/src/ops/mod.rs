pub mod get;
pub mod pubkey;
pub mod put;
pub mod scan;

pub use get::Get;
pub use pubkey::Pubkey;
pub use put::Put;
pub use scan::Scan;
