pub mod builders;
pub mod parsers;
pub mod utils;
