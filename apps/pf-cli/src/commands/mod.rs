pub mod changes;
pub mod credits;
pub mod generate;
pub mod modify;
pub mod runs;
