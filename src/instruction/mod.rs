pub mod spl;
pub mod token_swap;
