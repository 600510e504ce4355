//! On-chain program and sysvar addresses.

use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;

pub const TOKEN_PROGRAM: Pubkey = spl_token::ID;

pub const ATA_PROGRAM: Pubkey = spl_associated_token_account::ID;

pub const SYSTEM_PROGRAM: Pubkey = pubkey!("11111111111111111111111111111111");

pub const RENT_SYSVAR: Pubkey = pubkey!("SysvarRent111111111111111111111111111111111");

/// Original token-swap exchange program.
pub const EXCHANGE_PROGRAM: Pubkey = pubkey!("SwaPpA9LAaLfeLi3a68M4DjnLqgtticKg6CnyNwgAC8");

/// Second-generation exchange deployment; new pools live here.
pub const EXCHANGE_PROGRAM_V2: Pubkey = pubkey!("9W959DqEETiGZocYWCQPaJ6sBmUzgfxXfqGeTEdp3aQP");
