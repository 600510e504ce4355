//! Swap instruction for the token-swap exchange programs.

use crate::catalog::Pool;
use crate::constants::programs::TOKEN_PROGRAM;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

const SWAP: u8 = 1;

/// One hop through `pool`: `amount_in` leaves `user_source`, at least
/// `minimum_amount_out` lands in `user_destination`. `pool_source` and
/// `pool_destination` are the pool reserves matching the trade direction.
pub fn swap(
    program_id: &Pubkey,
    pool: &Pool,
    user_transfer_authority: &Pubkey,
    user_source: &Pubkey,
    pool_source: &Pubkey,
    pool_destination: &Pubkey,
    user_destination: &Pubkey,
    amount_in: u64,
    minimum_amount_out: u64,
) -> Instruction {
    let mut data = Vec::with_capacity(17);
    data.push(SWAP);
    data.extend_from_slice(&amount_in.to_le_bytes());
    data.extend_from_slice(&minimum_amount_out.to_le_bytes());
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(pool.id, false),
            AccountMeta::new_readonly(pool.authority, false),
            AccountMeta::new_readonly(*user_transfer_authority, true),
            AccountMeta::new(*user_source, false),
            AccountMeta::new(*pool_source, false),
            AccountMeta::new(*pool_destination, false),
            AccountMeta::new(*user_destination, false),
            AccountMeta::new(pool.pool_token_mint, false),
            AccountMeta::new(pool.fee_account, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM, false),
        ],
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Pool};
    use crate::common::types::Network;

    fn sample_pool() -> Pool {
        let catalog = Catalog::new();
        catalog.load(Network::MainnetBeta).unwrap();
        catalog.pools().unwrap().into_iter().next().unwrap()
    }

    #[test]
    fn test_swap_data_layout() {
        let pool = sample_pool();
        let authority = Pubkey::new_unique();
        let ix = swap(
            &Pubkey::new_unique(),
            &pool,
            &authority,
            &Pubkey::new_unique(),
            &pool.reserve_a,
            &pool.reserve_b,
            &Pubkey::new_unique(),
            1_000,
            950,
        );
        assert_eq!(ix.data.len(), 17);
        assert_eq!(ix.data[0], SWAP);
        assert_eq!(u64::from_le_bytes(ix.data[1..9].try_into().unwrap()), 1_000);
        assert_eq!(u64::from_le_bytes(ix.data[9..17].try_into().unwrap()), 950);
    }

    #[test]
    fn test_swap_account_roles() {
        let pool = sample_pool();
        let authority = Pubkey::new_unique();
        let ix = swap(
            &Pubkey::new_unique(),
            &pool,
            &authority,
            &Pubkey::new_unique(),
            &pool.reserve_a,
            &pool.reserve_b,
            &Pubkey::new_unique(),
            1,
            0,
        );
        assert_eq!(ix.accounts.len(), 10);
        // only the user transfer authority signs
        let signers: Vec<_> = ix.accounts.iter().filter(|a| a.is_signer).collect();
        assert_eq!(signers.len(), 1);
        assert_eq!(signers[0].pubkey, authority);
        assert_eq!(ix.accounts[9].pubkey, TOKEN_PROGRAM);
    }
}
