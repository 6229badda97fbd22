// Solana smart contract for the certificate registry.
//
// One registry account per authority; one record account per content hash.
// `store` uses `init`, so a hash that is already recorded fails the
// transaction instead of being overwritten.
use anchor_lang::prelude::*;

declare_id!("He4E4oXc69hE97f4sbKbecUwmqrqQjouKPhajSzCMGnL");

#[program]
pub mod cert_registry {
    use super::*;

    pub fn initialize_registry(ctx: Context<InitializeRegistry>) -> Result<()> {
        let registry = &mut ctx.accounts.registry;
        registry.authority = ctx.accounts.user.key();
        registry.certificate_count = 0;
        Ok(())
    }

    pub fn store(ctx: Context<Store>, hash: [u8; 32]) -> Result<()> {
        let record = &mut ctx.accounts.certificate;
        record.hash = hash;
        record.recorder = ctx.accounts.user.key();
        record.recorded_at = Clock::get()?.unix_timestamp;

        let registry = &mut ctx.accounts.registry;
        registry.certificate_count = registry.certificate_count.saturating_add(1);
        Ok(())
    }
}

#[derive(Accounts)]
pub struct InitializeRegistry<'info> {
    #[account(
        init_if_needed,
        payer = user,
        space = 8 + 32 + 8,
        seeds = [b"registry", user.key().as_ref()],
        bump
    )]
    pub registry: Account<'info, Registry>,
    #[account(mut)]
    pub user: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(hash: [u8; 32])]
pub struct Store<'info> {
    #[account(
        init,
        payer = user,
        space = 8 + 32 + 32 + 8,
        seeds = [b"certificate", registry.key().as_ref(), hash.as_ref()],
        bump
    )]
    pub certificate: Account<'info, CertificateRecord>,
    #[account(mut)]
    pub registry: Account<'info, Registry>,
    #[account(mut)]
    pub user: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[account]
pub struct Registry {
    pub authority: Pubkey,
    pub certificate_count: u64,
}

#[account]
pub struct CertificateRecord {
    pub hash: [u8; 32],
    pub recorder: Pubkey,
    pub recorded_at: i64,
}
