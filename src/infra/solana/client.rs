// Responsible for all communication with the Solana blockchain.
//
// The gateway decides *when* to talk to the chain; this module knows *how*:
// PDA derivation, manual instruction building (8-byte Anchor discriminators)
// and account-data parsing for the certificate registry program.

use primitive_types::H256;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    signature::Keypair,
    signer::{keypair::read_keypair_file, Signer},
    transaction::Transaction,
};

// Anchor instruction discriminators: sha256("global:<name>")[0..8].
const INITIALIZE_REGISTRY_DISCRIMINATOR: [u8; 8] = [189, 181, 20, 17, 174, 57, 249, 59];
const STORE_DISCRIMINATOR: [u8; 8] = [220, 28, 207, 235, 0, 234, 193, 246];

// CertificateRecord account layout: 8-byte discriminator + 32-byte hash
// + 32-byte recorder pubkey + 8-byte i64 unix timestamp.
const RECORD_ACCOUNT_LEN: usize = 8 + 32 + 32 + 8;

/// A single on-chain certificate record, as read back from its account.
pub struct CertificateRecord {
    pub recorder: Pubkey,
    pub recorded_at: i64,
}

pub fn rpc_client(rpc_url: &str) -> RpcClient {
    RpcClient::new_with_commitment(rpc_url.to_string(), CommitmentConfig::confirmed())
}

pub fn load_payer(path: &str) -> anyhow::Result<Keypair> {
    read_keypair_file(path).map_err(|e| anyhow::anyhow!("Failed to read keypair file {}: {}", path, e))
}

/// Registry account PDA for a given authority.
pub fn registry_pubkey(program_id: &Pubkey, authority: &Pubkey) -> Pubkey {
    let (pda, _bump) = Pubkey::find_program_address(&[b"registry", authority.as_ref()], program_id);
    pda
}

/// Record account PDA for a given content hash within a registry.
pub fn record_pubkey(program_id: &Pubkey, registry: &Pubkey, hash: H256) -> Pubkey {
    let (pda, _bump) =
        Pubkey::find_program_address(&[b"certificate", registry.as_ref(), hash.as_bytes()], program_id);
    pda
}

/// Liveness probe against the RPC node.
pub async fn probe(client: &RpcClient) -> anyhow::Result<()> {
    client.get_version().await?;
    Ok(())
}

/// Creates the registry account for `payer` if it does not exist yet, and
/// returns its address. The program uses `init_if_needed`, so re-running
/// against an existing registry is harmless.
pub async fn initialize_registry(
    client: &RpcClient,
    program_id: &Pubkey,
    payer: &Keypair,
) -> anyhow::Result<Pubkey> {
    let registry = registry_pubkey(program_id, &payer.pubkey());

    if client.get_account(&registry).await.is_ok() {
        return Ok(registry);
    }

    let accounts = vec![
        AccountMeta::new(registry, false),
        AccountMeta::new(payer.pubkey(), true),
        AccountMeta::new_readonly(solana_program::system_program::ID, false),
    ];
    let instruction = Instruction {
        program_id: *program_id,
        accounts,
        data: INITIALIZE_REGISTRY_DISCRIMINATOR.to_vec(),
    };

    let mut transaction = Transaction::new_with_payer(&[instruction], Some(&payer.pubkey()));
    let recent_blockhash = client.get_latest_blockhash().await?;
    transaction.sign(&[payer], recent_blockhash);
    client.send_and_confirm_transaction(&transaction).await?;

    println!("> Ledger: initialized certificate registry account {}", registry);
    Ok(registry)
}

/// Submits a `store(hash)` transaction and blocks until it is confirmed.
/// Returns the transaction signature. A duplicate hash makes the program's
/// account `init` fail, which surfaces here as a transaction error.
pub async fn store_hash(
    client: &RpcClient,
    program_id: &Pubkey,
    registry: &Pubkey,
    payer: &Keypair,
    hash: H256,
) -> anyhow::Result<String> {
    let record = record_pubkey(program_id, registry, hash);

    let accounts = vec![
        AccountMeta::new(record, false),
        AccountMeta::new(*registry, false),
        AccountMeta::new(payer.pubkey(), true),
        AccountMeta::new_readonly(solana_program::system_program::ID, false),
    ];

    let mut instruction_data = STORE_DISCRIMINATOR.to_vec();
    instruction_data.extend_from_slice(hash.as_bytes());

    let instruction = Instruction {
        program_id: *program_id,
        accounts,
        data: instruction_data,
    };

    let mut transaction = Transaction::new_with_payer(&[instruction], Some(&payer.pubkey()));
    let recent_blockhash = client.get_latest_blockhash().await?;
    transaction.sign(&[payer], recent_blockhash);
    let signature = client.send_and_confirm_transaction(&transaction).await?;

    Ok(signature.to_string())
}

/// Reads the on-chain record for a content hash, if one exists.
///
/// Existence is an account fetch, not a program call; a missing account means
/// the hash was never stored under this registry.
pub async fn fetch_record(
    client: &RpcClient,
    program_id: &Pubkey,
    registry: &Pubkey,
    hash: H256,
) -> anyhow::Result<Option<CertificateRecord>> {
    let record = record_pubkey(program_id, registry, hash);

    // A missing account means the hash was never stored; a transport failure
    // is a different fact and must not be reported as absence.
    let account = match client
        .get_account_with_commitment(&record, client.commitment())
        .await?
        .value
    {
        Some(a) => a,
        None => return Ok(None),
    };

    let data = account.data;
    if data.len() < RECORD_ACCOUNT_LEN {
        return Err(anyhow::anyhow!(
            "Certificate record account {} is malformed ({} bytes)",
            record,
            data.len()
        ));
    }

    // Skip the 8-byte discriminator and the 32-byte stored hash.
    let mut recorder_bytes = [0u8; 32];
    recorder_bytes.copy_from_slice(&data[40..72]);
    let mut ts_bytes = [0u8; 8];
    ts_bytes.copy_from_slice(&data[72..80]);

    Ok(Some(CertificateRecord {
        recorder: Pubkey::new_from_array(recorder_bytes),
        recorded_at: i64::from_le_bytes(ts_bytes),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hashing::hash_bytes;

    #[tokio::test]
    async fn fetch_record_propagates_transport_failures() {
        // Nothing listens on this port, so the RPC call fails at the
        // transport layer; that must surface as Err, not as "not stored".
        let client = rpc_client("http://127.0.0.1:1");
        let program_id = Pubkey::new_from_array([1u8; 32]);
        let registry = Pubkey::new_from_array([2u8; 32]);

        let result = fetch_record(&client, &program_id, &registry, hash_bytes(b"doc")).await;
        assert!(result.is_err());
    }

    #[test]
    fn record_pda_depends_on_hash_and_registry() {
        let program_id = Pubkey::new_from_array([1u8; 32]);
        let registry_a = Pubkey::new_from_array([2u8; 32]);
        let registry_b = Pubkey::new_from_array([3u8; 32]);

        let a = record_pubkey(&program_id, &registry_a, hash_bytes(b"one"));
        assert_eq!(a, record_pubkey(&program_id, &registry_a, hash_bytes(b"one")));
        assert_ne!(a, record_pubkey(&program_id, &registry_a, hash_bytes(b"two")));
        assert_ne!(a, record_pubkey(&program_id, &registry_b, hash_bytes(b"one")));
    }
}
