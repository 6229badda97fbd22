//! The Ledger Gateway: the single process-wide owner of blockchain state.
//!
//! The gateway advances lazily through Unresolved -> Connected -> Bound and
//! drops to Unavailable on any probe or binding failure. Every public call
//! re-attempts resolution from Unavailable, so a node that comes back is
//! picked up on the next request without a background retry loop. An absent
//! ledger is a supported mode, not an error state: `record` then reports
//! `Unavailable` and `lookup` reports `consulted = false`.

use primitive_types::H256;
use solana_program::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::infra::config;
use crate::infra::solana::client;

/// Result of `record(hash)`.
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    /// The hash was written and the transaction confirmed.
    Recorded { tx_ref: String, contract_address: String },
    /// The ledger could not be reached or bound; nothing was submitted.
    Unavailable,
}

/// Result of `lookup(hash)`.
#[derive(Debug, Clone)]
pub struct LedgerLookup {
    /// False when the gateway never reached a bound contract for this call.
    /// Callers must not conflate "ledger not consulted" with "not found".
    pub consulted: bool,
    pub exists: bool,
    pub recorder: Option<String>,
    pub recorded_at: Option<i64>,
}

impl LedgerLookup {
    fn not_consulted() -> Self {
        LedgerLookup { consulted: false, exists: false, recorder: None, recorded_at: None }
    }

    fn absent() -> Self {
        LedgerLookup { consulted: true, exists: false, recorder: None, recorded_at: None }
    }
}

/// Static chain configuration captured at gateway construction.
struct ChainContext {
    rpc_url: String,
    program_id: Pubkey,
    payer_path: String,
    configured_registry: Option<Pubkey>,
    allow_init: bool,
}

#[derive(Clone)]
struct Binding {
    registry: Pubkey,
    /// The signing identity, loaded once at binding time. A gateway without a
    /// payer cannot submit, so a payer that fails to load is unavailability.
    payer: Arc<Keypair>,
}

enum GatewayState {
    Unresolved,
    Bound(Binding),
    Unavailable,
}

pub struct LedgerGateway {
    /// None when the capability check at construction failed; the gateway then
    /// always reports unavailability without touching the network.
    chain: Option<ChainContext>,
    /// Resolution state. The mutex makes resolution single-flight: one caller
    /// advances the state machine while concurrent callers wait on the lock,
    /// so two requests can never race into duplicate registry initialization.
    state: Mutex<GatewayState>,
}

impl LedgerGateway {
    /// Builds the gateway from environment configuration. The capability check
    /// happens once, here: missing or unparsable chain settings produce an
    /// always-offline gateway instead of conditionally-defined globals.
    pub fn from_env() -> Self {
        let chain = match (config::solana_rpc_url(), config::solana_program_id()) {
            (Some(rpc_url), Some(program_id_str)) => match Pubkey::from_str(&program_id_str) {
                Ok(program_id) => {
                    let configured_registry = config::ledger_registry_address()
                        .and_then(|s| match Pubkey::from_str(&s) {
                            Ok(pk) => Some(pk),
                            Err(e) => {
                                eprintln!("> Ledger: ignoring invalid LEDGER_REGISTRY_ADDRESS: {}", e);
                                None
                            }
                        });
                    Some(ChainContext {
                        rpc_url,
                        program_id,
                        payer_path: config::payer_keypair_path(),
                        configured_registry,
                        allow_init: config::ledger_allow_init(),
                    })
                }
                Err(e) => {
                    eprintln!("> Ledger: SOLANA_PROGRAM_ID is not a valid pubkey ({}); running without a ledger.", e);
                    None
                }
            },
            _ => {
                println!("> Ledger: no SOLANA_RPC_URL/SOLANA_PROGRAM_ID configured; running without a ledger.");
                None
            }
        };

        Self { chain, state: Mutex::new(GatewayState::Unresolved) }
    }

    /// Gateway that never consults a ledger. Used in tests and air-gapped runs.
    pub fn disabled() -> Self {
        Self { chain: None, state: Mutex::new(GatewayState::Unresolved) }
    }

    #[cfg(test)]
    fn with_chain(chain: ChainContext) -> Self {
        Self { chain: Some(chain), state: Mutex::new(GatewayState::Unresolved) }
    }

    pub fn is_configured(&self) -> bool {
        self.chain.is_some()
    }

    /// Advances the state machine toward Bound and returns the binding, or
    /// None when the ledger is unavailable for this call. Holding the state
    /// lock across the probe/init RPCs is what makes resolution mutually
    /// exclusive; the lock is released before the actual record/lookup call.
    async fn ensure_bound(&self) -> Option<(Binding, &ChainContext)> {
        let chain = self.chain.as_ref()?;

        let mut state = self.state.lock().await;
        if let GatewayState::Bound(binding) = &*state {
            return Some((binding.clone(), chain));
        }

        // Unresolved or Unavailable: run a fresh resolution attempt. The
        // payer check comes first: it is local and cheap, and a binding
        // without a signing identity could never submit anything.
        let payer = match client::load_payer(&chain.payer_path) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                eprintln!("> Ledger: {}; continuing without a ledger.", e);
                *state = GatewayState::Unavailable;
                return None;
            }
        };

        let rpc = client::rpc_client(&chain.rpc_url);
        if let Err(e) = client::probe(&rpc).await {
            println!("> Ledger: node unreachable ({}); continuing without a ledger.", e);
            *state = GatewayState::Unavailable;
            return None;
        }

        // Connected. Resolve the registry binding.
        let registry = if let Some(configured) = chain.configured_registry {
            // Adopted as-is; the operator's configuration is trusted.
            configured
        } else if chain.allow_init {
            match client::initialize_registry(&rpc, &chain.program_id, &payer).await {
                Ok(pda) => pda,
                Err(e) => {
                    eprintln!("> Ledger: registry initialization failed: {}", e);
                    *state = GatewayState::Unavailable;
                    return None;
                }
            }
        } else {
            // Node reachable but no registry configured and initialization is
            // not permitted in this environment.
            *state = GatewayState::Unavailable;
            return None;
        };

        let binding = Binding { registry, payer };
        // The resolved address becomes live configuration: later calls adopt
        // it directly and never re-run initialization.
        *state = GatewayState::Bound(binding.clone());
        println!("> Ledger: bound to registry {}", binding.registry);
        Some((binding, chain))
    }

    /// Submits `(hash, submitter, timestamp)` to the ledger and waits for
    /// confirmation. Returns `Unavailable` (not an error) when no contract is
    /// bound. A reachable ledger that rejects or loses the submission is an
    /// `Err`, distinct from unavailability; duplicates are caught by a cheap
    /// pre-check before anything is broadcast.
    pub async fn record(&self, hash: H256) -> anyhow::Result<RecordOutcome> {
        let (binding, chain) = match self.ensure_bound().await {
            Some(bound) => bound,
            None => return Ok(RecordOutcome::Unavailable),
        };

        let rpc = client::rpc_client(&chain.rpc_url);

        // Duplicate policy: check for an existing record before submitting,
        // instead of relying on the program's account-init rejection alone.
        if client::fetch_record(&rpc, &chain.program_id, &binding.registry, hash)
            .await?
            .is_some()
        {
            return Err(anyhow::anyhow!(
                "hash {} is already recorded on the ledger",
                crate::crypto::hashing::canonical_hex(hash)
            ));
        }

        let tx_ref = client::store_hash(&rpc, &chain.program_id, &binding.registry, &binding.payer, hash)
            .await
            .map_err(|e| anyhow::anyhow!("ledger write failed after submission: {}", e))?;

        Ok(RecordOutcome::Recorded {
            tx_ref,
            contract_address: binding.registry.to_string(),
        })
    }

    /// Read-only lookup. When no contract is bound this returns
    /// `consulted = false, exists = false` without error.
    pub async fn lookup(&self, hash: H256) -> anyhow::Result<LedgerLookup> {
        let (binding, chain) = match self.ensure_bound().await {
            Some(bound) => bound,
            None => return Ok(LedgerLookup::not_consulted()),
        };

        let rpc = client::rpc_client(&chain.rpc_url);
        match client::fetch_record(&rpc, &chain.program_id, &binding.registry, hash).await? {
            Some(record) => Ok(LedgerLookup {
                consulted: true,
                exists: true,
                recorder: Some(record.recorder.to_string()),
                recorded_at: Some(record.recorded_at),
            }),
            None => Ok(LedgerLookup::absent()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hashing::hash_bytes;

    #[tokio::test]
    async fn disabled_gateway_reports_unavailable_on_record() {
        let gateway = LedgerGateway::disabled();
        let outcome = gateway.record(hash_bytes(b"doc")).await.unwrap();
        assert!(matches!(outcome, RecordOutcome::Unavailable));
    }

    #[tokio::test]
    async fn disabled_gateway_lookup_is_not_consulted_and_not_an_error() {
        let gateway = LedgerGateway::disabled();
        let lookup = gateway.lookup(hash_bytes(b"doc")).await.unwrap();
        assert!(!lookup.consulted);
        assert!(!lookup.exists);
        assert!(lookup.recorder.is_none());
        assert!(lookup.recorded_at.is_none());
    }

    fn chain_with_missing_payer() -> ChainContext {
        ChainContext {
            rpc_url: "http://127.0.0.1:1".to_string(),
            program_id: Pubkey::new_from_array([1u8; 32]),
            payer_path: "/nonexistent/payer-keypair.json".to_string(),
            configured_registry: Some(Pubkey::new_from_array([2u8; 32])),
            allow_init: false,
        }
    }

    #[tokio::test]
    async fn missing_payer_keypair_degrades_record_instead_of_erroring() {
        let gateway = LedgerGateway::with_chain(chain_with_missing_payer());
        // The payer cannot be loaded, so nothing can ever be submitted:
        // unavailability, not a ledger rejection.
        let outcome = gateway.record(hash_bytes(b"doc")).await.unwrap();
        assert!(matches!(outcome, RecordOutcome::Unavailable));
    }

    #[tokio::test]
    async fn missing_payer_keypair_leaves_lookup_unconsulted() {
        let gateway = LedgerGateway::with_chain(chain_with_missing_payer());
        let lookup = gateway.lookup(hash_bytes(b"doc")).await.unwrap();
        assert!(!lookup.consulted);
        assert!(!lookup.exists);
    }

    #[tokio::test]
    async fn disabled_gateway_stays_unavailable_across_calls() {
        let gateway = LedgerGateway::disabled();
        for _ in 0..3 {
            assert!(matches!(gateway.record(hash_bytes(b"x")).await.unwrap(), RecordOutcome::Unavailable));
        }
        assert!(!gateway.is_configured());
    }
}
