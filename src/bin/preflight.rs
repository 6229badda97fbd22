use solana_program::pubkey::Pubkey;
use solana_sdk::signer::Signer;
use std::str::FromStr;

use cert_ledger::infra::config;
use cert_ledger::infra::solana::client;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--init-registry-if-missing]\n\
         \n\
         Requires env vars:\n\
           DATABASE_URL\n\
         Optional ledger env vars (omit all for offline mode):\n\
           SOLANA_RPC_URL, SOLANA_PROGRAM_ID, LEDGER_REGISTRY_ADDRESS, LEDGER_ALLOW_INIT\n\
         And a Solana payer key (default ~/.config/solana/id.json, override PAYER_KEYPAIR_PATH)\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let init_registry_if_missing = args.iter().any(|a| a == "--init-registry-if-missing");

    println!("> Preflight:");

    // Database connectivity.
    let database_url = config::database_url();
    println!("  DATABASE_URL set ({} chars)", database_url.len());
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;
    sqlx::query("SELECT 1").execute(&pool).await?;
    println!("  Database reachable.");

    // Ledger side is optional; an unset RPC URL means offline mode by design.
    let rpc_url = match config::solana_rpc_url() {
        Some(u) => u,
        None => {
            println!("  SOLANA_RPC_URL not set: service will run in offline (no-ledger) mode.");
            println!("> Preflight OK (offline mode).");
            return Ok(());
        }
    };
    let program_id_str = config::solana_program_id()
        .ok_or_else(|| anyhow::anyhow!("SOLANA_RPC_URL is set but SOLANA_PROGRAM_ID is missing"))?;

    println!("  SOLANA_RPC_URL={}", rpc_url);
    println!("  SOLANA_PROGRAM_ID={}", program_id_str);

    let payer_path = config::payer_keypair_path();
    let payer = client::load_payer(&payer_path)?;

    let rpc = client::rpc_client(&rpc_url);

    // Basic RPC connectivity.
    let version = rpc.get_version().await?;
    println!("  RPC version: {}", version.solana_core);

    // Payer balance.
    let balance_lamports = rpc.get_balance(&payer.pubkey()).await?;
    let sol = balance_lamports as f64 / 1_000_000_000_f64;
    println!("  Payer: {}", payer.pubkey());
    println!("  Payer balance: {} lamports (~{:.6} SOL)", balance_lamports, sol);
    if balance_lamports < 10_000_000 {
        eprintln!("  Warning: payer balance looks low; transactions may fail.");
    }

    // Program account existence.
    let program_id = Pubkey::from_str(&program_id_str)
        .map_err(|e| anyhow::anyhow!("SOLANA_PROGRAM_ID is not a valid pubkey: {}", e))?;
    let program_acct = rpc
        .get_account(&program_id)
        .await
        .map_err(|e| anyhow::anyhow!("Program account not found on cluster: {} ({})", program_id, e))?;
    if !program_acct.executable {
        eprintln!("  Warning: program account exists but is not marked executable.");
    } else {
        println!("  Program account is deployed + executable.");
    }

    // Registry account.
    let registry = match config::ledger_registry_address() {
        Some(addr) => {
            let registry = Pubkey::from_str(&addr)
                .map_err(|e| anyhow::anyhow!("LEDGER_REGISTRY_ADDRESS is not a valid pubkey: {}", e))?;
            println!("  Configured registry: {}", registry);
            registry
        }
        None => {
            let registry = client::registry_pubkey(&program_id, &payer.pubkey());
            println!("  Derived registry PDA: {}", registry);
            registry
        }
    };

    let registry_exists = rpc.get_account(&registry).await.is_ok();
    if registry_exists {
        println!("  Registry account exists.");
    } else if init_registry_if_missing {
        println!("  Registry missing -> initializing on-chain certificate registry...");
        let created = client::initialize_registry(&rpc, &program_id, &payer).await?;
        rpc.get_account(&created)
            .await
            .map_err(|e| anyhow::anyhow!("Registry still missing after initialization: {}", e))?;
        println!("  Registry initialized successfully.");
    } else {
        return Err(anyhow::anyhow!(
            "Registry account does not exist. Re-run with --init-registry-if-missing"
        ));
    }

    println!("> Preflight OK.");
    Ok(())
}
