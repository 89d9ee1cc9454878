use bip39::{Language, Mnemonic};
use ethers_core::utils::to_checksum;
use ethers_signers::coins_bip39::English;
use ethers_signers::{LocalWallet, MnemonicBuilder, Signer};
use rand::RngCore;
use std::str::FromStr;
use tracing::info;

use crate::blockchain::models::{WalletGenerationError, WalletResponse};

pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

/// Generates a 12-word mnemonic and derives its first EVM account.
pub fn create_wallet() -> Result<WalletResponse, WalletGenerationError> {
    info!("Generating a new wallet...");
    let mut entropy = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut entropy);
    let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)?;
    let phrase = mnemonic.to_string();

    let wallet = wallet_from_mnemonic(&phrase)?;

    info!("Wallet generated successfully.");
    Ok(WalletResponse {
        address: to_checksum(&wallet.address(), None),
        mnemonic: phrase,
        derivation_path: DEFAULT_DERIVATION_PATH.to_string(),
    })
}

pub fn wallet_from_mnemonic(phrase: &str) -> Result<LocalWallet, WalletGenerationError> {
    Ok(MnemonicBuilder::<English>::default()
        .phrase(phrase)
        .derivation_path(DEFAULT_DERIVATION_PATH)?
        .build()?)
}

/// The agent's signing wallet, bound to a chain for EIP-155 signatures.
pub fn agent_wallet(secret_key: &str, chain_id: u64) -> Result<LocalWallet, WalletGenerationError> {
    Ok(LocalWallet::from_str(secret_key)?.with_chain_id(chain_id))
}
