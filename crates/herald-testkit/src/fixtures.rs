//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ed25519_dalek::SigningKey;
use herald::{Herald, HeraldConfig};
use herald_core::{Address, Amount, ChannelType, Event, Height, PublicKey};
use herald_ledger::capabilities::memory::{MemoryAllowList, MemoryToken, MemoryVault};
use herald_ledger::{Capabilities, DerivedKeyVerifier, Ledger, LedgerConfig, LedgerError};
use herald_store::MemoryStore;
use rand::rngs::OsRng;

/// A participant with an ed25519 key and the address derived from it.
#[derive(Debug, Clone)]
pub struct TestParty {
    signing: SigningKey,
    pub address: Address,
    pub public_key: PublicKey,
}

impl TestParty {
    /// A party with a deterministic key.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::from_signing(SigningKey::from_bytes(&seed))
    }

    /// A party with a fresh random key.
    pub fn random() -> Self {
        Self::from_signing(SigningKey::generate(&mut OsRng))
    }

    fn from_signing(signing: SigningKey) -> Self {
        let public_key = PublicKey::from_bytes(signing.verifying_key().to_bytes());
        Self {
            address: Address::derive(&public_key),
            public_key,
            signing,
        }
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing
    }

    /// Hex of the private seed, for reproducing failures.
    pub fn seed_hex(&self) -> String {
        hex::encode(self.signing.to_bytes())
    }
}

/// Create `count` deterministic parties with distinct keys.
pub fn multi_party(count: usize) -> Vec<TestParty> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = 1;
            seed[1..9].copy_from_slice(&(i as u64).to_le_bytes());
            TestParty::from_seed(seed)
        })
        .collect()
}

/// In-memory collaborators and a height counter.
pub struct TestFixture {
    pub allow: Arc<MemoryAllowList>,
    pub token: Arc<MemoryToken>,
    pub vault: Arc<MemoryVault>,
    pub config: LedgerConfig,
    height: AtomicU64,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        let token = Arc::new(MemoryToken::new());
        Self {
            allow: Arc::new(MemoryAllowList::new()),
            vault: Arc::new(MemoryVault::new(token.clone())),
            token,
            config,
            height: AtomicU64::new(0),
        }
    }

    pub fn caps(&self) -> Capabilities {
        Capabilities {
            allow_list: self.allow.clone(),
            assets: self.token.clone(),
            vault: self.vault.clone(),
            keys: Arc::new(DerivedKeyVerifier),
        }
    }

    /// A freshly bootstrapped ledger at height 0.
    pub fn ledger(&self) -> Ledger {
        match Ledger::genesis(self.config.clone(), self.caps(), 0) {
            Ok((ledger, _)) => ledger,
            Err(e) => panic!("genesis failed: {}", e),
        }
    }

    /// A Herald service over a fresh memory store.
    pub async fn herald(&self) -> herald::Result<Herald<MemoryStore>> {
        let config = HeraldConfig {
            ledger: self.config.clone(),
            ..HeraldConfig::default()
        };
        Herald::open(Arc::new(MemoryStore::new()), self.caps(), config, 0).await
    }

    /// The next height, strictly above every height handed out before.
    pub fn next_height(&self) -> Height {
        self.height.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The last height handed out.
    pub fn height(&self) -> Height {
        self.height.load(Ordering::SeqCst)
    }

    /// Skip `blocks` heights.
    pub fn advance(&self, blocks: u64) -> Height {
        self.height.fetch_add(blocks, Ordering::SeqCst) + blocks
    }

    pub fn fund(&self, address: Address, amount: Amount) {
        self.token.mint(address, amount);
    }

    pub fn whitelist(&self, address: Address) {
        self.allow.allow(address);
    }

    /// Whitelist and fund `owner`, then open an interest-bearing channel
    /// staking the minimum contribution at the next height.
    pub fn open_channel(
        &self,
        ledger: &mut Ledger,
        owner: Address,
    ) -> Result<Vec<Event>, LedgerError> {
        self.open_channel_with(ledger, owner, self.config.min_contribution)
    }

    pub fn open_channel_with(
        &self,
        ledger: &mut Ledger,
        owner: Address,
        contribution: Amount,
    ) -> Result<Vec<Event>, LedgerError> {
        self.whitelist(owner);
        self.fund(owner, contribution);
        ledger.create_channel(
            owner,
            ChannelType::InterestBearing,
            format!("channel {}", owner),
            contribution,
            self.next_height(),
        )
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
