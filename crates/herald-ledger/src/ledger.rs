//! The Ledger: entry point for every mutating operation and query.
//!
//! Each operation runs in three phases:
//!
//! 1. Stage: check preconditions and stage all record changes in a [`Txn`].
//!    Checked arithmetic happens here.
//! 2. Collaborate: move assets through the injected capabilities. This is
//!    always the last fallible step.
//! 3. Commit: apply the staged write set. Infallible.
//!
//! A failure in phase 1 or 2 drops the staged changes, so a rejected
//! operation leaves the ledger exactly as it was.
//!
//! [`Ledger::prepare`] stops after phase 2 and hands back a [`Staged`]
//! operation. The caller then either commits it with [`Ledger::commit`] or
//! abandons it with [`Ledger::abort`], which reverses the asset movements
//! made in phase 2.

use bytes::Bytes;
use herald_core::{
    Address, Amount, Channel, ChannelGroup, ChannelType, Event, Height, Membership, PublicKey,
    User,
};
use tracing::{debug, error, info, warn};

use crate::capabilities::Capabilities;
use crate::config::LedgerConfig;
use crate::error::{CapabilityError, LedgerError, Result};
use crate::operation::Operation;
use crate::pool::{FeeLedger, PoolLedger, Settlement};
use crate::state::{LedgerState, WriteSet};
use crate::txn::Txn;

/// The channel and subscription ledger.
pub struct Ledger {
    config: LedgerConfig,
    caps: Capabilities,
    state: LedgerState,
    /// Commits applied by this instance. Staged operations are bound to it.
    revision: u64,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("channels", &self.state.channels.len())
            .field("users", &self.state.users.len())
            .field("last_height", &self.state.last_height)
            .field("revision", &self.revision)
            .finish()
    }
}

/// An operation that passed every check but is not yet committed.
///
/// Its collaborator calls have already been made. Hand it to
/// [`Ledger::commit`] to apply it, or to [`Ledger::abort`] to reverse them.
#[derive(Debug)]
#[must_use = "a staged operation must be committed or aborted"]
pub struct Staged {
    label: &'static str,
    op: Option<Operation>,
    at: Height,
    revision: u64,
    writes: WriteSet,
}

impl Staged {
    /// Events the operation emits once committed.
    pub fn events(&self) -> &[Event] {
        &self.writes.events
    }

    pub fn height(&self) -> Height {
        self.at
    }

    pub fn operation(&self) -> Option<&Operation> {
        self.op.as_ref()
    }
}

impl Ledger {
    /// Create a fresh ledger with the protocol's alert and announcement
    /// channels.
    ///
    /// Returns the ledger and the events genesis emitted.
    pub fn genesis(
        config: LedgerConfig,
        caps: Capabilities,
        at: Height,
    ) -> Result<(Self, Vec<Event>)> {
        config.validate()?;

        let mut ledger = Self::restore(config, caps, LedgerState::default());
        let writes = ledger.stage("genesis", at, |_, txn| {
            let config = txn.config();
            txn.open_channel(
                config.alerter,
                ChannelType::NoFees,
                Bytes::from(config.alerter_metadata.clone()),
                0,
            )?;
            txn.open_channel(
                config.admin,
                ChannelType::NoFees,
                Bytes::from(config.admin_metadata.clone()),
                0,
            )
        })?;
        let staged = Staged {
            label: "genesis",
            op: None,
            at,
            revision: ledger.revision,
            writes,
        };
        let events = ledger.commit(staged)?;

        info!(admin = %ledger.config.admin, at, "ledger genesis");
        Ok((ledger, events))
    }

    /// Resume a ledger from previously committed state.
    pub fn restore(config: LedgerConfig, caps: Capabilities, state: LedgerState) -> Self {
        Self {
            config,
            caps,
            state,
            revision: 0,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// The committed state, for snapshots.
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Staging
    // ─────────────────────────────────────────────────────────────────────────

    /// Stage `op` at height `at` without committing it.
    ///
    /// Collaborator calls are made here. The returned [`Staged`] must be
    /// committed or aborted before any other operation is prepared.
    pub fn prepare(&self, op: Operation, at: Height) -> Result<Staged> {
        let label = op.name();
        let writes = self.stage(label, at, |caps, txn| stage_operation(&op, caps, txn))?;
        Ok(Staged {
            label,
            op: Some(op),
            at,
            revision: self.revision,
            writes,
        })
    }

    /// Apply a staged operation and return its events.
    ///
    /// Fails with [`LedgerError::Superseded`] if anything was committed since
    /// it was staged. The operation is then aborted.
    pub fn commit(&mut self, staged: Staged) -> Result<Vec<Event>> {
        if staged.revision != self.revision {
            warn!(op = staged.label, at = staged.at, "staged operation superseded");
            self.abort(staged);
            return Err(LedgerError::Superseded);
        }

        let Staged {
            label,
            op,
            at,
            writes,
            ..
        } = staged;
        let events = self.state.apply(writes, at);
        self.revision += 1;

        debug!(op = label, at, events = events.len(), "committed");
        if let Some(op) = &op {
            log_committed(op, at);
        }
        Ok(events)
    }

    /// Abandon a staged operation, reversing its asset movements.
    pub fn abort(&self, staged: Staged) {
        for settlement in staged.writes.settlements.iter().rev() {
            if let Err(e) = self.reverse(settlement) {
                error!(op = staged.label, ?settlement, error = %e, "failed to reverse settlement");
            }
        }
        warn!(op = staged.label, at = staged.at, "staged operation aborted");
    }

    /// Stage and commit `op` in one step.
    pub fn execute(&mut self, op: Operation, at: Height) -> Result<Vec<Event>> {
        let staged = self.prepare(op, at)?;
        self.commit(staged)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Channel Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a channel owned by `owner`, staking `contribution` into the pool.
    pub fn create_channel(
        &mut self,
        owner: Address,
        channel_type: ChannelType,
        metadata: impl Into<Bytes>,
        contribution: Amount,
        at: Height,
    ) -> Result<Vec<Event>> {
        let op = Operation::CreateChannel {
            owner,
            channel_type,
            metadata: metadata.into(),
            contribution,
        };
        self.execute(op, at)
    }

    /// Register `public_key` for `owner`, then create their channel.
    pub fn create_channel_with_public_key(
        &mut self,
        owner: Address,
        public_key: PublicKey,
        channel_type: ChannelType,
        metadata: impl Into<Bytes>,
        contribution: Amount,
        at: Height,
    ) -> Result<Vec<Event>> {
        let op = Operation::CreateChannelWithPublicKey {
            owner,
            public_key,
            channel_type,
            metadata: metadata.into(),
            contribution,
        };
        self.execute(op, at)
    }

    /// Create the protocol's promoter channel, funded by `payer`.
    pub fn create_promoter_channel(&mut self, payer: Address, at: Height) -> Result<Vec<Event>> {
        self.execute(Operation::CreatePromoterChannel { payer }, at)
    }

    /// Permanently deactivate the channel owned by `caller`.
    pub fn deactivate_channel(&mut self, caller: Address, at: Height) -> Result<Vec<Event>> {
        self.execute(Operation::DeactivateChannel { caller }, at)
    }

    /// Replace the metadata of `caller`'s channel.
    ///
    /// Only allowed while the owner is the channel's sole member.
    pub fn update_metadata(
        &mut self,
        caller: Address,
        metadata: impl Into<Bytes>,
        at: Height,
    ) -> Result<Vec<Event>> {
        let op = Operation::UpdateMetadata {
            caller,
            metadata: metadata.into(),
        };
        self.execute(op, at)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Membership Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Subscribe `subscriber` to `channel`.
    ///
    /// A graylisted subscriber may re-subscribe themselves.
    pub fn subscribe(
        &mut self,
        channel: Address,
        subscriber: Address,
        at: Height,
    ) -> Result<Vec<Event>> {
        self.execute(Operation::Subscribe { channel, subscriber }, at)
    }

    /// Register `public_key` for `subscriber`, then subscribe them.
    pub fn subscribe_with_public_key(
        &mut self,
        channel: Address,
        subscriber: Address,
        public_key: PublicKey,
        at: Height,
    ) -> Result<Vec<Event>> {
        let op = Operation::SubscribeWithPublicKey {
            channel,
            subscriber,
            public_key,
        };
        self.execute(op, at)
    }

    /// Subscribe `subscriber` to the channel owned by `caller`, charging
    /// `caller` the delegation fee.
    pub fn subscribe_delegated(
        &mut self,
        caller: Address,
        subscriber: Address,
        at: Height,
    ) -> Result<Vec<Event>> {
        self.execute(Operation::SubscribeDelegated { caller, subscriber }, at)
    }

    /// Register `public_key` for `subscriber`, then subscribe them to the
    /// channel owned by `caller` on the owner's dime.
    pub fn subscribe_with_public_key_delegated(
        &mut self,
        caller: Address,
        subscriber: Address,
        public_key: PublicKey,
        at: Height,
    ) -> Result<Vec<Event>> {
        let op = Operation::SubscribeWithPublicKeyDelegated {
            caller,
            subscriber,
            public_key,
        };
        self.execute(op, at)
    }

    /// Unsubscribe `subscriber` from `channel`, graylisting the pair.
    pub fn unsubscribe(
        &mut self,
        channel: Address,
        subscriber: Address,
        at: Height,
    ) -> Result<Vec<Event>> {
        self.execute(Operation::Unsubscribe { channel, subscriber }, at)
    }

    /// Register `public_key` for `address` without subscribing.
    pub fn broadcast_public_key(
        &mut self,
        address: Address,
        public_key: PublicKey,
        at: Height,
    ) -> Result<Vec<Event>> {
        self.execute(Operation::BroadcastPublicKey { address, public_key }, at)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn channel(&self, owner: &Address) -> Option<&Channel> {
        self.state.channels.get(owner)
    }

    pub fn user(&self, address: &Address) -> Option<&User> {
        self.state.users.get(address)
    }

    pub fn membership(&self, channel: Address, subscriber: Address) -> Membership {
        self.state.memberships.get(channel, subscriber)
    }

    /// Whether `subscriber` is currently a member of `channel`.
    pub fn member_exists(&self, subscriber: Address, channel: Address) -> bool {
        self.membership(channel, subscriber).is_member()
    }

    pub fn is_graylisted(&self, subscriber: Address, channel: Address) -> bool {
        self.membership(channel, subscriber).is_graylisted()
    }

    pub fn users_count(&self) -> usize {
        self.state.users.len()
    }

    pub fn channels_count(&self) -> usize {
        self.state.channels.len()
    }

    /// The `index`-th channel in creation order.
    pub fn channel_at(&self, index: usize) -> Option<&Channel> {
        self.state.channels.at(index)
    }

    /// The `index`-th user in activation order.
    pub fn user_at(&self, index: usize) -> Option<(&Address, &User)> {
        self.state.users.at(index)
    }

    pub fn pool(&self) -> &PoolLedger {
        &self.state.pool
    }

    pub fn fees(&self) -> &FeeLedger {
        &self.state.fees
    }

    pub fn channel_group(&self) -> &ChannelGroup {
        &self.state.group
    }

    pub fn last_height(&self) -> Height {
        self.state.last_height
    }

    /// Scaled share of the pool attributable to `owner`'s channel at `at`.
    pub fn channel_fair_share(&self, owner: &Address, at: Height) -> Result<u128> {
        let channel = self
            .channel(owner)
            .ok_or(LedgerError::NoSuchChannel(*owner))?;
        Ok(self
            .state
            .group
            .share_of(channel.start_block, channel.channel_weight, at)?)
    }

    /// Scaled share of `channel` attributable to `subscriber` at `at`.
    pub fn subscriber_fair_share(
        &self,
        channel: &Address,
        subscriber: &Address,
        at: Height,
    ) -> Result<u128> {
        let not_subscribed = || LedgerError::NotSubscribed {
            channel: *channel,
            subscriber: *subscriber,
        };
        let membership = self.membership(*channel, *subscriber);
        if !membership.is_member() {
            return Err(not_subscribed());
        }
        let record = self.channel(channel).ok_or_else(not_subscribed)?;
        Ok(record
            .fair_share
            .share_of(membership.member_last_update, at)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    /// Run `stage` against a fresh transaction at `at`.
    fn stage<F>(&self, op: &'static str, at: Height, stage: F) -> Result<WriteSet>
    where
        F: for<'s> FnOnce(&Capabilities, &mut Txn<'s>) -> Result<()>,
    {
        let staged = if at < self.state.last_height {
            Err(LedgerError::StaleHeight {
                last: self.state.last_height,
                got: at,
            })
        } else {
            let mut txn = Txn::begin(&self.state, &self.config, at);
            stage(&self.caps, &mut txn).map(|()| txn.into_writes())
        };

        staged.map_err(|e| {
            warn!(op, at, error = %e, "operation rejected");
            e
        })
    }

    fn reverse(&self, settlement: &Settlement) -> std::result::Result<(), CapabilityError> {
        let protocol = self.config.protocol;
        match *settlement {
            Settlement::Deposit {
                payer, receipts, ..
            } => {
                let principal = self.caps.vault.withdraw(&protocol, receipts)?;
                self.caps.assets.transfer_from(&protocol, &payer, principal)
            }
            Settlement::Fee { payer, amount } => {
                self.caps.assets.transfer_from(&protocol, &payer, amount)
            }
        }
    }
}

fn stage_operation(op: &Operation, caps: &Capabilities, txn: &mut Txn<'_>) -> Result<()> {
    match op {
        Operation::CreateChannel {
            owner,
            channel_type,
            metadata,
            contribution,
        } => {
            check_create(caps, txn, *owner, *channel_type, *contribution)?;
            txn.open_channel(*owner, *channel_type, metadata.clone(), *contribution)?;
            fund_pool(caps, txn, *owner, *contribution)
        }
        Operation::CreateChannelWithPublicKey {
            owner,
            public_key,
            channel_type,
            metadata,
            contribution,
        } => {
            txn.register_key(caps.keys.as_ref(), *owner, *public_key)?;
            check_create(caps, txn, *owner, *channel_type, *contribution)?;
            txn.open_channel(*owner, *channel_type, metadata.clone(), *contribution)?;
            fund_pool(caps, txn, *owner, *contribution)
        }
        Operation::CreatePromoterChannel { payer } => {
            let config = txn.config();
            if txn.channel(&config.protocol).is_some() {
                return Err(LedgerError::AlreadyPromoterChannel);
            }
            txn.open_channel(
                config.protocol,
                ChannelType::Promoter,
                Bytes::from(config.promoter_metadata.clone()),
                config.min_contribution,
            )?;
            fund_pool(caps, txn, *payer, config.min_contribution)
        }
        Operation::DeactivateChannel { caller } => txn.deactivate_channel(*caller),
        Operation::UpdateMetadata { caller, metadata } => {
            txn.update_metadata(*caller, metadata.clone())
        }
        Operation::Subscribe {
            channel,
            subscriber,
        } => {
            txn.check_subscribe(*channel, *subscriber, false)?;
            txn.add_member(*channel, *subscriber)
        }
        Operation::SubscribeWithPublicKey {
            channel,
            subscriber,
            public_key,
        } => {
            txn.register_key(caps.keys.as_ref(), *subscriber, *public_key)?;
            txn.check_subscribe(*channel, *subscriber, false)?;
            txn.add_member(*channel, *subscriber)
        }
        Operation::SubscribeDelegated { caller, subscriber } => {
            txn.check_subscribe(*caller, *subscriber, true)?;
            txn.add_member(*caller, *subscriber)?;
            charge_delegation_fee(caps, txn, *caller)
        }
        Operation::SubscribeWithPublicKeyDelegated {
            caller,
            subscriber,
            public_key,
        } => {
            txn.register_key(caps.keys.as_ref(), *subscriber, *public_key)?;
            txn.check_subscribe(*caller, *subscriber, true)?;
            txn.add_member(*caller, *subscriber)?;
            charge_delegation_fee(caps, txn, *caller)
        }
        Operation::Unsubscribe {
            channel,
            subscriber,
        } => txn.remove_member(*channel, *subscriber),
        Operation::BroadcastPublicKey {
            address,
            public_key,
        } => txn.register_key(caps.keys.as_ref(), *address, *public_key),
    }
}

fn log_committed(op: &Operation, at: Height) {
    match op {
        Operation::CreateChannel {
            owner,
            channel_type,
            contribution,
            ..
        }
        | Operation::CreateChannelWithPublicKey {
            owner,
            channel_type,
            contribution,
            ..
        } => info!(%owner, ?channel_type, contribution, at, "channel created"),
        Operation::CreatePromoterChannel { payer } => {
            info!(%payer, at, "promoter channel created")
        }
        Operation::DeactivateChannel { caller } => {
            info!(owner = %caller, at, "channel deactivated")
        }
        Operation::UpdateMetadata { caller, .. } => {
            info!(owner = %caller, at, "channel metadata updated")
        }
        Operation::Subscribe {
            channel,
            subscriber,
        }
        | Operation::SubscribeWithPublicKey {
            channel,
            subscriber,
            ..
        } => debug!(%channel, %subscriber, at, "subscribed"),
        Operation::SubscribeDelegated { caller, subscriber }
        | Operation::SubscribeWithPublicKeyDelegated {
            caller, subscriber, ..
        } => debug!(channel = %caller, %subscriber, at, "delegated subscribe"),
        Operation::Unsubscribe {
            channel,
            subscriber,
        } => debug!(%channel, %subscriber, at, "unsubscribed"),
        Operation::BroadcastPublicKey { address, .. } => {
            debug!(%address, at, "public key broadcast")
        }
    }
}

fn check_create(
    caps: &Capabilities,
    txn: &Txn<'_>,
    owner: Address,
    channel_type: ChannelType,
    contribution: Amount,
) -> Result<()> {
    let config = txn.config();
    if !caps.allow_list.is_whitelisted(&owner) {
        return Err(LedgerError::NotWhitelisted(owner));
    }
    if !channel_type.is_public() {
        return Err(LedgerError::InvalidChannelType(channel_type));
    }
    if txn.channel(&owner).is_some() {
        return Err(LedgerError::AlreadyChannelOwner(owner));
    }
    if !config.contribution_in_range(contribution) {
        return Err(LedgerError::ContributionOutOfRange {
            amount: contribution,
            min: config.min_contribution,
            max: config.max_contribution,
        });
    }
    Ok(())
}

/// Move `amount` from `payer` into the vault on the protocol's account.
///
/// If the vault refuses, the principal goes back to `payer`.
fn fund_pool(caps: &Capabilities, txn: &mut Txn<'_>, payer: Address, amount: Amount) -> Result<()> {
    let protocol = txn.config().protocol;
    caps.assets.transfer_from(&payer, &protocol, amount)?;

    match caps.vault.deposit(&protocol, amount) {
        Ok(receipts) => {
            if receipts != amount {
                warn!(amount, receipts, "vault receipts differ from principal");
            }
            txn.record_deposit(payer, amount, receipts);
            Ok(())
        }
        Err(e) => {
            if let Err(refund) = caps.assets.transfer_from(&protocol, &payer, amount) {
                error!(%payer, amount, error = %refund, "refund after vault rejection failed");
            }
            Err(e.into())
        }
    }
}

fn charge_delegation_fee(caps: &Capabilities, txn: &mut Txn<'_>, owner: Address) -> Result<()> {
    let config = txn.config();
    caps.assets
        .transfer_from(&owner, &config.protocol, config.delegation_fee)?;
    txn.record_fee(owner, config.delegation_fee);
    Ok(())
}
