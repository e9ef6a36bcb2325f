//! Channel registry and channel lifecycle operations.

use std::collections::BTreeMap;

use bytes::Bytes;
use herald_core::{channel_weight, Address, Amount, Channel, ChannelType, Event, MemberAction};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::state::entries;
use crate::txn::Txn;

/// Channels keyed by owner, with creation order for enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRegistry {
    #[serde(with = "entries")]
    channels: BTreeMap<Address, Channel>,
    order: Vec<Address>,
}

impl ChannelRegistry {
    pub fn get(&self, owner: &Address) -> Option<&Channel> {
        self.channels.get(owner)
    }

    /// The `index`-th channel ever created.
    pub fn at(&self, index: usize) -> Option<&Channel> {
        self.order.get(index).and_then(|owner| self.channels.get(owner))
    }

    /// Number of channels ever created. Deactivation does not reduce it.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.order.iter().filter_map(|owner| self.channels.get(owner))
    }

    pub(crate) fn put(&mut self, owner: Address, channel: Channel) {
        self.channels.insert(owner, channel);
    }

    pub(crate) fn extend_order(&mut self, created: Vec<Address>) {
        self.order.extend(created);
    }
}

impl Txn<'_> {
    /// Stage a new channel for `owner` funded with `contribution`.
    ///
    /// Preconditions are the caller's concern. This joins the channel group,
    /// subscribes the owner to the alert channel and to the new channel, and
    /// emits `ChannelAdded` last.
    pub(crate) fn open_channel(
        &mut self,
        owner: Address,
        channel_type: ChannelType,
        metadata: Bytes,
        contribution: Amount,
    ) -> Result<()> {
        let at = self.at();
        let weight = channel_weight(contribution, self.config().min_contribution)?;

        let group = self.group().rolled(MemberAction::Added, weight, at)?;
        self.set_group(group);

        self.activate_user(owner).channellized = true;
        self.insert_channel(Channel::new(
            owner,
            channel_type,
            metadata.clone(),
            contribution,
            weight,
            at,
        ));

        let alerter = self.config().alerter;
        if owner != alerter && !self.membership(alerter, owner).is_member() {
            self.add_member(alerter, owner)?;
        }
        self.add_member(owner, owner)?;

        self.emit(Event::ChannelAdded {
            owner,
            channel_type,
            metadata,
        });
        Ok(())
    }

    /// Stage deactivation of the channel owned by `owner`.
    pub(crate) fn deactivate_channel(&mut self, owner: Address) -> Result<()> {
        let channel = self
            .channel_mut(&owner)
            .filter(|c| c.is_active())
            .ok_or(LedgerError::ChannelInactive(owner))?;
        channel.deactivated = true;

        self.emit(Event::ChannelDeactivated { owner });
        Ok(())
    }

    /// Stage a metadata update for the channel owned by `owner`.
    pub(crate) fn update_metadata(&mut self, owner: Address, metadata: Bytes) -> Result<()> {
        let at = self.at();
        let channel = self
            .channel_mut(&owner)
            .ok_or(LedgerError::NoSuchChannel(owner))?;
        if !channel.is_active() {
            return Err(LedgerError::ChannelInactive(owner));
        }
        if channel.has_external_subscribers() {
            return Err(LedgerError::MetadataLockedBySubscribers(owner));
        }

        channel.metadata = metadata.clone();
        channel.update_block = at;

        self.emit(Event::ChannelMetadataUpdated { owner, metadata });
        Ok(())
    }
}
