//! Ownership and bookkeeping of links.

use crate::component::ComponentId;
use crate::errors::{CouplingError, CouplingResult};
use crate::exchange::ExchangeItem;
use crate::link::{next_link_id, Link, LinkId, ManagerId};
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

/// The sole owner of a set of links.
///
/// A link only exists once it has been registered with the manager that created it. Removing a
/// link resets it, so both endpoints are notified before it is discarded.
#[derive(Debug)]
pub struct LinkManager {
    id: ManagerId,
    links: Vec<Link>,
    /// Number used for the next default caption
    caption_counter: usize,
}

impl Default for LinkManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkManager {
    pub fn new() -> Self {
        Self {
            id: NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed),
            links: Vec::new(),
            caption_counter: 1,
        }
    }

    pub fn id(&self) -> ManagerId {
        self.id
    }

    /// Create a new, unconnected link owned by this manager.
    ///
    /// The link is not registered until it is passed to [`LinkManager::add_link`].
    pub fn create_link(&mut self) -> Link {
        let caption = format!("Link {}", self.caption_counter);
        self.caption_counter += 1;
        Link::new(next_link_id(), caption, self.id)
    }

    /// Register a link created by this manager.
    pub fn add_link(&mut self, link: Link) -> CouplingResult<()> {
        if link.owner() != self.id {
            return Err(CouplingError::configuration(format!(
                "Link '{}' is owned by another link manager",
                link.id()
            )));
        }
        if self.links.contains(&link) {
            return Err(CouplingError::configuration(format!(
                "Link '{}' has already been added",
                link.id()
            )));
        }
        debug!("Registered {}", link);
        self.links.push(link);
        Ok(())
    }

    /// Reset and discard a link. Returns false if the link is unknown.
    pub fn remove(&mut self, link: &Link) -> bool {
        self.remove_by_id(link.id())
    }

    /// Reset and discard the link with the given id. Returns false if it is unknown.
    pub fn remove_by_id(&mut self, link_id: &str) -> bool {
        match self.links.iter().position(|l| l.id() == link_id) {
            Some(position) => {
                let mut link = self.links.remove(position);
                debug!("Removing {}", link);
                link.reset();
                true
            }
            None => false,
        }
    }

    /// Remove the link feeding an input item, if there is one.
    ///
    /// Called before a new link into the item is created so that every input has at most one
    /// source.
    pub fn remove_link_to_target(&mut self, item: &ExchangeItem) -> Option<LinkId> {
        let link_id = self.link_to(item)?.id().to_string();
        self.remove_by_id(&link_id);
        Some(link_id)
    }

    /// Remove every link with an endpoint on the given component.
    ///
    /// Returns the number of links removed.
    pub fn remove_links_to_component(&mut self, component_id: &str) -> usize {
        let attached: Vec<LinkId> = self
            .links
            .iter()
            .filter(|l| touches(l, component_id))
            .map(|l| l.id().to_string())
            .collect();
        for link_id in attached.iter() {
            self.remove_by_id(link_id);
        }
        attached.len()
    }

    /// Returns true if a registered link targets the input item.
    pub fn contains_link_to(&self, item: &ExchangeItem) -> bool {
        self.link_to(item).is_some()
    }

    /// The registered link targeting an input item.
    pub fn link_to(&self, item: &ExchangeItem) -> Option<&Link> {
        self.links
            .iter()
            .find(|l| l.target_item().is_some_and(|target| target.same_slot(item)))
    }

    pub fn get_link(&self, link_id: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.id() == link_id)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Components at either end of a registered link.
    pub fn linked_components(&self) -> Vec<(ComponentId, ComponentId)> {
        self.links
            .iter()
            .filter_map(|l| {
                Some((
                    l.source_item()?.component.clone(),
                    l.target_item()?.component.clone(),
                ))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

fn touches(link: &Link, component_id: &str) -> bool {
    [link.source(), link.target()].into_iter().flatten().any(|endpoint| {
        endpoint.component_id() == component_id || endpoint.item().component == component_id
    })
}
