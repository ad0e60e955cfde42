//! Directed connections between exchange items.

use crate::component::{write_component, SharedComponent, WeakComponent};
use crate::errors::{CouplingError, CouplingResult};
use crate::exchange::ExchangeItem;
use crate::time::Time;
use crate::values::ValueSet;
use log::warn;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier of a link.
pub type LinkId = String;

/// Identifier of the [`LinkManager`](crate::link_manager::LinkManager) owning a link.
pub type ManagerId = u64;

static NEXT_LINK_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_link_id() -> LinkId {
    format!("link-{}", NEXT_LINK_ID.fetch_add(1, Ordering::Relaxed))
}

/// One end of a link: a component and one of its exchange items.
///
/// The component is referenced weakly. For links attached to a group from the outside, the
/// component is the group while the item still names the child that owns it.
#[derive(Clone)]
pub struct LinkEndpoint {
    component_id: String,
    component: WeakComponent,
    item: ExchangeItem,
}

impl LinkEndpoint {
    pub fn new(component_id: &str, component: &SharedComponent, item: ExchangeItem) -> Self {
        Self {
            component_id: component_id.to_string(),
            component: Arc::downgrade(component),
            item,
        }
    }

    /// Identifier of the component the link is attached to.
    pub fn component_id(&self) -> &str {
        &self.component_id
    }

    pub fn item(&self) -> &ExchangeItem {
        &self.item
    }

    /// The component, if it is still alive.
    pub fn resolve(&self) -> Option<SharedComponent> {
        self.component.upgrade()
    }
}

impl fmt::Debug for LinkEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkEndpoint")
            .field("component_id", &self.component_id)
            .field("item", &self.item.to_string())
            .field("alive", &(self.component.strong_count() > 0))
            .finish()
    }
}

/// A directed connection from an output item to an input item.
///
/// Links are created and owned by a [`LinkManager`](crate::link_manager::LinkManager).
/// Components receive clones of the link when it is connected; two links are equal if they
/// share an id.
#[derive(Debug, Clone)]
pub struct Link {
    id: LinkId,
    caption: String,
    description: String,
    owner: ManagerId,
    source: Option<LinkEndpoint>,
    target: Option<LinkEndpoint>,
}

impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Link {}

impl Link {
    pub(crate) fn new(id: LinkId, caption: String, owner: ManagerId) -> Self {
        Self {
            id,
            caption,
            description: String::new(),
            owner,
            source: None,
            target: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn set_caption(&mut self, caption: &str) {
        self.caption = caption.to_string();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
    }

    /// The manager that created the link.
    pub fn owner(&self) -> ManagerId {
        self.owner
    }

    pub fn source(&self) -> Option<&LinkEndpoint> {
        self.source.as_ref()
    }

    pub fn target(&self) -> Option<&LinkEndpoint> {
        self.target.as_ref()
    }

    pub fn source_item(&self) -> Option<&ExchangeItem> {
        self.source.as_ref().map(|s| s.item())
    }

    pub fn target_item(&self) -> Option<&ExchangeItem> {
        self.target.as_ref().map(|t| t.item())
    }

    pub fn is_connected(&self) -> bool {
        self.source.is_some() && self.target.is_some()
    }

    /// Attach the link to its endpoints and notify both components.
    ///
    /// A link that is already connected is reset first. If either component refuses the link,
    /// the other is told to forget it again and the link is left unconnected.
    pub fn connect(&mut self, source: LinkEndpoint, target: LinkEndpoint) -> CouplingResult<()> {
        if self.is_connected() {
            self.reset();
        }
        let source_component = self.resolve_endpoint(&source)?;
        let target_component = self.resolve_endpoint(&target)?;
        self.source = Some(source);
        self.target = Some(target);

        let notified =
            write_component(&source_component).and_then(|mut c| c.add_link(self.clone()));
        if let Err(e) = notified {
            self.source = None;
            self.target = None;
            return Err(e);
        }
        let notified =
            write_component(&target_component).and_then(|mut c| c.add_link(self.clone()));
        if let Err(e) = notified {
            match write_component(&source_component) {
                Ok(mut component) => component.remove_link(&self.id),
                Err(err) => warn!("Could not detach link '{}': {}", self.id, err),
            }
            self.source = None;
            self.target = None;
            return Err(e);
        }
        Ok(())
    }

    fn resolve_endpoint(&self, endpoint: &LinkEndpoint) -> CouplingResult<SharedComponent> {
        endpoint.resolve().ok_or_else(|| {
            CouplingError::link_resolution(
                &self.id,
                format!("component '{}' no longer exists", endpoint.component_id()),
            )
        })
    }

    /// Notify both endpoints that the link is going away and detach it.
    pub fn reset(&mut self) {
        for endpoint in [self.source.take(), self.target.take()].into_iter().flatten() {
            let Some(component) = endpoint.resolve() else {
                continue;
            };
            match write_component(&component) {
                Ok(mut component) => component.remove_link(&self.id),
                Err(e) => warn!("Could not detach link '{}': {}", self.id, e),
            };
        }
    }

    /// Ask the source component for its values at `time`.
    pub fn fetch_values(&self, time: &Time) -> CouplingResult<ValueSet> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| CouplingError::link_resolution(&self.id, "link has no source"))?;
        let component = source.resolve().ok_or_else(|| {
            CouplingError::link_resolution(
                &self.id,
                format!("component '{}' no longer exists", source.component_id()),
            )
        })?;
        let mut component = write_component(&component)?;
        component.get_values(time, &self.id)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, &self.target) {
            (Some(source), Some(target)) => write!(
                f,
                "{} ({}: {} -> {})",
                self.caption,
                self.id,
                source.item(),
                target.item()
            ),
            _ => write!(f, "{} ({}: unconnected)", self.caption, self.id),
        }
    }
}
