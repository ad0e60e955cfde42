//! Aggregation of components behind a single linkable facade.
//!
//! A [`ComponentGroup`] owns a set of member components and the links between them. To the
//! outside it looks like one component: it exposes every output of its members, and every
//! member input that is not already fed by an internal link. Links made by the outside world
//! against those exposed items are forwarded to the member that owns them.

use crate::component::{
    read_component, write_component, Arguments, ComponentId, ComponentLinks, LinkableComponent,
    SharedComponent,
};
use crate::errors::{CouplingError, CouplingResult};
use crate::exchange::{ExchangeItem, ItemRole, LinkCompatibility, MatchingQuantity};
use crate::link::{Link, LinkEndpoint, LinkId};
use crate::link_manager::LinkManager;
use crate::time::{Instant, Time, TimeHorizon};
use crate::values::ValueSet;
use log::{debug, error, warn};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

#[derive(Debug)]
struct Member {
    id: ComponentId,
    component: SharedComponent,
}

/// A set of components which are linked together and exposed as one component.
#[derive(Debug)]
pub struct ComponentGroup {
    id: ComponentId,
    caption: String,
    members: Vec<Member>,
    /// Links between members
    link_manager: LinkManager,
    /// Links between the group and the outside world
    external_links: ComponentLinks,
    compatibility: Box<dyn LinkCompatibility>,
    inputs: Vec<ExchangeItem>,
    outputs: Vec<ExchangeItem>,
    updating: bool,
    dirty: bool,
}

impl ComponentGroup {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            caption: id.to_string(),
            members: vec![],
            link_manager: LinkManager::new(),
            external_links: ComponentLinks::new(),
            compatibility: Box::new(MatchingQuantity),
            inputs: vec![],
            outputs: vec![],
            updating: false,
            dirty: false,
        }
    }

    pub fn with_caption(mut self, caption: &str) -> Self {
        self.caption = caption.to_string();
        self
    }

    /// Replace the check used to decide whether two items may be linked.
    pub fn set_compatibility(&mut self, compatibility: Box<dyn LinkCompatibility>) {
        self.compatibility = compatibility;
    }

    /// Identifiers of the members in the order they were added.
    pub fn member_ids(&self) -> Vec<ComponentId> {
        self.members.iter().map(|m| m.id.clone()).collect()
    }

    pub fn component(&self, component_id: &str) -> Option<SharedComponent> {
        self.members
            .iter()
            .find(|m| m.id == component_id)
            .map(|m| m.component.clone())
    }

    pub fn contains_component(&self, component_id: &str) -> bool {
        self.members.iter().any(|m| m.id == component_id)
    }

    pub fn link_manager(&self) -> &LinkManager {
        &self.link_manager
    }

    pub(crate) fn link_manager_mut(&mut self) -> &mut LinkManager {
        &mut self.link_manager
    }

    /// Links between the group and components outside of it.
    pub fn external_links(&self) -> &ComponentLinks {
        &self.external_links
    }

    pub fn add_component(&mut self, component: SharedComponent) -> CouplingResult<()> {
        let component_id = read_component(&component)?.component_id().to_string();
        if component_id == self.id || self.contains_component(&component_id) {
            return Err(CouplingError::configuration(format!(
                "Group '{}' already contains a component with id '{}'",
                self.id, component_id
            )));
        }
        debug!("Adding '{}' to group '{}'", component_id, self.id);
        self.members.push(Member {
            id: component_id,
            component,
        });
        self.mark_dirty()
    }

    /// Remove a member together with every link attached to it.
    ///
    /// Returns false if the component is not a member.
    pub fn remove_component(&mut self, component_id: &str) -> CouplingResult<bool> {
        let Some(position) = self.members.iter().position(|m| m.id == component_id) else {
            return Ok(false);
        };

        let removed = self.link_manager.remove_links_to_component(component_id);
        debug!(
            "Removed {} internal links while removing '{}' from group '{}'",
            removed, component_id, self.id
        );

        let member = &self.members[position];
        let mut attached = vec![];
        for link in self.external_links.iter() {
            if let Some(item) = self.group_side_item(link) {
                if item.component == member.id || owns_item(&member.component, item)? {
                    attached.push(link.id().to_string());
                }
            }
        }
        for link_id in attached {
            self.detach_external_link(&link_id);
        }

        self.members.remove(position);
        self.mark_dirty()?;
        Ok(true)
    }

    /// Start a batch of changes. Exchange items are rebuilt once, when the batch ends.
    pub fn begin_update(&mut self) {
        self.updating = true;
    }

    /// End a batch of changes, rebuilding the exchange items if anything changed.
    pub fn end_update(&mut self) -> CouplingResult<()> {
        self.updating = false;
        if self.dirty {
            self.update_exchange_items()?;
        }
        Ok(())
    }

    fn mark_dirty(&mut self) -> CouplingResult<()> {
        self.dirty = true;
        if self.updating {
            return Ok(());
        }
        self.update_exchange_items()
    }

    /// Bring the exposed items up to date before answering a query.
    fn refresh(&mut self) {
        if let Err(e) = self.end_update() {
            error!("Failed to update exchange items of group '{}': {}", self.id, e);
        }
    }

    /// Recompute the exposed exchange items.
    ///
    /// Every member output is exposed. A member input is exposed only if no internal link feeds
    /// it. External links into an input that has since been linked internally are torn down.
    pub fn update_exchange_items(&mut self) -> CouplingResult<()> {
        let mut inputs = vec![];
        let mut outputs = vec![];
        for member in self.members.iter() {
            let mut component = write_component(&member.component)?;
            outputs.extend(component.output_exchange_items());
            inputs.extend(
                component
                    .input_exchange_items()
                    .into_iter()
                    .filter(|item| !self.link_manager.contains_link_to(item)),
            );
        }
        self.inputs = inputs;
        self.outputs = outputs;
        self.dirty = false;

        let superseded: Vec<LinkId> = self
            .external_links
            .iter()
            .filter(|link| {
                self.group_side_item(link).is_some_and(|item| {
                    item.role == ItemRole::Input && self.link_manager.contains_link_to(item)
                })
            })
            .map(|link| link.id().to_string())
            .collect();
        for link_id in superseded {
            warn!(
                "External link '{}' into group '{}' is replaced by an internal link",
                link_id, self.id
            );
            self.detach_external_link(&link_id);
        }

        debug!(
            "Group '{}' exposes {} inputs and {} outputs",
            self.id,
            self.inputs.len(),
            self.outputs.len()
        );
        Ok(())
    }

    /// Link an output of one member to an input of another.
    ///
    /// Any existing internal link into the same input is replaced.
    pub fn create_link(
        &mut self,
        source_id: &str,
        source_item: &ExchangeItem,
        target_id: &str,
        target_item: &ExchangeItem,
    ) -> CouplingResult<LinkId> {
        let source = self.member(source_id)?;
        let target = self.member(target_id)?;

        let source_item = find_item(&source, ItemRole::Output, source_item)?.ok_or_else(|| {
            CouplingError::configuration(format!(
                "'{}' has no output {}",
                source_id, source_item
            ))
        })?;
        let target_item = find_item(&target, ItemRole::Input, target_item)?.ok_or_else(|| {
            CouplingError::configuration(format!(
                "'{}' has no input {}",
                target_id, target_item
            ))
        })?;

        if !self.compatibility.is_compatible(&source_item, &target_item) {
            return Err(CouplingError::configuration(format!(
                "{} cannot provide values for {}",
                source_item, target_item
            )));
        }

        let mut link = self.link_manager.create_link();
        link.connect(
            LinkEndpoint::new(source_id, &source, source_item),
            LinkEndpoint::new(target_id, &target, target_item.clone()),
        )?;
        // The previous source is only dropped once the new one is attached
        if let Some(replaced) = self.link_manager.remove_link_to_target(&target_item) {
            debug!("Link '{}' into {} was replaced", replaced, target_item);
        }
        let link_id = link.id().to_string();
        self.link_manager.add_link(link)?;
        self.mark_dirty()?;
        Ok(link_id)
    }

    /// Link two members by the ids of the exchanged quantities.
    pub fn create_link_by_quantity(
        &mut self,
        source_id: &str,
        source_quantity: &str,
        target_id: &str,
        target_quantity: &str,
    ) -> CouplingResult<LinkId> {
        let source_item = self.item_by_quantity(source_id, ItemRole::Output, source_quantity)?;
        let target_item = self.item_by_quantity(target_id, ItemRole::Input, target_quantity)?;
        self.create_link(source_id, &source_item, target_id, &target_item)
    }

    /// Remove an internal link. Returns false if it does not exist.
    pub fn destroy_link(&mut self, link_id: &str) -> CouplingResult<bool> {
        let removed = self.link_manager.remove_by_id(link_id);
        if removed {
            self.mark_dirty()?;
        }
        Ok(removed)
    }

    /// Answer a request made through an external link by asking the member that owns the
    /// link's source item.
    pub fn get_values_hook(&mut self, time: &Time, link_id: &str) -> CouplingResult<ValueSet> {
        let source_item = self
            .external_links
            .get(link_id)
            .and_then(|link| link.source_item())
            .cloned()
            .ok_or_else(|| {
                CouplingError::link_resolution(
                    link_id,
                    format!("link is not attached to group '{}'", self.id),
                )
            })?;
        let owner = self.owner_of(&source_item)?.ok_or_else(|| {
            CouplingError::link_resolution(
                link_id,
                format!("no member of group '{}' provides {}", self.id, source_item),
            )
        })?;
        let mut component = write_component(&owner)?;
        component.get_values(time, link_id)
    }

    /// Graphviz representation of the members and the links between them.
    pub fn as_dot(&self) -> CouplingResult<String> {
        let mut graph: DiGraph<String, String> = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
        for member in self.members.iter() {
            let caption = read_component(&member.component)?.caption().to_string();
            nodes.insert(member.id.as_str(), graph.add_node(caption));
        }
        for link in self.link_manager.links() {
            let (Some(source), Some(target)) = (link.source(), link.target()) else {
                continue;
            };
            if let (Some(a), Some(b)) = (
                nodes.get(source.component_id()),
                nodes.get(target.component_id()),
            ) {
                graph.add_edge(*a, *b, source.item().quantity.id.clone());
            }
        }

        let dot = Dot::with_attr_getters(
            &graph,
            &[Config::NodeNoLabel, Config::EdgeNoLabel],
            &|_, er| format!("label = {:?}", er.weight()),
            &|_, (_, caption)| format!("label = {:?}", caption),
        );
        Ok(format!("{:?}", dot))
    }

    fn member(&self, component_id: &str) -> CouplingResult<SharedComponent> {
        self.component(component_id).ok_or_else(|| {
            CouplingError::configuration(format!(
                "'{}' is not a member of group '{}'",
                component_id, self.id
            ))
        })
    }

    fn item_by_quantity(
        &self,
        component_id: &str,
        role: ItemRole,
        quantity: &str,
    ) -> CouplingResult<ExchangeItem> {
        let component = self.member(component_id)?;
        let mut component = write_component(&component)?;
        let items = match role {
            ItemRole::Input => component.input_exchange_items(),
            ItemRole::Output => component.output_exchange_items(),
        };
        items
            .into_iter()
            .find(|item| item.quantity.id == quantity)
            .ok_or_else(|| {
                CouplingError::configuration(format!(
                    "'{}' has no {:?} item for quantity '{}'",
                    component_id, role, quantity
                ))
            })
    }

    /// The member owning an item, either directly or through a nested group.
    fn owner_of(&self, item: &ExchangeItem) -> CouplingResult<Option<SharedComponent>> {
        if let Some(component) = self.component(&item.component) {
            return Ok(Some(component));
        }
        for member in self.members.iter() {
            if owns_item(&member.component, item)? {
                return Ok(Some(member.component.clone()));
            }
        }
        Ok(None)
    }

    /// The item of an external link on this group's side.
    fn group_side_item<'a>(&self, link: &'a Link) -> Option<&'a ExchangeItem> {
        match (link.source(), link.target()) {
            (_, Some(target)) if target.component_id() == self.id => Some(target.item()),
            (Some(source), _) if source.component_id() == self.id => Some(source.item()),
            _ => None,
        }
    }

    /// Forget an external link and tell the member and the far endpoint about it.
    ///
    /// The group's own lock is never taken, so this is safe to call while it is held.
    fn detach_external_link(&mut self, link_id: &str) {
        let Some(link) = self.external_links.remove(link_id) else {
            return;
        };
        for endpoint in [link.source(), link.target()].into_iter().flatten() {
            let component = if endpoint.component_id() == self.id {
                match self.owner_of(endpoint.item()) {
                    Ok(owner) => owner,
                    Err(e) => {
                        warn!("Could not detach link '{}': {}", link_id, e);
                        None
                    }
                }
            } else {
                endpoint.resolve()
            };
            if let Some(component) = component {
                match write_component(&component) {
                    Ok(mut component) => component.remove_link(link_id),
                    Err(e) => warn!("Could not detach link '{}': {}", link_id, e),
                }
            }
        }
    }
}

/// Look up the item in a component's exchange items, returning the component's own copy.
fn find_item(
    component: &SharedComponent,
    role: ItemRole,
    item: &ExchangeItem,
) -> CouplingResult<Option<ExchangeItem>> {
    let mut component = write_component(component)?;
    let items = match role {
        ItemRole::Input => component.input_exchange_items(),
        ItemRole::Output => component.output_exchange_items(),
    };
    Ok(items.into_iter().find(|i| i.same_slot(item)))
}

fn owns_item(component: &SharedComponent, item: &ExchangeItem) -> CouplingResult<bool> {
    Ok(find_item(component, item.role, item)?.is_some())
}

impl LinkableComponent for ComponentGroup {
    fn component_id(&self) -> &str {
        &self.id
    }

    fn caption(&self) -> &str {
        &self.caption
    }

    fn initialize(&mut self, arguments: &Arguments) -> CouplingResult<()> {
        for member in self.members.iter() {
            write_component(&member.component)?.initialize(arguments)?;
        }
        self.refresh();
        Ok(())
    }

    fn prepare(&mut self) -> CouplingResult<()> {
        self.end_update()?;
        for member in self.members.iter() {
            write_component(&member.component)?.prepare()?;
        }
        Ok(())
    }

    fn get_values(&mut self, time: &Time, link_id: &str) -> CouplingResult<ValueSet> {
        self.get_values_hook(time, link_id)
    }

    fn add_link(&mut self, link: Link) -> CouplingResult<()> {
        self.refresh();
        let item = self.group_side_item(&link).cloned().ok_or_else(|| {
            CouplingError::configuration(format!(
                "Link '{}' has no endpoint on group '{}'",
                link.id(),
                self.id
            ))
        })?;
        if item.role == ItemRole::Input && self.link_manager.contains_link_to(&item) {
            return Err(CouplingError::configuration(format!(
                "{} is already linked inside group '{}'",
                item, self.id
            )));
        }
        let owner = self.owner_of(&item)?.ok_or_else(|| {
            CouplingError::configuration(format!(
                "No member of group '{}' owns {}",
                self.id, item
            ))
        })?;
        write_component(&owner)?.add_link(link.clone())?;
        self.external_links.add(link);
        Ok(())
    }

    fn remove_link(&mut self, link_id: &str) {
        let Some(link) = self.external_links.remove(link_id) else {
            return;
        };
        let Some(item) = self.group_side_item(&link) else {
            return;
        };
        match self.owner_of(item) {
            Ok(Some(owner)) => match write_component(&owner) {
                Ok(mut owner) => owner.remove_link(link_id),
                Err(e) => warn!("Could not detach link '{}': {}", link_id, e),
            },
            Ok(None) => {}
            Err(e) => warn!("Could not detach link '{}': {}", link_id, e),
        }
    }

    fn finish(&mut self) -> CouplingResult<()> {
        for member in self.members.iter() {
            write_component(&member.component)?.finish()?;
        }
        Ok(())
    }

    fn input_exchange_item_count(&mut self) -> usize {
        self.refresh();
        self.inputs.len()
    }

    fn input_exchange_item(&mut self, index: usize) -> Option<ExchangeItem> {
        self.refresh();
        self.inputs.get(index).cloned()
    }

    fn output_exchange_item_count(&mut self) -> usize {
        self.refresh();
        self.outputs.len()
    }

    fn output_exchange_item(&mut self, index: usize) -> Option<ExchangeItem> {
        self.refresh();
        self.outputs.get(index).cloned()
    }

    /// The span all members can provide values for.
    ///
    /// Disagreeing members produce an inverted horizon, which is reported as is.
    fn time_horizon(&self) -> Option<TimeHorizon> {
        self.members
            .iter()
            .filter_map(|m| read_component(&m.component).ok()?.time_horizon())
            .reduce(|a, b| a.intersect(&b))
    }

    /// The latest of the members' earliest input times.
    fn earliest_input_time(&self) -> Option<Instant> {
        self.members
            .iter()
            .filter_map(|m| read_component(&m.component).ok()?.earliest_input_time())
            .reduce(|a, b| if b.days() > a.days() { b } else { a })
    }

    fn validate(&mut self) -> String {
        self.refresh();
        let mut diagnostics = String::new();
        for member in self.members.iter() {
            match write_component(&member.component) {
                Ok(mut component) => diagnostics.push_str(&component.validate()),
                Err(e) => diagnostics.push_str(&format!("{}\n", e)),
            }
        }
        for item in self.inputs.iter() {
            if self.external_links.incoming_to(item).is_none() {
                diagnostics.push_str(&format!(
                    "Group '{}': input {} is not connected\n",
                    self.id, item
                ));
            }
        }
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::into_shared;
    use crate::example_components::{flow_input, flow_output, output, ConstantComponent, PassThrough};
    use std::sync::{Arc, RwLock};

    /// A (flow) -> B (flow -> result), not yet linked
    fn a_and_b() -> ComponentGroup {
        let mut group = ComponentGroup::new("G");
        group
            .add_component(into_shared(ConstantComponent::new("A", 4.0)))
            .unwrap();
        group
            .add_component(into_shared(PassThrough::with_output("B", "result")))
            .unwrap();
        group
    }

    #[test]
    fn internally_linked_inputs_are_hidden() {
        let mut group = a_and_b();
        assert_eq!(group.input_exchange_item_count(), 1);
        assert_eq!(group.output_exchange_item_count(), 2);

        let link_id = group
            .create_link("A", &flow_output("A"), "B", &flow_input("B"))
            .unwrap();
        assert_eq!(group.input_exchange_item_count(), 0);
        let outputs = group.output_exchange_items();
        assert_eq!(outputs.len(), 2);
        assert!(outputs.contains(&flow_output("A")));
        assert!(outputs.contains(&output("B", "result")));

        assert!(group.destroy_link(&link_id).unwrap());
        assert_eq!(group.input_exchange_items(), vec![flow_input("B")]);
        assert!(!group.destroy_link(&link_id).unwrap());
    }

    #[test]
    fn links_by_quantity() {
        let mut group = a_and_b();
        group.create_link_by_quantity("A", "flow", "B", "flow").unwrap();
        assert_eq!(group.link_manager().len(), 1);

        let res = group.create_link_by_quantity("A", "rain", "B", "flow");
        assert!(matches!(res, Err(CouplingError::Configuration(_))));
    }

    #[test]
    fn duplicate_members_are_rejected() {
        let mut group = a_and_b();
        let res = group.add_component(into_shared(ConstantComponent::new("A", 1.0)));
        assert!(matches!(res, Err(CouplingError::Configuration(_))));
        assert_eq!(group.member_ids(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn invalid_links_are_rejected() {
        let mut group = a_and_b();
        group
            .add_component(into_shared(PassThrough::new("C")))
            .unwrap();

        // Incompatible quantities
        let res = group.create_link("B", &output("B", "result"), "C", &flow_input("C"));
        assert!(matches!(res, Err(CouplingError::Configuration(_))));
        // Unknown member
        let res = group.create_link("X", &flow_output("X"), "C", &flow_input("C"));
        assert!(matches!(res, Err(CouplingError::Configuration(_))));
        // Item the component does not have
        let res = group.create_link("A", &output("A", "rain"), "C", &flow_input("C"));
        assert!(matches!(res, Err(CouplingError::Configuration(_))));

        assert!(group.link_manager().is_empty());
        assert_eq!(group.input_exchange_item_count(), 2);
    }

    #[test]
    fn new_link_replaces_the_existing_source() {
        let mut group = a_and_b();
        group
            .add_component(into_shared(ConstantComponent::new("Z", 9.0)))
            .unwrap();

        let first = group
            .create_link("A", &flow_output("A"), "B", &flow_input("B"))
            .unwrap();
        let second = group
            .create_link("Z", &flow_output("Z"), "B", &flow_input("B"))
            .unwrap();

        assert_eq!(group.link_manager().len(), 1);
        assert!(group.link_manager().get_link(&first).is_none());
        assert!(group.link_manager().get_link(&second).is_some());

        let b = group.component("B").unwrap();
        let values = b
            .write()
            .unwrap()
            .get_values(&Time::instant(0.0), "out")
            .unwrap();
        assert_eq!(values.scalar(0), Some(9.0));
    }

    #[test]
    fn outside_consumers_are_served_by_the_owning_member() {
        let group = Arc::new(RwLock::new(a_and_b()));
        let shared: SharedComponent = group.clone();
        let consumer = into_shared(PassThrough::new("Y"));

        let mut outer = LinkManager::new();
        let mut link = outer.create_link();
        link.connect(
            LinkEndpoint::new("G", &shared, flow_output("A")),
            LinkEndpoint::new("Y", &consumer, flow_input("Y")),
        )
        .unwrap();
        outer.add_link(link).unwrap();

        assert_eq!(group.read().unwrap().external_links().len(), 1);
        let values = consumer
            .write()
            .unwrap()
            .get_values(&Time::instant(1.0), "out")
            .unwrap();
        assert_eq!(values.scalar(0), Some(4.0));

        let res = group
            .write()
            .unwrap()
            .get_values_hook(&Time::instant(1.0), "unknown");
        assert!(matches!(res, Err(CouplingError::LinkResolution { .. })));
    }

    #[test]
    fn internal_links_tear_down_external_ones() {
        let group = Arc::new(RwLock::new(a_and_b()));
        let shared: SharedComponent = group.clone();
        let outside = Arc::new(RwLock::new(ConstantComponent::new("X", 7.0)));
        let outside_shared: SharedComponent = outside.clone();

        let mut outer = LinkManager::new();
        let mut link = outer.create_link();
        link.connect(
            LinkEndpoint::new("X", &outside_shared, flow_output("X")),
            LinkEndpoint::new("G", &shared, flow_input("B")),
        )
        .unwrap();
        outer.add_link(link).unwrap();

        let b = group.read().unwrap().component("B").unwrap();
        let values = b
            .write()
            .unwrap()
            .get_values(&Time::instant(0.0), "out")
            .unwrap();
        assert_eq!(values.scalar(0), Some(7.0));
        assert_eq!(outside.read().unwrap().link_count(), 1);

        group
            .write()
            .unwrap()
            .create_link("A", &flow_output("A"), "B", &flow_input("B"))
            .unwrap();

        assert!(group.read().unwrap().external_links().is_empty());
        assert_eq!(outside.read().unwrap().link_count(), 0);
        let values = b
            .write()
            .unwrap()
            .get_values(&Time::instant(0.0), "out")
            .unwrap();
        assert_eq!(values.scalar(0), Some(4.0));
    }

    #[test]
    fn external_links_into_linked_inputs_are_rejected() {
        let group = Arc::new(RwLock::new(a_and_b()));
        let shared: SharedComponent = group.clone();
        group
            .write()
            .unwrap()
            .create_link("A", &flow_output("A"), "B", &flow_input("B"))
            .unwrap();

        let outside = Arc::new(RwLock::new(ConstantComponent::new("X", 7.0)));
        let outside_shared: SharedComponent = outside.clone();
        let mut outer = LinkManager::new();
        let mut link = outer.create_link();
        let res = link.connect(
            LinkEndpoint::new("X", &outside_shared, flow_output("X")),
            LinkEndpoint::new("G", &shared, flow_input("B")),
        );
        assert!(matches!(res, Err(CouplingError::Configuration(_))));

        // The source which accepted the link is told to forget it again
        assert!(!link.is_connected());
        assert_eq!(outside.read().unwrap().link_count(), 0);
        assert!(group.read().unwrap().external_links().is_empty());
    }

    #[test]
    fn refused_replacement_keeps_the_existing_link() {
        let mut group = ComponentGroup::new("G");
        let a = Arc::new(RwLock::new(ConstantComponent::new("A", 4.0)));
        let z = Arc::new(RwLock::new(ConstantComponent::new("Z", 9.0)));
        let b = Arc::new(RwLock::new(PassThrough::new("B")));
        group.add_component(a.clone()).unwrap();
        group.add_component(z.clone()).unwrap();
        group.add_component(b.clone()).unwrap();

        let first = group
            .create_link("A", &flow_output("A"), "B", &flow_input("B"))
            .unwrap();
        b.write().unwrap().accepts_links = false;

        let res = group.create_link("Z", &flow_output("Z"), "B", &flow_input("B"));
        assert!(matches!(res, Err(CouplingError::Configuration(_))));

        assert_eq!(group.link_manager().len(), 1);
        assert!(group.link_manager().get_link(&first).is_some());
        assert_eq!(a.read().unwrap().link_count(), 1);
        assert_eq!(z.read().unwrap().link_count(), 0);
        let values = b
            .write()
            .unwrap()
            .get_values(&Time::instant(0.0), "out")
            .unwrap();
        assert_eq!(values.scalar(0), Some(4.0));
    }

    #[test]
    fn removing_a_member_purges_its_links() {
        let mut group = a_and_b();
        group
            .create_link("A", &flow_output("A"), "B", &flow_input("B"))
            .unwrap();
        assert_eq!(group.input_exchange_item_count(), 0);

        assert!(group.remove_component("A").unwrap());
        assert!(group.link_manager().is_empty());
        assert_eq!(group.input_exchange_items(), vec![flow_input("B")]);
        assert_eq!(group.output_exchange_items(), vec![output("B", "result")]);
        assert!(!group.remove_component("A").unwrap());
    }

    #[test]
    fn batched_updates_are_applied_before_queries() {
        let mut group = ComponentGroup::new("G");
        group.begin_update();
        group
            .add_component(into_shared(ConstantComponent::new("A", 1.0)))
            .unwrap();
        group
            .add_component(into_shared(PassThrough::new("B")))
            .unwrap();
        group
            .create_link("A", &flow_output("A"), "B", &flow_input("B"))
            .unwrap();

        // Getters end the batch implicitly
        assert_eq!(group.input_exchange_item_count(), 0);
        assert_eq!(group.output_exchange_item_count(), 2);
    }

    #[test]
    fn time_horizon_is_the_intersection_of_members() {
        let mut group = ComponentGroup::new("G");
        assert!(group.time_horizon().is_none());

        group
            .add_component(into_shared(ConstantComponent::new("A", 1.0).with_horizon(0.0, 10.0)))
            .unwrap();
        group
            .add_component(into_shared(ConstantComponent::new("B", 1.0).with_horizon(5.0, 20.0)))
            .unwrap();
        assert_eq!(group.time_horizon(), Some(TimeHorizon::new(5.0, 10.0)));

        group
            .add_component(into_shared(ConstantComponent::new("C", 1.0).with_horizon(12.0, 30.0)))
            .unwrap();
        let horizon = group.time_horizon().unwrap();
        assert!(horizon.is_empty());
        assert_eq!(horizon, TimeHorizon::new(12.0, 10.0));
    }

    #[test]
    fn earliest_input_time_is_the_latest_of_members() {
        let mut group = ComponentGroup::new("G");
        group
            .add_component(into_shared(PassThrough::new("A").with_earliest_input_time(3.0)))
            .unwrap();
        group
            .add_component(into_shared(PassThrough::new("B").with_earliest_input_time(5.0)))
            .unwrap();
        group
            .add_component(into_shared(ConstantComponent::new("C", 1.0)))
            .unwrap();
        assert_eq!(group.earliest_input_time(), Some(Instant(5.0)));
    }

    #[test]
    fn validate_reports_unconnected_inputs() {
        let mut group = a_and_b();
        let diagnostics = group.validate();
        assert!(diagnostics.contains("Group 'G': input B.flow@outlet is not connected"));

        group
            .create_link("A", &flow_output("A"), "B", &flow_input("B"))
            .unwrap();
        assert_eq!(group.validate(), "");
    }

    #[test]
    fn lifecycle_is_forwarded_to_members() {
        let a = Arc::new(RwLock::new(ConstantComponent::new("A", 1.0)));
        let mut group = ComponentGroup::new("G");
        group.add_component(a.clone()).unwrap();

        group.initialize(&Arguments::new()).unwrap();
        group.prepare().unwrap();
        group.finish().unwrap();

        let a = a.read().unwrap();
        assert!(a.prepared);
        assert!(a.finished);
    }

    #[test]
    fn dot_output() {
        let mut group = a_and_b();
        group
            .create_link("A", &flow_output("A"), "B", &flow_input("B"))
            .unwrap();
        let dot = group.as_dot().unwrap();

        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("label = \"A\""));
        assert!(dot.contains("label = \"B\""));
        assert!(dot.contains("0 -> 1 [ label = \"flow\"]"));
    }
}
