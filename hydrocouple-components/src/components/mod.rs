mod constant;
mod linear_reservoir;
mod timeseries_source;

pub use constant::{ConstantSource, ConstantSourceParameters};
pub use linear_reservoir::{LinearReservoir, LinearReservoirParameters};
pub use timeseries_source::{SeriesSample, TimeSeriesParameters, TimeSeriesSource};

use hydrocouple_core::component::ComponentLinks;
use hydrocouple_core::errors::{CouplingError, CouplingResult};
use hydrocouple_core::exchange::ExchangeItem;

/// Check that a request arrives through a known link reading from `item`.
pub(crate) fn check_outgoing(
    links: &ComponentLinks,
    link_id: &str,
    item: &ExchangeItem,
) -> CouplingResult<()> {
    let link = links.get(link_id).ok_or_else(|| CouplingError::LinkResolution {
        link: link_id.to_string(),
        reason: format!("'{}' does not know this link", item.component),
    })?;
    match link.source_item() {
        Some(source) if source.same_slot(item) => Ok(()),
        _ => Err(CouplingError::LinkResolution {
            link: link_id.to_string(),
            reason: format!("link does not read from {}", item),
        }),
    }
}
