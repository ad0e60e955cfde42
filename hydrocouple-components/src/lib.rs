pub mod components;

pub use components::{
    ConstantSource, ConstantSourceParameters, LinearReservoir, LinearReservoirParameters,
    SeriesSample, TimeSeriesParameters, TimeSeriesSource,
};
