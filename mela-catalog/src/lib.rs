pub mod pricing;

pub use pricing::{
    HeadRate, PriceQuote, PricingConfig, PricingEngine, PricingError, PricingMode, RateKind,
    RateTable, SchoolRate,
};
